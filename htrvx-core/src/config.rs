//! Validation options and their parsing.
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::document::Level;
use crate::rules::{LevelRule, Rules, Taxonomy, UntaggedTolerance};

/// Layout dialect of the input documents.
///
/// `Auto` inspects the root element of each document (`alto` or `PcGts`).
///
/// # Examples
/// ```rust
/// use std::str::FromStr;
/// use htrvx_core::config::FormatChoice;
///
/// let format = FormatChoice::from_str("page")?;
/// assert_eq!(format, FormatChoice::Page);
/// # Ok::<(), htrvx_core::config::ConfigParseError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatChoice {
    Alto,
    Page,
    #[default]
    Auto,
}

/// Error returned when parsing a configuration value from a string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigParseError {
    #[error("invalid format: {input} (expected alto, page or auto)")]
    Format { input: String },
    #[error("invalid verbosity level: {input} (expected minimal, low, zen or all)")]
    VerboseLevel { input: String },
    #[error("invalid untagged scope: {input} (expected zone, line or both)")]
    UntaggedScope { input: String },
}

impl FromStr for FormatChoice {
    type Err = ConfigParseError;
    fn from_str(format: &str) -> Result<FormatChoice, ConfigParseError> {
        match format.to_ascii_lowercase().as_str() {
            "alto" => Ok(FormatChoice::Alto),
            "page" => Ok(FormatChoice::Page),
            "auto" => Ok(FormatChoice::Auto),
            _ => Err(ConfigParseError::Format {
                input: format.to_string(),
            }),
        }
    }
}

impl FormatChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatChoice::Alto => "alto",
            FormatChoice::Page => "page",
            FormatChoice::Auto => "auto",
        }
    }
}

/// Levels for which untagged elements are tolerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UntaggedScope {
    Zone,
    Line,
    Both,
}

impl UntaggedScope {
    pub fn covers(&self, level: Level) -> bool {
        matches!(
            (self, level),
            (UntaggedScope::Both, _)
                | (UntaggedScope::Zone, Level::Zone)
                | (UntaggedScope::Line, Level::Line)
        )
    }
}

impl FromStr for UntaggedScope {
    type Err = ConfigParseError;
    fn from_str(scope: &str) -> Result<UntaggedScope, ConfigParseError> {
        match scope.to_ascii_lowercase().as_str() {
            "zone" => Ok(UntaggedScope::Zone),
            "line" => Ok(UntaggedScope::Line),
            "both" => Ok(UntaggedScope::Both),
            _ => Err(ConfigParseError::UntaggedScope {
                input: scope.to_string(),
            }),
        }
    }
}

/// Every option of a validation run.
///
/// The defaults mirror the command line: no check is enabled, the format is
/// detected per document and untagged elements are forbidden.
///
/// # Examples
/// ```rust
/// use htrvx_core::config::{UntaggedScope, ValidationConfig};
///
/// let config = ValidationConfig {
///     segmonto: true,
///     allow_untagged: Some(UntaggedScope::Zone),
///     max_untagged_zones: 2,
///     ..ValidationConfig::default()
/// };
/// assert!(config.needs_layout_model());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    pub format: FormatChoice,
    /// Check categories against the Segmonto vocabulary.
    pub segmonto: bool,
    /// Custom zone vocabulary; replaces Segmonto for zones when non-empty.
    pub zone_categories: Vec<String>,
    /// Custom line vocabulary; replaces Segmonto for lines when non-empty.
    pub line_categories: Vec<String>,
    pub check_empty: bool,
    /// Empty elements fail the file instead of warning.
    pub raise_empty: bool,
    pub check_image: bool,
    /// Run schema validation.
    pub xsd: bool,
    /// Schema identifier used instead of the one declared by each document.
    pub schema: Option<String>,
    /// Group repeated errors in details.
    pub group: bool,
    pub allow_untagged: Option<UntaggedScope>,
    /// `-1` means unlimited once untagged zones are allowed.
    pub max_untagged_zones: i64,
    /// `-1` means unlimited once untagged lines are allowed.
    pub max_untagged_lines: i64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        ValidationConfig {
            format: FormatChoice::Auto,
            segmonto: false,
            zone_categories: Vec::new(),
            line_categories: Vec::new(),
            check_empty: false,
            raise_empty: false,
            check_image: false,
            xsd: false,
            schema: None,
            group: false,
            allow_untagged: None,
            max_untagged_zones: -1,
            max_untagged_lines: -1,
        }
    }
}

impl ValidationConfig {
    /// Active taxonomy for a level, if any.
    pub fn taxonomy(&self, level: Level) -> Option<Taxonomy> {
        let custom = match level {
            Level::Zone => &self.zone_categories,
            Level::Line => &self.line_categories,
        };
        if !custom.is_empty() {
            return Some(Taxonomy::custom(custom.iter().cloned()));
        }
        self.segmonto.then_some(Taxonomy::Fixed(level))
    }

    pub fn tolerance(&self, level: Level) -> UntaggedTolerance {
        let allowed = self
            .allow_untagged
            .is_some_and(|scope| scope.covers(level));
        if !allowed {
            return UntaggedTolerance::Forbidden;
        }
        let max = match level {
            Level::Zone => self.max_untagged_zones,
            Level::Line => self.max_untagged_lines,
        };
        match usize::try_from(max) {
            Ok(max) => UntaggedTolerance::UpTo(max),
            Err(_) => UntaggedTolerance::Unlimited,
        }
    }

    pub fn rules(&self) -> Rules {
        Rules {
            zone: LevelRule {
                taxonomy: self.taxonomy(Level::Zone),
                tolerance: self.tolerance(Level::Zone),
            },
            line: LevelRule {
                taxonomy: self.taxonomy(Level::Line),
                tolerance: self.tolerance(Level::Line),
            },
            check_empty: self.check_empty,
        }
    }

    /// Whether any requested check needs the parsed zone/line model.
    pub fn needs_layout_model(&self) -> bool {
        self.check_empty
            || self.check_image
            || self.taxonomy(Level::Zone).is_some()
            || self.taxonomy(Level::Line).is_some()
    }
}
