//! Taxonomy and emptiness rules applied to zones and lines.
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

use crate::document::{DocumentError, Element, Elements, Layout, Level};

/// Segmonto zone types.
pub const SEGMONTO_ZONES: &[&str] = &[
    "MainZone",
    "MarginTextZone",
    "NumberingZone",
    "RunningTitleZone",
    "QuireMarksZone",
    "StampZone",
    "DigitizationArtefactZone",
    "DropCapitalZone",
    "GraphicZone",
    "MusicZone",
    "SealZone",
    "CustomZone",
    "DamageZone",
    "TableZone",
    "TitlePageZone",
];

/// Segmonto line types.
pub const SEGMONTO_LINES: &[&str] = &[
    "DefaultLine",
    "DropCapitalLine",
    "InterlinearLine",
    "HeadingLine",
    "MusicLine",
    "CustomLine",
];

static ZONE_PATTERN: Lazy<Regex> = Lazy::new(|| segmonto_pattern(SEGMONTO_ZONES));
static LINE_PATTERN: Lazy<Regex> = Lazy::new(|| segmonto_pattern(SEGMONTO_LINES));

// A type name, then an optional `:subtype` and an optional `#number`.
fn segmonto_pattern(names: &[&str]) -> Regex {
    Regex::new(&format!(
        r"^(?:{})(?::[\w-]+)?(?:#[\w-]+)?$",
        names.join("|")
    ))
    .expect("Segmonto pattern is a valid regex")
}

/// Vocabulary a level's categories are checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Taxonomy {
    /// Segmonto vocabulary of the given level.
    Fixed(Level),
    /// Exact set of allowed categories.
    Custom(BTreeSet<String>),
}

impl Taxonomy {
    pub fn custom<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Taxonomy::Custom(categories.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, category: &str) -> bool {
        match self {
            Taxonomy::Fixed(Level::Zone) => ZONE_PATTERN.is_match(category),
            Taxonomy::Fixed(Level::Line) => LINE_PATTERN.is_match(category),
            Taxonomy::Custom(allowed) => allowed.contains(category),
        }
    }
}

/// How many untagged elements a level accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UntaggedTolerance {
    #[default]
    Forbidden,
    Unlimited,
    /// Passes while the level holds at most this many untagged elements.
    UpTo(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LevelRule {
    /// `None` disables the taxonomy check for the level.
    pub taxonomy: Option<Taxonomy>,
    pub tolerance: UntaggedTolerance,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rules {
    pub zone: LevelRule,
    pub line: LevelRule,
    pub check_empty: bool,
}

/// Elements that broke a rule, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    pub zone_errors: Vec<Element>,
    pub line_errors: Vec<Element>,
    pub empty: Vec<Element>,
}

impl Evaluation {
    pub fn taxonomy_errors(&self, level: Level) -> &[Element] {
        match level {
            Level::Zone => &self.zone_errors,
            Level::Line => &self.line_errors,
        }
    }

    pub fn empty_elements(&self, level: Level) -> impl Iterator<Item = &Element> {
        self.empty.iter().filter(move |element| element.kind == level)
    }
}

/// Run the taxonomy and emptiness rules over a document.
pub fn evaluate(model: &impl Layout, rules: &Rules) -> Result<Evaluation, DocumentError> {
    let mut evaluation = Evaluation::default();
    if rules.zone.taxonomy.is_some() || rules.check_empty {
        evaluation.zone_errors = check_level(
            model.zones(rules.check_empty)?,
            &rules.zone,
            rules.check_empty,
            &mut evaluation.empty,
        );
    }
    if rules.line.taxonomy.is_some() || rules.check_empty {
        evaluation.line_errors = check_level(
            model.lines(rules.check_empty)?,
            &rules.line,
            rules.check_empty,
            &mut evaluation.empty,
        );
    }
    tracing::debug!(
        zone_errors = evaluation.zone_errors.len(),
        line_errors = evaluation.line_errors.len(),
        empty = evaluation.empty.len(),
        "rules evaluated"
    );
    Ok(evaluation)
}

fn check_level(
    elements: Elements<'_>,
    rule: &LevelRule,
    check_empty: bool,
    empty: &mut Vec<Element>,
) -> Vec<Element> {
    // (element, untagged but tolerated up to a maximum)
    let mut candidates: Vec<(Element, bool)> = Vec::new();
    for element in elements {
        if check_empty && element.is_empty() {
            empty.push(element.clone());
        }
        let Some(taxonomy) = &rule.taxonomy else {
            continue;
        };
        let tolerated = match &element.category {
            Some(category) if taxonomy.matches(category) => continue,
            Some(_) => false,
            None => match rule.tolerance {
                UntaggedTolerance::Forbidden => false,
                UntaggedTolerance::Unlimited => continue,
                UntaggedTolerance::UpTo(_) => true,
            },
        };
        candidates.push((element, tolerated));
    }

    let untagged = candidates.iter().filter(|(_, tolerated)| *tolerated).count();
    let over_limit = match rule.tolerance {
        UntaggedTolerance::UpTo(max) => untagged > max,
        _ => false,
    };
    candidates
        .into_iter()
        .filter(|(_, tolerated)| !tolerated || over_limit)
        .map(|(element, _)| element)
        .collect()
}

fn join_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> String {
    ids.into_iter()
        .map(|id| format!("#{id}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Describe taxonomy errors, either one line per element or one line per
/// category (sorted by category, ids in discovery order).
pub fn describe_taxonomy_errors(errors: &[Element], level: Level, group: bool) -> Vec<String> {
    if !group {
        return errors
            .iter()
            .map(|error| match &error.category {
                None => format!("{} with id #{} is not categorized", level.element_label(), error.id),
                Some(category) => format!(
                    "{} with id #{} has a forbidden type (`{category}`)",
                    level.element_label(),
                    error.id
                ),
            })
            .collect();
    }

    let mut groups: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for error in errors {
        let label = match &error.category {
            Some(category) => format!("`{category}`"),
            None => "Missing".to_string(),
        };
        groups.entry(label).or_default().push(&error.id);
    }
    groups
        .into_iter()
        .map(|(label, ids)| {
            format!(
                "{label} tag for {level}(s) is forbidden ({} annotations): {}",
                ids.len(),
                join_ids(ids)
            )
        })
        .collect()
}

/// Describe the empty elements of one level.
pub fn describe_empty<'a>(
    empty: impl IntoIterator<Item = &'a Element>,
    level: Level,
    group: bool,
) -> Vec<String> {
    let ids: Vec<&str> = empty
        .into_iter()
        .filter(|element| element.kind == level)
        .map(|element| element.id.as_str())
        .collect();
    if ids.is_empty() {
        return Vec::new();
    }
    if group {
        return vec![format!(
            "Empty {level}(s) ({}): {}",
            ids.len(),
            join_ids(ids)
        )];
    }
    ids.into_iter()
        .map(|id| format!("{} with id #{id} is empty", level.element_label()))
        .collect()
}
