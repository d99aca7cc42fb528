use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use htrvx_core::config::{FormatChoice, UntaggedScope, ValidationConfig};
use htrvx_core::report::VerboseLevel;
use htrvx_core::run::{DocumentSource, Validator};
use htrvx_core::schema::{SchemaCache, SchemaStore};

#[derive(Parser)]
#[command(name = "htrvx")]
#[command(about = "Validate ALTO and PAGE layout files: schema, Segmonto taxonomy, empty elements and image links")]
#[command(version)]
struct Cli {
    /// Layout files to validate.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    #[arg(long, default_value = "auto")]
    format: FormatChoice,

    /// Check zone and line types against the Segmonto vocabulary.
    #[arg(long)]
    segmonto: bool,

    /// Allowed zone type; replaces Segmonto for zones. Repeatable.
    #[arg(long = "zone", value_name = "NAME")]
    zones: Vec<String>,

    /// Allowed line type; replaces Segmonto for lines. Repeatable.
    #[arg(long = "line", value_name = "NAME")]
    lines: Vec<String>,

    #[arg(long)]
    check_empty: bool,

    /// Fail files with empty zones or lines instead of warning.
    #[arg(long)]
    raise_empty: bool,

    #[arg(long)]
    check_image: bool,

    /// Validate against the schema declared by each file.
    #[arg(long)]
    xsd: bool,

    /// Schema to use instead of the declared one: alias, path or URL.
    #[arg(long, value_name = "ID")]
    schema: Option<String>,

    /// Group errors by type.
    #[arg(short, long)]
    group: bool,

    /// Print the report.
    #[arg(short, long)]
    verbose: bool,

    #[arg(long, default_value = "all")]
    verbose_level: VerboseLevel,

    #[arg(long, value_name = "LEVEL")]
    allow_untagged: Option<UntaggedScope>,

    /// Untagged zones accepted once allowed; -1 for no limit.
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    max_untagged_zones: i64,

    /// Untagged lines accepted once allowed; -1 for no limit.
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    max_untagged_lines: i64,

    /// Directory of downloaded schemas.
    #[arg(long, env = "HTRVX_SCHEMA_CACHE")]
    cache_dir: Option<PathBuf>,

    /// Directory of the bundled schemas.
    #[arg(long)]
    schema_dir: Option<PathBuf>,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn config(&self) -> ValidationConfig {
        ValidationConfig {
            format: self.format,
            segmonto: self.segmonto,
            zone_categories: self.zones.clone(),
            line_categories: self.lines.clone(),
            check_empty: self.check_empty,
            raise_empty: self.raise_empty,
            check_image: self.check_image,
            xsd: self.xsd || self.schema.is_some(),
            schema: self.schema.clone(),
            group: self.group,
            allow_untagged: self.allow_untagged,
            max_untagged_zones: self.max_untagged_zones,
            max_untagged_lines: self.max_untagged_lines,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<bool> {
    let cache_dir = cli.cache_dir.clone().unwrap_or_else(SchemaCache::default_dir);
    let cache = SchemaCache::open(&cache_dir)
        .with_context(|| format!("opening schema cache {}", cache_dir.display()))?;
    let mut store = SchemaStore::new(cache).context("building the HTTP client")?;
    if let Some(dir) = &cli.schema_dir {
        store = store.with_bundled_dir(dir);
    }

    let mut validator = Validator::new(cli.config(), store);
    let run = validator.run(cli.files.iter().cloned().map(DocumentSource::Path));

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else if cli.verbose {
        println!("{}", run.render(cli.verbose_level));
    }
    Ok(run.passed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_onto_the_config() {
        let cli = Cli::parse_from([
            "htrvx",
            "--segmonto",
            "--zone",
            "Body",
            "--zone",
            "Note",
            "--allow-untagged",
            "zone",
            "--max-untagged-zones",
            "2",
            "--schema",
            "ALTO-Segmonto",
            "a.xml",
        ]);
        let config = cli.config();
        assert!(config.segmonto);
        assert_eq!(config.zone_categories, ["Body", "Note"]);
        assert_eq!(config.allow_untagged, Some(UntaggedScope::Zone));
        assert_eq!(config.max_untagged_zones, 2);
        assert_eq!(config.max_untagged_lines, -1);
        assert!(config.xsd);
        assert_eq!(config.format, FormatChoice::Auto);
    }

    #[test]
    fn negative_maximum_is_accepted() {
        let cli = Cli::parse_from(["htrvx", "--max-untagged-lines", "-1", "a.xml"]);
        assert_eq!(cli.max_untagged_lines, -1);
    }

    #[test]
    fn unknown_verbosity_is_rejected() {
        assert!(Cli::try_parse_from(["htrvx", "--verbose-level", "loud", "a.xml"]).is_err());
    }
}
