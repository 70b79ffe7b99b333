use crate::error::GatewayError;
use crate::paging::ListingTarget;
use crate::schema::{SchemaSettings, MAX_SAMPLE_ROWS};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_DRIVER: &str = "Progress OpenEdge Driver";
pub const DEFAULT_LISTING_LIMIT: usize = 100;
pub const DEFAULT_PAGE_LIMIT: usize = 10;

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub driver_name: String,
    pub listing: ListingTarget,
    pub schema: SchemaSettings,
    pub listing_limit: usize,
    pub page_limit: usize,
    pub verbose: bool,
    pub show_secrets: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            driver_name: DEFAULT_DRIVER.to_string(),
            listing: ListingTarget::default(),
            schema: SchemaSettings::default(),
            listing_limit: DEFAULT_LISTING_LIMIT,
            page_limit: DEFAULT_PAGE_LIMIT,
            verbose: false,
            show_secrets: false,
        }
    }
}

// --- TOML config file structs ---

#[derive(Debug, Deserialize, Default)]
struct TomlConfig {
    #[serde(default)]
    defaults: TomlDefaults,
    #[serde(default)]
    driver: TomlDriver,
    #[serde(default)]
    listing: TomlListing,
    #[serde(default)]
    schema: TomlSchema,
}

#[derive(Debug, Deserialize, Default)]
struct TomlDefaults {
    listing_limit: Option<usize>,
    page_limit: Option<usize>,
    verbose: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlDriver {
    name: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlListing {
    table: Option<String>,
    columns: Option<Vec<String>>,
    key: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlSchema {
    namespace: Option<String>,
    sample_rows: Option<usize>,
    sample_max_chars: Option<usize>,
}

/// Config path, and whether the user named it explicitly.
struct ResolvedConfigPath {
    path: PathBuf,
    /// true if user explicitly specified via --config or EDGEGATE_CONFIG
    explicit: bool,
}

/// Resolve the config file path: --config flag > env var > platform default.
fn resolve_config_path(cli_config: Option<&PathBuf>) -> Option<ResolvedConfigPath> {
    if let Some(path) = cli_config {
        return Some(ResolvedConfigPath {
            path: path.clone(),
            explicit: true,
        });
    }
    if let Ok(path) = std::env::var("EDGEGATE_CONFIG")
        && !path.is_empty()
    {
        return Some(ResolvedConfigPath {
            path: PathBuf::from(path),
            explicit: true,
        });
    }
    ProjectDirs::from("", "", "edgegate").map(|dirs| ResolvedConfigPath {
        path: dirs.config_dir().join("config.toml"),
        explicit: false,
    })
}

/// Load and parse the TOML config file (if it exists).
fn load_toml_config(resolved: Option<&ResolvedConfigPath>) -> Result<TomlConfig, GatewayError> {
    let resolved = match resolved {
        Some(r) => r,
        None => return Ok(TomlConfig::default()),
    };

    if !resolved.path.exists() {
        if resolved.explicit {
            return Err(GatewayError::Config {
                message: format!("config file not found: {}", resolved.path.display()),
            });
        }
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(&resolved.path).map_err(|e| GatewayError::Config {
        message: format!("cannot read config file {}: {}", resolved.path.display(), e),
    })?;

    toml::from_str(&content).map_err(|e| GatewayError::Config {
        message: format!("invalid config file {}: {}", resolved.path.display(), e),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Build AppConfig from global CLI flags and the config file.
///
/// Precedence: CLI flag / env var > config file > built-in default.
pub fn load(
    verbose: bool,
    show_secrets: bool,
    driver: Option<&str>,
    config_path: Option<&PathBuf>,
) -> Result<AppConfig, GatewayError> {
    let resolved_path = resolve_config_path(config_path);
    let toml_config = load_toml_config(resolved_path.as_ref())?;
    let defaults = AppConfig::default();

    let driver_name = driver
        .map(|d| d.to_string())
        .or_else(|| non_empty(toml_config.driver.name))
        .unwrap_or(defaults.driver_name);

    let listing = ListingTarget {
        table: non_empty(toml_config.listing.table).unwrap_or(defaults.listing.table),
        columns: toml_config
            .listing
            .columns
            .filter(|c| !c.is_empty())
            .unwrap_or(defaults.listing.columns),
        key: non_empty(toml_config.listing.key).unwrap_or(defaults.listing.key),
    };

    let schema = SchemaSettings {
        namespace: non_empty(toml_config.schema.namespace).unwrap_or(defaults.schema.namespace),
        sample_rows: toml_config
            .schema
            .sample_rows
            .map(|n| n.min(MAX_SAMPLE_ROWS))
            .unwrap_or(defaults.schema.sample_rows),
        sample_max_chars: toml_config
            .schema
            .sample_max_chars
            .unwrap_or(defaults.schema.sample_max_chars),
    };

    Ok(AppConfig {
        driver_name,
        listing,
        schema,
        listing_limit: toml_config
            .defaults
            .listing_limit
            .unwrap_or(defaults.listing_limit),
        page_limit: toml_config
            .defaults
            .page_limit
            .unwrap_or(defaults.page_limit),
        verbose: verbose || toml_config.defaults.verbose.unwrap_or(false),
        show_secrets,
    })
}
