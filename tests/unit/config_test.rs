use edgegate::config::{load, DEFAULT_DRIVER, DEFAULT_LISTING_LIMIT, DEFAULT_PAGE_LIMIT};
use edgegate::error::GatewayError;
use std::path::PathBuf;
use std::sync::Mutex;

// --- Env var test infrastructure ---

/// Static mutex to serialize tests that touch process env vars.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// RAII guard that sets env vars on creation and removes them on Drop.
/// Holds the ENV_MUTEX lock for its lifetime.
struct EnvGuard {
    keys: Vec<String>,
    _lock: std::sync::MutexGuard<'static, ()>,
}

impl EnvGuard {
    fn new(vars: &[(&str, &str)]) -> Self {
        let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        for (key, val) in vars {
            // SAFETY: env var access is serialized by ENV_MUTEX
            unsafe { std::env::set_var(key, val); }
        }
        EnvGuard {
            keys: vars.iter().map(|(k, _)| k.to_string()).collect(),
            _lock: lock,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for key in &self.keys {
            // SAFETY: env var access is serialized by ENV_MUTEX
            unsafe { std::env::remove_var(key); }
        }
    }
}

/// Write a TOML config to a temp file and return its path.
fn write_temp_toml(name: &str, content: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("edgegate-test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("{}-{}.toml", name, std::process::id()));
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_empty_config_yields_defaults() {
    let _guard = EnvGuard::new(&[]);
    let path = write_temp_toml("empty", "");
    let config = load(false, false, None, Some(&path)).unwrap();

    assert_eq!(config.driver_name, DEFAULT_DRIVER);
    assert_eq!(config.listing_limit, DEFAULT_LISTING_LIMIT);
    assert_eq!(config.page_limit, DEFAULT_PAGE_LIMIT);
    assert_eq!(config.listing.table, "PUB.transporte");
    assert_eq!(config.listing.columns, vec!["nomtrn", "codtrn"]);
    assert_eq!(config.listing.key, "codtrn");
    assert_eq!(config.schema.namespace, "PUB");
    assert_eq!(config.schema.sample_rows, 3);
    assert_eq!(config.schema.sample_max_chars, 100);
    assert!(!config.verbose);
    assert!(!config.show_secrets);
}

#[test]
fn test_config_file_overrides_defaults() {
    let _guard = EnvGuard::new(&[]);
    let path = write_temp_toml(
        "full",
        r#"
[defaults]
listing_limit = 250
page_limit = 25

[driver]
name = "Progress OpenEdge 12.2 Driver"

[listing]
table = "PUB.veiculo"
columns = ["placa", "codvei"]
key = "codvei"

[schema]
namespace = "ERP"
sample_rows = 2
sample_max_chars = 40
"#,
    );
    let config = load(false, false, None, Some(&path)).unwrap();

    assert_eq!(config.driver_name, "Progress OpenEdge 12.2 Driver");
    assert_eq!(config.listing_limit, 250);
    assert_eq!(config.page_limit, 25);
    assert_eq!(config.listing.table, "PUB.veiculo");
    assert_eq!(config.listing.columns, vec!["placa", "codvei"]);
    assert_eq!(config.listing.key, "codvei");
    assert_eq!(config.schema.namespace, "ERP");
    assert_eq!(config.schema.sample_rows, 2);
    assert_eq!(config.schema.sample_max_chars, 40);
}

#[test]
fn test_cli_driver_overrides_config_file() {
    let _guard = EnvGuard::new(&[]);
    let path = write_temp_toml("driver", "[driver]\nname = \"From File\"\n");
    let config = load(false, false, Some("From Flag"), Some(&path)).unwrap();
    assert_eq!(config.driver_name, "From Flag");
}

#[test]
fn test_blank_values_fall_back_to_defaults() {
    let _guard = EnvGuard::new(&[]);
    let path = write_temp_toml(
        "blank",
        "[driver]\nname = \"  \"\n\n[listing]\ntable = \"\"\ncolumns = []\n",
    );
    let config = load(false, false, None, Some(&path)).unwrap();
    assert_eq!(config.driver_name, DEFAULT_DRIVER);
    assert_eq!(config.listing.table, "PUB.transporte");
    assert_eq!(config.listing.columns, vec!["nomtrn", "codtrn"]);
}

#[test]
fn test_verbose_from_flag_or_file() {
    let _guard = EnvGuard::new(&[]);
    let quiet = write_temp_toml("quiet", "[defaults]\nverbose = false\n");
    let loud = write_temp_toml("loud", "[defaults]\nverbose = true\n");

    assert!(load(true, false, None, Some(&quiet)).unwrap().verbose);
    assert!(load(false, false, None, Some(&loud)).unwrap().verbose);
    assert!(!load(false, false, None, Some(&quiet)).unwrap().verbose);
}

#[test]
fn test_show_secrets_passed_through() {
    let _guard = EnvGuard::new(&[]);
    let path = write_temp_toml("secrets", "");
    assert!(load(false, true, None, Some(&path)).unwrap().show_secrets);
}

#[test]
fn test_config_file_not_found_errors() {
    let _guard = EnvGuard::new(&[]);
    let path = PathBuf::from("/nonexistent/edgegate/config.toml");
    let err = load(false, false, None, Some(&path)).unwrap_err();
    assert!(matches!(err, GatewayError::Config { .. }));
    assert!(err.to_string().contains("config file not found"), "Got: {}", err);
}

#[test]
fn test_env_config_path_not_found_errors() {
    let _guard = EnvGuard::new(&[("EDGEGATE_CONFIG", "/nonexistent/edgegate/env.toml")]);
    let err = load(false, false, None, None).unwrap_err();
    assert!(err.to_string().starts_with("config: config file not found"), "Got: {}", err);
}

#[test]
fn test_env_config_path_is_used() {
    let path = write_temp_toml("env", "[defaults]\npage_limit = 7\n");
    let _guard = EnvGuard::new(&[("EDGEGATE_CONFIG", path.to_str().unwrap())]);
    let config = load(false, false, None, None).unwrap();
    assert_eq!(config.page_limit, 7);
}

#[test]
fn test_invalid_toml_errors() {
    let _guard = EnvGuard::new(&[]);
    let path = write_temp_toml("invalid", "[defaults\nlisting_limit = ");
    let err = load(false, false, None, Some(&path)).unwrap_err();
    assert!(matches!(err, GatewayError::Config { .. }));
    assert!(err.to_string().contains("invalid config file"), "Got: {}", err);
}

#[test]
fn test_sample_rows_capped_at_three() {
    let _guard = EnvGuard::new(&[]);
    let path = write_temp_toml("sample", "[schema]\nsample_rows = 50\n");
    let config = load(false, false, None, Some(&path)).unwrap();
    assert_eq!(config.schema.sample_rows, 3);
}
