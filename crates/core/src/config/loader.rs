//! Configuration file loader for the `.ws-loader/` directory structure.
//!
//! This module loads and parses all configuration files from the
//! `.ws-loader/` directory, including:
//! - `config.toml`: Timeouts and policies
//! - `default-devfile.yaml`: The default devfile
//! - `scenarios/*.yaml`: Replay scenarios

use crate::config::error::ConfigError;
use crate::config::error::ConfigResult;
use crate::config::models::AppConfig;
use std::collections::HashSet;
use std::path::Path;
use walkdir::WalkDir;
use wl_protocol::config_models::LoaderConfig;
use wl_protocol::factory_models::Devfile;
use wl_protocol::scenario_models::Scenario;

/// Name of the configuration directory looked up under the root.
pub const CONFIG_DIR: &str = ".ws-loader";

/// Loads all configuration from the `.ws-loader/` directory.
///
/// # Arguments
///
/// * `root` - Root directory containing the `.ws-loader/` folder
///
/// # Returns
///
/// An `AppConfig` containing all loaded configuration. If the directory or
/// any of the files are missing, the corresponding defaults are returned
/// rather than an error.
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - Files exist but cannot be read
/// - Files have invalid syntax (TOML or YAML)
/// - A timeout is set to zero or two scenarios share a name
///
/// # Example
///
/// ```rust,no_run
/// use wl_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("Loaded {} scenarios", config.scenarios.len());
/// # Ok(())
/// # }
/// ```
pub async fn load_config(root: &Path) -> ConfigResult<AppConfig> {
    let wl_dir = root.join(CONFIG_DIR);

    if !wl_dir.exists() {
        return Ok(AppConfig::default());
    }

    let loader = load_loader_config(&wl_dir)?;
    let default_devfile = load_default_devfile(&wl_dir)?;
    let scenarios = load_scenarios(&wl_dir)?;

    Ok(AppConfig {
        loader,
        default_devfile,
        scenarios,
    })
}

/// Loads a single scenario file.
///
/// # Errors
///
/// Returns `ConfigError::FileRead` or `ConfigError::YamlParse` naming the
/// file.
pub fn load_scenario(path: &Path) -> ConfigResult<Scenario> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    // variants are written as single-key maps, e.g. `event: { snapshot: ... }`
    serde_yaml::with::singleton_map_recursive::deserialize(serde_yaml::Deserializer::from_str(
        &content,
    ))
    .map_err(|source| ConfigError::YamlParse {
        path: path.to_path_buf(),
        source,
    })
}

fn load_loader_config(wl_dir: &Path) -> ConfigResult<LoaderConfig> {
    let config_path = wl_dir.join("config.toml");

    if !config_path.exists() {
        return Ok(LoaderConfig::default());
    }

    let content =
        std::fs::read_to_string(&config_path).map_err(|source| ConfigError::FileRead {
            path: config_path.clone(),
            source,
        })?;

    let config: LoaderConfig =
        toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
            path: config_path.clone(),
            source,
        })?;

    let timeouts = [
        ("stop_timeout_sec", config.stop_timeout_sec),
        ("start_timeout_sec", config.start_timeout_sec),
        ("url_timeout_sec", config.url_timeout_sec),
        ("resolve_timeout_sec", config.resolve_timeout_sec),
        ("create_timeout_sec", config.create_timeout_sec),
        ("endpoint_recheck_ms", config.endpoint_recheck_ms),
    ];
    if let Some((name, _)) = timeouts.iter().find(|(_, value)| *value == Some(0)) {
        return Err(ConfigError::InvalidConfig {
            path: config_path,
            reason: format!("`{name}` must be greater than zero"),
        });
    }

    Ok(config)
}

fn load_default_devfile(wl_dir: &Path) -> ConfigResult<Option<Devfile>> {
    let devfile_path = wl_dir.join("default-devfile.yaml");

    if !devfile_path.exists() {
        return Ok(None);
    }

    let content =
        std::fs::read_to_string(&devfile_path).map_err(|source| ConfigError::FileRead {
            path: devfile_path.clone(),
            source,
        })?;

    let devfile: Devfile =
        serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlParse {
            path: devfile_path,
            source,
        })?;

    Ok(Some(devfile))
}

/// Loads all scenarios from `scenarios/*.yaml` in file name order.
fn load_scenarios(wl_dir: &Path) -> ConfigResult<Vec<Scenario>> {
    let scenarios_dir = wl_dir.join("scenarios");

    if !scenarios_dir.exists() {
        return Ok(Vec::new());
    }

    let mut scenarios = Vec::new();
    let mut names = HashSet::new();

    for entry in WalkDir::new(&scenarios_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| ConfigError::DirectoryWalk {
            path: scenarios_dir.clone(),
            source,
        })?;

        let path = entry.path();

        let ext = path.extension().and_then(|s| s.to_str());
        if ext != Some("yaml") && ext != Some("yml") {
            continue;
        }

        let scenario = load_scenario(path)?;
        if !names.insert(scenario.name.clone()) {
            return Err(ConfigError::InvalidConfig {
                path: path.to_path_buf(),
                reason: format!("duplicate scenario name `{}`", scenario.name),
            });
        }

        scenarios.push(scenario);
    }

    Ok(scenarios)
}
