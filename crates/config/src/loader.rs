use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::CourierConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "courier.toml",
    "courier.yaml",
    "courier.yml",
    "courier.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<CourierConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./courier.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/courier/courier.{toml,yaml,yml,json}` (user-global)
///
/// Returns `CourierConfig::default()` if no config file is found or the file
/// fails to parse.
pub fn discover_and_load() -> CourierConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    CourierConfig::default()
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    find_config_file_in(Path::new("."), config_dir().as_deref())
}

fn find_config_file_in(local: &Path, global: Option<&Path>) -> Option<PathBuf> {
    std::iter::once(local)
        .chain(global)
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/courier/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "courier").map(|d| d.config_dir().to_path_buf())
}

/// Parse raw config text, choosing the format from the file extension.
pub fn parse_config(raw: &str, path: &Path) -> anyhow::Result<CourierConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

/// Parse raw config text into a JSON value without applying the schema.
pub(crate) fn parse_config_value(raw: &str, path: &Path) -> anyhow::Result<serde_json::Value> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => {
            let v: toml::Value = toml::from_str(raw)?;
            Ok(serde_json::to_value(v)?)
        },
        "yaml" | "yml" => {
            let v: serde_yaml::Value = serde_yaml::from_str(raw)?;
            Ok(serde_json::to_value(v)?)
        },
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, courier_common::types::StreamingMode};

    #[test]
    fn loads_yaml_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("courier.yaml");
        std::fs::write(
            &path,
            "dispatch:\n  streaming_mode: edit\n  text_limit: 1024\n",
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.dispatch.streaming_mode, StreamingMode::Edit);
        assert_eq!(cfg.dispatch.text_limit, 1024);
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = parse_config("", Path::new("courier.ini")).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn local_file_wins_over_global() {
        let local = tempfile::tempdir().unwrap();
        let global = tempfile::tempdir().unwrap();
        std::fs::write(global.path().join("courier.toml"), "").unwrap();
        std::fs::write(local.path().join("courier.json"), "{}").unwrap();

        let found = find_config_file_in(local.path(), Some(global.path())).unwrap();
        assert_eq!(found, local.path().join("courier.json"));
    }

    #[test]
    fn falls_back_to_global_dir() {
        let local = tempfile::tempdir().unwrap();
        let global = tempfile::tempdir().unwrap();
        std::fs::write(global.path().join("courier.yml"), "").unwrap();

        let found = find_config_file_in(local.path(), Some(global.path())).unwrap();
        assert_eq!(found, global.path().join("courier.yml"));
        assert!(find_config_file_in(local.path(), None).is_none());
    }

    #[test]
    fn toml_value_converts_to_json() {
        let value = parse_config_value("[telegram.main]\ntoken = \"t\"\n", Path::new("c.toml"))
            .unwrap();
        assert_eq!(value["telegram"]["main"]["token"], "t");
    }
}
