use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::CronConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "cronrepo.toml",
    "cronrepo.yaml",
    "cronrepo.yml",
    "cronrepo.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<CronConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./cronrepo.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/cronrepo/cronrepo.{toml,yaml,yml,json}` (user-global)
///
/// Returns `CronConfig::default()` if no config file is found. Environment
/// overrides are applied in both cases.
pub fn discover_and_load() -> CronConfig {
    let config = if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                CronConfig::default()
            },
        }
    } else {
        debug!("no config file found, using defaults");
        CronConfig::default()
    };
    apply_env_overrides(config)
}

/// Find the first config file in standard locations.
pub(crate) fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/cronrepo/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "cronrepo").map(|d| d.config_dir().to_path_buf())
}

/// Apply `CRONREPO_*` environment overrides.
pub fn apply_env_overrides(config: CronConfig) -> CronConfig {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

/// Apply overrides from a custom lookup.
///
/// Recognised: `CRONREPO_CLIENT`, `CRONREPO_THREAD_COUNT`,
/// `CRONREPO_TIMEZONE` (both engines), `CRONREPO_LOG_LEVEL`. Unparsable
/// values are logged and ignored.
pub fn apply_env_overrides_with(
    mut config: CronConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> CronConfig {
    if let Some(raw) = lookup("CRONREPO_CLIENT") {
        match raw.parse() {
            Ok(client) => config.client = client,
            Err(e) => warn!(value = %raw, error = %e, "ignoring CRONREPO_CLIENT"),
        }
    }
    if let Some(raw) = lookup("CRONREPO_THREAD_COUNT") {
        match raw.trim().parse::<usize>() {
            Ok(n) => config.trigger.thread_count = n,
            Err(e) => warn!(value = %raw, error = %e, "ignoring CRONREPO_THREAD_COUNT"),
        }
    }
    if let Some(zone) = lookup("CRONREPO_TIMEZONE") {
        config.trigger.timezone = Some(zone.clone());
        config.runner.timezone = Some(zone);
    }
    if let Some(level) = lookup("CRONREPO_LOG_LEVEL") {
        config.logging.level = level;
    }
    config
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<CronConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::schema::ClientType, std::io::Write};

    fn write_config(name: &str, body: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_toml() {
        let (_dir, path) = write_config(
            "cronrepo.toml",
            r#"
client = "runner"

[trigger]
thread_count = 4

[trigger.properties]
"scheduler.instanceName" = "Billing"
"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.client, ClientType::Runner);
        assert_eq!(cfg.trigger.thread_count, 4);
        assert_eq!(
            cfg.trigger
                .properties
                .get("scheduler.instanceName")
                .map(String::as_str),
            Some("Billing")
        );
    }

    #[test]
    fn loads_yaml() {
        let (_dir, path) = write_config(
            "cronrepo.yaml",
            "client: trigger\ntrigger:\n  timezone: Europe/Paris\nlogging:\n  json: true\n",
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.trigger.timezone.as_deref(), Some("Europe/Paris"));
        assert!(cfg.logging.json);
    }

    #[test]
    fn loads_json() {
        let (_dir, path) = write_config("cronrepo.json", r#"{"runner": {"timezone": "UTC"}}"#);
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.client, ClientType::Trigger);
        assert_eq!(cfg.runner.timezone.as_deref(), Some("UTC"));
    }

    #[test]
    fn rejects_unknown_extension() {
        let (_dir, path) = write_config("cronrepo.ini", "client=runner");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(&dir.path().join("nope.toml")).is_err());
    }

    #[test]
    fn env_overrides() {
        let lookup = |name: &str| match name {
            "CRONREPO_CLIENT" => Some("runner".to_string()),
            "CRONREPO_THREAD_COUNT" => Some("16".to_string()),
            "CRONREPO_TIMEZONE" => Some("Asia/Tokyo".to_string()),
            "CRONREPO_LOG_LEVEL" => Some("debug".to_string()),
            _ => None,
        };
        let cfg = apply_env_overrides_with(CronConfig::default(), lookup);
        assert_eq!(cfg.client, ClientType::Runner);
        assert_eq!(cfg.trigger.thread_count, 16);
        assert_eq!(cfg.trigger.timezone.as_deref(), Some("Asia/Tokyo"));
        assert_eq!(cfg.runner.timezone.as_deref(), Some("Asia/Tokyo"));
        assert_eq!(cfg.logging.level, "debug");
    }

    #[test]
    fn bad_env_values_are_ignored() {
        let lookup = |name: &str| match name {
            "CRONREPO_CLIENT" => Some("mainframe".to_string()),
            "CRONREPO_THREAD_COUNT" => Some("lots".to_string()),
            _ => None,
        };
        let cfg = apply_env_overrides_with(CronConfig::default(), lookup);
        assert_eq!(cfg, CronConfig::default());
    }
}
