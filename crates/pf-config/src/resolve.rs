//! Configuration resolution and path discovery.
//!
//! Resolution order: CLI arguments → environment variables → XDG paths → system → defaults.

use std::path::{Path, PathBuf};

/// Where a configuration file was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via environment variable.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,

    /// Found in /etc/pfinder/.
    SystemConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::SystemConfig => write!(f, "system config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Discovered configuration file path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigPath {
    /// Path to config.json (or None if using defaults).
    pub path: Option<PathBuf>,

    /// Where the path came from.
    pub source: ConfigSource,
}

/// Environment variable names.
pub const ENV_CONFIG_PATH: &str = "PFINDER_CONFIG";
pub const ENV_CONFIG_DIR: &str = "PFINDER_CONFIG_DIR";

/// Standard config file name.
const CONFIG_FILENAME: &str = "config.json";

/// Application name for XDG directories.
const APP_NAME: &str = "pfinder";

/// Resolve the configuration file path.
///
/// Resolution order:
/// 1. Explicit CLI path (always honored, even when missing, so the loader can report it)
/// 2. `PFINDER_CONFIG` environment variable
/// 3. `PFINDER_CONFIG_DIR` environment variable + filename
/// 4. XDG config directory (~/.config/pfinder/)
/// 5. System config (/etc/pfinder/)
/// 6. Built-in defaults (None)
pub fn resolve_config(cli_path: Option<&Path>) -> ConfigPath {
    resolve_with(
        cli_path,
        std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from),
        std::env::var(ENV_CONFIG_DIR).ok().map(PathBuf::from),
        xdg_config_dir(),
        system_config_dir(),
    )
}

fn resolve_with(
    cli_path: Option<&Path>,
    env_path: Option<PathBuf>,
    env_dir: Option<PathBuf>,
    xdg_dir: Option<PathBuf>,
    system_dir: PathBuf,
) -> ConfigPath {
    // 1. CLI argument
    if let Some(path) = cli_path {
        return ConfigPath {
            path: Some(path.to_path_buf()),
            source: ConfigSource::CliArgument,
        };
    }

    // 2. Environment variable (direct path)
    if let Some(path) = env_path {
        if path.exists() {
            return ConfigPath {
                path: Some(path),
                source: ConfigSource::Environment,
            };
        }
    }

    // 3. Environment variable (config dir)
    if let Some(dir) = env_dir {
        let path = dir.join(CONFIG_FILENAME);
        if path.exists() {
            return ConfigPath {
                path: Some(path),
                source: ConfigSource::Environment,
            };
        }
    }

    // 4. XDG config directory
    if let Some(dir) = xdg_dir {
        let path = dir.join(CONFIG_FILENAME);
        if path.exists() {
            return ConfigPath {
                path: Some(path),
                source: ConfigSource::XdgConfig,
            };
        }
    }

    // 5. System config
    let system_path = system_dir.join(CONFIG_FILENAME);
    if system_path.exists() {
        return ConfigPath {
            path: Some(system_path),
            source: ConfigSource::SystemConfig,
        };
    }

    // 6. Built-in default
    ConfigPath::default()
}

/// Get the XDG config directory for pfinder.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Get the system config directory.
pub fn system_config_dir() -> PathBuf {
    PathBuf::from("/etc").join(APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_config_source_display() {
        assert_eq!(format!("{}", ConfigSource::CliArgument), "CLI argument");
        assert_eq!(
            format!("{}", ConfigSource::Environment),
            "environment variable"
        );
        assert_eq!(format!("{}", ConfigSource::XdgConfig), "XDG config");
        assert_eq!(format!("{}", ConfigSource::SystemConfig), "system config");
        assert_eq!(
            format!("{}", ConfigSource::BuiltinDefault),
            "builtin default"
        );
    }

    #[test]
    fn test_cli_path_wins_even_when_missing() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let resolved = resolve_with(
            Some(missing.as_path()),
            None,
            None,
            None,
            dir.path().join("etc"),
        );
        assert_eq!(resolved.path, Some(missing));
        assert_eq!(resolved.source, ConfigSource::CliArgument);
    }

    #[test]
    fn test_env_path_requires_existing_file() {
        let dir = tempdir().unwrap();
        let env_file = dir.path().join("env.json");

        let resolved = resolve_with(
            None,
            Some(env_file.clone()),
            None,
            None,
            dir.path().join("etc"),
        );
        assert_eq!(resolved, ConfigPath::default());

        fs::write(&env_file, "{}").unwrap();
        let resolved = resolve_with(None, Some(env_file.clone()), None, None, dir.path().join("etc"));
        assert_eq!(resolved.path, Some(env_file));
        assert_eq!(resolved.source, ConfigSource::Environment);
    }

    #[test]
    fn test_xdg_before_system() {
        let dir = tempdir().unwrap();
        let xdg = dir.path().join("xdg");
        let system = dir.path().join("etc");
        fs::create_dir_all(&xdg).unwrap();
        fs::create_dir_all(&system).unwrap();
        fs::write(system.join(CONFIG_FILENAME), "{}").unwrap();

        let resolved = resolve_with(None, None, None, Some(xdg.clone()), system.clone());
        assert_eq!(resolved.source, ConfigSource::SystemConfig);

        fs::write(xdg.join(CONFIG_FILENAME), "{}").unwrap();
        let resolved = resolve_with(None, None, None, Some(xdg.clone()), system);
        assert_eq!(resolved.source, ConfigSource::XdgConfig);
        assert_eq!(resolved.path, Some(xdg.join(CONFIG_FILENAME)));
    }

    #[test]
    fn test_env_dir_lookup() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "{}").unwrap();
        let resolved = resolve_with(
            None,
            None,
            Some(dir.path().to_path_buf()),
            None,
            dir.path().join("etc"),
        );
        assert_eq!(resolved.source, ConfigSource::Environment);
    }

    #[test]
    fn test_system_config_dir() {
        assert_eq!(system_config_dir(), PathBuf::from("/etc/pfinder"));
    }
}
