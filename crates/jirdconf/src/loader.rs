//! Config file discovery, loading, and environment variable overlay.

use crate::{parse_programs, ConfigError, JirdConfig, PartConfig};
use jird::TuningMethod;
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided it replaces the local override. It is returned
/// even when missing, so that loading it reports the problem.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/jird/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("jird/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        files.push(expand_path(&path.to_string_lossy()));
        return files;
    }

    let local = PathBuf::from("jird.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Values set by one config file. Unset keys leave lower layers alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigLayer {
    pub t: Option<f64>,
    pub f: Option<f64>,
    pub tuning_method: Option<TuningMethod>,
    pub pitch_bend_range: Option<u32>,
    pub edo: Option<u32>,
    pub verbose: Option<bool>,
    pub parts: Option<Vec<PartConfig>>,
}

impl ConfigLayer {
    /// Overlay this layer on `config`.
    pub fn apply_to(&self, config: &mut JirdConfig) {
        if let Some(t) = self.t {
            config.t = t;
        }
        if let Some(f) = self.f {
            config.f = f;
        }
        if let Some(tuning_method) = self.tuning_method {
            config.tuning_method = tuning_method;
        }
        if let Some(range) = self.pitch_bend_range {
            config.pitch_bend_range = range;
        }
        if let Some(edo) = self.edo {
            config.edo = Some(edo);
        }
        if let Some(verbose) = self.verbose {
            config.verbose = verbose;
        }
        if let Some(parts) = &self.parts {
            config.parts = parts.clone();
        }
    }
}

/// Load config from a TOML file.
pub fn load_from_file(path: &Path) -> Result<ConfigLayer, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_toml(&contents, path)
}

/// Parse config from TOML string.
pub(crate) fn parse_toml(contents: &str, path: &Path) -> Result<ConfigLayer, ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut layer = ConfigLayer {
        t: number(&table, "t")?,
        f: number(&table, "f")?,
        pitch_bend_range: integer(&table, "pitch_bend_range")?,
        edo: integer(&table, "edo")?,
        ..ConfigLayer::default()
    };

    if let Some(value) = table.get("tuning_method") {
        let name = value
            .as_str()
            .ok_or_else(|| ConfigError::invalid("tuning_method", "expected a string"))?;
        layer.tuning_method = Some(
            name.parse()
                .map_err(|message: String| ConfigError::invalid("tuning_method", message))?,
        );
    }

    if let Some(value) = table.get("verbose") {
        layer.verbose = Some(
            value
                .as_bool()
                .ok_or_else(|| ConfigError::invalid("verbose", "expected true or false"))?,
        );
    }

    // [[parts]] wins over the programs shorthand
    if let Some(value) = table.get("parts") {
        let parts = value
            .as_array()
            .ok_or_else(|| ConfigError::invalid("parts", "expected an array of tables"))?;
        layer.parts = Some(
            parts
                .iter()
                .map(|part| {
                    let part = part
                        .as_table()
                        .ok_or_else(|| ConfigError::invalid("parts", "expected a table"))?;
                    Ok(PartConfig {
                        program: integer(part, "program")?,
                    })
                })
                .collect::<Result<_, ConfigError>>()?,
        );
    } else if let Some(value) = table.get("programs") {
        let programs = match value {
            toml::Value::String(s) => s.clone(),
            toml::Value::Integer(i) => i.to_string(),
            _ => return Err(ConfigError::invalid("programs", "expected a list like \"47,48\"")),
        };
        layer.parts = Some(parse_programs(&programs)?);
    }

    Ok(layer)
}

fn number(table: &toml::Table, key: &str) -> Result<Option<f64>, ConfigError> {
    match table.get(key) {
        None => Ok(None),
        Some(toml::Value::Float(x)) => Ok(Some(*x)),
        Some(toml::Value::Integer(i)) => Ok(Some(*i as f64)),
        Some(_) => Err(ConfigError::invalid(key, "expected a number")),
    }
}

fn integer<T: TryFrom<i64>>(table: &toml::Table, key: &str) -> Result<Option<T>, ConfigError> {
    match table.get(key) {
        None => Ok(None),
        Some(toml::Value::Integer(i)) => T::try_from(*i)
            .map(Some)
            .map_err(|_| ConfigError::invalid(key, format!("{} is out of range", i))),
        Some(_) => Err(ConfigError::invalid(key, "expected an integer")),
    }
}

fn env_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::invalid(key, format!("'{}': {}", value, e)))
}

/// Apply environment variable overrides to config.
///
/// `env` looks a variable up; pass `|key| std::env::var(key).ok()` for the
/// process environment.
pub fn apply_env_overrides(
    config: &mut JirdConfig,
    sources: &mut ConfigSources,
    env: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(v) = env("JIRD_T") {
        config.t = env_value("JIRD_T", &v)?;
        sources.env_overrides.push("JIRD_T".to_string());
    }
    if let Some(v) = env("JIRD_F") {
        config.f = env_value("JIRD_F", &v)?;
        sources.env_overrides.push("JIRD_F".to_string());
    }
    if let Some(v) = env("JIRD_TUNING_METHOD") {
        config.tuning_method = v
            .trim()
            .parse()
            .map_err(|message: String| ConfigError::invalid("JIRD_TUNING_METHOD", message))?;
        sources.env_overrides.push("JIRD_TUNING_METHOD".to_string());
    }
    if let Some(v) = env("JIRD_PITCH_BEND_RANGE") {
        config.pitch_bend_range = env_value("JIRD_PITCH_BEND_RANGE", &v)?;
        sources.env_overrides.push("JIRD_PITCH_BEND_RANGE".to_string());
    }
    if let Some(v) = env("JIRD_EDO") {
        config.edo = Some(env_value("JIRD_EDO", &v)?);
        sources.env_overrides.push("JIRD_EDO".to_string());
    }
    if let Some(v) = env("JIRD_VERBOSE") {
        config.verbose = match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "" | "0" | "false" | "no" | "off" => false,
            _ => {
                return Err(ConfigError::invalid(
                    "JIRD_VERBOSE",
                    format!("'{}' is not a boolean", v),
                ))
            }
        };
        sources.env_overrides.push("JIRD_VERBOSE".to_string());
    }
    Ok(())
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            home.join(stripped)
        } else {
            PathBuf::from(path)
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // $VAR/rest/of/path
        if let Some(slash_pos) = stripped.find('/') {
            let var_name = &stripped[..slash_pos];
            if let Ok(var_value) = env::var(var_name) {
                PathBuf::from(var_value).join(&stripped[slash_pos + 1..])
            } else {
                PathBuf::from(path)
            }
        } else {
            env::var(stripped)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(path))
        }
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_expand_path_tilde() {
        let expanded = expand_path("~/test/path");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_expand_path_absolute() {
        let expanded = expand_path("/absolute/path");
        assert_eq!(expanded, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_discover_config_files() {
        // Just verify it doesn't panic
        let _files = discover_config_files();
    }

    #[test]
    fn test_cli_path_is_always_returned() {
        let files = discover_config_files_with_override(Some(Path::new("/no/such/jird.toml")));
        assert_eq!(files.last(), Some(&PathBuf::from("/no/such/jird.toml")));
    }

    #[test]
    fn test_parse_minimal_toml() {
        let layer = parse_toml("f = 264\n", Path::new("test.toml")).unwrap();
        assert_eq!(
            layer,
            ConfigLayer {
                f: Some(264.0),
                ..ConfigLayer::default()
            }
        );
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
t = 0.25
f = 220.5
tuning_method = "pitch_bend"
pitch_bend_range = 12
edo = 31
verbose = true

[[parts]]
program = 47

[[parts]]
"#;
        let layer = parse_toml(toml, Path::new("test.toml")).unwrap();
        assert_eq!(
            layer,
            ConfigLayer {
                t: Some(0.25),
                f: Some(220.5),
                tuning_method: Some(TuningMethod::PitchBend),
                pitch_bend_range: Some(12),
                edo: Some(31),
                verbose: Some(true),
                parts: Some(vec![PartConfig { program: Some(47) }, PartConfig::default()]),
            }
        );
    }

    #[test]
    fn test_parts_win_over_programs() {
        let toml = r#"
programs = "1,2,3"

[[parts]]
program = 5
"#;
        let layer = parse_toml(toml, Path::new("test.toml")).unwrap();
        assert_eq!(layer.parts, Some(vec![PartConfig { program: Some(5) }]));

        let layer = parse_toml("programs = \"47,48\"", Path::new("test.toml")).unwrap();
        assert_eq!(
            layer.parts,
            Some(vec![
                PartConfig { program: Some(47) },
                PartConfig { program: Some(48) },
            ])
        );
    }

    #[test]
    fn test_parse_errors() {
        let err = parse_toml("t = [", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let cases = [
            ("t = \"fast\"", "t"),
            ("edo = 1.5", "edo"),
            ("edo = -12", "edo"),
            ("tuning_method = \"equal\"", "tuning_method"),
            ("verbose = 1", "verbose"),
            ("[[parts]]\nprogram = 300", "program"),
        ];
        for (toml, expected) in cases {
            match parse_toml(toml, Path::new("bad.toml")) {
                Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, expected, "{}", toml),
                other => panic!("{}: expected an invalid {}, got {:?}", toml, expected, other),
            }
        }
    }

    #[test]
    fn test_later_files_win() {
        let dir = tempfile::tempdir().unwrap();
        let system = write_config(&dir, "system.toml", "f = 264\nt = 1\nedo = 12\n");
        let local = write_config(&dir, "local.toml", "t = 0.25\ntuning_method = \"PITCH_BEND\"\n");

        let (config, sources) =
            JirdConfig::load_files(&[system.clone(), local.clone()], no_env).unwrap();
        assert_eq!(config.f, 264.0);
        assert_eq!(config.t, 0.25);
        assert_eq!(config.edo, Some(12));
        assert_eq!(config.tuning_method, TuningMethod::PitchBend);
        assert_eq!(sources.files, vec![system, local]);
        assert!(sources.env_overrides.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = JirdConfig::load_files(&[missing], no_env).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn test_invalid_values_fail_after_merge() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "jird.toml", "pitch_bend_range = 0\n");
        let err = JirdConfig::load_files(&[path], no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == "pitch_bend_range"));
    }

    #[test]
    fn test_env_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "jird.toml", "f = 264\nt = 1\n");
        let env: HashMap<&str, &str> = [
            ("JIRD_T", "0.75"),
            ("JIRD_EDO", "19"),
            ("JIRD_TUNING_METHOD", "pitch_bend"),
            ("JIRD_VERBOSE", "yes"),
        ]
        .into_iter()
        .collect();

        let (config, sources) =
            JirdConfig::load_files(&[path], |key| env.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.f, 264.0);
        assert_eq!(config.t, 0.75);
        assert_eq!(config.edo, Some(19));
        assert_eq!(config.tuning_method, TuningMethod::PitchBend);
        assert!(config.verbose);
        assert_eq!(
            sources.env_overrides,
            vec!["JIRD_T", "JIRD_TUNING_METHOD", "JIRD_EDO", "JIRD_VERBOSE"]
        );
    }

    #[test]
    fn test_bad_env_value() {
        let err = JirdConfig::load_files(&[], |key| {
            (key == "JIRD_PITCH_BEND_RANGE").then(|| "wide".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == "JIRD_PITCH_BEND_RANGE"));
    }
}
