use std::fs;
use std::path::Path;

use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// Errors returned when loading or overriding configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("no \"=\" in \"{arg}\"")]
    MissingSeparator { arg: String },
}

/// Load a YAML config file. An empty file yields an empty mapping.
pub fn load_config(path: &Path) -> Result<Value, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&raw, path.display().to_string())
}

fn parse_config(raw: &str, path: String) -> Result<Value, ConfigError> {
    let value: Value =
        serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse { path, source })?;
    Ok(match value {
        Value::Null => Value::Mapping(Mapping::new()),
        other => other,
    })
}

/// Merge `overlay` over `base`. Nested mappings merge key by key; any other
/// value in `overlay` replaces the one in `base`.
pub fn merge_config(base: &mut Value, overlay: Value) {
    let Value::Mapping(overlay) = overlay else {
        *base = overlay;
        return;
    };
    if !base.is_mapping() {
        *base = Value::Mapping(Mapping::new());
    }
    let Value::Mapping(base_map) = base else {
        return;
    };
    for (key, value) in overlay {
        let nested = value.is_mapping() && base_map.get(&key).is_some_and(Value::is_mapping);
        if !nested {
            base_map.insert(key, value);
        } else if let Some(existing) = base_map.get_mut(&key) {
            merge_config(existing, value);
        }
    }
}

/// Turn `a/b/c=value` into `{a: {b: {c: value}}}`.
pub fn cmdarg_to_config(arg: &str) -> Result<Value, ConfigError> {
    let (key, val) = arg
        .split_once('=')
        .ok_or_else(|| ConfigError::MissingSeparator {
            arg: arg.to_string(),
        })?;

    let mut value = Value::String(val.to_string());
    for item in key.rsplit('/') {
        let mut map = Mapping::new();
        map.insert(Value::String(item.to_string()), value);
        value = Value::Mapping(map);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).expect("yaml")
    }

    #[test]
    fn cmdarg_builds_nested_mapping() {
        let cfg = cmdarg_to_config("network/version=1").expect("cmdarg");
        assert_eq!(cfg, yaml("network:\n  version: '1'\n"));
    }

    #[test]
    fn cmdarg_keeps_equals_in_value() {
        let cfg = cmdarg_to_config("a=b=c").expect("cmdarg");
        assert_eq!(cfg, yaml("a: b=c\n"));
    }

    #[test]
    fn cmdarg_without_separator_names_argument() {
        let err = cmdarg_to_config("network/version").expect_err("should fail");
        assert_eq!(err.to_string(), "no \"=\" in \"network/version\"");
    }

    #[test]
    fn merge_is_recursive() {
        let mut base = yaml("a:\n  b: 1\n  c: 2\nd: 3\n");
        merge_config(&mut base, yaml("a:\n  c: 5\n  e: 6\nd: [1]\n"));
        assert_eq!(base, yaml("a:\n  b: 1\n  c: 5\n  e: 6\nd: [1]\n"));
    }

    #[test]
    fn empty_file_is_empty_mapping() {
        let value = parse_config("", "test".to_string()).expect("parse");
        assert_eq!(value, Value::Mapping(Mapping::new()));
    }
}
