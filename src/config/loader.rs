//! Configuration loading and environment parsing.

use super::validation::validate_config;
use super::Config;
use serde_json::{Map, Value};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "SIGNAL_RELAY__";

/// Load configuration with the following precedence (highest first):
/// 1) `SIGNAL_RELAY_CONFIG_JSON` env var containing raw JSON
/// 2) If `SIGNAL_RELAY_CONFIG_STDIN=true/1`, read JSON from stdin
/// 3) File pointed by `SIGNAL_RELAY_CONFIG_PATH` env var
/// 4) config.json in current working directory
/// 5) config.json next to the executable
/// 6) Defaults compiled into the binary
///
/// `PORT`, then `PEERJS_PORT`, replace the port from those sources. Individual
/// fields can then be overridden with the `SIGNAL_RELAY` prefix and `__` as the
/// nested separator, e.g. `SIGNAL_RELAY__SERVER__MAX_MESSAGE_SIZE=1024`.
///
/// Read and parse errors are printed to stderr and the affected source is
/// skipped. Validation errors are printed but not returned; callers that need a
/// hard failure run [`validate_config`] themselves.
#[must_use]
pub fn load() -> Config {
    use std::io::Read;

    let defaults = Config::default();
    let mut merged = serde_json::to_value(&defaults).unwrap_or_else(|_| Value::Object(Map::new()));

    // Lowest precedence first so later sources overwrite earlier ones.
    if let Ok(exe_path) = env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            merge_file_source(&mut merged, &exe_dir.join("config.json"));
        }
    }

    merge_file_source(&mut merged, &PathBuf::from("config.json"));

    if let Ok(path) = env::var("SIGNAL_RELAY_CONFIG_PATH") {
        merge_file_source(&mut merged, &PathBuf::from(path));
    }

    if env::var("SIGNAL_RELAY_CONFIG_STDIN").is_ok_and(|val| env_var_truthy(&val)) {
        let mut buf = String::new();
        if let Err(e) = std::io::stdin().read_to_string(&mut buf) {
            eprintln!("Failed to read config from stdin: {e}");
        } else if let Some(value) = parse_json_document(&buf, "stdin") {
            merge_values(&mut merged, value);
        }
    }

    if let Ok(json) = env::var("SIGNAL_RELAY_CONFIG_JSON") {
        if let Some(value) = parse_json_document(&json, "SIGNAL_RELAY_CONFIG_JSON") {
            merge_values(&mut merged, value);
        }
    }

    apply_port_overrides(&mut merged);
    apply_env_overrides(&mut merged);

    let config = match serde_json::from_value::<Config>(merged) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to deserialize config; using defaults: {e}");
            defaults
        }
    };

    // Warn-only here; main.rs validates again and fails hard.
    if let Err(e) = validate_config(&config) {
        eprintln!("Configuration validation error: {e}");
    }

    config
}

fn parse_json_document(raw: &str, label: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }

    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            eprintln!("Failed to parse config from {label}: {err}");
            None
        }
    }
}

fn merge_file_source(target: &mut Value, path: &Path) {
    if path.as_os_str().is_empty() || !path.exists() {
        return;
    }

    match fs::read_to_string(path) {
        Ok(contents) => {
            if let Some(value) = parse_json_document(&contents, &format!("file {}", path.display()))
            {
                merge_values(target, value);
            }
        }
        Err(err) => {
            eprintln!("Failed to read config from {}: {}", path.display(), err);
        }
    }
}

pub(crate) fn merge_values(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            for (key, value) in source_map {
                match target_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        target_map.insert(key, value);
                    }
                }
            }
        }
        (target_slot, source_value) => {
            *target_slot = source_value;
        }
    }
}

fn apply_port_overrides(root: &mut Value) {
    for key in ["PORT", "PEERJS_PORT"] {
        let Ok(raw) = env::var(key) else {
            continue;
        };
        match raw.trim().parse::<u16>() {
            Ok(port) => set_nested_value(root, &["port".to_string()], Value::from(port)),
            Err(err) => eprintln!("Ignoring {key}={raw}: {err}"),
        }
    }
}

fn apply_env_overrides(root: &mut Value) {
    for (key, raw_value) in env::vars() {
        let Some(stripped) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };

        let segments: Vec<String> = stripped
            .split("__")
            .filter(|segment| !segment.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();

        if segments.is_empty() {
            continue;
        }

        set_nested_value(root, &segments, parse_env_value(&raw_value));
    }
}

fn env_var_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

pub(crate) fn parse_env_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.contains(',') {
        return Value::Array(
            trimmed
                .split(',')
                .map(|segment| parse_scalar(segment.trim()))
                .collect(),
        );
    }

    parse_scalar(trimmed)
}

fn parse_scalar(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::String(String::new());
    }

    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub(crate) fn set_nested_value(target: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *target = value;
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        let entry = map.entry(head.clone()).or_insert(Value::Null);
        set_nested_value(entry, rest, value);
    }
}
