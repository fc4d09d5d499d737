use anyhow::{anyhow, Result};
use std::collections::HashMap;

/// Get a parameter value with a default fallback
pub fn get_param(params: &HashMap<String, f64>, key: &str, default: f64) -> f64 {
    params.get(key).copied().unwrap_or(default)
}

/// Extract a parameter as usize, rounded, with a minimum value and finite check
pub fn get_param_usize_at_least(
    params: &HashMap<String, f64>,
    key: &str,
    default: usize,
    min: usize,
) -> usize {
    let raw = params.get(key).copied().unwrap_or(default as f64);
    if !raw.is_finite() {
        return default.max(min);
    }
    raw.round().max(min as f64) as usize
}

/// Extract a parameter as f64, clamped to a range with finite checks
pub fn get_param_f64_clamped(
    params: &HashMap<String, f64>,
    key: &str,
    default: f64,
    min: f64,
    max: f64,
) -> f64 {
    let raw = params.get(key).copied().unwrap_or(default);
    if !raw.is_finite() {
        return default;
    }
    raw.clamp(min, max)
}

pub fn coerce_binary_param(value: f64, default: f64) -> f64 {
    if !value.is_finite() {
        return default;
    }

    if value >= 0.5 {
        1.0
    } else {
        0.0
    }
}

/// Parses a `key=value` pair as passed on the command line.
pub fn parse_parameter_pair(raw: &str) -> Result<(String, f64)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("Parameter '{}' must be in key=value form", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(anyhow!("Parameter '{}' has an empty key", raw));
    }
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|_| anyhow!("Parameter {} must be a number (value: {})", key, value))?;
    if !value.is_finite() {
        return Err(anyhow!("Parameter {} must be finite", key));
    }
    Ok((key.to_string(), value))
}
