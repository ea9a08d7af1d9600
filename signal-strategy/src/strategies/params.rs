//! Small helpers for pulling typed parameters out of a catalog row's
//! `params` JSON blob, with a default when the key is absent or malformed.

use serde_json::Value;

pub fn usize_param(params: &Value, key: &str, default: usize) -> usize {
    params
        .get(key)
        .and_then(Value::as_u64)
        .map(|v| v as usize)
        .unwrap_or(default)
}

pub fn f64_param(params: &Value, key: &str, default: f64) -> f64 {
    params.get(key).and_then(Value::as_f64).unwrap_or(default)
}

pub fn sma_over(series: &[f64]) -> f64 {
    series.iter().sum::<f64>() / series.len() as f64
}
