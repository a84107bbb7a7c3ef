//! Value encoding shared by the storage backends
//!
//! Values are stored as JSON scalars under `prefix + key`.

use crate::contract::SettingValue;
use anyhow::{bail, Context, Result};

/// Persisted entry name for a setting key
pub fn entry_key(prefix: &str, key: &str) -> String {
    format!("{prefix}{key}")
}

/// Encode a value as a JSON scalar; non-finite numbers have no encoding
pub fn encode_value(value: &SettingValue) -> Result<String> {
    if let SettingValue::Number(n) = value {
        if !n.is_finite() {
            bail!("cannot encode non-finite number {n}");
        }
    }
    serde_json::to_string(value).context("encoding setting value")
}

/// Decode a persisted entry; `None` when the bytes are not a valid value
pub fn decode_value(raw: &[u8]) -> Option<SettingValue> {
    serde_json::from_slice(raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_key() {
        assert_eq!(entry_key("settings:", "audio.volume"), "settings:audio.volume");
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert_eq!(decode_value(b"42"), Some(SettingValue::Number(42.0)));
        assert_eq!(decode_value(b"\"hi\""), Some(SettingValue::from("hi")));
        assert!(decode_value(b"{not json").is_none());
        assert!(decode_value(b"null").is_none());
        assert!(decode_value(b"[1,2]").is_none());
    }

    #[test]
    fn test_encode_is_json_scalar() {
        assert_eq!(encode_value(&SettingValue::Bool(false)).unwrap(), "false");
        assert_eq!(encode_value(&SettingValue::from("a")).unwrap(), "\"a\"");
    }

    #[test]
    fn test_encode_rejects_non_finite() {
        assert!(encode_value(&SettingValue::Number(f64::INFINITY)).is_err());
        assert!(encode_value(&SettingValue::Number(f64::NAN)).is_err());
        assert_eq!(encode_value(&SettingValue::Number(1.5)).unwrap(), "1.5");
    }
}
