//! Asset metadata

use crate::error::SatchelError;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scalar key/value metadata attached to a stored asset.
///
/// Values are TOML scalars (strings, integers, floats, booleans, datetimes)
/// so the map serializes straight into sidecar files. Arrays and tables are
/// rejected. Image assets carry `width` and `height`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, toml::Value>);

mod sealed {
    pub trait Sealed {}
}

/// Rust values that always convert to a scalar metadata value
pub trait Scalar: Into<toml::Value> + sealed::Sealed {}

macro_rules! scalar {
    ($($ty:ty),*) => {
        $(
            impl sealed::Sealed for $ty {}
            impl Scalar for $ty {}
        )*
    };
}

scalar!(i64, i32, u32, u8, f64, bool, String, toml::value::Datetime);

impl sealed::Sealed for &str {}
impl Scalar for &str {}

/// True for every TOML value except arrays and tables
pub fn is_scalar(value: &toml::Value) -> bool {
    !matches!(value, toml::Value::Array(_) | toml::Value::Table(_))
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata holding just `width` and `height`
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        let mut meta = Self::new();
        meta.insert("width", i64::from(width));
        meta.insert("height", i64::from(height));
        meta
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Scalar) {
        self.0.insert(key.into(), value.into());
    }

    /// Insert an already-built TOML value, rejecting arrays and tables
    pub fn try_insert(&mut self, key: impl Into<String>, value: toml::Value) -> crate::Result<()> {
        let key = key.into();
        if !is_scalar(&value) {
            return Err(SatchelError::Metadata(format!(
                "Value for '{}' must be a scalar, got {}",
                key,
                value.type_str()
            )));
        }
        self.0.insert(key, value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.0.get(key)
    }

    /// Read a non-negative integer value that fits in a `u32`
    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.0
            .get(key)
            .and_then(|v| v.as_integer())
            .and_then(|v| u32::try_from(v).ok())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    pub fn remove(&mut self, key: &str) -> Option<toml::Value> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &toml::Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a `key=value` pair, typing the value as an integer, float or
    /// boolean when it parses as one and as a string otherwise
    pub fn parse_pair(pair: &str) -> Option<(String, toml::Value)> {
        let (key, raw) = pair.split_once('=')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        let raw = raw.trim();
        let value = if let Ok(i) = raw.parse::<i64>() {
            toml::Value::Integer(i)
        } else if let Ok(f) = raw.parse::<f64>() {
            toml::Value::Float(f)
        } else if let Ok(b) = raw.parse::<bool>() {
            toml::Value::Boolean(b)
        } else {
            toml::Value::String(raw.to_string())
        };
        Some((key.to_string(), value))
    }
}

impl<'de> Deserialize<'de> for Metadata {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<String, toml::Value>::deserialize(deserializer)?;
        if let Some((key, value)) = map.iter().find(|(_, v)| !is_scalar(v)) {
            return Err(de::Error::custom(format!(
                "metadata value for '{}' must be a scalar, got {}",
                key,
                value.type_str()
            )));
        }
        Ok(Self(map))
    }
}

impl<K: Into<String>, V: Scalar> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions() {
        let meta = Metadata::with_dimensions(100, 80);
        assert_eq!(meta.get_u32("width"), Some(100));
        assert_eq!(meta.get_u32("height"), Some(80));
        assert_eq!(meta.len(), 2);
    }

    #[test]
    fn test_get_u32_rejects_negative() {
        let mut meta = Metadata::new();
        meta.insert("width", -5i64);
        assert_eq!(meta.get_u32("width"), None);
        assert_eq!(meta.get_u32("missing"), None);
    }

    #[test]
    fn test_parse_pair_types() {
        let (k, v) = Metadata::parse_pair("width=100").unwrap();
        assert_eq!(k, "width");
        assert_eq!(v, toml::Value::Integer(100));

        let (_, v) = Metadata::parse_pair("ratio=1.5").unwrap();
        assert_eq!(v, toml::Value::Float(1.5));

        let (_, v) = Metadata::parse_pair("public=true").unwrap();
        assert_eq!(v, toml::Value::Boolean(true));

        let (_, v) = Metadata::parse_pair("title = a cat").unwrap();
        assert_eq!(v, toml::Value::String("a cat".to_string()));

        assert!(Metadata::parse_pair("novalue").is_none());
        assert!(Metadata::parse_pair("=1").is_none());
    }

    #[test]
    fn test_rejects_non_scalars() {
        let mut meta = Metadata::new();
        let err = meta
            .try_insert("tags", toml::Value::Array(vec![toml::Value::from("a")]))
            .unwrap_err();
        assert!(matches!(err, SatchelError::Metadata(_)));
        assert!(meta.is_empty());

        meta.try_insert("title", toml::Value::from("cat")).unwrap();
        assert_eq!(meta.get_str("title"), Some("cat"));

        let parsed: std::result::Result<Metadata, _> = toml::from_str("[nested]\nkey = 1\n");
        assert!(parsed.is_err());
        let parsed: std::result::Result<Metadata, _> = toml::from_str("sizes = [1, 2]\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let meta: Metadata = [("width", 10i64), ("height", 20i64)].into_iter().collect();
        let text = toml::to_string(&meta).unwrap();
        let parsed: Metadata = toml::from_str(&text).unwrap();
        assert_eq!(parsed, meta);
    }
}
