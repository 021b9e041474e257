//! Allow-list configuration.

use serde::{Deserialize, Deserializer};

/// Allow-list configuration. An empty list disables that dimension.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Only admit messages from these client identifiers.
    pub client_ids: ListSetting,
    /// Only admit messages published to these topics.
    pub topics: ListSetting,
    /// Only admit messages whose payload contains one of these keywords.
    pub payload_keywords: ListSetting,
}

/// A list setting given either as a comma-separated string or as an array.
///
/// Entries are trimmed and empty entries are dropped, so a malformed value
/// such as `",,"` normalizes to an empty (disabled) list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListSetting(Vec<String>);

impl ListSetting {
    /// Build from a comma-separated string.
    pub fn from_csv(value: &str) -> Self {
        Self::from_entries(value.split(','))
    }

    /// Build from individual entries.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            entries
                .into_iter()
                .map(|s| s.as_ref().trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }

    pub fn entries(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for ListSetting {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Environment overrides arrive type-inferred, so `1234` or `true`
        // must still read as a single entry.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Scalar {
            Text(String),
            Int(i64),
            UInt(u64),
            Float(f64),
            Bool(bool),
        }

        impl Scalar {
            fn into_text(self) -> String {
                match self {
                    Scalar::Text(s) => s,
                    Scalar::Int(n) => n.to_string(),
                    Scalar::UInt(n) => n.to_string(),
                    Scalar::Float(n) => n.to_string(),
                    Scalar::Bool(b) => b.to_string(),
                }
            }
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Csv(Scalar),
            List(Vec<Scalar>),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Csv(value) => ListSetting::from_csv(&value.into_text()),
            Raw::List(items) => {
                let items: Vec<String> = items.into_iter().map(Scalar::into_text).collect();
                ListSetting::from_entries(items.iter().flat_map(|s| s.split(',')))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_trims_and_drops_empty() {
        let list = ListSetting::from_csv(" sensor1 ,, sensor2,");
        assert_eq!(list.entries(), ["sensor1", "sensor2"]);
    }

    #[test]
    fn test_blank_csv_is_disabled() {
        assert!(ListSetting::from_csv("").is_empty());
        assert!(ListSetting::from_csv(" , ,").is_empty());
    }

    #[test]
    fn test_deserialize_string_and_array() {
        #[derive(Deserialize)]
        struct Wrapper {
            a: ListSetting,
            b: ListSetting,
        }

        let parsed: Wrapper = toml::from_str("a = \"x,y\"\nb = [\"z\", \"w,v\"]").unwrap();
        assert_eq!(parsed.a.entries(), ["x", "y"]);
        assert_eq!(parsed.b.entries(), ["z", "w", "v"]);
    }

    #[test]
    fn test_deserialize_numeric_and_bool_entries() {
        #[derive(Deserialize)]
        struct Wrapper {
            a: ListSetting,
            b: ListSetting,
            c: ListSetting,
        }

        let parsed: Wrapper = toml::from_str("a = 1234\nb = true\nc = [17, \"x\", 2.5]").unwrap();
        assert_eq!(parsed.a.entries(), ["1234"]);
        assert_eq!(parsed.b.entries(), ["true"]);
        assert_eq!(parsed.c.entries(), ["17", "x", "2.5"]);
    }
}
