//! Shared serialization/deserialization utilities for configuration

/// Helper module for Duration serialization as seconds
///
/// Whole durations are written as integers (`30`), sub-second ones as floats
/// (`0.25`). Both forms are accepted when reading.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Config {
///     #[serde(with = "ct_core::config::serde_utils::duration_secs")]
///     timeout: Duration,
/// }
/// ```
pub mod duration_secs {
    use serde::{self, de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Secs {
        Whole(u64),
        Fractional(f64),
    }

    /// Serialize a Duration as seconds
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_u64(duration.as_secs())
        } else {
            serializer.serialize_f64(duration.as_secs_f64())
        }
    }

    /// Deserialize a Duration from whole or fractional seconds
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Secs::deserialize(deserializer)? {
            Secs::Whole(secs) => Ok(Duration::from_secs(secs)),
            Secs::Fractional(secs) => Duration::try_from_secs_f64(secs)
                .map_err(|_| de::Error::custom(format!("invalid duration: {} seconds", secs))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct TestConfig {
        #[serde(with = "duration_secs")]
        timeout: Duration,
    }

    #[test]
    fn test_duration_secs_serialize() {
        let config = TestConfig {
            timeout: Duration::from_secs(30),
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"timeout":30}"#);

        let config = TestConfig {
            timeout: Duration::from_millis(250),
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"timeout":0.25}"#);
    }

    #[test]
    fn test_duration_secs_deserialize() {
        let config: TestConfig = serde_json::from_str(r#"{"timeout":60}"#).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(60));

        let config: TestConfig = serde_json::from_str(r#"{"timeout":1.5}"#).unwrap();
        assert_eq!(config.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_duration_secs_rejects_negative() {
        assert!(serde_json::from_str::<TestConfig>(r#"{"timeout":-1.0}"#).is_err());
    }

    #[test]
    fn test_duration_secs_toml() {
        let config: TestConfig = toml::from_str("timeout = 0.5").unwrap();
        assert_eq!(config.timeout, Duration::from_millis(500));
    }
}
