//! Lifecycle configuration and duration parsing.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AlertError, Result};

/// Configuration for the lifecycle engine, its guard, and the query facade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Longest silence an operator may set (in seconds).
    pub max_silence_secs: u64,
    /// Page size used when the caller does not give one.
    pub default_page_size: usize,
    /// Largest page a caller may request.
    pub max_page_size: usize,
    /// Largest id list accepted by a batch silence.
    pub max_batch_ids: usize,
    /// Ids applied per store call during a batch; cancellation is checked
    /// between chunks.
    pub batch_chunk_size: usize,
    /// Call-level timeout for store lock acquisition (in milliseconds).
    pub store_timeout_ms: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            max_silence_secs: 7 * 24 * 3600, // 7 days
            default_page_size: 20,
            max_page_size: 500,
            max_batch_ids: 1000,
            batch_chunk_size: 32,
            store_timeout_ms: 500,
        }
    }
}

impl LifecycleConfig {
    /// Loads a configuration from a JSON file. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidArgument` if the file cannot be read or fails
    /// validation, and `AlertError::Serialization` if it is not valid JSON.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AlertError::invalid_argument(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every bound is usable.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidArgument` naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.max_silence_secs == 0 {
            return Err(AlertError::invalid_argument("max_silence_secs must be positive"));
        }
        if self.max_page_size == 0 {
            return Err(AlertError::invalid_argument("max_page_size must be positive"));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(AlertError::invalid_argument(format!(
                "default_page_size must be between 1 and {}",
                self.max_page_size
            )));
        }
        if self.max_batch_ids == 0 {
            return Err(AlertError::invalid_argument("max_batch_ids must be positive"));
        }
        if self.batch_chunk_size == 0 {
            return Err(AlertError::invalid_argument("batch_chunk_size must be positive"));
        }
        Ok(())
    }

    /// Maximum silence as a [`Duration`].
    #[must_use]
    pub const fn max_silence(&self) -> Duration {
        Duration::from_secs(self.max_silence_secs)
    }

    /// Store timeout as a [`Duration`].
    #[must_use]
    pub const fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// Parses a human duration such as `90s`, `30m`, `2h`, `1d`, or bare seconds.
///
/// # Errors
///
/// Returns `AlertError::InvalidArgument` for empty, zero, or malformed input.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let s = input.trim();
    let (digits, unit_secs) = match s.char_indices().last() {
        None => return Err(AlertError::invalid_argument("duration cannot be empty")),
        Some((i, 's')) => (&s[..i], 1),
        Some((i, 'm')) => (&s[..i], 60),
        Some((i, 'h')) => (&s[..i], 3600),
        Some((i, 'd')) => (&s[..i], 86_400),
        Some((_, c)) if c.is_ascii_digit() => (s, 1),
        Some(_) => {
            return Err(AlertError::invalid_argument(format!(
                "unknown duration format: '{input}' (use e.g. '90s', '30m', '2h', '1d')"
            )));
        }
    };

    let value: u64 = digits.trim().parse().map_err(|_| {
        AlertError::invalid_argument(format!("invalid duration: '{input}'"))
    })?;
    let secs = value
        .checked_mul(unit_secs)
        .ok_or_else(|| AlertError::invalid_argument(format!("duration too large: '{input}'")))?;
    if secs == 0 {
        return Err(AlertError::invalid_argument("duration must be positive"));
    }

    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    mod config_tests {
        use super::*;

        #[test]
        fn default_config() {
            let config = LifecycleConfig::default();
            assert_eq!(config.max_silence_secs, 604_800);
            assert_eq!(config.default_page_size, 20);
            assert_eq!(config.max_page_size, 500);
            assert_eq!(config.max_batch_ids, 1000);
            assert_eq!(config.batch_chunk_size, 32);
            assert_eq!(config.store_timeout(), Duration::from_millis(500));
            assert!(config.validate().is_ok());
        }

        #[test]
        fn partial_json_takes_defaults() {
            let config: LifecycleConfig =
                serde_json::from_str(r#"{"max_silence_secs": 3600}"#).unwrap();
            assert_eq!(config.max_silence(), Duration::from_secs(3600));
            assert_eq!(config.max_page_size, 500);
        }

        #[test]
        fn from_json_file() {
            let dir = tempfile::tempdir().expect("tempdir");
            let path = dir.path().join("lifecycle.json");
            std::fs::write(&path, r#"{"batch_chunk_size": 4}"#).unwrap();

            let config = LifecycleConfig::from_json_file(&path).unwrap();
            assert_eq!(config.batch_chunk_size, 4);
        }

        #[test]
        fn from_json_file_rejects_invalid_bounds() {
            let dir = tempfile::tempdir().expect("tempdir");
            let path = dir.path().join("lifecycle.json");
            std::fs::write(&path, r#"{"default_page_size": 900}"#).unwrap();

            let result = LifecycleConfig::from_json_file(&path);
            assert!(matches!(result, Err(AlertError::InvalidArgument { .. })));
        }

        #[test]
        fn from_missing_file_fails() {
            let result = LifecycleConfig::from_json_file(Path::new("/nonexistent/lifecycle.json"));
            assert!(result.is_err());
        }

        #[test]
        fn validate_rejects_zero_chunk() {
            let config = LifecycleConfig {
                batch_chunk_size: 0,
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }
    }

    mod duration_tests {
        use super::*;
        use test_case::test_case;

        #[test_case("90s", 90 ; "seconds")]
        #[test_case("30m", 1800 ; "minutes")]
        #[test_case("2h", 7200 ; "hours")]
        #[test_case("1d", 86_400 ; "days")]
        #[test_case("45", 45 ; "bare seconds")]
        #[test_case(" 5m ", 300 ; "surrounding whitespace")]
        fn parses(input: &str, secs: u64) {
            assert_eq!(parse_duration(input).unwrap(), Duration::from_secs(secs));
        }

        #[test_case("" ; "empty")]
        #[test_case("0s" ; "zero")]
        #[test_case("10w" ; "unknown unit")]
        #[test_case("h" ; "missing number")]
        #[test_case("-5m" ; "negative")]
        #[test_case("99999999999999999999d" ; "overflow")]
        fn rejects(input: &str) {
            assert!(matches!(
                parse_duration(input),
                Err(AlertError::InvalidArgument { .. })
            ));
        }
    }
}
