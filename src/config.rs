//! Per-manager settings.
//!
//! Each manager node holds its own `sep` and `count` as options. An unset
//! value is inherited from the parent at the time it is read, falling back to
//! [`DEFAULT_SEP`] and [`DEFAULT_COUNT`] at the root.

use crate::error::ManagerError;

pub const DEFAULT_SEP: &str = "|";
pub const DEFAULT_COUNT: bool = true;

pub const SEP_VAR: &str = "COMPONENTS_SEP";
pub const COUNT_VAR: &str = "COMPONENTS_COUNT";

/// Settings to apply to a manager.
///
/// Each setting is tri-state: `None` leaves the node's value alone,
/// `Some(None)` clears it so the parent's value applies, and
/// `Some(Some(v))` sets it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagerConfig {
    pub count: Option<Option<bool>>,
    pub sep: Option<Option<String>>,
}

impl ManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(mut self, count: bool) -> Self {
        self.count = Some(Some(count));
        self
    }

    pub fn sep(mut self, sep: impl Into<String>) -> Self {
        self.sep = Some(Some(sep.into()));
        self
    }

    pub fn unset_count(mut self) -> Self {
        self.count = Some(None);
        self
    }

    pub fn unset_sep(mut self) -> Self {
        self.sep = Some(None);
        self
    }

    /// Read settings from the environment, loading `.env` first when the
    /// `io` feature is enabled. Missing variables are left omitted.
    pub fn from_env() -> Result<Self, ManagerError> {
        #[cfg(feature = "io")]
        dotenv::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ManagerError> {
        let mut config = ManagerConfig::new();

        if let Some(sep) = lookup(SEP_VAR) {
            if sep.is_empty() {
                return Err(ManagerError::Config(format!("{SEP_VAR} cannot be empty")));
            }
            config = config.sep(sep);
        }

        if let Some(count) = lookup(COUNT_VAR) {
            let count = match count.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => {
                    return Err(ManagerError::Config(format!(
                        "{COUNT_VAR} must be a boolean, got {other:?}"
                    )))
                }
            };
            config = config.count(count);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn builder_sets_tri_state() {
        let config = ManagerConfig::new().sep(":").unset_count();
        assert_eq!(config.sep, Some(Some(":".to_string())));
        assert_eq!(config.count, Some(None));
        assert_eq!(ManagerConfig::new().count, None);
    }

    #[test]
    fn env_values_are_parsed() {
        let config =
            ManagerConfig::from_lookup(lookup(&[(SEP_VAR, ";"), (COUNT_VAR, "off")])).unwrap();
        assert_eq!(config, ManagerConfig::new().sep(";").count(false));

        let empty = ManagerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(empty, ManagerConfig::default());
    }

    #[test]
    fn invalid_env_values_are_errors() {
        assert!(matches!(
            ManagerConfig::from_lookup(lookup(&[(COUNT_VAR, "maybe")])),
            Err(ManagerError::Config(_))
        ));
        assert!(matches!(
            ManagerConfig::from_lookup(lookup(&[(SEP_VAR, "")])),
            Err(ManagerError::Config(_))
        ));
    }
}
