//! Domain types for icvi-io.

use crate::IoError;

/// Prefix shared by the artifacts of one index run.
///
/// A run writes `{run}_scores.csv`, `{run}_weights.json` and
/// `{run}_drilldown.json`; distinct names keep runs with different engine
/// settings side by side in one output directory. Must match
/// `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunName(String);

impl RunName {
    /// Parse and validate a run name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidRunName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidRunName { name });
        }
        Ok(Self(name))
    }

    /// Return the run name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_name_valid() {
        let name = RunName::new("icvi-2023_v2".to_string());
        assert_eq!(name.unwrap().as_str(), "icvi-2023_v2");
    }

    #[test]
    fn run_name_rejects_empty() {
        assert!(matches!(
            RunName::new(String::new()),
            Err(IoError::InvalidRunName { .. })
        ));
    }

    #[test]
    fn run_name_rejects_path_separators() {
        assert!(matches!(
            RunName::new("../escape".to_string()),
            Err(IoError::InvalidRunName { .. })
        ));
    }
}
