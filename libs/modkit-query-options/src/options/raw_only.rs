use crate::error::Error;
use crate::settings::ValidationSettings;

/// `$apply`: recorded verbatim; aggregation is left to the data source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApplyOption {
    raw: String,
}

impl ApplyOption {
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_owned(),
        }
    }

    #[must_use]
    pub fn raw_value(&self) -> &str {
        &self.raw
    }

    /// Only the presence gate applies.
    ///
    /// # Errors
    /// Never fails.
    pub fn validate(&self, _settings: &ValidationSettings) -> Result<(), Error> {
        Ok(())
    }
}
