use std::sync::Arc;

use crate::allowed::QueryOptionKind;
use crate::error::Error;
use crate::model::QueryContext;
use crate::settings::ValidationSettings;

/// `$count`: whether the total matching count is requested.
#[derive(Clone, Debug)]
pub struct CountOption {
    raw: String,
    value: bool,
    context: Arc<QueryContext>,
}

impl CountOption {
    /// Accepts `true` or `false` in any case.
    ///
    /// # Errors
    /// Returns `Error::InvalidBoolean` for any other text.
    pub fn parse(raw: &str, context: Arc<QueryContext>) -> Result<Self, Error> {
        let trimmed = raw.trim();
        let value = if trimmed.eq_ignore_ascii_case("true") {
            true
        } else if trimmed.eq_ignore_ascii_case("false") {
            false
        } else {
            return Err(Error::InvalidBoolean {
                option: QueryOptionKind::Count,
                value: raw.to_owned(),
            });
        };
        Ok(Self {
            raw: raw.to_owned(),
            value,
            context,
        })
    }

    #[must_use]
    pub fn raw_value(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn value(&self) -> bool {
        self.value
    }

    #[must_use]
    pub fn context(&self) -> &QueryContext {
        &self.context
    }

    /// Nothing to check beyond parsing.
    ///
    /// # Errors
    /// Never fails.
    pub fn validate(&self, _settings: &ValidationSettings) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::model::{EdmModel, EntityType};

    fn ctx() -> Arc<QueryContext> {
        QueryContext::builder()
            .model(Arc::new(EdmModel::new().entity_type(EntityType::new("T"))))
            .element_type("T")
            .build()
            .unwrap()
    }

    #[test]
    fn parses_booleans_case_insensitively() {
        assert!(CountOption::parse("TRUE", ctx()).unwrap().value());
        assert!(!CountOption::parse(" false ", ctx()).unwrap().value());
    }

    #[test]
    fn rejects_other_text() {
        let err = CountOption::parse("yes", ctx()).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidBoolean {
                option: QueryOptionKind::Count,
                value: "yes".into()
            }
        );
    }
}
