use std::sync::Arc;

use crate::allowed::QueryOptionKind;
use crate::clause::OrderByClause;
use crate::error::Error;
use crate::model::QueryContext;
use crate::settings::ValidationSettings;

/// `$orderby`: sort keys over properties of the element type.
#[derive(Clone, Debug)]
pub struct OrderByOption {
    raw: String,
    clause: OrderByClause,
    context: Arc<QueryContext>,
}

impl OrderByOption {
    /// # Errors
    /// Returns `Error::Grammar` when a clause is malformed or names an unknown property.
    pub fn parse(raw: &str, context: Arc<QueryContext>) -> Result<Self, Error> {
        let clause = context
            .grammar()
            .parse_order_by(raw, &context)
            .map_err(|source| Error::Grammar {
                option: QueryOptionKind::OrderBy,
                source,
            })?;
        Ok(Self {
            raw: raw.to_owned(),
            clause,
            context,
        })
    }

    #[must_use]
    pub fn raw_value(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn clause(&self) -> &OrderByClause {
        &self.clause
    }

    #[must_use]
    pub fn context(&self) -> &QueryContext {
        &self.context
    }

    /// # Errors
    /// Returns `Error::LimitExceeded` when there are too many keys or a key
    /// is not in `allowed_order_by_properties`.
    pub fn validate(&self, settings: &ValidationSettings) -> Result<(), Error> {
        if self.clause.len() > settings.max_order_by_node_count {
            return Err(Error::limit(
                QueryOptionKind::OrderBy,
                format!(
                    "{} sort keys exceed the maximum of {}",
                    self.clause.len(),
                    settings.max_order_by_node_count
                ),
            ));
        }

        if settings.allowed_order_by_properties.is_empty() {
            return Ok(());
        }
        for key in self.clause.keys() {
            let allowed = settings
                .allowed_order_by_properties
                .iter()
                .any(|p| p.eq_ignore_ascii_case(&key.field));
            if !allowed {
                return Err(Error::limit(
                    QueryOptionKind::OrderBy,
                    format!("ordering by '{}' is not allowed", key.field),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::model::{EdmModel, EntityType, FieldKind};

    fn option(raw: &str) -> Result<OrderByOption, Error> {
        let model = EdmModel::new().entity_type(
            EntityType::new("Product")
                .key("Id", FieldKind::I64)
                .property("Name", FieldKind::String)
                .property("Price", FieldKind::Decimal),
        );
        let ctx = QueryContext::builder()
            .model(Arc::new(model))
            .element_type("Product")
            .build()
            .unwrap();
        OrderByOption::parse(raw, ctx)
    }

    #[test]
    fn key_budget() {
        let opt = option("Name, Price desc, Id").unwrap();
        let settings = ValidationSettings::default().with_max_order_by_node_count(2);
        assert!(matches!(
            opt.validate(&settings),
            Err(Error::LimitExceeded {
                option: QueryOptionKind::OrderBy,
                ..
            })
        ));
        assert!(opt.validate(&ValidationSettings::default()).is_ok());
    }

    #[test]
    fn allowed_properties() {
        let opt = option("price desc").unwrap();
        let only_name = ValidationSettings::default().with_allowed_order_by_properties(["Name"]);
        let err = opt.validate(&only_name).unwrap_err();
        assert!(err.to_string().contains("'Price'"), "{err}");

        let with_price =
            ValidationSettings::default().with_allowed_order_by_properties(["name", "PRICE"]);
        assert!(opt.validate(&with_price).is_ok());
    }

    #[test]
    fn unknown_property_is_a_grammar_error() {
        let err = option("Weight").unwrap_err();
        assert!(matches!(
            err,
            Error::Grammar {
                option: QueryOptionKind::OrderBy,
                ..
            }
        ));
        assert_eq!(err.option_name(), "$orderby");
    }
}
