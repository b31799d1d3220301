use std::sync::Arc;

use crate::allowed::QueryOptionKind;
use crate::clause::SelectExpandClause;
use crate::error::Error;
use crate::model::QueryContext;
use crate::settings::ValidationSettings;

/// `$select` and `$expand`, parsed together.
#[derive(Clone, Debug)]
pub struct SelectExpandOption {
    raw_select: Option<String>,
    raw_expand: Option<String>,
    clause: SelectExpandClause,
    context: Arc<QueryContext>,
}

impl SelectExpandOption {
    /// # Errors
    /// Returns `Error::Grammar` attributed to `$expand` when it was given,
    /// otherwise to `$select`.
    pub fn parse(
        select: Option<&str>,
        expand: Option<&str>,
        context: Arc<QueryContext>,
    ) -> Result<Self, Error> {
        let option = if expand.is_some() {
            QueryOptionKind::Expand
        } else {
            QueryOptionKind::Select
        };
        let clause = context
            .grammar()
            .parse_select_and_expand(select, expand, &context)
            .map_err(|source| Error::Grammar { option, source })?;
        Ok(Self {
            raw_select: select.map(str::to_owned),
            raw_expand: expand.map(str::to_owned),
            clause,
            context,
        })
    }

    /// `Expand` when `$expand` was given, else `Select`.
    #[must_use]
    pub fn kind(&self) -> QueryOptionKind {
        if self.raw_expand.is_some() {
            QueryOptionKind::Expand
        } else {
            QueryOptionKind::Select
        }
    }

    #[must_use]
    pub fn raw_select(&self) -> Option<&str> {
        self.raw_select.as_deref()
    }

    #[must_use]
    pub fn raw_expand(&self) -> Option<&str> {
        self.raw_expand.as_deref()
    }

    #[must_use]
    pub fn clause(&self) -> &SelectExpandClause {
        &self.clause
    }

    #[must_use]
    pub fn context(&self) -> &QueryContext {
        &self.context
    }

    /// # Errors
    /// Returns `Error::LimitExceeded` when expansions nest deeper than
    /// `max_expansion_depth` (`0` disables the check).
    pub fn validate(&self, settings: &ValidationSettings) -> Result<(), Error> {
        let depth = self.clause.depth();
        if settings.max_expansion_depth > 0 && depth > settings.max_expansion_depth {
            return Err(Error::limit(
                QueryOptionKind::Expand,
                format!(
                    "expansion depth {depth} exceeds the maximum of {}",
                    settings.max_expansion_depth
                ),
            ));
        }
        Ok(())
    }
}
