//! Request-scoped side channel filled by the option parser.

use crate::clause::SelectExpandClause;

/// Per-request state shared between parsing and later pipeline stages.
///
/// The parser stores the combined select/expand clause here so serialization
/// can reuse it without parsing `$expand` again. The slot is written at most
/// once.
#[derive(Clone, Debug, Default)]
pub struct RequestScope {
    select_expand: Option<SelectExpandClause>,
    count_request: bool,
}

impl RequestScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope for a request path; a trailing `/$count` segment marks a
    /// count-only request.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let last = path
            .split('?')
            .next()
            .unwrap_or_default()
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();
        Self {
            select_expand: None,
            count_request: last.eq_ignore_ascii_case("$count"),
        }
    }

    #[must_use]
    pub fn with_count_request(mut self, count_request: bool) -> Self {
        self.count_request = count_request;
        self
    }

    #[must_use]
    pub fn is_count_request(&self) -> bool {
        self.count_request
    }

    #[must_use]
    pub fn select_expand_clause(&self) -> Option<&SelectExpandClause> {
        self.select_expand.as_ref()
    }

    /// Fill the slot; returns `false` and keeps the stored clause when it is
    /// already set.
    pub(crate) fn store_select_expand(&mut self, clause: SelectExpandClause) -> bool {
        if self.select_expand.is_some() {
            return false;
        }
        self.select_expand = Some(clause);
        true
    }
}
