//! The incoming query parameters, verbatim.

use crate::allowed::{AllowedQueryOptions, QueryOptionKind};
use crate::error::Error;

/// Raw values of recognized query options, keyed by option kind.
///
/// Names are matched case-insensitively. Values are kept exactly as received,
/// including surrounding whitespace. Parameters that are not query options are
/// kept in [`RawOptionSet::custom`] and otherwise ignored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawOptionSet {
    values: Vec<(QueryOptionKind, String)>,
    blank: AllowedQueryOptions,
    custom: Vec<(String, String)>,
}

impl Default for RawOptionSet {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            blank: AllowedQueryOptions::NONE,
            custom: Vec::new(),
        }
    }
}

impl RawOptionSet {
    /// Collect `(name, value)` pairs.
    ///
    /// # Errors
    /// Returns `Error::DuplicateQueryOption` when a recognized option occurs
    /// more than once under any casing.
    pub fn from_pairs<I, K, V>(params: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut set = Self::default();

        for (name, value) in params {
            let name = name.as_ref();
            let value = value.into();
            let Some(kind) = QueryOptionKind::from_param_name(name) else {
                set.custom.push((name.to_owned(), value));
                continue;
            };

            if set.get(kind).is_some() {
                return Err(Error::DuplicateQueryOption(kind));
            }
            if value.trim().is_empty() {
                set.blank |= kind.flag();
            }
            set.values.push((kind, value));
        }

        Ok(set)
    }

    /// Decode an `application/x-www-form-urlencoded` query string (without `?`).
    ///
    /// # Errors
    /// Returns `Error::InvalidQueryString` when decoding fails, or
    /// `Error::DuplicateQueryOption` as [`RawOptionSet::from_pairs`].
    pub fn from_query_string(query: &str) -> Result<Self, Error> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
            .map_err(|e| Error::InvalidQueryString(e.to_string()))?;
        Self::from_pairs(pairs)
    }

    #[must_use]
    pub fn get(&self, kind: QueryOptionKind) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn contains(&self, kind: QueryOptionKind) -> bool {
        self.get(kind).is_some()
    }

    /// True when the option was sent with an empty or whitespace-only value.
    #[must_use]
    pub fn is_blank(&self, kind: QueryOptionKind) -> bool {
        self.blank.contains(kind.flag())
    }

    /// Recognized options in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (QueryOptionKind, &str)> {
        self.values.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Union of the policy bits of every recognized option present.
    #[must_use]
    pub fn present(&self) -> AllowedQueryOptions {
        self.values
            .iter()
            .fold(AllowedQueryOptions::NONE, |acc, (k, _)| acc | k.flag())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parameters that are not query options, in arrival order.
    #[must_use]
    pub fn custom(&self) -> &[(String, String)] {
        &self.custom
    }

    #[must_use]
    pub fn filter(&self) -> Option<&str> {
        self.get(QueryOptionKind::Filter)
    }

    #[must_use]
    pub fn order_by(&self) -> Option<&str> {
        self.get(QueryOptionKind::OrderBy)
    }

    #[must_use]
    pub fn top(&self) -> Option<&str> {
        self.get(QueryOptionKind::Top)
    }

    #[must_use]
    pub fn skip(&self) -> Option<&str> {
        self.get(QueryOptionKind::Skip)
    }

    #[must_use]
    pub fn select(&self) -> Option<&str> {
        self.get(QueryOptionKind::Select)
    }

    #[must_use]
    pub fn expand(&self) -> Option<&str> {
        self.get(QueryOptionKind::Expand)
    }

    #[must_use]
    pub fn count(&self) -> Option<&str> {
        self.get(QueryOptionKind::Count)
    }

    #[must_use]
    pub fn format(&self) -> Option<&str> {
        self.get(QueryOptionKind::Format)
    }

    #[must_use]
    pub fn skip_token(&self) -> Option<&str> {
        self.get(QueryOptionKind::SkipToken)
    }

    #[must_use]
    pub fn delta_token(&self) -> Option<&str> {
        self.get(QueryOptionKind::DeltaToken)
    }

    #[must_use]
    pub fn apply(&self) -> Option<&str> {
        self.get(QueryOptionKind::Apply)
    }
}
