//! Validation and application settings.
//!
//! Both structs are plain configuration: they deserialize from a module's
//! config section and carry sensible defaults, so an empty section is valid.
//!
//! ```yaml
//! query_options:
//!   allowed_query_options: "FILTER | TOP | SKIP | COUNT"
//!   max_top: 500
//!   max_expansion_depth: 3
//! ```

use serde::Deserialize;

use crate::allowed::{
    AllowedArithmeticOperators, AllowedFunctions, AllowedLogicalOperators, AllowedQueryOptions,
};

/// Policy and limits the validator enforces.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
#[must_use]
pub struct ValidationSettings {
    /// Query options a caller may send (default: all).
    pub allowed_query_options: AllowedQueryOptions,
    pub max_top: Option<u64>,
    pub max_skip: Option<u64>,
    /// Maximum `$expand` depth; `0` disables the check (default: 2).
    pub max_expansion_depth: usize,
    /// Maximum number of `$orderby` keys (default: 5).
    pub max_order_by_node_count: usize,
    /// Maximum number of nodes in a `$filter` tree (default: 100).
    pub max_node_count: usize,
    /// Maximum length of `$filter` in characters (default: 2000).
    pub max_filter_length: usize,
    pub allowed_logical_operators: AllowedLogicalOperators,
    pub allowed_arithmetic_operators: AllowedArithmeticOperators,
    pub allowed_functions: AllowedFunctions,
    /// Properties `$orderby` may name; empty allows any property.
    pub allowed_order_by_properties: Vec<String>,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            allowed_query_options: AllowedQueryOptions::ALL,
            max_top: None,
            max_skip: None,
            max_expansion_depth: 2,
            max_order_by_node_count: 5,
            max_node_count: 100,
            max_filter_length: 2000,
            allowed_logical_operators: AllowedLogicalOperators::ALL,
            allowed_arithmetic_operators: AllowedArithmeticOperators::ALL,
            allowed_functions: AllowedFunctions::ALL_FUNCTIONS,
            allowed_order_by_properties: Vec::new(),
        }
    }
}

impl ValidationSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allowed_query_options(mut self, allowed: AllowedQueryOptions) -> Self {
        self.allowed_query_options = allowed;
        self
    }

    pub fn with_max_top(mut self, max_top: u64) -> Self {
        self.max_top = Some(max_top);
        self
    }

    pub fn with_max_skip(mut self, max_skip: u64) -> Self {
        self.max_skip = Some(max_skip);
        self
    }

    pub fn with_max_expansion_depth(mut self, depth: usize) -> Self {
        self.max_expansion_depth = depth;
        self
    }

    pub fn with_max_order_by_node_count(mut self, max: usize) -> Self {
        self.max_order_by_node_count = max;
        self
    }

    pub fn with_max_node_count(mut self, max: usize) -> Self {
        self.max_node_count = max;
        self
    }

    pub fn with_max_filter_length(mut self, max: usize) -> Self {
        self.max_filter_length = max;
        self
    }

    pub fn with_allowed_logical_operators(mut self, allowed: AllowedLogicalOperators) -> Self {
        self.allowed_logical_operators = allowed;
        self
    }

    pub fn with_allowed_arithmetic_operators(
        mut self,
        allowed: AllowedArithmeticOperators,
    ) -> Self {
        self.allowed_arithmetic_operators = allowed;
        self
    }

    pub fn with_allowed_functions(mut self, allowed: AllowedFunctions) -> Self {
        self.allowed_functions = allowed;
        self
    }

    pub fn with_allowed_order_by_properties<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_order_by_properties = properties.into_iter().map(Into::into).collect();
        self
    }
}

/// Settings for [`QueryOptions::apply_to`](crate::QueryOptions::apply_to).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
#[must_use]
pub struct ApplySettings {
    /// Server page-size ceiling; `$top` can only narrow it.
    pub page_size: Option<u64>,
    /// Append key properties to the ordering so paging is deterministic.
    pub ensure_stable_ordering: bool,
}

impl ApplySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn with_stable_ordering(mut self) -> Self {
        self.ensure_stable_ordering = true;
        self
    }
}
