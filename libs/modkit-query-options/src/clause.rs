//! Parsed representations produced by the expression grammar.

use serde::{Deserialize, Serialize};

use crate::ast::Expr;

/// A bound `$filter` predicate.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterClause {
    expression: Expr,
}

impl FilterClause {
    #[must_use]
    pub fn new(expression: Expr) -> Self {
        Self { expression }
    }

    #[must_use]
    pub fn expression(&self) -> &Expr {
        &self.expression
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.expression.node_count()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDir {
    #[serde(rename = "asc")]
    Asc,
    #[serde(rename = "desc")]
    Desc,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderKey {
    pub field: String,
    pub dir: SortDir,
}

/// Ordered list of sort keys, most significant first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct OrderByClause(pub Vec<OrderKey>);

impl OrderByClause {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &OrderKey> {
        self.0.iter()
    }

    /// Append `tiebreaker` unless a key on that field is already present.
    pub fn ensure_tiebreaker(mut self, tiebreaker: &str, dir: SortDir) -> Self {
        if !self.0.iter().any(|k| k.field == tiebreaker) {
            self.0.push(OrderKey {
                field: tiebreaker.to_owned(),
                dir,
            });
        }
        self
    }
}

impl std::fmt::Display for OrderByClause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|key| {
                let dir = match key.dir {
                    SortDir::Asc => "asc",
                    SortDir::Desc => "desc",
                };
                format!("{} {dir}", key.field)
            })
            .collect();
        f.write_str(&parts.join(", "))
    }
}

/// Combined projection and expansion tree of `$select` + `$expand`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectExpandClause {
    /// True when no `$select` was given or it contained `*`.
    pub all_selected: bool,
    /// Canonical names of explicitly selected properties.
    pub selected: Vec<String>,
    pub expanded: Vec<ExpandItem>,
    /// Navigation properties of the type at this level; projection drops the
    /// ones that are neither expanded nor selected.
    pub navigation_properties: Vec<String>,
}

impl Default for SelectExpandClause {
    fn default() -> Self {
        Self {
            all_selected: true,
            selected: Vec::new(),
            expanded: Vec::new(),
            navigation_properties: Vec::new(),
        }
    }
}

impl SelectExpandClause {
    /// Deepest expansion level; `0` when nothing is expanded.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.expanded
            .iter()
            .map(|item| 1 + item.nested.depth())
            .max()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn find_expansion(&self, navigation: &str) -> Option<&ExpandItem> {
        self.expanded
            .iter()
            .find(|item| item.navigation.eq_ignore_ascii_case(navigation))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpandItem {
    /// Canonical navigation property name.
    pub navigation: String,
    pub collection: bool,
    pub nested: SelectExpandClause,
}
