//! Composition of validated options onto a data source.

use crate::clause::{FilterClause, OrderByClause, SelectExpandClause, SortDir};
use crate::options::TopOption;
use crate::query_options::QueryOptions;
use crate::settings::ApplySettings;

/// A data source the options can be applied to.
///
/// Each step consumes the source and returns the narrowed or reshaped one,
/// so implementations may evaluate eagerly or only record the step.
pub trait Queryable: Sized {
    #[must_use]
    fn filter(self, clause: &FilterClause) -> Self;
    #[must_use]
    fn order_by(self, clause: &OrderByClause) -> Self;
    #[must_use]
    fn select_expand(self, clause: &SelectExpandClause) -> Self;
    #[must_use]
    fn skip(self, count: u64) -> Self;
    #[must_use]
    fn take(self, count: u64) -> Self;
}

/// A source that can report how many items it holds.
pub trait Countable {
    fn count(&self) -> u64;
}

/// Number of items to take: the smaller of the page-size ceiling and `$top`.
/// `None` means unlimited.
#[must_use]
pub fn effective_take(page_size: Option<u64>, top: Option<u64>) -> Option<u64> {
    match (page_size, top) {
        (Some(p), Some(t)) => Some(p.min(t)),
        (Some(n), None) | (None, Some(n)) => Some(n),
        (None, None) => None,
    }
}

impl QueryOptions {
    /// Apply the options to `source` in a fixed order: filter, order by,
    /// select/expand, skip, then take `min(page_size, $top)`.
    ///
    /// Options are expected to have passed [`QueryOptions::validate`].
    pub fn apply_to<Q: Queryable>(&self, source: Q, settings: &ApplySettings) -> Q {
        let mut query = source;

        if let Some(filter) = self.filter() {
            tracing::debug!(option = "$filter", nodes = filter.clause().node_count(), "applying");
            query = query.filter(filter.clause());
        }

        if let Some(order) = self.effective_order_by(settings) {
            tracing::debug!(option = "$orderby", order = %order, "applying");
            query = query.order_by(&order);
        }

        if let Some(select_expand) = self.select_expand() {
            tracing::debug!(
                option = %select_expand.kind().canonical_name(),
                depth = select_expand.clause().depth(),
                "applying"
            );
            query = query.select_expand(select_expand.clause());
        }

        if let Some(skip) = self.skip() {
            tracing::debug!(option = "$skip", skip = skip.value(), "applying");
            query = query.skip(skip.value());
        }

        let top = self.top().map(TopOption::value);
        if let Some(take) = effective_take(settings.page_size, top) {
            tracing::debug!(
                top = ?top,
                page_size = ?settings.page_size,
                take,
                "applying effective take"
            );
            query = query.take(take);
        }

        query
    }

    /// Count the items matching `$filter`, ignoring ordering, projection and paging.
    pub fn count_of<Q: Queryable + Countable>(&self, source: Q) -> u64 {
        match self.filter() {
            Some(filter) => source.filter(filter.clause()).count(),
            None => source.count(),
        }
    }

    /// Ordering to apply, if any.
    ///
    /// With `ensure_stable_ordering`, key properties are appended as
    /// ascending tiebreakers, and paged requests without `$orderby` are
    /// ordered by key.
    fn effective_order_by(&self, settings: &ApplySettings) -> Option<OrderByClause> {
        let requested = self
            .order_by()
            .map(|o| o.clause().clone())
            .filter(|o| !o.is_empty());
        if !settings.ensure_stable_ordering {
            return requested;
        }

        let paged = self.top().is_some() || self.skip().is_some() || settings.page_size.is_some();
        if requested.is_none() && !paged {
            return None;
        }

        let order = self
            .context()
            .element_type()
            .key_properties()
            .iter()
            .fold(requested.unwrap_or_default(), |order, key| {
                order.ensure_tiebreaker(key, SortDir::Asc)
            });
        (!order.is_empty()).then_some(order)
    }
}
