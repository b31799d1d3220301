//! The per-request aggregate of parsed query options.

use std::sync::Arc;

use crate::allowed::QueryOptionKind;
use crate::error::Error;
use crate::model::QueryContext;
use crate::options::{
    ApplyOption, CountOption, FilterOption, OrderByOption, PresentOption, SelectExpandOption,
    SkipOption, TopOption,
};
use crate::raw::RawOptionSet;
use crate::request::RequestScope;

/// Typed query options of one request.
///
/// Built only by [`QueryOptions::parse`], which either succeeds completely or
/// returns the first error. Every typed field is set exactly when the
/// corresponding raw option was present.
#[derive(Clone, Debug)]
pub struct QueryOptions {
    context: Arc<QueryContext>,
    raw: RawOptionSet,
    filter: Option<FilterOption>,
    order_by: Option<OrderByOption>,
    top: Option<TopOption>,
    skip: Option<SkipOption>,
    select_expand: Option<SelectExpandOption>,
    count: Option<CountOption>,
    apply: Option<ApplyOption>,
    count_request: bool,
}

/// Accumulates options while parsing; frozen by `build`.
#[derive(Default)]
struct QueryOptionsBuilder {
    filter: Option<FilterOption>,
    order_by: Option<OrderByOption>,
    top: Option<TopOption>,
    skip: Option<SkipOption>,
    select_expand: Option<SelectExpandOption>,
    count: Option<CountOption>,
    apply: Option<ApplyOption>,
}

impl QueryOptionsBuilder {
    fn build(
        self,
        context: Arc<QueryContext>,
        raw: RawOptionSet,
        count_request: bool,
    ) -> QueryOptions {
        QueryOptions {
            context,
            raw,
            filter: self.filter,
            order_by: self.order_by,
            top: self.top,
            skip: self.skip,
            select_expand: self.select_expand,
            count: self.count,
            apply: self.apply,
            count_request,
        }
    }
}

impl QueryOptions {
    /// Parse raw options against `context`.
    ///
    /// The combined select/expand clause is also stored in `scope` for later
    /// pipeline stages, and the scope's count-only flag is captured.
    ///
    /// # Errors
    /// - `Error::EmptyQueryOption` for a blank `$filter`, `$top`, `$skip` or `$count`
    /// - `Error::InvalidInteger` / `Error::NegativeValue` for `$top` and `$skip`
    /// - `Error::InvalidBoolean` for `$count`
    /// - `Error::Grammar` when the expression grammar rejects an option
    pub fn parse(
        context: Arc<QueryContext>,
        raw: RawOptionSet,
        scope: &mut RequestScope,
    ) -> Result<Self, Error> {
        let mut builder = QueryOptionsBuilder::default();

        for (kind, value) in raw.iter() {
            if kind.requires_value() && raw.is_blank(kind) {
                return Err(Error::EmptyQueryOption(kind));
            }

            match kind {
                QueryOptionKind::Filter => {
                    builder.filter = Some(FilterOption::parse(value, Arc::clone(&context))?);
                }
                QueryOptionKind::OrderBy => {
                    builder.order_by = Some(OrderByOption::parse(value, Arc::clone(&context))?);
                }
                QueryOptionKind::Top => {
                    builder.top = Some(TopOption::parse(value, Arc::clone(&context))?);
                }
                QueryOptionKind::Skip => {
                    builder.skip = Some(SkipOption::parse(value, Arc::clone(&context))?);
                }
                QueryOptionKind::Count => {
                    builder.count = Some(CountOption::parse(value, Arc::clone(&context))?);
                }
                QueryOptionKind::Apply => builder.apply = Some(ApplyOption::new(value)),
                // Select/expand are parsed together below; the rest stay raw.
                QueryOptionKind::Select
                | QueryOptionKind::Expand
                | QueryOptionKind::Format
                | QueryOptionKind::SkipToken
                | QueryOptionKind::DeltaToken => {}
            }
        }

        if raw.select().is_some() || raw.expand().is_some() {
            let option =
                SelectExpandOption::parse(raw.select(), raw.expand(), Arc::clone(&context))?;
            if !scope.store_select_expand(option.clause().clone()) {
                tracing::debug!("request scope already holds a select/expand clause; keeping it");
            }
            builder.select_expand = Some(option);
        }

        tracing::debug!(
            options = raw.iter().count(),
            custom = raw.custom().len(),
            count_request = scope.is_count_request(),
            "parsed query options"
        );

        Ok(builder.build(context, raw, scope.is_count_request()))
    }

    #[must_use]
    pub fn context(&self) -> &QueryContext {
        &self.context
    }

    #[must_use]
    pub fn raw_values(&self) -> &RawOptionSet {
        &self.raw
    }

    #[must_use]
    pub fn filter(&self) -> Option<&FilterOption> {
        self.filter.as_ref()
    }

    #[must_use]
    pub fn order_by(&self) -> Option<&OrderByOption> {
        self.order_by.as_ref()
    }

    #[must_use]
    pub fn top(&self) -> Option<&TopOption> {
        self.top.as_ref()
    }

    #[must_use]
    pub fn skip(&self) -> Option<&SkipOption> {
        self.skip.as_ref()
    }

    #[must_use]
    pub fn select_expand(&self) -> Option<&SelectExpandOption> {
        self.select_expand.as_ref()
    }

    #[must_use]
    pub fn count(&self) -> Option<&CountOption> {
        self.count.as_ref()
    }

    #[must_use]
    pub fn apply(&self) -> Option<&ApplyOption> {
        self.apply.as_ref()
    }

    /// Whether the request addressed a `/$count` path.
    #[must_use]
    pub fn is_count_request(&self) -> bool {
        self.count_request
    }

    /// Typed option guarding `kind`, if it was parsed.
    ///
    /// `Select` yields the combined select/expand option only when `$expand`
    /// is absent, so that option is visited once.
    #[must_use]
    pub fn typed(&self, kind: QueryOptionKind) -> Option<PresentOption<'_>> {
        match kind {
            QueryOptionKind::Filter => self.filter.as_ref().map(PresentOption::Filter),
            QueryOptionKind::OrderBy => self.order_by.as_ref().map(PresentOption::OrderBy),
            QueryOptionKind::Top => self.top.as_ref().map(PresentOption::Top),
            QueryOptionKind::Skip => self.skip.as_ref().map(PresentOption::Skip),
            QueryOptionKind::Select | QueryOptionKind::Expand => self
                .select_expand
                .as_ref()
                .filter(|o| o.kind() == kind)
                .map(PresentOption::SelectExpand),
            QueryOptionKind::Count => self.count.as_ref().map(PresentOption::Count),
            QueryOptionKind::Apply => self.apply.as_ref().map(PresentOption::Apply),
            QueryOptionKind::Format | QueryOptionKind::SkipToken | QueryOptionKind::DeltaToken => {
                None
            }
        }
    }

    /// True when the request carries `kind`, typed or raw. A count-only
    /// request counts as `$count`.
    #[must_use]
    pub fn is_present(&self, kind: QueryOptionKind) -> bool {
        self.typed(kind).is_some()
            || self.raw.contains(kind)
            || (kind == QueryOptionKind::Count && self.count_request)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::model::{EdmModel, EntityType, FieldKind};

    fn ctx() -> Arc<QueryContext> {
        let model = EdmModel::new()
            .entity_type(
                EntityType::new("Customer")
                    .key("Id", FieldKind::I64)
                    .property("Name", FieldKind::String)
                    .collection("Orders", "Order"),
            )
            .entity_type(EntityType::new("Order").key("Id", FieldKind::I64));
        QueryContext::builder()
            .model(Arc::new(model))
            .element_type("Customer")
            .build()
            .unwrap()
    }

    fn parse(pairs: &[(&str, &str)]) -> Result<QueryOptions, Error> {
        let raw = RawOptionSet::from_pairs(pairs.iter().copied())?;
        QueryOptions::parse(ctx(), raw, &mut RequestScope::new())
    }

    #[test]
    fn empty_map_yields_empty_options() {
        let options = parse(&[]).unwrap();
        assert!(options.filter().is_none());
        assert!(options.top().is_none());
        assert!(options.select_expand().is_none());
        assert!(options.raw_values().is_empty());
    }

    #[test]
    fn paging_values() {
        let options = parse(&[("$top", "5"), ("$skip", "2")]).unwrap();
        assert_eq!(options.top().unwrap().value(), 5);
        assert_eq!(options.skip().unwrap().value(), 2);
        assert_eq!(options.raw_values().top(), Some("5"));
    }

    #[test]
    fn blank_required_options_are_rejected() {
        for name in ["$filter", "$top", "$skip", "$count"] {
            let err = parse(&[(name, " ")]).unwrap_err();
            assert!(matches!(err, Error::EmptyQueryOption(_)), "{name}");
            assert_eq!(err.option_name(), name);
        }
    }

    #[test]
    fn blank_optional_options_are_accepted() {
        let options = parse(&[("$orderby", ""), ("$format", ""), ("$skiptoken", "")]).unwrap();
        assert!(options.order_by().unwrap().clause().is_empty());
        assert!(options.is_present(QueryOptionKind::Format));
    }

    #[test]
    fn raw_only_options_are_recorded() {
        let options = parse(&[
            ("$format", "json"),
            ("$skiptoken", "abc"),
            ("$deltatoken", "d1"),
            ("$apply", "groupby((Name))"),
        ])
        .unwrap();
        assert_eq!(options.raw_values().format(), Some("json"));
        assert_eq!(options.raw_values().skip_token(), Some("abc"));
        assert_eq!(options.raw_values().delta_token(), Some("d1"));
        assert_eq!(options.apply().unwrap().raw_value(), "groupby((Name))");
        assert!(options.typed(QueryOptionKind::Format).is_none());
        assert!(options.is_present(QueryOptionKind::SkipToken));
    }

    #[test]
    fn select_and_expand_are_parsed_once_into_the_scope() {
        let raw =
            RawOptionSet::from_pairs([("$select", "Name"), ("$expand", "Orders")]).unwrap();
        let mut scope = RequestScope::new();
        let options = QueryOptions::parse(ctx(), raw, &mut scope).unwrap();

        let stored = scope.select_expand_clause().unwrap();
        assert_eq!(stored, options.select_expand().unwrap().clause());
        assert_eq!(stored.selected, vec!["Name".to_owned()]);
        assert_eq!(stored.expanded[0].navigation, "Orders");
        assert!(options.typed(QueryOptionKind::Select).is_none());
        assert!(options.typed(QueryOptionKind::Expand).is_some());
    }

    #[test]
    fn select_without_expand_builds_select_expand() {
        let options = parse(&[("$select", "Name")]).unwrap();
        assert!(options.typed(QueryOptionKind::Select).is_some());
        assert_eq!(
            options.select_expand().unwrap().clause().selected,
            vec!["Name".to_owned()]
        );
    }

    #[test]
    fn count_request_is_captured() {
        let raw = RawOptionSet::default();
        let mut scope = RequestScope::from_path("/Customers/$count");
        let options = QueryOptions::parse(ctx(), raw, &mut scope).unwrap();
        assert!(options.is_count_request());
        assert!(options.count().is_none());
        assert!(options.is_present(QueryOptionKind::Count));
    }

    #[test]
    fn first_error_wins() {
        let err = parse(&[("$top", "-3"), ("$skip", "x")]).unwrap_err();
        assert!(matches!(
            err,
            Error::NegativeValue {
                option: QueryOptionKind::Top,
                ..
            }
        ));
    }

    #[test]
    fn unknown_expand_target_is_a_grammar_error() {
        let err = parse(&[("$expand", "Invoices")]).unwrap_err();
        assert!(matches!(
            err,
            Error::Grammar {
                option: QueryOptionKind::Expand,
                ..
            }
        ));
    }
}
