#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Query-option processing for collection endpoints.
//!
//! Turns raw `$filter`, `$orderby`, `$top`, `$skip`, `$select`, `$expand`,
//! `$count` (and the raw-only `$format`, `$skiptoken`, `$deltatoken`,
//! `$apply`) parameters into typed [`QueryOptions`], gates them against
//! [`ValidationSettings`], and applies them to a [`Queryable`] source.
//!
//! ```ignore
//! let raw = RawOptionSet::from_query_string("$filter=Age gt 30&$top=5")?;
//! let mut scope = RequestScope::from_path(request_path);
//! let options = QueryOptions::parse(ctx, raw, &mut scope)?;
//! options.validate(&settings)?;
//! let page = options.apply_to(collection, &ApplySettings::new().with_page_size(50));
//! ```

pub mod allowed;
pub mod apply;
pub mod ast;
pub mod clause;
pub mod collection;
pub mod error;
pub mod eval;
pub mod grammar;
pub mod model;
pub mod options;
pub mod problem;
pub mod query_options;
pub mod raw;
pub mod request;
pub mod settings;
mod validator;

pub use allowed::{
    AllowedArithmeticOperators, AllowedFunctions, AllowedLogicalOperators, AllowedQueryOptions,
    QueryOptionKind,
};
pub use apply::{Countable, Queryable, effective_take};
pub use clause::{
    ExpandItem, FilterClause, OrderByClause, OrderKey, SelectExpandClause, SortDir,
};
pub use collection::{InMemoryCollection, QueryPlan, QueryStep};
pub use error::Error;
pub use grammar::{ExpressionGrammar, GrammarError, ODataGrammar};
pub use model::{EdmModel, EntityType, FieldKind, QueryContext, QueryContextBuilder};
pub use options::{
    ApplyOption, CountOption, FilterOption, OrderByOption, PresentOption, SelectExpandOption,
    SkipOption, TopOption,
};
pub use problem::{Problem, ValidationViolation};
pub use query_options::QueryOptions;
pub use raw::RawOptionSet;
pub use request::RequestScope;
pub use settings::{ApplySettings, ValidationSettings};
