//! Expression grammar seam.
//!
//! The option parser never interprets `$filter`, `$orderby`, `$select` or
//! `$expand` text itself; it asks the [`ExpressionGrammar`] attached to the
//! [`QueryContext`]. [`ODataGrammar`] is the default: `$filter` goes through
//! `odata-params` and is then bound against the element type, the other three
//! use small hand-written parsers.

use crate::allowed::AllowedFunctions;
use crate::ast::Expr;
use crate::clause::{
    ExpandItem, FilterClause, OrderByClause, OrderKey, SelectExpandClause, SortDir,
};
use crate::model::{EdmModel, EntityType, QueryContext};

/// Maximum `$expand` nesting the parser descends into.
pub const MAX_EXPAND_NESTING: usize = 32;
pub const MAX_ORDERBY_LEN: usize = 1024;
/// Hard cap on `$filter` text, checked before parsing.
pub const MAX_FILTER_LEN: usize = 8 * 1024;
/// Deepest `$filter` nesting of parentheses and `not` accepted by the parser.
pub const MAX_FILTER_NESTING: usize = 8;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("unknown property '{0}'")]
    UnknownProperty(String),

    #[error("unknown navigation property '{0}'")]
    UnknownNavigation(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("expression parsing unavailable: {0}")]
    ParsingUnavailable(&'static str),
}

/// Parses option text into clauses bound to a schema context.
pub trait ExpressionGrammar: Send + Sync {
    /// # Errors
    /// Returns `GrammarError` when the text is malformed or references
    /// members the element type does not have.
    fn parse_filter(&self, raw: &str, ctx: &QueryContext) -> Result<FilterClause, GrammarError>;

    /// # Errors
    /// Returns `GrammarError` when a clause is malformed or names an unknown property.
    fn parse_order_by(&self, raw: &str, ctx: &QueryContext) -> Result<OrderByClause, GrammarError>;

    /// Parse `$select` and `$expand` together; expansions may carry nested
    /// `$select`/`$expand` options.
    ///
    /// # Errors
    /// Returns `GrammarError` on malformed text or unknown members.
    fn parse_select_and_expand(
        &self,
        select: Option<&str>,
        expand: Option<&str>,
        ctx: &QueryContext,
    ) -> Result<SelectExpandClause, GrammarError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ODataGrammar;

impl ExpressionGrammar for ODataGrammar {
    #[cfg(feature = "with-odata-params")]
    fn parse_filter(&self, raw: &str, ctx: &QueryContext) -> Result<FilterClause, GrammarError> {
        use odata_params::filters as od;

        let raw = raw.trim();
        check_filter_shape(raw)?;
        let parsed = od::parse_str(raw).map_err(|e| GrammarError::Syntax(format!("{e:?}")))?;
        let expr = bind_filter(parsed.into(), ctx.element_type(), ctx.model())?;
        Ok(FilterClause::new(expr))
    }

    #[cfg(not(feature = "with-odata-params"))]
    fn parse_filter(&self, _raw: &str, _ctx: &QueryContext) -> Result<FilterClause, GrammarError> {
        Err(GrammarError::ParsingUnavailable(
            "$filter parsing requires 'with-odata-params' feature",
        ))
    }

    fn parse_order_by(
        &self,
        raw: &str,
        ctx: &QueryContext,
    ) -> Result<OrderByClause, GrammarError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(OrderByClause::empty());
        }
        if raw.len() > MAX_ORDERBY_LEN {
            return Err(GrammarError::Syntax("$orderby too long".into()));
        }

        let mut keys = Vec::new();
        for part in raw.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let tokens: Vec<&str> = part.split_whitespace().collect();
            let (field, dir) = match tokens.as_slice() {
                [field] => (*field, SortDir::Asc),
                [field, dir] if dir.eq_ignore_ascii_case("asc") => (*field, SortDir::Asc),
                [field, dir] if dir.eq_ignore_ascii_case("desc") => (*field, SortDir::Desc),
                _ => {
                    return Err(GrammarError::Syntax(format!(
                        "invalid orderby clause: {part}"
                    )));
                }
            };

            keys.push(OrderKey {
                field: resolve_path(field, ctx.element_type(), ctx.model())?,
                dir,
            });
        }

        Ok(OrderByClause(keys))
    }

    fn parse_select_and_expand(
        &self,
        select: Option<&str>,
        expand: Option<&str>,
        ctx: &QueryContext,
    ) -> Result<SelectExpandClause, GrammarError> {
        parse_clause(select, expand, ctx.element_type(), ctx.model(), 0)
    }
}

/// Reject `$filter` text the parser cannot handle in bounded time and stack.
///
/// Each open parenthesis and each `not` in a run of `not`s adds one level;
/// string literals are skipped.
#[cfg_attr(not(feature = "with-odata-params"), allow(dead_code))]
fn check_filter_shape(raw: &str) -> Result<(), GrammarError> {
    if raw.len() > MAX_FILTER_LEN {
        return Err(GrammarError::Syntax(format!(
            "$filter exceeds {MAX_FILTER_LEN} bytes"
        )));
    }

    let mut scan = NestingScan::default();
    let mut word = String::new();
    let mut in_string = false;

    for c in raw.chars().chain(std::iter::once(' ')) {
        if in_string {
            in_string = c != '\'';
        } else if c.is_ascii_alphanumeric() || c == '_' {
            word.push(c);
        } else {
            scan.word(&word)?;
            word.clear();
            in_string = c == '\'';
            scan.punct(c)?;
        }
    }
    Ok(())
}

/// Running nesting depth of a `$filter` scan.
#[derive(Default)]
struct NestingScan {
    /// Depth at each open parenthesis, restored when it closes.
    outer: Vec<usize>,
    depth: usize,
    nots: usize,
}

impl NestingScan {
    fn word(&mut self, word: &str) -> Result<(), GrammarError> {
        if word.is_empty() {
            return Ok(());
        }
        if !word.eq_ignore_ascii_case("not") {
            self.nots = 0;
            return Ok(());
        }
        self.nots += 1;
        self.check(self.depth + self.nots)
    }

    fn punct(&mut self, c: char) -> Result<(), GrammarError> {
        match c {
            '(' => {
                self.outer.push(self.depth);
                self.depth += self.nots + 1;
                self.nots = 0;
                self.check(self.depth)
            }
            ')' => {
                self.depth = self.outer.pop().ok_or_else(|| {
                    GrammarError::Syntax("unbalanced parentheses in $filter".into())
                })?;
                self.nots = 0;
                Ok(())
            }
            c if c.is_whitespace() => Ok(()),
            _ => {
                self.nots = 0;
                Ok(())
            }
        }
    }

    fn check(&self, depth: usize) -> Result<(), GrammarError> {
        if depth > MAX_FILTER_NESTING {
            return Err(GrammarError::Syntax(format!(
                "$filter nesting exceeds the maximum of {MAX_FILTER_NESTING}"
            )));
        }
        Ok(())
    }
}

/// Resolve identifiers to canonical property paths and check function names.
pub(crate) fn bind_filter(
    expr: Expr,
    ty: &EntityType,
    model: &EdmModel,
) -> Result<Expr, GrammarError> {
    let bind = |e: Box<Expr>| bind_filter(*e, ty, model).map(Box::new);
    Ok(match expr {
        Expr::And(a, b) => Expr::And(bind(a)?, bind(b)?),
        Expr::Or(a, b) => Expr::Or(bind(a)?, bind(b)?),
        Expr::Not(x) => Expr::Not(bind(x)?),
        Expr::Compare(l, op, r) => Expr::Compare(bind(l)?, op, bind(r)?),
        Expr::Arithmetic(l, op, r) => Expr::Arithmetic(bind(l)?, op, bind(r)?),
        Expr::In(l, list) => Expr::In(
            bind(l)?,
            list.into_iter()
                .map(|item| bind_filter(item, ty, model))
                .collect::<Result<_, _>>()?,
        ),
        Expr::Function(name, args) => {
            if AllowedFunctions::from_function_name(&name).is_none() {
                return Err(GrammarError::UnknownFunction(name));
            }
            Expr::Function(
                name.to_ascii_lowercase(),
                args.into_iter()
                    .map(|arg| bind_filter(arg, ty, model))
                    .collect::<Result<_, _>>()?,
            )
        }
        Expr::Identifier(path) => Expr::Identifier(resolve_path(&path, ty, model)?),
        value @ Expr::Value(_) => value,
    })
}

/// Resolve `Nav/Nav/Prop` against `ty`, returning the canonical spelling.
fn resolve_path(path: &str, ty: &EntityType, model: &EdmModel) -> Result<String, GrammarError> {
    let mut current = ty;
    let mut resolved = Vec::new();
    let mut segments = path.split('/').peekable();

    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            let property = current
                .find_property(segment)
                .ok_or_else(|| GrammarError::UnknownProperty(path.to_owned()))?;
            resolved.push(property.name.clone());
            break;
        }

        let navigation = current
            .find_navigation(segment)
            .ok_or_else(|| GrammarError::UnknownNavigation(segment.to_owned()))?;
        if navigation.collection {
            return Err(GrammarError::Syntax(format!(
                "collection-valued navigation '{}' cannot appear in a property path",
                navigation.name
            )));
        }
        resolved.push(navigation.name.clone());
        current = model
            .find_type(&navigation.target)
            .ok_or_else(|| GrammarError::UnknownNavigation(navigation.name.clone()))?;
    }

    Ok(resolved.join("/"))
}

fn parse_clause(
    select: Option<&str>,
    expand: Option<&str>,
    ty: &EntityType,
    model: &EdmModel,
    nesting: usize,
) -> Result<SelectExpandClause, GrammarError> {
    if nesting > MAX_EXPAND_NESTING {
        return Err(GrammarError::Syntax("$expand nested too deeply".into()));
    }

    let mut clause = SelectExpandClause {
        navigation_properties: ty
            .navigation_properties()
            .iter()
            .map(|n| n.name.clone())
            .collect(),
        ..SelectExpandClause::default()
    };

    if let Some(select) = select.filter(|s| !s.trim().is_empty()) {
        clause.all_selected = false;
        for item in split_top_level(select, ',')? {
            if item == "*" {
                clause.all_selected = true;
                continue;
            }
            let name = if let Some(p) = ty.find_property(item) {
                p.name.clone()
            } else if let Some(n) = ty.find_navigation(item) {
                n.name.clone()
            } else {
                return Err(GrammarError::UnknownProperty(item.to_owned()));
            };
            if !clause.selected.contains(&name) {
                clause.selected.push(name);
            }
        }
    }

    if let Some(expand) = expand {
        for item in split_top_level(expand, ',')? {
            let expansion = parse_expand_item(item, ty, model, nesting)?;
            if clause.find_expansion(&expansion.navigation).is_some() {
                return Err(GrammarError::Syntax(format!(
                    "navigation '{}' expanded more than once",
                    expansion.navigation
                )));
            }
            clause.expanded.push(expansion);
        }
    }

    Ok(clause)
}

fn parse_expand_item(
    item: &str,
    ty: &EntityType,
    model: &EdmModel,
    nesting: usize,
) -> Result<ExpandItem, GrammarError> {
    let (name, options) = match item.find('(') {
        Some(open) => {
            let inner = item[open + 1..].strip_suffix(')').ok_or_else(|| {
                GrammarError::Syntax(format!("unbalanced parentheses in '{item}'"))
            })?;
            (item[..open].trim(), Some(inner))
        }
        None => (item, None),
    };

    let navigation = ty
        .find_navigation(name)
        .ok_or_else(|| GrammarError::UnknownNavigation(name.to_owned()))?;
    let target = model
        .find_type(&navigation.target)
        .ok_or_else(|| GrammarError::UnknownNavigation(navigation.name.clone()))?;

    let mut nested_select = None;
    let mut nested_expand = None;
    if let Some(options) = options {
        for option in split_top_level(options, ';')? {
            let (key, value) = option
                .split_once('=')
                .ok_or_else(|| GrammarError::Syntax(format!("invalid expand option '{option}'")))?;
            match key.trim().to_ascii_lowercase().as_str() {
                "$select" => nested_select = Some(value),
                "$expand" => nested_expand = Some(value),
                other => {
                    return Err(GrammarError::Syntax(format!(
                        "unsupported expand option '{other}'"
                    )));
                }
            }
        }
    }

    Ok(ExpandItem {
        navigation: navigation.name.clone(),
        collection: navigation.collection,
        nested: parse_clause(nested_select, nested_expand, target, model, nesting + 1)?,
    })
}

/// Split on `sep` outside parentheses; items are trimmed and blanks dropped.
fn split_top_level(raw: &str, sep: char) -> Result<Vec<&str>, GrammarError> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in raw.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    GrammarError::Syntax(format!("unbalanced parentheses in '{raw}'"))
                })?;
            }
            c if c == sep && depth == 0 => {
                items.push(raw[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(GrammarError::Syntax(format!(
            "unbalanced parentheses in '{raw}'"
        )));
    }
    items.push(raw[start..].trim());
    items.retain(|item| !item.is_empty());
    Ok(items)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::ast::{CompareOperator, Value};
    use crate::model::FieldKind;
    use std::sync::Arc;

    fn ctx() -> Arc<QueryContext> {
        let model = EdmModel::new()
            .entity_type(
                EntityType::new("Customer")
                    .key("Id", FieldKind::I64)
                    .property("Name", FieldKind::String)
                    .reference("Address", "Address")
                    .collection("Orders", "Order"),
            )
            .entity_type(
                EntityType::new("Order")
                    .key("Id", FieldKind::I64)
                    .property("Total", FieldKind::Decimal)
                    .collection("Items", "Item"),
            )
            .entity_type(EntityType::new("Item").key("Sku", FieldKind::String))
            .entity_type(EntityType::new("Address").property("City", FieldKind::String));
        QueryContext::builder()
            .model(Arc::new(model))
            .element_type("Customer")
            .build()
            .unwrap()
    }

    #[test]
    fn orderby_resolves_names_and_directions() {
        let ctx = ctx();
        let order = ODataGrammar
            .parse_order_by("name DESC, id", &ctx)
            .unwrap();
        assert_eq!(order.to_string(), "Name desc, Id asc");
    }

    #[test]
    fn orderby_follows_single_valued_navigation() {
        let ctx = ctx();
        let order = ODataGrammar.parse_order_by("address/city", &ctx).unwrap();
        assert_eq!(order.to_string(), "Address/City asc");

        let err = ODataGrammar.parse_order_by("Orders/Total", &ctx).unwrap_err();
        assert!(matches!(err, GrammarError::Syntax(_)));
    }

    #[test]
    fn orderby_rejects_unknown_and_malformed() {
        let ctx = ctx();
        assert_eq!(
            ODataGrammar.parse_order_by("Age", &ctx).unwrap_err(),
            GrammarError::UnknownProperty("Age".into())
        );
        assert!(matches!(
            ODataGrammar.parse_order_by("Name up", &ctx).unwrap_err(),
            GrammarError::Syntax(_)
        ));
        assert!(ODataGrammar.parse_order_by("  ", &ctx).unwrap().is_empty());
    }

    #[test]
    fn filter_binding_canonicalizes_identifiers() {
        let ctx = ctx();
        let expr = Expr::compare("name", CompareOperator::Eq, Value::from("x")).and(
            Expr::Function(
                "StartsWith".into(),
                vec![Expr::Identifier("address/city".into()), Expr::Value("B".into())],
            ),
        );
        let bound = bind_filter(expr, ctx.element_type(), ctx.model()).unwrap();
        let expected = Expr::compare("Name", CompareOperator::Eq, Value::from("x")).and(
            Expr::Function(
                "startswith".into(),
                vec![Expr::Identifier("Address/City".into()), Expr::Value("B".into())],
            ),
        );
        assert_eq!(bound, expected);
    }

    #[test]
    fn filter_binding_rejects_unknown_members() {
        let ctx = ctx();
        let err = bind_filter(Expr::Identifier("Nope".into()), ctx.element_type(), ctx.model())
            .unwrap_err();
        assert_eq!(err, GrammarError::UnknownProperty("Nope".into()));

        let err = bind_filter(
            Expr::Function("geo.distance".into(), vec![]),
            ctx.element_type(),
            ctx.model(),
        )
        .unwrap_err();
        assert_eq!(err, GrammarError::UnknownFunction("geo.distance".into()));
    }

    #[cfg(feature = "with-odata-params")]
    #[test]
    fn filter_parses_through_odata_params() {
        let ctx = ctx();
        let clause = ODataGrammar.parse_filter("name eq 'x'", &ctx).unwrap();
        assert_eq!(
            clause.expression(),
            &Expr::compare("Name", CompareOperator::Eq, Value::from("x"))
        );

        let err = ODataGrammar.parse_filter("name eq", &ctx).unwrap_err();
        assert!(matches!(err, GrammarError::Syntax(_)));
    }

    #[test]
    fn filter_shape_limits_length() {
        let long = format!("Name eq '{}'", "x".repeat(MAX_FILTER_LEN));
        assert!(matches!(check_filter_shape(&long), Err(GrammarError::Syntax(_))));
        assert!(check_filter_shape("Name eq 'x'").is_ok());
    }

    #[test]
    fn filter_shape_limits_parentheses() {
        let nested = |n: usize| format!("{}Id eq 1{}", "(".repeat(n), ")".repeat(n));
        assert!(check_filter_shape(&nested(MAX_FILTER_NESTING)).is_ok());
        assert!(matches!(
            check_filter_shape(&nested(MAX_FILTER_NESTING + 1)),
            Err(GrammarError::Syntax(_))
        ));
        assert!(check_filter_shape(&nested(2000)).is_err());
        assert!(check_filter_shape("(Id eq 1) and (Id eq 2) or (Id eq 3)").is_ok());
        assert!(check_filter_shape("Id eq 1)").is_err());
    }

    #[test]
    fn filter_shape_limits_not_chains() {
        let chain = |n: usize| format!("{}Id eq 1", "not ".repeat(n));
        assert!(check_filter_shape(&chain(MAX_FILTER_NESTING)).is_ok());
        assert!(check_filter_shape(&chain(MAX_FILTER_NESTING + 1)).is_err());
        assert!(check_filter_shape(&chain(1000)).is_err());

        // `not` and parentheses share one budget.
        let mixed = "not (not (not (not (not (Id eq 1)))))";
        assert!(check_filter_shape(mixed).is_err());
        assert!(check_filter_shape("not (Id eq 1) and not (Id eq 2)").is_ok());
    }

    #[test]
    fn filter_shape_ignores_string_literals() {
        let text = format!("Name eq '{}not not'", "(".repeat(50));
        assert!(check_filter_shape(&text).is_ok());
        assert!(check_filter_shape("Name eq 'it''s (' and Notes eq 'x'").is_ok());
    }

    #[cfg(feature = "with-odata-params")]
    #[test]
    fn filter_shape_is_checked_before_parsing() {
        let ctx = ctx();
        let deep = format!("{}Id eq 1", "not ".repeat(1000));
        assert!(matches!(
            ODataGrammar.parse_filter(&deep, &ctx),
            Err(GrammarError::Syntax(_))
        ));
        let nested = format!("{}Id eq 1{}", "(".repeat(16), ")".repeat(16));
        assert!(matches!(
            ODataGrammar.parse_filter(&nested, &ctx),
            Err(GrammarError::Syntax(_))
        ));
    }

    #[test]
    fn select_only() {
        let ctx = ctx();
        let clause = ODataGrammar
            .parse_select_and_expand(Some("name, id, name"), None, &ctx)
            .unwrap();
        assert!(!clause.all_selected);
        assert_eq!(clause.selected, vec!["Name".to_owned(), "Id".to_owned()]);
        assert_eq!(clause.depth(), 0);

        let star = ODataGrammar
            .parse_select_and_expand(Some("*"), None, &ctx)
            .unwrap();
        assert!(star.all_selected);
    }

    #[test]
    fn nested_expand_with_options() {
        let ctx = ctx();
        let clause = ODataGrammar
            .parse_select_and_expand(
                Some("Name"),
                Some("orders($select=Total;$expand=Items), Address"),
                &ctx,
            )
            .unwrap();
        assert_eq!(clause.depth(), 2);

        let orders = clause.find_expansion("Orders").unwrap();
        assert!(orders.collection);
        assert_eq!(orders.nested.selected, vec!["Total".to_owned()]);
        assert_eq!(orders.nested.expanded[0].navigation, "Items");
        assert!(!clause.find_expansion("Address").unwrap().collection);
    }

    #[test]
    fn expand_errors() {
        let ctx = ctx();
        let grammar = ODataGrammar;
        assert_eq!(
            grammar
                .parse_select_and_expand(None, Some("Friends"), &ctx)
                .unwrap_err(),
            GrammarError::UnknownNavigation("Friends".into())
        );
        assert!(matches!(
            grammar
                .parse_select_and_expand(None, Some("Orders($select=Total"), &ctx)
                .unwrap_err(),
            GrammarError::Syntax(_)
        ));
        assert!(matches!(
            grammar
                .parse_select_and_expand(None, Some("Orders,orders"), &ctx)
                .unwrap_err(),
            GrammarError::Syntax(_)
        ));
        assert!(matches!(
            grammar
                .parse_select_and_expand(None, Some("Orders($top=1)"), &ctx)
                .unwrap_err(),
            GrammarError::Syntax(_)
        ));
    }

    #[test]
    fn split_respects_parentheses() {
        assert_eq!(
            split_top_level("a(b,c), d ,", ',').unwrap(),
            vec!["a(b,c)", "d"]
        );
        assert!(split_top_level("a)(", ',').is_err());
    }
}
