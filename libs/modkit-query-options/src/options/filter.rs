use std::sync::Arc;

use crate::allowed::{
    AllowedArithmeticOperators, AllowedFunctions, AllowedLogicalOperators, QueryOptionKind,
};
use crate::ast::{ArithmeticOperator, CompareOperator, Expr};
use crate::clause::FilterClause;
use crate::error::Error;
use crate::model::QueryContext;
use crate::settings::ValidationSettings;

/// `$filter`: a predicate over the element type.
#[derive(Clone, Debug)]
pub struct FilterOption {
    raw: String,
    clause: FilterClause,
    context: Arc<QueryContext>,
}

impl FilterOption {
    /// # Errors
    /// Returns `Error::Grammar` when the grammar rejects the expression.
    pub fn parse(raw: &str, context: Arc<QueryContext>) -> Result<Self, Error> {
        let clause = context
            .grammar()
            .parse_filter(raw, &context)
            .map_err(|source| Error::Grammar {
                option: QueryOptionKind::Filter,
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
    pub fn clause(&self) -> &FilterClause {
        &self.clause
    }

    #[must_use]
    pub fn context(&self) -> &QueryContext {
        &self.context
    }

    /// Check length, size and the operators and functions the tree uses.
    ///
    /// # Errors
    /// Returns `Error::LimitExceeded` on the first violation.
    pub fn validate(&self, settings: &ValidationSettings) -> Result<(), Error> {
        let len = self.raw.chars().count();
        if len > settings.max_filter_length {
            return Err(Error::limit(
                QueryOptionKind::Filter,
                format!(
                    "length {len} exceeds the maximum of {}",
                    settings.max_filter_length
                ),
            ));
        }

        let nodes = self.clause.node_count();
        if nodes > settings.max_node_count {
            return Err(Error::limit(
                QueryOptionKind::Filter,
                format!(
                    "node count {nodes} exceeds the maximum of {}",
                    settings.max_node_count
                ),
            ));
        }

        let mut violation = None;
        self.clause.expression().walk(&mut |node| {
            if violation.is_none() {
                violation = disallowed_in(node, settings);
            }
        });
        match violation {
            Some(reason) => Err(Error::limit(QueryOptionKind::Filter, reason)),
            None => Ok(()),
        }
    }
}

fn disallowed_in(node: &Expr, settings: &ValidationSettings) -> Option<String> {
    match node {
        Expr::And(..) => logical(AllowedLogicalOperators::AND, "and", settings),
        Expr::Or(..) => logical(AllowedLogicalOperators::OR, "or", settings),
        Expr::Not(_) => logical(AllowedLogicalOperators::NOT, "not", settings),
        Expr::In(..) => logical(AllowedLogicalOperators::IN, "in", settings),
        Expr::Compare(_, op, _) => {
            let flag = match op {
                CompareOperator::Eq => AllowedLogicalOperators::EQUAL,
                CompareOperator::Ne => AllowedLogicalOperators::NOT_EQUAL,
                CompareOperator::Gt => AllowedLogicalOperators::GREATER_THAN,
                CompareOperator::Ge => AllowedLogicalOperators::GREATER_THAN_OR_EQUAL,
                CompareOperator::Lt => AllowedLogicalOperators::LESS_THAN,
                CompareOperator::Le => AllowedLogicalOperators::LESS_THAN_OR_EQUAL,
            };
            logical(flag, &op.to_string(), settings)
        }
        Expr::Arithmetic(_, op, _) => {
            let flag = match op {
                ArithmeticOperator::Add => AllowedArithmeticOperators::ADD,
                ArithmeticOperator::Sub => AllowedArithmeticOperators::SUBTRACT,
                ArithmeticOperator::Mul => AllowedArithmeticOperators::MULTIPLY,
                ArithmeticOperator::Div => AllowedArithmeticOperators::DIVIDE,
                ArithmeticOperator::Mod => AllowedArithmeticOperators::MODULO,
            };
            (!settings.allowed_arithmetic_operators.contains(flag))
                .then(|| format!("arithmetic operator '{op}' is not allowed"))
        }
        Expr::Function(name, _) => match AllowedFunctions::from_function_name(name) {
            Some(flag) if settings.allowed_functions.contains(flag) => None,
            _ => Some(format!("function '{name}' is not allowed")),
        },
        Expr::Identifier(_) | Expr::Value(_) => None,
    }
}

fn logical(
    flag: AllowedLogicalOperators,
    name: &str,
    settings: &ValidationSettings,
) -> Option<String> {
    (!settings.allowed_logical_operators.contains(flag))
        .then(|| format!("logical operator '{name}' is not allowed"))
}
