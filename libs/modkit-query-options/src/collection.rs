//! `Queryable` implementations.
//!
//! [`InMemoryCollection`] evaluates every step immediately over JSON records.
//! [`QueryPlan`] only records the steps in order, for an executor that
//! translates them later (SQL, a remote store, ...).

use serde_json::{Map, Value};

use crate::apply::{Countable, Queryable};
use crate::clause::{FilterClause, OrderByClause, SelectExpandClause, SortDir};
use crate::eval;

/// JSON records held in memory.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InMemoryCollection {
    records: Vec<Value>,
}

impl InMemoryCollection {
    #[must_use]
    pub fn new(records: Vec<Value>) -> Self {
        Self { records }
    }

    /// Serialize `items` into records.
    ///
    /// # Errors
    /// Returns the serialization error of the first item that fails.
    pub fn from_serializable<T: serde::Serialize>(
        items: impl IntoIterator<Item = T>,
    ) -> Result<Self, serde_json::Error> {
        items
            .into_iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    #[must_use]
    pub fn records(&self) -> &[Value] {
        &self.records
    }

    #[must_use]
    pub fn into_records(self) -> Vec<Value> {
        self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<Value>> for InMemoryCollection {
    fn from(records: Vec<Value>) -> Self {
        Self::new(records)
    }
}

impl IntoIterator for InMemoryCollection {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl Queryable for InMemoryCollection {
    fn filter(mut self, clause: &FilterClause) -> Self {
        self.records
            .retain(|record| eval::matches(clause.expression(), record));
        self
    }

    fn order_by(mut self, clause: &OrderByClause) -> Self {
        // `sort_by` is stable, so ties keep their source order.
        self.records.sort_by(|a, b| {
            clause
                .keys()
                .map(|key| {
                    let ordering =
                        eval::sort_order(&eval::field(a, &key.field), &eval::field(b, &key.field));
                    match key.dir {
                        SortDir::Asc => ordering,
                        SortDir::Desc => ordering.reverse(),
                    }
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        self
    }

    fn select_expand(mut self, clause: &SelectExpandClause) -> Self {
        for record in &mut self.records {
            *record = project(record, clause);
        }
        self
    }

    fn skip(mut self, count: u64) -> Self {
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        self.records.drain(..count.min(self.records.len()));
        self
    }

    fn take(mut self, count: u64) -> Self {
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        self.records.truncate(count);
        self
    }
}

impl Countable for InMemoryCollection {
    fn count(&self) -> u64 {
        u64::try_from(self.records.len()).unwrap_or(u64::MAX)
    }
}

/// Shape one record according to `clause`.
///
/// Expanded navigation members are projected with their nested clause;
/// navigation members that are neither expanded nor selected are dropped.
fn project(record: &Value, clause: &SelectExpandClause) -> Value {
    let Value::Object(map) = record else {
        return record.clone();
    };

    let is = |names: &[String], key: &str| names.iter().any(|n| n.eq_ignore_ascii_case(key));

    let mut projected = Map::new();
    for (key, value) in map {
        if let Some(expansion) = clause.find_expansion(key) {
            projected.insert(key.clone(), project_expanded(value, &expansion.nested));
        } else if is(&clause.navigation_properties, key) {
            if !clause.all_selected && is(&clause.selected, key) {
                projected.insert(key.clone(), value.clone());
            }
        } else if clause.all_selected || is(&clause.selected, key) {
            projected.insert(key.clone(), value.clone());
        }
    }
    Value::Object(projected)
}

fn project_expanded(value: &Value, clause: &SelectExpandClause) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(|v| project(v, clause)).collect()),
        Value::Object(_) => project(value, clause),
        other => other.clone(),
    }
}

/// A step recorded by [`QueryPlan`].
#[derive(Clone, Debug, PartialEq)]
pub enum QueryStep {
    Filter(FilterClause),
    OrderBy(OrderByClause),
    SelectExpand(SelectExpandClause),
    Skip(u64),
    Take(u64),
}

/// Deferred execution: the ordered list of steps to run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryPlan {
    steps: Vec<QueryStep>,
}

impl QueryPlan {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn steps(&self) -> &[QueryStep] {
        &self.steps
    }

    /// Replay the recorded steps over an in-memory collection.
    #[must_use]
    pub fn execute(&self, source: InMemoryCollection) -> InMemoryCollection {
        self.steps
            .iter()
            .fold(source, |collection, step| match step {
                QueryStep::Filter(c) => collection.filter(c),
                QueryStep::OrderBy(c) => collection.order_by(c),
                QueryStep::SelectExpand(c) => collection.select_expand(c),
                QueryStep::Skip(n) => collection.skip(*n),
                QueryStep::Take(n) => collection.take(*n),
            })
    }

    fn push(mut self, step: QueryStep) -> Self {
        self.steps.push(step);
        self
    }
}

impl Queryable for QueryPlan {
    fn filter(self, clause: &FilterClause) -> Self {
        self.push(QueryStep::Filter(clause.clone()))
    }

    fn order_by(self, clause: &OrderByClause) -> Self {
        self.push(QueryStep::OrderBy(clause.clone()))
    }

    fn select_expand(self, clause: &SelectExpandClause) -> Self {
        self.push(QueryStep::SelectExpand(clause.clone()))
    }

    fn skip(self, count: u64) -> Self {
        self.push(QueryStep::Skip(count))
    }

    fn take(self, count: u64) -> Self {
        self.push(QueryStep::Take(count))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::ast::{CompareOperator, Expr};
    use crate::clause::{ExpandItem, OrderKey};
    use serde_json::json;

    fn people() -> InMemoryCollection {
        InMemoryCollection::new(vec![
            json!({"Id": 3, "Name": "Cy", "Age": 40}),
            json!({"Id": 1, "Name": "Al", "Age": 25}),
            json!({"Id": 2, "Name": "Bo", "Age": 40}),
        ])
    }

    fn ids(c: &InMemoryCollection) -> Vec<i64> {
        c.records().iter().filter_map(|r| r["Id"].as_i64()).collect()
    }

    #[test]
    fn filter_keeps_matches() {
        let clause = FilterClause::new(Expr::compare("Age", CompareOperator::Gt, 30.into()));
        assert_eq!(ids(&people().filter(&clause)), vec![3, 2]);
    }

    #[test]
    fn order_by_multiple_keys_is_stable() {
        let by_age_desc = OrderByClause(vec![OrderKey {
            field: "Age".into(),
            dir: SortDir::Desc,
        }]);
        assert_eq!(ids(&people().order_by(&by_age_desc)), vec![3, 2, 1]);

        let with_id = by_age_desc.ensure_tiebreaker("Id", SortDir::Asc);
        assert_eq!(ids(&people().order_by(&with_id)), vec![2, 3, 1]);
    }

    #[test]
    fn skip_and_take_saturate() {
        assert_eq!(ids(&people().skip(2)), vec![2]);
        assert!(people().skip(10).is_empty());
        assert_eq!(ids(&people().take(2)), vec![3, 1]);
        assert_eq!(people().take(u64::MAX).len(), 3);
    }

    #[test]
    fn projection_and_expansion() {
        let records = InMemoryCollection::new(vec![json!({
            "Id": 1,
            "Name": "Al",
            "Orders": [{"Id": 10, "Total": 5}, {"Id": 11, "Total": 7}],
            "Manager": {"Id": 9, "Name": "Mo"}
        })]);
        let clause = SelectExpandClause {
            all_selected: false,
            selected: vec!["Name".into()],
            expanded: vec![ExpandItem {
                navigation: "Orders".into(),
                collection: true,
                nested: SelectExpandClause {
                    all_selected: false,
                    selected: vec!["Total".into()],
                    ..SelectExpandClause::default()
                },
            }],
            navigation_properties: vec!["Orders".into(), "Manager".into()],
        };
        let projected = records.select_expand(&clause).into_records();
        assert_eq!(
            projected,
            vec![json!({"Name": "Al", "Orders": [{"Total": 5}, {"Total": 7}]})]
        );
    }

    #[test]
    fn all_selected_drops_unexpanded_navigation() {
        let records = InMemoryCollection::new(vec![json!({"Id": 1, "Manager": {"Id": 9}})]);
        let clause = SelectExpandClause {
            navigation_properties: vec!["Manager".into()],
            ..SelectExpandClause::default()
        };
        assert_eq!(
            records.select_expand(&clause).into_records(),
            vec![json!({"Id": 1})]
        );
    }

    #[test]
    fn plan_records_and_replays_steps() {
        let plan = QueryPlan::new().skip(1).take(1);
        assert_eq!(plan.steps(), &[QueryStep::Skip(1), QueryStep::Take(1)]);
        assert_eq!(ids(&plan.execute(people())), vec![1]);
    }

    #[test]
    fn count() {
        assert_eq!(people().count(), 3);
    }

    #[test]
    fn from_serializable() {
        #[derive(serde::Serialize)]
        struct Row {
            id: u32,
        }
        let c = InMemoryCollection::from_serializable([Row { id: 1 }, Row { id: 2 }]).unwrap();
        assert_eq!(c.records()[1], json!({"id": 2}));
    }
}
