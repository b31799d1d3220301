//! Evaluation of bound `$filter` trees over JSON records.
//!
//! Records are `serde_json::Value` objects whose keys are matched
//! case-insensitively against property names. Missing members read as
//! `null`. Comparisons follow the filter language:
//! `null eq null` holds, any other comparison with `null` is false except `ne`.

use std::cmp::Ordering;
use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive, Zero};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc};
use serde_json::Value as Json;
use uuid::Uuid;

use crate::ast::{ArithmeticOperator, CompareOperator, Expr, Value};

/// True when `expr` evaluates to `true` for `record`.
#[must_use]
pub fn matches(expr: &Expr, record: &Json) -> bool {
    matches!(evaluate(expr, record), Value::Bool(true))
}

/// Evaluate `expr` against `record`.
///
/// Type mismatches and invalid operations evaluate to `null`.
#[must_use]
pub fn evaluate(expr: &Expr, record: &Json) -> Value {
    match expr {
        Expr::And(a, b) => Value::Bool(matches(a, record) && matches(b, record)),
        Expr::Or(a, b) => Value::Bool(matches(a, record) || matches(b, record)),
        Expr::Not(x) => match evaluate(x, record) {
            Value::Bool(b) => Value::Bool(!b),
            _ => Value::Null,
        },
        Expr::Compare(l, op, r) => {
            let ordering = compare(&evaluate(l, record), &evaluate(r, record));
            Value::Bool(apply_compare(*op, ordering))
        }
        Expr::In(l, list) => {
            let needle = evaluate(l, record);
            Value::Bool(
                list.iter()
                    .any(|item| compare(&needle, &evaluate(item, record)) == Some(Ordering::Equal)),
            )
        }
        Expr::Arithmetic(l, op, r) => arithmetic(*op, evaluate(l, record), evaluate(r, record)),
        Expr::Function(name, args) => {
            let args: Vec<Value> = args.iter().map(|a| evaluate(a, record)).collect();
            call(name, &args)
        }
        Expr::Identifier(path) => field(record, path),
        Expr::Value(v) => v.clone(),
    }
}

/// Resolve a `/`-separated property path inside a record.
#[must_use]
pub fn lookup<'a>(record: &'a Json, path: &str) -> Option<&'a Json> {
    path.split('/').try_fold(record, |current, segment| {
        let Json::Object(map) = current else {
            return None;
        };
        map.get(segment).or_else(|| {
            map.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(segment))
                .map(|(_, v)| v)
        })
    })
}

/// Value of a property path; missing members and non-scalars read as `null`.
#[must_use]
pub fn field(record: &Json, path: &str) -> Value {
    lookup(record, path).map_or(Value::Null, from_json)
}

/// Convert a JSON scalar; arrays and objects read as `null`.
#[must_use]
pub fn from_json(value: &Json) -> Value {
    match value {
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => BigDecimal::from_str(&n.to_string()).map_or(Value::Null, Value::Number),
        Json::String(s) => Value::String(s.clone()),
        Json::Null | Json::Array(_) | Json::Object(_) => Value::Null,
    }
}

/// Total order used for sorting: null < bool < number < temporal/uuid < string.
#[must_use]
pub fn sort_order(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::Date(_) | Value::DateTime(_) | Value::Time(_) => 3,
            Value::Uuid(_) => 4,
            Value::String(_) => 5,
        }
    }

    compare(a, b).unwrap_or_else(|| rank(a).cmp(&rank(b)))
}

/// Compare two values, coercing strings to the other side's temporal or
/// UUID type. `None` when the values are not comparable.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::Number(y)) => Some(x.cmp(y)),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::DateTime(x), Value::DateTime(y)) => Some(x.cmp(y)),
        (Value::Date(x), Value::Date(y)) => Some(x.cmp(y)),
        (Value::Time(x), Value::Time(y)) => Some(x.cmp(y)),
        (Value::Uuid(x), Value::Uuid(y)) => Some(x.cmp(y)),
        (Value::String(s), other) => coerce(s, other).and_then(|v| compare(&v, other)),
        (other, Value::String(s)) => coerce(s, other).and_then(|v| compare(other, &v)),
        _ => None,
    }
}

/// Parse `s` as the type of `like`.
fn coerce(s: &str, like: &Value) -> Option<Value> {
    match like {
        Value::DateTime(_) => parse_datetime(s).map(Value::DateTime),
        Value::Date(_) => parse_date(s).map(Value::Date),
        Value::Time(_) => NaiveTime::from_str(s).ok().map(Value::Time),
        Value::Uuid(_) => Uuid::parse_str(s).ok().map(Value::Uuid),
        _ => None,
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn apply_compare(op: CompareOperator, ordering: Option<Ordering>) -> bool {
    match op {
        CompareOperator::Eq => ordering == Some(Ordering::Equal),
        CompareOperator::Ne => ordering != Some(Ordering::Equal),
        CompareOperator::Gt => ordering == Some(Ordering::Greater),
        CompareOperator::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        CompareOperator::Lt => ordering == Some(Ordering::Less),
        CompareOperator::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
    }
}

fn arithmetic(op: ArithmeticOperator, l: Value, r: Value) -> Value {
    let (Value::Number(x), Value::Number(y)) = (l, r) else {
        return Value::Null;
    };
    match op {
        ArithmeticOperator::Add => Value::Number(x + y),
        ArithmeticOperator::Sub => Value::Number(x - y),
        ArithmeticOperator::Mul => Value::Number(x * y),
        ArithmeticOperator::Div | ArithmeticOperator::Mod if y.is_zero() => Value::Null,
        ArithmeticOperator::Div => Value::Number(x / y),
        ArithmeticOperator::Mod => Value::Number(x % y),
    }
}

fn call(name: &str, args: &[Value]) -> Value {
    match (name, args) {
        ("contains", [Value::String(s), Value::String(p)]) => Value::Bool(s.contains(p.as_str())),
        ("startswith", [Value::String(s), Value::String(p)]) => {
            Value::Bool(s.starts_with(p.as_str()))
        }
        ("endswith", [Value::String(s), Value::String(p)]) => Value::Bool(s.ends_with(p.as_str())),
        ("length", [Value::String(s)]) => {
            i64::try_from(s.chars().count()).map_or(Value::Null, |n| Value::Number(n.into()))
        }
        ("indexof", [Value::String(s), Value::String(p)]) => {
            let index = s
                .find(p.as_str())
                .map_or(-1, |byte| i64::try_from(s[..byte].chars().count()).unwrap_or(-1));
            Value::Number(index.into())
        }
        ("substring", [Value::String(s), Value::Number(start)]) => {
            substring(s, start, None).map_or(Value::Null, Value::String)
        }
        ("substring", [Value::String(s), Value::Number(start), Value::Number(len)]) => {
            substring(s, start, Some(len)).map_or(Value::Null, Value::String)
        }
        ("tolower", [Value::String(s)]) => Value::String(s.to_lowercase()),
        ("toupper", [Value::String(s)]) => Value::String(s.to_uppercase()),
        ("trim", [Value::String(s)]) => Value::String(s.trim().to_owned()),
        ("concat", [Value::String(a), Value::String(b)]) => Value::String(format!("{a}{b}")),
        ("year" | "month" | "day" | "hour" | "minute" | "second", [arg]) => {
            date_part(name, arg).map_or(Value::Null, |n| Value::Number(n.into()))
        }
        ("round", [Value::Number(n)]) => Value::Number(n.with_scale_round(0, RoundingMode::HalfUp)),
        ("floor", [Value::Number(n)]) => Value::Number(n.with_scale_round(0, RoundingMode::Floor)),
        ("ceiling", [Value::Number(n)]) => {
            Value::Number(n.with_scale_round(0, RoundingMode::Ceiling))
        }
        _ => Value::Null,
    }
}

fn substring(s: &str, start: &BigDecimal, len: Option<&BigDecimal>) -> Option<String> {
    let chars = s.chars().skip(start.to_usize()?);
    Some(match len {
        Some(len) => chars.take(len.to_usize()?).collect(),
        None => chars.collect(),
    })
}

fn date_part(part: &str, arg: &Value) -> Option<u32> {
    let datetime = match arg {
        Value::DateTime(dt) => Some(*dt),
        Value::String(s) => parse_datetime(s),
        _ => None,
    };
    let date = match arg {
        Value::Date(d) => Some(*d),
        Value::String(s) => parse_date(s),
        _ => None,
    }
    .or_else(|| datetime.map(|dt| dt.date_naive()));
    let time = match arg {
        Value::Time(t) => Some(*t),
        _ => datetime.map(|dt| dt.time()),
    };

    match part {
        "year" => date.and_then(|d| u32::try_from(d.year()).ok()),
        "month" => date.map(|d| d.month()),
        "day" => date.map(|d| d.day()),
        "hour" => time.map(|t| t.hour()),
        "minute" => time.map(|t| t.minute()),
        "second" => time.map(|t| t.second()),
        _ => None,
    }
}
