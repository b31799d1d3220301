#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Property-based tests for parsing, the presence gate and paging.

use std::sync::Arc;

use modkit_query_options::{
    AllowedQueryOptions, EdmModel, EntityType, Error, FieldKind, QueryContext, QueryOptionKind,
    QueryOptions, RawOptionSet, RequestScope, ValidationSettings, effective_take,
};
use proptest::prelude::*;

fn context() -> Arc<QueryContext> {
    let model = EdmModel::new()
        .entity_type(
            EntityType::new("Item")
                .key("Id", FieldKind::I64)
                .property("Name", FieldKind::String)
                .collection("Parts", "Part"),
        )
        .entity_type(EntityType::new("Part").key("Id", FieldKind::I64));
    QueryContext::builder()
        .model(Arc::new(model))
        .element_type("Item")
        .build()
        .unwrap()
}

fn parse(pairs: &[(&str, String)]) -> Result<QueryOptions, Error> {
    let raw = RawOptionSet::from_pairs(pairs.iter().map(|(k, v)| (*k, v.clone())))?;
    QueryOptions::parse(context(), raw, &mut RequestScope::new())
}

/// `$top` above this fails its own limit check.
const MAX_TOP: u64 = 10;

/// One value per option kind; all of them parse and only `$top` can break a limit.
fn sample(top: u64) -> Vec<(QueryOptionKind, String)> {
    let mut sample = vec![
        (QueryOptionKind::OrderBy, "Name".to_owned()),
        (QueryOptionKind::Top, top.to_string()),
        (QueryOptionKind::Skip, "1".to_owned()),
        (QueryOptionKind::Select, "Name".to_owned()),
        (QueryOptionKind::Expand, "Parts".to_owned()),
        (QueryOptionKind::Count, "true".to_owned()),
        (QueryOptionKind::Format, "json".to_owned()),
        (QueryOptionKind::SkipToken, "t".to_owned()),
        (QueryOptionKind::DeltaToken, "d".to_owned()),
        (QueryOptionKind::Apply, "aggregate".to_owned()),
    ];
    if cfg!(feature = "with-odata-params") {
        sample.push((QueryOptionKind::Filter, "Name eq 'x'".to_owned()));
    }
    sample
}

proptest! {
    /// Any non-negative integer is parsed back to itself
    #[test]
    fn top_and_skip_round_trip(top in any::<u64>(), skip in any::<u64>()) {
        let options = parse(&[("$top", top.to_string()), ("$skip", skip.to_string())]).unwrap();
        prop_assert_eq!(options.top().unwrap().value(), top);
        prop_assert_eq!(options.skip().unwrap().value(), skip);
    }

    /// Negative integers are rejected with the option named
    #[test]
    fn negative_values_are_rejected(value in 1i64..=i64::MAX) {
        let err = parse(&[("$skip", format!("-{value}"))]).unwrap_err();
        let is_negative = matches!(err, Error::NegativeValue { option: QueryOptionKind::Skip, .. });
        prop_assert!(is_negative);
    }

    /// Whitespace-only values of required options are empty
    #[test]
    fn blank_values_are_empty(blank in "[ \t]{0,4}") {
        let err = parse(&[("$top", blank)]).unwrap_err();
        prop_assert_eq!(err, Error::EmptyQueryOption(QueryOptionKind::Top));
    }

    /// Effective take is the minimum of the present bounds
    #[test]
    fn effective_take_is_min(
        page in proptest::option::of(any::<u64>()),
        top in proptest::option::of(any::<u64>()),
    ) {
        let take = effective_take(page, top);
        match (page, top) {
            (None, None) => prop_assert_eq!(take, None),
            _ => {
                let expected = page.unwrap_or(u64::MAX).min(top.unwrap_or(u64::MAX));
                prop_assert_eq!(take, Some(expected));
            }
        }
    }

    /// Validation fails with a disallowed error iff a present option's bit is
    /// cleared; limit errors only surface once every present option is allowed
    #[test]
    fn gate_rejects_exactly_missing_bits(
        present in any::<u16>(),
        allowed in any::<u16>(),
        top in 0..=2 * MAX_TOP,
    ) {
        let chosen: Vec<_> = sample(top)
            .into_iter()
            .enumerate()
            .filter(|(i, _)| present & (1 << i) != 0)
            .map(|(_, (kind, value))| (kind.canonical_name(), value))
            .collect();
        let options = parse(&chosen).unwrap();
        let policy = AllowedQueryOptions::from_bits_truncate(allowed);
        let settings = ValidationSettings::default()
            .with_allowed_query_options(policy)
            .with_max_top(MAX_TOP);

        let first_missing = QueryOptionKind::ALL
            .into_iter()
            .find(|kind| options.is_present(*kind) && !policy.contains(kind.flag()));
        let top_too_large = options.top().is_some_and(|t| t.value() > MAX_TOP);

        match (options.validate(&settings), first_missing) {
            (Err(Error::DisallowedQueryOption(kind)), Some(missing)) => {
                prop_assert_eq!(kind, missing);
            }
            (Err(Error::LimitExceeded { option, .. }), None) => {
                prop_assert!(top_too_large);
                prop_assert_eq!(option, QueryOptionKind::Top);
            }
            (Ok(()), None) => prop_assert!(!top_too_large),
            (result, missing) => {
                prop_assert!(false, "unexpected {:?} for missing {:?}", result, missing);
            }
        }
    }

    /// Validating twice gives the same result
    #[test]
    fn validate_is_idempotent(top in 0u64..200, max_top in 0u64..200) {
        let options = parse(&[("$top", top.to_string())]).unwrap();
        let settings = ValidationSettings::default().with_max_top(max_top);
        prop_assert_eq!(options.validate(&settings), options.validate(&settings));
        prop_assert_eq!(options.validate(&settings).is_ok(), top <= max_top);
    }
}
