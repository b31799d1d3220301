//! Option kinds and allow-list policies.
//!
//! Every policy is a `bitflags` set so that callers can combine them with
//! `|`, `&` and `contains`. With the `serde` feature of `bitflags` the sets
//! read from configuration as `"FILTER | TOP"`.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// The fixed set of recognized query options.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueryOptionKind {
    Filter,
    OrderBy,
    Top,
    Skip,
    Select,
    Expand,
    Count,
    Format,
    SkipToken,
    DeltaToken,
    Apply,
}

impl QueryOptionKind {
    pub const ALL: [QueryOptionKind; 11] = [
        QueryOptionKind::Filter,
        QueryOptionKind::OrderBy,
        QueryOptionKind::Top,
        QueryOptionKind::Skip,
        QueryOptionKind::Select,
        QueryOptionKind::Expand,
        QueryOptionKind::Count,
        QueryOptionKind::Format,
        QueryOptionKind::SkipToken,
        QueryOptionKind::DeltaToken,
        QueryOptionKind::Apply,
    ];

    /// Canonical parameter name as it appears on the wire.
    #[must_use]
    pub const fn canonical_name(self) -> &'static str {
        match self {
            QueryOptionKind::Filter => "$filter",
            QueryOptionKind::OrderBy => "$orderby",
            QueryOptionKind::Top => "$top",
            QueryOptionKind::Skip => "$skip",
            QueryOptionKind::Select => "$select",
            QueryOptionKind::Expand => "$expand",
            QueryOptionKind::Count => "$count",
            QueryOptionKind::Format => "$format",
            QueryOptionKind::SkipToken => "$skiptoken",
            QueryOptionKind::DeltaToken => "$deltatoken",
            QueryOptionKind::Apply => "$apply",
        }
    }

    /// Case-insensitive lookup of a parameter name.
    #[must_use]
    pub fn from_param_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.canonical_name().eq_ignore_ascii_case(name))
    }

    /// Options that must carry a non-blank value.
    #[must_use]
    pub const fn requires_value(self) -> bool {
        matches!(
            self,
            QueryOptionKind::Filter
                | QueryOptionKind::Top
                | QueryOptionKind::Skip
                | QueryOptionKind::Count
        )
    }

    /// Policy bit guarding this option.
    #[must_use]
    pub const fn flag(self) -> AllowedQueryOptions {
        match self {
            QueryOptionKind::Filter => AllowedQueryOptions::FILTER,
            QueryOptionKind::OrderBy => AllowedQueryOptions::ORDER_BY,
            QueryOptionKind::Top => AllowedQueryOptions::TOP,
            QueryOptionKind::Skip => AllowedQueryOptions::SKIP,
            QueryOptionKind::Select => AllowedQueryOptions::SELECT,
            QueryOptionKind::Expand => AllowedQueryOptions::EXPAND,
            QueryOptionKind::Count => AllowedQueryOptions::COUNT,
            QueryOptionKind::Format => AllowedQueryOptions::FORMAT,
            QueryOptionKind::SkipToken => AllowedQueryOptions::SKIP_TOKEN,
            QueryOptionKind::DeltaToken => AllowedQueryOptions::DELTA_TOKEN,
            QueryOptionKind::Apply => AllowedQueryOptions::APPLY,
        }
    }
}

impl fmt::Display for QueryOptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueryOptionKind::Filter => "Filter",
            QueryOptionKind::OrderBy => "OrderBy",
            QueryOptionKind::Top => "Top",
            QueryOptionKind::Skip => "Skip",
            QueryOptionKind::Select => "Select",
            QueryOptionKind::Expand => "Expand",
            QueryOptionKind::Count => "Count",
            QueryOptionKind::Format => "Format",
            QueryOptionKind::SkipToken => "SkipToken",
            QueryOptionKind::DeltaToken => "DeltaToken",
            QueryOptionKind::Apply => "Apply",
        };
        f.write_str(s)
    }
}

bitflags! {
    /// Which query options a caller may send.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct AllowedQueryOptions: u16 {
        const FILTER      = 1 << 0;
        const ORDER_BY    = 1 << 1;
        const TOP         = 1 << 2;
        const SKIP        = 1 << 3;
        const SELECT      = 1 << 4;
        const EXPAND      = 1 << 5;
        const COUNT       = 1 << 6;
        const FORMAT      = 1 << 7;
        const SKIP_TOKEN  = 1 << 8;
        const DELTA_TOKEN = 1 << 9;
        const APPLY       = 1 << 10;
        const ALL = Self::FILTER.bits()
            | Self::ORDER_BY.bits()
            | Self::TOP.bits()
            | Self::SKIP.bits()
            | Self::SELECT.bits()
            | Self::EXPAND.bits()
            | Self::COUNT.bits()
            | Self::FORMAT.bits()
            | Self::SKIP_TOKEN.bits()
            | Self::DELTA_TOKEN.bits()
            | Self::APPLY.bits();
    }
}

impl AllowedQueryOptions {
    pub const NONE: Self = Self::empty();
}

impl Default for AllowedQueryOptions {
    fn default() -> Self {
        Self::ALL
    }
}

bitflags! {
    /// Logical and comparison operators permitted inside `$filter`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct AllowedLogicalOperators: u16 {
        const AND                   = 1 << 0;
        const OR                    = 1 << 1;
        const NOT                   = 1 << 2;
        const EQUAL                 = 1 << 3;
        const NOT_EQUAL             = 1 << 4;
        const GREATER_THAN          = 1 << 5;
        const GREATER_THAN_OR_EQUAL = 1 << 6;
        const LESS_THAN             = 1 << 7;
        const LESS_THAN_OR_EQUAL    = 1 << 8;
        const IN                    = 1 << 9;
        const ALL = (1 << 10) - 1;
    }
}

impl Default for AllowedLogicalOperators {
    fn default() -> Self {
        Self::ALL
    }
}

bitflags! {
    /// Arithmetic operators permitted inside `$filter`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct AllowedArithmeticOperators: u8 {
        const ADD      = 1 << 0;
        const SUBTRACT = 1 << 1;
        const MULTIPLY = 1 << 2;
        const DIVIDE   = 1 << 3;
        const MODULO   = 1 << 4;
        const ALL = (1 << 5) - 1;
    }
}

impl Default for AllowedArithmeticOperators {
    fn default() -> Self {
        Self::ALL
    }
}

bitflags! {
    /// Canonical functions permitted inside `$filter`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct AllowedFunctions: u32 {
        const CONTAINS    = 1 << 0;
        const STARTS_WITH = 1 << 1;
        const ENDS_WITH   = 1 << 2;
        const LENGTH      = 1 << 3;
        const INDEX_OF    = 1 << 4;
        const SUBSTRING   = 1 << 5;
        const TO_LOWER    = 1 << 6;
        const TO_UPPER    = 1 << 7;
        const TRIM        = 1 << 8;
        const CONCAT      = 1 << 9;
        const YEAR        = 1 << 10;
        const MONTH       = 1 << 11;
        const DAY         = 1 << 12;
        const HOUR        = 1 << 13;
        const MINUTE      = 1 << 14;
        const SECOND      = 1 << 15;
        const ROUND       = 1 << 16;
        const FLOOR       = 1 << 17;
        const CEILING     = 1 << 18;

        const ALL_STRING_FUNCTIONS = Self::CONTAINS.bits()
            | Self::STARTS_WITH.bits()
            | Self::ENDS_WITH.bits()
            | Self::LENGTH.bits()
            | Self::INDEX_OF.bits()
            | Self::SUBSTRING.bits()
            | Self::TO_LOWER.bits()
            | Self::TO_UPPER.bits()
            | Self::TRIM.bits()
            | Self::CONCAT.bits();
        const ALL_DATE_TIME_FUNCTIONS = Self::YEAR.bits()
            | Self::MONTH.bits()
            | Self::DAY.bits()
            | Self::HOUR.bits()
            | Self::MINUTE.bits()
            | Self::SECOND.bits();
        const ALL_MATH_FUNCTIONS = Self::ROUND.bits() | Self::FLOOR.bits() | Self::CEILING.bits();
        const ALL_FUNCTIONS = Self::ALL_STRING_FUNCTIONS.bits()
            | Self::ALL_DATE_TIME_FUNCTIONS.bits()
            | Self::ALL_MATH_FUNCTIONS.bits();
    }
}

impl AllowedFunctions {
    /// Policy bit for a canonical function name, `None` for unknown names.
    #[must_use]
    pub fn from_function_name(name: &str) -> Option<Self> {
        let flag = match name.to_ascii_lowercase().as_str() {
            "contains" => Self::CONTAINS,
            "startswith" => Self::STARTS_WITH,
            "endswith" => Self::ENDS_WITH,
            "length" => Self::LENGTH,
            "indexof" => Self::INDEX_OF,
            "substring" => Self::SUBSTRING,
            "tolower" => Self::TO_LOWER,
            "toupper" => Self::TO_UPPER,
            "trim" => Self::TRIM,
            "concat" => Self::CONCAT,
            "year" => Self::YEAR,
            "month" => Self::MONTH,
            "day" => Self::DAY,
            "hour" => Self::HOUR,
            "minute" => Self::MINUTE,
            "second" => Self::SECOND,
            "round" => Self::ROUND,
            "floor" => Self::FLOOR,
            "ceiling" => Self::CEILING,
            _ => return None,
        };
        Some(flag)
    }
}

impl Default for AllowedFunctions {
    fn default() -> Self {
        Self::ALL_FUNCTIONS
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn param_lookup_is_case_insensitive() {
        assert_eq!(
            QueryOptionKind::from_param_name("$FILTER"),
            Some(QueryOptionKind::Filter)
        );
        assert_eq!(
            QueryOptionKind::from_param_name("$SkipToken"),
            Some(QueryOptionKind::SkipToken)
        );
        assert_eq!(QueryOptionKind::from_param_name("filter"), None);
        assert_eq!(QueryOptionKind::from_param_name("$search"), None);
    }

    #[test]
    fn all_is_the_union_of_every_kind() {
        let union = QueryOptionKind::ALL
            .iter()
            .fold(AllowedQueryOptions::NONE, |acc, k| acc | k.flag());
        assert_eq!(union, AllowedQueryOptions::ALL);
        assert_eq!(AllowedQueryOptions::default(), AllowedQueryOptions::ALL);
    }

    #[test]
    fn flag_set_operations() {
        let policy = AllowedQueryOptions::TOP | AllowedQueryOptions::SKIP;
        assert!(policy.contains(AllowedQueryOptions::TOP));
        assert!(!policy.contains(AllowedQueryOptions::FILTER));
        assert_eq!(
            policy & AllowedQueryOptions::SKIP,
            AllowedQueryOptions::SKIP
        );
    }

    #[test]
    fn function_groups_cover_names() {
        assert_eq!(
            AllowedFunctions::from_function_name("StartsWith"),
            Some(AllowedFunctions::STARTS_WITH)
        );
        assert!(AllowedFunctions::ALL_STRING_FUNCTIONS.contains(AllowedFunctions::CONCAT));
        assert!(!AllowedFunctions::ALL_MATH_FUNCTIONS.contains(AllowedFunctions::YEAR));
        assert_eq!(AllowedFunctions::from_function_name("geo.distance"), None);
    }
}
