use std::sync::Arc;

use crate::allowed::QueryOptionKind;
use crate::error::Error;
use crate::model::QueryContext;
use crate::settings::ValidationSettings;

/// Parse a non-negative base-10 integer.
///
/// ASCII digits with an optional sign; surrounding whitespace is ignored.
/// Locale never affects the result.
pub(crate) fn parse_non_negative(option: QueryOptionKind, raw: &str) -> Result<u64, Error> {
    let value = raw.trim();
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidInteger {
            option,
            value: raw.to_owned(),
        });
    }
    if negative && digits.bytes().any(|b| b != b'0') {
        return Err(Error::NegativeValue {
            option,
            value: raw.to_owned(),
        });
    }

    digits.parse::<u64>().map_err(|_| Error::InvalidInteger {
        option,
        value: raw.to_owned(),
    })
}

/// `$top`: caller-requested maximum number of items.
#[derive(Clone, Debug)]
pub struct TopOption {
    raw: String,
    value: u64,
    context: Arc<QueryContext>,
}

impl TopOption {
    /// # Errors
    /// Returns `Error::InvalidInteger` or `Error::NegativeValue`.
    pub fn parse(raw: &str, context: Arc<QueryContext>) -> Result<Self, Error> {
        Ok(Self {
            raw: raw.to_owned(),
            value: parse_non_negative(QueryOptionKind::Top, raw)?,
            context,
        })
    }

    #[must_use]
    pub fn raw_value(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        self.value
    }

    #[must_use]
    pub fn context(&self) -> &QueryContext {
        &self.context
    }

    /// # Errors
    /// Returns `Error::LimitExceeded` when the value is above `max_top`.
    pub fn validate(&self, settings: &ValidationSettings) -> Result<(), Error> {
        match settings.max_top {
            Some(max) if self.value > max => Err(Error::limit(
                QueryOptionKind::Top,
                format!("{} exceeds the maximum of {max}", self.value),
            )),
            _ => Ok(()),
        }
    }
}

/// `$skip`: number of leading items to drop.
#[derive(Clone, Debug)]
pub struct SkipOption {
    raw: String,
    value: u64,
    context: Arc<QueryContext>,
}

impl SkipOption {
    /// # Errors
    /// Returns `Error::InvalidInteger` or `Error::NegativeValue`.
    pub fn parse(raw: &str, context: Arc<QueryContext>) -> Result<Self, Error> {
        Ok(Self {
            raw: raw.to_owned(),
            value: parse_non_negative(QueryOptionKind::Skip, raw)?,
            context,
        })
    }

    #[must_use]
    pub fn raw_value(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        self.value
    }

    #[must_use]
    pub fn context(&self) -> &QueryContext {
        &self.context
    }

    /// # Errors
    /// Returns `Error::LimitExceeded` when the value is above `max_skip`.
    pub fn validate(&self, settings: &ValidationSettings) -> Result<(), Error> {
        match settings.max_skip {
            Some(max) if self.value > max => Err(Error::limit(
                QueryOptionKind::Skip,
                format!("{} exceeds the maximum of {max}", self.value),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    const TOP: QueryOptionKind = QueryOptionKind::Top;

    #[test]
    fn accepts_plain_and_signed_digits() {
        assert_eq!(parse_non_negative(TOP, "5").unwrap(), 5);
        assert_eq!(parse_non_negative(TOP, " 42 ").unwrap(), 42);
        assert_eq!(parse_non_negative(TOP, "+7").unwrap(), 7);
        assert_eq!(parse_non_negative(TOP, "007").unwrap(), 7);
        assert_eq!(parse_non_negative(TOP, "-0").unwrap(), 0);
    }

    #[test]
    fn negative_values() {
        assert!(matches!(
            parse_non_negative(TOP, "-1"),
            Err(Error::NegativeValue { .. })
        ));
        assert!(matches!(
            parse_non_negative(TOP, "-99999999999999999999999"),
            Err(Error::NegativeValue { .. })
        ));
    }

    #[test]
    fn invalid_integers() {
        for raw in ["abc", "1.5", "1e3", "5x", "--1", "+-1", "0x10", "\u{661}\u{662}"] {
            assert!(
                matches!(
                    parse_non_negative(TOP, raw),
                    Err(Error::InvalidInteger { .. })
                ),
                "{raw:?}"
            );
        }
        assert!(matches!(
            parse_non_negative(TOP, "18446744073709551616"),
            Err(Error::InvalidInteger { .. })
        ));
    }

    #[test]
    fn error_carries_raw_value_and_option() {
        let err = parse_non_negative(QueryOptionKind::Skip, "ten").unwrap_err();
        assert_eq!(
            err,
            Error::InvalidInteger {
                option: QueryOptionKind::Skip,
                value: "ten".into()
            }
        );
        assert_eq!(err.option_name(), "$skip");
    }
}
