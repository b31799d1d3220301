//! Typed query options.
//!
//! Every option keeps its raw text, the parsed representation and the shared
//! schema context, and knows how to check itself against
//! [`ValidationSettings`].

mod count;
mod filter;
mod order_by;
mod paging;
mod raw_only;
mod select_expand;

pub use count::CountOption;
pub use filter::FilterOption;
pub use order_by::OrderByOption;
pub use paging::{SkipOption, TopOption};
pub use raw_only::ApplyOption;
pub use select_expand::SelectExpandOption;

use crate::allowed::QueryOptionKind;
use crate::error::Error;
use crate::settings::ValidationSettings;

/// A present option, dispatched to its own validation.
#[derive(Clone, Copy, Debug)]
pub enum PresentOption<'a> {
    Filter(&'a FilterOption),
    OrderBy(&'a OrderByOption),
    Top(&'a TopOption),
    Skip(&'a SkipOption),
    SelectExpand(&'a SelectExpandOption),
    Count(&'a CountOption),
    Apply(&'a ApplyOption),
}

impl PresentOption<'_> {
    #[must_use]
    pub fn kind(&self) -> QueryOptionKind {
        match self {
            PresentOption::Filter(_) => QueryOptionKind::Filter,
            PresentOption::OrderBy(_) => QueryOptionKind::OrderBy,
            PresentOption::Top(_) => QueryOptionKind::Top,
            PresentOption::Skip(_) => QueryOptionKind::Skip,
            PresentOption::SelectExpand(o) => o.kind(),
            PresentOption::Count(_) => QueryOptionKind::Count,
            PresentOption::Apply(_) => QueryOptionKind::Apply,
        }
    }

    /// # Errors
    /// Returns `Error::LimitExceeded` when the option violates a configured limit.
    pub fn validate(&self, settings: &ValidationSettings) -> Result<(), Error> {
        match self {
            PresentOption::Filter(o) => o.validate(settings),
            PresentOption::OrderBy(o) => o.validate(settings),
            PresentOption::Top(o) => o.validate(settings),
            PresentOption::Skip(o) => o.validate(settings),
            PresentOption::SelectExpand(o) => o.validate(settings),
            PresentOption::Count(o) => o.validate(settings),
            PresentOption::Apply(o) => o.validate(settings),
        }
    }
}
