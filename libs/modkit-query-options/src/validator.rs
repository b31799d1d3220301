//! Presence gate and per-option limits.

use crate::allowed::QueryOptionKind;
use crate::error::Error;
use crate::query_options::QueryOptions;
use crate::settings::ValidationSettings;

impl QueryOptions {
    /// Check every present option against `settings`.
    ///
    /// Runs in two passes: every present kind must have its policy bit set
    /// in `allowed_query_options`, and only then does each typed option
    /// validate itself. A disallowed option is therefore reported even when
    /// another option also breaks a limit. `self` is never modified.
    ///
    /// # Errors
    /// - `Error::DisallowedQueryOption` when a present option is not allowed
    /// - `Error::LimitExceeded` when an option breaks a configured limit
    pub fn validate(&self, settings: &ValidationSettings) -> Result<(), Error> {
        if let Some(kind) = self
            .present_kinds()
            .find(|k| !settings.allowed_query_options.contains(k.flag()))
        {
            tracing::warn!(option = %kind.canonical_name(), "query option not allowed");
            return Err(Error::DisallowedQueryOption(kind));
        }

        for kind in self.present_kinds() {
            if let Some(option) = self.typed(kind) {
                option.validate(settings).inspect_err(|e| {
                    tracing::warn!(
                        option = %kind.canonical_name(),
                        error = %e,
                        "query option rejected"
                    );
                })?;
            }
        }
        Ok(())
    }

    fn present_kinds(&self) -> impl Iterator<Item = QueryOptionKind> + '_ {
        QueryOptionKind::ALL
            .into_iter()
            .filter(move |kind| self.is_present(*kind))
    }
}
