//! Pipeline run identifiers.

use std::fmt::{self, Display, Formatter};

use uuid::Uuid;

/// Identifies one plan → execute → verify invocation in logs.
///
/// Runs share no state; the id exists purely so that the log lines of
/// concurrent invocations can be told apart.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct RunId(Uuid);

impl RunId {
    /// Generates a fresh run identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}
