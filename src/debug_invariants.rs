//! Invariant checks for partition tables and distributed graphs.
//!
//! `validate_invariants` is always available and returns the first violation.
//! `debug_assert_invariants` only panics in debug builds or when one of the
//! `strict-invariants` / `check-invariants` features is on, so release runs of
//! the loader pay nothing for it.

use crate::graph_error::DistGraphError;

/// Structures whose internal consistency can be checked on demand.
pub trait DebugInvariants {
    /// Panic on the first violation when invariant checking is enabled.
    fn debug_assert_invariants(&self);
    /// Return the first violated invariant, if any.
    fn validate_invariants(&self) -> Result<(), DistGraphError>;
}

/// Panic with `[invariants] <context>: <error>` if `$expr` is an `Err` and
/// invariant checking is compiled in; otherwise expands to nothing.
#[macro_export]
macro_rules! assert_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "strict-invariants", feature = "check-invariants"))]
        if let Err(e) = $expr {
            panic!(concat!("[invariants] ", $($ctx)*, ": {}"), e);
        }
    };
}
