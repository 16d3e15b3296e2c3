//! All kinds of errors in this crate.
//!
//! Dead search branches are not errors: propagation reports them through
//! [`PropagateResult`](crate::PropagateResult) and the search simply
//! backtracks. The variants here are the problems a user can actually cause.

use displaydoc::Display;
use thiserror::Error;

/// All kinds of errors in this crate.
#[derive(Clone, Debug, PartialEq, Eq, Display, Error)]
pub enum Error {
    /// the configuration has no `pattern`
    MissingPattern,
    /// unrecognised character `{0}` in a pattern
    UnknownPatternChar(char),
    /// unknown symmetry `{0}`
    UnknownSymmetry(String),
    /// `{key}` is {value}, but the compiled timers only support up to {max}
    TimerTooLong {
        /// The offending configuration key.
        key: &'static str,
        /// The configured value.
        value: i32,
        /// The largest supported value.
        max: u32,
    },
    /// `filter-gen` is set but no `filter` pattern was given
    MissingFilter,
}
