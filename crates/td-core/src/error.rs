//! Error taxonomy for the allocation engine.

use thiserror::Error;

/// Fatal errors raised before or during a dispatch run.
///
/// Action-level failures (a rejected write against the remote calendar)
/// are not represented here; they are captured per action by the caller
/// so one failed write cannot unwind its siblings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The run configuration is unusable. Nothing is dispatched.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An unrecognized duplicate-dispatch policy value.
    #[error("unrecognized duplicate-dispatch policy {0:?} (expected subtract, skip, or ignore)")]
    UnknownPolicy(String),

    /// A fetched calendar entry was malformed. A partially built occupancy
    /// model is unsafe to dispatch against, so aggregation stops here.
    #[error("malformed calendar entry {entry}: {problem}")]
    MalformedEntry {
        /// Remote entry id, or `"?"` when the entry carried none.
        entry: String,
        problem: &'static str,
    },
}
