//! Remote metadata fetching: matching, merging and session orchestration.

pub mod matcher;
pub mod merge;
pub mod session;

pub use matcher::{MatchOutcome, RemoteMatcher};
pub use merge::{merge, MergeOptions};
pub use session::{FetchEvent, FetchOptions, FetchOutcome, FetchSession, FetchStatus, FetchSummary};
