//! App layer - viewer state and the session that owns it
//!
//! State transitions are pure; the session performs loads and sends and
//! swaps in the resulting state.

pub mod session;
pub mod state;

pub use session::SpecSession;
pub use state::{DraftPatch, SpecSource, SpecSourceKind, SpecViewerState, TryItDraft};
