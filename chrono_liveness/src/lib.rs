//! C5: liveness analysis on SSA — live-in/live-out sets, live intervals,
//! phi-aware coalescing, and interference graph construction (§4.2).

pub mod coalesce;
pub mod error;
pub mod interference;
pub mod interval;
pub mod live_sets;
pub mod union_find;

pub use coalesce::{coalesce, Coalesced};
pub use error::{LivenessError, Result};
pub use interference::InterferenceGraph;
pub use interval::Intervals;
pub use live_sets::{compute_live_intervals, compute_live_sets};
pub use union_find::UnionFind;
