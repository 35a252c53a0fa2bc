//! IterationReport - what one pass of the worker loop saw and did.

use serde::Serialize;

/// Counters for one iteration. Observational only; nothing reads them back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IterationReport {
    /// Posts returned by both feeds, after de-duplication.
    pub discovered: usize,
    /// Decoded, unexpired tasks this node can handle.
    pub eligible: usize,
    /// Held by someone else's active claim.
    pub skipped_claimed: usize,
    /// Already delivered or failed.
    pub skipped_terminal: usize,
    pub claimed: usize,
    pub delivered: usize,
    /// Tasks whose processing aborted (transport or handler failure).
    pub failed: usize,
    pub rewarded: usize,
}
