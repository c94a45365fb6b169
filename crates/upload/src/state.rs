//! Upload lifecycle state machine.
//!
//! ```text
//! Idle -> Negotiating -> TransferringPart(1..N) -> AllPartsDone -> Finalizing -> Finalized
//! ```
//!
//! `Failed` and `Aborted` are reachable from every non-terminal state. A
//! simple (single-shot) upload goes straight from `AllPartsDone` to
//! `Finalized`.

use tracing::{debug, warn};

/// Lifecycle state of one upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Negotiating,
    TransferringPart(u32),
    AllPartsDone,
    Finalizing,
    Finalized,
    Failed,
    Aborted,
}

impl UploadState {
    /// Returns `true` for `Finalized`, `Failed` and `Aborted`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized | Self::Failed | Self::Aborted)
    }

    /// Returns `true` if `next` may follow `self`.
    pub fn can_transition_to(&self, next: UploadState) -> bool {
        use UploadState::*;
        if self.is_terminal() {
            return false;
        }
        match (*self, next) {
            (_, Failed | Aborted) => true,
            (Idle, Negotiating) => true,
            (Negotiating, TransferringPart(1)) => true,
            (TransferringPart(n), TransferringPart(m)) => m == n + 1,
            (TransferringPart(_), AllPartsDone) => true,
            (AllPartsDone, Finalizing | Finalized) => true,
            (Finalizing, Finalized) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for UploadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadState::Idle => f.write_str("idle"),
            UploadState::Negotiating => f.write_str("negotiating"),
            UploadState::TransferringPart(n) => write!(f, "transferring part {n}"),
            UploadState::AllPartsDone => f.write_str("all parts done"),
            UploadState::Finalizing => f.write_str("finalizing"),
            UploadState::Finalized => f.write_str("finalized"),
            UploadState::Failed => f.write_str("failed"),
            UploadState::Aborted => f.write_str("aborted"),
        }
    }
}

/// Tracks the current state of one upload and its history.
#[derive(Debug)]
pub struct StateMachine {
    current: UploadState,
    history: Vec<UploadState>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            current: UploadState::Idle,
            history: vec![UploadState::Idle],
        }
    }

    pub fn current(&self) -> UploadState {
        self.current
    }

    /// Every state visited so far, starting with `Idle`.
    pub fn history(&self) -> &[UploadState] {
        &self.history
    }

    /// Moves to `next`. Illegal transitions are logged and ignored, so a
    /// settled upload can never change its outcome.
    pub fn advance(&mut self, next: UploadState) -> bool {
        if !self.current.can_transition_to(next) {
            warn!(from = %self.current, to = %next, "ignoring illegal state transition");
            return false;
        }
        debug!(from = %self.current, to = %next, "upload state");
        self.current = next;
        self.history.push(next);
        true
    }
}
