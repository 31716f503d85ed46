//! Shared sync state types observed by front-ends.

/// Phase of the sync engine's state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncPhase {
    #[default]
    Idle,
    Draining,
    AwaitingRemote,
    Reconciling,
}

impl SyncPhase {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Draining => "draining",
            Self::AwaitingRemote => "awaiting-remote",
            Self::Reconciling => "reconciling",
        }
    }

    /// Whether a cycle is in progress.
    pub const fn is_busy(self) -> bool {
        !matches!(self, Self::Idle)
    }
}
