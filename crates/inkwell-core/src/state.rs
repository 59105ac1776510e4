//! Shared cross-platform state types.

/// Sync indicator shown by clients.
///
/// Sync failures never block the user; they surface as `Pending` until a later
/// reconciliation run drains the unsynced partition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    /// No remote API is configured or reachable.
    Offline,
    /// Local mutations are waiting for reconciliation.
    Pending,
    /// Every local mutation has been confirmed by the remote API.
    Synced,
    /// The local store itself failed.
    Error,
}

impl SyncState {
    /// Derive the indicator from the number of unsynced records.
    pub const fn from_pending(pending: usize) -> Self {
        if pending == 0 {
            Self::Synced
        } else {
            Self::Pending
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Error => "error",
        }
    }
}
