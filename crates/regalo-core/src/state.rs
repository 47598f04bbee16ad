//! Shared sync state types.

/// Where the local reservation table stands relative to the remote one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    /// No backend configured; reservations live only in this process
    LocalOnly,
    /// Backend configured but not loaded yet
    Idle,
    Loading,
    Synced,
    /// Last bulk load failed; the table must not be read as "all free"
    Unknown,
}

impl SyncState {
    /// Whether the table can be trusted to reflect reservation state.
    pub const fn is_known(self) -> bool {
        matches!(self, Self::LocalOnly | Self::Synced)
    }
}
