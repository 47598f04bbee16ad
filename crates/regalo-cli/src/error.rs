use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] regalo_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Gift ID cannot be empty")]
    EmptyGiftId,
    #[error("Unknown gift '{0}'. Run `regalo gifts` to see the list.")]
    UnknownGift(String),
    #[error("'{title}' is already reserved by {reserved_by}. Use --force to take it anyway.")]
    AlreadyReserved { title: String, reserved_by: String },
    #[error("'{0}' is not reserved")]
    NotReserved(String),
    #[error("Site config not found at {0}. Pass --site or set REGALO_SITE_PATH.")]
    SiteNotFound(String),
    #[error(
        "Live updates need a backend. Set SUPABASE_URL and SUPABASE_ANON_KEY to enable `regalo watch`."
    )]
    WatchNeedsBackend,
}
