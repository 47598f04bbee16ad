pub mod accounts;
pub mod common;
pub mod completions;
pub mod gifts;
pub mod info;
pub mod release;
pub mod reserve;
pub mod watch;
