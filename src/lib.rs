//! # pinauth (PIN based authentication callback service)
//!
//! `pinauth` is a small HTTP service that an external identity platform calls
//! to run a PIN-based authentication step:
//!
//! 1. The platform POSTs an authenticate event to `/api/authenticate` with an
//!    opaque `flowId`. The service records the flow and answers `INCOMPLETE`
//!    with a redirect to its PIN-entry page.
//! 2. The end user opens `/api/pin-entry?flowId=...` and submits a PIN to
//!    `/api/pin-submit`. The PIN is checked against the user database selected
//!    by `AUTH_MODE` and the flow moves to `SUCCESS` or `FAILED`.
//! 3. The platform repeats the authenticate call and receives the outcome.
//!
//! Flow state lives in memory only and expires after a few minutes; there is
//! no persistence and no coordination beyond a mutex around the session map.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
