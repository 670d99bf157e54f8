//! Google Calendar v3 store client for icsync.
//!
//! Implements the `TargetStore` trait against the Calendar REST API:
//! annotation-filtered listing, insert/patch with canonical resource bodies,
//! and delete. Authentication is a single refresh-token exchange at
//! construction.

mod api;
mod auth;

pub use api::GoogleStore;
pub use auth::Credentials;
