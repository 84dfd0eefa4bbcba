//! Payload types for Playsync.
//!
//! This crate defines everything that crosses a boundary between the
//! session layer and the outside world:
//!
//! - **Identity types** ([`UserId`], [`Credentials`], [`AuthUser`],
//!   [`SessionTokens`]) — who a player is and how they proved it.
//! - **Profile** ([`PlayerProfile`]) — the authoritative record of a
//!   player's progression, currency, and unlocks.
//! - **Bridge payloads** ([`BridgeRequest`], [`ServiceResult`],
//!   [`OpKind`]) — the requests sent to the remote account service (or
//!   into a host environment) and the results that come back.
//! - **Errors** ([`ProtocolError`]) — what can go wrong turning payloads
//!   into JSON and back.
//!
//! # Architecture
//!
//! The protocol layer knows nothing about pending operations, caching, or
//! session state. It only defines the shapes — the transport and session
//! layers give them meaning.
//!
//! ```text
//! Session (orchestration) → Transport (delivery) → Protocol (payloads)
//! ```

mod error;
mod types;

pub use error::ProtocolError;
pub use types::{
    AuthUser, BridgeRequest, Credentials, OpKind, PlayerProfile,
    ServiceResult, SessionTokens, UserId,
};
