//! Session orchestration for Playsync.
//!
//! This crate is the top of the stack: it owns the lifecycle of a user
//! session from authentication (or guest creation) through logout, and
//! recovers a still-valid session after a process restart.
//!
//! 1. **Operations** — register, login, guest sign-in, provider sign-in,
//!    logout, restore ([`SessionManager`]).
//! 2. **State** — the session phase machine and configuration
//!    ([`SessionPhase`], [`SessionConfig`]).
//! 3. **Identity** — locally minted guest identities ([`GuestIdentity`]).
//!
//! # How it fits in the stack
//!
//! ```text
//! Embedding app (above)  ← calls operations, presents failures
//!     ↕
//! Session layer (this crate)  ← orchestrates auth, owns the Session
//!     ↕
//! Profile / Transport / Cache (below)  ← reconcile, deliver, persist
//! ```
//!
//! One `SessionManager` per process, constructed explicitly at the
//! composition root — there are no globals, and tests build as many
//! independent managers as they like.

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{GuestIdentity, Session, SessionConfig, SessionPhase};
