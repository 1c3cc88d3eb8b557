//! Core types for Courier.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod credential;
pub mod id;
pub mod message;

pub use credential::{CredentialRecord, NewCredential};
pub use id::*;
pub use message::{ChannelMessage, ThreadReply};
