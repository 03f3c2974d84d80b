//! Chat transcript for conversations about a notebook
//!
//! The transcript lives in memory only and is cleared whenever the active
//! notebook changes.

pub mod types;

pub use types::{ChatRole, Message};
