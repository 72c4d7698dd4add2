//! Connection membership and fan-out for Cardroom.
//!
//! The registry knows every live connection and how to reach it. It
//! doesn't know about players or game rules; the server pairs each
//! connection with a player id of the same number.
//!
//! # How it fits in the stack
//!
//! ```text
//! Server (above)   ← registers on accept, broadcasts snapshots
//!     ↕
//! Registry (this crate)   ← connection id → outbound channel
//!     ↕
//! Writer tasks (below)   ← drain each channel into its socket
//! ```

mod error;
mod registry;

pub use error::RegistryError;
pub use registry::{ConnectionRegistry, Frame, Outbound};
