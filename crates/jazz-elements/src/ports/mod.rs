//! # Ports layer
//!
//! - `inbound.rs` — the Container contract other subsystems call.
//! - `outbound.rs` — dependencies a Container adapter requires.

pub mod inbound;
pub mod outbound;

pub use inbound::{write_mode, Container, GetSelector, PayloadMode, WriteMode};
pub use outbound::{
    FileSystemAdapter, HashProvider, KeyValueStore, MurmurHashProvider, SystemTimeSource,
    TimeSource,
};
