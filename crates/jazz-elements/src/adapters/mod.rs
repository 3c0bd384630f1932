//! # Adapters
//!
//! The three concrete [`crate::ports::inbound::Container`] implementations.
//! Each owns exactly one storage medium and nothing else; cross-medium
//! behavior (copy, unwrap-received) lives in `container/` and is shared.

#[cfg(feature = "channels")]
pub mod channels;
#[cfg(feature = "persisted")]
pub mod persisted;
pub mod volatile;

#[cfg(feature = "channels")]
pub use channels::Channels;
#[cfg(feature = "persisted")]
pub use persisted::Persisted;
pub use volatile::Volatile;
