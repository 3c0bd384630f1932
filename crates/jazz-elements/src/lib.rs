//! # jazz-elements
//!
//! The block-and-container subsystem underneath the Jazz analytical server.
//! A [`domain::Block`] is a pure, content-addressed value: header, tensor
//! (or Index map), attribute table, string buffer, hashed with
//! `MurmurHash64A`. [`ports::inbound::Container`] is the single CRUD
//! contract every storage medium implements identically; [`adapters`] hosts
//! the three concrete media — `volatile` (RAM), `persisted` (LMDB via
//! `heed3`), and `channels` (file / http / 0-mq / bash boundary access).
//!
//! ## Crate structure (hexagonal)
//!
//! - `domain/` — Block, Kind, Tuple, Locator, Transaction: pure values, no I/O.
//! - `ports/` — the `Container` trait (inbound) and the storage-medium
//!   dependencies it's built from (outbound: `KeyValueStore`, `TimeSource`,
//!   `FileSystemAdapter`, `HashProvider`).
//! - `container/` — shared machinery every adapter builds on: the
//!   structural spinlock, transaction-pool accounting, the text
//!   (de)serializer, and `unwrap_received`.
//! - `adapters/` — the three concrete `Container` implementations.

pub mod adapters;
pub mod container;
pub mod domain;
pub mod ports;

pub use domain::block::{Block, FilterKind, HasNaPolicy, IndexMap, Payload};
pub use domain::{Kind, Locator, RwLockState, Transaction, TransactionStatus, Tuple};
pub use ports::inbound::{Container, GetSelector, PayloadMode, WriteMode};
