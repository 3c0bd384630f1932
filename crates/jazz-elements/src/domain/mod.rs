//! # Domain layer
//!
//! Pure domain logic for the block-and-container subsystem: Block, Kind,
//! Tuple, Locator, Transaction and the configuration value objects. No I/O
//! beyond what `adapters` performs against this layer's traits.

pub mod block;
pub mod config;
pub mod kind;
pub mod locator;
pub mod tuple;
pub mod transaction;

pub use block::{Block, FilterKind, HasNaPolicy, IndexMap, Payload};
pub use config::{ChannelsConfig, ClusterConfig, LmdbConfig, OneShotConfig, StorageConfig};
pub use kind::{Kind, KindItem};
pub use locator::Locator;
pub use transaction::{RwLockState, Transaction, TransactionStatus};
pub use tuple::{merge_item_names, Tuple, TupleItem};
