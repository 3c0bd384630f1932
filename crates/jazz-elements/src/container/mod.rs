//! # Container-level infrastructure
//!
//! Shared machinery every `Container` descendant (Persisted, Volatile,
//! Channels) builds on: the structural spinlock (`lock`), the transaction
//! pool and allocation accounting (`pool`), and the text (de)serialization
//! state machine (`parser`) used by `new_block` forms 5/6 and by
//! `unwrap_received`. None of this knows about LMDB, HTTP, or the
//! filesystem — that is `adapters`'s job.

pub mod construct;
pub mod lock;
pub mod parser;
pub mod pool;
pub mod unwrap;

pub use construct::{
    filtered_block, index_block, item_block, kind_block, parsed_block, serialized_block,
    tensor_block, tuple_from_index,
};
pub use lock::{ContainerLock, ContainerLockGuard, LOCK_NUM_RETRIES_BEFORE_YIELD};
pub use parser::{format_block_text, parse_block_text};
pub use pool::{AllocAccounting, TransactionPool};
pub use unwrap::unwrap_received;
