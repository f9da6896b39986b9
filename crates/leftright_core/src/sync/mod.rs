//! # Left-Right Synchronization
//!
//! ## The Problem
//!
//! ```text
//! Writer:        mutate the map
//! Readers (N):   look things up, constantly
//!
//! With RwLock:   readers contend on one cache line, writer starves or stalls them
//! ```
//!
//! ## The Solution: Two Replicas
//!
//! ```text
//! Before publish:
//!   Writer mutates Slot B (and logs each op)
//!   Readers read Slot A
//!
//! publish():
//!   SWAP index      -> readers now read Slot B
//!   DRAIN           -> wait out readers still inside Slot A
//!   REPLAY op log   -> Slot A catches up, becomes the new write slot
//! ```
//!
//! Readers never lock and never wait. The writer pays for it with two copies
//! of the data and the drain.

mod oplog;
mod read;
mod storage;
mod write;

pub use oplog::Operation;
pub use read::ReadHandle;
pub use write::{PublishStats, WriteHandle};

pub(crate) use storage::DualStorage;
