// SPDX-License-Identifier: Apache-2.0

//! Infrastructure failures (malformed wire frames, storage I/O, timeouts). Kept separate from
//! `ResultCode` (the protocol-level per-block outcome), which never gets folded into this enum.

#[derive(thiserror::Error, Debug)]
pub enum ConsensusError {
    #[error("storage error: {0}")]
    Storage(#[from] logos_storage::StorageError),

    /// Raised once by the write-queue worker when `apply_updates` fails; storage is assumed
    /// infallible by the time a block reaches the queue, so this is treated as fatal.
    #[error("write queue storage failure, process must terminate: {0}")]
    StorageFatal(logos_storage::StorageError),

    #[error("malformed wire frame: {0}")]
    MalformedFrame(String),

    #[error("unexpected frame type {0}")]
    UnexpectedFrameType(u8),

    #[error("connection timed out")]
    Timeout,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("write queue is poisoned after a prior fatal storage error")]
    WriteQueuePoisoned,
}

pub type ConsensusResult<T> = Result<T, ConsensusError>;
