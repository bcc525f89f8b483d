// SPDX-License-Identifier: Apache-2.0

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("lmdb environment error: {0}")]
    Environment(#[from] heed::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bcs::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
