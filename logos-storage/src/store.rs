// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};

use logos_config::{DelegateId, NUM_DELEGATES};
use logos_types::{EpochBlock, Hash, MicroBlock, RequestBlock, Tip};

use crate::error::StorageError;

pub type ReadTxn<'e> = RoTxn<'e>;
pub type WriteTxn<'e> = RwTxn<'e>;

/// The LMDB environment and its named tables, per the §6.2 layout: `block`, `micro_block`,
/// `epoch`, `micro_block_tip`, `epoch_tip`, `batch_tips[32]` (one per delegate), `request`,
/// `receive`, `unchecked`, `address_ad`, `address_ad_txa`, `p2p`. Each block hash acts as the
/// primary key; tip tables hold a serialized `Tip` keyed by epoch number.
pub struct Store {
    env: Env,
    request_blocks: Database<Bytes, Bytes>,
    micro_blocks: Database<Bytes, Bytes>,
    epoch_blocks: Database<Bytes, Bytes>,
    micro_block_tips: Database<Bytes, Bytes>,
    epoch_tips: Database<Bytes, Bytes>,
    batch_tips: Vec<Database<Bytes, Bytes>>,
    requests: Database<Bytes, Bytes>,
    receive: Database<Bytes, Bytes>,
    unchecked: Database<Bytes, Bytes>,
    address_ad: Database<Bytes, Bytes>,
    address_ad_txa: Database<Bytes, Bytes>,
    p2p: Database<Bytes, Bytes>,
}

impl Store {
    pub fn open(path: &Path, max_dbs: u32) -> Result<Self, StorageError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment is only ever opened once per process for a given path, which
        // the owning `logos-node` binary enforces by holding the `Store` for its lifetime.
        let env = unsafe { EnvOpenOptions::new().max_dbs(max_dbs).open(path)? };

        let mut wtxn = env.write_txn()?;
        let request_blocks = env.create_database(&mut wtxn, Some("block"))?;
        let micro_blocks = env.create_database(&mut wtxn, Some("micro_block"))?;
        let epoch_blocks = env.create_database(&mut wtxn, Some("epoch"))?;
        let micro_block_tips = env.create_database(&mut wtxn, Some("micro_block_tip"))?;
        let epoch_tips = env.create_database(&mut wtxn, Some("epoch_tip"))?;
        let mut batch_tips = Vec::with_capacity(NUM_DELEGATES);
        for id in DelegateId::all() {
            let name = format!("batch_tip_{id}");
            batch_tips.push(env.create_database(&mut wtxn, Some(&name))?);
        }
        let requests = env.create_database(&mut wtxn, Some("request"))?;
        let receive = env.create_database(&mut wtxn, Some("receive"))?;
        let unchecked = env.create_database(&mut wtxn, Some("unchecked"))?;
        let address_ad = env.create_database(&mut wtxn, Some("address_ad"))?;
        let address_ad_txa = env.create_database(&mut wtxn, Some("address_ad_txa"))?;
        let p2p = env.create_database(&mut wtxn, Some("p2p"))?;
        wtxn.commit()?;

        Ok(Self {
            env,
            request_blocks,
            micro_blocks,
            epoch_blocks,
            micro_block_tips,
            epoch_tips,
            batch_tips,
            requests,
            receive,
            unchecked,
            address_ad,
            address_ad_txa,
            p2p,
        })
    }

    pub fn begin_read(&self) -> Result<ReadTxn<'_>, StorageError> {
        Ok(self.env.read_txn()?)
    }

    pub fn begin_write(&self) -> Result<WriteTxn<'_>, StorageError> {
        Ok(self.env.write_txn()?)
    }

    pub fn get_request_block(
        &self,
        txn: &ReadTxn<'_>,
        hash: &Hash,
    ) -> Result<Option<RequestBlock>, StorageError> {
        get_bcs(&self.request_blocks, txn, hash.as_bytes())
    }

    pub fn put_request_block(
        &self,
        txn: &mut WriteTxn<'_>,
        block: &RequestBlock,
    ) -> Result<(), StorageError> {
        put_bcs(&self.request_blocks, txn, block.hash().as_bytes(), block)
    }

    pub fn get_micro_block(
        &self,
        txn: &ReadTxn<'_>,
        hash: &Hash,
    ) -> Result<Option<MicroBlock>, StorageError> {
        get_bcs(&self.micro_blocks, txn, hash.as_bytes())
    }

    pub fn put_micro_block(
        &self,
        txn: &mut WriteTxn<'_>,
        block: &MicroBlock,
    ) -> Result<(), StorageError> {
        put_bcs(&self.micro_blocks, txn, block.hash().as_bytes(), block)
    }

    pub fn get_epoch_block(
        &self,
        txn: &ReadTxn<'_>,
        hash: &Hash,
    ) -> Result<Option<EpochBlock>, StorageError> {
        get_bcs(&self.epoch_blocks, txn, hash.as_bytes())
    }

    pub fn put_epoch_block(
        &self,
        txn: &mut WriteTxn<'_>,
        block: &EpochBlock,
    ) -> Result<(), StorageError> {
        put_bcs(&self.epoch_blocks, txn, block.hash().as_bytes(), block)
    }

    pub fn get_micro_block_tip(
        &self,
        txn: &ReadTxn<'_>,
        epoch_number: u32,
    ) -> Result<Option<Tip>, StorageError> {
        get_bcs(&self.micro_block_tips, txn, &epoch_number.to_be_bytes())
    }

    pub fn put_micro_block_tip(
        &self,
        txn: &mut WriteTxn<'_>,
        epoch_number: u32,
        tip: &Tip,
    ) -> Result<(), StorageError> {
        put_bcs(&self.micro_block_tips, txn, &epoch_number.to_be_bytes(), tip)
    }

    pub fn get_epoch_tip(
        &self,
        txn: &ReadTxn<'_>,
        epoch_number: u32,
    ) -> Result<Option<Tip>, StorageError> {
        get_bcs(&self.epoch_tips, txn, &epoch_number.to_be_bytes())
    }

    pub fn put_epoch_tip(
        &self,
        txn: &mut WriteTxn<'_>,
        epoch_number: u32,
        tip: &Tip,
    ) -> Result<(), StorageError> {
        put_bcs(&self.epoch_tips, txn, &epoch_number.to_be_bytes(), tip)
    }

    pub fn get_batch_tip(
        &self,
        txn: &ReadTxn<'_>,
        delegate: DelegateId,
        epoch_number: u32,
    ) -> Result<Option<Tip>, StorageError> {
        get_bcs(
            &self.batch_tips[usize::from(delegate)],
            txn,
            &epoch_number.to_be_bytes(),
        )
    }

    pub fn put_batch_tip(
        &self,
        txn: &mut WriteTxn<'_>,
        delegate: DelegateId,
        epoch_number: u32,
        tip: &Tip,
    ) -> Result<(), StorageError> {
        put_bcs(
            &self.batch_tips[usize::from(delegate)],
            txn,
            &epoch_number.to_be_bytes(),
            tip,
        )
    }

    pub fn request_exists(&self, txn: &ReadTxn<'_>, hash: &Hash) -> Result<bool, StorageError> {
        Ok(self.requests.get(txn, hash.as_bytes())?.is_some())
    }

    pub fn put_request_index(
        &self,
        txn: &mut WriteTxn<'_>,
        hash: &Hash,
        account: &logos_config::AccountAddress,
    ) -> Result<(), StorageError> {
        Ok(self.requests.put(txn, hash.as_bytes(), account)?)
    }

    /// Any of the three block kinds resolves to exactly one table, but callers that only have
    /// a hash (e.g. the dependency resolver) need to probe all three.
    pub fn block_exists(&self, txn: &ReadTxn<'_>, hash: &Hash) -> Result<bool, StorageError> {
        let key = hash.as_bytes();
        Ok(self.request_blocks.get(txn, key)?.is_some()
            || self.micro_blocks.get(txn, key)?.is_some()
            || self.epoch_blocks.get(txn, key)?.is_some())
    }

    pub fn put_unchecked(
        &self,
        txn: &mut WriteTxn<'_>,
        hash: &Hash,
        payload: &[u8],
    ) -> Result<(), StorageError> {
        Ok(self.unchecked.put(txn, hash.as_bytes(), payload)?)
    }

    pub fn delete_unchecked(&self, txn: &mut WriteTxn<'_>, hash: &Hash) -> Result<(), StorageError> {
        self.unchecked.delete(txn, hash.as_bytes())?;
        Ok(())
    }

    pub fn put_receive_marker(
        &self,
        txn: &mut WriteTxn<'_>,
        key: &[u8],
    ) -> Result<(), StorageError> {
        Ok(self.receive.put(txn, key, &[])?)
    }

    pub fn put_address_ad(
        &self,
        txn: &mut WriteTxn<'_>,
        key: &[u8],
        payload: &[u8],
    ) -> Result<(), StorageError> {
        Ok(self.address_ad.put(txn, key, payload)?)
    }

    pub fn put_address_ad_txa(
        &self,
        txn: &mut WriteTxn<'_>,
        key: &[u8],
        payload: &[u8],
    ) -> Result<(), StorageError> {
        Ok(self.address_ad_txa.put(txn, key, payload)?)
    }

    pub fn put_p2p(&self, txn: &mut WriteTxn<'_>, key: &[u8], payload: &[u8]) -> Result<(), StorageError> {
        Ok(self.p2p.put(txn, key, payload)?)
    }
}

fn get_bcs<T: serde::de::DeserializeOwned>(
    db: &Database<Bytes, Bytes>,
    txn: &ReadTxn<'_>,
    key: &[u8],
) -> Result<Option<T>, StorageError> {
    match db.get(txn, key)? {
        Some(bytes) => Ok(Some(bcs::from_bytes(bytes)?)),
        None => Ok(None),
    }
}

fn put_bcs<T: serde::Serialize>(
    db: &Database<Bytes, Bytes>,
    txn: &mut WriteTxn<'_>,
    key: &[u8],
    value: &T,
) -> Result<(), StorageError> {
    let bytes = bcs::to_bytes(value)?;
    db.put(txn, key, &bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use logos_types::{ChainKind, Coord};
    use tempfile::TempDir;

    fn empty_tips() -> [Tip; NUM_DELEGATES] {
        std::array::from_fn(|_| Tip::NONE)
    }

    #[test]
    fn put_then_get_request_block_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path(), 128).unwrap();
        let block = RequestBlock {
            epoch_number: 1,
            primary_delegate: 3,
            sequence: 0,
            previous: Hash::ZERO,
            requests: vec![],
        };
        let hash = block.hash();

        let mut wtxn = store.begin_write().unwrap();
        store.put_request_block(&mut wtxn, &block).unwrap();
        wtxn.commit().unwrap();

        let rtxn = store.begin_read().unwrap();
        let fetched = store.get_request_block(&rtxn, &hash).unwrap().unwrap();
        assert_eq!(fetched, block);
        assert!(store.block_exists(&rtxn, &hash).unwrap());
    }

    #[test]
    fn batch_tip_is_keyed_per_delegate() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path(), 128).unwrap();
        let d0 = DelegateId::try_from(0u8).unwrap();
        let d1 = DelegateId::try_from(1u8).unwrap();
        let tip = Tip::new(1, 5, Hash([7u8; 32]));

        let mut wtxn = store.begin_write().unwrap();
        store.put_batch_tip(&mut wtxn, d0, 1, &tip).unwrap();
        wtxn.commit().unwrap();

        let rtxn = store.begin_read().unwrap();
        assert_eq!(store.get_batch_tip(&rtxn, d0, 1).unwrap(), Some(tip));
        assert_eq!(store.get_batch_tip(&rtxn, d1, 1).unwrap(), None);
    }

    #[test]
    fn coord_round_trips_through_chain_kind() {
        // sanity check that logos-types' Coord is usable alongside storage lookups.
        let coord = Coord::request(0, DelegateId::try_from(2u8).unwrap(), 4);
        assert_eq!(coord.kind, ChainKind::RequestBlock);
        let _ = empty_tips();
    }
}
