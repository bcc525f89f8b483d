// SPDX-License-Identifier: Apache-2.0

//! End-to-end scenario tests exercising `BlockCache` against a real (temp-dir) LMDB store the way
//! `block_manager.rs`'s own `accept_blocks_unsuspend_children_blocks`-style tests drive the whole
//! pending-block pipeline rather than one function in isolation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use logos_config::{AccountAddress, Delegate, DelegateId, EpochCommittee, NUM_DELEGATES};
use logos_core::{AddResult, BlockCache, Context, ConsensusResult, Metrics, WriteQueueHandles};
use logos_core::{NoopEpochBlockHandler, NoopMicroBlockHandler, NoopRequestBlockHandler};
use logos_storage::{Store, WriteTxn};
use logos_types::{EpochBlock, Hash, MicroBlock, Request, RequestBlock, Tip, ValidationStatus};
use prometheus::Registry;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tempfile::TempDir;

fn committee() -> EpochCommittee {
    let delegates = (0..NUM_DELEGATES)
        .map(|i| Delegate {
            account: [i as u8; 32],
            consensus_pubkey: logos_config::ConsensusPublicKey([0u8; 96]),
            ecies_pubkey: logos_config::EciesPublicKey([0u8; 65]),
            vote_weight: 1,
            stake: 1,
            starting_term: 0,
        })
        .collect();
    EpochCommittee::new(0, delegates)
}

fn context_with_store() -> (Arc<Context>, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(Store::open(dir.path(), 128).unwrap());
    let context = Arc::new(Context::new(
        Some(DelegateId::try_from(0u8).unwrap()),
        committee(),
        logos_config::Parameters {
            db_path: Some(dir.path().to_path_buf()),
            ..Default::default()
        },
        Arc::new(Metrics::new(&Registry::new())),
        store,
    ));
    (context, dir)
}

async fn until<F: Fn() -> bool>(pred: F) {
    for _ in 0..200 {
        if pred() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never became true");
}

fn noop_handles(context: &Context) -> WriteQueueHandles {
    WriteQueueHandles {
        request: Arc::new(NoopRequestBlockHandler { store: context.store.clone() }),
        micro: Arc::new(NoopMicroBlockHandler { store: context.store.clone() }),
        epoch: Arc::new(NoopEpochBlockHandler { store: context.store.clone() }),
    }
}

/// scenario 3: "Mixed E/M/R across two epochs". Seeds RBs at seq 0, follow-on RBs, checkpointing
/// MBs, and one EB per epoch, all shuffled together and fed through `add_*`. Asserts the store
/// ends up with every chain advanced to its final tip, including the EB only after its MB_tip.
#[tokio::test]
async fn mixed_e_m_r_across_two_epochs_commits_everything() {
    const N_RBLOCKS: u32 = 2; // follow-on RBs per delegate, on top of the seed at seq 0.
    let (context, _dir) = context_with_store();
    let cache = BlockCache::new(context.clone(), noop_handles(&context));

    for epoch in 0..2u32 {
        let mut blocks: Vec<AddItem> = Vec::new();
        let mut tips = [Tip::NONE; NUM_DELEGATES];

        for d in 0..NUM_DELEGATES {
            let delegate = DelegateId::try_from(d as u8).unwrap();
            let mut previous = Hash::ZERO;
            for seq in 0..(1 + N_RBLOCKS) {
                let block = RequestBlock {
                    epoch_number: epoch,
                    primary_delegate: d as u8,
                    sequence: seq,
                    previous,
                    requests: vec![],
                };
                previous = block.hash();
                if seq == N_RBLOCKS {
                    tips[d] = Tip::new(epoch, seq, previous);
                }
                blocks.push(AddItem::Request(delegate, block));
            }
        }

        let mb = MicroBlock {
            epoch_number: epoch,
            primary_delegate: 0,
            sequence: 0,
            previous: Hash::ZERO,
            last_micro_block: true,
            tips,
            number_batch_blocks: (NUM_DELEGATES as u32) * (1 + N_RBLOCKS),
        };
        let mb_hash = mb.hash();
        blocks.push(AddItem::Micro(mb));

        let eb = EpochBlock {
            epoch_number: epoch,
            primary_delegate: 0,
            sequence: 0,
            previous: Hash::ZERO,
            micro_block_tip: Tip::new(epoch, 0, mb_hash),
            total_rbs: (NUM_DELEGATES as u32) * (1 + N_RBLOCKS),
            total_supply: 0,
            transaction_fee_pool: 0,
            delegates: vec![],
            is_extension: false,
        };
        blocks.push(AddItem::Epoch(eb));

        let mut rng = StdRng::seed_from_u64(7 + epoch as u64);
        blocks.shuffle(&mut rng);

        for item in blocks {
            let result = match item {
                AddItem::Request(d, b) => cache.add_request_block(d, b),
                AddItem::Micro(b) => cache.add_micro_block(b),
                AddItem::Epoch(b) => cache.add_epoch_block(b),
            };
            assert_ne!(result, AddResult::Failed);
        }

        until(|| {
            let txn = context.store.begin_read().unwrap();
            context.store.get_epoch_tip(&txn, epoch).unwrap().map(|t| t.sequence) == Some(0)
        })
        .await;

        let txn = context.store.begin_read().unwrap();
        assert_eq!(
            context.store.get_micro_block_tip(&txn, epoch).unwrap().map(|t| t.sequence),
            Some(0)
        );
        for d in 0..NUM_DELEGATES {
            let delegate = DelegateId::try_from(d as u8).unwrap();
            assert_eq!(
                context.store.get_batch_tip(&txn, delegate, epoch).unwrap().map(|t| t.sequence),
                Some(N_RBLOCKS)
            );
        }
    }
}

enum AddItem {
    Request(DelegateId, RequestBlock),
    Micro(MicroBlock),
    Epoch(EpochBlock),
}

/// A persistence handler modeling only the per-account `Request` dependency chain the doc
/// comment on `logos_types::Request::previous` describes: a request with `fee == 0` is only
/// admitted once the request it points at (its account's nearest ancestor) has itself committed.
/// The hash-dependency-chain and account-dependency-chain tests below exercise the same
/// mechanism over this one field; the account variant additionally requires that ancestor to
/// have been fee-bearing, which this handler also enforces.
struct AccountChainHandler {
    store: Arc<Store>,
    founding_fee: Mutex<HashMap<Hash, u128>>,
}

impl AccountChainHandler {
    fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            founding_fee: Mutex::new(HashMap::new()),
        }
    }
}

impl logos_core::PersistenceHandler<RequestBlock> for AccountChainHandler {
    fn verify_agg_signature(&self, _block: &RequestBlock) -> bool {
        true
    }

    fn verify_content(&self, block: &RequestBlock, _progress: u32) -> (bool, ValidationStatus) {
        let fees = self.founding_fee.lock().unwrap();
        let mut per_request = std::collections::BTreeMap::new();
        for (idx, req) in block.requests.iter().enumerate() {
            if req.previous.is_zero() {
                continue;
            }
            match fees.get(&req.previous) {
                None => {
                    per_request.insert(idx as u32, logos_types::ResultCode::GapSource);
                }
                Some(&ancestor_fee) => {
                    if req.fee == 0 && ancestor_fee == 0 {
                        per_request.insert(idx as u32, logos_types::ResultCode::InvalidRequest);
                    }
                }
            }
        }
        if per_request.is_empty() {
            (true, ValidationStatus::ok())
        } else {
            let reason = per_request.values().copied().next();
            (
                false,
                ValidationStatus {
                    reason,
                    per_request_results: per_request,
                    progress: 0,
                },
            )
        }
    }

    fn block_exists(&self, hash: &Hash) -> ConsensusResult<bool> {
        let txn = self.store.begin_read().map_err(logos_core::ConsensusError::from)?;
        Ok(self.store.block_exists(&txn, hash).map_err(logos_core::ConsensusError::from)?)
    }

    fn apply_updates(&self, txn: &mut WriteTxn<'_>, block: &RequestBlock) -> ConsensusResult<()> {
        self.store.put_request_block(txn, block).map_err(logos_core::ConsensusError::from)?;
        let mut fees = self.founding_fee.lock().unwrap();
        for req in &block.requests {
            fees.insert(req.hash, req.fee);
            self.store
                .put_request_index(txn, &req.hash, &req.origin)
                .map_err(logos_core::ConsensusError::from)?;
        }
        Ok(())
    }
}

fn request_block(
    delegate: u8,
    sequence: u32,
    request_hash: Hash,
    request_previous: Hash,
    origin: AccountAddress,
    fee: u128,
) -> RequestBlock {
    RequestBlock {
        epoch_number: 0,
        primary_delegate: delegate,
        sequence,
        previous: Hash::ZERO,
        requests: vec![Request {
            previous: request_previous,
            origin,
            fee,
            hash: request_hash,
        }],
    }
}

/// scenario 4: "Hash-dependency chain". Four RBs where RB[i+1]'s request points back at
/// RB[i]'s request hash. Inserted in reverse; all four must still commit, in forward order.
#[tokio::test]
async fn hash_dependency_chain_commits_in_forward_order() {
    let (context, _dir) = context_with_store();
    let handler = Arc::new(AccountChainHandler::new(context.store.clone()));
    let handles = WriteQueueHandles {
        request: handler.clone(),
        micro: Arc::new(NoopMicroBlockHandler { store: context.store.clone() }),
        epoch: Arc::new(NoopEpochBlockHandler { store: context.store.clone() }),
    };
    let cache = BlockCache::new(context.clone(), handles);
    let account: AccountAddress = [9u8; 32];

    // Four different delegates, each contributing exactly one (sequence 0) RB, so nothing about
    // per-delegate chain order enforces the commit order here — only the `Request.previous`
    // hash-dependency chain does.
    let request_hashes: Vec<Hash> = (0..4u8).map(|i| Hash([i; 32])).collect();
    let mut blocks = Vec::new();
    let mut previous_req = Hash::ZERO;
    for (i, &hash) in request_hashes.iter().enumerate() {
        blocks.push((DelegateId::try_from(i as u8).unwrap(), request_block(i as u8, 0, hash, previous_req, account, 1)));
        previous_req = hash;
    }
    blocks.reverse();

    for (delegate, block) in blocks {
        assert_ne!(cache.add_request_block(delegate, block), AddResult::Failed);
    }

    until(|| {
        let txn = context.store.begin_read().unwrap();
        request_hashes.iter().all(|h| context.store.request_exists(&txn, h).unwrap())
    })
    .await;
}

/// scenario 5: "Account-dependency chain". Four RBs mixing two accounts, some zero-fee; a
/// zero-fee request is only valid once its account's first (fee-bearing) request has committed.
#[tokio::test]
async fn account_dependency_chain_commits_once_preconditions_resolve() {
    let (context, _dir) = context_with_store();
    let handler = Arc::new(AccountChainHandler::new(context.store.clone()));
    let handles = WriteQueueHandles {
        request: handler.clone(),
        micro: Arc::new(NoopMicroBlockHandler { store: context.store.clone() }),
        epoch: Arc::new(NoopEpochBlockHandler { store: context.store.clone() }),
    };
    let cache = BlockCache::new(context.clone(), handles);

    let account_a: AccountAddress = [1u8; 32];
    let account_b: AccountAddress = [2u8; 32];

    let a_founding = Hash([10u8; 32]);
    let b_founding = Hash([11u8; 32]);
    let a_followup = Hash([12u8; 32]);
    let b_followup = Hash([13u8; 32]);

    let blocks = vec![
        request_block(0, 0, a_founding, Hash::ZERO, account_a, 5),
        request_block(1, 0, b_founding, Hash::ZERO, account_b, 7),
        request_block(0, 1, a_followup, a_founding, account_a, 0),
        request_block(1, 1, b_followup, b_founding, account_b, 0),
    ];
    let mut reversed = blocks;
    reversed.reverse();

    for block in reversed {
        let delegate_for = DelegateId::try_from(block.primary_delegate).unwrap();
        assert_ne!(cache.add_request_block(delegate_for, block), AddResult::Failed);
    }

    until(|| {
        let txn = context.store.begin_read().unwrap();
        [a_founding, b_founding, a_followup, b_followup]
            .iter()
            .all(|h| context.store.request_exists(&txn, h).unwrap())
    })
    .await;
}
