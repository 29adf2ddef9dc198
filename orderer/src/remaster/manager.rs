// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use ordering_core::{Key, RegionId, Transaction, TxnId};

use crate::storage::Storage;

/// Admission verdict. Ownership of the transaction follows the verdict: a
/// `Waiting` transaction is retained in the manager's blocking queues until
/// a remaster or a release lets it through.
#[derive(Debug)]
pub enum VerifyMasterResult {
    Valid(Transaction),
    Waiting,
    Abort(Transaction),
}

#[derive(Debug, Default)]
pub struct RemasterResult {
    pub unblocked: Vec<Transaction>,
    pub should_abort: Vec<Transaction>,
}

enum CounterCheck {
    Valid,
    Waiting,
    Abort,
}

/// Per-partition gatekeeper validating that every accessed key's declared
/// (master, counter) matches committed state. Transactions whose counters
/// lie in the future block in per-key FIFO queues; a blocked transaction is
/// admitted only once it reaches the head of every queue it occupies.
pub struct RemasterManager {
    storage: Arc<dyn Storage>,
    key_queues: HashMap<Key, VecDeque<TxnId>>,
    blocked: HashMap<TxnId, Transaction>,
}

impl RemasterManager {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            key_queues: HashMap::new(),
            blocked: HashMap::new(),
        }
    }

    pub fn verify_master(&mut self, txn: Transaction) -> VerifyMasterResult {
        self.validate_declarations(&txn);
        match self.check_counters(&txn) {
            CounterCheck::Abort => VerifyMasterResult::Abort(txn),
            CounterCheck::Waiting => {
                self.block(txn);
                VerifyMasterResult::Waiting
            }
            CounterCheck::Valid => {
                // Even an up-to-date transaction queues behind in-flight
                // remaster waiters on any of its keys.
                let contended = unique_keys(&txn).into_iter().any(|key| {
                    self.key_queues
                        .get(&key)
                        .is_some_and(|queue| !queue.is_empty())
                });
                if contended {
                    self.block(txn);
                    VerifyMasterResult::Waiting
                } else {
                    VerifyMasterResult::Valid(txn)
                }
            }
        }
    }

    /// A remaster for `key` has been applied to storage. Waiters whose
    /// declared counter was overtaken abort regardless of queue position;
    /// the rest are re-admitted from the queue head.
    pub fn remaster_occurred(&mut self, key: &Key, new_counter: u32) -> RemasterResult {
        let mut result = RemasterResult::default();

        let stale: Vec<TxnId> = self
            .key_queues
            .get(key)
            .into_iter()
            .flatten()
            .copied()
            .filter(|txn_id| {
                let txn = &self.blocked[txn_id];
                txn.metadata[key].counter < new_counter
            })
            .collect();
        for txn_id in stale {
            let txn = self.remove_blocked(txn_id);
            result.should_abort.push(txn);
        }

        self.collect_ready(vec![key.clone()], &mut result);
        result
    }

    /// The scheduler is done with a previously blocked transaction. Its
    /// removal may unblock successors queued behind it; the cascade runs
    /// over a FIFO worklist of affected keys.
    pub fn release_transaction(&mut self, txn_id: TxnId) -> RemasterResult {
        let mut result = RemasterResult::default();
        if self.blocked.contains_key(&txn_id) {
            let txn = self.remove_blocked(txn_id);
            self.collect_ready(unique_keys(&txn), &mut result);
        }
        result
    }

    fn block(&mut self, txn: Transaction) {
        for key in unique_keys(&txn) {
            self.key_queues.entry(key).or_default().push_back(txn.id);
        }
        self.blocked.insert(txn.id, txn);
    }

    fn remove_blocked(&mut self, txn_id: TxnId) -> Transaction {
        let txn = self
            .blocked
            .remove(&txn_id)
            .expect("queued txn is not in the blocked set");
        for key in unique_keys(&txn) {
            if let Some(queue) = self.key_queues.get_mut(&key) {
                queue.retain(|id| *id != txn_id);
                if queue.is_empty() {
                    self.key_queues.remove(&key);
                }
            }
        }
        txn
    }

    fn collect_ready(&mut self, seeds: Vec<Key>, result: &mut RemasterResult) {
        let mut worklist: VecDeque<Key> = seeds.into();
        while let Some(key) = worklist.pop_front() {
            loop {
                let Some(head) = self
                    .key_queues
                    .get(&key)
                    .and_then(|queue| queue.front().copied())
                else {
                    break;
                };

                let verdict = {
                    let txn = &self.blocked[&head];
                    let at_head_everywhere = unique_keys(txn).into_iter().all(|other| {
                        self.key_queues
                            .get(&other)
                            .and_then(|queue| queue.front())
                            == Some(&head)
                    });
                    if at_head_everywhere {
                        Some(self.check_counters(txn))
                    } else {
                        None
                    }
                };

                match verdict {
                    Some(CounterCheck::Valid) => {
                        let txn = self.remove_blocked(head);
                        worklist.extend(unique_keys(&txn));
                        result.unblocked.push(txn);
                    }
                    Some(CounterCheck::Abort) => {
                        let txn = self.remove_blocked(head);
                        worklist.extend(unique_keys(&txn));
                        result.should_abort.push(txn);
                    }
                    Some(CounterCheck::Waiting) | None => break,
                }
            }
        }
    }

    fn validate_declarations(&self, txn: &Transaction) {
        let mut declared: Option<RegionId> = None;
        for key in unique_keys(txn) {
            let meta = txn.metadata.get(&key).unwrap_or_else(|| {
                panic!("transaction {} has no master metadata for key {key}", txn.id)
            });
            match declared {
                None => declared = Some(meta.master),
                Some(master) => assert_eq!(
                    master, meta.master,
                    "masters don't match within transaction {}",
                    txn.id
                ),
            }
        }
    }

    fn check_counters(&self, txn: &Transaction) -> CounterCheck {
        let mut waiting = false;
        for key in unique_keys(txn) {
            let meta = txn.metadata[&key];
            // An uninitialized key has counter 0 on whatever master the
            // transaction declares.
            let (current_master, current_counter) = match self.storage.read(&key) {
                Some(record) => (record.master, record.counter),
                None => (meta.master, 0),
            };
            if meta.master != current_master || meta.counter < current_counter {
                return CounterCheck::Abort;
            }
            if meta.counter > current_counter {
                waiting = true;
            }
        }
        if waiting {
            CounterCheck::Waiting
        } else {
            CounterCheck::Valid
        }
    }
}

fn unique_keys(txn: &Transaction) -> Vec<Key> {
    let mut keys: Vec<Key> = txn.keys().cloned().collect();
    keys.sort();
    keys.dedup();
    keys
}
