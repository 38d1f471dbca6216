use std::sync::Arc;

use chainidx_core::{
    Address, BlockEffects, ChangeId, CoinInput, CoinOutput, CoinOutputId, ConsensusChange, Currency,
    MinerPayout, Network, SpendCondition, Transaction,
};
use chainidx_datastore::MemoryDatastore;

use crate::ProjectionEngine;

fn addr(seed: &str) -> Address {
    Address::derive_from(seed.as_bytes())
}

fn out_id(seed: &str) -> CoinOutputId {
    CoinOutputId::from_bytes(*Address::derive_from(seed.as_bytes()).as_bytes())
}

fn plain_output(seed: &str, value: u64, beneficiary: Address) -> CoinOutput {
    CoinOutput {
        id: out_id(seed),
        value: Currency::from_u64(value),
        condition: SpendCondition::UnlockHash(beneficiary),
    }
}

fn tx(inputs: Vec<CoinInput>, outputs: Vec<CoinOutput>) -> Transaction {
    Transaction {
        coin_inputs: inputs,
        coin_outputs: outputs,
        block_stake_output_count: 0,
    }
}

fn change(id: &str, applied: Vec<BlockEffects>, reverted: Vec<BlockEffects>) -> ConsensusChange {
    ConsensusChange {
        id: ChangeId(id.to_string()),
        reverted,
        applied,
    }
}

fn engine() -> ProjectionEngine<MemoryDatastore> {
    ProjectionEngine::new(Arc::new(MemoryDatastore::new()), "examplecoin", Network::Standard)
}

async fn total_supply(engine: &ProjectionEngine<MemoryDatastore>) -> Currency {
    let mut total = Currency::zero();
    for a in engine.balances().all_addresses().await.unwrap() {
        let balance = engine.balances().balance(&a).await.unwrap();
        total = total.checked_add(&balance.total());
    }
    total
}

#[tokio::test]
async fn genesis_only() {
    let e = engine();
    let a = addr("A");
    let b = addr("B");
    let genesis = BlockEffects {
        parent_id: None,
        parent_timestamp: None,
        timestamp: 0,
        miner_payouts: vec![],
        transactions: vec![tx(vec![], vec![plain_output("out-a", 100, a), plain_output("out-b", 50, b)])],
    };
    e.process_change(&change("c1", vec![genesis], vec![])).await.unwrap();

    let stats = e.stats().await.unwrap();
    assert_eq!(stats.block_height, 0);
    assert_eq!(stats.coins, Currency::from_u64(150));

    let mut addresses = e.balances().all_addresses().await.unwrap();
    addresses.sort();
    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(addresses, expected);

    assert_eq!(e.balances().balance(&a).await.unwrap().unlocked, Currency::from_u64(100));
    assert_eq!(e.balances().balance(&b).await.unwrap().unlocked, Currency::from_u64(50));
}

#[tokio::test]
async fn miner_payout_matures_after_maturity_delay() {
    // Testnet's maturity delay is 10 blocks.
    let e = ProjectionEngine::new(Arc::new(MemoryDatastore::new()), "examplecoin", Network::Testnet);
    let genesis = BlockEffects {
        parent_id: None,
        parent_timestamp: None,
        timestamp: 0,
        miner_payouts: vec![],
        transactions: vec![],
    };
    e.process_change(&change("c0", vec![genesis], vec![])).await.unwrap();

    let miner = addr("miner");
    let block1 = BlockEffects {
        parent_id: Some([1u8; 32]),
        parent_timestamp: Some(0),
        timestamp: 100,
        miner_payouts: vec![MinerPayout {
            id: out_id("payout-1"),
            address: miner,
            value: Currency::from_u64(10),
        }],
        transactions: vec![],
    };
    e.process_change(&change("c1", vec![block1], vec![])).await.unwrap();
    assert_eq!(e.balances().balance(&miner).await.unwrap().locked, Currency::from_u64(10));
    assert!(e.balances().balance(&miner).await.unwrap().unlocked.is_zero());

    // Blocks 2..10: still locked (matures at height 1 + 10 = 11).
    let mut prev_timestamp = 100u64;
    for h in 2..=10u64 {
        let block = BlockEffects {
            parent_id: Some([h as u8; 32]),
            parent_timestamp: Some(prev_timestamp),
            timestamp: 100 + h,
            miner_payouts: vec![],
            transactions: vec![],
        };
        prev_timestamp = block.timestamp;
        e.process_change(&change(&format!("c{h}"), vec![block], vec![])).await.unwrap();
    }
    assert_eq!(e.balances().balance(&miner).await.unwrap().locked, Currency::from_u64(10));

    let block11 = BlockEffects {
        parent_id: Some([11u8; 32]),
        parent_timestamp: Some(prev_timestamp),
        timestamp: 200,
        miner_payouts: vec![],
        transactions: vec![],
    };
    e.process_change(&change("c11", vec![block11], vec![])).await.unwrap();
    let balance = e.balances().balance(&miner).await.unwrap();
    assert!(balance.locked.is_zero());
    assert_eq!(balance.unlocked, Currency::from_u64(10));
}

#[tokio::test]
async fn time_locked_output_matures_at_timestamp() {
    let e = engine();
    let a = addr("A");
    let genesis = BlockEffects {
        parent_id: None,
        parent_timestamp: None,
        timestamp: 1000,
        miner_payouts: vec![],
        transactions: vec![tx(
            vec![],
            vec![CoinOutput {
                id: out_id("locked-1"),
                value: Currency::from_u64(7),
                condition: SpendCondition::time_lock(SpendCondition::UnlockHash(a), 2000),
            }],
        )],
    };
    e.process_change(&change("c1", vec![genesis], vec![])).await.unwrap();
    let balance = e.balances().balance(&a).await.unwrap();
    assert_eq!(balance.locked, Currency::from_u64(7));
    assert!(balance.unlocked.is_zero());

    let block2 = BlockEffects {
        parent_id: Some([2u8; 32]),
        parent_timestamp: Some(1000),
        timestamp: 2500,
        miner_payouts: vec![],
        transactions: vec![],
    };
    e.process_change(&change("c2", vec![block2], vec![])).await.unwrap();
    let balance = e.balances().balance(&a).await.unwrap();
    assert!(balance.locked.is_zero());
    assert_eq!(balance.unlocked, Currency::from_u64(7));
}

#[tokio::test]
async fn spend_moves_value_between_addresses() {
    let e = engine();
    let a = addr("A");
    let c = addr("C");
    let genesis = BlockEffects {
        parent_id: None,
        parent_timestamp: None,
        timestamp: 0,
        miner_payouts: vec![],
        transactions: vec![tx(vec![], vec![plain_output("out-a", 100, a)])],
    };
    e.process_change(&change("c1", vec![genesis], vec![])).await.unwrap();

    let spend_block = BlockEffects {
        parent_id: Some([2u8; 32]),
        parent_timestamp: Some(0),
        timestamp: 10,
        miner_payouts: vec![],
        transactions: vec![tx(
            vec![CoinInput {
                parent_id: out_id("out-a"),
                parent_address: a,
                parent_value: Currency::from_u64(100),
            }],
            vec![plain_output("out-c", 100, c)],
        )],
    };
    e.process_change(&change("c2", vec![spend_block], vec![])).await.unwrap();

    assert!(e.balances().balance(&a).await.unwrap().total().is_zero());
    assert_eq!(e.balances().balance(&c).await.unwrap().unlocked, Currency::from_u64(100));

    let stats = e.stats().await.unwrap();
    assert_eq!(stats.coin_input_count, 1);
    assert_eq!(stats.coin_output_count, 2); // genesis output + spend output
}

#[tokio::test]
async fn reorg_reverts_back_to_pre_fork_state() {
    let e = engine();
    let a = addr("A");
    let genesis = BlockEffects {
        parent_id: None,
        parent_timestamp: None,
        timestamp: 0,
        miner_payouts: vec![],
        transactions: vec![tx(vec![], vec![plain_output("out-a", 100, a)])],
    };
    e.process_change(&change("c1", vec![genesis.clone()], vec![])).await.unwrap();
    let stats_before = e.stats().await.unwrap();
    let balance_before = e.balances().balance(&a).await.unwrap();

    let b = addr("B");
    let block1 = BlockEffects {
        parent_id: Some([1u8; 32]),
        parent_timestamp: Some(0),
        timestamp: 10,
        miner_payouts: vec![],
        transactions: vec![tx(vec![], vec![plain_output("out-b1", 5, b)])],
    };
    let block2 = BlockEffects {
        parent_id: Some([2u8; 32]),
        parent_timestamp: Some(10),
        timestamp: 20,
        miner_payouts: vec![],
        transactions: vec![tx(vec![], vec![plain_output("out-b2", 5, b)])],
    };
    e.process_change(&change("c2", vec![block1.clone()], vec![])).await.unwrap();
    e.process_change(&change("c3", vec![block2.clone()], vec![])).await.unwrap();

    // Reorg: revert both blocks in tip-first order, no new applies.
    e.process_change(&change("c4", vec![], vec![block2, block1])).await.unwrap();

    let stats_after = e.stats().await.unwrap();
    let balance_after = e.balances().balance(&a).await.unwrap();
    assert_eq!(stats_after, stats_before);
    assert_eq!(balance_after, balance_before);

    // Address set is append-only: B is still known even though reverted.
    let addresses = e.balances().all_addresses().await.unwrap();
    assert!(addresses.contains(&b));
}

#[tokio::test]
async fn multisig_link_is_recorded_symmetrically() {
    let e = engine();
    let o1 = addr("O1");
    let o2 = addr("O2");
    let wallet_condition = SpendCondition::multisig(vec![o1, o2], 2);
    let wallet = wallet_condition.beneficiary();

    let genesis = BlockEffects {
        parent_id: None,
        parent_timestamp: None,
        timestamp: 0,
        miner_payouts: vec![],
        transactions: vec![tx(
            vec![],
            vec![CoinOutput {
                id: out_id("multisig-out"),
                value: Currency::from_u64(20),
                condition: wallet_condition,
            }],
        )],
    };
    e.process_change(&change("c1", vec![genesis], vec![])).await.unwrap();

    let mut wallet_owners = e.balances().multisig_owners_of(&wallet).await.unwrap();
    wallet_owners.sort();
    let mut expected = vec![o1, o2];
    expected.sort();
    assert_eq!(wallet_owners, expected);
    assert_eq!(e.balances().multisig_owners_of(&o1).await.unwrap(), vec![wallet]);
    assert_eq!(e.balances().multisig_owners_of(&o2).await.unwrap(), vec![wallet]);
}

#[tokio::test]
async fn mass_conservation_holds_after_several_changes() {
    let e = engine();
    let a = addr("A");
    let b = addr("B");
    let genesis = BlockEffects {
        parent_id: None,
        parent_timestamp: None,
        timestamp: 0,
        miner_payouts: vec![],
        transactions: vec![tx(vec![], vec![plain_output("out-a", 100, a)])],
    };
    e.process_change(&change("c1", vec![genesis], vec![])).await.unwrap();

    let spend_block = BlockEffects {
        parent_id: Some([2u8; 32]),
        parent_timestamp: Some(0),
        timestamp: 10,
        miner_payouts: vec![MinerPayout {
            id: out_id("payout-1"),
            address: b,
            value: Currency::from_u64(5),
        }],
        transactions: vec![tx(
            vec![CoinInput {
                parent_id: out_id("out-a"),
                parent_address: a,
                parent_value: Currency::from_u64(100),
            }],
            vec![plain_output("out-a2", 100, a)],
        )],
    };
    e.process_change(&change("c2", vec![spend_block], vec![])).await.unwrap();

    let stats = e.stats().await.unwrap();
    assert_eq!(stats.coins, total_supply(&e).await);
}

#[tokio::test]
async fn resuming_from_persisted_state_matches_running_straight_through() {
    let a = addr("A");
    let build_changes = || {
        vec![
            change(
                "c1",
                vec![BlockEffects {
                    parent_id: None,
                    parent_timestamp: None,
                    timestamp: 0,
                    miner_payouts: vec![],
                    transactions: vec![tx(vec![], vec![plain_output("out-a", 100, a)])],
                }],
                vec![],
            ),
            change(
                "c2",
                vec![BlockEffects {
                    parent_id: Some([2u8; 32]),
                    parent_timestamp: Some(0),
                    timestamp: 10,
                    miner_payouts: vec![],
                    transactions: vec![],
                }],
                vec![],
            ),
        ]
    };

    let straight = engine();
    for c in build_changes() {
        straight.process_change(&c).await.unwrap();
    }

    let store = Arc::new(MemoryDatastore::new());
    let resumable = ProjectionEngine::new(store.clone(), "examplecoin", Network::Standard);
    let changes = build_changes();
    resumable.process_change(&changes[0]).await.unwrap();
    // Simulate a restart: a fresh engine instance over the same store reads
    // `state`/`stats` back from scratch.
    let resumable_after_restart = ProjectionEngine::new(store, "examplecoin", Network::Standard);
    resumable_after_restart.process_change(&changes[1]).await.unwrap();

    assert_eq!(straight.stats().await.unwrap(), resumable_after_restart.stats().await.unwrap());
    assert_eq!(
        straight.balances().balance(&a).await.unwrap(),
        resumable_after_restart.balances().balance(&a).await.unwrap()
    );
}
