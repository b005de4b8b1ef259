//! Template assembly scenarios.

use crate::generators::{add_tx_at_rate, add_tx_with_fee, make_tx, position_of};
use crate::harness::TestNode;
use ember_consensus::{ChainView, MAX_BLOCK_SIGOPS_COST};
use ember_mining::{AssemblerOptions, BlockTemplate, MiningError};
use ember_primitives::{Amount, FeeRate, Hash256, COIN};
use std::collections::BTreeSet;
use std::sync::Arc;

fn template_txids(template: &BlockTemplate) -> Vec<Hash256> {
    template.block.txdata.iter().map(|tx| tx.txid()).collect()
}

fn assemble(node: &TestNode, options: AssemblerOptions) -> BlockTemplate {
    node.assembler(options)
        .create_new_block(&node.coinbase_script(), true)
        .expect("assembly succeeds")
}

#[test]
fn test_empty_mempool_yields_coinbase_only_block() {
    let node = TestNode::regtest();
    let template = assemble(&node, AssemblerOptions::default());

    assert_eq!(template.block.txdata.len(), 1);
    assert_eq!(template.fees, vec![0]);
    assert_eq!(template.sigops, vec![0]);

    let coinbase = template.block.coinbase().expect("coinbase present");
    assert!(coinbase.is_coinbase());
    // Fees are zero, so the payout is exactly the height-101 subsidy.
    assert_eq!(coinbase.outputs[0].value, 50 * COIN);
    assert_eq!(
        coinbase.outputs[0].script_pubkey,
        node.coinbase_script()
    );
    // Height followed by OP_0, as consensus requires.
    assert_eq!(coinbase.inputs[0].script_sig.as_bytes(), &[0x01, 101, 0x00]);
    // The witness commitment output was appended.
    assert_eq!(coinbase.outputs.len(), 2);
    assert_eq!(
        coinbase.outputs[1].script_pubkey.as_bytes(),
        template.coinbase_commitment.as_slice()
    );

    let tip = node.chain.tip();
    assert_eq!(template.block.header.prev_blockhash, tip.hash);
    assert_eq!(template.block.header.nonce, 0);
    assert_eq!(template.block.header.bits, 0x207f_ffff);
    assert!(template.block.header.time as i64 > tip.median_time_past);
}

#[test]
fn test_dependent_package_is_included_in_order() {
    let node = TestNode::regtest();
    let root = add_tx_at_rate(&node.pool, &[], 1, 0, 3);
    let mid = add_tx_at_rate(&node.pool, &[(root, 0)], 2, 0, 3);
    let leaf = add_tx_at_rate(&node.pool, &[(mid, 0)], 3, 0, 3);

    let template = assemble(&node, AssemblerOptions::default());
    let txids = template_txids(&template);

    assert_eq!(txids.len(), 4);
    let root_pos = position_of(&txids, &root).expect("root included");
    let mid_pos = position_of(&txids, &mid).expect("mid included");
    let leaf_pos = position_of(&txids, &leaf).expect("leaf included");
    assert!(root_pos < mid_pos && mid_pos < leaf_pos);

    // The coinbase consumes the block's fees.
    let fee_sum: Amount = template.fees[1..].iter().sum();
    assert_eq!(template.fees[0], -fee_sum);
    let view = node.pool.read();
    let expected: Amount = [root, mid, leaf]
        .iter()
        .map(|txid| view.entry(txid).unwrap().fee)
        .sum();
    assert_eq!(fee_sum, expected);
}

#[test]
fn test_higher_fee_rate_package_selected_first() {
    let node = TestNode::regtest();
    let b = add_tx_at_rate(&node.pool, &[], 1, 0, 5);
    let a = add_tx_at_rate(&node.pool, &[], 2, 0, 10);

    let template = assemble(&node, AssemblerOptions::default());
    let txids = template_txids(&template);

    assert_eq!(position_of(&txids, &a), Some(1));
    assert_eq!(position_of(&txids, &b), Some(2));
}

#[test]
fn test_fee_rate_exactly_at_floor_is_included() {
    let node = TestNode::regtest();

    // Default floor is 1000 lits/kvB, i.e. one lit per virtual byte.
    let vsize = make_tx(&[], 1, 0).vsize() as Amount;
    let at_floor = add_tx_with_fee(&node.pool, &[], 1, 0, vsize);
    let below_floor = add_tx_with_fee(&node.pool, &[], 2, 0, vsize - 1);

    let template = assemble(&node, AssemblerOptions::default());
    let txids = template_txids(&template);

    // The test is strictly-below, so an exact match still qualifies.
    assert!(position_of(&txids, &at_floor).is_some());
    assert!(position_of(&txids, &below_floor).is_none());
}

#[test]
fn test_budget_exhaustion_keeps_best_package_and_terminates() {
    let node = TestNode::regtest();

    let large = add_tx_at_rate(&node.pool, &[], 9_999_999, 850, 20);
    {
        let view = node.pool.read();
        let large_size = view.entry(&large).unwrap().tx_size;
        let small_size = make_tx(&[], 5_000_000, 0).vsize();
        // The large package alone nearly fills an 8000-weight block, and no
        // small package fits into what remains.
        assert!(4_000 + 4 * large_size < 8_000);
        assert!(4_000 + 4 * large_size + 4 * small_size >= 8_000);
    }
    for tag in 0..2_000u64 {
        add_tx_at_rate(&node.pool, &[], tag, 0, 5);
    }

    let template = assemble(
        &node,
        AssemblerOptions {
            max_weight: 8_000,
            ..Default::default()
        },
    );
    let txids = template_txids(&template);

    // Only the high-rate filler made it; every small package hit the budget
    // wall and the failure heuristic cut the tail short.
    assert_eq!(txids.len(), 2);
    assert_eq!(position_of(&txids, &large), Some(1));
}

#[test]
fn test_floor_cuts_off_lower_rates() {
    let node = TestNode::regtest();
    let rich = add_tx_at_rate(&node.pool, &[], 1, 0, 20);
    let mid = add_tx_at_rate(&node.pool, &[], 2, 0, 15);
    let poor = add_tx_at_rate(&node.pool, &[], 3, 0, 9);
    let poorer = add_tx_at_rate(&node.pool, &[], 4, 0, 8);

    let template = assemble(
        &node,
        AssemblerOptions {
            min_fee_rate: FeeRate::from_lits_per_kvb(10_000),
            ..Default::default()
        },
    );
    let txids = template_txids(&template);

    assert!(position_of(&txids, &rich).is_some());
    assert!(position_of(&txids, &mid).is_some());
    assert!(position_of(&txids, &poor).is_none());
    assert!(position_of(&txids, &poorer).is_none());
    assert_eq!(txids.len(), 3);
}

#[test]
fn test_child_pays_for_parent_package_selection() {
    let node = TestNode::regtest();
    let parent = add_tx_at_rate(&node.pool, &[], 1, 0, 2);
    let child = add_tx_at_rate(&node.pool, &[(parent, 0)], 2, 0, 60);
    let unrelated = add_tx_at_rate(&node.pool, &[], 3, 0, 10);

    let template = assemble(&node, AssemblerOptions::default());
    let txids = template_txids(&template);

    // The child's package rate beats the unrelated transaction, so the
    // whole package goes first, parent before child.
    assert_eq!(position_of(&txids, &parent), Some(1));
    assert_eq!(position_of(&txids, &child), Some(2));
    assert_eq!(position_of(&txids, &unrelated), Some(3));
}

#[test]
fn test_overlay_corrects_stale_descendant_scores() {
    let node = TestNode::regtest();
    // The child's pooled package rate is 40, but once the parent is in the
    // block its own rate is only 30, which the unrelated transaction beats.
    let parent = add_tx_at_rate(&node.pool, &[], 1, 0, 50);
    let child = add_tx_at_rate(&node.pool, &[(parent, 0)], 2, 0, 30);
    let unrelated = add_tx_at_rate(&node.pool, &[], 3, 0, 35);

    let template = assemble(&node, AssemblerOptions::default());
    let txids = template_txids(&template);

    assert_eq!(position_of(&txids, &parent), Some(1));
    assert_eq!(position_of(&txids, &unrelated), Some(2));
    assert_eq!(position_of(&txids, &child), Some(3));
}

#[test]
fn test_stale_tip_aborts_assembly() {
    let node = TestNode::regtest();
    node.chain.advance_after_first_read();

    let result = node
        .assembler(AssemblerOptions::default())
        .create_new_block(&node.coinbase_script(), true);
    assert!(matches!(result, Err(MiningError::StaleTip)));
}

#[test]
fn test_validity_rejection_is_fatal_to_the_template() {
    let node = TestNode::regtest();
    node.validation.reject_validity();

    let result = node
        .assembler(AssemblerOptions::default())
        .create_new_block(&node.coinbase_script(), true);
    assert!(matches!(result, Err(MiningError::InvalidTemplate(_))));
}

#[test]
fn test_witness_transactions_excluded_while_witness_disabled() {
    let node = TestNode::regtest();
    node.chain.set_witness_enabled(false);

    let mut witness_tx = (*make_tx(&[], 1, 0)).clone();
    witness_tx.inputs[0].witness = vec![vec![0xaa; 16]];
    let witness_tx = Arc::new(witness_tx);
    let witness_txid = witness_tx.txid();
    let fee = 10 * witness_tx.vsize() as Amount;
    node.pool.add(witness_tx, fee, 0).unwrap();

    let plain = add_tx_at_rate(&node.pool, &[], 2, 0, 5);

    let template = assemble(&node, AssemblerOptions::default());
    let txids = template_txids(&template);

    assert!(position_of(&txids, &witness_txid).is_none());
    assert!(position_of(&txids, &plain).is_some());
}

#[test]
fn test_non_final_transactions_excluded() {
    let node = TestNode::regtest();

    let mut locked = (*make_tx(&[], 1, 0)).clone();
    locked.lock_time = 500; // far above the next height of 101
    locked.inputs[0].sequence = 0;
    let locked = Arc::new(locked);
    let locked_txid = locked.txid();
    let fee = 10 * locked.vsize() as Amount;
    node.pool.add(locked, fee, 0).unwrap();

    let spendable = add_tx_at_rate(&node.pool, &[], 2, 0, 5);

    let template = assemble(&node, AssemblerOptions::default());
    let txids = template_txids(&template);

    assert!(position_of(&txids, &locked_txid).is_none());
    assert!(position_of(&txids, &spendable).is_some());
}

#[test]
fn test_assembly_is_idempotent_on_unchanged_pool() {
    let node = TestNode::regtest();
    let a = add_tx_at_rate(&node.pool, &[], 1, 0, 12);
    let b = add_tx_at_rate(&node.pool, &[(a, 0)], 2, 0, 4);
    add_tx_at_rate(&node.pool, &[(a, 1), (b, 0)], 3, 0, 25);
    for tag in 10..30u64 {
        add_tx_at_rate(&node.pool, &[], tag, 0, (tag % 7 + 2) as Amount);
    }

    let first = assemble(&node, AssemblerOptions::default());
    let second = assemble(&node, AssemblerOptions::default());

    let first_set: BTreeSet<Hash256> = template_txids(&first).into_iter().collect();
    let second_set: BTreeSet<Hash256> = template_txids(&second).into_iter().collect();
    assert_eq!(first_set, second_set);
}

#[test]
fn test_topological_order_holds_across_a_diamond() {
    let node = TestNode::regtest();
    let a = add_tx_at_rate(&node.pool, &[], 1, 0, 8);
    let b = add_tx_at_rate(&node.pool, &[(a, 0)], 2, 0, 20);
    let c = add_tx_at_rate(&node.pool, &[(a, 1)], 3, 0, 3);
    let d = add_tx_at_rate(&node.pool, &[(b, 0), (c, 0)], 4, 0, 40);

    let template = assemble(&node, AssemblerOptions::default());
    let txids = template_txids(&template);

    let pos = |txid| position_of(&txids, txid).expect("included");
    assert!(pos(&a) < pos(&b));
    assert!(pos(&a) < pos(&c));
    assert!(pos(&b) < pos(&d));
    assert!(pos(&c) < pos(&d));
}

#[test]
fn test_weight_and_sigop_budgets_hold() {
    let node = TestNode::regtest();
    for tag in 0..50u64 {
        add_tx_at_rate(&node.pool, &[], tag, 200, 5);
    }

    let max_weight = 20_000;
    let template = assemble(
        &node,
        AssemblerOptions {
            max_weight,
            ..Default::default()
        },
    );

    let selected_weight: u64 = template.block.txdata[1..]
        .iter()
        .map(|tx| 4 * tx.vsize())
        .sum();
    assert!(4_000 + selected_weight <= max_weight);

    let sigops: i64 = template.sigops[1..].iter().sum();
    assert!(400 + sigops <= MAX_BLOCK_SIGOPS_COST);
}

#[test]
fn test_version_override_only_on_demand_networks() {
    let regtest = TestNode::regtest();
    let template = assemble(
        &regtest,
        AssemblerOptions {
            block_version_override: Some(7),
            ..Default::default()
        },
    );
    assert_eq!(template.block.header.version, 7);

    let mainnet = TestNode::mainnet_rules();
    let template = assemble(
        &mainnet,
        AssemblerOptions {
            block_version_override: Some(7),
            ..Default::default()
        },
    );
    assert_eq!(template.block.header.version, 4);
}
