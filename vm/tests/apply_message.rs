// Copyright 2021-2023 Protocol Labs
// SPDX-License-Identifier: Apache-2.0, MIT
//! Integration coverage of the concrete `apply_message` scenarios, plus the
//! self-send and missing-recipient `send` edge cases.

use cid::multihash::Multihash;
use cid::Cid;
use fvm_ipld_blockstore::MemoryBlockstore;
use fvm_ipld_encoding::RawBytes;
use statevm::blockstore::BufferedBlockstore;
use statevm::state_tree::{put_cbor, Actor, StateTree};
use statevm::{Invoker, VmError};
use statevm_shared::address::Address;
use statevm_shared::econ::TokenAmount;
use statevm_shared::error::ExitCode;
use statevm_shared::message::Message;

/// A method whose exit code and reported gas usage are encoded in its first
/// two parameter bytes, so scenarios can drive the dispatch outcome directly.
fn scripted_method(
    _actor: &Actor,
    ctx: &mut statevm::InvocationContext<'_, MemoryBlockstore>,
    params: &[u8],
) -> statevm::Result<(Vec<u8>, ExitCode)> {
    let exit = params.first().copied().unwrap_or(0);
    let gas_used = params.get(1).copied().unwrap_or(0) as i64;
    ctx.record_gas(gas_used);
    Ok((b"method return".to_vec(), ExitCode(exit)))
}

fn test_code_id() -> Cid {
    Cid::new_v1(0x55, Multihash::wrap(0x0, b"test-actor").unwrap())
}

fn build_vm(
    balances: &[(Address, i64)],
    miner: Address,
) -> statevm::Vm<MemoryBlockstore> {
    let mem = MemoryBlockstore::default();
    let buffered = BufferedBlockstore::new(mem);
    let mut tree = StateTree::new(buffered).unwrap();

    for (addr, bal) in balances {
        let head = put_cbor(tree.store(), &()).unwrap();
        tree.set_actor(addr, Actor::new(test_code_id(), head, TokenAmount::from_atto(*bal)));
    }
    tree.set_actor(
        &miner,
        Actor::new(test_code_id(), Cid::default(), TokenAmount::zero()),
    );

    let root = tree.flush().unwrap();
    tree.store().flush(&root).unwrap();

    let mut invoker: Invoker<MemoryBlockstore> = Invoker::new();
    invoker.register(test_code_id(), 1, scripted_method);

    statevm::Vm::new(&root, 1, miner, tree.store().base().clone(), invoker).unwrap()
}

fn message(from: Address, to: Address, value: i64, nonce: u64, method: u64, gas_limit: i64, gas_price: i64, params: Vec<u8>) -> Message {
    Message {
        from,
        to,
        nonce,
        value: TokenAmount::from_atto(value),
        method,
        params: RawBytes::new(params),
        gas_price: TokenAmount::from_atto(gas_price),
        gas_limit,
    }
}

#[test]
fn pure_transfer() {
    let a = Address::new_secp256k1([1u8; 20]);
    let b = Address::new_secp256k1([2u8; 20]);
    let miner = Address::new_id(100);
    let mut vm = build_vm(&[(a, 100)], miner);

    let msg = message(a, b, 30, 0, 0, 10, 1, vec![]);
    let receipt = vm.apply_message(&msg).unwrap();

    assert_eq!(receipt.exit_code, ExitCode::OK);
    assert!(receipt.return_data.is_empty());
    assert_eq!(receipt.gas_used, 0);

    let a_actor = vm.state_tree().get_actor(&a).unwrap().unwrap();
    let b_actor = vm.state_tree().get_actor(&b).unwrap().unwrap();
    assert_eq!(a_actor.balance, TokenAmount::from_atto(60));
    assert_eq!(a_actor.nonce, 1);
    assert_eq!(b_actor.balance, TokenAmount::from_atto(30));
    assert_eq!(b_actor.nonce, 0);
    assert_eq!(
        vm.state_tree().get_actor(&miner).unwrap().unwrap().balance,
        TokenAmount::zero()
    );
}

#[test]
fn insufficient_funds() {
    let a = Address::new_secp256k1([1u8; 20]);
    let b = Address::new_secp256k1([2u8; 20]);
    let miner = Address::new_id(100);
    let mut vm = build_vm(&[(a, 10)], miner);

    let msg = message(a, b, 30, 0, 0, 10, 1, vec![]);
    let err = vm.apply_message(&msg).unwrap_err();
    assert!(matches!(err, VmError::InsufficientFunds(addr) if addr == a));
    assert_eq!(vm.state_tree().get_actor(&a).unwrap().unwrap().nonce, 0);
}

#[test]
fn bad_nonce() {
    let a = Address::new_secp256k1([1u8; 20]);
    let b = Address::new_secp256k1([2u8; 20]);
    let miner = Address::new_id(100);
    let mut vm = build_vm(&[(a, 100)], miner);

    let msg = message(a, b, 1, 4, 0, 10, 1, vec![]);
    let err = vm.apply_message(&msg).unwrap_err();
    assert!(matches!(err, VmError::BadNonce { expected: 0, got: 4 }));
}

#[test]
fn reverting_call_charges_gas_only() {
    let a = Address::new_secp256k1([1u8; 20]);
    let b = Address::new_secp256k1([2u8; 20]);
    let miner = Address::new_id(100);
    let mut vm = build_vm(&[(a, 100), (b, 0)], miner);

    // exit=7, gas_used=3
    let msg = message(a, b, 5, 0, 1, 10, 2, vec![7, 3]);
    let receipt = vm.apply_message(&msg).unwrap();

    assert_eq!(receipt.exit_code, ExitCode(7));
    assert_eq!(receipt.gas_used, 3);

    let a_actor = vm.state_tree().get_actor(&a).unwrap().unwrap();
    // Net debit is gas-only: 3 * 2 = 6. Value never moved; nonce still bumps.
    assert_eq!(a_actor.balance, TokenAmount::from_atto(94));
    assert_eq!(a_actor.nonce, 1);

    let b_actor = vm.state_tree().get_actor(&b).unwrap().unwrap();
    assert_eq!(b_actor.balance, TokenAmount::zero());

    let miner_actor = vm.state_tree().get_actor(&miner).unwrap().unwrap();
    assert_eq!(miner_actor.balance, TokenAmount::from_atto(6));
}

#[test]
fn successful_call_with_refund() {
    let a = Address::new_secp256k1([1u8; 20]);
    let b = Address::new_secp256k1([2u8; 20]);
    let miner = Address::new_id(100);
    let mut vm = build_vm(&[(a, 100), (b, 0)], miner);

    // exit=0, gas_used=4, gas_limit=10, gas_price=2, value=5
    let msg = message(a, b, 5, 0, 1, 10, 2, vec![0, 4]);
    let receipt = vm.apply_message(&msg).unwrap();

    assert!(receipt.exit_code.is_success());
    assert_eq!(receipt.gas_used, 4);

    let a_actor = vm.state_tree().get_actor(&a).unwrap().unwrap();
    // value(5) + gas_used(4)*price(2) = 13 net debit.
    assert_eq!(a_actor.balance, TokenAmount::from_atto(87));

    let b_actor = vm.state_tree().get_actor(&b).unwrap().unwrap();
    assert_eq!(b_actor.balance, TokenAmount::from_atto(5));

    let miner_actor = vm.state_tree().get_actor(&miner).unwrap().unwrap();
    assert_eq!(miner_actor.balance, TokenAmount::from_atto(8));
}

#[test]
fn implicit_account_creation() {
    let a = Address::new_secp256k1([1u8; 20]);
    let b = Address::new_secp256k1([9u8; 20]);
    let miner = Address::new_id(100);
    let mut vm = build_vm(&[(a, 100)], miner);

    assert!(vm.state_tree().get_actor(&b).unwrap().is_none());

    let msg = message(a, b, 30, 0, 0, 10, 1, vec![]);
    vm.apply_message(&msg).unwrap();

    let b_actor = vm.state_tree().get_actor(&b).unwrap().unwrap();
    assert_eq!(b_actor.balance, TokenAmount::from_atto(30));
    assert_eq!(b_actor.code_id, *statevm::account_actor_code_id());
}

#[test]
fn self_send_credits_on_top_of_debit() {
    let a = Address::new_secp256k1([1u8; 20]);
    let miner = Address::new_id(100);
    let mut vm = build_vm(&[(a, 100)], miner);

    // from == to: total_cost(40) is debited, then value(30) is credited back
    // to the same actor on top of the post-debit balance, not the pre-debit
    // snapshot taken at step 6.
    let msg = message(a, a, 30, 0, 0, 10, 1, vec![]);
    let receipt = vm.apply_message(&msg).unwrap();

    assert!(receipt.exit_code.is_success());
    let a_actor = vm.state_tree().get_actor(&a).unwrap().unwrap();
    assert_eq!(a_actor.balance, TokenAmount::from_atto(90));
    assert_eq!(a_actor.nonce, 1);
}

#[test]
fn send_to_missing_recipient_fails_even_for_method_zero() {
    let a = Address::new_secp256k1([1u8; 20]);
    let missing = Address::new_secp256k1([9u8; 20]);
    let miner = Address::new_id(100);
    let vm = build_vm(&[(a, 100)], miner);

    let caller = vm.state_tree().get_actor(&a).unwrap().unwrap();
    let storage = statevm::StorageHandle::new(vm.store(), caller.head);
    let msg = message(a, a, 0, 0, 1, 10, 1, vec![]);
    let ctx = statevm::InvocationContext::new(&vm, msg, caller.code_id, storage);

    let err = ctx
        .send(missing, 0, TokenAmount::zero(), vec![])
        .unwrap_err();
    assert!(matches!(err, VmError::RecipientMissing(addr) if addr == missing));
}

#[test]
fn flush_is_idempotent_end_to_end() {
    let a = Address::new_secp256k1([1u8; 20]);
    let b = Address::new_secp256k1([2u8; 20]);
    let miner = Address::new_id(100);
    let mut vm = build_vm(&[(a, 100)], miner);

    let msg = message(a, b, 30, 0, 0, 10, 1, vec![]);
    vm.apply_message(&msg).unwrap();

    let root1 = vm.flush().unwrap();
    let root2 = vm.flush().unwrap();
    assert_eq!(root1, root2);
}

/// Property: applying a pure-transfer message conserves the total of sender
/// and recipient balances, modulo what's burned on unspent `gas_limit` and
/// what's credited to the miner (§8 property 2); nonce advances by exactly
/// one (§8 property 3).
#[quickcheck_macros::quickcheck]
fn conservation_and_nonce_monotonicity_over_transfer_sequences(amounts: Vec<u8>) -> bool {
    let a = Address::new_secp256k1([3u8; 20]);
    let b = Address::new_secp256k1([4u8; 20]);
    let miner = Address::new_id(100);
    let mut vm = build_vm(&[(a, 10_000), (b, 0)], miner);

    let mut expected_nonce = 0u64;
    for (i, amt) in amounts.iter().take(20).enumerate() {
        let before_total = vm.state_tree().get_actor(&a).unwrap().unwrap().balance
            + vm.state_tree().get_actor(&b).unwrap().unwrap().balance
            + vm.state_tree().get_actor(&miner).unwrap().unwrap().balance;

        // method=0 is never dispatched, so gas_used is always 0 and the
        // full gas_limit*gas_price is debited from the sender without a
        // matching miner credit (§8 scenario 1): every successful
        // message burns exactly gas_limit*gas_price from the ledger.
        let gas_limit = 5i64;
        let gas_price = 1i64;
        let msg = message(a, b, *amt as i64, i as u64, 0, gas_limit, gas_price, vec![]);
        let result = vm.apply_message(&msg);

        let a_actor = vm.state_tree().get_actor(&a).unwrap().unwrap();
        match result {
            Ok(_) => {
                expected_nonce += 1;
                if a_actor.nonce != expected_nonce {
                    return false;
                }
            }
            Err(_) => {
                // Hard failure: this implementation only emits hard
                // errors before any nonce mutation, so nonce is unchanged.
                if a_actor.nonce != expected_nonce {
                    return false;
                }
                continue;
            }
        }

        let after_total = vm.state_tree().get_actor(&a).unwrap().unwrap().balance
            + vm.state_tree().get_actor(&b).unwrap().unwrap().balance
            + vm.state_tree().get_actor(&miner).unwrap().unwrap().balance;
        let burned = TokenAmount::from_atto(gas_limit * gas_price);
        if before_total != after_total + burned {
            return false;
        }
    }
    true
}
