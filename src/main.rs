//! dexnode - demo entry point.
//!
//! Walks one end-to-end flow over in-memory infrastructure and the
//! in-process VM stub: register currencies, open a market, trade, expire,
//! and run a contract through the bridge. Point `DN_VM_ADDRESS` at a real
//! VM process and swap the stub for `DvmClient` to run against the wire.

use dexnode::node::Msg;
use dexnode::types::numeric::from_units_trimmed;
use dexnode::types::{Address, CurrencyParams, Direction, Event};
use dexnode::vm::types::{VmResponse, WriteOp, WriteSetEntry};
use dexnode::vm::{AccessPath, StubVm};
use dexnode::{MemStore, Node, StoreBank, VmConfig};

const PRICE: u128 = 1_000_000_000_000_000_000; // 1.0 dfi per whole btc
const ONE_BTC: u128 = 100_000_000;

fn main() {
    env_logger::init();

    let vm_config = VmConfig::from_env_or_default();
    println!("dexnode demo (VM configured at {})", vm_config.address);
    println!();

    let mut node = Node::new(MemStore::new(), StoreBank::new(), StubVm::new());
    let alice = Address::from_tag(0xA1);
    let bob = Address::from_tag(0xB0);

    // --- Block 1: registries and funding ---------------------------------
    node.begin_block(1, 1_000);

    node.deliver_tx(Msg::CreateCurrency {
        denom: "btc".to_string(),
        params: CurrencyParams::new(8, vec![0x01], vec![0x02]),
    })
    .expect("create btc");
    node.deliver_tx(Msg::CreateCurrency {
        denom: "dfi".to_string(),
        params: CurrencyParams::new(18, vec![0x03], vec![0x04]),
    })
    .expect("create dfi");
    node.deliver_tx(Msg::CreateMarket {
        base_denom: "btc".to_string(),
        quote_denom: "dfi".to_string(),
    })
    .expect("create market");
    node.deliver_tx(Msg::IssueCurrency {
        denom: "dfi".to_string(),
        amount: 100 * PRICE,
        payee: alice,
    })
    .expect("fund alice");
    node.deliver_tx(Msg::IssueCurrency {
        denom: "btc".to_string(),
        amount: 100 * ONE_BTC,
        payee: bob,
    })
    .expect("fund bob");

    let (receipt, _) = node.end_block().expect("end block 1");
    println!("block 1: {} txs, root {}", receipt.txs_processed, receipt.state_root_hex());

    // --- Block 2: trade --------------------------------------------------
    node.begin_block(2, 1_010);

    node.deliver_tx(Msg::PlaceOrder {
        owner: bob,
        market_id: 0,
        direction: Direction::Ask,
        price: PRICE,
        quantity: ONE_BTC,
        ttl_secs: 3_600,
    })
    .expect("bob asks");

    let outcome = node
        .deliver_tx(Msg::PlaceOrder {
            owner: alice,
            market_id: 0,
            direction: Direction::Bid,
            price: PRICE,
            quantity: ONE_BTC / 2,
            ttl_secs: 3_600,
        })
        .expect("alice bids");

    for event in &outcome.events {
        print_event(event);
    }

    let (receipt, _) = node.end_block().expect("end block 2");
    println!(
        "block 2: {} fills, root {}",
        receipt.fills_executed,
        receipt.state_root_hex()
    );
    println!(
        "alice holds {} btc, bob holds {} dfi",
        from_units_trimmed(node.balance_of(&alice, "btc"), 8),
        from_units_trimmed(node.balance_of(&bob, "dfi"), 18),
    );

    // --- Block 3: a contract through the VM bridge -----------------------
    node.begin_block(3, 1_020);

    let module_path = AccessPath::new(alice, b"demo/module".to_vec());
    node.vm_client().push_response(VmResponse::keep(
        21,
        vec![WriteSetEntry {
            access_path: module_path.clone(),
            op: WriteOp::Value(vec![0xCA, 0xFE]),
        }],
        vec![Event::new("module_published").attr("by", alice)],
    ));

    node.deliver_tx(Msg::DeployModule {
        signer: alice,
        code: vec![0xCA, 0xFE, 0xBA, 0xBE],
    })
    .expect("deploy module");

    let (receipt, _) = node.end_block().expect("end block 3");
    println!(
        "block 3: module resource present = {}, root {}",
        node.vm_value(&module_path).is_some(),
        receipt.state_root_hex()
    );
}

fn print_event(event: &Event) {
    let attrs: Vec<String> = event
        .attributes
        .iter()
        .map(|a| format!("{}={}", a.key, a.value))
        .collect();
    println!("  event {} [{}]", event.kind, attrs.join(", "));
}
