//! VM bridge integration tests.
//!
//! Covers the full deploy/execute reconciliation surface through the node
//! router - Keep applies exactly once, Discard applies nothing, transport
//! failure halts - plus a wire round-trip against a miniature VM server on
//! a real socket.

use std::net::TcpListener;
use std::time::Duration;

use dexnode::node::Msg;
use dexnode::types::{Address, Event};
use dexnode::vm::client::VmError;
use dexnode::vm::types::{
    ArgKind, ExecStatus, ScriptArg, VmRequest, VmResponse, WriteOp, WriteSetEntry,
};
use dexnode::vm::{AccessPath, DvmClient, StubVm, VmClient};
use dexnode::{Error, MemStore, Node, StoreBank, TxResponse, VmConfig};

const SIGNER: Address = Address([0x51; 20]);

type TestNode = Node<MemStore, StoreBank, StubVm>;

fn test_node() -> TestNode {
    let mut node = Node::new(MemStore::new(), StoreBank::new(), StubVm::new());
    node.begin_block(1, 1_000);
    node
}

fn entry(path: &[u8], op: WriteOp) -> WriteSetEntry {
    WriteSetEntry {
        access_path: AccessPath::new(SIGNER, path.to_vec()),
        op,
    }
}

#[test]
fn deploy_then_execute_flow() {
    let mut node = test_node();

    // The deploy publishes a module resource...
    node.vm_client().push_response(VmResponse::keep(
        10,
        vec![entry(b"modules/math", WriteOp::Value(vec![0x01]))],
        vec![Event::new("module_published").attr("name", "math")],
    ));
    // ...and the script updates a counter resource twice over.
    node.vm_client().push_response(VmResponse::keep(
        21,
        vec![
            entry(b"counters/hits", WriteOp::Value(vec![0x02])),
            entry(b"counters/hits", WriteOp::Value(vec![0x03])),
        ],
        vec![Event::new("script_done").attr("result", 3)],
    ));

    let outcome = node
        .deliver_tx(Msg::DeployModule {
            signer: SIGNER,
            code: vec![0xCA, 0xFE],
        })
        .unwrap();
    assert_eq!(outcome.events[0].kind, "module_published");

    let outcome = node
        .deliver_tx(Msg::ExecuteScript {
            signer: SIGNER,
            code: vec![0xBE, 0xEF],
            args: vec![ScriptArg::u64(1), ScriptArg::u64(2)],
        })
        .unwrap();

    match outcome.response {
        TxResponse::Vm(vm) => {
            assert_eq!(vm.status, ExecStatus::Keep);
            assert_eq!(vm.gas_used, 21);
        }
        other => panic!("expected Vm response, got {:?}", other),
    }

    // Later writes to the same path win; both resources persisted.
    assert_eq!(
        node.vm_value(&AccessPath::new(SIGNER, b"modules/math".to_vec())),
        Some(vec![0x01])
    );
    assert_eq!(
        node.vm_value(&AccessPath::new(SIGNER, b"counters/hits".to_vec())),
        Some(vec![0x03])
    );
}

#[test]
fn keep_with_failing_assertion_still_applies() {
    // A script that fails a deterministic in-VM assertion is still Keep:
    // its failure event is part of consensus state.
    let mut node = test_node();
    node.vm_client().push_response(VmResponse::keep(
        5,
        vec![],
        vec![Event::new("contract_status")
            .attr("status", "error")
            .attr("sub_status", 122)],
    ));

    let outcome = node
        .deliver_tx(Msg::ExecuteScript {
            signer: SIGNER,
            code: vec![1],
            args: vec![],
        })
        .unwrap();

    assert_eq!(outcome.events.len(), 1);
    assert_eq!(outcome.events[0].get("sub_status"), Some("122"));
}

#[test]
fn discard_applies_zero_writes_and_zero_events() {
    let mut node = test_node();
    let root_before = node.state_root();

    node.vm_client()
        .push_response(VmResponse::discard("malformed bytecode"));

    let outcome = node
        .deliver_tx(Msg::DeployModule {
            signer: SIGNER,
            code: vec![0xBA, 0xD0],
        })
        .unwrap();

    match outcome.response {
        TxResponse::Vm(vm) => {
            assert_eq!(vm.status, ExecStatus::Discard);
            assert_eq!(vm.message.as_deref(), Some("malformed bytecode"));
        }
        other => panic!("expected Vm response, got {:?}", other),
    }
    assert!(outcome.events.is_empty());
    assert_eq!(node.state_root(), root_before);
}

#[test]
fn validation_rejects_before_any_rpc() {
    let mut node = test_node();

    assert_eq!(
        node.deliver_tx(Msg::DeployModule {
            signer: SIGNER,
            code: vec![],
        })
        .unwrap_err(),
        Error::EmptyContract
    );

    assert!(matches!(
        node.deliver_tx(Msg::DeployModule {
            signer: Address::default(),
            code: vec![1],
        })
        .unwrap_err(),
        Error::InvalidAddress(_)
    ));

    assert_eq!(
        node.deliver_tx(Msg::ExecuteScript {
            signer: SIGNER,
            code: vec![1],
            args: vec![ScriptArg::new(ArgKind::U64, vec![])],
        })
        .unwrap_err(),
        Error::WrongArgValue(0)
    );

    // Unknown argument tags never reach a message at all.
    assert!(matches!(
        ScriptArg::from_tag(42, vec![1]).unwrap_err(),
        Error::WrongArgType(_)
    ));

    // None of the rejections contacted the VM.
    assert_eq!(node.vm_client().call_count(), 0);
}

#[test]
#[should_panic(expected = "consensus failure")]
fn exhausted_retries_halt_the_node() {
    let mut node = test_node();
    node.vm_client().push_failure(VmError::Unavailable {
        attempts: 5,
        last: "connection reset by peer".to_string(),
    });

    let _ = node.deliver_tx(Msg::ExecuteScript {
        signer: SIGNER,
        code: vec![1],
        args: vec![],
    });
}

#[test]
fn halted_transaction_commits_nothing() {
    // Same scenario as the halt test, but at the keeper level so the
    // store can be inspected after the failure.
    let stub = StubVm::unreachable();
    let keeper = dexnode::vm::VmKeeper::new(stub);
    let mut store = MemStore::new();
    let mut events = Vec::new();
    let root_before = dexnode::store::state_root(&store);

    let err = keeper
        .execute_script(&mut store, &mut events, SIGNER, vec![1], vec![])
        .unwrap_err();

    assert!(err.is_fatal());
    assert_eq!(dexnode::store::state_root(&store), root_before);
    assert!(events.is_empty());
}

// ============================================================================
// Wire round-trip
// ============================================================================

/// Miniature VM server: answers `connections` requests then exits.
fn spawn_mini_vm(
    listener: TcpListener,
    connections: usize,
    respond: impl Fn(VmRequest) -> VmResponse + Send + 'static,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for _ in 0..connections {
            let (mut socket, _) = listener.accept().unwrap();
            let request_bytes = dexnode::vm::client::read_frame(&mut socket).unwrap();
            let request: VmRequest = serde_json::from_slice(&request_bytes).unwrap();
            let response = respond(request);
            dexnode::vm::client::write_frame(
                &mut socket,
                &serde_json::to_vec(&response).unwrap(),
            )
            .unwrap();
        }
    })
}

#[test]
fn dvm_client_round_trip_against_socket_server() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = format!("tcp://{}", listener.local_addr().unwrap());

    let server = spawn_mini_vm(listener, 1, |request| {
        assert_eq!(request.signer, SIGNER);
        VmResponse::keep(
            3,
            vec![WriteSetEntry {
                access_path: AccessPath::new(request.signer, b"pong".to_vec()),
                op: WriteOp::Value(request.code.clone()),
            }],
            vec![],
        )
    });

    let client = DvmClient::new(VmConfig {
        address,
        max_attempts: 2,
        request_timeout: Duration::from_millis(500),
        retry_delay: Duration::from_millis(1),
    });

    let response = client
        .execute(&VmRequest::publish_module(SIGNER, vec![9, 9, 9]))
        .unwrap();

    assert_eq!(response.status, ExecStatus::Keep);
    assert_eq!(response.write_set.len(), 1);
    assert_eq!(response.write_set[0].op, WriteOp::Value(vec![9, 9, 9]));
    server.join().unwrap();
}
