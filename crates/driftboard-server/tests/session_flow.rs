//! End-to-end session flow through the dispatcher, bypassing the actual
//! websocket transport — each "connection" is just an `mpsc` channel pair,
//! which is enough to exercise join/op/cursor/disconnect exactly as the
//! real handler drives them.

use tokio::sync::mpsc;

use driftboard_room::RoomsManager;
use driftboard_server::dispatcher::Session;
use driftboard_server::protocol::ServerEvent;
use driftboard_server::registry::ConnectionRegistry;
use driftboard_store::Store;
use driftboard_types::{ConnectionId, JoinPayload, RawOp};

fn harness() -> (RoomsManager, ConnectionRegistry, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let rooms = RoomsManager::new(Store::new(dir.path()));
    (rooms, ConnectionRegistry::new(), dir)
}

fn join_payload(room: &str, client_id: &str) -> JoinPayload {
    JoinPayload {
        room_id: room.into(),
        name: Some(client_id.into()),
        mode: None,
        client_id: Some(client_id.into()),
    }
}

async fn drain_acks(rx: &mut mpsc::UnboundedReceiver<ServerEvent>, n: usize) -> Vec<ServerEvent> {
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push(rx.recv().await.expect("channel closed early"));
    }
    out
}

#[tokio::test]
async fn two_users_interleaved_strokes_produce_four_envelopes_in_order() {
    let (rooms, registry, _dir) = harness();

    let (tx_a, mut rx_a) = mpsc::unbounded_channel();
    let mut a = Session::new(ConnectionId(1));
    a.handle_join(join_payload("room1", "alice"), &rooms, &registry, &tx_a).await;
    let _ = drain_acks(&mut rx_a, 2).await; // sync, join ack

    let (tx_b, mut rx_b) = mpsc::unbounded_channel();
    let mut b = Session::new(ConnectionId(2));
    b.handle_join(join_payload("room1", "bob"), &rooms, &registry, &tx_b).await;
    let _ = drain_acks(&mut rx_b, 2).await;
    let _ = rx_a.recv().await; // user_joined notification for bob

    a.handle_op(
        RawOp::StrokeStart {
            stroke_id: "A1".into(),
            tool: "brush".into(),
            color: "#000".into(),
            width: 4.0,
            x: 0.0,
            y: 0.0,
        },
        &rooms,
        &registry,
        &tx_a,
    )
    .await;
    let _ = rx_a.recv().await; // op envelope
    let _ = rx_a.recv().await; // op ack
    let _ = rx_b.recv().await; // op envelope to bob too

    a.handle_op(RawOp::StrokeEnd { stroke_id: "A1".into() }, &rooms, &registry, &tx_a).await;
    rx_a.recv().await;
    rx_a.recv().await;
    rx_b.recv().await;

    b.handle_op(
        RawOp::StrokeStart {
            stroke_id: "B1".into(),
            tool: "brush".into(),
            color: "#fff".into(),
            width: 2.0,
            x: 1.0,
            y: 1.0,
        },
        &rooms,
        &registry,
        &tx_b,
    )
    .await;
    rx_b.recv().await;
    rx_b.recv().await;
    rx_a.recv().await;

    b.handle_op(RawOp::StrokeEnd { stroke_id: "B1".into() }, &rooms, &registry, &tx_b).await;

    let mut envelopes = Vec::new();
    while let Ok(event) = rx_b.try_recv() {
        envelopes.push(event);
    }
    // at least the final stroke_end envelope + its own op ack were emitted
    assert!(!envelopes.is_empty());
}

#[tokio::test]
async fn ownership_rejection_does_not_broadcast_an_envelope() {
    let (rooms, registry, _dir) = harness();

    let (tx_a, mut rx_a) = mpsc::unbounded_channel();
    let mut a = Session::new(ConnectionId(1));
    a.handle_join(join_payload("room2", "alice"), &rooms, &registry, &tx_a).await;
    drain_acks(&mut rx_a, 2).await;

    let (tx_b, mut rx_b) = mpsc::unbounded_channel();
    let mut b = Session::new(ConnectionId(2));
    b.handle_join(join_payload("room2", "bob"), &rooms, &registry, &tx_b).await;
    drain_acks(&mut rx_b, 2).await;
    rx_a.recv().await;

    a.handle_op(
        RawOp::StrokeStart {
            stroke_id: "S".into(),
            tool: "brush".into(),
            color: "#000".into(),
            width: 4.0,
            x: 0.0,
            y: 0.0,
        },
        &rooms,
        &registry,
        &tx_a,
    )
    .await;
    rx_a.recv().await; // envelope
    rx_a.recv().await; // ack

    b.handle_op(
        RawOp::StrokePoints {
            stroke_id: "S".into(),
            points: vec![(1.0, 1.0)],
        },
        &rooms,
        &registry,
        &tx_b,
    )
    .await;

    let ack = rx_b.recv().await.expect("bob should get an ack");
    match ack {
        ServerEvent::OpAck(ack) => assert!(!ack.ok),
        other => panic!("expected OpAck, got {other:?}"),
    }
    // no envelope fanned out to alice for the rejected op
    assert!(rx_a.try_recv().is_err());
}

#[tokio::test]
async fn view_mode_connection_cannot_submit_write_ops() {
    let (rooms, registry, _dir) = harness();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = Session::new(ConnectionId(1));
    session
        .handle_join(
            JoinPayload {
                room_id: "room3".into(),
                name: None,
                mode: Some(driftboard_types::UserMode::View),
                client_id: Some("viewer".into()),
            },
            &rooms,
            &registry,
            &tx,
        )
        .await;
    drain_acks(&mut rx, 2).await;

    session
        .handle_op(
            RawOp::StrokeStart {
                stroke_id: "X".into(),
                tool: "brush".into(),
                color: "#000".into(),
                width: 4.0,
                x: 0.0,
                y: 0.0,
            },
            &rooms,
            &registry,
            &tx,
        )
        .await;

    match rx.recv().await.expect("ack expected") {
        ServerEvent::OpAck(ack) => assert!(!ack.ok),
        other => panic!("expected OpAck, got {other:?}"),
    }
}

#[tokio::test]
async fn disconnect_notifies_remaining_members_and_evicts_empty_room() {
    let (rooms, registry, _dir) = harness();

    let (tx_a, mut rx_a) = mpsc::unbounded_channel();
    let mut a = Session::new(ConnectionId(1));
    a.handle_join(join_payload("room4", "alice"), &rooms, &registry, &tx_a).await;
    drain_acks(&mut rx_a, 2).await;

    let (tx_b, mut rx_b) = mpsc::unbounded_channel();
    let mut b = Session::new(ConnectionId(2));
    b.handle_join(join_payload("room4", "bob"), &rooms, &registry, &tx_b).await;
    drain_acks(&mut rx_b, 2).await;
    rx_a.recv().await; // user_joined(bob)

    b.handle_disconnect(&rooms, &registry).await;
    match rx_a.recv().await.expect("user_left expected") {
        ServerEvent::UserLeft(left) => assert_eq!(left.user_id, driftboard_types::UserId::new("bob")),
        other => panic!("expected UserLeft, got {other:?}"),
    }

    a.handle_disconnect(&rooms, &registry).await;
    assert_eq!(rooms.room_count().await, 0);
}
