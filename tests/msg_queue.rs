//! Cross-process tests for the POSIX message queue pair transport

mod support;

use msgport::{Message, MsgQueueTransport, Transport};

const THRESHOLD: u32 = 10;

#[test]
fn ping_pong_across_processes() {
    let name = support::unique_name("mq_pp");

    // Queue creation does not block, so the creator can set up both
    // queues before the peer exists
    let mut creator = MsgQueueTransport::new();
    creator.initialize(&name, true).unwrap();

    let child_name = name.clone();
    let child = support::spawn_child(move || {
        let mut peer = MsgQueueTransport::new();
        peer.initialize(&child_name, false)?;

        let mut received = 0u32;
        loop {
            let msg = peer.receive_message()?;
            anyhow::ensure!(msg.counter == received * 2, "out of order: {}", msg.counter);
            received += 1;
            if msg.counter >= THRESHOLD {
                anyhow::ensure!(msg.finished, "final message must carry finished");
                break;
            }
            let mut reply = Message::with_counter(msg.counter + 1);
            reply.set_payload(format!("child {}", reply.counter).as_bytes())?;
            peer.send_message(&reply)?;
        }
        anyhow::ensure!(received == THRESHOLD / 2 + 1, "received {received} messages");
        peer.cleanup();
        Ok(())
    });

    let mut first = Message::with_counter(0);
    first.set_payload(b"parent 0").unwrap();
    creator.send_message(&first).unwrap();

    let mut received = 0u32;
    loop {
        let msg = creator.receive_message().unwrap();
        received += 1;
        assert_eq!(msg.counter, received * 2 - 1);
        assert_eq!(msg.payload_text(), format!("child {}", msg.counter));

        let next = msg.counter + 1;
        let mut reply = Message::with_counter(next);
        reply.finished = next >= THRESHOLD;
        reply.set_payload(format!("parent {next}").as_bytes()).unwrap();
        creator.send_message(&reply).unwrap();
        if next >= THRESHOLD {
            break;
        }
    }
    assert_eq!(received, THRESHOLD / 2);

    support::expect_success(child);
    creator.cleanup();
}

#[test]
fn peer_cleanup_leaves_queues_creator_cleanup_removes_them() {
    let name = support::unique_name("mq_own");

    let mut creator = MsgQueueTransport::new();
    creator.initialize(&name, true).unwrap();

    let mut peer = MsgQueueTransport::new();
    peer.initialize(&name, false).unwrap();
    peer.cleanup();

    // Still attachable after the non-creator released its descriptors
    let mut second_peer = MsgQueueTransport::new();
    second_peer.initialize(&name, false).unwrap();
    second_peer.cleanup();

    creator.cleanup();
    let mut late_peer = MsgQueueTransport::new();
    assert!(late_peer.initialize(&name, false).is_err());
}
