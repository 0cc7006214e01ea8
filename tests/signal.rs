//! Cross-process tests for the signal-notified mailbox
//!
//! Both halves of the exchange run in forked, single-threaded child
//! processes: the notification signal is delivered process-wide, so the
//! multithreaded test harness itself must never be a peer.

mod support;

use msgport::{Message, SignalTransport, Transport};
use nix::unistd::Pid;
use std::time::Duration;

const THRESHOLD: u32 = 10;

/// Attach with retries: initialize fails cleanly until the owner has
/// created the region, and one side has to start first
fn attach_with_retry(name: &str) -> anyhow::Result<SignalTransport> {
    for _ in 0..200 {
        let mut transport = SignalTransport::new();
        if transport.initialize(name, false).is_ok() {
            return Ok(transport);
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    anyhow::bail!("owner never created the region '{name}'");
}

#[test]
fn handshake_then_ping_pong() {
    let name = support::unique_name("sig_pp");

    let owner_name = name.clone();
    let owner_pid = support::spawn_child(move || {
        let mut owner = SignalTransport::new();
        owner.initialize(&owner_name, true)?;

        // Identity handshake: the peer's first message carries its pid in
        // the counter; reply with our own pid the same way
        let hello = owner.receive_message()?;
        owner.set_peer(Pid::from_raw(hello.counter as i32));
        owner.send_message(&Message::with_counter(std::process::id()))?;

        loop {
            let msg = owner.receive_message()?;
            if msg.counter >= THRESHOLD {
                anyhow::ensure!(msg.finished, "final message must carry finished");
                break;
            }
            let mut reply = Message::with_counter(msg.counter + 1);
            reply.finished = reply.counter >= THRESHOLD;
            reply.set_payload(format!("owner {}", reply.counter).as_bytes())?;
            owner.send_message(&reply)?;
            if reply.counter >= THRESHOLD {
                break;
            }
        }
        owner.cleanup();
        Ok(())
    });

    let peer_name = name.clone();
    let expected_owner = owner_pid;
    let peer = support::spawn_child(move || {
        let mut peer = attach_with_retry(&peer_name)?;
        peer.set_peer(expected_owner);

        // Open the handshake, then verify the owner's reply carries the
        // pid we already know
        peer.send_message(&Message::with_counter(std::process::id()))?;
        let ack = peer.receive_message()?;
        anyhow::ensure!(
            ack.counter as i32 == expected_owner.as_raw(),
            "handshake returned pid {}, expected {}",
            ack.counter,
            expected_owner
        );

        // Steady state: the peer opens with counter zero
        let mut received = 0u32;
        peer.send_message(&Message::with_counter(0))?;
        loop {
            let msg = peer.receive_message()?;
            anyhow::ensure!(msg.counter == received * 2 + 1, "out of order: {}", msg.counter);
            anyhow::ensure!(
                msg.payload_text() == format!("owner {}", msg.counter),
                "payload mismatch: {}",
                msg.payload_text()
            );
            received += 1;
            if msg.counter >= THRESHOLD {
                break;
            }
            let mut reply = Message::with_counter(msg.counter + 1);
            reply.finished = reply.counter >= THRESHOLD;
            peer.send_message(&reply)?;
            if reply.counter >= THRESHOLD {
                break;
            }
        }
        peer.cleanup();
        Ok(())
    });

    support::expect_success(owner_pid);
    support::expect_success(peer);
}

#[test]
fn cleanup_with_pending_notification_exits_cleanly() {
    let name = support::unique_name("sig_drain");

    let child_name = name.clone();
    let child = support::spawn_child(move || {
        let mut owner = SignalTransport::new();
        owner.initialize(&child_name, true)?;

        // A notification nobody waits for stays pending on the blocked
        // set; cleanup must consume it rather than let it terminate us
        nix::sys::signal::kill(nix::unistd::getpid(), nix::sys::signal::Signal::SIGUSR1)?;
        owner.cleanup();
        Ok(())
    });

    support::expect_success(child);
}

#[test]
fn round_trip_preserves_every_field() {
    let name = support::unique_name("sig_rt");

    let owner_name = name.clone();
    let owner_pid = support::spawn_child(move || {
        let mut owner = SignalTransport::new();
        owner.initialize(&owner_name, true)?;

        let hello = owner.receive_message()?;
        owner.set_peer(Pid::from_raw(hello.counter as i32));
        owner.send_message(&Message::with_counter(std::process::id()))?;

        let msg = owner.receive_message()?;
        anyhow::ensure!(msg.counter == 7777, "counter was {}", msg.counter);
        anyhow::ensure!(msg.finished, "finished flag lost");
        anyhow::ensure!(msg.payload_text() == "full fidelity", "payload lost");
        // Echo it straight back
        owner.send_message(&msg)?;
        owner.cleanup();
        Ok(())
    });

    let peer_name = name.clone();
    let peer = support::spawn_child(move || {
        let mut peer = attach_with_retry(&peer_name)?;
        peer.set_peer(owner_pid);
        peer.send_message(&Message::with_counter(std::process::id()))?;
        let _ack = peer.receive_message()?;

        let mut sent = Message::with_counter(7777);
        sent.finished = true;
        sent.set_payload(b"full fidelity")?;
        peer.send_message(&sent)?;

        let echoed = peer.receive_message()?;
        anyhow::ensure!(echoed == sent, "echoed message differs");
        peer.cleanup();
        Ok(())
    });

    support::expect_success(owner_pid);
    support::expect_success(peer);
}
