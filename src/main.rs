//! Ping-pong demo for every transport mechanism
//!
//! Run the owner side first, then the peer, with the same base name:
//!
//! ```text
//! msgport pipe owner demo
//! msgport pipe peer demo
//! ```
//!
//! For the socket mechanism the name is a `host:port` address. For the
//! signal mechanism the owner must also pass the peer's pid once the peer
//! has printed it. Both sides count up from zero until the threshold is
//! reached.

use anyhow::{bail, Context, Result};
use msgport::{create_transport, Message, SignalTransport, Transport, TransportKind};
use nix::unistd::Pid;
use tracing::info;

const DEFAULT_THRESHOLD: u32 = 10;

/// Sending and receiving halves of a connection; the shared-memory
/// mailbox needs a directional pair of slots, every other mechanism is
/// bidirectional through one instance
struct Duplex {
    tx: Box<dyn Transport>,
    rx: Option<Box<dyn Transport>>,
}

impl Duplex {
    fn send(&mut self, msg: &Message) -> msgport::Result<()> {
        self.tx.send_message(msg)
    }

    fn receive(&mut self) -> msgport::Result<Message> {
        match &mut self.rx {
            Some(rx) => rx.receive_message(),
            None => self.tx.receive_message(),
        }
    }

    fn cleanup(&mut self) {
        self.tx.cleanup();
        if let Some(rx) = &mut self.rx {
            rx.cleanup();
        }
    }
}

fn connect(kind: TransportKind, name: &str, owner: bool) -> Result<Duplex> {
    if kind == TransportKind::SharedMemory {
        // One slot per direction so neither side can consume its own send
        let (tx_name, rx_name) = if owner {
            (format!("{name}_ab"), format!("{name}_ba"))
        } else {
            (format!("{name}_ba"), format!("{name}_ab"))
        };
        let mut tx = create_transport(kind);
        let mut rx = create_transport(kind);
        tx.initialize(&tx_name, owner)
            .with_context(|| format!("initialize mailbox {tx_name}"))?;
        rx.initialize(&rx_name, owner)
            .with_context(|| format!("initialize mailbox {rx_name}"))?;
        Ok(Duplex { tx, rx: Some(rx) })
    } else {
        let mut tx = create_transport(kind);
        tx.initialize(name, owner)
            .with_context(|| format!("initialize {kind} transport '{name}'"))?;
        Ok(Duplex { tx, rx: None })
    }
}

/// Exchange pids through the mailbox itself, each side's pid carried in
/// the counter of its first message
fn signal_handshake(
    transport: &mut SignalTransport,
    owner: bool,
    peer_pid: Option<Pid>,
) -> Result<()> {
    let own_pid = nix::unistd::getpid();
    if owner {
        let peer = peer_pid.context("signal owner needs the peer pid argument")?;
        transport.set_peer(peer);
        transport.send_message(&Message::with_counter(own_pid.as_raw() as u32))?;
        let reply = transport.receive_message()?;
        transport.set_peer(Pid::from_raw(reply.counter as i32));
    } else {
        info!(pid = own_pid.as_raw(), "peer pid, pass to the owner");
        let hello = transport.receive_message()?;
        transport.set_peer(Pid::from_raw(hello.counter as i32));
        transport.send_message(&Message::with_counter(own_pid.as_raw() as u32))?;
    }
    Ok(())
}

fn ping_pong(duplex: &mut Duplex, owner: bool, threshold: u32) -> Result<u32> {
    let mut rounds = 0;

    if owner {
        let mut first = Message::with_counter(0);
        first.set_payload(b"owner 0")?;
        duplex.send(&first)?;
        info!(counter = 0, "sent");
    }

    loop {
        let msg = duplex.receive()?;
        rounds += 1;
        info!(counter = msg.counter, finished = msg.finished, "received");
        if msg.counter >= threshold {
            break;
        }

        let mut reply = Message::with_counter(msg.counter + 1);
        reply.finished = reply.counter >= threshold;
        let side = if owner { "owner" } else { "peer" };
        reply.set_payload(format!("{side} {}", reply.counter).as_bytes())?;
        duplex.send(&reply)?;
        info!(counter = reply.counter, "sent");
        // The peer does not reply to the message that reached the threshold
        if reply.counter >= threshold {
            break;
        }
    }

    Ok(rounds)
}

fn usage() -> ! {
    eprintln!("usage: msgport <pipe|shm|signal|mq|socket> <owner|peer> <name> [threshold] [peer-pid]");
    eprintln!("       socket names are host:port addresses");
    std::process::exit(2);
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        usage();
    }

    let Some(kind) = TransportKind::from_name(&args[0]) else {
        bail!("unrecognized mechanism '{}'", args[0]);
    };
    let owner = match args[1].as_str() {
        "owner" => true,
        "peer" => false,
        _ => usage(),
    };
    let name = &args[2];
    let threshold: u32 = match args.get(3) {
        Some(raw) => raw.parse().context("threshold must be a number")?,
        None => DEFAULT_THRESHOLD,
    };
    let peer_pid = args
        .get(4)
        .map(|raw| raw.parse::<i32>().map(Pid::from_raw))
        .transpose()
        .context("peer-pid must be a number")?;

    let rounds = if kind == TransportKind::Signal {
        let mut transport = SignalTransport::new();
        transport
            .initialize(name, owner)
            .context("initialize signal mailbox")?;
        signal_handshake(&mut transport, owner, peer_pid)?;
        let mut duplex = Duplex {
            tx: Box::new(transport),
            rx: None,
        };
        let rounds = ping_pong(&mut duplex, owner, threshold)?;
        duplex.cleanup();
        rounds
    } else {
        let mut duplex = connect(kind, name, owner)?;
        let rounds = ping_pong(&mut duplex, owner, threshold)?;
        duplex.cleanup();
        rounds
    };

    info!(mechanism = %kind, rounds, "exchange complete");
    Ok(())
}
