//! Fuzz target for ConnectionRegistry admission and eviction
//!
//! # Strategy
//!
//! - Admit: new client with an arbitrary peer port
//! - Evict: remove a live connection picked by index
//! - EvictStale: remove an id that was already removed
//! - Ready: mark an arbitrary subset of live ids readable and evict them all
//!
//! # Invariants
//!
//! - len() never exceeds capacity
//! - Admission fails if and only if the registry is full
//! - Every handle is closed exactly once (rejected, evicted or dropped)
//! - snapshot() lists exactly the live peers, in admission order

#![no_main]

use std::{cell::Cell, net::SocketAddr, rc::Rc};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rollcall_core::{ConnectionId, ConnectionRegistry, ReadySet};

#[derive(Debug, Clone, Arbitrary)]
struct Scenario {
    capacity: u8,
    ops: Vec<Op>,
}

#[derive(Debug, Clone, Arbitrary)]
enum Op {
    Admit { port: u16 },
    Evict { index: u8 },
    EvictStale { index: u8 },
    Ready { mask: u8 },
}

#[derive(Debug)]
struct Handle(Rc<Cell<u32>>);

impl Drop for Handle {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

fuzz_target!(|scenario: Scenario| {
    let capacity = (scenario.capacity % 8) as usize;
    let mut registry = ConnectionRegistry::with_capacity(capacity);
    let mut live: Vec<(ConnectionId, SocketAddr)> = Vec::new();
    let mut removed: Vec<ConnectionId> = Vec::new();
    let mut closes: Vec<Rc<Cell<u32>>> = Vec::new();

    for op in scenario.ops {
        match op {
            Op::Admit { port } => {
                let counter = Rc::new(Cell::new(0));
                closes.push(Rc::clone(&counter));
                let peer = SocketAddr::from(([127, 0, 0, 1], port));
                let was_full = !registry.has_capacity();

                match registry.try_admit(Handle(counter), peer) {
                    Ok(id) => {
                        assert!(!was_full, "admitted past capacity");
                        live.push((id, peer));
                    },
                    Err(rejected) => {
                        assert!(was_full, "rejected with free slots");
                        assert_eq!(rejected.capacity, capacity);
                    },
                }
            },
            Op::Evict { index } => {
                if !live.is_empty() {
                    let (id, peer) = live.remove(index as usize % live.len());
                    assert_eq!(registry.remove(id), Some(peer));
                    removed.push(id);
                }
            },
            Op::EvictStale { index } => {
                if !removed.is_empty() {
                    let id = removed[index as usize % removed.len()];
                    assert_eq!(registry.remove(id), None);
                }
            },
            Op::Ready { mask } => {
                let mut ready = ReadySet::new();
                for (bit, (id, _)) in live.iter().enumerate().take(8) {
                    if mask & (1 << bit) != 0 {
                        ready.mark_connection(*id);
                    }
                }

                let closed: Vec<ConnectionId> = registry.readable(&ready).map(|c| c.id()).collect();
                for id in &closed {
                    assert!(ready.contains(*id));
                    assert!(registry.remove(*id).is_some());
                    removed.push(*id);
                }
                live.retain(|(id, _)| !closed.contains(id));
            },
        }

        assert!(registry.len() <= capacity);
        let expected: Vec<SocketAddr> = live.iter().map(|(_, peer)| *peer).collect();
        assert_eq!(registry.snapshot(), expected);
    }

    drop(registry);
    for counter in &closes {
        assert_eq!(counter.get(), 1, "handle not closed exactly once");
    }
});
