#![allow(dead_code)]

//! Simulated bus for driving the engine on the host.
//!
//! Every peripheral action that would raise a byte-boundary interrupt on the
//! real chip sets `pending`; a scoped thread plays the interrupt controller
//! and calls the handlers while the test body blocks in the entry points.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use nixie_i2c_master::{
    handle_collision_interrupt, handle_event_interrupt, BusPeripheral, Engine, Master,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wire {
    Start,
    Restart,
    Stop,
    Abort,
    Address(u8, bool),
    Data(u8, bool),
    Read(u8),
    Ack,
    Nack,
    Pulse,
}

#[derive(Debug, Clone, Default)]
pub struct Peer {
    pub address: u8,
    pub nack_address: bool,
    /// Index of the data byte to refuse.
    pub reject_at: Option<usize>,
    pub respond: VecDeque<u8>,
    pub received: Vec<u8>,
    /// Queue every accepted byte for reading back.
    pub echo: bool,
}

impl Peer {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            ..Default::default()
        }
    }

    pub fn responding(address: u8, bytes: &[u8]) -> Self {
        Self {
            address,
            respond: bytes.iter().copied().collect(),
            ..Default::default()
        }
    }
}

#[derive(Default)]
struct Sim {
    peers: Vec<Peer>,
    selected: Option<usize>,
    expect_address: bool,
    acked: bool,
    rx: Option<u8>,
    in_progress: bool,
    wedge: u32,
    scl_taken: bool,
    collide_at: Option<usize>,
    transmitted: usize,
    log: Vec<Wire>,
}

pub struct SimBus {
    sim: Mutex<Sim>,
    pending: AtomicBool,
    collision: AtomicBool,
}

impl SimBus {
    pub fn new(peers: Vec<Peer>) -> Self {
        Self {
            sim: Mutex::new(Sim {
                peers,
                ..Default::default()
            }),
            pending: AtomicBool::new(false),
            collision: AtomicBool::new(false),
        }
    }

    /// SDA stays low until SCL has been pulsed `edges` times.
    pub fn wedge(&self, edges: u32) {
        self.sim.lock().unwrap().wedge = edges;
    }

    /// The peripheral keeps reporting a transaction in progress, as after a
    /// reset mid-transfer, while SDA stays high.
    pub fn leave_open(&self) {
        self.sim.lock().unwrap().in_progress = true;
    }

    /// Report a collision instead of completing the `n`-th transmitted byte
    /// (0-based, addresses included).
    pub fn collide_at(&self, n: usize) {
        self.sim.lock().unwrap().collide_at = Some(n);
    }

    pub fn log(&self) -> Vec<Wire> {
        self.sim.lock().unwrap().log.clone()
    }

    pub fn clear_log(&self) {
        self.sim.lock().unwrap().log.clear();
    }

    pub fn peer(&self, address: u8) -> Peer {
        let sim = self.sim.lock().unwrap();
        sim.peers
            .iter()
            .find(|peer| peer.address == address)
            .cloned()
            .expect("no such peer")
    }

    fn raise(&self) {
        self.pending.store(true, Ordering::SeqCst);
    }

    fn with<R>(&self, f: impl FnOnce(&mut Sim) -> R) -> R {
        f(&mut self.sim.lock().unwrap())
    }
}

impl BusPeripheral for SimBus {
    fn issue_start(&self) {
        self.with(|s| {
            s.in_progress = true;
            s.expect_address = true;
            s.rx = None;
            s.log.push(Wire::Start);
        });
        self.raise();
    }

    fn issue_restart(&self) {
        self.with(|s| {
            s.expect_address = true;
            s.log.push(Wire::Restart);
        });
        self.raise();
    }

    fn issue_stop(&self) {
        self.with(|s| {
            s.in_progress = false;
            s.selected = None;
            s.log.push(Wire::Stop);
        });
    }

    fn transmit(&self, byte: u8) {
        let collided = self.with(|s| {
            let index = s.transmitted;
            s.transmitted += 1;
            if s.collide_at == Some(index) {
                return true;
            }

            if s.expect_address {
                s.expect_address = false;
                s.selected = s.peers.iter().position(|p| p.address == byte >> 1);
                s.acked = match s.selected {
                    Some(i) => !s.peers[i].nack_address,
                    None => false,
                };
                s.log.push(Wire::Address(byte, s.acked));
            } else {
                s.acked = match s.selected {
                    Some(i) => {
                        let peer = &mut s.peers[i];
                        let accepted = peer.reject_at != Some(peer.received.len());
                        if accepted {
                            peer.received.push(byte);
                            if peer.echo {
                                peer.respond.push_back(byte);
                            }
                        }
                        accepted
                    }
                    None => false,
                };
                s.log.push(Wire::Data(byte, s.acked));
            }
            false
        });

        if collided {
            self.collision.store(true, Ordering::SeqCst);
        } else {
            self.raise();
        }
    }

    fn begin_receive(&self) {
        self.with(|s| {
            let byte = s
                .selected
                .and_then(|i| s.peers[i].respond.pop_front())
                .unwrap_or(0xFF);
            s.rx = Some(byte);
            s.log.push(Wire::Read(byte));
        });
        self.raise();
    }

    fn take_received(&self) -> Option<u8> {
        self.with(|s| s.rx.take())
    }

    fn send_ack(&self) {
        self.with(|s| s.log.push(Wire::Ack));
        self.raise();
    }

    fn send_nack(&self) {
        self.with(|s| s.log.push(Wire::Nack));
        self.raise();
    }

    fn acknowledged(&self) -> bool {
        self.with(|s| s.acked)
    }

    fn transaction_in_progress(&self) -> bool {
        self.with(|s| s.in_progress)
    }

    fn abort(&self) {
        self.with(|s| {
            s.in_progress = false;
            s.selected = None;
            s.rx = None;
            s.log.push(Wire::Abort);
        });
    }

    fn sda_is_high(&self) -> bool {
        self.with(|s| s.wedge == 0)
    }

    fn take_scl(&self) {
        self.with(|s| s.scl_taken = true);
    }

    fn set_scl(&self, high: bool) {
        self.with(|s| {
            if high && s.scl_taken {
                s.wedge = s.wedge.saturating_sub(1);
                s.log.push(Wire::Pulse);
            }
        });
    }

    fn restore_scl(&self) {
        self.with(|s| s.scl_taken = false);
    }

    fn half_bit_delay(&self) {}
}

struct Done<'a>(&'a AtomicBool);

impl Drop for Done<'_> {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Runs `f` with the engine's master handle while a helper thread services
/// the simulated interrupts.
pub fn with_master<R>(engine: &Engine<SimBus>, f: impl FnOnce(&mut Master<'_, SimBus>) -> R) -> R {
    let done = AtomicBool::new(false);

    std::thread::scope(|scope| {
        scope.spawn(|| {
            while !done.load(Ordering::SeqCst) {
                let bus = engine.bus();
                if bus.collision.swap(false, Ordering::SeqCst) {
                    handle_collision_interrupt(engine);
                } else if bus.pending.swap(false, Ordering::SeqCst) {
                    handle_event_interrupt(engine);
                } else {
                    std::thread::yield_now();
                }
            }
        });

        // Stops the interrupt thread even when `f` panics.
        let _done = Done(&done);
        let mut master = engine.take_master().expect("master already taken");
        f(&mut master)
    })
}
