use atomic::{Atomic, Ordering};

#[cfg(feature = "dump")]
use core::cell::RefCell;
#[cfg(feature = "dump")]
use critical_section::Mutex;
#[cfg(feature = "dump")]
use heapless::Deque;

use crate::Action;

/// Single-character tags recorded in the trace ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TraceEvent {
    Start,
    Restart,
    Stop,
    AddressWritten,
    ByteWritten,
    ByteRead,
    AckSent,
    NackSent,
    Error,
    Recovery,
}

impl TraceEvent {
    pub fn code(self) -> char {
        match self {
            TraceEvent::Start => 'S',
            TraceEvent::Restart => 'r',
            TraceEvent::Stop => 'P',
            TraceEvent::AddressWritten => 'A',
            TraceEvent::ByteWritten => 'W',
            TraceEvent::ByteRead => 'R',
            TraceEvent::AckSent => 'k',
            TraceEvent::NackSent => 'n',
            TraceEvent::Error => 'E',
            TraceEvent::Recovery => 'C',
        }
    }

    pub(crate) fn for_action(action: Action) -> Option<Self> {
        match action {
            Action::Ignore | Action::BeginReceive => None,
            Action::Address(_) => Some(TraceEvent::AddressWritten),
            Action::Transmit(_) => Some(TraceEvent::ByteWritten),
            Action::Restart => Some(TraceEvent::Restart),
            Action::Stop => Some(TraceEvent::Stop),
            Action::Ack => Some(TraceEvent::AckSent),
            Action::Nack => Some(TraceEvent::NackSent),
            Action::Abort => Some(TraceEvent::Error),
        }
    }
}

pub struct Counters {
    errors: Atomic<u32>,
    recoveries: Atomic<u32>,
}

impl Counters {
    pub const fn new() -> Self {
        Self {
            errors: Atomic::new(0),
            recoveries: Atomic::new(0),
        }
    }

    pub fn count_error(&self) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count_recovery(&self) {
        self.recoveries.fetch_add(1, Ordering::SeqCst);
    }

    pub fn errors(&self) -> u32 {
        self.errors.load(Ordering::SeqCst)
    }

    pub fn recoveries(&self) -> u32 {
        self.recoveries.load(Ordering::SeqCst)
    }
}

/// Fixed-size ring of trace events, oldest dropped first.
#[cfg(feature = "dump")]
pub struct TraceLog<const SIZE: usize> {
    events: Mutex<RefCell<Deque<TraceEvent, SIZE>>>,
}

#[cfg(feature = "dump")]
impl<const SIZE: usize> TraceLog<SIZE> {
    pub const fn new() -> Self {
        Self {
            events: Mutex::new(RefCell::new(Deque::new())),
        }
    }

    pub fn record(&self, event: TraceEvent) {
        critical_section::with(|cs| {
            let mut events = self.events.borrow_ref_mut(cs);
            if events.is_full() {
                events.pop_front();
            }
            let _ = events.push_back(event);
        });
    }

    /// Oldest first, unused slots at the end.
    pub fn snapshot(&self) -> [Option<TraceEvent>; SIZE] {
        let mut out = [None; SIZE];
        critical_section::with(|cs| {
            let events = self.events.borrow_ref(cs);
            for (slot, event) in out.iter_mut().zip(events.iter()) {
                *slot = Some(*event);
            }
        });
        out
    }
}
