use core::cell::RefCell;

use atomic::{Atomic, Ordering};
use critical_section::{CriticalSection, Mutex};

#[cfg(feature = "dump")]
use heapless::Deque;

#[cfg(feature = "dump")]
use super::diagnostics::TraceLog;
use super::{
    diagnostics::Counters,
    interrupts::InterruptBridge,
    recovery::{self, Recovery},
    state_holder::StateHolder,
    BusPeripheral, Master, Operation, Reason, State, TraceEvent,
};

pub const STATES_HISTORY_SIZE: usize = 8;
#[cfg(feature = "dump")]
pub const TRACE_SIZE: usize = 32;

#[cfg(feature = "dump")]
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StateDump {
    pub state_history: [State; STATES_HISTORY_SIZE],
    pub current_state: State,
    pub trace: [Option<TraceEvent>; TRACE_SIZE],
}

#[cfg(feature = "dump")]
impl StateDump {
    /// Trace as a string of event codes, oldest first.
    pub fn trace_codes(&self) -> heapless::String<TRACE_SIZE> {
        let mut codes = heapless::String::new();
        for event in self.trace.iter().flatten() {
            let _ = codes.push(event.code());
        }
        codes
    }
}

/// Bus master engine: owns the peripheral handle, the single outstanding
/// operation and the diagnostics.
///
/// Meant to live in a `static` shared by the foreground (through [`Master`])
/// and by the interrupt handlers.
///
/// The installed operation borrows the caller's buffers, so it is never
/// handed out. The bridge used by the handlers is not part of the API:
///
/// ```compile_fail
/// use nixie_i2c_master::InterruptBridge;
/// ```
///
/// ```compile_fail
/// use nixie_i2c_master::interrupts::InterruptBridge;
/// ```
pub struct Engine<P: BusPeripheral> {
    bus: P,
    operation: Mutex<RefCell<Option<Operation<'static>>>>,
    state_holder: StateHolder<STATES_HISTORY_SIZE>,
    counters: Counters,
    #[cfg(feature = "dump")]
    trace: TraceLog<TRACE_SIZE>,
    master_taken: Atomic<bool>,
}

#[cfg(feature = "dump")]
fn deque_into_array<T: Copy, const N: usize>(d: &Deque<T, N>, arr: &mut [T; N]) {
    let n = d.len();
    let (a, b) = d.as_slices();
    let s = N - n;

    arr[s..s + a.len()].copy_from_slice(a);
    arr[s + a.len()..].copy_from_slice(b);
}

impl<P: BusPeripheral> Engine<P> {
    pub const fn new(bus: P) -> Self {
        Self {
            bus,
            operation: Mutex::new(RefCell::new(None)),
            state_holder: StateHolder::new(),
            counters: Counters::new(),
            #[cfg(feature = "dump")]
            trace: TraceLog::new(),
            master_taken: Atomic::new(false),
        }
    }

    /// The foreground handle. Only one exists at a time.
    pub fn take_master(&self) -> Option<Master<'_, P>> {
        if self.master_taken.swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(Master::new(self))
        }
    }

    pub(crate) fn release_master(&self) {
        self.master_taken.store(false, Ordering::SeqCst);
    }

    pub fn bus(&self) -> &P {
        &self.bus
    }

    pub fn state(&self) -> State {
        self.state_holder.get_state()
    }

    pub fn error_count(&self) -> u32 {
        self.counters.errors()
    }

    pub fn recovery_count(&self) -> u32 {
        self.counters.recoveries()
    }

    /// Runs one transaction to completion, spinning until the interrupt
    /// handlers have walked it to `Idle` or `Error`.
    ///
    /// Never times out: a peer that stops the clock for good hangs the caller.
    pub(crate) fn transact(&self, operation: Operation<'_>) -> Result<(), Reason> {
        if operation.address() > 0x7F {
            return Err(Reason::InvalidAddress);
        }

        if let Err(state) = self.state_holder.claim(State::WriteAddress) {
            debug!("busy in {}", state);
            return Err(Reason::Busy);
        }

        self.recover_bus();

        // SAFETY: the operation is only reachable through `self.operation`,
        // whose sole accessor is `InterruptBridge::with_operation`. That trait
        // is not exported, so no `&mut Operation<'static>` leaves the crate and
        // the operation cannot be moved out. It is taken back out below before
        // this function returns; the loop in between does not return until
        // the interrupt side has settled, after which it no longer touches it.
        let operation: Operation<'static> = unsafe { core::mem::transmute(operation) };
        critical_section::with(|cs| *self.operation.borrow_ref_mut(cs) = Some(operation));

        self.notify(TraceEvent::Start);
        self.bus.issue_start();

        while !self.state_holder.get_state().is_settled() || self.bus.transaction_in_progress() {
            core::hint::spin_loop();
        }

        let operation = critical_section::with(|cs| self.operation.borrow_ref_mut(cs).take());
        let outcome = match &operation {
            Some(op) => op.outcome(),
            None => Ok(()),
        };
        drop(operation);

        self.state_holder.set_state(State::Idle);
        outcome
    }

    fn recover_bus(&self) {
        match recovery::recover(&self.bus) {
            Recovery::Healthy => {}
            Recovery::Released { .. } => {
                self.counters.count_recovery();
                self.notify(TraceEvent::Recovery);
            }
            Recovery::Aborted | Recovery::Exhausted => self.notify(TraceEvent::Recovery),
        }
    }

    #[cfg(feature = "dump")]
    pub fn dump_state(&self) -> StateDump {
        let mut states = [State::Idle; STATES_HISTORY_SIZE];

        critical_section::with(|cs| {
            let states_deque = self.state_holder.get_history(cs);
            deque_into_array(&states_deque, &mut states);
        });

        StateDump {
            state_history: states,
            current_state: self.get_state(),
            trace: self.trace.snapshot(),
        }
    }
}

impl<P: BusPeripheral> InterruptBridge<P> for Engine<P> {
    fn bus(&self) -> &P {
        &self.bus
    }

    fn get_state(&self) -> State {
        self.state_holder.get_state()
    }

    fn set_state(&self, state: State) {
        self.state_holder.set_state(state)
    }

    fn with_operation<R>(
        &self,
        cs: CriticalSection,
        f: impl FnOnce(&mut Operation<'static>) -> R,
    ) -> Option<R> {
        self.operation.borrow_ref_mut(cs).as_mut().map(f)
    }

    fn fail(&self, reason: Reason) {
        warn!("transaction failed: {}", reason);
        self.counters.count_error();
    }

    fn notify(&self, event: TraceEvent) {
        #[cfg(feature = "dump")]
        self.trace.record(event);
        #[cfg(not(feature = "dump"))]
        let _ = event;
    }
}
