#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

mod diagnostics;
mod engine;
mod interrupts;
mod master;
mod operation;
mod peripheral;
mod state_holder;

pub mod devices;
pub mod recovery;

pub use diagnostics::TraceEvent;
pub use engine::{Engine, STATES_HISTORY_SIZE};
pub use interrupts::{handle_collision_interrupt, handle_event_interrupt};
pub use master::Master;
pub use operation::{Action, Event, Operation, WriteCallback};
pub use peripheral::BusPeripheral;
pub use recovery::{Recovery, RECOVERY_PULSES};

#[cfg(feature = "dump")]
pub use engine::{StateDump, TRACE_SIZE};

/// Published state of the transaction currently owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::NoUninit)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum State {
    Idle,
    WriteAddress,
    WriteData,
    ReadData,
    ReadComplete,
    Error,
}

impl State {
    /// `Idle` and `Error` absorb notifications; the foreground may collect the
    /// operation once one of them is published.
    pub fn is_settled(self) -> bool {
        matches!(self, State::Idle | State::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Kind {
    Write,
    Read,
    WriteThenRead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Direction {
    Write = 0,
    Read = 1,
}

impl Direction {
    pub fn address_byte(self, address: u8) -> u8 {
        (address << 1) | self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reason {
    /// Another transaction is still outstanding.
    Busy,
    /// Address does not fit in 7 bits.
    InvalidAddress,
    /// No peer acknowledged the address byte.
    AddressNack,
    /// The peer refused a data byte after acknowledging `sent` bytes.
    DataNack { sent: usize },
    /// Collision reported by the peripheral.
    ArbitrationLoss,
}

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Error {
    #[cfg(feature = "dump")]
    pub dump: StateDump,
    pub reason: Reason,
}
