//! Un-wedging the bus before a transaction.
//!
//! A peer that lost sync (typically after the controller was reset by a
//! debugger in the middle of a read) keeps SDA low while it waits for clock
//! pulses that will never come. Clocking SCL by hand lets it finish shifting
//! out its byte and release the line.
//!
//! This relies on every peer on the bus releasing SDA within nine clocks,
//! which holds for the nixie clock boards but not for arbitrary devices.

use crate::BusPeripheral;

/// Most bits a peer can still be waiting to shift out, plus its ACK slot.
pub const RECOVERY_PULSES: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Recovery {
    /// Nothing to do, the bus was left untouched.
    Healthy,
    /// SDA was high but the peripheral still reported an open transaction,
    /// which was aborted. No line was released.
    Aborted,
    /// SDA went from low to high after `pulses` clock pulses.
    Released { pulses: u8 },
    /// SDA still low after [`RECOVERY_PULSES`]. The transaction goes ahead
    /// anyway; there is no further fallback.
    Exhausted,
}

pub fn is_wedged<P: BusPeripheral>(bus: &P) -> bool {
    !bus.sda_is_high() || bus.transaction_in_progress()
}

pub fn recover<P: BusPeripheral>(bus: &P) -> Recovery {
    if !is_wedged(bus) {
        return Recovery::Healthy;
    }

    let outcome = if bus.sda_is_high() {
        Recovery::Aborted
    } else {
        clock_out(bus)
    };

    if bus.transaction_in_progress() {
        bus.abort();
    }

    match outcome {
        Recovery::Aborted => warn!("stale transaction aborted"),
        Recovery::Released { pulses } => info!("bus released after {} pulses", pulses),
        Recovery::Exhausted => warn!("bus still held low after {} pulses", RECOVERY_PULSES),
        Recovery::Healthy => {}
    }

    outcome
}

/// Pulses SCL while SDA is held low. Only called with SDA low, so
/// `Released` always follows at least one pulse.
fn clock_out<P: BusPeripheral>(bus: &P) -> Recovery {
    warn!("bus wedged, clocking SCL");
    bus.take_scl();

    let mut pulses = 0;
    let outcome = loop {
        if pulses == RECOVERY_PULSES {
            break Recovery::Exhausted;
        }

        bus.set_scl(false);
        bus.half_bit_delay();
        bus.set_scl(true);
        bus.half_bit_delay();
        pulses += 1;

        if bus.sda_is_high() {
            break Recovery::Released { pulses };
        }
    };

    bus.restore_scl();
    outcome
}
