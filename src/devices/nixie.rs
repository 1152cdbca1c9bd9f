//! Per-tube driver boards. Each board takes one digit and echoes it back in
//! the read phase of the same transaction.

use crate::{BusPeripheral, Error, Master};

use super::rtc::Registers;

/// Board addresses for the time row, tens of hours first.
pub const TIME_ADDRESSES: [u8; 6] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06];

/// Board addresses for the date row, tens of days first.
pub const DATE_ADDRESSES: [u8; 6] = [0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E];

/// One bit per board address: set when the board echoed the last digit sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NixieStatus(pub u16);

impl NixieStatus {
    pub fn is_ok(self, address: u8) -> bool {
        address < 16 && self.0 & (1 << address) != 0
    }

    /// Every time and date board echoed.
    pub fn all_ok(self) -> bool {
        TIME_ADDRESSES
            .iter()
            .chain(DATE_ADDRESSES.iter())
            .all(|&address| self.is_ok(address))
    }

    fn set(&mut self, address: u8, ok: bool) {
        if address >= 16 {
            return;
        }
        if ok {
            self.0 |= 1 << address;
        } else {
            self.0 &= !(1 << address);
        }
    }
}

/// The twelve digits shown by the clock, in the order of
/// [`TIME_ADDRESSES`] followed by [`DATE_ADDRESSES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Digits(pub [u8; 12]);

impl Digits {
    pub fn from_registers(registers: &Registers) -> Self {
        let split = |bcd: u8| [bcd >> 4, bcd & 0x0F];
        let [h10, h01] = split(registers.hours());
        let [m10, m01] = split(registers.minutes());
        let [s10, s01] = split(registers.seconds());
        let [d10, d01] = split(registers.date());
        let [mo10, mo01] = split(registers.month());
        let [y10, y01] = split(registers.year());

        Self([
            h10, h01, m10, m01, s10, s01, d10, d01, mo10, mo01, y10, y01,
        ])
    }

    fn addressed(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        TIME_ADDRESSES
            .iter()
            .chain(DATE_ADDRESSES.iter())
            .copied()
            .zip(self.0.iter().copied())
    }
}

/// Sends `value` to the board at `address`; `Ok(true)` when it echoed it.
pub fn set_digit<P: BusPeripheral>(
    master: &mut Master<'_, P>,
    address: u8,
    value: u8,
) -> Result<bool, Error> {
    let mut echo = [0xFF];
    master.write_then_read(address, &[value], &mut echo)?;
    Ok(echo[0] == value)
}

/// Pushes every digit. A board that fails to answer is marked in the status
/// and the remaining boards are still updated.
pub fn update<P: BusPeripheral>(master: &mut Master<'_, P>, digits: &Digits) -> NixieStatus {
    let mut status = NixieStatus::default();
    for (address, value) in digits.addressed() {
        let ok = set_digit(master, address, value).unwrap_or(false);
        if !ok {
            warn!("nixie board {} did not echo {}", address, value);
        }
        status.set(address, ok);
    }
    status
}

/// Remembers the digits last confirmed by every board so an unchanged clock
/// costs no bus traffic.
#[derive(Debug, Default)]
pub struct Display {
    shown: Option<Digits>,
    status: NixieStatus,
}

impl Display {
    pub const fn new() -> Self {
        Self {
            shown: None,
            status: NixieStatus(0),
        }
    }

    /// Pushes `digits` unless they are already on every tube. A refresh that
    /// left a board unconfirmed is repeated on the next call.
    pub fn refresh<P: BusPeripheral>(
        &mut self,
        master: &mut Master<'_, P>,
        digits: &Digits,
    ) -> NixieStatus {
        if self.shown == Some(*digits) {
            return self.status;
        }

        self.status = update(master, digits);
        self.shown = self.status.all_ok().then_some(*digits);
        self.status
    }

    pub fn status(&self) -> NixieStatus {
        self.status
    }
}
