//! Battery-backed real-time clock.

use crate::{BusPeripheral, Error, Master};

pub const ADDRESS: u8 = 0x68;
pub const REGISTER_COUNT: usize = 7;

const FIRST_REGISTER: u8 = 0x00;

/// Timekeeping registers `0x00..=0x06`, BCD as stored by the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Registers(pub [u8; REGISTER_COUNT]);

impl Registers {
    pub fn seconds(&self) -> u8 {
        self.0[0] & 0x7F
    }

    pub fn minutes(&self) -> u8 {
        self.0[1] & 0x7F
    }

    pub fn hours(&self) -> u8 {
        self.0[2] & 0x3F
    }

    /// Hour mode bit: set for 24-hour.
    pub fn is_24_hour(&self) -> bool {
        self.0[2] & 0x40 != 0
    }

    pub fn weekday(&self) -> u8 {
        self.0[3] & 0x07
    }

    pub fn date(&self) -> u8 {
        self.0[4] & 0x3F
    }

    pub fn month(&self) -> u8 {
        self.0[5] & 0x1F
    }

    pub fn century(&self) -> bool {
        self.0[5] & 0x80 != 0
    }

    pub fn year(&self) -> u8 {
        self.0[6]
    }
}

/// Point the register pointer at the seconds register, then read all seven.
pub fn read_registers<P: BusPeripheral>(master: &mut Master<'_, P>) -> Result<Registers, Error> {
    let mut registers = Registers::default();
    master.write(ADDRESS, &[FIRST_REGISTER])?;
    master.read(ADDRESS, &mut registers.0)?;
    Ok(registers)
}

pub fn write_registers<P: BusPeripheral>(
    master: &mut Master<'_, P>,
    registers: &Registers,
) -> Result<(), Error> {
    let mut buf = [0u8; REGISTER_COUNT + 1];
    buf[0] = FIRST_REGISTER;
    buf[1..].copy_from_slice(&registers.0);
    master.write(ADDRESS, &buf)
}
