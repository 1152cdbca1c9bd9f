//! AP33772 USB power-delivery sink controller.

use crate::{BusPeripheral, Error, Master};

pub const ADDRESS: u8 = 0x51;
pub const MAX_PDO_COUNT: usize = 7;

const CMD_SRCPDO: u8 = 0x00;
const CMD_PDONUM: u8 = 0x1C;
const CMD_STATUS: u8 = 0x1D;
const CMD_RDO: u8 = 0x30;

const PDO_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status(pub u8);

impl Status {
    pub fn ready(self) -> bool {
        self.0 & 0x01 != 0
    }

    pub fn success(self) -> bool {
        self.0 & 0x02 != 0
    }

    pub fn new_pdo(self) -> bool {
        self.0 & 0x04 != 0
    }

    pub fn over_voltage(self) -> bool {
        self.0 & 0x10 != 0
    }

    pub fn over_current(self) -> bool {
        self.0 & 0x20 != 0
    }

    pub fn over_temperature(self) -> bool {
        self.0 & 0x40 != 0
    }

    pub fn derating(self) -> bool {
        self.0 & 0x80 != 0
    }
}

/// One source capability, as the 32-bit little-endian word the chip reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerDataObject(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Supply {
    Fixed { max_mv: u32, max_ma: u32 },
    Augmented { min_mv: u32, max_mv: u32, max_ma: u32 },
    Other,
}

impl PowerDataObject {
    pub fn supply(self) -> Supply {
        let raw = self.0;
        match raw >> 30 {
            0b00 => Supply::Fixed {
                max_ma: (raw & 0x3FF) * 10,
                max_mv: ((raw >> 10) & 0x3FF) * 50,
            },
            0b11 => Supply::Augmented {
                max_ma: (raw & 0x7F) * 50,
                min_mv: ((raw >> 8) & 0xFF) * 100,
                max_mv: ((raw >> 17) & 0xFF) * 100,
            },
            _ => Supply::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SourceCapabilities {
    pub pdos: [PowerDataObject; MAX_PDO_COUNT],
    pub count: usize,
}

impl SourceCapabilities {
    pub fn iter(&self) -> impl Iterator<Item = &PowerDataObject> {
        self.pdos[..self.count].iter()
    }

    /// 1-based position of the first fixed supply at exactly `mv`.
    pub fn find_fixed(&self, mv: u32) -> Option<u8> {
        self.iter()
            .position(|pdo| matches!(pdo.supply(), Supply::Fixed { max_mv, .. } if max_mv == mv))
            .map(|index| index as u8 + 1)
    }
}

pub fn status<P: BusPeripheral>(master: &mut Master<'_, P>) -> Result<Status, Error> {
    let mut status = [0u8; 1];
    master.write_then_read(ADDRESS, &[CMD_STATUS], &mut status)?;
    Ok(Status(status[0]))
}

/// The chip reports `0xFF` while it is still bootstrapping.
pub fn is_ready<P: BusPeripheral>(master: &mut Master<'_, P>) -> Result<bool, Error> {
    Ok(status(master)?.0 != 0xFF)
}

/// Reads the advertised source capabilities. A count above
/// [`MAX_PDO_COUNT`] is treated as no capabilities at all.
pub fn read_capabilities<P: BusPeripheral>(
    master: &mut Master<'_, P>,
) -> Result<SourceCapabilities, Error> {
    let mut count = [0u8; 1];
    master.write_then_read(ADDRESS, &[CMD_PDONUM], &mut count)?;

    let mut caps = SourceCapabilities::default();
    let count = count[0] as usize;
    if count == 0 || count > MAX_PDO_COUNT {
        return Ok(caps);
    }

    let mut raw = [0u8; MAX_PDO_COUNT * PDO_SIZE];
    let raw = &mut raw[..count * PDO_SIZE];
    master.write_then_read(ADDRESS, &[CMD_SRCPDO], raw)?;

    for (pdo, bytes) in caps.pdos.iter_mut().zip(raw.chunks_exact(PDO_SIZE)) {
        *pdo = PowerDataObject(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]));
    }
    caps.count = count;
    Ok(caps)
}

/// Request data object for a fixed supply: currents in mA, 10 mA units on
/// the wire, `position` 1-based.
pub fn request_word(position: u8, operating_ma: u32, max_ma: u32) -> u32 {
    let max = (max_ma / 10) & 0x3FF;
    let operating = (operating_ma / 10) & 0x3FF;
    let position = (position as u32) & 0x7;
    max | (operating << 10) | (position << 28)
}

/// Asks for the supply at `position`. Poll [`status`] until `ready()` to learn
/// whether the source accepted.
pub fn request<P: BusPeripheral>(
    master: &mut Master<'_, P>,
    position: u8,
    operating_ma: u32,
    max_ma: u32,
) -> Result<(), Error> {
    let word = request_word(position, operating_ma, max_ma).to_le_bytes();
    master.write(ADDRESS, &[CMD_RDO, word[0], word[1], word[2], word[3]])
}
