//! 128x32 SSD1306 status display. Glyph rendering lives with the UI; this
//! module only issues commands and bulk memory fills.

use crate::{BusPeripheral, Error, Master};

pub const ADDRESS: u8 = 0x3C;
pub const WIDTH: u8 = 128;
pub const HEIGHT: u8 = 32;

/// Bytes of display memory: one bit per pixel.
pub const MEMORY_SIZE: usize = WIDTH as usize * HEIGHT as usize / 8;

pub const COMMAND: u8 = 0x00;
pub const DATA: u8 = 0x40;

#[rustfmt::skip]
const INIT_SEQUENCE: [u8; 23] = [
    COMMAND,
    0xAE, // display off
    0xD5, 0x80, // clock divider
    0xA8, 0x1F, // multiplex ratio
    0xD3, 0x00, // display offset
    0x40, // start line 0
    0x8D, 0x14, // charge pump on
    0x20, 0x00, // horizontal addressing
    0xA0, // segment remap
    0xC0, // COM scan direction normal
    0xDA, 0x02, // COM pins
    0x81, 0xA0, // contrast
    0xA4, // follow RAM
    0xA6, // not inverted
    0x2E, // scrolling off
    0xAF, // display on
];

pub fn init<P: BusPeripheral>(master: &mut Master<'_, P>) -> Result<(), Error> {
    master.write(ADDRESS, &INIT_SEQUENCE)?;
    clear(master)
}

/// Limit subsequent data writes to the given page and column window.
pub fn set_bounds<P: BusPeripheral>(
    master: &mut Master<'_, P>,
    pages: (u8, u8),
    columns: (u8, u8),
) -> Result<(), Error> {
    let command = [COMMAND, 0x22, pages.0, pages.1, 0x21, columns.0, columns.1];
    master.write(ADDRESS, &command)
}

/// Zero the whole display memory in one streamed transaction.
pub fn clear<P: BusPeripheral>(master: &mut Master<'_, P>) -> Result<(), Error> {
    set_bounds(master, (0, 0xFF), (0, WIDTH - 1))?;
    master.write_with_callback(ADDRESS, fill(0))
}

/// Byte source for a full-memory fill: the data control byte followed by
/// [`MEMORY_SIZE`] copies of `pattern`.
pub fn fill(pattern: u8) -> impl FnMut(usize) -> Option<u8> + Send {
    move |count| match count {
        0 => Some(DATA),
        n if n <= MEMORY_SIZE => Some(pattern),
        _ => None,
    }
}

pub fn set_inverted<P: BusPeripheral>(
    master: &mut Master<'_, P>,
    inverted: bool,
) -> Result<(), Error> {
    let command = [COMMAND, if inverted { 0xA7 } else { 0xA6 }];
    master.write(ADDRESS, &command)
}
