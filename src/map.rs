//! Address map and bus constants of the FRAM part.

pub const KBYTE: usize = 1024;

/// Total size of the device, in bytes.
pub const FRAM_SIZE: usize = 32 * KBYTE;

/// Start of the region holding the current-detection samples.
pub const FRAM_BASE_ADDRESS: u32 = 0;

/// Size of one page of samples: 256 words of 4 bytes.
pub const FRAM_DATA_SIZE: usize = KBYTE;

/// Number of 4-byte words in one page of samples.
pub const FRAM_DATA_WORDS: usize = FRAM_DATA_SIZE / core::mem::size_of::<u32>();

/// Chip-select line used on the reference board.
pub const FRAM_CS: u8 = 5;

/// Highest SCK frequency the part accepts.
pub const SPI_MAX_SPEED: u32 = 33_000_000;

/// Number of address bytes sent after READ and WRITE opcodes.
pub const ADDRESS_BYTES: usize = 2;

/// Largest RDID response among supported parts (6 continuation codes plus
/// manufacturer and two product bytes).
pub const DEVICE_ID_MAX: usize = 9;

/// Checks that `len` bytes starting at `addr` lie inside the device and
/// returns the address as sent on the wire.
pub(crate) fn checked_address(addr: u32, len: usize) -> Option<u16> {
    let start = usize::try_from(addr).ok()?;
    let end = start.checked_add(len)?;
    if start >= FRAM_SIZE || end > FRAM_SIZE {
        return None;
    }
    u16::try_from(start).ok()
}
