//! Command framing for SPI FRAM parts of the MB85RS256 / FM25V02 kind.
//! Refer to the datasheet of the fitted part for timing.
use crate::error::Error;
use crate::map::{checked_address, ADDRESS_BYTES, DEVICE_ID_MAX};
use core::fmt::Debug;
use embedded_hal::spi::{Operation, SpiDevice};

pub struct FramSpi<SPI> {
    spi: SPI,
}
impl<SPI> Debug for FramSpi<SPI> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "FramSPI")
    }
}

/// The FRAM command set. SLEEP is missing on purpose: its value differs
/// between parts and comes from [`Config`](crate::Config).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Opcode {
    /// Set the write enable latch (WREN).
    WriteEnable = 0x06,
    /// Reset the write enable latch (WRDI).
    WriteDisable = 0x04,
    /// Read the 8-bit status register (RDSR).
    ReadStatus = 0x05,
    /// Write the status register (WRSR).
    WriteStatus = 0x01,
    /// Read memory (READ).
    Read = 0x03,
    /// Write memory (WRITE).
    Write = 0x02,
    /// Read the device ID (RDID).
    ReadId = 0x9F,
}

bitflags::bitflags! {
    /// Status register bits.
    ///
    /// Bits without a name here (bits 0, 4-6) are reserved; they are kept as
    /// read and written back unchanged.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        /// Status of the **W**rite **E**nable **L**atch.
        const WEL = 1 << 1;
        /// Block protect 0.
        const BP0 = 1 << 2;
        /// Block protect 1.
        const BP1 = 1 << 3;
        /// Status register **W**rite **P**rotect **EN**able.
        const WPEN = 1 << 7;
    }
}

impl<SPI> FramSpi<SPI>
where
    SPI: SpiDevice,
{
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    pub fn release(self) -> SPI {
        self.spi
    }

    /// Sets the write enable latch. The part clears it again on its own once
    /// a WRITE or WRSR completes.
    pub fn write_enable(&mut self) -> Result<(), Error<SPI::Error>> {
        self.command(&[Opcode::WriteEnable as u8])
    }

    /// Clears the write enable latch.
    pub fn write_disable(&mut self) -> Result<(), Error<SPI::Error>> {
        self.command(&[Opcode::WriteDisable as u8])
    }

    /// Reads the status register.
    pub fn read_status(&mut self) -> Result<Status, Error<SPI::Error>> {
        let mut response = [0u8; 1];
        self.command_with_response(&[Opcode::ReadStatus as u8], &mut response)?;
        Ok(Status::from_bits_retain(response[0]))
    }

    /// Writes the status register. Only takes effect while WEL is set.
    pub fn write_status(&mut self, status: Status) -> Result<(), Error<SPI::Error>> {
        self.command(&[Opcode::WriteStatus as u8, status.bits()])
    }

    /// Reads `buf.len()` bytes starting at `addr`.
    ///
    /// The range is checked before anything is sent: the part would wrap
    /// around to address 0 instead of failing.
    pub fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Error<SPI::Error>> {
        let header = Self::header(Opcode::Read, addr, buf.len())?;
        self.spi
            .transaction(&mut [Operation::Write(&header), Operation::Read(buf)])
            .map_err(Error::Spi)
    }

    /// Writes `data` starting at `addr`. The caller is responsible for
    /// setting WEL first; without it the part silently ignores the frame.
    pub fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), Error<SPI::Error>> {
        let header = Self::header(Opcode::Write, addr, data.len())?;
        self.spi
            .transaction(&mut [Operation::Write(&header), Operation::Write(data)])
            .map_err(Error::Spi)
    }

    /// Reads the device ID into `buf`, at most [`DEVICE_ID_MAX`] bytes.
    pub fn read_id(&mut self, buf: &mut [u8]) -> Result<(), Error<SPI::Error>> {
        if buf.len() > DEVICE_ID_MAX {
            return Err(Error::BufferTooSmall);
        }
        self.command_with_response(&[Opcode::ReadId as u8], buf)
    }

    /// Sends the sleep opcode of the fitted part.
    pub fn sleep(&mut self, opcode: u8) -> Result<(), Error<SPI::Error>> {
        self.command(&[opcode])
    }

    /// Pulses chip-select without clocking any data, which wakes the part
    /// from sleep.
    pub fn wake(&mut self) -> Result<(), Error<SPI::Error>> {
        self.spi.transaction(&mut []).map_err(Error::Spi)
    }

    /// Opcode followed by the 16-bit address, most significant byte first.
    fn header(
        opcode: Opcode,
        addr: u32,
        len: usize,
    ) -> Result<[u8; 1 + ADDRESS_BYTES], Error<SPI::Error>> {
        let addr = checked_address(addr, len).ok_or(Error::AddressOutOfRange)?;
        let [hi, lo] = addr.to_be_bytes();
        Ok([opcode as u8, hi, lo])
    }

    /// Writes a command to the SPI bus
    fn command(&mut self, bytes: &[u8]) -> Result<(), Error<SPI::Error>> {
        self.spi
            .transaction(&mut [Operation::Write(bytes)])
            .map_err(Error::Spi)
    }

    /// Writes a command to the SPI bus, then reads the response in the same
    /// frame
    fn command_with_response(
        &mut self,
        instruction: &[u8],
        response: &mut [u8],
    ) -> Result<(), Error<SPI::Error>> {
        self.spi
            .transaction(&mut [Operation::Write(instruction), Operation::Read(response)])
            .map_err(Error::Spi)
    }
}
