//! Bus transport: exclusive use of the SPI bus and the FRAM chip-select line.
//!
//! Every FRAM command is delimited by chip-select: the part latches the
//! opcode on the falling edge and acts on the command when chip-select rises.
//! [`Transaction`] is the only way to drive the bus, and it raises
//! chip-select again however it is left.

use core::fmt::Debug;

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::{ErrorType, Operation, SpiBus, SpiDevice};

use crate::config::BusConfig;
use crate::error::BusError;

/// Owns the SPI bus and the chip-select pin of one FRAM part.
pub struct FramBus<BUS, CS> {
    bus: BUS,
    cs: CS,
    open: bool,
}

impl<BUS, CS> Debug for FramBus<BUS, CS> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FramBus").field("open", &self.open).finish()
    }
}

impl<BUS, CS> FramBus<BUS, CS>
where
    BUS: SpiBus,
    CS: OutputPin,
{
    /// Takes ownership of `bus` and `cs` and parks chip-select high.
    ///
    /// `config` describes how the caller set the SPI peripheral up; settings
    /// the part cannot work with are refused.
    pub fn new(
        bus: BUS,
        mut cs: CS,
        config: &BusConfig,
    ) -> Result<Self, BusError<BUS::Error, CS::Error>> {
        if !config.is_supported() {
            warn!(
                "unsupported bus setup: {=u32} Hz, msb first: {=bool}",
                config.frequency_hz,
                config.msb_first
            );
            return Err(BusError::UnsupportedConfig);
        }
        cs.set_high().map_err(BusError::ChipSelect)?;
        Ok(Self {
            bus,
            cs,
            open: false,
        })
    }

    /// Asserts chip-select and returns the guard holding it.
    ///
    /// Fails with [`BusError::TransactionMisuse`] if an earlier transaction
    /// was leaked instead of dropped.
    pub fn begin_transaction(
        &mut self,
    ) -> Result<Transaction<'_, BUS, CS>, BusError<BUS::Error, CS::Error>> {
        if self.open {
            warn!("transaction still open, chip-select was never released");
            return Err(BusError::TransactionMisuse);
        }
        if let Err(e) = self.cs.set_low() {
            let _ = self.cs.set_high();
            return Err(BusError::ChipSelect(e));
        }
        self.open = true;
        Ok(Transaction {
            owner: self,
            released: false,
        })
    }

    /// Whether a transaction is currently holding chip-select.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Gives the bus and the pin back.
    pub fn release(self) -> (BUS, CS) {
        (self.bus, self.cs)
    }
}

/// One chip-select assertion. Dropping it flushes the bus and raises
/// chip-select.
pub struct Transaction<'a, BUS, CS>
where
    BUS: SpiBus,
    CS: OutputPin,
{
    owner: &'a mut FramBus<BUS, CS>,
    released: bool,
}

impl<BUS, CS> Transaction<'_, BUS, CS>
where
    BUS: SpiBus,
    CS: OutputPin,
{
    /// Full-duplex exchange of one byte.
    pub fn transfer_byte(&mut self, out: u8) -> Result<u8, BusError<BUS::Error, CS::Error>> {
        let mut word = [out];
        self.owner
            .bus
            .transfer_in_place(&mut word)
            .map_err(BusError::Spi)?;
        Ok(word[0])
    }

    /// Full-duplex exchange of `words`, in order. Each byte is replaced by
    /// the byte clocked in while it was sent.
    pub fn transfer_block(&mut self, words: &mut [u8]) -> Result<(), BusError<BUS::Error, CS::Error>> {
        self.owner
            .bus
            .transfer_in_place(words)
            .map_err(BusError::Spi)
    }

    pub fn write(&mut self, words: &[u8]) -> Result<(), BusError<BUS::Error, CS::Error>> {
        self.owner.bus.write(words).map_err(BusError::Spi)
    }

    pub fn read(&mut self, words: &mut [u8]) -> Result<(), BusError<BUS::Error, CS::Error>> {
        self.owner.bus.read(words).map_err(BusError::Spi)
    }

    pub fn transfer(
        &mut self,
        read: &mut [u8],
        write: &[u8],
    ) -> Result<(), BusError<BUS::Error, CS::Error>> {
        self.owner.bus.transfer(read, write).map_err(BusError::Spi)
    }

    /// Flushes the bus and raises chip-select, reporting failures that a
    /// plain drop would swallow.
    pub fn end(mut self) -> Result<(), BusError<BUS::Error, CS::Error>> {
        self.finish()
    }

    fn finish(&mut self) -> Result<(), BusError<BUS::Error, CS::Error>> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        let flushed = self.owner.bus.flush().map_err(BusError::Spi);
        let raised = self.owner.cs.set_high().map_err(BusError::ChipSelect);
        self.owner.open = false;
        flushed.and(raised)
    }
}

impl<BUS, CS> Drop for Transaction<'_, BUS, CS>
where
    BUS: SpiBus,
    CS: OutputPin,
{
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

impl<BUS, CS> ErrorType for FramBus<BUS, CS>
where
    BUS: SpiBus,
    CS: OutputPin,
{
    type Error = BusError<BUS::Error, CS::Error>;
}

impl<BUS, CS> SpiDevice for FramBus<BUS, CS>
where
    BUS: SpiBus,
    CS: OutputPin,
{
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        let mut transaction = self.begin_transaction()?;
        for op in operations {
            match op {
                Operation::Read(buf) => transaction.read(buf)?,
                Operation::Write(buf) => transaction.write(buf)?,
                Operation::Transfer(read, write) => transaction.transfer(read, write)?,
                Operation::TransferInPlace(buf) => transaction.transfer_block(buf)?,
                Operation::DelayNs(_) => return Err(BusError::UnsupportedOperation),
            }
        }
        transaction.end()
    }
}
