//! Page-level access to the FRAM with write-enable sequencing hidden.
//!
//! A write always goes WREN, RDSR, WRITE: the part ignores a WRITE without a
//! preceding WREN, so the latch is read back before any data is sent, and a
//! clear latch is reported instead of losing the page silently.

use core::fmt::Debug;

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;

use crate::comms::{FramSpi, Status};
use crate::config::{Config, WriteCompletion};
use crate::error::Error;
use crate::map::{checked_address, DEVICE_ID_MAX, FRAM_DATA_SIZE, FRAM_SIZE};
use crate::page::{DataBuffer, DeviceId};
use crate::traits::FramStorage;

/// Progress of the operation in flight. Back to `Idle` once the call
/// returns, whether it succeeded or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OpState {
    Idle,
    WriteEnabling,
    WriteEnableVerified,
    Writing,
    Reading,
}

/// Blocking FRAM driver.
///
/// Buffers are borrowed for the duration of one call only; the driver keeps
/// no reference to caller data.
pub struct Fram<SPI, D> {
    spi: FramSpi<SPI>,
    delay: D,
    config: Config,
    state: OpState,
    asleep: bool,
}

impl<SPI, D> Debug for Fram<SPI, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Fram")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("asleep", &self.asleep)
            .finish()
    }
}

impl<SPI, D> Fram<SPI, D>
where
    SPI: SpiDevice,
    D: DelayNs,
{
    /// Creates the driver. Nothing is sent to the part; call
    /// [`Fram::check_identity`] to make sure the expected chip is fitted.
    pub fn new(spi: SPI, delay: D, config: Config) -> Result<Self, Error<SPI::Error>> {
        if !config.validate() {
            return Err(Error::InvalidConfig);
        }
        Ok(Self {
            spi: FramSpi::new(spi),
            delay,
            config,
            state: OpState::Idle,
            asleep: false,
        })
    }

    pub fn state(&self) -> OpState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_asleep(&self) -> bool {
        self.asleep
    }

    pub fn release(self) -> (SPI, D) {
        (self.spi.release(), self.delay)
    }

    /// Writes one page of samples at `addr`.
    pub fn write_page(&mut self, addr: u32, data: &DataBuffer) -> Result<(), Error<SPI::Error>> {
        self.write(addr, data.as_bytes())
    }

    /// Reads `length` bytes at `addr` into the start of `out`. The rest of
    /// `out` is left as it was.
    pub fn read_page(
        &mut self,
        addr: u32,
        length: usize,
        out: &mut DataBuffer,
    ) -> Result<(), Error<SPI::Error>> {
        checked_address(addr, length).ok_or(Error::AddressOutOfRange)?;
        if length > FRAM_DATA_SIZE {
            return Err(Error::BufferTooSmall);
        }
        self.read(addr, &mut out.as_bytes_mut()[..length])
    }

    /// Writes `data` at `addr`: WREN, RDSR to confirm the latch, WRITE, then
    /// waits for completion as configured.
    pub fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), Error<SPI::Error>> {
        checked_address(addr, data.len()).ok_or(Error::AddressOutOfRange)?;
        let result = self.write_enabled(|spi| spi.write(addr, data));
        self.finish(result)
    }

    pub fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Error<SPI::Error>> {
        checked_address(addr, buf.len()).ok_or(Error::AddressOutOfRange)?;
        let result = self.read_inner(addr, buf);
        self.finish(result)
    }

    fn read_inner(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Error<SPI::Error>> {
        self.ensure_awake()?;
        self.enter(OpState::Reading);
        self.spi.read(addr, buf)
    }

    /// Reads the device ID, `Config::id_len` bytes of it.
    pub fn identify(&mut self) -> Result<DeviceId, Error<SPI::Error>> {
        self.ensure_awake()?;
        let mut buf = [0u8; DEVICE_ID_MAX];
        let id_buf = &mut buf[..self.config.id_len];
        self.spi.read_id(id_buf)?;
        let id = DeviceId::from_bytes(id_buf);
        debug!("device id: {}", id);
        Ok(id)
    }

    /// Reads the device ID and compares it with `expected`.
    pub fn check_identity(&mut self, expected: &[u8]) -> Result<DeviceId, Error<SPI::Error>> {
        let id = self.identify()?;
        if id.as_bytes() != expected {
            warn!("unexpected device id: {}", id);
            return Err(Error::UnexpectedDeviceId);
        }
        Ok(id)
    }

    pub fn read_status(&mut self) -> Result<Status, Error<SPI::Error>> {
        self.ensure_awake()?;
        self.spi.read_status()
    }

    /// Writes the status register (block protection, WPEN), with the same
    /// write-enable sequencing as a data write.
    pub fn write_status(&mut self, status: Status) -> Result<(), Error<SPI::Error>> {
        let result = self.write_enabled(|spi| spi.write_status(status));
        self.finish(result)
    }

    /// Clears the write enable latch.
    pub fn write_disable(&mut self) -> Result<(), Error<SPI::Error>> {
        self.ensure_awake()?;
        self.spi.write_disable()
    }

    /// Puts the part to sleep. The next operation wakes it again.
    pub fn sleep(&mut self) -> Result<(), Error<SPI::Error>> {
        let opcode = self.config.sleep_opcode.ok_or(Error::SleepUnavailable)?;
        if self.asleep {
            return Ok(());
        }
        self.spi.sleep(opcode)?;
        self.asleep = true;
        debug!("fram asleep");
        Ok(())
    }

    /// Wakes the part with a chip-select pulse and waits for it to recover.
    pub fn wake(&mut self) -> Result<(), Error<SPI::Error>> {
        self.spi.wake()?;
        self.delay.delay_us(self.config.wake_delay_us);
        self.asleep = false;
        debug!("fram awake");
        Ok(())
    }

    fn ensure_awake(&mut self) -> Result<(), Error<SPI::Error>> {
        if self.asleep {
            self.wake()?;
        }
        Ok(())
    }

    fn write_enabled<F>(&mut self, frame: F) -> Result<(), Error<SPI::Error>>
    where
        F: FnOnce(&mut FramSpi<SPI>) -> Result<(), Error<SPI::Error>>,
    {
        self.ensure_awake()?;
        self.enter(OpState::WriteEnabling);
        self.spi.write_enable()?;
        let status = self.spi.read_status()?;
        if !status.contains(Status::WEL) {
            warn!("WEL should be set: {=u8:#x}", status.bits());
            return Err(Error::WriteNotEnabled);
        }
        self.enter(OpState::WriteEnableVerified);
        self.enter(OpState::Writing);
        frame(&mut self.spi)?;
        self.wait_write_done()
    }

    fn wait_write_done(&mut self) -> Result<(), Error<SPI::Error>> {
        match self.config.write_completion {
            WriteCompletion::None => Ok(()),
            WriteCompletion::SettleDelay { us } => {
                self.delay.delay_us(us);
                Ok(())
            }
            WriteCompletion::PollStatus {
                max_polls,
                interval_us,
            } => {
                for _ in 0..max_polls {
                    if !self.spi.read_status()?.contains(Status::WEL) {
                        return Ok(());
                    }
                    self.delay.delay_us(interval_us);
                }
                warn!("WEL still set after {=u32} polls", max_polls);
                Err(Error::DeviceTimeout)
            }
        }
    }

    fn enter(&mut self, state: OpState) {
        trace!("{} -> {}", self.state, state);
        self.state = state;
    }

    fn finish<T>(&mut self, result: Result<T, Error<SPI::Error>>) -> Result<T, Error<SPI::Error>> {
        self.enter(OpState::Idle);
        result
    }
}

impl<SPI, D> FramStorage for Fram<SPI, D>
where
    SPI: SpiDevice,
    D: DelayNs,
{
    type Error = Error<SPI::Error>;

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Self::Error> {
        Fram::read(self, addr, buf)
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), Self::Error> {
        Fram::write(self, addr, data)
    }

    fn capacity(&self) -> usize {
        FRAM_SIZE
    }
}
