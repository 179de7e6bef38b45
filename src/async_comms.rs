use core::fmt::Debug;

use crate::comms::{Opcode, Status};
use crate::config::{Config, WriteCompletion};
use crate::error::Error;
use crate::map::{checked_address, DEVICE_ID_MAX, FRAM_DATA_SIZE, FRAM_SIZE};
use crate::page::{DataBuffer, DeviceId};
use crate::storage::OpState;
use crate::traits::AsyncFramStorage;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::spi::{Operation, SpiDevice};

/// Async counterpart of [`Fram`](crate::Fram), with the same sequencing.
pub struct AsyncFram<SPI, D> {
    pub spi: SPI,
    delay: D,
    config: Config,
    state: OpState,
    asleep: bool,
}

impl<SPI, D> Debug for AsyncFram<SPI, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AsyncFram")
            .field("state", &self.state)
            .field("asleep", &self.asleep)
            .finish()
    }
}

impl<SPI, D> AsyncFramStorage for AsyncFram<SPI, D>
where
    SPI: SpiDevice,
    D: DelayNs,
{
    type Error = Error<SPI::Error>;

    async fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Error<SPI::Error>> {
        AsyncFram::read(self, addr, buf).await
    }

    async fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), Error<SPI::Error>> {
        AsyncFram::write(self, addr, data).await
    }

    fn capacity(&self) -> usize {
        FRAM_SIZE
    }
}

impl<SPI, D> AsyncFram<SPI, D>
where
    SPI: SpiDevice,
    D: DelayNs,
{
    /// Creates the driver. Nothing is sent to the part; call
    /// [`AsyncFram::check_identity`] to make sure the expected chip is fitted.
    pub fn new(spi: SPI, delay: D, config: Config) -> Result<Self, Error<SPI::Error>> {
        if !config.validate() {
            return Err(Error::InvalidConfig);
        }
        Ok(Self {
            spi,
            delay,
            config,
            state: OpState::Idle,
            asleep: false,
        })
    }

    pub fn state(&self) -> OpState {
        self.state
    }

    pub fn is_asleep(&self) -> bool {
        self.asleep
    }

    pub fn release(self) -> (SPI, D) {
        (self.spi, self.delay)
    }

    /// Writes one page of samples at `addr`.
    pub async fn write_page(
        &mut self,
        addr: u32,
        data: &DataBuffer,
    ) -> Result<(), Error<SPI::Error>> {
        self.write(addr, data.as_bytes()).await
    }

    /// Reads `length` bytes at `addr` into the start of `out`. The rest of
    /// `out` is left as it was.
    pub async fn read_page(
        &mut self,
        addr: u32,
        length: usize,
        out: &mut DataBuffer,
    ) -> Result<(), Error<SPI::Error>> {
        checked_address(addr, length).ok_or(Error::AddressOutOfRange)?;
        if length > FRAM_DATA_SIZE {
            return Err(Error::BufferTooSmall);
        }
        self.read(addr, &mut out.as_bytes_mut()[..length]).await
    }

    /// Writes `data` at `addr`: WREN, RDSR to confirm the latch, WRITE, then
    /// waits for completion as configured.
    pub async fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), Error<SPI::Error>> {
        let [hi, lo] = checked_address(addr, data.len())
            .ok_or(Error::AddressOutOfRange)?
            .to_be_bytes();
        let result = self
            .write_enabled(&mut [
                Operation::Write(&[Opcode::Write as u8, hi, lo]),
                Operation::Write(data),
            ])
            .await;
        self.enter(OpState::Idle);
        result
    }

    /// Reads `buf.len()` bytes starting at `addr`.
    pub async fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Error<SPI::Error>> {
        let [hi, lo] = checked_address(addr, buf.len())
            .ok_or(Error::AddressOutOfRange)?
            .to_be_bytes();
        let result = self.read_inner([Opcode::Read as u8, hi, lo], buf).await;
        self.enter(OpState::Idle);
        result
    }

    async fn read_inner(&mut self, header: [u8; 3], buf: &mut [u8]) -> Result<(), Error<SPI::Error>> {
        self.ensure_awake().await?;
        self.enter(OpState::Reading);
        self.spi
            .transaction(&mut [Operation::Write(&header), Operation::Read(buf)])
            .await
            .map_err(Error::Spi)
    }

    /// Reads the device ID, `Config::id_len` bytes of it.
    pub async fn identify(&mut self) -> Result<DeviceId, Error<SPI::Error>> {
        self.ensure_awake().await?;
        let mut buf = [0u8; DEVICE_ID_MAX];
        let id_buf = &mut buf[..self.config.id_len];
        self.command_with_response(&[Opcode::ReadId as u8], id_buf)
            .await?;
        let id = DeviceId::from_bytes(id_buf);
        debug!("device id: {}", id);
        Ok(id)
    }

    /// Reads the device ID and compares it with `expected`.
    pub async fn check_identity(&mut self, expected: &[u8]) -> Result<DeviceId, Error<SPI::Error>> {
        let id = self.identify().await?;
        if id.as_bytes() != expected {
            warn!("unexpected device id: {}", id);
            return Err(Error::UnexpectedDeviceId);
        }
        Ok(id)
    }

    /// Reads the status register.
    pub async fn read_status(&mut self) -> Result<Status, Error<SPI::Error>> {
        self.ensure_awake().await?;
        self.status().await
    }

    /// Writes the status register, with the same write-enable sequencing as
    /// a data write.
    pub async fn write_status(&mut self, status: Status) -> Result<(), Error<SPI::Error>> {
        let result = self
            .write_enabled(&mut [Operation::Write(&[
                Opcode::WriteStatus as u8,
                status.bits(),
            ])])
            .await;
        self.enter(OpState::Idle);
        result
    }

    /// Clears the write enable latch.
    pub async fn write_disable(&mut self) -> Result<(), Error<SPI::Error>> {
        self.ensure_awake().await?;
        self.command(&[Opcode::WriteDisable as u8]).await
    }

    /// Puts the part to sleep. The next operation wakes it again.
    pub async fn sleep(&mut self) -> Result<(), Error<SPI::Error>> {
        let opcode = self.config.sleep_opcode.ok_or(Error::SleepUnavailable)?;
        if self.asleep {
            return Ok(());
        }
        self.command(&[opcode]).await?;
        self.asleep = true;
        debug!("fram asleep");
        Ok(())
    }

    /// Wakes the part with a chip-select pulse and waits for it to recover.
    pub async fn wake(&mut self) -> Result<(), Error<SPI::Error>> {
        self.spi.transaction(&mut []).await.map_err(Error::Spi)?;
        self.delay.delay_us(self.config.wake_delay_us).await;
        self.asleep = false;
        debug!("fram awake");
        Ok(())
    }

    async fn ensure_awake(&mut self) -> Result<(), Error<SPI::Error>> {
        if self.asleep {
            self.wake().await?;
        }
        Ok(())
    }

    /// WREN, RDSR, then `frame` only if WEL reads back set.
    async fn write_enabled(
        &mut self,
        frame: &mut [Operation<'_, u8>],
    ) -> Result<(), Error<SPI::Error>> {
        self.ensure_awake().await?;
        self.enter(OpState::WriteEnabling);
        self.command(&[Opcode::WriteEnable as u8]).await?;
        let status = self.status().await?;
        if !status.contains(Status::WEL) {
            warn!("WEL should be set: {=u8:#x}", status.bits());
            return Err(Error::WriteNotEnabled);
        }
        self.enter(OpState::WriteEnableVerified);
        self.enter(OpState::Writing);
        self.spi.transaction(frame).await.map_err(Error::Spi)?;
        self.wait_write_done().await
    }

    async fn wait_write_done(&mut self) -> Result<(), Error<SPI::Error>> {
        match self.config.write_completion {
            WriteCompletion::None => Ok(()),
            WriteCompletion::SettleDelay { us } => {
                self.delay.delay_us(us).await;
                Ok(())
            }
            WriteCompletion::PollStatus {
                max_polls,
                interval_us,
            } => {
                for _ in 0..max_polls {
                    if !self.status().await?.contains(Status::WEL) {
                        return Ok(());
                    }
                    self.delay.delay_us(interval_us).await;
                }
                warn!("WEL still set after {=u32} polls", max_polls);
                Err(Error::DeviceTimeout)
            }
        }
    }

    async fn status(&mut self) -> Result<Status, Error<SPI::Error>> {
        let mut response = [0u8; 1];
        self.command_with_response(&[Opcode::ReadStatus as u8], &mut response)
            .await?;
        Ok(Status::from_bits_retain(response[0]))
    }

    fn enter(&mut self, state: OpState) {
        trace!("{} -> {}", self.state, state);
        self.state = state;
    }

    /// Writes a command to the SPI bus
    async fn command(&mut self, bytes: &[u8]) -> Result<(), Error<SPI::Error>> {
        self.spi
            .transaction(&mut [Operation::Write(bytes)])
            .await
            .map_err(Error::Spi)
    }

    /// Writes a command to the SPI bus, then reads the response in the same
    /// frame
    async fn command_with_response(
        &mut self,
        instruction: &[u8],
        response: &mut [u8],
    ) -> Result<(), Error<SPI::Error>> {
        self.spi
            .transaction(&mut [Operation::Write(instruction), Operation::Read(response)])
            .await
            .map_err(Error::Spi)
    }
}
