use core::fmt::{self, Debug};
#[cfg(feature = "defmt")]
use defmt::{Format, Formatter};
use embedded_hal::spi::{self, ErrorKind};

/// The error type used by this library.
///
/// This encapsulates the error of the SPI transport, and adds the FRAM
/// protocol errors on top of that.
pub enum Error<E> {
    /// An SPI transfer failed.
    Spi(E),
    /// The address range of the request does not fit inside the device.
    /// Nothing was sent on the bus.
    AddressOutOfRange,
    /// The write enable latch was still clear after WREN. No WRITE was sent.
    WriteNotEnabled,
    /// The write enable latch did not clear within the polling bound.
    DeviceTimeout,
    /// The requested length does not fit in the destination buffer.
    BufferTooSmall,
    /// RDID returned something other than the expected signature.
    UnexpectedDeviceId,
    /// No sleep opcode is configured for this part.
    SleepUnavailable,
    /// The driver configuration was rejected.
    InvalidConfig,
}

#[cfg(feature = "defmt")]
impl<E> Format for Error<E> {
    fn format(&self, fmt: Formatter) {
        match self {
            Error::Spi(_spi) => defmt::write!(fmt, "Error::Spi"),
            Error::AddressOutOfRange => defmt::write!(fmt, "Error::AddressOutOfRange"),
            Error::WriteNotEnabled => defmt::write!(fmt, "Error::WriteNotEnabled"),
            Error::DeviceTimeout => defmt::write!(fmt, "Error::DeviceTimeout"),
            Error::BufferTooSmall => defmt::write!(fmt, "Error::BufferTooSmall"),
            Error::UnexpectedDeviceId => defmt::write!(fmt, "Error::UnexpectedDeviceId"),
            Error::SleepUnavailable => defmt::write!(fmt, "Error::SleepUnavailable"),
            Error::InvalidConfig => defmt::write!(fmt, "Error::InvalidConfig"),
        }
    }
}

impl<E: Debug> Debug for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Spi(spi) => write!(f, "Error::Spi({:?})", spi),
            Error::AddressOutOfRange => write!(f, "Error::AddressOutOfRange"),
            Error::WriteNotEnabled => write!(f, "Error::WriteNotEnabled"),
            Error::DeviceTimeout => write!(f, "Error::DeviceTimeout"),
            Error::BufferTooSmall => write!(f, "Error::BufferTooSmall"),
            Error::UnexpectedDeviceId => write!(f, "Error::UnexpectedDeviceId"),
            Error::SleepUnavailable => write!(f, "Error::SleepUnavailable"),
            Error::InvalidConfig => write!(f, "Error::InvalidConfig"),
        }
    }
}

impl<E: PartialEq> PartialEq for Error<E> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Error::Spi(a), Error::Spi(b)) => a == b,
            (Error::Spi(_), _) | (_, Error::Spi(_)) => false,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

/// Errors raised by [`FramBus`](crate::bus::FramBus).
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum BusError<B, P> {
    /// The SPI bus failed.
    Spi(B),
    /// Driving the chip-select line failed.
    ChipSelect(P),
    /// A transaction was opened while another one was never closed.
    TransactionMisuse,
    /// The requested operation cannot be carried out by this transport.
    UnsupportedOperation,
    /// The bus configuration is outside what the part accepts.
    UnsupportedConfig,
}

impl<B: Debug, P: Debug> Debug for BusError<B, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::Spi(spi) => write!(f, "BusError::Spi({:?})", spi),
            BusError::ChipSelect(pin) => write!(f, "BusError::ChipSelect({:?})", pin),
            BusError::TransactionMisuse => write!(f, "BusError::TransactionMisuse"),
            BusError::UnsupportedOperation => write!(f, "BusError::UnsupportedOperation"),
            BusError::UnsupportedConfig => write!(f, "BusError::UnsupportedConfig"),
        }
    }
}

#[cfg(feature = "defmt")]
impl<B, P> Format for BusError<B, P> {
    fn format(&self, fmt: Formatter) {
        match self {
            BusError::Spi(_) => defmt::write!(fmt, "BusError::Spi"),
            BusError::ChipSelect(_) => defmt::write!(fmt, "BusError::ChipSelect"),
            BusError::TransactionMisuse => defmt::write!(fmt, "BusError::TransactionMisuse"),
            BusError::UnsupportedOperation => {
                defmt::write!(fmt, "BusError::UnsupportedOperation")
            }
            BusError::UnsupportedConfig => defmt::write!(fmt, "BusError::UnsupportedConfig"),
        }
    }
}

impl<B, P> spi::Error for BusError<B, P>
where
    B: spi::Error,
    P: Debug,
{
    fn kind(&self) -> ErrorKind {
        match self {
            BusError::Spi(spi) => spi.kind(),
            BusError::ChipSelect(_) | BusError::TransactionMisuse => ErrorKind::ChipSelectFault,
            BusError::UnsupportedOperation | BusError::UnsupportedConfig => ErrorKind::Other,
        }
    }
}
