//! Driver and bus configuration.
//!
//! Device timing is not discoverable over the bus, so it lives here instead of
//! in constants. The defaults match the Fujitsu MB85RS256 and Cypress FM25V02
//! class of 32 KiB parts; check them against the datasheet of the fitted chip.

use embedded_hal::spi::{Mode, MODE_0};

use crate::comms::Opcode;
use crate::map::{DEVICE_ID_MAX, SPI_MAX_SPEED};

/// How a write waits for the part to finish before the next command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteCompletion {
    /// Return as soon as the WRITE frame has been sent.
    None,
    /// Poll RDSR until WEL clears, at most `max_polls` times, waiting
    /// `interval_us` between polls. Exceeding the bound is a
    /// [`DeviceTimeout`](crate::Error::DeviceTimeout).
    PollStatus { max_polls: u32, interval_us: u32 },
    /// Wait a fixed time after the WRITE frame.
    SettleDelay { us: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub write_completion: WriteCompletion,
    /// Opcode entering sleep mode, or `None` if the part has none.
    pub sleep_opcode: Option<u8>,
    /// Recovery time after the wake-up chip-select pulse.
    pub wake_delay_us: u32,
    /// Number of bytes returned by RDID.
    pub id_len: usize,
}

impl Config {
    /// SLEEP opcode of the MB85RS / FM25V families (1011 1001b).
    pub const SLEEP_OPCODE: u8 = 0xB9;

    pub const fn new() -> Self {
        Self {
            write_completion: WriteCompletion::PollStatus {
                max_polls: 8,
                interval_us: 1,
            },
            sleep_opcode: Some(Self::SLEEP_OPCODE),
            wake_delay_us: 450,
            id_len: 4,
        }
    }

    pub const fn with_write_completion(mut self, write_completion: WriteCompletion) -> Self {
        self.write_completion = write_completion;
        self
    }

    pub const fn with_sleep_opcode(mut self, sleep_opcode: Option<u8>) -> Self {
        self.sleep_opcode = sleep_opcode;
        self
    }

    pub const fn with_wake_delay_us(mut self, wake_delay_us: u32) -> Self {
        self.wake_delay_us = wake_delay_us;
        self
    }

    pub const fn with_id_len(mut self, id_len: usize) -> Self {
        self.id_len = id_len;
        self
    }

    /// Rejects settings that cannot be right for any part: a sleep opcode
    /// that collides with WREN, an empty or oversized ID, or a status poll
    /// that never polls.
    pub fn validate(&self) -> bool {
        if self.sleep_opcode == Some(Opcode::WriteEnable as u8) {
            return false;
        }
        if self.id_len == 0 || self.id_len > DEVICE_ID_MAX {
            return false;
        }
        !matches!(
            self.write_completion,
            WriteCompletion::PollStatus { max_polls: 0, .. }
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Physical bus settings the part expects. The HAL owning the SPI peripheral
/// has to be set up accordingly; [`FramBus::new`](crate::FramBus::new) only
/// checks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    pub frequency_hz: u32,
    pub mode: Mode,
    pub msb_first: bool,
}

impl BusConfig {
    pub const DEFAULT: Self = Self {
        frequency_hz: SPI_MAX_SPEED,
        mode: MODE_0,
        msb_first: true,
    };

    pub fn is_supported(&self) -> bool {
        self.frequency_hz > 0
            && self.frequency_hz <= SPI_MAX_SPEED
            && self.mode == MODE_0
            && self.msb_first
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::spi::MODE_3;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate());
    }

    #[test]
    fn sleep_opcode_must_not_alias_wren() {
        let config = Config::new().with_sleep_opcode(Some(0x06));
        assert!(!config.validate());
        assert!(Config::new().with_sleep_opcode(None).validate());
    }

    #[test]
    fn id_len_is_bounded() {
        assert!(!Config::new().with_id_len(0).validate());
        assert!(Config::new().with_id_len(DEVICE_ID_MAX).validate());
        assert!(!Config::new().with_id_len(DEVICE_ID_MAX + 1).validate());
    }

    #[test]
    fn zero_poll_bound_is_rejected() {
        let config = Config::new().with_write_completion(WriteCompletion::PollStatus {
            max_polls: 0,
            interval_us: 1,
        });
        assert!(!config.validate());
    }

    #[test]
    fn bus_config_limits() {
        assert!(BusConfig::DEFAULT.is_supported());
        let slow = BusConfig {
            frequency_hz: 4_000_000,
            ..BusConfig::DEFAULT
        };
        assert!(slow.is_supported());
        let fast = BusConfig {
            frequency_hz: 40_000_000,
            ..BusConfig::DEFAULT
        };
        assert!(!fast.is_supported());
        let mode3 = BusConfig {
            mode: MODE_3,
            ..BusConfig::DEFAULT
        };
        assert!(!mode3.is_supported());
        let lsb = BusConfig {
            msb_first: false,
            ..BusConfig::DEFAULT
        };
        assert!(!lsb.is_supported());
    }
}
