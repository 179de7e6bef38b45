//! Driver for a 32 KiB SPI ferroelectric RAM (FRAM) used as the sample store
//! of a current-sensing module.
//!
//! The driver is split in three layers:
//!
//! - [`bus::FramBus`] owns the SPI bus and the chip-select line and hands out
//!   scoped [`bus::Transaction`]s that always release chip-select.
//! - [`comms::FramSpi`] frames the FRAM command set (WREN, WRDI, RDSR, WRSR,
//!   READ, WRITE, RDID, SLEEP) on top of any [`embedded_hal::spi::SpiDevice`].
//! - [`storage::Fram`] (and [`async_comms::AsyncFram`]) read and write the
//!   data region, hiding write-enable sequencing and status polling.
//!
//! ```ignore
//! let bus = FramBus::new(spi, cs, &BusConfig::DEFAULT)?;
//! let mut fram = Fram::new(bus, delay, Config::default())?;
//!
//! let page = DataBuffer::from_words(&samples);
//! fram.write_page(FRAM_BASE_ADDRESS, &page)?;
//!
//! let mut readback = DataBuffer::new();
//! fram.read_page(FRAM_BASE_ADDRESS, FRAM_DATA_SIZE, &mut readback)?;
//! ```
#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// Must come first so the macros are visible to the other modules.
#[macro_use]
mod fmt;

pub mod async_comms;
pub mod bus;
pub mod comms;
pub mod config;
pub mod error;
pub mod map;
pub mod page;
pub mod storage;
pub mod traits;

pub use async_comms::AsyncFram;
pub use bus::{FramBus, Transaction};
pub use comms::{FramSpi, Opcode, Status};
pub use config::{BusConfig, Config, WriteCompletion};
pub use error::{BusError, Error};
pub use map::{FRAM_BASE_ADDRESS, FRAM_DATA_SIZE, FRAM_SIZE};
pub use page::{DataBuffer, DeviceId};
pub use storage::{Fram, OpState};
pub use traits::{AsyncFramStorage, FramStorage};
