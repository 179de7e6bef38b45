//! A simulated 32 KiB SPI FRAM part, seen through the embedded-hal traits.
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use embedded_hal::digital::{self, OutputPin};
use embedded_hal::spi::{self, ErrorKind, ErrorType, Operation, SpiBus};
use fram_ctrl_rs::{BusConfig, Config, Fram, FramBus, FRAM_SIZE};

const WREN: u8 = 0x06;
const WRDI: u8 = 0x04;
const RDSR: u8 = 0x05;
const WRSR: u8 = 0x01;
const READ: u8 = 0x03;
const WRITE: u8 = 0x02;
const RDID: u8 = 0x9F;
const SLEEP: u8 = 0xB9;

/// Status bits the part lets WRSR change (WPEN, BP1, BP0).
const WRSR_MASK: u8 = 0b1000_1100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimError;

impl spi::Error for SimError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

impl digital::Error for SimError {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

pub struct Chip {
    pub memory: Vec<u8>,
    /// Status bits other than WEL.
    pub status: u8,
    pub wel: bool,
    pub asleep: bool,
    pub id: Vec<u8>,
    pub cs_low: bool,
    /// MOSI bytes of every completed frame, empty for wake-up pulses.
    pub frames: Vec<Vec<u8>>,
    /// WREN has no effect.
    pub ignore_wren: bool,
    /// WEL never clears after a write.
    pub wel_sticks: bool,
    /// Total bytes after which the bus starts failing.
    pub fail_after: Option<usize>,
    pub bytes_clocked: usize,
    frame: Vec<u8>,
    waking: bool,
}

pub type Shared = Rc<RefCell<Chip>>;

impl Chip {
    pub fn new() -> Shared {
        Rc::new(RefCell::new(Chip {
            memory: vec![0; FRAM_SIZE],
            status: 0,
            wel: false,
            asleep: false,
            id: vec![0x04, 0x7F, 0x05, 0x09],
            cs_low: false,
            frames: Vec::new(),
            ignore_wren: false,
            wel_sticks: false,
            fail_after: None,
            bytes_clocked: 0,
            frame: Vec::new(),
            waking: false,
        }))
    }

    pub fn status_byte(&self) -> u8 {
        self.status | if self.wel { 0x02 } else { 0 }
    }

    /// First byte of every non-empty frame.
    pub fn opcodes(&self) -> Vec<u8> {
        self.frames.iter().filter_map(|f| f.first().copied()).collect()
    }

    /// Number of frames that were only a chip-select pulse.
    pub fn pulses(&self) -> usize {
        self.frames.iter().filter(|f| f.is_empty()).count()
    }

    fn select(&mut self) {
        self.cs_low = true;
        self.frame.clear();
        if self.asleep {
            self.asleep = false;
            self.waking = true;
        }
    }

    fn deselect(&mut self) {
        if !self.cs_low {
            return;
        }
        self.cs_low = false;
        let frame = std::mem::take(&mut self.frame);
        self.frames.push(frame.clone());
        if std::mem::take(&mut self.waking) {
            return;
        }
        match frame.first().copied() {
            Some(WREN) if !self.ignore_wren => self.wel = true,
            Some(WRDI) => self.wel = false,
            Some(WRITE) | Some(WRSR) if !self.wel_sticks => self.wel = false,
            Some(SLEEP) => self.asleep = true,
            _ => {}
        }
    }

    fn exchange(&mut self, out: u8) -> Result<u8, SimError> {
        if let Some(limit) = self.fail_after {
            if self.bytes_clocked >= limit {
                return Err(SimError);
            }
        }
        self.bytes_clocked += 1;
        if !self.cs_low {
            return Ok(0xFF);
        }
        if self.waking {
            return Ok(0);
        }
        self.frame.push(out);
        let pos = self.frame.len() - 1;
        if pos == 0 {
            return Ok(0);
        }
        // Address of the current data byte; the part wraps at the top.
        let at = if pos >= 3 {
            let base = u16::from_be_bytes([self.frame[1], self.frame[2]]) as usize;
            (base + pos - 3) % FRAM_SIZE
        } else {
            0
        };
        let miso = match self.frame[0] {
            RDSR => self.status_byte(),
            RDID => self.id.get(pos - 1).copied().unwrap_or(0),
            READ if pos >= 3 => self.memory[at],
            WRITE if pos >= 3 => {
                if self.wel {
                    self.memory[at] = out;
                }
                0
            }
            WRSR if pos == 1 => {
                if self.wel {
                    self.status = (self.status & !WRSR_MASK) | (out & WRSR_MASK);
                }
                0
            }
            _ => 0,
        };
        Ok(miso)
    }
}

pub struct SimBus(pub Shared);

impl ErrorType for SimBus {
    type Error = SimError;
}

impl SpiBus for SimBus {
    fn read(&mut self, words: &mut [u8]) -> Result<(), SimError> {
        for w in words {
            *w = self.0.borrow_mut().exchange(0)?;
        }
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), SimError> {
        for &w in words {
            self.0.borrow_mut().exchange(w)?;
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), SimError> {
        for i in 0..read.len().max(write.len()) {
            let miso = self
                .0
                .borrow_mut()
                .exchange(write.get(i).copied().unwrap_or(0))?;
            if let Some(r) = read.get_mut(i) {
                *r = miso;
            }
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), SimError> {
        for w in words {
            *w = self.0.borrow_mut().exchange(*w)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SimError> {
        Ok(())
    }
}

pub struct SimCs(pub Shared);

impl digital::ErrorType for SimCs {
    type Error = SimError;
}

impl OutputPin for SimCs {
    fn set_low(&mut self) -> Result<(), SimError> {
        self.0.borrow_mut().select();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), SimError> {
        self.0.borrow_mut().deselect();
        Ok(())
    }
}

/// Async device with chip-select handled per transaction.
pub struct AsyncSimDevice(pub Shared);

impl ErrorType for AsyncSimDevice {
    type Error = SimError;
}

impl AsyncSimDevice {
    fn run(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), SimError> {
        let mut bus = SimBus(self.0.clone());
        for op in operations {
            match op {
                Operation::Read(buf) => bus.read(buf)?,
                Operation::Write(buf) => bus.write(buf)?,
                Operation::Transfer(read, write) => bus.transfer(read, write)?,
                Operation::TransferInPlace(buf) => bus.transfer_in_place(buf)?,
                Operation::DelayNs(_) => {}
            }
        }
        Ok(())
    }
}

impl embedded_hal_async::spi::SpiDevice for AsyncSimDevice {
    async fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), SimError> {
        self.0.borrow_mut().select();
        let result = self.run(operations);
        self.0.borrow_mut().deselect();
        result
    }
}

/// Delay that returns at once and remembers what it was asked for.
#[derive(Clone, Default)]
pub struct SimDelay(pub Rc<RefCell<Vec<u32>>>);

impl SimDelay {
    pub fn total_ns(&self) -> u64 {
        self.0.borrow().iter().map(|&ns| ns as u64).sum()
    }

    pub fn calls(&self) -> usize {
        self.0.borrow().len()
    }
}

impl embedded_hal::delay::DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().push(ns);
    }
}

impl embedded_hal_async::delay::DelayNs for SimDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().push(ns);
    }
}

pub type SimFram = Fram<FramBus<SimBus, SimCs>, SimDelay>;

pub fn sim_bus(chip: &Shared) -> FramBus<SimBus, SimCs> {
    FramBus::new(
        SimBus(chip.clone()),
        SimCs(chip.clone()),
        &BusConfig::DEFAULT,
    )
    .unwrap()
}

pub fn sim_fram(config: Config) -> (SimFram, Shared, SimDelay) {
    let chip = Chip::new();
    let delay = SimDelay::default();
    let fram = Fram::new(sim_bus(&chip), delay.clone(), config).unwrap();
    (fram, chip, delay)
}
