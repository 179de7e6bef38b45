use crate::map::{DEVICE_ID_MAX, FRAM_DATA_SIZE, FRAM_DATA_WORDS};

const WORD: usize = core::mem::size_of::<u32>();

/// One page of samples: 256 words of 4 bytes.
///
/// The buffer keeps the page in its stored byte form, so reads and writes
/// move it to and from the bus without a copy. Words are little-endian, which
/// is how the sampling firmware lays its `int` array out in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct DataBuffer {
    bytes: [u8; FRAM_DATA_SIZE],
}

impl DataBuffer {
    pub const WORDS: usize = FRAM_DATA_WORDS;

    /// An all-zero page.
    pub const fn new() -> Self {
        Self {
            bytes: [0; FRAM_DATA_SIZE],
        }
    }

    pub fn from_words(words: &[u32; FRAM_DATA_WORDS]) -> Self {
        let mut page = Self::new();
        for (i, &word) in words.iter().enumerate() {
            page.set_word(i, word);
        }
        page
    }

    /// Returns word `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= DataBuffer::WORDS`.
    pub fn word(&self, index: usize) -> u32 {
        let start = index * WORD;
        let mut raw = [0; WORD];
        raw.copy_from_slice(&self.bytes[start..start + WORD]);
        u32::from_le_bytes(raw)
    }

    /// Sets word `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= DataBuffer::WORDS`.
    pub fn set_word(&mut self, index: usize, word: u32) {
        let start = index * WORD;
        self.bytes[start..start + WORD].copy_from_slice(&word.to_le_bytes());
    }

    pub fn words(&self) -> impl Iterator<Item = u32> + '_ {
        self.bytes.chunks_exact(WORD).map(|chunk| {
            let mut raw = [0; WORD];
            raw.copy_from_slice(chunk);
            u32::from_le_bytes(raw)
        })
    }

    pub fn to_words(&self) -> [u32; FRAM_DATA_WORDS] {
        let mut words = [0; FRAM_DATA_WORDS];
        for (dst, src) in words.iter_mut().zip(self.words()) {
            *dst = src;
        }
        words
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub fn clear(&mut self) {
        self.bytes = [0; FRAM_DATA_SIZE];
    }
}

impl Default for DataBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for DataBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.words()).finish()
    }
}

/// Raw RDID response.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DeviceId {
    bytes: [u8; DEVICE_ID_MAX],
    len: usize,
}

impl DeviceId {
    /// JEDEC continuation code, announcing the manufacturer is in a later bank.
    pub const CONTINUATION: u8 = 0x7F;

    /// Fujitsu manufacturer code.
    pub const MANUFACTURER_FUJITSU: u8 = 0x04;

    /// Cypress (formerly Ramtron) manufacturer code, in bank 7.
    pub const MANUFACTURER_CYPRESS: u8 = 0xC2;

    /// Takes at most [`DEVICE_ID_MAX`] bytes from `raw`.
    pub fn from_bytes(raw: &[u8]) -> Self {
        let len = raw.len().min(DEVICE_ID_MAX);
        let mut bytes = [0; DEVICE_ID_MAX];
        bytes[..len].copy_from_slice(&raw[..len]);
        Self { bytes, len }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the JEDEC bank (number of leading continuation codes) and the
    /// manufacturer code, or `None` if the response is all continuation codes.
    pub fn manufacturer(&self) -> Option<(usize, u8)> {
        let bank = self
            .as_bytes()
            .iter()
            .take_while(|&&b| b == Self::CONTINUATION)
            .count();
        self.as_bytes().get(bank).map(|&code| (bank, code))
    }

    /// The bytes following the manufacturer code.
    pub fn product(&self) -> &[u8] {
        match self.manufacturer() {
            Some((bank, _)) => &self.as_bytes()[bank + 1..],
            None => &[],
        }
    }
}

impl core::fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "DeviceId({:02x?})", self.as_bytes())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DeviceId {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "DeviceId({=[u8]:x})", self.as_bytes())
    }
}
