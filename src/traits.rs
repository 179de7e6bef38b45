/// Byte-addressed non-volatile storage.
pub trait FramStorage {
    type Error;

    /// Reads memory contents into `buf`, starting at `addr`.
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Writes `data` starting at `addr`. Unlike flash there is no erase step:
    /// any byte can be overwritten in place.
    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), Self::Error>;

    /// Size of the address space in bytes.
    fn capacity(&self) -> usize;
}

#[allow(async_fn_in_trait)]
pub trait AsyncFramStorage {
    type Error;

    /// Reads memory contents into `buf`, starting at `addr`.
    async fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Writes `data` starting at `addr`.
    async fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), Self::Error>;

    /// Size of the address space in bytes.
    fn capacity(&self) -> usize;
}
