use super::{BusPeripheral, Engine, Error, Operation};

/// Blocking entry points. Each call owns the bus until the transaction has
/// finished or failed.
///
/// Failures are also tallied in [`Master::error_count`]; the engine never
/// retries, since only the caller knows whether repeating a transaction is
/// safe for a given peer.
pub struct Master<'d, P: BusPeripheral> {
    engine: &'d Engine<P>,
}

impl<'d, P: BusPeripheral> Master<'d, P> {
    pub(crate) fn new(engine: &'d Engine<P>) -> Self {
        Self { engine }
    }

    /// Start, address (write), `bytes`, stop.
    pub fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Error> {
        self.execute(Operation::write(address, bytes))
    }

    /// Start, address (read), `buffer.len()` bytes with the last one NACKed,
    /// stop. The buffer is left untouched if the peer does not answer.
    pub fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Error> {
        self.execute(Operation::read(address, buffer))
    }

    /// Write phase and read phase joined by a repeated start.
    pub fn write_then_read(
        &mut self,
        address: u8,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Error> {
        self.execute(Operation::write_then_read(address, bytes, buffer))
    }

    /// Write whose bytes are produced on demand. `callback` gets the number of
    /// bytes already sent and returns `None` to end the write.
    ///
    /// ```ignore
    /// // Clear a 128x32 display: one control byte, then 512 zero bytes.
    /// master.write_with_callback(0x3C, |n| match n {
    ///     0 => Some(0x40),
    ///     1..=512 => Some(0),
    ///     _ => None,
    /// })?;
    /// ```
    pub fn write_with_callback<F>(&mut self, address: u8, mut callback: F) -> Result<(), Error>
    where
        F: FnMut(usize) -> Option<u8> + Send,
    {
        self.execute(Operation::stream(address, &mut callback))
    }

    pub fn error_count(&self) -> u32 {
        self.engine.error_count()
    }

    pub fn recovery_count(&self) -> u32 {
        self.engine.recovery_count()
    }

    fn execute(&mut self, operation: Operation<'_>) -> Result<(), Error> {
        self.engine.transact(operation).map_err(|reason| Error {
            #[cfg(feature = "dump")]
            dump: self.engine.dump_state(),
            reason,
        })
    }
}

impl<P: BusPeripheral> Drop for Master<'_, P> {
    fn drop(&mut self) {
        self.engine.release_master();
    }
}
