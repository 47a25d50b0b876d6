//! Byte sources for the decode pipeline

use crate::error::Result;

mod mock;
mod serial;
mod stream;

pub use mock::MockTransport;
pub use serial::SerialTransport;
pub use stream::StreamTransport;

/// Source of raw IMU bytes
pub trait Transport: Send {
    /// Read data into buffer, returns number of bytes read
    ///
    /// `Ok(0)` means nothing arrived within the read timeout, not end of stream.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Write data from buffer, returns number of bytes written
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Flush any pending writes (blocking until complete)
    fn flush(&mut self) -> Result<()>;

    /// True once the source can never produce more bytes
    fn at_end(&self) -> bool {
        false
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        (**self).read(buffer)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        (**self).write(data)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn at_end(&self) -> bool {
        (**self).at_end()
    }
}
