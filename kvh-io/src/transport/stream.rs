//! Replay of recorded captures from any `Read` source

use super::Transport;
use crate::error::Result;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

/// Transport over a file, stdin, or any other reader
pub struct StreamTransport<R> {
    reader: R,
    eof: bool,
}

impl<R: Read + Send> StreamTransport<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, eof: false }
    }
}

impl StreamTransport<BufReader<File>> {
    /// Open a raw capture file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        log::info!("Replaying capture: {}", path.as_ref().display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read + Send> Transport for StreamTransport<R> {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        if self.eof {
            return Ok(0);
        }
        loop {
            match self.reader.read(buffer) {
                Ok(0) if !buffer.is_empty() => {
                    self.eof = true;
                    return Ok(0);
                }
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn write(&mut self, _data: &[u8]) -> Result<usize> {
        Err(std::io::Error::new(ErrorKind::Unsupported, "capture replay is read-only").into())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn at_end(&self) -> bool {
        self.eof
    }
}
