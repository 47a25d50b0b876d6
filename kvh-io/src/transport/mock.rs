//! Mock transport for testing

use super::Transport;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Mock transport with scripted reads and recorded writes
///
/// Each injected chunk is returned by at most one `read` call, so tests control
/// exactly how the stream is split. Clones share the same queue.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Default)]
struct MockTransportInner {
    chunks: VecDeque<Vec<u8>>,
    written: Vec<u8>,
    closed: bool,
    fail_next: Option<std::io::ErrorKind>,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a chunk to be returned by a later read
    pub fn inject_read(&self, data: &[u8]) {
        self.inner.lock().chunks.push_back(data.to_vec());
    }

    /// Mark the stream as ended once queued chunks are consumed
    pub fn close(&self) {
        self.inner.lock().closed = true;
    }

    /// Make the next read fail with an I/O error
    pub fn fail_next_read(&self, kind: std::io::ErrorKind) {
        self.inner.lock().fail_next = Some(kind);
    }

    /// Get all written data
    pub fn written(&self) -> Vec<u8> {
        self.inner.lock().written.clone()
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        if let Some(kind) = inner.fail_next.take() {
            return Err(Error::Io(std::io::Error::new(kind, "injected failure")));
        }
        let Some(mut chunk) = inner.chunks.pop_front() else {
            return Ok(0);
        };

        let n = chunk.len().min(buffer.len());
        buffer[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            chunk.drain(..n);
            inner.chunks.push_front(chunk);
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.inner.lock().written.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn at_end(&self) -> bool {
        let inner = self.inner.lock();
        inner.closed && inner.chunks.is_empty()
    }
}
