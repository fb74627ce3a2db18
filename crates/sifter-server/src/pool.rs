//! Message buffer pool.
//!
//! Fixed-size byte buffers lent to request tasks and reclaimed when the
//! response has been written (or the request dropped). A buffer belongs
//! to exactly one request between `get` and `put`.

use parking_lot::Mutex;
use sifter_proto::MAX_UDP_MESSAGE_SIZE;

/// Upper bound on idle buffers kept for reuse.
const MAX_POOLED: usize = 1024;

/// Pool of fixed-size message buffers.
#[derive(Debug)]
pub struct BufferPool {
    buffers: Mutex<Vec<Vec<u8>>>,
    buffer_size: usize,
}

impl BufferPool {
    /// Creates a pool of buffers sized to the legacy UDP minimum (512).
    pub fn new() -> Self {
        Self::with_buffer_size(MAX_UDP_MESSAGE_SIZE)
    }

    /// Creates a pool with a custom buffer size.
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            buffers: Mutex::new(Vec::new()),
            buffer_size,
        }
    }

    /// Returns the size of the buffers this pool hands out.
    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Returns the number of idle buffers.
    pub fn idle(&self) -> usize {
        self.buffers.lock().len()
    }

    /// Takes a zeroed buffer of `buffer_size` bytes from the pool,
    /// allocating when the pool is empty.
    pub fn get(&self) -> Vec<u8> {
        match self.buffers.lock().pop() {
            Some(buffer) => buffer,
            None => vec![0u8; self.buffer_size],
        }
    }

    /// Returns a buffer to the pool.
    ///
    /// The buffer is re-zeroed so no request ever observes another
    /// request's bytes. Buffers beyond the idle bound are dropped.
    pub fn put(&self, mut buffer: Vec<u8>) {
        if buffer.len() != self.buffer_size {
            return;
        }
        buffer.fill(0);

        let mut buffers = self.buffers.lock();
        if buffers.len() < MAX_POOLED {
            buffers.push(buffer);
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}
