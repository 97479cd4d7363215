//! Lock-free SPSC byte ring between the PTY reader thread and the UI
//! thread.
//!
//! Exactly one producer (the reader thread writing PTY output) and one
//! consumer (the UI thread pumping the parser) may touch the buffer
//! concurrently; the head and tail counters are monotonic and indexed with
//! a power-of-two mask. One slot is reserved to tell full from empty, so
//! the usable capacity is `capacity() == rounded_capacity - 1`.
//!
//! A short `write` is the only backpressure signal; callers retry or drop
//! per their own policy.

use std::cell::UnsafeCell;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Pad the two counters onto their own cache lines so the producer and
/// consumer don't false-share.
#[repr(align(64))]
struct CacheAligned(AtomicUsize);

pub struct RingBuffer {
    buf: Box<[UnsafeCell<u8>]>,
    mask: usize,
    /// Write position, owned by the producer.
    head: CacheAligned,
    /// Read position, owned by the consumer.
    tail: CacheAligned,
}

// The buffer hands out raw-pointer access to its storage; the SPSC
// head/tail protocol is what makes that sound.
unsafe impl Send for RingBuffer {}
unsafe impl Sync for RingBuffer {}

impl RingBuffer {
    /// Create a ring with at least `capacity` usable bytes; the backing
    /// store is rounded up to a power of two.
    pub fn with_capacity(capacity: usize) -> Self {
        let rounded = capacity.max(2).checked_next_power_of_two().unwrap_or(1 << 20);
        let buf = (0..rounded).map(|_| UnsafeCell::new(0)).collect();
        RingBuffer {
            buf,
            mask: rounded - 1,
            head: CacheAligned(AtomicUsize::new(0)),
            tail: CacheAligned(AtomicUsize::new(0)),
        }
    }

    /// Usable capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buf.len() - 1
    }

    /// Bytes available to read.
    pub fn len(&self) -> usize {
        let head = self.head.0.load(Ordering::Acquire);
        let tail = self.tail.0.load(Ordering::Acquire);
        head.wrapping_sub(tail)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes available to write.
    pub fn available(&self) -> usize {
        self.capacity() - self.len()
    }

    /// Producer side: append as much of `data` as fits, returning the
    /// number of bytes accepted (possibly 0).
    pub fn write(&self, data: &[u8]) -> usize {
        let head = self.head.0.load(Ordering::Relaxed);
        let tail = self.tail.0.load(Ordering::Acquire);
        let free = self.capacity() - head.wrapping_sub(tail);
        let count = data.len().min(free);
        if count == 0 {
            return 0;
        }

        self.copy_in(head, &data[..count]);
        self.head.0.store(head.wrapping_add(count), Ordering::Release);
        count
    }

    /// Consumer side: pop up to `out.len()` bytes in FIFO order.
    pub fn read(&self, out: &mut [u8]) -> usize {
        let count = self.copy_out(out);
        if count > 0 {
            let tail = self.tail.0.load(Ordering::Relaxed);
            self.tail.0.store(tail.wrapping_add(count), Ordering::Release);
        }
        count
    }

    /// Consumer side: copy without consuming.
    pub fn peek(&self, out: &mut [u8]) -> usize {
        self.copy_out(out)
    }

    /// Consumer side: discard up to `count` bytes, returning how many
    /// were dropped.
    pub fn skip(&self, count: usize) -> usize {
        let tail = self.tail.0.load(Ordering::Relaxed);
        let head = self.head.0.load(Ordering::Acquire);
        let count = count.min(head.wrapping_sub(tail));
        if count > 0 {
            self.tail.0.store(tail.wrapping_add(count), Ordering::Release);
        }
        count
    }

    /// Drop everything. Not safe while the other side is active.
    pub fn clear(&self) {
        self.head.0.store(0, Ordering::Relaxed);
        self.tail.0.store(0, Ordering::Relaxed);
    }

    fn copy_in(&self, head: usize, data: &[u8]) {
        let idx = head & self.mask;
        let first = data.len().min(self.buf.len() - idx);
        unsafe {
            ptr::copy_nonoverlapping(data.as_ptr(), self.buf[idx].get(), first);
            if first < data.len() {
                ptr::copy_nonoverlapping(
                    data.as_ptr().add(first),
                    self.buf[0].get(),
                    data.len() - first,
                );
            }
        }
    }

    fn copy_out(&self, out: &mut [u8]) -> usize {
        let tail = self.tail.0.load(Ordering::Relaxed);
        let head = self.head.0.load(Ordering::Acquire);
        let count = out.len().min(head.wrapping_sub(tail));
        if count == 0 {
            return 0;
        }
        let idx = tail & self.mask;
        let first = count.min(self.buf.len() - idx);
        unsafe {
            ptr::copy_nonoverlapping(self.buf[idx].get(), out.as_mut_ptr(), first);
            if first < count {
                ptr::copy_nonoverlapping(
                    self.buf[0].get(),
                    out.as_mut_ptr().add(first),
                    count - first,
                );
            }
        }
        count
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn capacity_rounds_to_power_of_two() {
        let ring = RingBuffer::with_capacity(1000);
        assert_eq!(ring.capacity(), 1023);
        assert_eq!(ring.len() + ring.available() + 1, 1024);
    }

    #[test]
    fn fifo_roundtrip() {
        let ring = RingBuffer::with_capacity(64);
        assert_eq!(ring.write(b"hello world"), 11);
        assert_eq!(ring.len(), 11);

        let mut out = [0u8; 16];
        let n = ring.read(&mut out);
        assert_eq!(&out[..n], b"hello world");
        assert!(ring.is_empty());
    }

    #[test]
    fn write_is_partial_when_full() {
        let ring = RingBuffer::with_capacity(8);
        // 8 rounds to 8, usable 7.
        assert_eq!(ring.capacity(), 7);
        assert_eq!(ring.write(b"0123456789"), 7);
        assert_eq!(ring.write(b"x"), 0);

        let mut out = [0u8; 4];
        assert_eq!(ring.read(&mut out), 4);
        assert_eq!(ring.write(b"abcdef"), 4);
    }

    #[test]
    fn peek_does_not_consume() {
        let ring = RingBuffer::with_capacity(16);
        ring.write(b"abc");
        let mut out = [0u8; 8];
        assert_eq!(ring.peek(&mut out), 3);
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.read(&mut out), 3);
        assert_eq!(&out[..3], b"abc");
    }

    #[test]
    fn skip_discards() {
        let ring = RingBuffer::with_capacity(16);
        ring.write(b"abcdef");
        assert_eq!(ring.skip(2), 2);
        let mut out = [0u8; 8];
        let n = ring.read(&mut out);
        assert_eq!(&out[..n], b"cdef");
        assert_eq!(ring.skip(10), 0);
    }

    #[test]
    fn wraparound_preserves_order() {
        let ring = RingBuffer::with_capacity(8);
        let mut out = [0u8; 8];
        // Push the counters past the boundary several times.
        for round in 0u8..50 {
            let data = [round, round.wrapping_add(1), round.wrapping_add(2)];
            assert_eq!(ring.write(&data), 3);
            let n = ring.read(&mut out[..3]);
            assert_eq!(&out[..n], &data);
        }
    }

    #[test]
    fn cross_thread_fifo() {
        let ring = Arc::new(RingBuffer::with_capacity(256));
        let total: usize = 100_000;

        let producer = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                let mut sent = 0usize;
                while sent < total {
                    let byte = [(sent % 251) as u8];
                    if ring.write(&byte) == 1 {
                        sent += 1;
                    } else {
                        thread::yield_now();
                    }
                }
            })
        };

        let mut received = 0usize;
        let mut buf = [0u8; 64];
        while received < total {
            let n = ring.read(&mut buf);
            for &b in &buf[..n] {
                assert_eq!(b, (received % 251) as u8);
                received += 1;
            }
            if n == 0 {
                thread::yield_now();
            }
        }
        producer.join().unwrap();
        assert!(ring.is_empty());
    }
}
