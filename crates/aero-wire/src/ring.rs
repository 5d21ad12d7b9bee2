//! Single-producer/single-consumer byte ring used as an in-process transport.
//!
//! Records are length-prefixed transport chunks, 4-byte aligned. When a record
//! does not fit before the end of the buffer the producer writes a wrap marker
//! (or leaves fewer than 4 bytes of implicit padding) and continues at offset
//! zero. The wire protocol on top never assumes chunk boundaries line up with
//! command boundaries, so producers are free to split output however the ring
//! has room.

use core::sync::atomic::{AtomicU32, Ordering};

const RECORD_ALIGN: usize = 4;
const LEN_PREFIX: usize = 4;
const WRAP_MARKER: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushError {
    Full,
    TooLarge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopError {
    Empty,
    /// A record length that cannot be right.
    Corrupt,
}

const fn align_up(v: usize, align: usize) -> usize {
    (v + align - 1) & !(align - 1)
}

/// Bytes a chunk of `payload_len` bytes occupies in the ring.
pub const fn record_size(payload_len: usize) -> usize {
    align_up(LEN_PREFIX + payload_len, RECORD_ALIGN)
}

pub struct ChunkRing {
    cap: u32,
    /// Consumer position; only the consumer stores it.
    head: AtomicU32,
    /// Producer position; only the producer stores it.
    tail: AtomicU32,

    data_ptr: *mut u8,
    _storage: Box<[u8]>,
}

// The producer only writes bytes between `tail` and `head + cap`, the consumer
// only reads bytes between `head` and `tail`, and each side publishes its
// position with release ordering after touching the data.
unsafe impl Send for ChunkRing {}
unsafe impl Sync for ChunkRing {}

impl core::fmt::Debug for ChunkRing {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChunkRing")
            .field("cap", &self.cap)
            .field("head", &self.head.load(Ordering::Relaxed))
            .field("tail", &self.tail.load(Ordering::Relaxed))
            .finish()
    }
}

impl ChunkRing {
    /// `capacity_bytes` must be a power of two and at least 4, so positions
    /// stay consistent when the `u32` counters wrap.
    pub fn new(capacity_bytes: usize) -> Self {
        assert!(capacity_bytes.is_power_of_two());
        assert!(capacity_bytes >= RECORD_ALIGN);
        assert!(capacity_bytes < u32::MAX as usize);
        let mut storage = vec![0u8; capacity_bytes].into_boxed_slice();
        let data_ptr = storage.as_mut_ptr();
        Self {
            cap: capacity_bytes as u32,
            head: AtomicU32::new(0),
            tail: AtomicU32::new(0),
            data_ptr,
            _storage: storage,
        }
    }

    pub fn capacity_bytes(&self) -> usize {
        self.cap as usize
    }

    /// Largest chunk that fits into an empty ring wherever its cursors are.
    pub fn max_chunk_len(&self) -> usize {
        (self.cap as usize / 2).saturating_sub(LEN_PREFIX)
    }

    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    /// Producer side: enqueue one chunk.
    pub fn try_push(&self, chunk: &[u8]) -> Result<(), PushError> {
        if chunk.len() > self.max_chunk_len() {
            return Err(PushError::TooLarge);
        }
        let record = record_size(chunk.len());

        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        let free = self.cap - tail.wrapping_sub(head);

        let tail_index = (tail % self.cap) as usize;
        let until_end = self.cap as usize - tail_index;
        let (padding, wrap_marker) = if until_end < LEN_PREFIX {
            (until_end, false)
        } else if until_end < record {
            (until_end, true)
        } else {
            (0, false)
        };
        if (padding + record) as u32 > free {
            return Err(PushError::Full);
        }

        // SAFETY: `tail_index..tail_index + padding` and the record that
        // follows lie inside the free region computed above, which the
        // consumer does not read until `tail` is published below.
        unsafe {
            if wrap_marker {
                write_u32_le(self.data_ptr.add(tail_index), WRAP_MARKER);
            }
            let start = (tail_index + padding) % self.cap as usize;
            write_u32_le(self.data_ptr.add(start), chunk.len() as u32);
            core::ptr::copy_nonoverlapping(
                chunk.as_ptr(),
                self.data_ptr.add(start + LEN_PREFIX),
                chunk.len(),
            );
        }

        self.tail
            .store(tail.wrapping_add((padding + record) as u32), Ordering::Release);
        Ok(())
    }

    /// Producer side: split `bytes` into chunks of at most `max_chunk` bytes
    /// and push as many as fit. Returns how many bytes were accepted.
    pub fn push_chunks(&self, bytes: &[u8], max_chunk: usize) -> usize {
        let max_chunk = max_chunk.clamp(1, self.max_chunk_len().max(1));
        let mut pushed = 0;
        for chunk in bytes.chunks(max_chunk) {
            match self.try_push(chunk) {
                Ok(()) => pushed += chunk.len(),
                Err(_) => break,
            }
        }
        pushed
    }

    /// Consumer side: dequeue one chunk.
    pub fn try_pop(&self) -> Result<Vec<u8>, PopError> {
        loop {
            let head = self.head.load(Ordering::Relaxed);
            let tail = self.tail.load(Ordering::Acquire);
            if head == tail {
                return Err(PopError::Empty);
            }

            let head_index = (head % self.cap) as usize;
            let until_end = self.cap as usize - head_index;
            if until_end < LEN_PREFIX {
                self.head
                    .store(head.wrapping_add(until_end as u32), Ordering::Release);
                continue;
            }

            // SAFETY: `head != tail`, so at least a length prefix (or wrap
            // marker) has been published at `head_index`.
            let len = unsafe { read_u32_le(self.data_ptr.add(head_index)) };
            if len == WRAP_MARKER {
                self.head
                    .store(head.wrapping_add(until_end as u32), Ordering::Release);
                continue;
            }

            let record = record_size(len as usize);
            if record > until_end || record as u32 > tail.wrapping_sub(head) {
                return Err(PopError::Corrupt);
            }

            let mut out = vec![0u8; len as usize];
            // SAFETY: the whole record was published before `tail` and lies
            // inside the buffer (checked above).
            unsafe {
                core::ptr::copy_nonoverlapping(
                    self.data_ptr.add(head_index + LEN_PREFIX),
                    out.as_mut_ptr(),
                    out.len(),
                );
            }
            self.head
                .store(head.wrapping_add(record as u32), Ordering::Release);
            return Ok(out);
        }
    }
}

fn read_u32_le(ptr: *const u8) -> u32 {
    let mut tmp = [0u8; 4];
    // SAFETY: callers pass a pointer with 4 readable bytes.
    unsafe { core::ptr::copy_nonoverlapping(ptr, tmp.as_mut_ptr(), 4) };
    u32::from_le_bytes(tmp)
}

fn write_u32_le(ptr: *mut u8, v: u32) {
    let bytes = v.to_le_bytes();
    // SAFETY: callers pass a pointer with 4 writable bytes.
    unsafe { core::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, 4) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_come_out_in_order_across_wraps() {
        let ring = ChunkRing::new(32);
        for round in 0u8..20 {
            let chunk = vec![round; (round % 7) as usize];
            ring.try_push(&chunk).unwrap();
            assert_eq!(ring.try_pop().unwrap(), chunk);
        }
        assert_eq!(ring.try_pop(), Err(PopError::Empty));
    }

    #[test]
    fn full_and_too_large_are_distinguished() {
        let ring = ChunkRing::new(32);
        assert_eq!(ring.try_push(&[0; 13]), Err(PushError::TooLarge));
        ring.try_push(&[1; 12]).unwrap();
        ring.try_push(&[2; 12]).unwrap();
        assert_eq!(ring.try_push(&[3; 4]), Err(PushError::Full));
        assert_eq!(ring.try_pop().unwrap(), vec![1; 12]);
        ring.try_push(&[3; 4]).unwrap();
        assert_eq!(ring.try_pop().unwrap(), vec![2; 12]);
        assert_eq!(ring.try_pop().unwrap(), vec![3; 4]);
        assert!(ring.is_empty());
    }

    #[test]
    fn push_chunks_reports_accepted_prefix() {
        let ring = ChunkRing::new(32);
        let bytes: Vec<u8> = (0..40).collect();
        // Each 6-byte chunk takes a 12-byte record; two fit.
        assert_eq!(ring.push_chunks(&bytes, 6), 12);
        let mut out = ring.try_pop().unwrap();
        out.extend(ring.try_pop().unwrap());
        assert_eq!(out, &bytes[..12]);
    }
}
