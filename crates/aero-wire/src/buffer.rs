//! Bounds-checked cursors over wire bytes.
//!
//! Every multi-byte field on either side of the channel goes through
//! [`Producer::reserve`] or [`Consumer::read`]; nothing indexes the raw
//! buffers directly. All integers are little-endian.

use crate::config::WireConfig;
use crate::error::{WireError, WireResult};
use crate::handle::Handle;

#[derive(Debug, Clone, Copy)]
struct CommandWindow {
    start: usize,
    end: usize,
}

/// Append-only writer for outgoing commands.
///
/// Capacity is reserved for a whole command up front in
/// [`Producer::begin_command`], so the backing buffer only grows between
/// commands and never while one is half written.
#[derive(Debug)]
pub struct Producer {
    buf: Vec<u8>,
    command: Option<CommandWindow>,
    initial_capacity: usize,
    max_command_size: usize,
}

impl Producer {
    pub fn new(initial_capacity: usize, max_command_size: usize) -> Self {
        Self {
            buf: Vec::with_capacity(initial_capacity),
            command: None,
            initial_capacity,
            max_command_size,
        }
    }

    pub fn with_config(config: &WireConfig) -> Self {
        Self::new(config.initial_buffer_capacity, config.max_command_size)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn max_command_size(&self) -> usize {
        self.max_command_size
    }

    /// Bytes of fully written commands.
    pub fn as_bytes(&self) -> &[u8] {
        match self.command {
            Some(window) => &self.buf[..window.start],
            None => &self.buf,
        }
    }

    pub fn begin_command(&mut self, size: usize) -> WireResult<()> {
        if size > self.max_command_size {
            return Err(WireError::CommandTooLarge {
                size,
                max: self.max_command_size,
            });
        }
        debug_assert!(self.command.is_none(), "nested wire command");
        self.abort_command();

        let start = self.buf.len();
        let end = start.checked_add(size).ok_or(WireError::CommandTooLarge {
            size,
            max: self.max_command_size,
        })?;
        if end > self.buf.capacity() {
            let target = end.max(self.buf.capacity().saturating_mul(2));
            self.buf.reserve_exact(target - start);
        }
        self.command = Some(CommandWindow { start, end });
        Ok(())
    }

    /// Advance by exactly `n` bytes inside the current command and return them
    /// for the caller to fill.
    pub fn reserve(&mut self, n: usize) -> WireResult<&mut [u8]> {
        let window = self
            .command
            .ok_or(WireError::ProducerOverflow { requested: n })?;
        let start = self.buf.len();
        let end = start
            .checked_add(n)
            .filter(|&end| end <= window.end)
            .ok_or(WireError::ProducerOverflow { requested: n })?;
        self.buf.resize(end, 0);
        Ok(&mut self.buf[start..end])
    }

    pub fn end_command(&mut self) -> WireResult<()> {
        let Some(window) = self.command.take() else {
            return Err(WireError::ProducerOverflow { requested: 0 });
        };
        let predicted = window.end - window.start;
        let written = self.buf.len() - window.start;
        debug_assert_eq!(written, predicted, "wire command size prediction is wrong");
        if written != predicted {
            self.buf.truncate(window.start);
            return Err(WireError::SizeMismatch { predicted, written });
        }
        Ok(())
    }

    /// Drop whatever part of the current command was written.
    pub fn abort_command(&mut self) {
        if let Some(window) = self.command.take() {
            self.buf.truncate(window.start);
        }
    }

    /// Hand the completed commands to the transport.
    pub fn take(&mut self) -> Vec<u8> {
        self.abort_command();
        std::mem::replace(&mut self.buf, Vec::with_capacity(self.initial_capacity))
    }

    pub fn put_u8(&mut self, v: u8) -> WireResult<()> {
        self.reserve(1)?[0] = v;
        Ok(())
    }

    pub fn put_bool(&mut self, v: bool) -> WireResult<()> {
        self.put_u8(u8::from(v))
    }

    pub fn put_u16(&mut self, v: u16) -> WireResult<()> {
        self.put_bytes(&v.to_le_bytes())
    }

    pub fn put_u32(&mut self, v: u32) -> WireResult<()> {
        self.put_bytes(&v.to_le_bytes())
    }

    pub fn put_i32(&mut self, v: i32) -> WireResult<()> {
        self.put_bytes(&v.to_le_bytes())
    }

    pub fn put_u64(&mut self, v: u64) -> WireResult<()> {
        self.put_bytes(&v.to_le_bytes())
    }

    pub fn put_f32(&mut self, v: f32) -> WireResult<()> {
        self.put_bytes(&v.to_le_bytes())
    }

    pub fn put_f64(&mut self, v: f64) -> WireResult<()> {
        self.put_bytes(&v.to_le_bytes())
    }

    pub fn put_handle(&mut self, handle: Handle) -> WireResult<()> {
        self.put_u32(handle.id)?;
        self.put_u32(handle.generation)
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> WireResult<()> {
        self.reserve(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }
}

/// Read cursor over one received command.
#[derive(Debug, Clone)]
pub struct Consumer<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Consumer<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read(&mut self, n: usize) -> WireResult<&'a [u8]> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(WireError::BufferOverflow {
                requested: n,
                remaining,
            });
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.bytes[start..self.pos])
    }

    /// Read `count` contiguous elements of `element_size` bytes each.
    ///
    /// The byte length is checked against the remaining input before the
    /// caller allocates anything for the elements.
    pub fn read_array(&mut self, count: u32, element_size: usize) -> WireResult<&'a [u8]> {
        let len = (count as usize)
            .checked_mul(element_size)
            .ok_or(WireError::CountOverflow {
                count: u64::from(count),
                element_size,
            })?;
        self.read(len)
    }

    fn read_fixed<const N: usize>(&mut self) -> WireResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> WireResult<u8> {
        Ok(self.read_fixed::<1>()?[0])
    }

    pub fn read_bool(&mut self) -> WireResult<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(WireError::InvalidBool(other)),
        }
    }

    pub fn read_u16(&mut self) -> WireResult<u16> {
        self.read_fixed().map(u16::from_le_bytes)
    }

    pub fn read_u32(&mut self) -> WireResult<u32> {
        self.read_fixed().map(u32::from_le_bytes)
    }

    pub fn read_i32(&mut self) -> WireResult<i32> {
        self.read_fixed().map(i32::from_le_bytes)
    }

    pub fn read_u64(&mut self) -> WireResult<u64> {
        self.read_fixed().map(u64::from_le_bytes)
    }

    pub fn read_f32(&mut self) -> WireResult<f32> {
        self.read_fixed().map(f32::from_le_bytes)
    }

    pub fn read_f64(&mut self) -> WireResult<f64> {
        self.read_fixed().map(f64::from_le_bytes)
    }

    pub fn read_handle(&mut self) -> WireResult<Handle> {
        let id = self.read_u32()?;
        let generation = self.read_u32()?;
        Ok(Handle { id, generation })
    }

    pub fn expect_empty(&self) -> WireResult<()> {
        match self.remaining() {
            0 => Ok(()),
            remaining => Err(WireError::TrailingBytes { remaining }),
        }
    }
}
