//! Reassembly of whole commands from arbitrarily split transport chunks.

use crate::config::{WireConfig, HEADER_SIZE};
use crate::error::{WireError, WireResult};
use crate::schema::CommandHeader;

/// Carry-over buffers larger than this are released once drained.
const RETAINED_CARRY_CAPACITY: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingHeader,
    AwaitingBody { size: usize },
}

/// Turns a stream of transport chunks into whole commands, in order.
///
/// Commands that lie entirely inside one chunk are handed out straight from
/// that chunk; only commands that straddle a chunk boundary are copied into
/// the carry-over buffer. A declared size outside
/// `HEADER_SIZE..=max_command_size` is rejected before any of its body is
/// buffered.
///
/// Any error poisons the handler: the stream position can no longer be
/// trusted, so every later chunk is refused with [`WireError::Disconnected`].
#[derive(Debug)]
pub struct ChunkedCommandHandler {
    state: State,
    carry: Vec<u8>,
    max_command_size: usize,
    poisoned: bool,
}

impl ChunkedCommandHandler {
    pub fn new(max_command_size: usize) -> Self {
        Self {
            state: State::AwaitingHeader,
            carry: Vec::new(),
            max_command_size,
            poisoned: false,
        }
    }

    pub fn with_config(config: &WireConfig) -> Self {
        Self::new(config.max_command_size)
    }

    /// True when no partial command is buffered.
    pub fn is_idle(&self) -> bool {
        self.state == State::AwaitingHeader && self.carry.is_empty()
    }

    pub fn buffered_len(&self) -> usize {
        self.carry.len()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Feed one chunk, calling `dispatch` for each command it completes.
    pub fn handle_chunk<F>(&mut self, chunk: &[u8], mut dispatch: F) -> WireResult<()>
    where
        F: FnMut(&[u8]) -> WireResult<()>,
    {
        if self.poisoned {
            return Err(WireError::Disconnected);
        }
        let result = self.process(chunk, &mut dispatch);
        if result.is_err() {
            self.poison();
        }
        result
    }

    /// Refuse all further input.
    pub fn poison(&mut self) {
        self.poisoned = true;
        self.state = State::AwaitingHeader;
        self.carry = Vec::new();
    }

    fn validate(&self, header: CommandHeader) -> WireResult<usize> {
        if header.size < HEADER_SIZE || header.size > self.max_command_size {
            return Err(WireError::InvalidCommandSize {
                size: header.size,
                min: HEADER_SIZE,
                max: self.max_command_size,
            });
        }
        Ok(header.size)
    }

    fn process<F>(&mut self, mut chunk: &[u8], dispatch: &mut F) -> WireResult<()>
    where
        F: FnMut(&[u8]) -> WireResult<()>,
    {
        loop {
            match self.state {
                State::AwaitingHeader if self.carry.is_empty() => {
                    let Some(header) = CommandHeader::peek(chunk) else {
                        self.carry.extend_from_slice(chunk);
                        return Ok(());
                    };
                    let size = self.validate(header)?;
                    if chunk.len() >= size {
                        let (command, rest) = chunk.split_at(size);
                        dispatch(command)?;
                        chunk = rest;
                        continue;
                    }
                    self.carry.reserve_exact(size);
                    self.carry.extend_from_slice(chunk);
                    self.state = State::AwaitingBody { size };
                    return Ok(());
                }
                State::AwaitingHeader => {
                    let take = (HEADER_SIZE - self.carry.len()).min(chunk.len());
                    self.carry.extend_from_slice(&chunk[..take]);
                    chunk = &chunk[take..];
                    let Some(header) = CommandHeader::peek(&self.carry) else {
                        return Ok(());
                    };
                    let size = self.validate(header)?;
                    self.carry.reserve_exact(size - HEADER_SIZE);
                    self.state = State::AwaitingBody { size };
                }
                State::AwaitingBody { size } => {
                    let take = (size - self.carry.len()).min(chunk.len());
                    self.carry.extend_from_slice(&chunk[..take]);
                    chunk = &chunk[take..];
                    if self.carry.len() < size {
                        return Ok(());
                    }
                    self.state = State::AwaitingHeader;
                    let mut command = std::mem::take(&mut self.carry);
                    dispatch(&command)?;
                    if command.capacity() <= RETAINED_CARRY_CAPACITY {
                        command.clear();
                        self.carry = command;
                    }
                }
            }
        }
    }
}
