use std::{env, str::FromStr};

/// Size of the packed command header (`size | tag << 24`).
pub const HEADER_SIZE: usize = 4;

/// Largest command size the 24-bit header field can express.
pub const MAX_ENCODABLE_COMMAND_SIZE: usize = (1 << 24) - 1;

pub const DEFAULT_MAX_COMMAND_SIZE: usize = 4 * 1024 * 1024;
pub const DEFAULT_MAX_DECODE_ALLOCATION: usize = 16 * 1024 * 1024;
pub const DEFAULT_MAX_OBJECT_ID: u32 = 1 << 20;
pub const DEFAULT_INITIAL_BUFFER_CAPACITY: usize = 64 * 1024;

/// Limits shared by both endpoints of a wire channel.
///
/// Environment overrides (see [`WireConfig::from_env`]):
/// - `AERO_WIRE_MAX_COMMAND_BYTES`
/// - `AERO_WIRE_MAX_DECODE_ALLOC_BYTES`
/// - `AERO_WIRE_MAX_OBJECT_ID`
/// - `AERO_WIRE_INITIAL_BUFFER_BYTES`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireConfig {
    /// Largest command (header included) either side accepts or produces.
    pub max_command_size: usize,
    /// Budget for heap memory a single decoded command may claim.
    pub max_decode_allocation: usize,
    /// Largest object id the server will insert into its tables.
    pub max_object_id: u32,
    /// Starting capacity of outgoing command buffers.
    pub initial_buffer_capacity: usize,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            max_command_size: DEFAULT_MAX_COMMAND_SIZE,
            max_decode_allocation: DEFAULT_MAX_DECODE_ALLOCATION,
            max_object_id: DEFAULT_MAX_OBJECT_ID,
            initial_buffer_capacity: DEFAULT_INITIAL_BUFFER_CAPACITY,
        }
    }
}

impl WireConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_command_size: parse_env("AERO_WIRE_MAX_COMMAND_BYTES")
                .unwrap_or(defaults.max_command_size),
            max_decode_allocation: parse_env("AERO_WIRE_MAX_DECODE_ALLOC_BYTES")
                .unwrap_or(defaults.max_decode_allocation),
            max_object_id: parse_env("AERO_WIRE_MAX_OBJECT_ID").unwrap_or(defaults.max_object_id),
            initial_buffer_capacity: parse_env("AERO_WIRE_INITIAL_BUFFER_BYTES")
                .unwrap_or(defaults.initial_buffer_capacity),
        }
        .sanitized()
    }

    /// Clamp every limit into the range the wire format can represent.
    pub fn sanitized(self) -> Self {
        Self {
            max_command_size: self
                .max_command_size
                .clamp(HEADER_SIZE, MAX_ENCODABLE_COMMAND_SIZE),
            max_decode_allocation: self.max_decode_allocation,
            max_object_id: self.max_object_id.max(1),
            initial_buffer_capacity: self.initial_buffer_capacity,
        }
    }
}

fn parse_env<T: FromStr>(var: &str) -> Option<T> {
    let raw = env::var(var).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(var, value = %raw, "ignoring unparseable wire config override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitized_clamps_command_size_to_header_range() {
        let tiny = WireConfig {
            max_command_size: 1,
            ..WireConfig::default()
        }
        .sanitized();
        assert_eq!(tiny.max_command_size, HEADER_SIZE);

        let huge = WireConfig {
            max_command_size: usize::MAX,
            max_object_id: 0,
            ..WireConfig::default()
        }
        .sanitized();
        assert_eq!(huge.max_command_size, MAX_ENCODABLE_COMMAND_SIZE);
        assert_eq!(huge.max_object_id, 1);
    }

    #[test]
    fn from_env_reads_overrides_and_ignores_garbage() {
        env::set_var("AERO_WIRE_MAX_COMMAND_BYTES", " 8192 ");
        env::set_var("AERO_WIRE_MAX_OBJECT_ID", "not-a-number");
        let config = WireConfig::from_env();
        env::remove_var("AERO_WIRE_MAX_COMMAND_BYTES");
        env::remove_var("AERO_WIRE_MAX_OBJECT_ID");

        assert_eq!(config.max_command_size, 8192);
        assert_eq!(config.max_object_id, DEFAULT_MAX_OBJECT_ID);
        assert_eq!(
            config.max_decode_allocation,
            DEFAULT_MAX_DECODE_ALLOCATION
        );
    }
}
