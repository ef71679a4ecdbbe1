//! Host-side model of the GlobalPlatform TEE client API.
//!
//! Values mirror `tee_client_api.h` so that an [`Operation`] can be marshalled
//! one-to-one into a `TEEC_Operation` by a native back end, and interpreted
//! directly by the in-process emulation.

use std::fmt;
use std::str::FromStr;
use zeroize::Zeroize;

pub const TEEC_SUCCESS: u32 = 0x0000_0000;
pub const TEEC_ERROR_GENERIC: u32 = 0xFFFF_0000;
pub const TEEC_ERROR_ACCESS_DENIED: u32 = 0xFFFF_0001;
pub const TEEC_ERROR_BAD_FORMAT: u32 = 0xFFFF_0005;
pub const TEEC_ERROR_BAD_PARAMETERS: u32 = 0xFFFF_0006;
pub const TEEC_ERROR_BAD_STATE: u32 = 0xFFFF_0007;
pub const TEEC_ERROR_ITEM_NOT_FOUND: u32 = 0xFFFF_0008;
pub const TEEC_ERROR_NOT_SUPPORTED: u32 = 0xFFFF_000A;
pub const TEEC_ERROR_OUT_OF_MEMORY: u32 = 0xFFFF_000C;
pub const TEEC_ERROR_COMMUNICATION: u32 = 0xFFFF_000E;
pub const TEEC_ERROR_SHORT_BUFFER: u32 = 0xFFFF_0010;
pub const TEEC_ERROR_TARGET_DEAD: u32 = 0xFFFF_3024;

pub const TEEC_ORIGIN_API: u32 = 0x0000_0001;
pub const TEEC_ORIGIN_COMMS: u32 = 0x0000_0002;
pub const TEEC_ORIGIN_TEE: u32 = 0x0000_0003;
pub const TEEC_ORIGIN_TRUSTED_APP: u32 = 0x0000_0004;

/// Encrypt the text in slot 0; slot 1 carries the key hint in and the sealed key out.
pub const CMD_ENC_VALUE: u32 = 0;
/// Decrypt the text in slot 0 with the sealed key in slot 1.
pub const CMD_DEC_VALUE: u32 = 1;

/// Identifier of the TEEencrypt trusted application.
pub const DEFAULT_TA_UUID: &str = "8aaaf200-2450-11e4-abe2-0002a5d5c51b";

/// Non-success return of a client API call: result code plus where it came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TeecError {
    pub code: u32,
    pub origin: u32,
}

impl TeecError {
    pub const fn new(code: u32, origin: u32) -> Self {
        Self { code, origin }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginMethod {
    Public,
    User,
    Group,
    Application,
}

impl LoginMethod {
    pub fn raw(self) -> u32 {
        match self {
            LoginMethod::Public => 0x0,
            LoginMethod::User => 0x1,
            LoginMethod::Group => 0x2,
            LoginMethod::Application => 0x4,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TeecUuid {
    pub time_low: u32,
    pub time_mid: u16,
    pub time_hi_and_version: u16,
    pub clock_seq_and_node: [u8; 8],
}

impl TeecUuid {
    /// The TEEencrypt trusted application, same value as [`DEFAULT_TA_UUID`].
    pub const DEFAULT_TA: TeecUuid = TeecUuid {
        time_low: 0x8aaa_f200,
        time_mid: 0x2450,
        time_hi_and_version: 0x11e4,
        clock_seq_and_node: [0xab, 0xe2, 0x00, 0x02, 0xa5, 0xd5, 0xc5, 0x1b],
    };
}

impl fmt::Display for TeecUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = &self.clock_seq_and_node;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-",
            self.time_low, self.time_mid, self.time_hi_and_version, n[0], n[1]
        )?;
        for b in &n[2..] {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for TeecUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseUuidError(&'static str);

impl fmt::Display for ParseUuidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid UUID: {}", self.0)
    }
}

impl std::error::Error for ParseUuidError {}

impl FromStr for TeecUuid {
    type Err = ParseUuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let groups: Vec<&str> = s.split('-').collect();
        let lens = [8, 4, 4, 4, 12];
        if groups.len() != lens.len() {
            return Err(ParseUuidError("expected 5 dash-separated groups"));
        }
        for (g, len) in groups.iter().zip(lens) {
            if g.len() != len || !g.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(ParseUuidError("groups must be 8-4-4-4-12 hex digits"));
            }
        }
        let hex = |g: &str| u64::from_str_radix(g, 16).map_err(|_| ParseUuidError("bad hex"));

        let mut clock_seq_and_node = [0u8; 8];
        clock_seq_and_node[..2].copy_from_slice(&(hex(groups[3])? as u16).to_be_bytes());
        clock_seq_and_node[2..].copy_from_slice(&hex(groups[4])?.to_be_bytes()[2..]);

        Ok(TeecUuid {
            time_low: hex(groups[0])? as u32,
            time_mid: hex(groups[1])? as u16,
            time_hi_and_version: hex(groups[2])? as u16,
            clock_seq_and_node,
        })
    }
}

/// Data direction of a parameter slot, seen from the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
    Inout,
}

/// `TEEC_NONE`, `TEEC_VALUE_*` and `TEEC_MEMREF_TEMP_*` parameter type codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum ParamType {
    None = 0x0,
    ValueInput = 0x1,
    ValueOutput = 0x2,
    ValueInout = 0x3,
    MemrefTempInput = 0x5,
    MemrefTempOutput = 0x6,
    MemrefTempInout = 0x7,
}

/// Pack four slot types the way `TEEC_PARAM_TYPES(t0, t1, t2, t3)` does.
pub const fn param_types(t0: ParamType, t1: ParamType, t2: ParamType, t3: ParamType) -> u32 {
    (t0 as u32) | ((t1 as u32) << 4) | ((t2 as u32) << 8) | ((t3 as u32) << 12)
}

/// Type code of slot `index` in a packed `param_types` word.
pub fn param_type_at(packed: u32, index: usize) -> u32 {
    (packed >> (index * 4)) & 0xF
}

#[derive(Debug, Default)]
pub enum Param {
    #[default]
    None,
    Value { dir: Direction, a: u32, b: u32 },
    /// Temporary memory reference. `size` starts as the number of valid bytes
    /// in `buffer`; the callee may rewrite it with the size it produced or
    /// the size it would need.
    TempMemRef {
        dir: Direction,
        buffer: Vec<u8>,
        size: usize,
    },
}

impl Param {
    pub fn value(dir: Direction, a: u32) -> Self {
        Param::Value { dir, a, b: 0 }
    }

    pub fn temp_memref(dir: Direction, bytes: &[u8]) -> Self {
        Param::TempMemRef {
            dir,
            buffer: bytes.to_vec(),
            size: bytes.len(),
        }
    }

    pub fn param_type(&self) -> ParamType {
        match self {
            Param::None => ParamType::None,
            Param::Value { dir, .. } => match dir {
                Direction::Input => ParamType::ValueInput,
                Direction::Output => ParamType::ValueOutput,
                Direction::Inout => ParamType::ValueInout,
            },
            Param::TempMemRef { dir, .. } => match dir {
                Direction::Input => ParamType::MemrefTempInput,
                Direction::Output => ParamType::MemrefTempOutput,
                Direction::Inout => ParamType::MemrefTempInout,
            },
        }
    }
}

/// The fixed four-slot parameter set passed with a command.
#[derive(Debug, Default)]
pub struct Operation {
    pub params: [Param; 4],
}

impl Operation {
    pub fn new(params: [Param; 4]) -> Self {
        Self { params }
    }

    pub fn param_types(&self) -> u32 {
        param_types(
            self.params[0].param_type(),
            self.params[1].param_type(),
            self.params[2].param_type(),
            self.params[3].param_type(),
        )
    }

    /// Remove the buffer held in `slot`, truncated to the size reported back.
    ///
    /// Fails with `TEEC_ERROR_SHORT_BUFFER` when the callee reports more bytes
    /// than the buffer holds.
    pub fn take_buffer(&mut self, slot: usize) -> Result<Vec<u8>, TeecError> {
        match &mut self.params[slot] {
            Param::TempMemRef { buffer, size, .. } => {
                if *size > buffer.len() {
                    return Err(TeecError::new(TEEC_ERROR_SHORT_BUFFER, TEEC_ORIGIN_API));
                }
                let mut out = std::mem::take(buffer);
                out.truncate(*size);
                Ok(out)
            }
            _ => Err(TeecError::new(TEEC_ERROR_BAD_PARAMETERS, TEEC_ORIGIN_API)),
        }
    }

    pub fn value_a(&self, slot: usize) -> Result<u32, TeecError> {
        match &self.params[slot] {
            Param::Value { a, .. } => Ok(*a),
            _ => Err(TeecError::new(TEEC_ERROR_BAD_PARAMETERS, TEEC_ORIGIN_API)),
        }
    }
}

impl Drop for Operation {
    fn drop(&mut self) {
        for p in &mut self.params {
            if let Param::TempMemRef { buffer, .. } = p {
                buffer.zeroize();
            }
        }
    }
}
