//! Raw access to the game's address space.
//!
//! The game is a 32-bit process, so every address and every pointer read
//! while walking an offset chain is four bytes wide.

use std::fmt;
use thiserror::Error;

mod mock;
#[cfg(unix)]
mod procfs;

pub use mock::MockMemory;
#[cfg(unix)]
pub use procfs::{find_game_pid, ProcMemory};

/// Process names the game is known to run under, most specific first.
pub const GAME_PROCESS_NAMES: [&str; 2] = ["popcapgame1.exe", "PlantsVsZombies"];

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("game process not found: {reason}")]
    GameNotFound { reason: String },

    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("memory read failed at 0x{address:08X} (size: {size}): {reason}")]
    Read {
        address: u32,
        size: usize,
        reason: String,
    },

    #[error("memory write failed at 0x{address:08X} (size: {size}): {reason}")]
    Write {
        address: u32,
        size: usize,
        reason: String,
    },

    #[error("allocation failed: needed {needed} slots, only {available} available")]
    Allocation { needed: usize, available: usize },

    #[error("pointer chain is empty")]
    EmptyChain,

    #[error("unknown C type name '{0}'")]
    UnknownType(String),

    #[error("'{text}' is not a valid {ty} value")]
    InvalidValue { ty: ScalarType, text: String },
}

/// Scalar types addressable through their C spelling.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ScalarType {
    I8,
    U8,
    Bool,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl ScalarType {
    /// Map a C type name to its packed little-endian representation.
    /// `long` is four bytes wide, as in the game's 32-bit ABI.
    pub fn from_c_name(name: &str) -> Result<ScalarType, MemoryError> {
        let normalized = name.split_whitespace().collect::<Vec<_>>().join(" ");
        let ty = match normalized.as_str() {
            "char" | "signed char" | "int8_t" => ScalarType::I8,
            "unsigned char" | "byte" | "uint8_t" => ScalarType::U8,
            "bool" => ScalarType::Bool,
            "short" | "int16_t" => ScalarType::I16,
            "unsigned short" | "uint16_t" => ScalarType::U16,
            "int" | "int32_t" | "intptr_t" | "long" => ScalarType::I32,
            "unsigned int" | "uint32_t" | "uintptr_t" | "size_t" | "unsigned long" => {
                ScalarType::U32
            }
            "long long" | "int64_t" | "intmax_t" => ScalarType::I64,
            "unsigned long long" | "uint64_t" | "uintmax_t" => ScalarType::U64,
            "float" => ScalarType::F32,
            "double" => ScalarType::F64,
            _ => return Err(MemoryError::UnknownType(name.to_string())),
        };
        Ok(ty)
    }

    pub fn size(self) -> usize {
        match self {
            ScalarType::I8 | ScalarType::U8 | ScalarType::Bool => 1,
            ScalarType::I16 | ScalarType::U16 => 2,
            ScalarType::I32 | ScalarType::U32 | ScalarType::F32 => 4,
            ScalarType::I64 | ScalarType::U64 | ScalarType::F64 => 8,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::I8 => "int8_t",
            ScalarType::U8 => "uint8_t",
            ScalarType::Bool => "bool",
            ScalarType::I16 => "int16_t",
            ScalarType::U16 => "uint16_t",
            ScalarType::I32 => "int32_t",
            ScalarType::U32 => "uint32_t",
            ScalarType::I64 => "int64_t",
            ScalarType::U64 => "uint64_t",
            ScalarType::F32 => "float",
            ScalarType::F64 => "double",
        };
        f.write_str(name)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Value {
    I8(i8),
    U8(u8),
    Bool(bool),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
}

fn parse_int<T: TryFrom<i128>>(text: &str) -> Option<T> {
    let t = text.trim();
    let (negative, digits) = match t.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, t),
    };
    let (digits, radix) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .map_or((digits, 10), |hex| (hex, 16));
    // from_str_radix takes its own sign; only the leading '-' is allowed.
    if digits.starts_with(['+', '-']) {
        return None;
    }
    let magnitude = i128::from_str_radix(digits, radix).ok()?;
    T::try_from(if negative { -magnitude } else { magnitude }).ok()
}

impl Value {
    pub fn ty(&self) -> ScalarType {
        match self {
            Value::I8(_) => ScalarType::I8,
            Value::U8(_) => ScalarType::U8,
            Value::Bool(_) => ScalarType::Bool,
            Value::I16(_) => ScalarType::I16,
            Value::U16(_) => ScalarType::U16,
            Value::I32(_) => ScalarType::I32,
            Value::U32(_) => ScalarType::U32,
            Value::I64(_) => ScalarType::I64,
            Value::U64(_) => ScalarType::U64,
            Value::F32(_) => ScalarType::F32,
            Value::F64(_) => ScalarType::F64,
        }
    }

    /// Parse `text` as a value of type `ty`. Integers accept a `0x` prefix.
    pub fn parse(ty: ScalarType, text: &str) -> Result<Value, MemoryError> {
        let invalid = || MemoryError::InvalidValue {
            ty,
            text: text.to_string(),
        };
        let value = match ty {
            ScalarType::I8 => Value::I8(parse_int(text).ok_or_else(invalid)?),
            ScalarType::U8 => Value::U8(parse_int(text).ok_or_else(invalid)?),
            ScalarType::Bool => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                _ => return Err(invalid()),
            },
            ScalarType::I16 => Value::I16(parse_int(text).ok_or_else(invalid)?),
            ScalarType::U16 => Value::U16(parse_int(text).ok_or_else(invalid)?),
            ScalarType::I32 => Value::I32(parse_int(text).ok_or_else(invalid)?),
            ScalarType::U32 => Value::U32(parse_int(text).ok_or_else(invalid)?),
            ScalarType::I64 => Value::I64(parse_int(text).ok_or_else(invalid)?),
            ScalarType::U64 => Value::U64(parse_int(text).ok_or_else(invalid)?),
            ScalarType::F32 => Value::F32(text.trim().parse().map_err(|_| invalid())?),
            ScalarType::F64 => Value::F64(text.trim().parse().map_err(|_| invalid())?),
        };
        Ok(value)
    }

    pub fn to_le_bytes(&self) -> Vec<u8> {
        match *self {
            Value::I8(v) => v.to_le_bytes().to_vec(),
            Value::U8(v) => vec![v],
            Value::Bool(v) => vec![u8::from(v)],
            Value::I16(v) => v.to_le_bytes().to_vec(),
            Value::U16(v) => v.to_le_bytes().to_vec(),
            Value::I32(v) => v.to_le_bytes().to_vec(),
            Value::U32(v) => v.to_le_bytes().to_vec(),
            Value::I64(v) => v.to_le_bytes().to_vec(),
            Value::U64(v) => v.to_le_bytes().to_vec(),
            Value::F32(v) => v.to_le_bytes().to_vec(),
            Value::F64(v) => v.to_le_bytes().to_vec(),
        }
    }

    /// Decode one value from exactly `ty.size()` little-endian bytes.
    pub fn from_le_bytes(ty: ScalarType, bytes: &[u8]) -> Option<Value> {
        if bytes.len() != ty.size() {
            return None;
        }
        let value = match ty {
            ScalarType::I8 => Value::I8(bytemuck::pod_read_unaligned(bytes)),
            ScalarType::U8 => Value::U8(bytes[0]),
            ScalarType::Bool => Value::Bool(bytes[0] != 0),
            ScalarType::I16 => Value::I16(i16::from_le(bytemuck::pod_read_unaligned(bytes))),
            ScalarType::U16 => Value::U16(u16::from_le(bytemuck::pod_read_unaligned(bytes))),
            ScalarType::I32 => Value::I32(i32::from_le(bytemuck::pod_read_unaligned(bytes))),
            ScalarType::U32 => Value::U32(u32::from_le(bytemuck::pod_read_unaligned(bytes))),
            ScalarType::I64 => Value::I64(i64::from_le(bytemuck::pod_read_unaligned(bytes))),
            ScalarType::U64 => Value::U64(u64::from_le(bytemuck::pod_read_unaligned(bytes))),
            ScalarType::F32 => Value::F32(f32::from_bits(u32::from_le(
                bytemuck::pod_read_unaligned(bytes),
            ))),
            ScalarType::F64 => Value::F64(f64::from_bits(u64::from_le(
                bytemuck::pod_read_unaligned(bytes),
            ))),
        };
        Some(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I8(v) => write!(f, "{}", v),
            Value::U8(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::I16(v) => write!(f, "{}", v),
            Value::U16(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::U32(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::U64(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
        }
    }
}

/// Bytes needed for `count` elements of `size` bytes. The address space is
/// 32-bit, so anything past 4 GiB cannot be read either.
fn buffer_len(address: u32, size: usize, count: usize) -> Result<usize, MemoryError> {
    size.checked_mul(count)
        .filter(|len| *len as u64 <= u64::from(u32::MAX))
        .ok_or_else(|| MemoryError::Read {
            address,
            size: usize::MAX,
            reason: format!("count {count} too large"),
        })
}

/// Byte-level access to another process's memory.
///
/// Implementors only provide positioned reads and writes; pointer chains
/// and typed access are layered on top.
pub trait ProcessMemory {
    /// Fill `buf` from `address`. A short read is an error.
    fn read_bytes(&self, address: u32, buf: &mut [u8]) -> Result<(), MemoryError>;

    /// Write all of `data` at `address`. A short write is an error.
    fn write_bytes(&mut self, address: u32, data: &[u8]) -> Result<(), MemoryError>;

    /// Walk a pointer-offset chain and return the final address.
    ///
    /// Every element except the last is added to the current pointer and
    /// dereferenced as a 4-byte pointer; the last element is only added.
    /// `[0x6A9EC0, 0x7FC]` therefore names `*(0x6A9EC0) + 0x7FC`.
    fn resolve(&self, chain: &[u32]) -> Result<u32, MemoryError> {
        let (last, links) = chain.split_last().ok_or(MemoryError::EmptyChain)?;
        let mut pointer = 0u32;
        for offset in links {
            let mut buf = [0u8; 4];
            self.read_bytes(pointer.wrapping_add(*offset), &mut buf)?;
            pointer = u32::from_le_bytes(buf);
        }
        Ok(pointer.wrapping_add(*last))
    }

    fn read<T: bytemuck::Pod>(&self, chain: &[u32]) -> Result<T, MemoryError>
    where
        Self: Sized,
    {
        let address = self.resolve(chain)?;
        let mut buf = vec![0u8; std::mem::size_of::<T>()];
        self.read_bytes(address, &mut buf)?;
        Ok(bytemuck::pod_read_unaligned(&buf))
    }

    fn read_array<T: bytemuck::Pod>(&self, count: usize, chain: &[u32]) -> Result<Vec<T>, MemoryError>
    where
        Self: Sized,
    {
        let address = self.resolve(chain)?;
        let size = std::mem::size_of::<T>();
        let mut buf = vec![0u8; buffer_len(address, size, count)?];
        self.read_bytes(address, &mut buf)?;
        Ok(buf.chunks_exact(size).map(bytemuck::pod_read_unaligned::<T>).collect())
    }

    fn write<T: bytemuck::Pod>(&mut self, value: T, chain: &[u32]) -> Result<(), MemoryError>
    where
        Self: Sized,
    {
        let address = self.resolve(chain)?;
        self.write_bytes(address, bytemuck::bytes_of(&value))
    }

    fn write_slice<T: bytemuck::Pod>(&mut self, values: &[T], chain: &[u32]) -> Result<(), MemoryError>
    where
        Self: Sized,
    {
        let address = self.resolve(chain)?;
        self.write_bytes(address, bytemuck::cast_slice(values))
    }

    /// Read `count` values of a runtime-selected scalar type.
    fn read_typed(&self, ty: ScalarType, count: usize, chain: &[u32]) -> Result<Vec<Value>, MemoryError> {
        let address = self.resolve(chain)?;
        let mut buf = vec![0u8; buffer_len(address, ty.size(), count)?];
        self.read_bytes(address, &mut buf)?;
        Ok(buf
            .chunks_exact(ty.size())
            .filter_map(|chunk| Value::from_le_bytes(ty, chunk))
            .collect())
    }

    /// Pack `values` back to back and write them in one call.
    fn write_typed(&mut self, values: &[Value], chain: &[u32]) -> Result<(), MemoryError> {
        let address = self.resolve(chain)?;
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.write_bytes(address, &bytes)
    }
}
