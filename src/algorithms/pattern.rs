// Overwrite patterns and the buffer generator behind every pass
//
// Fixed patterns are materialised once per pass and the same buffer is
// handed out for every chunk. The random pattern is refilled from the OS
// generator on every call, including the short final chunk.

use crate::crypto::secure_rng::secure_random_bytes;
use crate::error::{EraseError, EraseResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Byte content written during a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Pattern {
    /// 0x00
    Zeros,
    /// 0xFF, the complement of `Zeros`
    Ones,
    /// Any fixed byte, written as `0xNN`
    Byte(u8),
    /// Fresh CSPRNG output for every chunk
    Random,
}

impl Pattern {
    /// The fixed byte this pattern repeats, if any
    pub fn fill_byte(&self) -> Option<u8> {
        match self {
            Pattern::Zeros => Some(0x00),
            Pattern::Ones => Some(0xFF),
            Pattern::Byte(b) => Some(*b),
            Pattern::Random => None,
        }
    }

    pub fn is_random(&self) -> bool {
        matches!(self, Pattern::Random)
    }

    /// Only fixed patterns have an expected value to read back
    pub fn is_verifiable(&self) -> bool {
        !self.is_random()
    }

    /// Bitwise complement of a fixed pattern
    pub fn complement(&self) -> Option<Pattern> {
        self.fill_byte().map(|b| match !b {
            0x00 => Pattern::Zeros,
            0xFF => Pattern::Ones,
            other => Pattern::Byte(other),
        })
    }

    /// Label shown to observers ("0x00", "0xFF", "random")
    pub fn label(&self) -> String {
        match self.fill_byte() {
            Some(b) => format!("0x{:02X}", b),
            None => "random".to_string(),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Zeros => write!(f, "zeros"),
            Pattern::Ones => write!(f, "ones"),
            Pattern::Byte(b) => write!(f, "0x{:02X}", b),
            Pattern::Random => write!(f, "random"),
        }
    }
}

impl FromStr for Pattern {
    type Err = EraseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "zeros" | "zero" => Ok(Pattern::Zeros),
            "ones" | "one" => Ok(Pattern::Ones),
            "random" => Ok(Pattern::Random),
            lower => {
                let hex = lower
                    .strip_prefix("0x")
                    .ok_or_else(|| EraseError::InvalidPattern(trimmed.to_string()))?;
                u8::from_str_radix(hex, 16)
                    .map(Pattern::Byte)
                    .map_err(|_| EraseError::InvalidPattern(trimmed.to_string()))
            }
        }
    }
}

impl TryFrom<String> for Pattern {
    type Error = EraseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.to_string()
    }
}

/// Produces the bytes for one pattern, chunk by chunk.
pub struct PatternGenerator {
    pattern: Pattern,
    buffer: Vec<u8>,
}

impl PatternGenerator {
    pub fn new(pattern: Pattern, chunk_size: usize) -> Self {
        let fill = pattern.fill_byte().unwrap_or(0);
        Self {
            pattern,
            buffer: vec![fill; chunk_size],
        }
    }

    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    /// Exactly `size` bytes of pattern data.
    ///
    /// Fixed patterns return a view of the cached buffer. The random pattern
    /// regenerates the requested bytes on every call.
    pub fn buffer(&mut self, size: usize) -> EraseResult<&[u8]> {
        if size > self.buffer.len() {
            let fill = self.pattern.fill_byte().unwrap_or(0);
            self.buffer.resize(size, fill);
        }

        if self.pattern.is_random() {
            secure_random_bytes(&mut self.buffer[..size])?;
        }

        Ok(&self.buffer[..size])
    }
}

/// One-shot buffer of `size` bytes for `pattern`
pub fn pattern_buffer(pattern: Pattern, size: usize) -> EraseResult<Vec<u8>> {
    let mut generator = PatternGenerator::new(pattern, size);
    Ok(generator.buffer(size)?.to_vec())
}
