//! Text record types (TXT, HINFO).

use crate::error::{Error, Result};
use crate::message::MessageWriter;
use crate::wire::WireReader;
use serde::{Deserialize, Serialize};
use std::fmt;

/// TXT record - descriptive text (RFC 1035 §3.3.14).
///
/// One or more character strings of up to 255 octets each.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TXT {
    strings: Vec<Vec<u8>>,
}

impl TXT {
    /// Creates a TXT record from one or more character strings.
    ///
    /// Fails if any string exceeds 255 octets or no string is given.
    pub fn new(strings: Vec<Vec<u8>>) -> Result<Self> {
        if strings.is_empty() {
            return Err(Error::invalid_rrdata("TXT", "at least one string required"));
        }
        for s in &strings {
            if s.len() > 255 {
                return Err(Error::CharacterStringTooLong { length: s.len() });
            }
        }
        Ok(Self { strings })
    }

    /// Creates a TXT record from a single string.
    pub fn from_string(text: impl Into<Vec<u8>>) -> Result<Self> {
        Self::new(vec![text.into()])
    }

    /// Returns the character strings.
    #[inline]
    pub fn strings(&self) -> &[Vec<u8>] {
        &self.strings
    }

    /// Parses a TXT record from its RDATA slice.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = WireReader::new(data);
        let mut strings = Vec::new();

        while !reader.is_empty() {
            strings.push(reader.read_character_string()?.to_vec());
        }

        if strings.is_empty() {
            return Err(Error::invalid_rrdata("TXT", "empty RDATA"));
        }

        Ok(Self { strings })
    }

    /// Returns the wire length.
    pub fn wire_len(&self) -> usize {
        self.strings.iter().map(|s| 1 + s.len()).sum()
    }

    /// Writes the record through a message writer.
    pub fn write(&self, writer: &mut MessageWriter) {
        for s in &self.strings {
            writer.write_character_string(s);
        }
    }
}

impl fmt::Display for TXT {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, s) in self.strings.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "\"{}\"", String::from_utf8_lossy(s))?;
        }
        Ok(())
    }
}

/// HINFO record - host information (RFC 1035 §3.3.2).
///
/// Two character strings describing CPU and OS.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HINFO {
    cpu: Vec<u8>,
    os: Vec<u8>,
}

impl HINFO {
    /// Creates an HINFO record.
    ///
    /// Fails if either string exceeds 255 octets.
    pub fn new(cpu: impl Into<Vec<u8>>, os: impl Into<Vec<u8>>) -> Result<Self> {
        let cpu = cpu.into();
        let os = os.into();
        for s in [&cpu, &os] {
            if s.len() > 255 {
                return Err(Error::CharacterStringTooLong { length: s.len() });
            }
        }
        Ok(Self { cpu, os })
    }

    /// Returns the CPU string.
    #[inline]
    pub fn cpu(&self) -> &[u8] {
        &self.cpu
    }

    /// Returns the OS string.
    #[inline]
    pub fn os(&self) -> &[u8] {
        &self.os
    }

    /// Parses an HINFO record from its RDATA slice.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = WireReader::new(data);
        let cpu = reader.read_character_string()?.to_vec();
        let os = reader.read_character_string()?.to_vec();
        Ok(Self { cpu, os })
    }

    /// Returns the wire length.
    #[inline]
    pub fn wire_len(&self) -> usize {
        2 + self.cpu.len() + self.os.len()
    }

    /// Writes the record through a message writer.
    pub fn write(&self, writer: &mut MessageWriter) {
        writer.write_character_string(&self.cpu);
        writer.write_character_string(&self.os);
    }
}

impl fmt::Display for HINFO {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\"{}\" \"{}\"",
            String::from_utf8_lossy(&self.cpu),
            String::from_utf8_lossy(&self.os)
        )
    }
}
