//! Remaining record types: NULL, WKS, and the unknown-type fallback.

use crate::error::{Error, Result};
use crate::message::MessageWriter;
use crate::wire::WireReader;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// NULL record - opaque data (RFC 1035 §3.3.10, experimental).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NULL {
    data: Bytes,
}

impl NULL {
    /// Creates a NULL record from opaque bytes.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Returns the opaque data.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Parses a NULL record from its RDATA slice.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Ok(Self {
            data: Bytes::copy_from_slice(data),
        })
    }

    /// Returns the wire length.
    #[inline]
    pub fn wire_len(&self) -> usize {
        self.data.len()
    }

    /// Writes the record through a message writer.
    pub fn write(&self, writer: &mut MessageWriter) {
        writer.write_bytes(&self.data);
    }
}

impl fmt::Display for NULL {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\\# {}", self.data.len())
    }
}

/// WKS record - well-known services (RFC 1035 §3.4.2).
///
/// A 4-octet address, a protocol number, and a port bitmap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WKS {
    address: Ipv4Addr,
    protocol: u8,
    bitmap: Bytes,
}

impl WKS {
    /// Creates a WKS record.
    pub fn new(address: Ipv4Addr, protocol: u8, bitmap: impl Into<Bytes>) -> Self {
        Self {
            address,
            protocol,
            bitmap: bitmap.into(),
        }
    }

    /// Returns the host address.
    #[inline]
    pub const fn address(&self) -> Ipv4Addr {
        self.address
    }

    /// Returns the IP protocol number.
    #[inline]
    pub const fn protocol(&self) -> u8 {
        self.protocol
    }

    /// Returns the port bitmap.
    #[inline]
    pub fn bitmap(&self) -> &[u8] {
        &self.bitmap
    }

    /// Returns true if the given port is marked as served.
    pub fn serves_port(&self, port: u16) -> bool {
        let byte = usize::from(port / 8);
        let bit = 7 - (port % 8);
        self.bitmap
            .get(byte)
            .map(|b| b & (1 << bit) != 0)
            .unwrap_or(false)
    }

    /// Parses a WKS record from its RDATA slice.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 5 {
            return Err(Error::invalid_rrdata(
                "WKS",
                format!("expected at least 5 octets, got {}", data.len()),
            ));
        }

        let mut reader = WireReader::new(data);
        let address = reader.read_ipv4()?;
        let protocol = reader.read_u8()?;
        let bitmap = Bytes::copy_from_slice(reader.read_bytes(reader.remaining())?);

        Ok(Self {
            address,
            protocol,
            bitmap,
        })
    }

    /// Returns the wire length.
    #[inline]
    pub fn wire_len(&self) -> usize {
        5 + self.bitmap.len()
    }

    /// Writes the record through a message writer.
    pub fn write(&self, writer: &mut MessageWriter) {
        writer.write_ipv4(self.address);
        writer.write_u8(self.protocol);
        writer.write_bytes(&self.bitmap);
    }
}

impl fmt::Display for WKS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({} bitmap octets)", self.address, self.protocol, self.bitmap.len())
    }
}

/// An unrecognized record type, preserved as opaque RDATA.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unknown {
    type_code: u16,
    data: Bytes,
}

impl Unknown {
    /// Creates an unknown record from its numeric type and raw RDATA.
    pub fn new(type_code: u16, data: impl Into<Bytes>) -> Self {
        Self {
            type_code,
            data: data.into(),
        }
    }

    /// Returns the numeric type code.
    #[inline]
    pub const fn type_code(&self) -> u16 {
        self.type_code
    }

    /// Returns the raw RDATA.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the wire length.
    #[inline]
    pub fn wire_len(&self) -> usize {
        self.data.len()
    }

    /// Writes the raw RDATA through a message writer.
    pub fn write(&self, writer: &mut MessageWriter) {
        writer.write_bytes(&self.data);
    }
}

impl fmt::Display for Unknown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TYPE{} \\# {}", self.type_code, self.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_roundtrip() {
        let original = NULL::new(vec![1u8, 2, 3, 4]);

        let mut writer = MessageWriter::new(8);
        original.write(&mut writer);
        assert_eq!(NULL::parse(writer.as_bytes()).unwrap(), original);
    }

    #[test]
    fn test_wks_roundtrip() {
        // Bitmap with SMTP (port 25) set: byte 3, bit 25 % 8 = 1 from the top.
        let mut bitmap = vec![0u8; 4];
        bitmap[3] = 0b0100_0000;
        let original = WKS::new(Ipv4Addr::new(192, 0, 2, 1), 6, bitmap);

        let mut writer = MessageWriter::new(16);
        original.write(&mut writer);
        let parsed = WKS::parse(writer.as_bytes()).unwrap();

        assert_eq!(parsed, original);
        assert!(parsed.serves_port(25));
        assert!(!parsed.serves_port(24));
    }

    #[test]
    fn test_wks_too_short() {
        assert!(WKS::parse(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_unknown_preserves_bytes() {
        let original = Unknown::new(4096, vec![0xDE, 0xAD, 0xBE, 0xEF]);

        let mut writer = MessageWriter::new(8);
        original.write(&mut writer);
        assert_eq!(writer.as_bytes(), &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(original.type_code(), 4096);
    }
}
