//! Address record types (A, AAAA).

use crate::error::{Error, Result};
use crate::message::MessageWriter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// A record - IPv4 host address (RFC 1035 §3.4.1).
///
/// The RDATA is exactly 4 octets in network byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct A {
    address: Ipv4Addr,
}

impl A {
    /// Creates a new A record.
    #[inline]
    pub const fn new(address: Ipv4Addr) -> Self {
        Self { address }
    }

    /// Returns the IPv4 address.
    #[inline]
    pub const fn address(&self) -> Ipv4Addr {
        self.address
    }

    /// Parses an A record from its RDATA slice.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() != 4 {
            return Err(Error::invalid_rrdata(
                "A",
                format!("expected 4 address octets, got {}", data.len()),
            ));
        }

        let octets: [u8; 4] = data.try_into().unwrap();
        Ok(Self {
            address: Ipv4Addr::from(octets),
        })
    }

    /// Returns the wire length (always 4).
    #[inline]
    pub const fn wire_len(&self) -> usize {
        4
    }

    /// Writes the address octets.
    pub fn write(&self, writer: &mut MessageWriter) {
        writer.write_ipv4(self.address);
    }
}

impl From<Ipv4Addr> for A {
    fn from(address: Ipv4Addr) -> Self {
        Self::new(address)
    }
}

impl fmt::Display for A {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}

/// AAAA record - IPv6 host address (RFC 3596).
///
/// The RDATA is exactly 16 octets in network byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AAAA {
    address: Ipv6Addr,
}

impl AAAA {
    /// Creates a new AAAA record.
    #[inline]
    pub const fn new(address: Ipv6Addr) -> Self {
        Self { address }
    }

    /// Returns the IPv6 address.
    #[inline]
    pub const fn address(&self) -> Ipv6Addr {
        self.address
    }

    /// Parses an AAAA record from its RDATA slice.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() != 16 {
            return Err(Error::invalid_rrdata(
                "AAAA",
                format!("expected 16 address octets, got {}", data.len()),
            ));
        }

        let octets: [u8; 16] = data.try_into().unwrap();
        Ok(Self {
            address: Ipv6Addr::from(octets),
        })
    }

    /// Returns the wire length (always 16).
    #[inline]
    pub const fn wire_len(&self) -> usize {
        16
    }

    /// Writes the address octets.
    pub fn write(&self, writer: &mut MessageWriter) {
        writer.write_ipv6(self.address);
    }
}

impl From<Ipv6Addr> for AAAA {
    fn from(address: Ipv6Addr) -> Self {
        Self::new(address)
    }
}

impl fmt::Display for AAAA {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a_parse() {
        let a = A::parse(&[93, 184, 216, 34]).unwrap();
        assert_eq!(a.address(), Ipv4Addr::new(93, 184, 216, 34));
        assert_eq!(a.to_string(), "93.184.216.34");
    }

    #[test]
    fn test_a_length_mismatch() {
        assert!(A::parse(&[1, 2, 3]).is_err());
        assert!(A::parse(&[1, 2, 3, 4, 5]).is_err());
    }

    #[test]
    fn test_a_roundtrip() {
        let original = A::new(Ipv4Addr::new(10, 0, 0, 1));
        let mut writer = MessageWriter::new(4);
        original.write(&mut writer);
        assert_eq!(A::parse(writer.as_bytes()).unwrap(), original);
    }

    #[test]
    fn test_aaaa_roundtrip() {
        let original = AAAA::new(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1));
        let mut writer = MessageWriter::new(16);
        original.write(&mut writer);
        let parsed = AAAA::parse(writer.as_bytes()).unwrap();
        assert_eq!(parsed, original);
        assert_eq!(parsed.to_string(), "2001:db8::1");
    }

    #[test]
    fn test_aaaa_length_mismatch() {
        assert!(AAAA::parse(&[0u8; 4]).is_err());
    }
}
