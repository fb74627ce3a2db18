//! Authority record types (SOA) and RFC 1982 serial arithmetic.

use crate::error::{Error, Result};
use crate::message::MessageWriter;
use crate::name::{Name, NameParser};
use crate::wire::WireReader;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest value that may be added to a serial (RFC 1982 §3.1).
const SERIAL_MAX_ADD: u32 = 0x7FFF_FFFF;

/// Midpoint of the 32-bit serial space.
const SERIAL_MIDPOINT: u32 = 0x8000_0000;

/// Three-way result of an RFC 1982 serial comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialCmp {
    /// Both serials are the same value.
    Equal,
    /// The left serial is older.
    Less,
    /// The left serial is newer.
    Greater,
}

/// SOA record - start of a zone of authority (RFC 1035 §3.3.13).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SOA {
    mname: Name,
    rname: Name,
    serial: u32,
    refresh: u32,
    retry: u32,
    expire: u32,
    minimum: u32,
}

impl SOA {
    /// Creates a new SOA record.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mname: Name,
        rname: Name,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    ) -> Self {
        Self {
            mname,
            rname,
            serial,
            refresh,
            retry,
            expire,
            minimum,
        }
    }

    /// Returns the primary name server.
    #[inline]
    pub fn mname(&self) -> &Name {
        &self.mname
    }

    /// Returns the responsible person's mailbox name.
    #[inline]
    pub fn rname(&self) -> &Name {
        &self.rname
    }

    /// Returns the zone serial number.
    #[inline]
    pub const fn serial(&self) -> u32 {
        self.serial
    }

    /// Returns the refresh interval in seconds.
    #[inline]
    pub const fn refresh(&self) -> u32 {
        self.refresh
    }

    /// Returns the retry interval in seconds.
    #[inline]
    pub const fn retry(&self) -> u32 {
        self.retry
    }

    /// Returns the expire time in seconds.
    #[inline]
    pub const fn expire(&self) -> u32 {
        self.expire
    }

    /// Returns the minimum TTL (negative caching TTL) in seconds.
    #[inline]
    pub const fn minimum(&self) -> u32 {
        self.minimum
    }

    /// Adds `n` to the serial per RFC 1982 §3.1.
    ///
    /// Additions above `2^31 - 1` are out of range.
    pub fn serial_add(&mut self, n: u32) -> Result<()> {
        if n > SERIAL_MAX_ADD {
            return Err(Error::SerialOutOfRange {
                value: i64::from(n),
            });
        }
        self.serial = self.serial.wrapping_add(n);
        Ok(())
    }

    /// Compares two serials per RFC 1982 §3.2 using the 2^31 midpoint.
    pub fn serial_compare(a: u32, b: u32) -> SerialCmp {
        if a == b {
            return SerialCmp::Equal;
        }

        let newer = (a < b && b.wrapping_sub(a) > SERIAL_MIDPOINT)
            || (a > b && a.wrapping_sub(b) < SERIAL_MIDPOINT);

        if newer {
            SerialCmp::Greater
        } else {
            SerialCmp::Less
        }
    }

    /// Compares this SOA's serial against another's.
    #[inline]
    pub fn compare_serial(&self, other: &SOA) -> SerialCmp {
        Self::serial_compare(self.serial, other.serial)
    }

    /// Parses an SOA record from wire format.
    pub fn parse(message: &[u8], offset: usize) -> Result<Self> {
        let parser = NameParser::new(message);
        let (mname, mlen) = parser.parse_name(offset)?;
        let (rname, rlen) = parser.parse_name(offset + mlen)?;

        let mut reader = WireReader::new(message);
        reader.set_position(offset + mlen + rlen);

        Ok(Self {
            mname,
            rname,
            serial: reader.read_u32()?,
            refresh: reader.read_u32()?,
            retry: reader.read_u32()?,
            expire: reader.read_u32()?,
            minimum: reader.read_u32()?,
        })
    }

    /// Returns the uncompressed wire length.
    pub fn wire_len(&self) -> usize {
        self.mname.wire_len() + self.rname.wire_len() + 20
    }

    /// Writes the record through a message writer.
    pub fn write(&self, writer: &mut MessageWriter) {
        writer.write_name(&self.mname);
        writer.write_name(&self.rname);
        writer.write_u32(self.serial);
        writer.write_u32(self.refresh);
        writer.write_u32(self.retry);
        writer.write_u32(self.expire);
        writer.write_u32(self.minimum);
    }
}

impl fmt::Display for SOA {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {}",
            self.mname, self.rname, self.serial, self.refresh, self.retry, self.expire,
            self.minimum
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample() -> SOA {
        SOA::new(
            Name::from_str("ns1.example.com").unwrap(),
            Name::from_str("hostmaster.example.com").unwrap(),
            2024010101,
            3600,
            900,
            604800,
            86400,
        )
    }

    #[test]
    fn test_soa_roundtrip() {
        let original = sample();

        let mut writer = MessageWriter::new(128);
        original.write(&mut writer);
        let wire = writer.freeze();

        let parsed = SOA::parse(&wire, 0).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_serial_compare() {
        assert_eq!(SOA::serial_compare(1, 1), SerialCmp::Equal);
        assert_eq!(SOA::serial_compare(2, 1), SerialCmp::Greater);
        assert_eq!(SOA::serial_compare(1, 2), SerialCmp::Less);

        // Wraparound: 1 is newer than 0xFFFF_FFFF.
        assert_eq!(SOA::serial_compare(1, 0xFFFF_FFFF), SerialCmp::Greater);
        assert_eq!(SOA::serial_compare(0xFFFF_FFFF, 1), SerialCmp::Less);
    }

    #[test]
    fn test_serial_compare_is_total_for_additions() {
        // compare(a + n, a) = Greater for 1 <= n <= 2^31 - 1
        let a = 0xFFFF_FF00u32;
        for n in [1u32, 1000, SERIAL_MAX_ADD] {
            assert_eq!(
                SOA::serial_compare(a.wrapping_add(n), a),
                SerialCmp::Greater
            );
        }
    }

    #[test]
    fn test_serial_add_bounds() {
        let mut soa = sample();
        assert!(soa.serial_add(SERIAL_MAX_ADD).is_ok());
        assert!(matches!(
            soa.serial_add(SERIAL_MAX_ADD + 1),
            Err(Error::SerialOutOfRange { .. })
        ));
    }

    #[test]
    fn test_serial_add_wraps() {
        let mut soa = sample();
        soa.serial = 0xFFFF_FFFF;
        soa.serial_add(2).unwrap();
        assert_eq!(soa.serial(), 1);
    }
}
