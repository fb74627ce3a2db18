//! DNS record types.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;

/// DNS record type (RFC 1035 §3.2.2/§3.2.3, RFC 3596, RFC 6891).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    IntoPrimitive,
    TryFromPrimitive,
    Serialize,
    Deserialize,
)]
#[repr(u16)]
pub enum RecordType {
    /// Host address.
    A = 1,
    /// Authoritative name server.
    NS = 2,
    /// Mail destination (obsolete, use MX).
    MD = 3,
    /// Mail forwarder (obsolete, use MX).
    MF = 4,
    /// Canonical name for an alias.
    CNAME = 5,
    /// Start of a zone of authority.
    SOA = 6,
    /// Mailbox domain name.
    MB = 7,
    /// Mail group member.
    MG = 8,
    /// Mail rename domain name.
    MR = 9,
    /// Null record.
    NULL = 10,
    /// Well-known service description.
    WKS = 11,
    /// Domain name pointer.
    PTR = 12,
    /// Host information.
    HINFO = 13,
    /// Mailbox or mail list information.
    MINFO = 14,
    /// Mail exchange.
    MX = 15,
    /// Text strings.
    TXT = 16,
    /// IPv6 host address (RFC 3596).
    AAAA = 28,
    /// EDNS0 OPT pseudo-record (RFC 6891).
    OPT = 41,
    /// Request for a transfer of an entire zone (QTYPE).
    AXFR = 252,
    /// Request for mailbox-related records (QTYPE).
    MAILB = 253,
    /// Request for mail agent records (obsolete QTYPE).
    MAILA = 254,
    /// Request for all records (QTYPE).
    ANY = 255,
}

impl RecordType {
    /// Returns the numeric type code.
    #[inline]
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    /// Creates a record type from its numeric code.
    #[inline]
    pub fn from_u16(value: u16) -> Option<Self> {
        Self::try_from(value).ok()
    }

    /// Returns true if this type may only appear in questions.
    #[inline]
    pub const fn is_meta_query(self) -> bool {
        matches!(self, Self::AXFR | Self::MAILB | Self::MAILA | Self::ANY)
    }

    /// Returns the type mnemonic.
    pub const fn name(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::NS => "NS",
            Self::MD => "MD",
            Self::MF => "MF",
            Self::CNAME => "CNAME",
            Self::SOA => "SOA",
            Self::MB => "MB",
            Self::MG => "MG",
            Self::MR => "MR",
            Self::NULL => "NULL",
            Self::WKS => "WKS",
            Self::PTR => "PTR",
            Self::HINFO => "HINFO",
            Self::MINFO => "MINFO",
            Self::MX => "MX",
            Self::TXT => "TXT",
            Self::AAAA => "AAAA",
            Self::OPT => "OPT",
            Self::AXFR => "AXFR",
            Self::MAILB => "MAILB",
            Self::MAILA => "MAILA",
            Self::ANY => "ANY",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A type value covering both known types and arbitrary u16 values.
///
/// Unknown types survive decode/encode untouched so that records the server
/// does not understand still round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// A known, standard type.
    Known(RecordType),
    /// An unrecognized type code.
    Unknown(u16),
}

impl Type {
    /// Creates a type from a u16 value.
    #[inline]
    pub fn from_u16(value: u16) -> Self {
        RecordType::from_u16(value)
            .map(Self::Known)
            .unwrap_or(Self::Unknown(value))
    }

    /// Returns the numeric value.
    #[inline]
    pub const fn to_u16(self) -> u16 {
        match self {
            Self::Known(t) => t.to_u16(),
            Self::Unknown(v) => v,
        }
    }

    /// Returns the standard type if known.
    #[inline]
    pub const fn as_known(self) -> Option<RecordType> {
        match self {
            Self::Known(t) => Some(t),
            Self::Unknown(_) => None,
        }
    }
}

impl From<RecordType> for Type {
    fn from(t: RecordType) -> Self {
        Self::Known(t)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(t) => write!(f, "{t}"),
            Self::Unknown(v) => write!(f, "TYPE{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_values() {
        assert_eq!(RecordType::A.to_u16(), 1);
        assert_eq!(RecordType::AAAA.to_u16(), 28);
        assert_eq!(RecordType::OPT.to_u16(), 41);
        assert_eq!(RecordType::ANY.to_u16(), 255);
        assert_eq!(RecordType::from_u16(99), None);
    }

    #[test]
    fn test_meta_query_types() {
        assert!(RecordType::AXFR.is_meta_query());
        assert!(RecordType::ANY.is_meta_query());
        assert!(!RecordType::A.is_meta_query());
    }

    #[test]
    fn test_generic_type() {
        assert_eq!(Type::from_u16(15), Type::Known(RecordType::MX));
        assert_eq!(Type::from_u16(4096), Type::Unknown(4096));
        assert_eq!(Type::from_u16(4096).to_string(), "TYPE4096");
    }
}
