//! Name-bearing record types (NS, CNAME, PTR, the mailbox family, MX).
//!
//! All names in these records are compressible per RFC 1035 §3.3.

use crate::error::Result;
use crate::message::MessageWriter;
use crate::name::{Name, NameParser};
use crate::wire::WireReader;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Defines an RDATA type that consists of a single compressible domain name.
macro_rules! single_name_rdata {
    ($(#[$doc:meta])* $name:ident, $field:ident, $accessor:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name {
            $field: Name,
        }

        impl $name {
            /// Creates a new record.
            #[inline]
            pub fn new($field: Name) -> Self {
                Self { $field }
            }

            /// Returns the domain name this record carries.
            #[inline]
            pub fn $accessor(&self) -> &Name {
                &self.$field
            }

            /// Parses the record from wire format.
            pub fn parse(message: &[u8], offset: usize) -> Result<Self> {
                let ($field, _) = NameParser::new(message).parse_name(offset)?;
                Ok(Self { $field })
            }

            /// Returns the uncompressed wire length.
            #[inline]
            pub fn wire_len(&self) -> usize {
                self.$field.wire_len()
            }

            /// Writes the record through a message writer.
            pub fn write(&self, writer: &mut MessageWriter) {
                writer.write_name(&self.$field);
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.$field)
            }
        }
    };
}

single_name_rdata!(
    /// NS record - authoritative name server (RFC 1035 §3.3.11).
    NS,
    nsdname,
    nsdname
);

single_name_rdata!(
    /// CNAME record - canonical name for an alias (RFC 1035 §3.3.1).
    CNAME,
    cname,
    target
);

single_name_rdata!(
    /// PTR record - domain name pointer (RFC 1035 §3.3.12).
    PTR,
    ptrdname,
    ptrdname
);

single_name_rdata!(
    /// MB record - mailbox domain name (RFC 1035 §3.3.3, experimental).
    MB,
    madname,
    madname
);

single_name_rdata!(
    /// MD record - mail destination (RFC 1035 §3.3.4, obsolete).
    MD,
    madname,
    madname
);

single_name_rdata!(
    /// MF record - mail forwarder (RFC 1035 §3.3.5, obsolete).
    MF,
    madname,
    madname
);

single_name_rdata!(
    /// MG record - mail group member (RFC 1035 §3.3.6, experimental).
    MG,
    mgmname,
    mgmname
);

single_name_rdata!(
    /// MR record - mail rename domain name (RFC 1035 §3.3.8, experimental).
    MR,
    newname,
    newname
);

/// MINFO record - mailbox or mail list information (RFC 1035 §3.3.7).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MINFO {
    rmailbx: Name,
    emailbx: Name,
}

impl MINFO {
    /// Creates a new MINFO record.
    #[inline]
    pub fn new(rmailbx: Name, emailbx: Name) -> Self {
        Self { rmailbx, emailbx }
    }

    /// Returns the responsible mailbox name.
    #[inline]
    pub fn rmailbx(&self) -> &Name {
        &self.rmailbx
    }

    /// Returns the error mailbox name.
    #[inline]
    pub fn emailbx(&self) -> &Name {
        &self.emailbx
    }

    /// Parses an MINFO record from wire format.
    pub fn parse(message: &[u8], offset: usize) -> Result<Self> {
        let parser = NameParser::new(message);
        let (rmailbx, rlen) = parser.parse_name(offset)?;
        let (emailbx, _) = parser.parse_name(offset + rlen)?;
        Ok(Self { rmailbx, emailbx })
    }

    /// Returns the uncompressed wire length.
    #[inline]
    pub fn wire_len(&self) -> usize {
        self.rmailbx.wire_len() + self.emailbx.wire_len()
    }

    /// Writes the record through a message writer.
    pub fn write(&self, writer: &mut MessageWriter) {
        writer.write_name(&self.rmailbx);
        writer.write_name(&self.emailbx);
    }
}

impl fmt::Display for MINFO {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.rmailbx, self.emailbx)
    }
}

/// MX record - mail exchange (RFC 1035 §3.3.9).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MX {
    preference: u16,
    exchange: Name,
}

impl MX {
    /// Creates a new MX record.
    #[inline]
    pub fn new(preference: u16, exchange: Name) -> Self {
        Self {
            preference,
            exchange,
        }
    }

    /// Returns the preference (lower is more preferred).
    #[inline]
    pub const fn preference(&self) -> u16 {
        self.preference
    }

    /// Returns the exchange domain name.
    #[inline]
    pub fn exchange(&self) -> &Name {
        &self.exchange
    }

    /// Parses an MX record from wire format.
    pub fn parse(message: &[u8], offset: usize) -> Result<Self> {
        let mut reader = WireReader::new(message);
        reader.set_position(offset);
        let preference = reader.read_u16()?;

        let (exchange, _) = NameParser::new(message).parse_name(offset + 2)?;

        Ok(Self {
            preference,
            exchange,
        })
    }

    /// Returns the uncompressed wire length.
    #[inline]
    pub fn wire_len(&self) -> usize {
        2 + self.exchange.wire_len()
    }

    /// Writes the record through a message writer.
    pub fn write(&self, writer: &mut MessageWriter) {
        writer.write_u16(self.preference);
        writer.write_name(&self.exchange);
    }
}

impl fmt::Display for MX {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.preference, self.exchange)
    }
}

impl PartialOrd for MX {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MX {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.preference.cmp(&other.preference)
    }
}
