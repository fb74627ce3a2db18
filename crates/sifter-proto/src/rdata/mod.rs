//! DNS record data (RDATA) types.
//!
//! One variant per supported record type, plus an [`Unknown`] case that
//! preserves unrecognized RDATA byte-for-byte so unknown types survive
//! round-tripping.

pub mod address;
pub mod authority;
pub mod name;
pub mod other;
pub mod text;

pub use address::{A, AAAA};
pub use authority::{SerialCmp, SOA};
pub use name::{CNAME, MB, MD, MF, MG, MINFO, MR, MX, NS, PTR};
pub use other::{Unknown, NULL, WKS};
pub use text::{HINFO, TXT};

use crate::error::{Error, Result};
use crate::message::MessageWriter;
use crate::name::Name;
use crate::rtype::RecordType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Parsed record data for all supported record types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RData {
    /// IPv4 address.
    A(A),
    /// IPv6 address.
    AAAA(AAAA),
    /// Authoritative name server.
    NS(NS),
    /// Canonical name.
    CNAME(CNAME),
    /// Domain name pointer.
    PTR(PTR),
    /// Mailbox domain name.
    MB(MB),
    /// Mail destination (obsolete).
    MD(MD),
    /// Mail forwarder (obsolete).
    MF(MF),
    /// Mail group member.
    MG(MG),
    /// Mail rename domain name.
    MR(MR),
    /// Mailbox or mail list information.
    MINFO(MINFO),
    /// Mail exchange.
    MX(MX),
    /// Start of authority.
    SOA(SOA),
    /// Host information.
    HINFO(HINFO),
    /// Text strings.
    TXT(TXT),
    /// Null record.
    NULL(NULL),
    /// Well-known services.
    WKS(WKS),
    /// Unknown record type, RDATA preserved as raw bytes.
    Unknown(Unknown),
}

impl RData {
    /// Parses RDATA from wire format.
    ///
    /// `data` is the complete message (name-bearing types may contain
    /// compression pointers into it); `offset` and `rdlength` bound the
    /// RDATA itself.
    pub fn parse(rtype: RecordType, data: &[u8], offset: usize, rdlength: u16) -> Result<Self> {
        let end = offset + rdlength as usize;
        let rdata_slice = data
            .get(offset..end)
            .ok_or_else(|| Error::offset_overflow(end, data.len()))?;

        match rtype {
            RecordType::A => Ok(RData::A(A::parse(rdata_slice)?)),
            RecordType::AAAA => Ok(RData::AAAA(AAAA::parse(rdata_slice)?)),
            RecordType::NS => Ok(RData::NS(NS::parse(data, offset)?)),
            RecordType::CNAME => Ok(RData::CNAME(CNAME::parse(data, offset)?)),
            RecordType::PTR => Ok(RData::PTR(PTR::parse(data, offset)?)),
            RecordType::MB => Ok(RData::MB(MB::parse(data, offset)?)),
            RecordType::MD => Ok(RData::MD(MD::parse(data, offset)?)),
            RecordType::MF => Ok(RData::MF(MF::parse(data, offset)?)),
            RecordType::MG => Ok(RData::MG(MG::parse(data, offset)?)),
            RecordType::MR => Ok(RData::MR(MR::parse(data, offset)?)),
            RecordType::MINFO => Ok(RData::MINFO(MINFO::parse(data, offset)?)),
            RecordType::MX => Ok(RData::MX(MX::parse(data, offset)?)),
            RecordType::SOA => Ok(RData::SOA(SOA::parse(data, offset)?)),
            RecordType::HINFO => Ok(RData::HINFO(HINFO::parse(rdata_slice)?)),
            RecordType::TXT => Ok(RData::TXT(TXT::parse(rdata_slice)?)),
            RecordType::NULL => Ok(RData::NULL(NULL::parse(rdata_slice)?)),
            RecordType::WKS => Ok(RData::WKS(WKS::parse(rdata_slice)?)),
            _ => Err(Error::NoSuchType {
                value: rtype.to_u16(),
            }),
        }
    }

    /// Synthesizes address RDATA of the given query type from an IP.
    ///
    /// Returns `None` when the address family does not match the type
    /// (e.g. a v4 address for an AAAA query).
    pub fn from_ip(rtype: RecordType, ip: IpAddr) -> Option<Self> {
        match (rtype, ip) {
            (RecordType::A, IpAddr::V4(v4)) => Some(RData::A(A::new(v4))),
            (RecordType::AAAA, IpAddr::V6(v6)) => Some(RData::AAAA(AAAA::new(v6))),
            _ => None,
        }
    }

    /// Returns the record type tag of this RDATA.
    pub fn record_type(&self) -> crate::rtype::Type {
        use crate::rtype::Type;
        match self {
            RData::A(_) => Type::Known(RecordType::A),
            RData::AAAA(_) => Type::Known(RecordType::AAAA),
            RData::NS(_) => Type::Known(RecordType::NS),
            RData::CNAME(_) => Type::Known(RecordType::CNAME),
            RData::PTR(_) => Type::Known(RecordType::PTR),
            RData::MB(_) => Type::Known(RecordType::MB),
            RData::MD(_) => Type::Known(RecordType::MD),
            RData::MF(_) => Type::Known(RecordType::MF),
            RData::MG(_) => Type::Known(RecordType::MG),
            RData::MR(_) => Type::Known(RecordType::MR),
            RData::MINFO(_) => Type::Known(RecordType::MINFO),
            RData::MX(_) => Type::Known(RecordType::MX),
            RData::SOA(_) => Type::Known(RecordType::SOA),
            RData::HINFO(_) => Type::Known(RecordType::HINFO),
            RData::TXT(_) => Type::Known(RecordType::TXT),
            RData::NULL(_) => Type::Known(RecordType::NULL),
            RData::WKS(_) => Type::Known(RecordType::WKS),
            RData::Unknown(u) => Type::from_u16(u.type_code()),
        }
    }

    /// Returns the uncompressed wire length of this RDATA.
    pub fn wire_len(&self) -> usize {
        match self {
            RData::A(r) => r.wire_len(),
            RData::AAAA(r) => r.wire_len(),
            RData::NS(r) => r.wire_len(),
            RData::CNAME(r) => r.wire_len(),
            RData::PTR(r) => r.wire_len(),
            RData::MB(r) => r.wire_len(),
            RData::MD(r) => r.wire_len(),
            RData::MF(r) => r.wire_len(),
            RData::MG(r) => r.wire_len(),
            RData::MR(r) => r.wire_len(),
            RData::MINFO(r) => r.wire_len(),
            RData::MX(r) => r.wire_len(),
            RData::SOA(r) => r.wire_len(),
            RData::HINFO(r) => r.wire_len(),
            RData::TXT(r) => r.wire_len(),
            RData::NULL(r) => r.wire_len(),
            RData::WKS(r) => r.wire_len(),
            RData::Unknown(r) => r.wire_len(),
        }
    }

    /// Writes this RDATA through a message writer.
    pub fn write(&self, writer: &mut MessageWriter) {
        match self {
            RData::A(r) => r.write(writer),
            RData::AAAA(r) => r.write(writer),
            RData::NS(r) => r.write(writer),
            RData::CNAME(r) => r.write(writer),
            RData::PTR(r) => r.write(writer),
            RData::MB(r) => r.write(writer),
            RData::MD(r) => r.write(writer),
            RData::MF(r) => r.write(writer),
            RData::MG(r) => r.write(writer),
            RData::MR(r) => r.write(writer),
            RData::MINFO(r) => r.write(writer),
            RData::MX(r) => r.write(writer),
            RData::SOA(r) => r.write(writer),
            RData::HINFO(r) => r.write(writer),
            RData::TXT(r) => r.write(writer),
            RData::NULL(r) => r.write(writer),
            RData::WKS(r) => r.write(writer),
            RData::Unknown(r) => r.write(writer),
        }
    }

    /// Returns the IPv4 address if this is an A record.
    pub fn as_a(&self) -> Option<Ipv4Addr> {
        match self {
            RData::A(a) => Some(a.address()),
            _ => None,
        }
    }

    /// Returns the IPv6 address if this is an AAAA record.
    pub fn as_aaaa(&self) -> Option<Ipv6Addr> {
        match self {
            RData::AAAA(aaaa) => Some(aaaa.address()),
            _ => None,
        }
    }

    /// Returns the address if this is an A or AAAA record.
    pub fn as_ip(&self) -> Option<IpAddr> {
        match self {
            RData::A(a) => Some(IpAddr::V4(a.address())),
            RData::AAAA(aaaa) => Some(IpAddr::V6(aaaa.address())),
            _ => None,
        }
    }

    /// Returns the nameserver name if this is an NS record.
    pub fn as_ns(&self) -> Option<&Name> {
        match self {
            RData::NS(ns) => Some(ns.nsdname()),
            _ => None,
        }
    }

    /// Returns the target name if this is a CNAME record.
    pub fn as_cname(&self) -> Option<&Name> {
        match self {
            RData::CNAME(cname) => Some(cname.target()),
            _ => None,
        }
    }
}

impl fmt::Display for RData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RData::A(r) => write!(f, "{r}"),
            RData::AAAA(r) => write!(f, "{r}"),
            RData::NS(r) => write!(f, "{r}"),
            RData::CNAME(r) => write!(f, "{r}"),
            RData::PTR(r) => write!(f, "{r}"),
            RData::MB(r) => write!(f, "{r}"),
            RData::MD(r) => write!(f, "{r}"),
            RData::MF(r) => write!(f, "{r}"),
            RData::MG(r) => write!(f, "{r}"),
            RData::MR(r) => write!(f, "{r}"),
            RData::MINFO(r) => write!(f, "{r}"),
            RData::MX(r) => write!(f, "{r}"),
            RData::SOA(r) => write!(f, "{r}"),
            RData::HINFO(r) => write!(f, "{r}"),
            RData::TXT(r) => write!(f, "{r}"),
            RData::NULL(r) => write!(f, "{r}"),
            RData::WKS(r) => write!(f, "{r}"),
            RData::Unknown(r) => write!(f, "{r}"),
        }
    }
}
