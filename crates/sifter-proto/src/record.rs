//! DNS resource records.

use crate::class::{Class, RecordClass};
use crate::error::{Error, Result};
use crate::message::MessageWriter;
use crate::name::{Name, NameParser};
use crate::rdata::{RData, Unknown};
use crate::rtype::{RecordType, Type};
use crate::wire::WireReader;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A DNS resource record.
///
/// # Wire Format
///
/// ```text
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// /                      NAME                     /
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                      TYPE                     |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                     CLASS                     |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                      TTL                      |
/// |                                               |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                   RDLENGTH                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// /                     RDATA                     /
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
///
/// RDLENGTH is derived from the serialized RDATA and back-patched after the
/// RDATA has been written, so compression savings are reflected correctly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRecord {
    name: Name,
    rtype: Type,
    rclass: Class,
    ttl: u32,
    rdata: RData,
}

impl ResourceRecord {
    /// Creates a new resource record.
    pub fn new(name: Name, rtype: Type, rclass: Class, ttl: u32, rdata: RData) -> Self {
        Self {
            name,
            rtype,
            rclass,
            ttl,
            rdata,
        }
    }

    /// Creates a record whose type tag is derived from the RDATA.
    pub fn from_rdata(name: Name, ttl: u32, rdata: RData) -> Self {
        Self {
            name,
            rtype: rdata.record_type(),
            rclass: Class::Known(RecordClass::IN),
            ttl,
            rdata,
        }
    }

    /// Creates an A record.
    pub fn a(name: Name, ttl: u32, addr: std::net::Ipv4Addr) -> Self {
        Self::from_rdata(name, ttl, RData::A(crate::rdata::A::new(addr)))
    }

    /// Creates an AAAA record.
    pub fn aaaa(name: Name, ttl: u32, addr: std::net::Ipv6Addr) -> Self {
        Self::from_rdata(name, ttl, RData::AAAA(crate::rdata::AAAA::new(addr)))
    }

    /// Creates an NS record.
    pub fn ns(name: Name, ttl: u32, nsdname: Name) -> Self {
        Self::from_rdata(name, ttl, RData::NS(crate::rdata::NS::new(nsdname)))
    }

    /// Creates a CNAME record.
    pub fn cname(name: Name, ttl: u32, target: Name) -> Self {
        Self::from_rdata(name, ttl, RData::CNAME(crate::rdata::CNAME::new(target)))
    }

    /// Returns the owner name.
    #[inline]
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Returns the record type tag.
    #[inline]
    pub fn rtype(&self) -> Type {
        self.rtype
    }

    /// Returns the record type if known.
    #[inline]
    pub fn record_type(&self) -> Option<RecordType> {
        self.rtype.as_known()
    }

    /// Returns the record class tag.
    #[inline]
    pub fn rclass(&self) -> Class {
        self.rclass
    }

    /// Returns the TTL in seconds.
    #[inline]
    pub const fn ttl(&self) -> u32 {
        self.ttl
    }

    /// Returns a copy with a different TTL.
    #[must_use]
    pub fn with_ttl(&self, ttl: u32) -> Self {
        let mut record = self.clone();
        record.ttl = ttl;
        record
    }

    /// Returns the record data.
    #[inline]
    pub fn rdata(&self) -> &RData {
        &self.rdata
    }

    /// Semantic equality: same owner, type, class, and RDATA.
    ///
    /// The TTL is deliberately excluded so refreshed copies of a record
    /// deduplicate against cached ones.
    pub fn is_same(&self, other: &ResourceRecord) -> bool {
        self.name == other.name
            && self.rtype == other.rtype
            && self.rclass == other.rclass
            && self.rdata == other.rdata
    }

    /// Parses a resource record from wire format.
    ///
    /// Returns the record and the number of bytes consumed. RDATA of a
    /// type without a wire shape known to this server is preserved as
    /// opaque bytes.
    pub fn parse(data: &[u8], offset: usize) -> Result<(Self, usize)> {
        let parser = NameParser::new(data);
        let (name, name_len) = parser.parse_name(offset)?;

        let mut reader = WireReader::new(data);
        reader.set_position(offset + name_len);

        let rtype_value = reader.read_u16()?;
        let rclass_value = reader.read_u16()?;
        let ttl = reader.read_u32()?;
        let rdlength = reader.read_u16()?;

        let rdata_start = reader.position();
        let rdata_end = rdata_start + rdlength as usize;
        if rdata_end > data.len() {
            return Err(Error::offset_overflow(rdata_end, data.len()));
        }

        let rtype = Type::from_u16(rtype_value);
        let rdata = match rtype {
            Type::Known(known) => match RData::parse(known, data, rdata_start, rdlength) {
                Ok(rdata) => rdata,
                // Meta query types and OPT carry no parseable shape here;
                // keep the bytes so the record still round-trips.
                Err(Error::NoSuchType { .. }) => RData::Unknown(Unknown::new(
                    rtype_value,
                    data[rdata_start..rdata_end].to_vec(),
                )),
                Err(e) => return Err(e),
            },
            Type::Unknown(value) => {
                RData::Unknown(Unknown::new(value, data[rdata_start..rdata_end].to_vec()))
            }
        };

        Ok((
            Self {
                name,
                rtype,
                rclass: Class::from_u16(rclass_value),
                ttl,
                rdata,
            },
            name_len + 10 + rdlength as usize,
        ))
    }

    /// Returns the uncompressed wire length.
    pub fn wire_len(&self) -> usize {
        self.name.wire_len() + 10 + self.rdata.wire_len()
    }

    /// Writes the record through a message writer, back-patching RDLENGTH.
    pub fn write(&self, writer: &mut MessageWriter) {
        writer.write_name(&self.name);
        writer.write_u16(self.rtype.to_u16());
        writer.write_u16(self.rclass.to_u16());
        writer.write_u32(self.ttl);

        let rdlength_at = writer.len();
        writer.write_u16(0);
        let rdata_start = writer.len();
        self.rdata.write(writer);
        writer.patch_u16(rdlength_at, (writer.len() - rdata_start) as u16);
    }
}

impl fmt::Display for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.name, self.ttl, self.rclass, self.rtype, self.rdata
        )
    }
}

/// Sequential parser for a record section.
#[derive(Debug)]
pub struct RecordParser<'a> {
    data: &'a [u8],
    offset: usize,
    remaining: u16,
}

impl<'a> RecordParser<'a> {
    /// Creates a parser for `count` records starting at `offset`.
    #[inline]
    pub const fn new(data: &'a [u8], offset: usize, count: u16) -> Self {
        Self {
            data,
            offset,
            remaining: count,
        }
    }

    /// Returns the current offset.
    #[inline]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Parses the next record, or returns `None` when the declared count
    /// is exhausted.
    pub fn next(&mut self) -> Result<Option<ResourceRecord>> {
        if self.remaining == 0 {
            return Ok(None);
        }

        let (record, consumed) = ResourceRecord::parse(self.data, self.offset)?;
        if consumed == 0 {
            // A non-advancing cursor means the declared count lied.
            self.remaining = 0;
            return Ok(None);
        }

        self.offset += consumed;
        self.remaining -= 1;
        Ok(Some(record))
    }
}
