//! DNS message header.
//!
//! The fixed 12-byte structure at the start of every DNS message.

use crate::error::{Error, Result};
use crate::opcode::OpCode;
use crate::rcode::ResponseCode;
use crate::wire::{WireReader, WireWriter};
use crate::HEADER_SIZE;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Single-bit DNS header flags.
    ///
    /// OPCODE and RCODE occupy the remaining bits of the flag word and are
    /// kept as separate header fields.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct HeaderFlags: u16 {
        /// Query/Response: 0 = query, 1 = response.
        const QR = 0x8000;
        /// Authoritative answer.
        const AA = 0x0400;
        /// Truncation.
        const TC = 0x0200;
        /// Recursion desired.
        const RD = 0x0100;
        /// Recursion available.
        const RA = 0x0080;
        /// Reserved (must be zero).
        const Z = 0x0040;
    }
}

impl Default for HeaderFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// DNS message header.
///
/// # Wire Format
///
/// ```text
///                                 1  1  1  1  1  1
///   0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                      ID                       |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |QR|   Opcode  |AA|TC|RD|RA| Z|      RCODE      |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    QDCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    ANCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    NSCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                    ARCOUNT                    |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
///
/// OPCODE and RCODE are stored as raw 4-bit values so that messages using
/// codes this server does not know still round-trip; typed accessors cover
/// the known ranges. The section counts are attacker-controlled on decode
/// and are overridden by the actually-parsed section lengths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Message identifier for matching requests to responses.
    pub id: u16,
    /// Single-bit flags.
    pub flags: HeaderFlags,
    /// Raw 4-bit operation code.
    pub opcode: u8,
    /// Raw 4-bit response code.
    pub rcode: u8,
    /// Number of questions.
    pub qd_count: u16,
    /// Number of answer records.
    pub an_count: u16,
    /// Number of authority records.
    pub ns_count: u16,
    /// Number of additional records.
    pub ar_count: u16,
}

impl Header {
    /// Creates a new header with the given message ID.
    #[inline]
    pub const fn new(id: u16) -> Self {
        Self {
            id,
            flags: HeaderFlags::empty(),
            opcode: 0,
            rcode: 0,
            qd_count: 0,
            an_count: 0,
            ns_count: 0,
            ar_count: 0,
        }
    }

    /// Creates a query header with recursion desired.
    pub fn query(id: u16) -> Self {
        Self {
            id,
            flags: HeaderFlags::RD,
            opcode: OpCode::Query.to_u8(),
            rcode: 0,
            qd_count: 1,
            an_count: 0,
            ns_count: 0,
            ar_count: 0,
        }
    }

    /// Creates a response header from a query header.
    ///
    /// Echoes the ID, opcode, and RD flag; sets QR.
    pub fn response_from(query: &Header) -> Self {
        Self {
            id: query.id,
            flags: HeaderFlags::QR | (query.flags & HeaderFlags::RD),
            opcode: query.opcode,
            rcode: 0,
            qd_count: query.qd_count,
            an_count: 0,
            ns_count: 0,
            ar_count: 0,
        }
    }

    /// Returns the typed opcode, if known.
    #[inline]
    pub fn opcode(&self) -> Option<OpCode> {
        OpCode::from_u8(self.opcode)
    }

    /// Returns the typed response code, mapping unknown values to SERVFAIL.
    #[inline]
    pub fn response_code(&self) -> ResponseCode {
        ResponseCode::from_u8(self.rcode).unwrap_or(ResponseCode::ServerFailure)
    }

    /// Sets the response code.
    #[inline]
    pub fn set_response_code(&mut self, rcode: ResponseCode) {
        self.rcode = rcode.to_u8();
    }

    /// Returns true if this is a query.
    #[inline]
    pub fn is_query(&self) -> bool {
        !self.flags.contains(HeaderFlags::QR)
    }

    /// Returns true if this is a response.
    #[inline]
    pub fn is_response(&self) -> bool {
        self.flags.contains(HeaderFlags::QR)
    }

    /// Returns true if the message was truncated.
    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.flags.contains(HeaderFlags::TC)
    }

    /// Returns true if recursion was requested.
    #[inline]
    pub fn recursion_desired(&self) -> bool {
        self.flags.contains(HeaderFlags::RD)
    }

    /// Returns true if recursion is available.
    #[inline]
    pub fn recursion_available(&self) -> bool {
        self.flags.contains(HeaderFlags::RA)
    }

    /// Sets or clears the QR flag.
    #[inline]
    pub fn set_response(&mut self, response: bool) {
        self.flags.set(HeaderFlags::QR, response);
    }

    /// Sets or clears the AA flag.
    #[inline]
    pub fn set_authoritative(&mut self, aa: bool) {
        self.flags.set(HeaderFlags::AA, aa);
    }

    /// Sets or clears the TC flag.
    #[inline]
    pub fn set_truncated(&mut self, tc: bool) {
        self.flags.set(HeaderFlags::TC, tc);
    }

    /// Sets or clears the RD flag.
    #[inline]
    pub fn set_recursion_desired(&mut self, rd: bool) {
        self.flags.set(HeaderFlags::RD, rd);
    }

    /// Sets or clears the RA flag.
    #[inline]
    pub fn set_recursion_available(&mut self, ra: bool) {
        self.flags.set(HeaderFlags::RA, ra);
    }

    /// Parses a header from the first 12 bytes of a message.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::offset_overflow(HEADER_SIZE, data.len()));
        }

        let mut reader = WireReader::new(data);
        let id = reader.read_u16()?;
        let flag_word = reader.read_u16()?;

        let opcode = ((flag_word >> 11) & 0x0F) as u8;
        let rcode = (flag_word & 0x0F) as u8;
        let flags = HeaderFlags::from_bits_truncate(flag_word);

        Ok(Self {
            id,
            flags,
            opcode,
            rcode,
            qd_count: reader.read_u16()?,
            an_count: reader.read_u16()?,
            ns_count: reader.read_u16()?,
            ar_count: reader.read_u16()?,
        })
    }

    /// Writes the header to a wire writer.
    pub fn write(&self, writer: &mut WireWriter) {
        let mut flag_word = self.flags.bits();
        flag_word |= u16::from(self.opcode & 0x0F) << 11;
        flag_word |= u16::from(self.rcode & 0x0F);

        writer.write_u16(self.id);
        writer.write_u16(flag_word);
        writer.write_u16(self.qd_count);
        writer.write_u16(self.an_count);
        writer.write_u16(self.ns_count);
        writer.write_u16(self.ar_count);
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID:{:04X} {} op:{} {}",
            self.id,
            if self.is_query() { "query" } else { "response" },
            self.opcode,
            self.response_code(),
        )?;

        for (flag, label) in [
            (HeaderFlags::AA, "AA"),
            (HeaderFlags::TC, "TC"),
            (HeaderFlags::RD, "RD"),
            (HeaderFlags::RA, "RA"),
        ] {
            if self.flags.contains(flag) {
                write!(f, " {label}")?;
            }
        }

        write!(
            f,
            " QD:{} AN:{} NS:{} AR:{}",
            self.qd_count, self.an_count, self.ns_count, self.ar_count
        )
    }
}
