//! EDNS(0) support (RFC 6891).
//!
//! The OPT pseudo-RR repurposes its fixed fields: CLASS carries the
//! requestor's UDP payload size and TTL carries the extended RCODE,
//! version, DO flag, and Z bits. RDATA is a sequence of
//! `(code, length, payload)` options.

use crate::error::{Error, Result};
use crate::message::MessageWriter;
use crate::rtype::RecordType;
use crate::wire::WireReader;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// EDNS option codes recognized by this implementation.
pub mod option_code {
    /// Name Server Identifier (RFC 5001).
    pub const NSID: u16 = 3;
    /// DNSSEC Algorithm Understood (RFC 6975).
    pub const DAU: u16 = 5;
    /// DS Hash Understood (RFC 6975).
    pub const DHU: u16 = 6;
    /// NSEC3 Hash Understood (RFC 6975).
    pub const N3U: u16 = 7;
    /// DNS Cookie (RFC 7873).
    pub const COOKIE: u16 = 10;
}

/// A single EDNS option.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdnsOption {
    /// Name server identifier.
    Nsid(Vec<u8>),
    /// DNSSEC algorithms understood.
    Dau(Vec<u8>),
    /// DS hash algorithms understood.
    Dhu(Vec<u8>),
    /// NSEC3 hash algorithms understood.
    N3u(Vec<u8>),
    /// DNS cookie: 8-octet client cookie, optional 8-32 octet server cookie.
    Cookie {
        /// Client cookie.
        client: [u8; 8],
        /// Server cookie, when present.
        server: Option<Vec<u8>>,
    },
    /// Unrecognized option, payload preserved.
    Unknown {
        /// Option code.
        code: u16,
        /// Raw payload.
        data: Vec<u8>,
    },
}

impl EdnsOption {
    /// Returns the option code.
    pub fn code(&self) -> u16 {
        match self {
            Self::Nsid(_) => option_code::NSID,
            Self::Dau(_) => option_code::DAU,
            Self::Dhu(_) => option_code::DHU,
            Self::N3u(_) => option_code::N3U,
            Self::Cookie { .. } => option_code::COOKIE,
            Self::Unknown { code, .. } => *code,
        }
    }

    /// Returns the payload length.
    fn payload_len(&self) -> usize {
        match self {
            Self::Nsid(d) | Self::Dau(d) | Self::Dhu(d) | Self::N3u(d) => d.len(),
            Self::Cookie { server, .. } => 8 + server.as_ref().map(Vec::len).unwrap_or(0),
            Self::Unknown { data, .. } => data.len(),
        }
    }

    /// Returns the wire length including the 4-byte option header.
    pub fn wire_len(&self) -> usize {
        4 + self.payload_len()
    }

    /// Writes the option through a message writer.
    pub fn write(&self, writer: &mut MessageWriter) {
        writer.write_u16(self.code());
        writer.write_u16(self.payload_len() as u16);

        match self {
            Self::Nsid(d) | Self::Dau(d) | Self::Dhu(d) | Self::N3u(d) => writer.write_bytes(d),
            Self::Cookie { client, server } => {
                writer.write_bytes(client);
                if let Some(s) = server {
                    writer.write_bytes(s);
                }
            }
            Self::Unknown { data, .. } => writer.write_bytes(data),
        }
    }

    /// Parses one option, returning it and the bytes consumed.
    pub fn parse(data: &[u8]) -> Result<(Self, usize)> {
        let mut reader = WireReader::new(data);
        let code = reader.read_u16()?;
        let length = reader.read_u16()? as usize;
        let payload = reader.read_bytes(length)?;

        let option = match code {
            option_code::NSID => Self::Nsid(payload.to_vec()),
            option_code::DAU => Self::Dau(payload.to_vec()),
            option_code::DHU => Self::Dhu(payload.to_vec()),
            option_code::N3U => Self::N3u(payload.to_vec()),
            option_code::COOKIE => {
                if payload.len() < 8 || payload.len() > 40 {
                    return Err(Error::invalid_rrdata(
                        "OPT",
                        format!("cookie option with {} octets", payload.len()),
                    ));
                }
                let client: [u8; 8] = payload[..8].try_into().unwrap();
                let server = if payload.len() > 8 {
                    Some(payload[8..].to_vec())
                } else {
                    None
                };
                Self::Cookie { client, server }
            }
            _ => Self::Unknown {
                code,
                data: payload.to_vec(),
            },
        };

        Ok((option, 4 + length))
    }
}

impl fmt::Display for EdnsOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nsid(d) => write!(f, "NSID {}", String::from_utf8_lossy(d)),
            Self::Dau(d) => write!(f, "DAU {d:?}"),
            Self::Dhu(d) => write!(f, "DHU {d:?}"),
            Self::N3u(d) => write!(f, "N3U {d:?}"),
            Self::Cookie { server, .. } => {
                write!(f, "COOKIE (server: {})", server.is_some())
            }
            Self::Unknown { code, data } => write!(f, "OPT{code} ({} octets)", data.len()),
        }
    }
}

/// Decoded EDNS(0) state carried by an OPT pseudo-RR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edns {
    version: u8,
    udp_size: u16,
    extended_rcode: u8,
    dnssec_ok: bool,
    z: u16,
    options: SmallVec<[EdnsOption; 2]>,
}

impl Edns {
    /// Default advertised UDP payload size.
    pub const DEFAULT_UDP_SIZE: u16 = 4096;

    /// Creates EDNS state with default settings.
    pub fn new() -> Self {
        Self {
            version: 0,
            udp_size: Self::DEFAULT_UDP_SIZE,
            extended_rcode: 0,
            dnssec_ok: false,
            z: 0,
            options: SmallVec::new(),
        }
    }

    /// Returns the advertised UDP payload size, floored at 512.
    #[inline]
    pub fn udp_size(&self) -> u16 {
        self.udp_size.max(512)
    }

    /// Sets the advertised UDP payload size.
    #[inline]
    pub fn set_udp_size(&mut self, size: u16) {
        self.udp_size = size;
    }

    /// Returns the EDNS version.
    #[inline]
    pub const fn version(&self) -> u8 {
        self.version
    }

    /// Returns the extended RCODE bits (upper 8 of the 12-bit rcode).
    #[inline]
    pub const fn extended_rcode(&self) -> u8 {
        self.extended_rcode
    }

    /// Returns the DO (DNSSEC OK) flag.
    #[inline]
    pub const fn dnssec_ok(&self) -> bool {
        self.dnssec_ok
    }

    /// Returns the options.
    #[inline]
    pub fn options(&self) -> &[EdnsOption] {
        &self.options
    }

    /// Adds an option.
    pub fn add_option(&mut self, option: EdnsOption) {
        self.options.push(option);
    }

    /// Parses EDNS state from the OPT record's repurposed fields.
    ///
    /// `class` is the OPT record's class field, `ttl` its TTL field, and
    /// `rdata` its RDATA.
    pub fn parse(class: u16, ttl: u32, rdata: &[u8]) -> Result<Self> {
        let extended_rcode = (ttl >> 24) as u8;
        let version = (ttl >> 16) as u8;
        let dnssec_ok = ttl & 0x8000 != 0;
        let z = (ttl & 0x7FFF) as u16;

        let mut options = SmallVec::new();
        let mut pos = 0;
        while pos < rdata.len() {
            let (option, consumed) = EdnsOption::parse(&rdata[pos..])?;
            options.push(option);
            pos += consumed;
        }

        Ok(Self {
            version,
            udp_size: class,
            extended_rcode,
            dnssec_ok,
            z,
            options,
        })
    }

    /// Returns the TTL field encoding of the extended flags.
    pub fn ttl_bits(&self) -> u32 {
        let mut ttl = u32::from(self.extended_rcode) << 24;
        ttl |= u32::from(self.version) << 16;
        if self.dnssec_ok {
            ttl |= 0x8000;
        }
        ttl |= u32::from(self.z & 0x7FFF);
        ttl
    }

    /// Returns the wire length of the full OPT record.
    pub fn wire_len(&self) -> usize {
        // root name + type + class + ttl + rdlength + options
        1 + 2 + 2 + 4 + 2 + self.options.iter().map(EdnsOption::wire_len).sum::<usize>()
    }

    /// Writes the full OPT pseudo-RR through a message writer.
    pub fn write(&self, writer: &mut MessageWriter) {
        writer.write_u8(0); // root owner name
        writer.write_u16(RecordType::OPT.to_u16());
        writer.write_u16(self.udp_size);
        writer.write_u32(self.ttl_bits());

        let rdlength_at = writer.len();
        writer.write_u16(0);
        let rdata_start = writer.len();

        for option in &self.options {
            option.write(writer);
        }

        writer.patch_u16(rdlength_at, (writer.len() - rdata_start) as u16);
    }
}

impl Default for Edns {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Edns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "version {}, udp {}, do {}",
            self.version, self.udp_size, self.dnssec_ok
        )?;
        for option in &self.options {
            write!(f, "; {option}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edns_ttl_bits() {
        let mut edns = Edns::new();
        edns.extended_rcode = 0x12;
        edns.dnssec_ok = true;

        let ttl = edns.ttl_bits();
        assert_eq!(ttl >> 24, 0x12);
        assert_eq!((ttl >> 16) & 0xFF, 0);
        assert!(ttl & 0x8000 != 0);

        let parsed = Edns::parse(4096, ttl, &[]).unwrap();
        assert_eq!(parsed.extended_rcode(), 0x12);
        assert!(parsed.dnssec_ok());
        assert_eq!(parsed.udp_size(), 4096);
    }

    #[test]
    fn test_cookie_option_roundtrip() {
        let option = EdnsOption::Cookie {
            client: [1, 2, 3, 4, 5, 6, 7, 8],
            server: Some(vec![9; 16]),
        };

        let mut writer = MessageWriter::new(32);
        option.write(&mut writer);

        let (parsed, consumed) = EdnsOption::parse(writer.as_bytes()).unwrap();
        assert_eq!(consumed, option.wire_len());
        assert_eq!(parsed, option);
    }

    #[test]
    fn test_cookie_length_bounds() {
        // 7-octet cookie payload is invalid.
        let mut data = vec![0x00, 0x0A, 0x00, 0x07];
        data.extend_from_slice(&[0u8; 7]);
        assert!(EdnsOption::parse(&data).is_err());
    }

    #[test]
    fn test_unknown_option_preserved() {
        let option = EdnsOption::Unknown {
            code: 0xFDE9,
            data: vec![1, 2, 3],
        };

        let mut writer = MessageWriter::new(16);
        option.write(&mut writer);

        let (parsed, _) = EdnsOption::parse(writer.as_bytes()).unwrap();
        assert_eq!(parsed, option);
    }

    #[test]
    fn test_opt_record_roundtrip() {
        let mut edns = Edns::new();
        edns.add_option(EdnsOption::Nsid(b"sifter".to_vec()));

        let mut writer = MessageWriter::new(64);
        edns.write(&mut writer);
        let wire = writer.freeze();

        // name(1) + type(2) + class(2) + ttl(4) + rdlength(2) + option
        assert_eq!(wire.len(), edns.wire_len());
        assert_eq!(wire[0], 0);
        assert_eq!(u16::from_be_bytes([wire[1], wire[2]]), 41);
    }
}
