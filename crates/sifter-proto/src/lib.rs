//! # Sifter DNS Protocol Library
//!
//! DNS protocol types, wire format parsing, and serialization following
//! RFC 1035 with the AAAA (RFC 3596) and EDNS0 (RFC 6891) extensions.
//!
//! ## Features
//!
//! - Wire codec with RFC 1035 §4.1.4 name compression on both paths
//! - All RFC 1035 §3.3/§3.4 record types plus AAAA and OPT
//! - Defensive section parsing: declared counts never outrun the buffer
//! - Unknown record types survive round-tripping as opaque RDATA
//!
//! ## Example
//!
//! ```rust
//! use sifter_proto::{Message, Question, Name};
//! use std::str::FromStr;
//!
//! let query = Message::query(Question::a(Name::from_str("example.com.").unwrap()));
//! let wire = query.to_wire();
//! let parsed = Message::parse(&wire).unwrap();
//! assert_eq!(parsed.id(), query.id());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod class;
pub mod edns;
pub mod error;
pub mod header;
pub mod message;
pub mod name;
pub mod opcode;
pub mod question;
pub mod rcode;
pub mod rdata;
pub mod record;
pub mod rtype;
pub mod wire;

pub use class::{Class, RecordClass};
pub use edns::{Edns, EdnsOption};
pub use error::{Error, Result};
pub use header::Header;
pub use message::{Message, MessageWriter};
pub use name::Name;
pub use opcode::OpCode;
pub use question::Question;
pub use rcode::ResponseCode;
pub use rdata::RData;
pub use record::ResourceRecord;
pub use rtype::{RecordType, Type};

/// Maximum length of a DNS label (63 bytes per RFC 1035).
pub const MAX_LABEL_LENGTH: usize = 63;

/// Maximum length of a domain name in wire format (255 bytes per RFC 1035).
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum size of a UDP DNS message without EDNS0 (512 bytes per RFC 1035).
pub const MAX_UDP_MESSAGE_SIZE: usize = 512;

/// Size of the fixed DNS header in bytes.
pub const HEADER_SIZE: usize = 12;

/// DNS port (53).
pub const DNS_PORT: u16 = 53;
