//! DNS question section.

use crate::class::{Class, RecordClass};
use crate::error::Result;
use crate::message::MessageWriter;
use crate::name::{Name, NameParser};
use crate::rtype::{RecordType, Type};
use crate::wire::WireReader;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A DNS question: owner name, query type, query class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Question {
    /// The domain name being queried.
    pub qname: Name,
    /// The type of record being requested.
    pub qtype: Type,
    /// The class of the query (usually IN).
    pub qclass: Class,
}

impl Question {
    /// Creates a new question.
    #[inline]
    pub fn new(qname: Name, qtype: RecordType, qclass: RecordClass) -> Self {
        Self {
            qname,
            qtype: Type::Known(qtype),
            qclass: Class::Known(qclass),
        }
    }

    /// Creates a question for an A record lookup.
    #[inline]
    pub fn a(name: Name) -> Self {
        Self::new(name, RecordType::A, RecordClass::IN)
    }

    /// Creates a question for an AAAA record lookup.
    #[inline]
    pub fn aaaa(name: Name) -> Self {
        Self::new(name, RecordType::AAAA, RecordClass::IN)
    }

    /// Returns the record type if known.
    #[inline]
    pub fn record_type(&self) -> Option<RecordType> {
        self.qtype.as_known()
    }

    /// Returns true if this is an A or AAAA query.
    #[inline]
    pub fn is_address_query(&self) -> bool {
        matches!(
            self.qtype,
            Type::Known(RecordType::A) | Type::Known(RecordType::AAAA)
        )
    }

    /// Parses a question from wire format.
    ///
    /// Returns the question and the number of bytes consumed.
    pub fn parse(data: &[u8], offset: usize) -> Result<(Self, usize)> {
        let parser = NameParser::new(data);
        let (qname, name_len) = parser.parse_name(offset)?;

        let mut reader = WireReader::new(data);
        reader.set_position(offset + name_len);
        let qtype = Type::from_u16(reader.read_u16()?);
        let qclass = Class::from_u16(reader.read_u16()?);

        Ok((
            Self {
                qname,
                qtype,
                qclass,
            },
            name_len + 4,
        ))
    }

    /// Writes the question through a message writer.
    pub fn write(&self, writer: &mut MessageWriter) {
        writer.write_name(&self.qname);
        writer.write_u16(self.qtype.to_u16());
        writer.write_u16(self.qclass.to_u16());
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.qname, self.qclass, self.qtype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_question_roundtrip() {
        let original = Question::a(Name::from_str("www.example.com").unwrap());

        let mut writer = MessageWriter::new(64);
        original.write(&mut writer);
        let wire = writer.freeze();

        let (parsed, consumed) = Question::parse(&wire, 0).unwrap();
        assert_eq!(consumed, wire.len());
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_question_display() {
        let q = Question::a(Name::from_str("example.com").unwrap());
        assert_eq!(q.to_string(), "example.com. IN A");
    }
}
