//! DNS message representation and codec.
//!
//! A message is the fixed header plus four ordered sections (questions,
//! answers, authority, additional) and optional EDNS state lifted out of
//! the OPT pseudo-RR.

use crate::edns::Edns;
use crate::error::{Error, Result};
use crate::header::Header;
use crate::name::Name;
use crate::question::Question;
use crate::rcode::ResponseCode;
use crate::record::{RecordParser, ResourceRecord};
use crate::rtype::RecordType;
use crate::wire::WireWriter;
use crate::HEADER_SIZE;
use bytes::Bytes;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Serializer for outgoing messages with RFC 1035 §4.1.4 name compression.
///
/// The writer owns the compression map: each distinct lowercase name suffix
/// written so far maps to the offset of its first occurrence, and later
/// names referencing a known suffix emit a 2-octet pointer instead. Only
/// offsets below `0x4000` are recorded (pointers carry 14 bits), and only
/// already-written suffixes are ever targeted, so emitted pointers always
/// point backwards and can never form a cycle.
#[derive(Debug, Default)]
pub struct MessageWriter {
    writer: WireWriter,
    compression: HashMap<SmallVec<[u8; 32]>, u16>,
}

impl MessageWriter {
    /// Creates a message writer with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            writer: WireWriter::new(capacity),
            compression: HashMap::new(),
        }
    }

    /// Returns the number of bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.writer.len()
    }

    /// Returns true if nothing has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.writer.is_empty()
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.writer.write_u8(value);
    }

    /// Writes a big-endian u16.
    #[inline]
    pub fn write_u16(&mut self, value: u16) {
        self.writer.write_u16(value);
    }

    /// Writes a big-endian u32.
    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.writer.write_u32(value);
    }

    /// Writes raw bytes.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.writer.write_bytes(bytes);
    }

    /// Writes a 4-octet IPv4 address.
    #[inline]
    pub fn write_ipv4(&mut self, addr: std::net::Ipv4Addr) {
        self.writer.write_ipv4(addr);
    }

    /// Writes a 16-octet IPv6 address.
    #[inline]
    pub fn write_ipv6(&mut self, addr: std::net::Ipv6Addr) {
        self.writer.write_ipv6(addr);
    }

    /// Writes a length-prefixed character string.
    ///
    /// Callers guarantee the 255-octet bound at construction time.
    #[inline]
    pub fn write_character_string(&mut self, data: &[u8]) {
        debug_assert!(data.len() <= 255);
        let len = data.len().min(255);
        self.writer.write_u8(len as u8);
        self.writer.write_bytes(&data[..len]);
    }

    /// Overwrites two bytes at `offset` with a big-endian u16.
    #[inline]
    pub fn patch_u16(&mut self, offset: usize, value: u16) {
        self.writer.patch_u16(offset, value);
    }

    /// Writes a domain name, compressing against previously written names.
    pub fn write_name(&mut self, name: &Name) {
        let wire = name.as_wire();
        if wire.is_empty() {
            self.writer.write_u8(0);
            return;
        }

        let mut pos = 0;
        while pos < wire.len() {
            let len = wire[pos] as usize;
            if len == 0 {
                self.writer.write_u8(0);
                return;
            }

            let suffix: SmallVec<[u8; 32]> =
                wire[pos..].iter().map(|b| b.to_ascii_lowercase()).collect();

            if let Some(&offset) = self.compression.get(&suffix) {
                self.writer.write_u16(0xC000 | offset);
                return;
            }

            let here = self.writer.len();
            if here < 0x4000 {
                self.compression.insert(suffix, here as u16);
            }

            self.writer.write_u8(len as u8);
            self.writer.write_bytes(&wire[pos + 1..pos + 1 + len]);
            pos += 1 + len;
        }

        // Unreachable for stored names, which are always root-terminated.
        self.writer.write_u8(0);
    }

    /// Returns the written data as a slice.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.writer.as_bytes()
    }

    /// Consumes the writer, returning frozen bytes.
    #[inline]
    pub fn freeze(self) -> Bytes {
        self.writer.freeze()
    }
}

/// A complete DNS message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    header: Header,
    questions: Vec<Question>,
    answers: Vec<ResourceRecord>,
    authority: Vec<ResourceRecord>,
    additional: Vec<ResourceRecord>,
    edns: Option<Edns>,
}

impl Message {
    /// Creates an empty message with the given header.
    pub fn new(header: Header) -> Self {
        Self {
            header,
            questions: Vec::new(),
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
            edns: None,
        }
    }

    /// Creates a query message with ID 0 (callers assign the real ID).
    pub fn query(question: Question) -> Self {
        let mut message = Self::new(Header::query(0));
        message.questions.push(question);
        message
    }

    /// Creates a response skeleton from a query: echoes ID, opcode, RD,
    /// questions, and EDNS state; sets QR.
    pub fn response_from(query: &Message) -> Self {
        let mut header = Header::response_from(&query.header);
        header.qd_count = query.questions.len() as u16;

        Self {
            header,
            questions: query.questions.clone(),
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
            edns: query.edns.clone(),
        }
    }

    // =========================================================================
    // Header accessors
    // =========================================================================

    /// Returns the message header.
    #[inline]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Returns a mutable reference to the header.
    #[inline]
    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    /// Returns the message ID.
    #[inline]
    pub fn id(&self) -> u16 {
        self.header.id
    }

    /// Sets the message ID.
    #[inline]
    pub fn set_id(&mut self, id: u16) {
        self.header.id = id;
    }

    /// Returns the response code.
    #[inline]
    pub fn rcode(&self) -> ResponseCode {
        self.header.response_code()
    }

    /// Sets the response code.
    #[inline]
    pub fn set_rcode(&mut self, rcode: ResponseCode) {
        self.header.set_response_code(rcode);
    }

    /// Returns true if this is a query.
    #[inline]
    pub fn is_query(&self) -> bool {
        self.header.is_query()
    }

    /// Returns true if this is a response.
    #[inline]
    pub fn is_response(&self) -> bool {
        self.header.is_response()
    }

    /// Returns true if the message was truncated.
    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.header.is_truncated()
    }

    // =========================================================================
    // Section accessors
    // =========================================================================

    /// Returns the question section.
    #[inline]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Returns the first question if present.
    #[inline]
    pub fn question(&self) -> Option<&Question> {
        self.questions.first()
    }

    /// Returns the answer section.
    #[inline]
    pub fn answers(&self) -> &[ResourceRecord] {
        &self.answers
    }

    /// Returns the authority section.
    #[inline]
    pub fn authority(&self) -> &[ResourceRecord] {
        &self.authority
    }

    /// Returns the additional section (excluding OPT).
    #[inline]
    pub fn additional(&self) -> &[ResourceRecord] {
        &self.additional
    }

    /// Returns the EDNS state if an OPT record was present.
    #[inline]
    pub fn edns(&self) -> Option<&Edns> {
        self.edns.as_ref()
    }

    /// Sets the EDNS state.
    #[inline]
    pub fn set_edns(&mut self, edns: Option<Edns>) {
        self.edns = edns;
        self.update_ar_count();
    }

    // =========================================================================
    // Section mutators
    // =========================================================================

    /// Adds a question.
    pub fn add_question(&mut self, question: Question) {
        self.questions.push(question);
        self.header.qd_count = self.questions.len() as u16;
    }

    /// Adds an answer record.
    pub fn add_answer(&mut self, record: ResourceRecord) {
        self.answers.push(record);
        self.header.an_count = self.answers.len() as u16;
    }

    /// Adds multiple answer records.
    pub fn add_answers(&mut self, records: impl IntoIterator<Item = ResourceRecord>) {
        self.answers.extend(records);
        self.header.an_count = self.answers.len() as u16;
    }

    /// Adds an authority record.
    pub fn add_authority(&mut self, record: ResourceRecord) {
        self.authority.push(record);
        self.header.ns_count = self.authority.len() as u16;
    }

    /// Adds an additional record.
    pub fn add_additional(&mut self, record: ResourceRecord) {
        self.additional.push(record);
        self.update_ar_count();
    }

    /// Attaches answer, authority, and additional sections at once.
    pub fn add_sections(
        &mut self,
        answers: impl IntoIterator<Item = ResourceRecord>,
        authority: impl IntoIterator<Item = ResourceRecord>,
        additional: impl IntoIterator<Item = ResourceRecord>,
    ) {
        self.answers.extend(answers);
        self.authority.extend(authority);
        self.additional.extend(additional);
        self.header.an_count = self.answers.len() as u16;
        self.header.ns_count = self.authority.len() as u16;
        self.update_ar_count();
    }

    /// Clears all answer records.
    pub fn clear_answers(&mut self) {
        self.answers.clear();
        self.header.an_count = 0;
    }

    fn update_ar_count(&mut self) {
        let edns_count = u16::from(self.edns.is_some());
        self.header.ar_count = self.additional.len() as u16 + edns_count;
    }

    // =========================================================================
    // Response shape helpers
    // =========================================================================

    /// Returns true if this is a referral: no answers but NS records in
    /// the authority section.
    pub fn is_referral(&self) -> bool {
        self.answers.is_empty()
            && self
                .authority
                .iter()
                .any(|r| r.record_type() == Some(RecordType::NS))
    }

    /// Returns true if the authority section carries an SOA record
    /// (a negative answer per RFC 2308).
    pub fn has_soa_authority(&self) -> bool {
        self.authority
            .iter()
            .any(|r| r.record_type() == Some(RecordType::SOA))
    }

    // =========================================================================
    // Wire format
    // =========================================================================

    /// Parses a message from wire format.
    ///
    /// The declared section counts are treated as hints: a section that
    /// ends early (truncated or lying count) is kept at its actually
    /// parsed length and the header counts are corrected to match.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut header = Header::parse(data)?;
        let mut offset = HEADER_SIZE;

        let mut questions = Vec::with_capacity(header.qd_count.min(4) as usize);
        for _ in 0..header.qd_count {
            if offset >= data.len() {
                break;
            }
            match Question::parse(data, offset) {
                Ok((question, consumed)) => {
                    // Type 0 is reserved; a question carrying it is
                    // padding behind a lying count, not data.
                    if consumed == 0 || question.qtype.to_u16() == 0 {
                        break;
                    }
                    offset += consumed;
                    questions.push(question);
                }
                Err(_) => break,
            }
        }

        let mut sections: [Vec<ResourceRecord>; 3] = [Vec::new(), Vec::new(), Vec::new()];
        let counts = [header.an_count, header.ns_count, header.ar_count];

        'sections: for (section, &count) in sections.iter_mut().zip(counts.iter()) {
            let mut parser = RecordParser::new(data, offset, count);
            loop {
                match parser.next() {
                    Ok(Some(record)) => section.push(record),
                    Ok(None) => break,
                    // A record that fails to parse truncates its section
                    // and everything after it.
                    Err(_) => break 'sections,
                }
            }
            offset = parser.offset();
        }

        let [answers, authority, mut additional] = sections;

        // Lift OPT pseudo-RRs out of the additional section.
        let mut edns = None;
        let mut plain_additional = Vec::with_capacity(additional.len());
        for record in additional.drain(..) {
            if record.record_type() == Some(RecordType::OPT) {
                if edns.is_some() {
                    return Err(Error::MultipleOptRecords);
                }
                let rdata_wire = {
                    let mut w = MessageWriter::new(record.rdata().wire_len());
                    record.rdata().write(&mut w);
                    w.freeze()
                };
                edns = Some(Edns::parse(
                    record.rclass().to_u16(),
                    record.ttl(),
                    &rdata_wire,
                )?);
            } else {
                plain_additional.push(record);
            }
        }

        // Parsed section lengths override the declared counts.
        header.qd_count = questions.len() as u16;
        header.an_count = answers.len() as u16;
        header.ns_count = authority.len() as u16;
        header.ar_count = plain_additional.len() as u16 + u16::from(edns.is_some());

        Ok(Self {
            header,
            questions,
            answers,
            authority,
            additional: plain_additional,
            edns,
        })
    }

    /// Returns the uncompressed wire length of this message.
    pub fn wire_len(&self) -> usize {
        let mut len = HEADER_SIZE;
        for q in &self.questions {
            len += q.qname.wire_len() + 4;
        }
        for r in self
            .answers
            .iter()
            .chain(&self.authority)
            .chain(&self.additional)
        {
            len += r.wire_len();
        }
        if let Some(edns) = &self.edns {
            len += edns.wire_len();
        }
        len
    }

    /// Serializes the message to wire format with name compression.
    pub fn write(&self, writer: &mut MessageWriter) {
        let mut header = self.header.clone();
        header.qd_count = self.questions.len() as u16;
        header.an_count = self.answers.len() as u16;
        header.ns_count = self.authority.len() as u16;
        header.ar_count = self.additional.len() as u16 + u16::from(self.edns.is_some());

        let mut head = WireWriter::new(HEADER_SIZE);
        header.write(&mut head);
        writer.write_bytes(head.as_bytes());

        for q in &self.questions {
            q.write(writer);
        }
        for r in &self.answers {
            r.write(writer);
        }
        for r in &self.authority {
            r.write(writer);
        }
        for r in &self.additional {
            r.write(writer);
        }
        if let Some(edns) = &self.edns {
            edns.write(writer);
        }
    }

    /// Converts the message to wire format bytes.
    pub fn to_wire(&self) -> Bytes {
        let mut writer = MessageWriter::new(self.wire_len());
        self.write(&mut writer);
        writer.freeze()
    }

    /// Truncates the message to fit `max_size` serialized bytes.
    ///
    /// Records are dropped additional-first, then authority, then answers;
    /// TC is set whenever anything was dropped.
    pub fn truncate_to(&mut self, max_size: usize) {
        let mut dropped = false;

        while self.to_wire().len() > max_size {
            if self.additional.pop().is_some()
                || self.authority.pop().is_some()
                || self.answers.pop().is_some()
            {
                dropped = true;
                continue;
            }
            break;
        }

        if dropped {
            self.header.set_truncated(true);
            self.header.an_count = self.answers.len() as u16;
            self.header.ns_count = self.authority.len() as u16;
            self.update_ar_count();
        }
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::new(Header::default())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, ";; {}", self.header)?;

        for q in &self.questions {
            writeln!(f, ";{q}")?;
        }
        for r in &self.answers {
            writeln!(f, "{r}")?;
        }
        for r in &self.authority {
            writeln!(f, "{r}")?;
        }
        for r in &self.additional {
            writeln!(f, "{r}")?;
        }
        if let Some(edns) = &self.edns {
            writeln!(f, ";; OPT: {edns}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::NameParser;
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    #[test]
    fn test_message_roundtrip() {
        let mut query = Message::query(Question::a(Name::from_str("example.com").unwrap()));
        query.set_id(0x1234);

        let wire = query.to_wire();
        let parsed = Message::parse(&wire).unwrap();

        assert_eq!(parsed.id(), 0x1234);
        assert!(parsed.is_query());
        assert_eq!(parsed.questions(), query.questions());
    }

    #[test]
    fn test_answer_owner_is_compressed() {
        let name = Name::from_str("www.example.com").unwrap();
        let mut response = Message::response_from(&Message::query(Question::a(name.clone())));
        response.add_answer(ResourceRecord::a(name, 300, Ipv4Addr::new(192, 0, 2, 1)));

        let wire = response.to_wire();

        // The answer's owner name must be a pointer to the question name
        // at offset 12.
        let question_len = Name::from_str("www.example.com").unwrap().wire_len() + 4;
        let answer_start = HEADER_SIZE + question_len;
        assert_eq!(wire[answer_start], 0xC0);
        assert_eq!(wire[answer_start + 1], 12);

        // And it must decode back to the full name.
        let parsed = Message::parse(&wire).unwrap();
        assert_eq!(
            parsed.answers()[0].name().to_string(),
            "www.example.com."
        );
    }

    #[test]
    fn test_compressed_response_fixture() {
        // 32-byte datagram: ID 0x1234, QR RA RD, one question, one answer
        // whose owner is a pointer to offset 12.
        let wire: Vec<u8> = vec![
            0x12, 0x34, 0x81, 0x80, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, // header
            0x03, b'w', b'w', b'w', 0x07, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0x03, b'c',
            b'o', b'm', 0x00, // www.example.com.
            0x00, 0x01, 0x00, 0x01, // A IN
            0xC0, 0x0C, // pointer to offset 12
            0x00, 0x01, 0x00, 0x01, // A IN
            0x00, 0x00, 0x0E, 0x10, // TTL 3600
            0x00, 0x04, 0x5D, 0xB8, 0xD8, 0x22, // 93.184.216.34
        ];

        let message = Message::parse(&wire).unwrap();
        assert_eq!(message.id(), 0x1234);
        assert!(message.is_response());
        assert!(message.header().recursion_available());
        assert_eq!(message.questions().len(), 1);
        assert_eq!(message.questions()[0].qname.to_string(), "www.example.com.");

        let answer = &message.answers()[0];
        assert_eq!(answer.name().to_string(), "www.example.com.");
        assert_eq!(answer.ttl(), 3600);
        assert_eq!(
            answer.rdata().as_a(),
            Some(Ipv4Addr::new(93, 184, 216, 34))
        );
    }

    #[test]
    fn test_lying_qdcount_corrected() {
        // QDCOUNT declares 5 but only one question is present.
        let mut query = Message::query(Question::a(Name::from_str("example.com").unwrap()));
        query.set_id(0x0042);
        let mut wire = query.to_wire().to_vec();
        wire[4] = 0x00;
        wire[5] = 0x05;

        let parsed = Message::parse(&wire).unwrap();
        assert_eq!(parsed.questions().len(), 1);
        assert_eq!(parsed.header().qd_count, 1);
    }

    #[test]
    fn test_lying_qdcount_with_zero_padding() {
        // QDCOUNT 5, one real question, then a run of zero bytes.
        let mut query = Message::query(Question::a(Name::from_str("example.com").unwrap()));
        query.set_id(0x0042);
        let mut wire = query.to_wire().to_vec();
        wire[4] = 0x00;
        wire[5] = 0x05;
        wire.extend_from_slice(&[0u8; 24]);

        let parsed = Message::parse(&wire).unwrap();
        assert_eq!(parsed.questions().len(), 1);
        assert_eq!(parsed.header().qd_count, 1);
        assert_eq!(parsed.questions()[0].qname.to_string(), "example.com.");
    }

    #[test]
    fn test_header_only_message() {
        let mut wire = vec![0u8; HEADER_SIZE];
        wire[0] = 0x00;
        wire[1] = 0x07;
        wire[5] = 0x01; // claims one question, has none

        let parsed = Message::parse(&wire).unwrap();
        assert_eq!(parsed.id(), 7);
        assert!(parsed.questions().is_empty());
        assert_eq!(parsed.header().qd_count, 0);
    }

    #[test]
    fn test_truncated_answer_section() {
        let name = Name::from_str("example.com").unwrap();
        let mut response = Message::response_from(&Message::query(Question::a(name.clone())));
        response.add_answer(ResourceRecord::a(name.clone(), 300, Ipv4Addr::new(1, 1, 1, 1)));
        response.add_answer(ResourceRecord::a(name, 300, Ipv4Addr::new(2, 2, 2, 2)));

        // Chop the second answer in half.
        let wire = response.to_wire();
        let parsed = Message::parse(&wire[..wire.len() - 5]).unwrap();
        assert_eq!(parsed.answers().len(), 1);
        assert_eq!(parsed.header().an_count, 1);
    }

    #[test]
    fn test_opt_lifted_to_edns() {
        let mut query = Message::query(Question::a(Name::from_str("example.com").unwrap()));
        query.set_edns(Some(Edns::new()));

        let wire = query.to_wire();
        let parsed = Message::parse(&wire).unwrap();

        assert!(parsed.edns().is_some());
        assert!(parsed.additional().is_empty());
        assert_eq!(parsed.edns().unwrap().udp_size(), Edns::DEFAULT_UDP_SIZE);
        assert_eq!(parsed.header().ar_count, 1);
    }

    #[test]
    fn test_truncate_to() {
        let name = Name::from_str("example.com").unwrap();
        let mut response = Message::response_from(&Message::query(Question::a(name.clone())));
        for i in 0..100 {
            response.add_answer(ResourceRecord::a(
                name.clone(),
                300,
                Ipv4Addr::new(192, 0, 2, i as u8),
            ));
        }

        response.truncate_to(512);
        assert!(response.to_wire().len() <= 512);
        assert!(response.is_truncated());
        assert!(response.answers().len() < 100);
    }

    #[test]
    fn test_shared_suffix_compression() {
        // Two records sharing the example.com suffix: the second owner
        // must reuse it via a pointer, and both must decode identically.
        let q = Question::a(Name::from_str("a.example.com").unwrap());
        let mut response = Message::response_from(&Message::query(q));
        response.add_answer(ResourceRecord::a(
            Name::from_str("a.example.com").unwrap(),
            300,
            Ipv4Addr::new(192, 0, 2, 1),
        ));
        response.add_answer(ResourceRecord::a(
            Name::from_str("b.example.com").unwrap(),
            300,
            Ipv4Addr::new(192, 0, 2, 2),
        ));

        let wire = response.to_wire();
        let parsed = Message::parse(&wire).unwrap();
        assert_eq!(parsed.answers()[0].name().to_string(), "a.example.com.");
        assert_eq!(parsed.answers()[1].name().to_string(), "b.example.com.");

        // The full form of b.example.com is 15 bytes; compression must
        // have shortened it.
        assert!(wire.len() < response.wire_len());

        // Every pointer in the message must resolve (no cycles).
        let parser = NameParser::new(&wire);
        assert!(parser.parse_name(HEADER_SIZE).is_ok());
    }
}
