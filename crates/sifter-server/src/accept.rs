//! The accept policy.
//!
//! Evaluated on the decoded header alone, before the message body is
//! touched, so malformed or unwanted traffic is rejected as early and
//! as cheaply as possible.

use sifter_proto::{Header, OpCode};

/// What to do with an incoming message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptAction {
    /// Decode the body and run the pipeline.
    Accept,
    /// Answer FORMERR.
    Reject,
    /// Drop silently.
    Ignore,
    /// Answer NOTIMP.
    NotImplemented,
}

/// The default accept policy.
///
/// - Responses (QR set) are ignored.
/// - Opcodes other than QUERY are not implemented.
/// - Multi-question messages are rejected; like most resolvers, this
///   server answers exactly one question per message.
pub fn default_accept(header: &Header) -> AcceptAction {
    if header.is_response() {
        return AcceptAction::Ignore;
    }

    if header.opcode() != Some(OpCode::Query) {
        return AcceptAction::NotImplemented;
    }

    if header.qd_count != 1 {
        return AcceptAction::Reject;
    }

    AcceptAction::Accept
}

#[cfg(test)]
mod tests {
    use super::*;
    use sifter_proto::header::HeaderFlags;

    fn query_header() -> Header {
        Header::query(0x1234)
    }

    #[test]
    fn test_accepts_single_question_query() {
        assert_eq!(default_accept(&query_header()), AcceptAction::Accept);
    }

    #[test]
    fn test_ignores_responses() {
        let mut header = query_header();
        header.flags.insert(HeaderFlags::QR);
        assert_eq!(default_accept(&header), AcceptAction::Ignore);
    }

    #[test]
    fn test_notimpl_for_other_opcodes() {
        for opcode in [1u8, 2, 9] {
            let mut header = query_header();
            header.opcode = opcode;
            assert_eq!(default_accept(&header), AcceptAction::NotImplemented);
        }
    }

    #[test]
    fn test_rejects_bad_question_counts() {
        for count in [0u16, 2, 5] {
            let mut header = query_header();
            header.qd_count = count;
            assert_eq!(default_accept(&header), AcceptAction::Reject);
        }
    }
}
