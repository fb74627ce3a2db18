//! Domain name decoding with compression support (RFC 1035 §4.1.4).

use super::Name;
use crate::error::{Error, Result};
use crate::MAX_NAME_LENGTH;
use smallvec::SmallVec;

/// Upper bound on pointer jumps while decoding one name.
const MAX_POINTER_JUMPS: usize = 64;

/// Parser for reading domain names out of a complete DNS message.
///
/// The whole message buffer is required because compression pointers refer
/// to absolute message offsets.
#[derive(Debug, Clone)]
pub struct NameParser<'a> {
    message: &'a [u8],
}

impl<'a> NameParser<'a> {
    /// Creates a name parser over the complete message buffer.
    #[inline]
    pub const fn new(message: &'a [u8]) -> Self {
        Self { message }
    }

    /// Parses a domain name starting at `offset`.
    ///
    /// Returns the name and the number of bytes the name occupies at the
    /// starting position. When a pointer is followed, the consumed count
    /// covers only the bytes up to and including the first pointer, so the
    /// caller's cursor resumes directly after it.
    pub fn parse_name(&self, offset: usize) -> Result<(Name, usize)> {
        let mut wire = SmallVec::<[u8; 64]>::new();
        let mut consumed = 0;
        let mut pos = offset;
        let mut jumps = 0;
        let mut followed_pointer = false;
        let mut label_count = 0u8;

        loop {
            if pos >= self.message.len() {
                return Err(Error::offset_overflow(pos, self.message.len()));
            }

            let tag = self.message[pos];

            match tag & 0xC0 {
                // Compression pointer: 14-bit absolute offset.
                0xC0 => {
                    if pos + 1 >= self.message.len() {
                        return Err(Error::offset_overflow(pos + 1, self.message.len()));
                    }

                    let target =
                        usize::from(u16::from_be_bytes([tag & 0x3F, self.message[pos + 1]]));

                    // Forward or self references cannot occur in messages
                    // produced by a suffix-tracking packer and would allow
                    // loops.
                    if target >= pos {
                        return Err(Error::invalid_name(format!(
                            "pointer at {pos} targets {target}"
                        )));
                    }

                    if !followed_pointer {
                        consumed = pos - offset + 2;
                        followed_pointer = true;
                    }

                    jumps += 1;
                    if jumps > MAX_POINTER_JUMPS {
                        return Err(Error::invalid_name("too many compression pointer jumps"));
                    }

                    pos = target;
                }
                // Reserved label tags 0b01 / 0b10.
                0x40 | 0x80 => {
                    return Err(Error::invalid_name(format!(
                        "reserved label tag 0x{tag:02X} at {pos}"
                    )));
                }
                // Literal label; zero length terminates the name.
                _ => {
                    let len = tag as usize;

                    if len == 0 {
                        wire.push(0);
                        label_count += 1;

                        if !followed_pointer {
                            consumed = pos - offset + 1;
                        }
                        break;
                    }

                    if pos + 1 + len > self.message.len() {
                        return Err(Error::offset_overflow(pos + 1 + len, self.message.len()));
                    }

                    if wire.len() + 1 + len + 1 > MAX_NAME_LENGTH {
                        return Err(Error::NameTooLong {
                            length: wire.len() + 1 + len + 1,
                        });
                    }

                    wire.push(tag);
                    wire.extend_from_slice(&self.message[pos + 1..pos + 1 + len]);
                    label_count += 1;

                    pos += 1 + len;
                }
            }
        }

        Ok((Name::from_parts(wire, label_count), consumed))
    }

    /// Parses a name, discarding the consumed length.
    #[inline]
    pub fn parse(&self, offset: usize) -> Result<Name> {
        self.parse_name(offset).map(|(name, _)| name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_name() {
        let wire = [
            3, b'w', b'w', b'w', 7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm',
            0,
        ];

        let parser = NameParser::new(&wire);
        let (name, consumed) = parser.parse_name(0).unwrap();

        assert_eq!(name.to_string(), "www.example.com.");
        assert_eq!(consumed, wire.len());
    }

    #[test]
    fn test_parse_compressed_name() {
        // example.com. at offset 0, www.<ptr 0> at offset 13.
        let wire = [
            7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm', 0, // 0..13
            3, b'w', b'w', b'w', 0xC0, 0x00, // 13..19
        ];

        let parser = NameParser::new(&wire);

        let (name1, consumed1) = parser.parse_name(0).unwrap();
        assert_eq!(name1.to_string(), "example.com.");
        assert_eq!(consumed1, 13);

        let (name2, consumed2) = parser.parse_name(13).unwrap();
        assert_eq!(name2.to_string(), "www.example.com.");
        // 1 + "www" + 2-byte pointer
        assert_eq!(consumed2, 6);
    }

    #[test]
    fn test_self_pointer_rejected() {
        let wire = [0xC0, 0x00];
        let parser = NameParser::new(&wire);
        assert!(matches!(
            parser.parse_name(0),
            Err(Error::InvalidName { .. })
        ));
    }

    #[test]
    fn test_reserved_tags_rejected() {
        for tag in [0x40u8, 0x80u8] {
            let wire = [tag, 0x00];
            let parser = NameParser::new(&wire);
            assert!(matches!(
                parser.parse_name(0),
                Err(Error::InvalidName { .. })
            ));
        }
    }

    #[test]
    fn test_truncated_name() {
        let wire = [5, b'a', b'b'];
        let parser = NameParser::new(&wire);
        assert!(matches!(
            parser.parse_name(0),
            Err(Error::OffsetOverflow { .. })
        ));
    }
}
