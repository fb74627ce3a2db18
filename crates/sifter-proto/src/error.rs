//! DNS protocol error types.

use thiserror::Error;

/// Result type alias for DNS protocol operations.
pub type Result<T> = std::result::Result<T, Error>;

/// DNS protocol errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A read or write would cross the end of the message buffer.
    #[error("offset overflow: access at {offset} exceeds message length {length}")]
    OffsetOverflow {
        /// Offset that was accessed.
        offset: usize,
        /// Total buffer length.
        length: usize,
    },

    /// A domain name is malformed (reserved label tag, bad pointer, bad
    /// character, or over-long label/name).
    #[error("invalid name: {message}")]
    InvalidName {
        /// Description of the violation.
        message: String,
    },

    /// Label exceeds the 63-byte maximum.
    #[error("label too long: {length} bytes exceeds maximum of 63")]
    LabelTooLong {
        /// Actual label length.
        length: usize,
    },

    /// Domain name exceeds the 255-byte wire maximum.
    #[error("name too long: {length} bytes exceeds maximum of 255")]
    NameTooLong {
        /// Actual wire length.
        length: usize,
    },

    /// RDATA does not match the shape the record type requires.
    #[error("invalid RDATA for {rtype}: {message}")]
    InvalidRRData {
        /// Record type name.
        rtype: &'static str,
        /// Description of the violation.
        message: String,
    },

    /// A value could not be converted into the type a record field expects.
    #[error("conversion failed: {message}")]
    ConversionFailed {
        /// Description of the violation.
        message: String,
    },

    /// The numeric record type has no known variant.
    #[error("no such record type: {value}")]
    NoSuchType {
        /// The unrecognized type code.
        value: u16,
    },

    /// Character string exceeds 255 bytes.
    #[error("character string too long: {length} bytes")]
    CharacterStringTooLong {
        /// Actual string length.
        length: usize,
    },

    /// An SOA serial operation left the RFC 1982 bounds.
    #[error("serial out of range: {value}")]
    SerialOutOfRange {
        /// The offending addend.
        value: i64,
    },

    /// More than one OPT pseudo-RR in a message.
    #[error("multiple OPT records in message")]
    MultipleOptRecords,
}

impl Error {
    /// Creates a new `OffsetOverflow` error.
    #[inline]
    pub fn offset_overflow(offset: usize, length: usize) -> Self {
        Self::OffsetOverflow { offset, length }
    }

    /// Creates a new `InvalidName` error.
    #[inline]
    pub fn invalid_name(message: impl Into<String>) -> Self {
        Self::InvalidName {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidRRData` error.
    #[inline]
    pub fn invalid_rrdata(rtype: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidRRData {
            rtype,
            message: message.into(),
        }
    }

    /// Creates a new `ConversionFailed` error.
    #[inline]
    pub fn conversion_failed(message: impl Into<String>) -> Self {
        Self::ConversionFailed {
            message: message.into(),
        }
    }

    /// Returns true if this error indicates a malformed message that should
    /// be dropped without a response.
    #[inline]
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::OffsetOverflow { .. } | Self::InvalidName { .. }
        )
    }
}
