//! Typed codec for the SM engine's comma-delimited datagram format.
//!
//! Both directions carry ten positional fields:
//!
//! ```text
//! version,revision,seqno,msgtype,origin,node_name,action,admin,oper,avail
//! ```
//!
//! There is no escaping, so encoding rejects any value containing the
//! delimiter and decoding insists on the exact field count.

use std::str;

use thiserror::Error;

pub const MSG_VERSION: &str = "1";
pub const MSG_REVISION: &str = "1";
pub const MSG_TYPE_SET_NODE: &str = "SET_NODE";
pub const MSG_TYPE_SET_NODE_ACK: &str = "SET_NODE_ACK";
/// Message type stamped on acks synthesized locally after a failure.
pub const MSG_TYPE_UNKNOWN_SET_NODE: &str = "unknown_set_node";
pub const MAX_MSG_SIZE: usize = 2048;
pub const DELIMITER: char = ',';
pub const FIELD_COUNT: usize = 10;

const SEQNO_FIELD: usize = 2;

const UNKNOWN: &str = "unknown";

/// Codec failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("field {field} contains the delimiter: {value:?}")]
    DelimiterInField { field: &'static str, value: String },

    #[error("message of {len} bytes exceeds the {max}-byte limit")]
    TooLarge { len: usize, max: usize },

    #[error("expected {expected} fields, got {actual}")]
    FieldCount { expected: usize, actual: usize },

    #[error("message is not valid UTF-8")]
    NotUtf8,
}

/// Outbound SET_NODE request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetNodeRequest {
    pub seqno: u64,
    pub origin: String,
    pub node_name: String,
    pub action: String,
    pub admin: String,
    pub oper: String,
    pub avail: String,
}

impl SetNodeRequest {
    /// Encode into the wire datagram.
    pub fn encode(&self) -> Result<String, CodecError> {
        let fields = [
            ("origin", &self.origin),
            ("node_name", &self.node_name),
            ("action", &self.action),
            ("admin", &self.admin),
            ("oper", &self.oper),
            ("avail", &self.avail),
        ];
        for (field, value) in fields {
            if value.contains(DELIMITER) {
                return Err(CodecError::DelimiterInField {
                    field,
                    value: value.clone(),
                });
            }
        }

        let message = format!(
            "{MSG_VERSION},{MSG_REVISION},{},{MSG_TYPE_SET_NODE},{},{},{},{},{},{}",
            self.seqno, self.origin, self.node_name, self.action, self.admin, self.oper, self.avail
        );
        if message.len() > MAX_MSG_SIZE {
            return Err(CodecError::TooLarge {
                len: message.len(),
                max: MAX_MSG_SIZE,
            });
        }
        Ok(message)
    }
}

/// Fields of an engine acknowledgement (or a synthesized stand-in).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckFields {
    pub version: String,
    pub revision: String,
    /// Raw seqno as echoed by the engine; empty on synthesized acks.
    pub seqno: String,
    pub msg_type: String,
    pub origin: String,
    pub node_name: String,
    pub action: String,
    /// Lower-cased.
    pub admin: String,
    /// Lower-cased.
    pub oper: String,
    /// Lower-cased.
    pub avail: String,
}

impl AckFields {
    /// Decode an inbound datagram.
    ///
    /// Trailing NUL and whitespace are ignored.
    pub fn decode(datagram: &[u8]) -> Result<Self, CodecError> {
        let text = decode_text(datagram)?;
        let fields: Vec<&str> = text.split(DELIMITER).collect();
        if fields.len() != FIELD_COUNT {
            return Err(CodecError::FieldCount {
                expected: FIELD_COUNT,
                actual: fields.len(),
            });
        }

        Ok(Self {
            version: fields[0].to_string(),
            revision: fields[1].to_string(),
            seqno: fields[2].to_string(),
            msg_type: fields[3].to_string(),
            origin: fields[4].to_string(),
            node_name: fields[5].to_string(),
            action: fields[6].to_string(),
            admin: fields[7].to_lowercase(),
            oper: fields[8].to_lowercase(),
            avail: fields[9].to_lowercase(),
        })
    }

    /// Stand-in ack used whenever no usable reply was received.
    pub fn unknown(node_name: &str, action: &str) -> Self {
        Self {
            version: MSG_VERSION.to_string(),
            revision: MSG_REVISION.to_string(),
            seqno: String::new(),
            msg_type: MSG_TYPE_UNKNOWN_SET_NODE.to_string(),
            origin: "sm".to_string(),
            node_name: node_name.to_string(),
            action: action.to_string(),
            admin: UNKNOWN.to_string(),
            oper: UNKNOWN.to_string(),
            avail: UNKNOWN.to_string(),
        }
    }

    pub fn is_synthesized(&self) -> bool {
        self.msg_type == MSG_TYPE_UNKNOWN_SET_NODE
    }

    pub fn matches_seqno(&self, seqno: u64) -> bool {
        self.seqno == seqno.to_string()
    }
}

/// Extract the seqno field of a datagram without validating the rest.
pub fn peek_seqno(datagram: &[u8]) -> Option<String> {
    let text = decode_text(datagram).ok()?;
    text.split(DELIMITER)
        .nth(SEQNO_FIELD)
        .map(|seqno| seqno.to_string())
}

fn decode_text(datagram: &[u8]) -> Result<&str, CodecError> {
    if datagram.len() > MAX_MSG_SIZE {
        return Err(CodecError::TooLarge {
            len: datagram.len(),
            max: MAX_MSG_SIZE,
        });
    }
    let text = str::from_utf8(datagram).map_err(|_| CodecError::NotUtf8)?;
    Ok(text.trim_end_matches(|c: char| c == '\0' || c.is_whitespace()))
}
