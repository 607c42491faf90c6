//! Command protocol between the gateway and the SM engine.
//!
//! - `codec`: typed encode/decode of the positional datagram format
//! - `client`: Unix datagram exchange with ack correlation

use async_trait::async_trait;

pub mod client;
pub mod codec;

pub use client::{CommandProtocolClient, ProtocolConfig, ProtocolError};
pub use codec::{AckFields, CodecError, SetNodeRequest};

/// Anything that can relay a SET_NODE request to the engine.
///
/// `send` never fails; transport problems surface as
/// [`AckFields::unknown`].
#[async_trait]
pub trait NodeStateSender: Send + Sync {
    /// Allocate the sequence number for the next request.
    fn next_seqno(&self) -> u64;

    async fn send(&self, request: SetNodeRequest) -> AckFields;
}
