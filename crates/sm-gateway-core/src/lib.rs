//! SM Gateway Core Library
//!
//! Accepts administrative node commands, refuses swacts and locks that would
//! leave service without a healthy provider, and relays the rest to the SM
//! engine over its local datagram protocol.

pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod fakes;
pub mod node_status;
pub mod obs;
pub mod peer;
pub mod precheck;
pub mod protocol;
pub mod telemetry;

pub use config::{ConfigError, GatewayConfig};

pub use dispatcher::CommandDispatcher;

pub use domain::{
    CommandResponse, CommandResult, ErrorCode, GatewayError, NodeAction, NodeCommand,
    RequestContext, Result,
};

pub use node_status::{NodeStatusQuery, ServiceNode};

pub use peer::{HttpPeerStateClient, PeerProbeConfig, PeerServiceState, PeerStateProbe};

pub use precheck::{LockPreCheck, SwactPreCheck, SwactRefusal};

pub use protocol::{
    AckFields, CodecError, CommandProtocolClient, NodeStateSender, ProtocolConfig, ProtocolError,
    SetNodeRequest,
};
