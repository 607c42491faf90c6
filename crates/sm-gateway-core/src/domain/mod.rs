//! Domain types shared by the dispatcher, pre-checks and protocol layers.

pub mod action;
pub mod command;
pub mod error;

pub use action::NodeAction;
pub use command::{
    CommandResponse, CommandResult, ErrorCode, NodeCommand, RequestContext, ORIGIN_MTCE,
    ORIGIN_SM, ORIGIN_SYSINV,
};
pub use error::{GatewayError, Result};
