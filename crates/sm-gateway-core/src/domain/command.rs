//! Command input and result envelope.

use std::fmt;

use reqwest::StatusCode;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::GatewayError;

/// Origin that issues node commands in normal operation.
pub const ORIGIN_MTCE: &str = "mtce";
/// Origin used by the system inventory service.
pub const ORIGIN_SYSINV: &str = "sysinv";
/// Origin stamped on envelopes produced by the gateway itself.
pub const ORIGIN_SM: &str = "sm";

/// An inbound node command (request body).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCommand {
    pub origin: String,
    /// Raw action string; validated at dispatch.
    pub action: String,
    pub admin: String,
    pub oper: String,
    pub avail: String,
}

impl NodeCommand {
    pub fn new(
        origin: impl Into<String>,
        action: impl Into<String>,
        admin: impl Into<String>,
        oper: impl Into<String>,
        avail: impl Into<String>,
    ) -> Self {
        Self {
            origin: origin.into(),
            action: action.into(),
            admin: admin.into(),
            oper: oper.into(),
            avail: avail.into(),
        }
    }

    pub fn has_expected_origin(&self) -> bool {
        self.origin == ORIGIN_MTCE || self.origin == ORIGIN_SYSINV
    }
}

/// Fixed result codes carried in `error_code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Success,
    HostNotFound,
    ActionFailed,
    NoHostToSwactTo,
    LockSoleServiceProvider,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Success => "0",
            ErrorCode::HostNotFound => "-1000",
            ErrorCode::ActionFailed => "-1001",
            ErrorCode::NoHostToSwactTo => "-1002",
            ErrorCode::LockSoleServiceProvider => "-1003",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ErrorCode {
    type Error = GatewayError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "0" => Ok(ErrorCode::Success),
            "-1000" => Ok(ErrorCode::HostNotFound),
            "-1001" => Ok(ErrorCode::ActionFailed),
            "-1002" => Ok(ErrorCode::NoHostToSwactTo),
            "-1003" => Ok(ErrorCode::LockSoleServiceProvider),
            other => Err(GatewayError::InvalidErrorCode(other.to_string())),
        }
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ErrorCode::try_from(raw.as_str()).map_err(serde::de::Error::custom)
    }
}

/// Result envelope returned for every dispatched command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub origin: String,
    pub hostname: String,
    pub action: String,
    pub admin: String,
    pub oper: String,
    pub avail: String,
    pub error_code: ErrorCode,
    pub error_details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact_service_list: Option<Vec<String>>,
}

impl CommandResult {
    /// Envelope that echoes the request; used by pre-check outcomes.
    pub fn echo(hostname: &str, command: &NodeCommand, error_code: ErrorCode) -> Self {
        Self {
            origin: ORIGIN_SM.to_string(),
            hostname: hostname.to_string(),
            action: command.action.clone(),
            admin: command.admin.clone(),
            oper: command.oper.clone(),
            avail: command.avail.clone(),
            error_code,
            error_details: None,
            impact_service_list: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.error_details = Some(details.into());
        self
    }

    pub fn with_impact(mut self, services: Vec<String>) -> Self {
        self.impact_service_list = Some(services);
        self
    }

    pub fn is_success(&self) -> bool {
        self.error_code == ErrorCode::Success
    }
}

/// A result envelope plus the HTTP-equivalent status it should be served with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    pub status: StatusCode,
    pub result: CommandResult,
}

impl CommandResponse {
    pub fn ok(result: CommandResult) -> Self {
        Self {
            status: StatusCode::OK,
            result,
        }
    }

    pub fn bad_request(result: CommandResult) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            result,
        }
    }

    pub fn internal_error(result: CommandResult) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            result,
        }
    }
}

/// Per-request context carried from the caller down to peer probes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub auth_token: Option<String>,
}

impl RequestContext {
    pub fn with_auth_token(token: impl Into<String>) -> Self {
        Self {
            auth_token: Some(token.into()),
        }
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }
}
