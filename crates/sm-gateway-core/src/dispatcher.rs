//! Command dispatch.
//!
//! Routes a node command by action: swact and lock variants run their safety
//! check first (forced variants skip it), pre-check variants answer from the
//! check alone, and everything else is relayed to the engine and reconciled
//! against its ack.

use std::sync::Arc;

use sm_state::StateStore;
use tracing::{debug, Instrument};

use crate::config::GatewayConfig;
use crate::domain::{
    CommandResponse, CommandResult, ErrorCode, NodeAction, NodeCommand, RequestContext, Result,
    ORIGIN_SM,
};
use crate::node_status::{NodeStatusQuery, ServiceNode};
use crate::obs;
use crate::peer::{HttpPeerStateClient, PeerStateProbe};
use crate::precheck::{LockPreCheck, SwactPreCheck};
use crate::protocol::{AckFields, CommandProtocolClient, NodeStateSender, SetNodeRequest};

pub const DETAILS_SUCCESS: &str = "success";
pub const DETAILS_ACTION_FAILED: &str = "action failed";
pub const DETAILS_SOLE_PROVIDER: &str = "lock would leave critical services without a provider";

/// Single entry point for node commands.
pub struct CommandDispatcher {
    store: Arc<dyn StateStore>,
    probe: Arc<dyn PeerStateProbe>,
    sender: Arc<dyn NodeStateSender>,
    local_hostname: String,
    fallback_auth_token: Option<String>,
}

impl CommandDispatcher {
    pub fn new(
        store: Arc<dyn StateStore>,
        probe: Arc<dyn PeerStateProbe>,
        sender: Arc<dyn NodeStateSender>,
        local_hostname: impl Into<String>,
    ) -> Self {
        Self {
            store,
            probe,
            sender,
            local_hostname: local_hostname.into(),
            fallback_auth_token: None,
        }
    }

    /// Token sent to peers when a request carries none of its own.
    pub fn with_fallback_auth_token(mut self, token: Option<String>) -> Self {
        self.fallback_auth_token = token;
        self
    }

    /// Wire the production protocol client and peer probe from `config`.
    pub fn from_config(config: &GatewayConfig, store: Arc<dyn StateStore>) -> Result<Self> {
        let probe = HttpPeerStateClient::new(config.peer_config())?;
        let sender = CommandProtocolClient::new(config.protocol_config());
        Ok(Self::new(
            store,
            Arc::new(probe),
            Arc::new(sender),
            config.local_hostname.clone(),
        )
        .with_fallback_auth_token(config.auth_token.clone()))
    }

    pub fn local_hostname(&self) -> &str {
        &self.local_hostname
    }

    /// Handle one command against `hostname`.
    ///
    /// Only an unrecognized action is an `Err`; every other outcome,
    /// including store and transport failures, is a response envelope.
    pub async fn dispatch(
        &self,
        hostname: &str,
        command: &NodeCommand,
        ctx: &RequestContext,
    ) -> Result<CommandResponse> {
        let action: NodeAction = command.action.parse()?;
        let span = obs::command_span(hostname, action.as_str());
        Ok(self
            .dispatch_action(hostname, action, command, ctx)
            .instrument(span)
            .await)
    }

    /// Report a node's state and whether it hosts active or swactable groups.
    pub async fn node_status(&self, hostname: &str) -> ServiceNode {
        NodeStatusQuery::new(self.store.as_ref()).query(hostname).await
    }

    async fn dispatch_action(
        &self,
        hostname: &str,
        action: NodeAction,
        command: &NodeCommand,
        ctx: &RequestContext,
    ) -> CommandResponse {
        if !command.has_expected_origin() {
            obs::emit_unexpected_origin(&command.origin);
        }
        obs::emit_command_dispatched(hostname, action.as_str(), &command.origin);

        if action.needs_swact_check() {
            if let Some(response) = self.run_swact_check(hostname, action, command).await {
                return response;
            }
        } else if action.needs_lock_check() {
            if let Some(response) = self.run_lock_check(hostname, action, command, ctx).await {
                return response;
            }
        }

        if action.is_pre_check_only() {
            obs::emit_precheck_passed(hostname, action.as_str());
            return CommandResponse::ok(CommandResult::echo(hostname, command, ErrorCode::Success));
        }

        self.relay(hostname, command).await
    }

    /// `Some` when the check settles the response.
    async fn run_swact_check(
        &self,
        hostname: &str,
        action: NodeAction,
        command: &NodeCommand,
    ) -> Option<CommandResponse> {
        let refusal = match SwactPreCheck::new(self.store.as_ref()).check(hostname).await {
            Ok(refusal) => refusal?,
            Err(e) => return Some(store_failure(hostname, command, &e)),
        };

        let reason = refusal.to_string();
        obs::emit_precheck_blocked(hostname, action.as_str(), &reason);
        let result =
            CommandResult::echo(hostname, command, ErrorCode::ActionFailed).with_details(reason);
        Some(blocked(action, result))
    }

    async fn run_lock_check(
        &self,
        hostname: &str,
        action: NodeAction,
        command: &NodeCommand,
        ctx: &RequestContext,
    ) -> Option<CommandResponse> {
        let check = LockPreCheck::new(
            self.store.as_ref(),
            self.probe.as_ref(),
            &self.local_hostname,
        );
        let ctx = match (ctx.auth_token(), &self.fallback_auth_token) {
            (None, Some(token)) => RequestContext::with_auth_token(token.clone()),
            _ => ctx.clone(),
        };
        let services = match check.check(hostname, &ctx).await {
            Ok(services) => services?,
            Err(e) => return Some(store_failure(hostname, command, &e)),
        };

        obs::emit_precheck_blocked(hostname, action.as_str(), &services.join(","));
        let result = CommandResult::echo(hostname, command, ErrorCode::LockSoleServiceProvider)
            .with_details(DETAILS_SOLE_PROVIDER)
            .with_impact(services);
        Some(blocked(action, result))
    }

    async fn relay(&self, hostname: &str, command: &NodeCommand) -> CommandResponse {
        let request = SetNodeRequest {
            seqno: self.sender.next_seqno(),
            origin: command.origin.clone(),
            node_name: hostname.to_string(),
            action: command.action.clone(),
            admin: command.admin.clone(),
            oper: command.oper.clone(),
            avail: command.avail.clone(),
        };
        let ack = self.sender.send(request).await;
        reconcile(hostname, command, ack)
    }
}

/// Loose check: admin and oper must match the request, avail is ignored.
fn reconcile(hostname: &str, command: &NodeCommand, ack: AckFields) -> CommandResponse {
    if command.admin == ack.admin && command.oper == ack.oper {
        debug!(origin = %ack.origin, "engine confirmed requested state");
        return CommandResponse::ok(CommandResult {
            origin: ack.origin,
            hostname: ack.node_name,
            action: ack.action,
            admin: ack.admin,
            oper: ack.oper,
            avail: ack.avail,
            error_code: ErrorCode::Success,
            error_details: Some(DETAILS_SUCCESS.to_string()),
            impact_service_list: None,
        });
    }

    obs::emit_ack_mismatch(
        hostname,
        (&command.admin, &command.oper),
        (&ack.admin, &ack.oper),
    );
    CommandResponse::internal_error(CommandResult {
        origin: ORIGIN_SM.to_string(),
        hostname: hostname.to_string(),
        action: ack.action,
        admin: ack.admin,
        oper: ack.oper,
        avail: ack.avail,
        error_code: ErrorCode::ActionFailed,
        error_details: Some(DETAILS_ACTION_FAILED.to_string()),
        impact_service_list: None,
    })
}

/// Pre-check variants report a refusal as information; the real action fails.
fn blocked(action: NodeAction, result: CommandResult) -> CommandResponse {
    if action.is_pre_check_only() {
        CommandResponse::ok(result)
    } else {
        CommandResponse::bad_request(result)
    }
}

fn store_failure(
    hostname: &str,
    command: &NodeCommand,
    error: &sm_state::StateError,
) -> CommandResponse {
    obs::emit_store_error(hostname, error);
    CommandResponse::internal_error(
        CommandResult::echo(hostname, command, ErrorCode::ActionFailed)
            .with_details(format!("state unavailable: {error}")),
    )
}
