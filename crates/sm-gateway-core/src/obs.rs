//! Structured observability hooks for gateway command handling.
//!
//! This module provides:
//! - Command-scoped tracing spans via [`command_span`]
//! - Emission functions for key events: dispatch, pre-check outcome, ack,
//!   protocol failure, peer probe failure
//!
//! Events are emitted at `info!` level unless noted. `RUST_LOG` controls
//! filtering; see [`crate::telemetry::init_tracing`] for JSON output.

use tracing::{info, warn};

/// Command-scoped span, attached to the dispatch future with
/// [`tracing::Instrument`].
///
/// # Example
///
/// ```ignore
/// dispatch_inner(..).instrument(obs::command_span("controller-1", "swact")).await
/// // every event below carries hostname and action
/// ```
pub fn command_span(hostname: &str, action: &str) -> tracing::Span {
    tracing::info_span!("sm.command", hostname = %hostname, action = %action)
}

/// Emit event: a command was accepted for dispatch.
pub fn emit_command_dispatched(hostname: &str, action: &str, origin: &str) {
    info!(event = "command.dispatched", hostname = %hostname, action = %action, origin = %origin);
}

/// Emit event: command arrived from an origin other than mtce/sysinv (warning level).
pub fn emit_unexpected_origin(origin: &str) {
    warn!(event = "command.unexpected_origin", origin = %origin, "continuing");
}

/// Emit event: a safety pre-check refused the action.
pub fn emit_precheck_blocked(hostname: &str, action: &str, reason: &str) {
    info!(
        event = "precheck.blocked",
        hostname = %hostname,
        action = %action,
        reason = %reason,
    );
}

/// Emit event: a safety pre-check passed.
pub fn emit_precheck_passed(hostname: &str, action: &str) {
    info!(event = "precheck.passed", hostname = %hostname, action = %action);
}

/// Emit event: the engine acknowledged a request.
pub fn emit_ack_received(seqno: u64, node_name: &str, admin: &str, oper: &str) {
    info!(
        event = "protocol.ack",
        seqno = seqno,
        node_name = %node_name,
        admin = %admin,
        oper = %oper,
    );
}

/// Emit event: no usable ack; an unknown ack is substituted (warning level).
pub fn emit_protocol_failure(seqno: u64, node_name: &str, error: &dyn std::fmt::Display) {
    warn!(event = "protocol.failure", seqno = seqno, node_name = %node_name, error = %error);
}

/// Emit event: the engine's reply disagrees with the request (warning level).
pub fn emit_ack_mismatch(hostname: &str, requested: (&str, &str), acked: (&str, &str)) {
    warn!(
        event = "command.ack_mismatch",
        hostname = %hostname,
        requested_admin = %requested.0,
        requested_oper = %requested.1,
        ack_admin = %acked.0,
        ack_oper = %acked.1,
    );
}

/// Emit event: a peer probe produced no data (warning level).
pub fn emit_peer_probe_unavailable(node_name: &str, service: &str, error: &dyn std::fmt::Display) {
    warn!(
        event = "peer.probe_unavailable",
        node_name = %node_name,
        service = %service,
        error = %error,
    );
}

/// Emit event: the state store could not be read (warning level).
pub fn emit_store_error(hostname: &str, error: &dyn std::fmt::Display) {
    warn!(event = "store.error", hostname = %hostname, error = %error);
}
