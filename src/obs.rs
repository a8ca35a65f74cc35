//! Observability helpers for session flows.
//!
//! Every provider flow runs inside a span named `idp_session.flow` carrying the `flow` kind and
//! the `stage` (call site). With the `metrics` feature enabled, the `idp_session_flow_total`
//! counter is incremented for every attempt/success/failure, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Session flow kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Bootstrap from SDK check to readiness.
	Bootstrap,
	/// Configuration discovery.
	ConfigLoad,
	/// Mode-driven automatic sign-in.
	EnsureSignedIn,
	/// Anonymous sign-up.
	Anonymous,
	/// Federated sign-in (popup or redirect phase 1).
	Federated,
	/// Redirect phase 2.
	RedirectResume,
	/// Identity-token refresh.
	TokenRefresh,
	/// Sign-out.
	SignOut,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Bootstrap => "bootstrap",
			FlowKind::ConfigLoad => "config_load",
			FlowKind::EnsureSignedIn => "ensure_signed_in",
			FlowKind::Anonymous => "anonymous",
			FlowKind::Federated => "federated",
			FlowKind::RedirectResume => "redirect_resume",
			FlowKind::TokenRefresh => "token_refresh",
			FlowKind::SignOut => "sign_out",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Flow entry.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller or logged.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
