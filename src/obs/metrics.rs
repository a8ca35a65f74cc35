// self
use crate::obs::{FlowKind, FlowOutcome};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"idp_session_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records the terminal outcome of `result`.
pub fn record_result<T, E>(kind: FlowKind, result: &Result<T, E>) {
	record_flow_outcome(kind, if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure });
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recording_without_recorder_is_harmless() {
		record_flow_outcome(FlowKind::Anonymous, FlowOutcome::Attempt);
		record_result::<(), ()>(FlowKind::SignOut, &Err(()));
	}
}
