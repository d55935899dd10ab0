//! Outcome processor: state transition, log entry, write-back, alert.

use chrono::Utc;
use serde_json::Value;

use super::WorkerContext;
use super::context::bump;
use crate::domain::{Check, CheckOutcome, CheckState, LogEntry};
use crate::store::Collection;

/// State derived from one outcome, and whether it warrants an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    /// New state of the check.
    pub state: CheckState,
    /// `true` only for a transition on a check that has run before.
    pub alert_warranted: bool,
}

/// Computes the new state and the alert decision.
///
/// The check is up iff the probe got a response whose code is one of the
/// success codes. A check that has never run (`last_checked_at` unset)
/// never alerts: its first observation only sets the baseline.
#[must_use]
pub fn evaluate(check: &Check, outcome: &CheckOutcome) -> Evaluation {
    let up = !outcome.had_error && outcome.response_code.is_some_and(|code| check.accepts(code));
    let state = if up { CheckState::Up } else { CheckState::Down };
    Evaluation {
        state,
        alert_warranted: check.last_checked_at.is_some() && check.state != state,
    }
}

/// Text sent to the owner when `check` changed state.
#[must_use]
pub fn alert_message(check: &Check) -> String {
    format!(
        "Alert: Your check for {} {} is currently {}.",
        check.method.as_upper(),
        check.target_url(),
        check.state
    )
}

/// What happened while processing one outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessReport {
    /// State and alert decision.
    pub evaluation: Evaluation,
    /// Log entry appended.
    pub logged: bool,
    /// Updated check written back to the store.
    pub persisted: bool,
    /// Alert accepted by the notifier.
    pub alert_sent: bool,
}

/// Folds `outcome` into `check`: appends the log entry, writes the updated
/// check back into `record`'s store slot and, for a warranted transition
/// that was persisted, notifies the owner.
///
/// Every failure is logged and contained. A failed write-back suppresses
/// the alert; the next sweep re-derives state from the stored record.
pub async fn process_outcome(
    ctx: &WorkerContext,
    mut record: Value,
    check: Check,
    outcome: CheckOutcome,
) -> ProcessReport {
    let evaluation = evaluate(&check, &outcome);
    let checked_at = Utc::now();
    let check_id = check.id.clone();

    let entry = LogEntry {
        check,
        outcome,
        state: evaluation.state,
        alert_warranted: evaluation.alert_warranted,
        timestamp: checked_at,
    };
    let logged = match ctx.archive().append(check_id.as_str(), &entry).await {
        Ok(()) => true,
        Err(e) => {
            bump(&ctx.stats().log_failures);
            tracing::warn!(%check_id, error = %e, "failed to append check log");
            false
        }
    };

    let updated = Check {
        state: evaluation.state,
        last_checked_at: Some(checked_at),
        ..entry.check
    };
    updated.merge_into(&mut record);

    let persisted = match ctx
        .store()
        .update(Collection::Checks, check_id.as_str(), &record)
        .await
    {
        Ok(()) => true,
        Err(e) => {
            bump(&ctx.stats().persist_failures);
            tracing::warn!(%check_id, error = %e, "failed to persist check outcome");
            false
        }
    };

    let mut alert_sent = false;
    if evaluation.alert_warranted && persisted {
        let message = alert_message(&updated);
        match ctx.notifier().send(&updated.user_phone, &message).await {
            Ok(()) => {
                alert_sent = true;
                bump(&ctx.stats().alerts_sent);
                tracing::info!(%check_id, state = %updated.state, "owner alerted to state change");
            }
            Err(e) => {
                bump(&ctx.stats().alerts_failed);
                tracing::warn!(%check_id, error = %e, "failed to alert owner");
            }
        }
    } else if evaluation.alert_warranted {
        tracing::debug!(%check_id, "alert suppressed, outcome was not persisted");
    } else {
        tracing::debug!(%check_id, state = %evaluation.state, "no state change, no alert");
    }

    ProcessReport {
        evaluation,
        logged,
        persisted,
        alert_sent,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::TimeZone;

    use super::*;
    use crate::domain::{CheckId, HttpMethod, Protocol};

    fn check(state: CheckState, ever_checked: bool) -> Check {
        let Ok(id) = CheckId::parse("AAAAAAAAAAAAAAAAAAAA") else {
            panic!("valid id");
        };
        Check {
            id,
            user_phone: "5551234567".to_string(),
            protocol: Protocol::Http,
            url: "example.com/health".to_string(),
            method: HttpMethod::Get,
            success_codes: BTreeSet::from([200]),
            timeout_seconds: 3,
            state,
            last_checked_at: if ever_checked {
                Utc.timestamp_millis_opt(1_700_000_000_000).single()
            } else {
                None
            },
        }
    }

    #[test]
    fn accepted_code_is_up() {
        let eval = evaluate(&check(CheckState::Down, false), &CheckOutcome::responded(200));
        assert_eq!(eval.state, CheckState::Up);
    }

    #[test]
    fn unexpected_code_is_down() {
        let eval = evaluate(&check(CheckState::Down, false), &CheckOutcome::responded(201));
        assert_eq!(eval.state, CheckState::Down);
    }

    #[test]
    fn errors_are_down() {
        let eval = evaluate(&check(CheckState::Up, true), &CheckOutcome::timed_out());
        assert_eq!(eval.state, CheckState::Down);
        assert!(eval.alert_warranted);

        let eval = evaluate(
            &check(CheckState::Up, true),
            &CheckOutcome::transport_error("connection refused"),
        );
        assert_eq!(eval.state, CheckState::Down);
    }

    #[test]
    fn first_run_never_alerts() {
        for (prior, outcome) in [
            (CheckState::Down, CheckOutcome::responded(200)),
            (CheckState::Up, CheckOutcome::responded(500)),
            (CheckState::Down, CheckOutcome::timed_out()),
        ] {
            let eval = evaluate(&check(prior, false), &outcome);
            assert!(!eval.alert_warranted, "{prior:?} -> {:?}", eval.state);
        }
    }

    #[test]
    fn transition_alerts_and_steady_state_does_not() {
        let down = evaluate(&check(CheckState::Up, true), &CheckOutcome::responded(500));
        assert_eq!(down.state, CheckState::Down);
        assert!(down.alert_warranted);

        let recovered = evaluate(&check(CheckState::Down, true), &CheckOutcome::responded(200));
        assert!(recovered.alert_warranted);

        let steady = evaluate(&check(CheckState::Up, true), &CheckOutcome::responded(200));
        assert!(!steady.alert_warranted);
        let steady = evaluate(&check(CheckState::Down, true), &CheckOutcome::timed_out());
        assert!(!steady.alert_warranted);
    }

    #[test]
    fn message_names_method_url_and_state() {
        assert_eq!(
            alert_message(&check(CheckState::Down, true)),
            "Alert: Your check for GET http://example.com/health is currently down."
        );
    }
}
