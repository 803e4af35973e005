//! Scheduling window checks for candidate appointment times
use super::error::NegotiationError;
use super::ledger::TimeStamp;
use chrono::{Duration, Utc};

pub const DEFAULT_HORIZON_DAYS: i64 = 30;

/// Checks that `candidate` is an admissible proposal at `now`: not in the
/// past and no further out than `horizon_days`. Pure and stateless, safe to
/// call from any thread.
///
/// Double-booking and provider capacity are not checked here.
pub fn validate(
    candidate: &TimeStamp<Utc>,
    now: &TimeStamp<Utc>,
    horizon_days: i64,
) -> Result<(), NegotiationError> {
    let candidate_dt = candidate.to_datetime_utc();
    let now_dt = now.to_datetime_utc();

    if candidate_dt < now_dt {
        return Err(NegotiationError::RejectedWindow {
            candidate: candidate_dt.to_rfc3339(),
            reason: "time is in the past".to_string(),
        });
    }

    if candidate_dt > now_dt + Duration::days(horizon_days) {
        return Err(NegotiationError::RejectedWindow {
            candidate: candidate_dt.to_rfc3339(),
            reason: format!("time is more than {horizon_days} days out"),
        });
    }

    Ok(())
}
