use crate::appointment::AppointmentStatus;
use crate::ledger::Party;

#[derive(thiserror::Error, Debug)]
pub enum NegotiationError {
    #[error("proposed time {candidate} is outside the scheduling window: {reason}")]
    RejectedWindow { candidate: String, reason: String },
    #[error("'{operation}' is not legal while the appointment is {status:?}")]
    InvalidTransition {
        status: AppointmentStatus,
        operation: &'static str,
    },
    #[error("appointment was changed by a concurrent operation; reload and retry")]
    Conflict,
    #[error("no appointment found for id '{0}'")]
    NotFound(String),
    #[error("{actor:?} is not permitted to perform '{operation}'")]
    Unauthorized {
        actor: Party,
        operation: &'static str,
    },
    #[error("a pending proposal already exists")]
    PendingProposalExists,
    #[error("no pending proposal to resolve")]
    NoPendingProposal,
    #[error("failed to encode or decode a record: {0}")]
    Codec(String),
    #[error("storage failure: {0}")]
    Storage(#[from] sled::Error),
}
