//! The appointment record: current status plus the proposal history
use super::error::NegotiationError;
use super::ledger::{Party, ProposalLedger, Resolution, TimeStamp};
use chrono::Utc;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Eq, PartialEq)]
pub enum AppointmentStatus {
    #[n(0)]
    Requested,
    #[n(1)]
    Accepted,
    #[n(2)]
    Rejected,
    #[n(3)]
    RescheduleProposed,
    #[n(4)]
    Rescheduled,
    #[n(5)]
    Cancelled,
}

impl AppointmentStatus {
    /// Terminal statuses admit no further mutation.
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Accepted
                | AppointmentStatus::Rejected
                | AppointmentStatus::Rescheduled
                | AppointmentStatus::Cancelled
        )
    }

    pub const fn is_negotiable(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Requested | AppointmentStatus::RescheduleProposed
        )
    }
}

/// One appointment under negotiation. All mutation goes through
/// [`NegotiationEngine`](crate::engine::NegotiationEngine) so the ledger and
/// the status fields change as one unit; everything here is a query.
///
/// The `subject_ref` / `requester_ref` / `provider_ref` strings are opaque
/// directory references and are never interpreted.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Eq, PartialEq)]
pub struct AppointmentRecord {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub subject_ref: String,
    #[n(2)]
    pub requester_ref: String,
    #[n(3)]
    pub provider_ref: String,
    // set once at creation, never modified afterward
    #[n(4)]
    pub requested_date_time: TimeStamp<Utc>,
    #[n(5)]
    pub status: AppointmentStatus,
    // derived mirrors of the latest entry by each party; the ledger is the
    // source of truth
    #[n(6)]
    pub provider_proposed_date_time: Option<TimeStamp<Utc>>,
    #[n(7)]
    pub requester_proposed_date_time: Option<TimeStamp<Utc>>,
    #[n(8)]
    pub last_response_message: Option<String>,
    #[n(9)]
    pub requester_response_message: Option<String>,
    #[n(10)]
    pub notes: Option<String>,
    #[n(11)]
    pub history: ProposalLedger,
    #[n(12)]
    pub created_at: TimeStamp<Utc>,
    #[n(13)]
    pub updated_at: TimeStamp<Utc>,
    #[n(14)]
    pub version: u64,
}

impl AppointmentRecord {
    pub fn new(
        id: String,
        subject_ref: String,
        requester_ref: String,
        provider_ref: String,
        requested_date_time: TimeStamp<Utc>,
        notes: Option<String>,
        created_at: TimeStamp<Utc>,
    ) -> Self {
        Self {
            id,
            subject_ref,
            requester_ref,
            provider_ref,
            requested_date_time,
            status: AppointmentStatus::Requested,
            provider_proposed_date_time: None,
            requester_proposed_date_time: None,
            last_response_message: None,
            requester_response_message: None,
            notes,
            history: ProposalLedger::new(),
            created_at: created_at.clone(),
            updated_at: created_at,
            version: 1,
        }
    }

    pub fn is_negotiable(&self) -> bool {
        self.status.is_negotiable()
    }

    /// Whose offer is outstanding, if any. Only the other party may resolve it.
    pub fn current_pending_proposer(&self) -> Option<Party> {
        self.history.current_pending().map(|e| e.proposed_by)
    }

    /// The settled time once negotiation has concluded in agreement: the
    /// original request when Accepted, the accepted proposal when Rescheduled.
    pub fn agreed_date_time(&self) -> Option<TimeStamp<Utc>> {
        match self.status {
            AppointmentStatus::Accepted => Some(self.requested_date_time.clone()),
            AppointmentStatus::Rescheduled => self
                .history
                .entries()
                .iter()
                .rev()
                .find(|e| e.resolution == Resolution::Accepted)
                .map(|e| e.proposed_date_time.clone()),
            _ => None,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, NegotiationError> {
        minicbor::to_vec(self).map_err(|e| NegotiationError::Codec(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, NegotiationError> {
        minicbor::decode(bytes).map_err(|e| NegotiationError::Codec(e.to_string()))
    }
}
