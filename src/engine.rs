//! Service layer API for appointment negotiation operations
//!
//! The engine is the only component that mutates an [`AppointmentRecord`].
//! Every operation is a short read-validate-write transaction: load the
//! current record bytes, check the transition against the state machine and
//! the scheduling window, then commit with a compare-and-swap on the prior
//! bytes. A lost race surfaces as [`NegotiationError::Conflict`]; the engine
//! never retries.
use super::appointment::{AppointmentRecord, AppointmentStatus};
use super::error::NegotiationError;
use super::ledger::{Party, ProposalEntry, Resolution, TimeStamp};
use super::{utils, window};
use chrono::Utc;
use sled::IVec;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// How far into the future a proposal may reach, in days.
    pub horizon_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            horizon_days: window::DEFAULT_HORIZON_DAYS,
        }
    }
}

/// A requester's reply to an outstanding provider reschedule offer.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum RescheduleResponse {
    Accept,
    /// Ends the whole appointment, not just the offer.
    Decline,
    /// Counter-offer with a new time; the ball returns to the provider.
    Counter(TimeStamp<Utc>),
}

pub struct NegotiationEngine {
    instance: Arc<sled::Db>,
    config: EngineConfig,
}

impl NegotiationEngine {
    pub fn new(instance: Arc<sled::Db>) -> Self {
        Self::with_config(instance, EngineConfig::default())
    }

    pub fn with_config(instance: Arc<sled::Db>, config: EngineConfig) -> Self {
        Self { instance, config }
    }

    /// Read-only load of an appointment record.
    pub fn appointment(&self, id: &str) -> Result<AppointmentRecord, NegotiationError> {
        let (record, _) = self.load(id)?;
        Ok(record)
    }

    /// Create a new appointment from the requester's initial ask.
    pub fn request_appointment(
        &self,
        requester_ref: String,
        provider_ref: String,
        subject_ref: String,
        date_time: TimeStamp<Utc>,
        notes: Option<String>,
    ) -> Result<AppointmentRecord, NegotiationError> {
        let now = TimeStamp::new();
        window::validate(&date_time, &now, self.config.horizon_days)?;

        let record = AppointmentRecord::new(
            utils::new_appointment_id(),
            subject_ref,
            requester_ref,
            provider_ref,
            date_time,
            notes,
            now,
        );

        self.instance
            .insert(record.id.as_bytes(), record.encode()?)?;
        tracing::info!(id = %record.id, "appointment requested");

        Ok(record)
    }

    /// Provider accepts the originally requested time.
    pub fn accept_request(
        &self,
        id: &str,
        actor: Party,
    ) -> Result<AppointmentRecord, NegotiationError> {
        require_role(actor, Party::Provider, "accept_request")?;
        let (mut record, prior) = self.load(id)?;

        if record.status != AppointmentStatus::Requested {
            return Err(NegotiationError::InvalidTransition {
                status: record.status,
                operation: "accept_request",
            });
        }

        record.status = AppointmentStatus::Accepted;
        self.commit(record, &prior, "accept_request")
    }

    /// Provider turns the request down outright.
    pub fn reject_request(
        &self,
        id: &str,
        actor: Party,
        message: Option<String>,
    ) -> Result<AppointmentRecord, NegotiationError> {
        require_role(actor, Party::Provider, "reject_request")?;
        let (mut record, prior) = self.load(id)?;

        if record.status != AppointmentStatus::Requested {
            return Err(NegotiationError::InvalidTransition {
                status: record.status,
                operation: "reject_request",
            });
        }

        record.status = AppointmentStatus::Rejected;
        record.last_response_message = message;
        self.commit(record, &prior, "reject_request")
    }

    /// Provider offers a different time. Any outstanding offer, from either
    /// side, is resolved Rejected with note "superseded" before the new entry
    /// is appended.
    pub fn propose_reschedule(
        &self,
        id: &str,
        actor: Party,
        date_time: TimeStamp<Utc>,
        message: Option<String>,
    ) -> Result<AppointmentRecord, NegotiationError> {
        require_role(actor, Party::Provider, "propose_reschedule")?;
        let (mut record, prior) = self.load(id)?;

        if !record.is_negotiable() {
            return Err(NegotiationError::InvalidTransition {
                status: record.status,
                operation: "propose_reschedule",
            });
        }

        let now = TimeStamp::new();
        window::validate(&date_time, &now, self.config.horizon_days)?;

        if record.history.current_pending().is_some() {
            record.history.resolve_pending(
                Resolution::Rejected,
                now.clone(),
                Some("superseded".to_string()),
            )?;
        }
        record.history.append(ProposalEntry::new(
            Party::Provider,
            date_time.clone(),
            message.clone(),
            now,
        ))?;

        record.provider_proposed_date_time = Some(date_time);
        record.last_response_message = message;
        record.status = AppointmentStatus::RescheduleProposed;
        self.commit(record, &prior, "propose_reschedule")
    }

    /// Requester answers the provider's outstanding offer.
    pub fn respond_to_reschedule(
        &self,
        id: &str,
        actor: Party,
        response: RescheduleResponse,
        message: Option<String>,
    ) -> Result<AppointmentRecord, NegotiationError> {
        require_role(actor, Party::Requester, "respond_to_reschedule")?;
        let (mut record, prior) = self.load(id)?;

        if record.status != AppointmentStatus::RescheduleProposed
            || record.current_pending_proposer() != Some(Party::Provider)
        {
            return Err(NegotiationError::InvalidTransition {
                status: record.status,
                operation: "respond_to_reschedule",
            });
        }

        let now = TimeStamp::new();
        match response {
            RescheduleResponse::Accept => {
                record
                    .history
                    .resolve_pending(Resolution::Accepted, now, None)?;
                record.status = AppointmentStatus::Rescheduled;
            }
            RescheduleResponse::Decline => {
                record
                    .history
                    .resolve_pending(Resolution::Rejected, now, None)?;
                record.status = AppointmentStatus::Rejected;
            }
            RescheduleResponse::Counter(date_time) => {
                window::validate(&date_time, &now, self.config.horizon_days)?;
                record.history.resolve_pending(
                    Resolution::Rejected,
                    now.clone(),
                    Some("countered".to_string()),
                )?;
                record.history.append(ProposalEntry::new(
                    Party::Requester,
                    date_time.clone(),
                    message.clone(),
                    now,
                ))?;
                record.requester_proposed_date_time = Some(date_time);
                // status stays RescheduleProposed; the ball is with the provider
            }
        }

        record.requester_response_message = message;
        self.commit(record, &prior, "respond_to_reschedule")
    }

    /// Provider accepts the requester's counter-offer, settling on its time.
    pub fn accept_counter_proposal(
        &self,
        id: &str,
        actor: Party,
    ) -> Result<AppointmentRecord, NegotiationError> {
        require_role(actor, Party::Provider, "accept_counter_proposal")?;
        let (mut record, prior) = self.load(id)?;

        if record.status != AppointmentStatus::RescheduleProposed
            || record.current_pending_proposer() != Some(Party::Requester)
        {
            return Err(NegotiationError::InvalidTransition {
                status: record.status,
                operation: "accept_counter_proposal",
            });
        }

        record
            .history
            .resolve_pending(Resolution::Accepted, TimeStamp::new(), None)?;
        record.status = AppointmentStatus::Rescheduled;
        self.commit(record, &prior, "accept_counter_proposal")
    }

    /// Either party withdraws. Legal from any negotiable state; an
    /// outstanding offer is resolved Rejected with note "cancelled".
    pub fn cancel(
        &self,
        id: &str,
        actor: Party,
        message: Option<String>,
    ) -> Result<AppointmentRecord, NegotiationError> {
        let (mut record, prior) = self.load(id)?;

        if !record.is_negotiable() {
            return Err(NegotiationError::InvalidTransition {
                status: record.status,
                operation: "cancel",
            });
        }

        if record.history.current_pending().is_some() {
            record.history.resolve_pending(
                Resolution::Rejected,
                TimeStamp::new(),
                Some("cancelled".to_string()),
            )?;
        }
        match actor {
            Party::Provider => record.last_response_message = message,
            Party::Requester => record.requester_response_message = message,
        }
        record.status = AppointmentStatus::Cancelled;
        self.commit(record, &prior, "cancel")
    }

    fn load(&self, id: &str) -> Result<(AppointmentRecord, IVec), NegotiationError> {
        let bytes = self
            .instance
            .get(id.as_bytes())?
            .ok_or_else(|| NegotiationError::NotFound(id.to_string()))?;
        let record = AppointmentRecord::decode(bytes.as_ref())?;
        Ok((record, bytes))
    }

    /// Commit the mutated record iff the stored bytes are still `prior`.
    fn commit(
        &self,
        mut record: AppointmentRecord,
        prior: &IVec,
        operation: &'static str,
    ) -> Result<AppointmentRecord, NegotiationError> {
        record.version += 1;
        record.updated_at = TimeStamp::new();
        let encoded = record.encode()?;

        match self
            .instance
            .compare_and_swap(record.id.as_bytes(), Some(prior), Some(encoded))?
        {
            Ok(()) => {
                tracing::info!(
                    id = %record.id,
                    operation,
                    status = ?record.status,
                    version = record.version,
                    "transition committed"
                );
                Ok(record)
            }
            Err(_) => {
                tracing::debug!(id = %record.id, operation, "lost compare_and_swap race");
                Err(NegotiationError::Conflict)
            }
        }
    }
}

fn require_role(
    actor: Party,
    required: Party,
    operation: &'static str,
) -> Result<(), NegotiationError> {
    if actor == required {
        Ok(())
    } else {
        Err(NegotiationError::Unauthorized { actor, operation })
    }
}
