//! Core proposal types and the append-only negotiation ledger
use super::error::NegotiationError;
use chrono::{DateTime, TimeZone, Utc};

/// The two sides of a negotiation.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Eq, PartialEq)]
pub enum Party {
    #[n(0)]
    Provider,
    #[n(1)]
    Requester,
}

impl Party {
    pub fn other(&self) -> Self {
        match self {
            Party::Provider => Party::Requester,
            Party::Requester => Party::Provider,
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Eq, PartialEq)]
pub enum Resolution {
    #[n(0)]
    Pending,
    #[n(1)]
    Accepted,
    #[n(2)]
    Rejected,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .unwrap()
            .into()
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// One offered date/time by one party. An entry is immutable once written,
/// except for the single Pending -> Accepted/Rejected transition which also
/// sets `responded_at`.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Eq, PartialEq)]
pub struct ProposalEntry {
    #[n(0)]
    pub proposed_by: Party,
    #[n(1)]
    pub proposed_date_time: TimeStamp<Utc>,
    #[n(2)]
    pub message: Option<String>,
    #[n(3)]
    pub resolution: Resolution,
    // "superseded", "countered" or "cancelled" when rejected structurally;
    // None when the counterparty declined outright
    #[n(4)]
    pub resolution_note: Option<String>,
    #[n(5)]
    pub created_at: TimeStamp<Utc>,
    #[n(6)]
    pub responded_at: Option<TimeStamp<Utc>>,
}

impl ProposalEntry {
    pub fn new(
        proposed_by: Party,
        proposed_date_time: TimeStamp<Utc>,
        message: Option<String>,
        created_at: TimeStamp<Utc>,
    ) -> Self {
        Self {
            proposed_by,
            proposed_date_time,
            message,
            resolution: Resolution::Pending,
            resolution_note: None,
            created_at,
            responded_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.resolution == Resolution::Pending
    }

    /// Content hash of the entry as stored on the wire.
    pub fn digest(&self) -> Result<String, NegotiationError> {
        let cbor = minicbor::to_vec(self).map_err(|e| NegotiationError::Codec(e.to_string()))?;
        Ok(sha256::digest(&cbor))
    }
}

/// Append-only history of every proposal made on an appointment. Entries are
/// ordered by insertion and never deleted or reordered; at most one entry is
/// Pending at any time.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Default, Eq, PartialEq)]
pub struct ProposalLedger {
    #[n(0)]
    entries: Vec<ProposalEntry>,
}

impl ProposalLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new Pending entry. Fails if one is already outstanding; the
    /// caller must resolve or supersede it first.
    pub fn append(&mut self, entry: ProposalEntry) -> Result<(), NegotiationError> {
        if self.current_pending().is_some() {
            return Err(NegotiationError::PendingProposalExists);
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Transition the single Pending entry to `outcome`, stamping
    /// `responded_at` exactly once.
    pub fn resolve_pending(
        &mut self,
        outcome: Resolution,
        responded_at: TimeStamp<Utc>,
        note: Option<String>,
    ) -> Result<(), NegotiationError> {
        debug_assert!(
            outcome != Resolution::Pending,
            "outcome must be Accepted or Rejected"
        );
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.is_pending())
            .ok_or(NegotiationError::NoPendingProposal)?;

        entry.resolution = outcome;
        entry.responded_at = Some(responded_at);
        entry.resolution_note = note;
        Ok(())
    }

    pub fn current_pending(&self) -> Option<&ProposalEntry> {
        self.entries.iter().find(|e| e.is_pending())
    }

    /// Most recent entry authored by `party`, regardless of resolution.
    pub fn latest_by(&self, party: Party) -> Option<&ProposalEntry> {
        self.entries.iter().rev().find(|e| e.proposed_by == party)
    }

    pub fn entries(&self) -> &[ProposalEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rolling hash over the full history: each step hashes the previous
    /// digest concatenated with the entry's CBOR bytes. Any retroactive edit
    /// of an entry changes every digest from that point on.
    pub fn chain_digest(&self) -> Result<String, NegotiationError> {
        let mut digest = String::new();
        for entry in &self.entries {
            let mut input = digest.into_bytes();
            input.extend(entry.digest()?.into_bytes());
            digest = sha256::digest(&input);
        }
        Ok(digest)
    }
}
