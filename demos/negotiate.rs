//! Walks one appointment through a full negotiation: request, reschedule
//! offer, counter-offer, agreement. Run with `cargo run --example negotiate`.

use appointment_negotiation::{
    engine::{NegotiationEngine, RescheduleResponse},
    ledger::{Party, TimeStamp},
    utils,
};
use chrono::{Duration, Utc};
use std::sync::Arc;

fn in_days(days: i64) -> TimeStamp<Utc> {
    TimeStamp::from(Utc::now() + Duration::days(days))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    let temp_dir = tempfile::tempdir()?;
    let db = sled::open(temp_dir.path().join("negotiate-demo.db"))?;
    let engine = NegotiationEngine::new(Arc::new(db));

    let adopter = utils::new_uuid_to_bech32("adopter_")?;
    let clinic = utils::new_uuid_to_bech32("clinic_")?;
    let animal = utils::new_uuid_to_bech32("animal_")?;

    // the adopter asks for a checkup a week out
    let record = engine.request_appointment(
        adopter,
        clinic,
        animal,
        in_days(7),
        Some("post-adoption checkup for Biscuit".to_string()),
    )?;
    let id = record.id.clone();

    // the clinic offers a later slot instead
    engine.propose_reschedule(
        &id,
        Party::Provider,
        in_days(10),
        Some("our vet is out that week, how about the 10th?".to_string()),
    )?;

    // the adopter counters
    engine.respond_to_reschedule(
        &id,
        Party::Requester,
        RescheduleResponse::Counter(in_days(12)),
        Some("we can only do weekends".to_string()),
    )?;

    // the clinic takes the counter-offer
    let record = engine.accept_counter_proposal(&id, Party::Provider)?;

    println!("{record:#?}");
    println!("agreed time: {:?}", record.agreed_date_time());
    println!("history digest: {}", record.history.chain_digest()?);

    Ok(())
}
