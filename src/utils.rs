//! Identifier helpers for opaque bech32-encoded references

use bech32::Bech32m;
use uuid7::uuid7;

// mint an opaque reference with the given human-readable prefix
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

/// Appointment ids carry a fixed prefix, so encoding cannot fail.
pub fn new_appointment_id() -> String {
    let hrp = bech32::Hrp::parse_unchecked("appt_");
    bech32::encode::<Bech32m>(hrp, uuid7().as_bytes()).expect("uuid payload fits bech32 limits")
}
