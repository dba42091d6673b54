use chrono::{DateTime, Local, NaiveDate, Utc};
use rand::rngs::{OsRng, SmallRng};
use rand::{Rng, SeedableRng, TryRngCore};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Builder;

const FALLBACK_ID_LEN: usize = 20;

static FALLBACK_SEQ: AtomicU64 = AtomicU64::new(0);

/// Fresh entity id. UUID v4 from OS randomness, alphanumeric fallback when the
/// OS source is unavailable.
pub fn new_id() -> String {
    let mut bytes = [0u8; 16];
    match OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => Builder::from_random_bytes(bytes).into_uuid().to_string(),
        Err(error) => {
            tracing::warn!(error = %error, "os randomness unavailable, using fallback id");
            fallback_id()
        }
    }
}

fn fallback_id() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64;
    let seq = FALLBACK_SEQ.fetch_add(1, Ordering::Relaxed);
    let mut rng = SmallRng::seed_from_u64(nanos ^ seq.rotate_left(32));
    (&mut rng)
        .sample_iter(rand::distr::Alphanumeric)
        .take(FALLBACK_ID_LEN)
        .map(char::from)
        .collect()
}

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
