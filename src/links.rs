//! Short-code issuing for tracking links.

use rand::{distr::Alphanumeric, RngExt};
use tracing::debug;

use crate::models::TrackingLink;
use crate::store::{EventStore, StoreError, StoreResult};

pub const CODE_LENGTH: usize = 6;

/// How many collisions `issue` tolerates before giving up. Collisions are
/// vanishingly rare in a 62^6 code space at personal-tracking volume.
const MAX_ATTEMPTS: usize = 5;

/// Generate a random url-safe short code.
pub fn generate_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LENGTH)
        .map(char::from)
        .collect()
}

/// Issue a new tracking link with a freshly generated code.
///
/// Regenerates on collision, up to [`MAX_ATTEMPTS`] times, then fails with
/// [`StoreError::CodeSpaceExhausted`].
pub async fn issue(store: &dyn EventStore, label: &str) -> StoreResult<TrackingLink> {
    for attempt in 1..=MAX_ATTEMPTS {
        let code = generate_code();
        match store.create_link(&code, label).await {
            Ok(link) => return Ok(link),
            Err(StoreError::Conflict) => {
                debug!(code = %code, attempt, "short code collision, regenerating");
            }
            Err(err) => return Err(err),
        }
    }
    Err(StoreError::CodeSpaceExhausted)
}
