//! Dangling-DNS classification.
//!
//! Only a live DNS record whose endpoint times out or refuses at the transport
//! level is flagged. Opaque failures are inconclusive and stay `OK`.

use crate::core::{HttpErrorKind, HttpOutcome, LivenessOutcome, Verdict};

pub fn is_dangling(outcome: &LivenessOutcome) -> bool {
    if outcome.dns_ip.is_none() {
        return false;
    }
    matches!(
        outcome.http,
        Some(HttpOutcome::Failed(HttpErrorKind::Timeout | HttpErrorKind::Refused))
    )
}

pub fn verdict(outcome: &LivenessOutcome) -> Verdict {
    if is_dangling(outcome) {
        Verdict::Dangling
    } else {
        Verdict::Ok
    }
}
