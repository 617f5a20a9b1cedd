//! Process-wide request pacing clock
//!
//! One token bucket per source, shared by every worker hitting that source.
//! Each attempt (retries included) waits for a permit before going out.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use tracing::trace;

pub struct RequestPacer {
    limiter: DefaultDirectRateLimiter,
    per_second: NonZeroU32,
}

impl RequestPacer {
    pub fn per_second(per_second: NonZeroU32) -> Self {
        Self {
            limiter: RateLimiter::direct(Quota::per_second(per_second)),
            per_second,
        }
    }

    pub fn requests_per_second(&self) -> u32 {
        self.per_second.get()
    }

    /// Wait until a request may be sent
    pub async fn until_ready(&self) {
        if self.limiter.check().is_err() {
            trace!(rps = self.per_second.get(), "Pacing: waiting for request permit");
            self.limiter.until_ready().await;
        }
    }
}

impl std::fmt::Debug for RequestPacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPacer")
            .field("per_second", &self.per_second)
            .finish()
    }
}
