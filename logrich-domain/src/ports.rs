// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Domain-owned ports for the two pieces of ambient state a `LogEvent`
//! needs but that the domain itself must not hard-code: the current time
//! and a fresh unique id. Infrastructure provides the real implementations
//! (system clock, random id generator); tests provide deterministic ones.

use chrono::{DateTime, Utc};

/// Supplies the current time for event timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Supplies a fresh unique id for event identity.
pub trait IdProvider: Send + Sync {
    fn next_id(&self) -> String;
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// A clock that always returns the same instant, for deterministic
    /// tests.
    pub struct FixedClock(pub DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    /// An id provider that hands out `prefix-0`, `prefix-1`, ... in order.
    pub struct SequentialIds {
        prefix: &'static str,
        counter: AtomicU64,
    }

    impl SequentialIds {
        pub fn new(prefix: &'static str) -> Self {
            Self {
                prefix,
                counter: AtomicU64::new(0),
            }
        }
    }

    impl IdProvider for SequentialIds {
        fn next_id(&self) -> String {
            let n = self.counter.fetch_add(1, Ordering::Relaxed);
            format!("{}-{}", self.prefix, n)
        }
    }
}
