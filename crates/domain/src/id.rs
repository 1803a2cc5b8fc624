//! Identifiers for runtime registrations (subscriptions, timers).
//!
//! They only live in memory and show up in logs, so they print as a short
//! kind-prefixed form. Device identifiers are not generated; see
//! [`EntityId`](crate::entity::EntityId).

use std::fmt;

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident, $prefix:literal) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(uuid::Uuid);

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let simple = self.0.simple().to_string();
                write!(f, "{}-{}", $prefix, &simple[..8])
            }
        }
    };
}

define_id!(
    /// One live registration on a state stream.
    SubscriptionId,
    "sub"
);

define_id!(
    /// One scheduled one-shot callback.
    TimerId,
    "timer"
);
