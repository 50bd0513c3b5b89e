//! Strongly-typed identifier value objects.
//!
//! Chat identifiers are database-assigned `BIGSERIAL` keys, so unlike most
//! value objects they cannot be generated client-side. Message ids are
//! totally ordered: a larger id was committed later within its room.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn value(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.trim().parse()?))
            }
        }
    };
}

numeric_id!(
    /// Marketplace member (host or guest).
    MemberId
);
numeric_id!(
    /// Rental listing a room is bound to.
    ListingId
);
numeric_id!(
    /// Two-party chat room.
    RoomId
);
numeric_id!(
    /// A member's participation record within one room.
    MembershipId
);
numeric_id!(
    /// Message within a room's append-only log.
    MessageId
);
