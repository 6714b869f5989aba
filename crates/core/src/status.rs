//! Closed status enums mapping to SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding lookup table. Variants serialize as their lowercase
//! name so API payloads never expose the raw ids.

use serde::{Deserialize, Serialize};

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

/// A status id with no matching enum variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind} id {id}")]
pub struct UnknownStatusId {
    pub kind: &'static str,
    pub id: StatusId,
}

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Every variant in seed order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Resolve a database status ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some($name::$variant), )+
                    _ => None,
                }
            }

            /// Lowercase name used in URLs and JSON.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $label, )+
                }
            }

            /// Parse the lowercase name.
            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $( $label => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl TryFrom<StatusId> for $name {
            type Error = UnknownStatusId;

            fn try_from(id: StatusId) -> Result<Self, Self::Error> {
                $name::from_id(id).ok_or(UnknownStatusId {
                    kind: stringify!($name),
                    id,
                })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

define_status_enum! {
    /// Memorial lifecycle status.
    MemorialStatus {
        Draft = 1 => "draft",
        Published = 2 => "published",
        Archived = 3 => "archived",
        Deleted = 4 => "deleted",
    }
}

define_status_enum! {
    /// Who may read a memorial.
    PrivacyLevel {
        Public = 1 => "public",
        Private = 2 => "private",
        Password = 3 => "password",
    }
}

define_status_enum! {
    /// Guestbook entry moderation status.
    GuestbookEntryStatus {
        Pending = 1 => "pending",
        Approved = 2 => "approved",
        Rejected = 3 => "rejected",
    }
}

define_status_enum! {
    /// Checkout payment status.
    PaymentStatus {
        Pending = 1 => "pending",
        Paid = 2 => "paid",
        Failed = 3 => "failed",
        Expired = 4 => "expired",
    }
}

define_status_enum! {
    /// Kind of media asset.
    MediaKind {
        Photo = 1 => "photo",
        Video = 2 => "video",
    }
}
