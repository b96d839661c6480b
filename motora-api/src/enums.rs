use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Defines a closed status enum stored as a text column.
///
/// The database keeps the legacy SCREAMING_SNAKE string values; Rust code only
/// ever sees the variants, so transitions are exhaustiveness-checked.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash,
            Serialize, Deserialize, AsExpression, FromSqlRow,
        )]
        #[diesel(sql_type = Text)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!(concat!("unknown ", stringify!($name), ": {}"), other)),
                }
            }
        }

        impl ToSql<Text, Pg> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                out.write_all(self.as_str().as_bytes())?;
                Ok(IsNull::No)
            }
        }

        impl FromSql<Text, Pg> for $name {
            fn from_sql(value: PgValue<'_>) -> deserialize::Result<Self> {
                std::str::from_utf8(value.as_bytes())?
                    .parse::<Self>()
                    .map_err(Into::into)
            }
        }
    };
}

text_enum! {
    ListingStatus {
        Draft => "DRAFT",
        PendingApproval => "PENDING_APPROVAL",
        Active => "ACTIVE",
        Rejected => "REJECTED",
        Sold => "SOLD",
    }
}

text_enum! {
    /// Conversation state of an inquiry thread. `Archived` is a legacy value
    /// still present in old rows; new code archives via the per-side flags
    /// and never writes it.
    InquiryStatus {
        New => "NEW",
        Read => "READ",
        Replied => "REPLIED",
        Archived => "ARCHIVED",
    }
}

text_enum! {
    FeaturedRequestStatus {
        None => "NONE",
        Pending => "PENDING",
        Approved => "APPROVED",
    }
}

text_enum! {
    SubscriptionPlan {
        Free => "FREE",
        Starter => "STARTER",
        Professional => "PROFESSIONAL",
        Enterprise => "ENTERPRISE",
    }
}

text_enum! {
    SubscriptionStatus {
        Active => "ACTIVE",
        Cancelled => "CANCELLED",
        PastDue => "PAST_DUE",
        Expired => "EXPIRED",
    }
}

text_enum! {
    BillingCycle {
        Monthly => "monthly",
        Yearly => "yearly",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_legacy_strings() {
        assert_eq!("PENDING_APPROVAL".parse::<ListingStatus>().unwrap(), ListingStatus::PendingApproval);
        assert_eq!(InquiryStatus::Replied.as_str(), "REPLIED");
        assert_eq!("ARCHIVED".parse::<InquiryStatus>().unwrap(), InquiryStatus::Archived);
        assert!("archived".parse::<InquiryStatus>().is_err());
    }
}
