use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Returned by `FromStr` on the string-backed enums below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

/// Enums stored as TEXT columns and sent over the wire as the same string.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant(other.to_string())),
                }
            }
        }
    };
}

string_enum!(
    UserRole {
        Admin => "ADMIN",
        Barber => "BARBER",
        Employee => "EMPLOYEE",
        Customer => "CUSTOMER",
    }
);

string_enum!(
    /// Whether an account or client record is in use.
    AccountStatus {
        Active => "active",
        Inactive => "inactive",
    }
);

string_enum!(
    /// Subscription tier. Anything but `Free` unlocks premium analytics.
    Plan {
        Free => "free",
        Pro => "pro",
        Business => "business",
    }
);

impl Plan {
    pub fn is_paid(&self) -> bool {
        !matches!(self, Self::Free)
    }
}

string_enum!(
    /// Mirrors Stripe's subscription statuses, plus `none` for users who never subscribed.
    SubscriptionStatus {
        Active => "active",
        Canceled => "canceled",
        Incomplete => "incomplete",
        IncompleteExpired => "incomplete_expired",
        PastDue => "past_due",
        Trialing => "trialing",
        Unpaid => "unpaid",
        None => "none",
    }
);

string_enum!(
    AppointmentStatus {
        Pending => "pending",
        Confirmed => "confirmed",
        Cancelled => "cancelled",
        Completed => "completed",
    }
);

impl AppointmentStatus {
    /// Cancelled appointments free their slot.
    pub fn blocks_slot(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

/// Public view of a shop owner. Credentials and reset tokens never leave the DB crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub barber_shop: Option<String>,
    pub status: AccountStatus,
    pub plan: Plan,
    pub subscription_status: SubscriptionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Minutes.
    pub duration: i64,
    pub price: f64,
    pub category: String,
    pub is_active: bool,
    pub barber: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub shop_id: Uuid,
    pub total_bookings: i64,
    pub total_spent: f64,
    pub last_visit: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub client_name: String,
    pub client_email: String,
    pub service_id: Uuid,
    /// Populated on listing when the service still exists.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub service: Option<Service>,
    pub barber: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub price: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// -- Analytics --

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_revenue: f64,
    pub booking_count: i64,
    pub average_ticket: f64,
    pub client_count: i64,
}

/// Revenue for one UTC day, keyed `YYYY-MM-DD`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenuePoint {
    #[serde(rename = "_id")]
    pub day: String,
    pub revenue: f64,
    pub bookings: i64,
}

/// Completed bookings for one service name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceShare {
    #[serde(rename = "_id")]
    pub name: String,
    pub value: i64,
    pub revenue: f64,
}

/// Canonical form used to store and match user and client emails.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_use_wire_strings() {
        assert_eq!(UserRole::Barber.as_str(), "BARBER");
        assert_eq!("past_due".parse::<SubscriptionStatus>(), Ok(SubscriptionStatus::PastDue));
        assert_eq!(
            serde_json::to_string(&SubscriptionStatus::IncompleteExpired).unwrap(),
            "\"incomplete_expired\""
        );
        assert!("gold".parse::<Plan>().is_err());
    }

    #[test]
    fn only_free_plan_is_unpaid() {
        assert!(!Plan::Free.is_paid());
        assert!(Plan::Pro.is_paid());
        assert!(Plan::Business.is_paid());
    }

    #[test]
    fn cancelled_appointments_release_slot() {
        assert!(!AppointmentStatus::Cancelled.blocks_slot());
        assert!(AppointmentStatus::Pending.blocks_slot());
        assert!(AppointmentStatus::Completed.blocks_slot());
    }
}
