//! Row types and write payloads.
//!
//! Services, clients and appointments read straight into the
//! `barberflow-types` models. Users get their own row type because the
//! password hash and reset token must stay inside the server.

use barberflow_types::models::{
    AccountStatus, AppointmentStatus, Plan, SubscriptionStatus, User, UserRole,
};
use barberflow_types::schedule::TimeSlot;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub barber_shop: Option<String>,
    pub status: AccountStatus,
    pub stripe_customer_id: Option<String>,
    pub subscription_status: SubscriptionStatus,
    pub plan: Plan,
    pub password_reset_token: Option<String>,
    pub password_reset_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub fn to_public(&self) -> User {
        User {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            barber_shop: self.barber_shop.clone(),
            status: self.status,
            plan: self.plan,
            subscription_status: self.subscription_status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: UserRole,
    pub barber_shop: Option<&'a str>,
}

/// Profile fields to overwrite; `None` leaves the column untouched.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub barber_shop: Option<String>,
}

pub struct NewService<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub duration: i64,
    pub price: f64,
    pub category: Option<&'a str>,
}

#[derive(Debug, Default)]
pub struct ServiceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub duration: Option<i64>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
}

pub struct NewClient<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub notes: Option<&'a str>,
}

#[derive(Debug, Default)]
pub struct ClientUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub status: Option<AccountStatus>,
}

pub struct NewAppointment<'a> {
    pub client_name: &'a str,
    pub client_email: &'a str,
    pub service_id: Uuid,
    pub barber_id: Uuid,
    pub slot: TimeSlot,
    pub price: f64,
    pub notes: Option<&'a str>,
    pub status: AppointmentStatus,
}
