use anyhow::Result;
use barberflow_types::models::{Plan, SubscriptionStatus};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use super::{get_enum, get_opt_timestamp, get_timestamp, get_uuid};
use crate::models::{NewUser, ProfileUpdate, UserRow};
use crate::{Database, StoreError, format_timestamp, now_timestamp};

const USER_COLUMNS: &str = "id, name, email, password, role, barber_shop, status, stripe_customer_id,
     subscription_status, plan, password_reset_token, password_reset_expires, created_at, updated_at";

impl Database {
    pub fn create_user(&self, user: &NewUser<'_>) -> Result<UserRow, StoreError> {
        let id = Uuid::new_v4();
        let now = now_timestamp();
        let row = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, email, password, role, barber_shop, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    id.to_string(),
                    user.name,
                    user.email,
                    user.password_hash,
                    user.role.as_str(),
                    user.barber_shop,
                    now
                ],
            )?;
            query_user(conn, "id = ?1", &id.to_string())?
                .ok_or_else(|| anyhow::anyhow!("User {} vanished after insert", id))
        })?;
        Ok(row)
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email = ?1", email))
    }

    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", &id.to_string()))
    }

    pub fn get_user_by_stripe_customer(&self, customer_id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "stripe_customer_id = ?1", customer_id))
    }

    /// Returns `None` when the user no longer exists.
    pub fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<UserRow>, StoreError> {
        let row = self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET
                    name = COALESCE(?2, name),
                    email = COALESCE(?3, email),
                    barber_shop = COALESCE(?4, barber_shop),
                    updated_at = ?5
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    update.name,
                    update.email,
                    update.barber_shop,
                    now_timestamp()
                ],
            )?;
            query_user(conn, "id = ?1", &id.to_string())
        })?;
        Ok(row)
    }

    pub fn set_password(&self, id: Uuid, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET password = ?2, updated_at = ?3 WHERE id = ?1",
                params![id.to_string(), password_hash, now_timestamp()],
            )?;
            Ok(changed == 1)
        })
    }

    /// Store the digest of a password reset token. Any earlier token is replaced.
    pub fn set_reset_token(
        &self,
        id: Uuid,
        token_digest: &str,
        expires: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET password_reset_token = ?2, password_reset_expires = ?3, updated_at = ?4
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    token_digest,
                    format_timestamp(expires),
                    now_timestamp()
                ],
            )?;
            Ok(())
        })
    }

    /// Swap in a new password for the holder of an unexpired reset token and
    /// burn the token in the same statement. Returns the affected user id.
    pub fn consume_reset_token(
        &self,
        token_digest: &str,
        now: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<Option<Uuid>> {
        self.with_conn(|conn| {
            let id: Option<String> = conn
                .query_row(
                    "UPDATE users SET
                        password = ?3,
                        password_reset_token = NULL,
                        password_reset_expires = NULL,
                        updated_at = ?2
                     WHERE password_reset_token = ?1 AND password_reset_expires > ?2
                     RETURNING id",
                    params![token_digest, format_timestamp(now), password_hash],
                    |row| row.get(0),
                )
                .optional()?;
            id.map(|raw| raw.parse::<Uuid>().map_err(Into::into)).transpose()
        })
    }

    pub fn set_stripe_customer(&self, id: Uuid, customer_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET stripe_customer_id = ?2, updated_at = ?3 WHERE id = ?1",
                params![id.to_string(), customer_id, now_timestamp()],
            )?;
            Ok(())
        })
    }

    /// Record a subscription status; `plan = None` keeps the current tier.
    /// Returns false when no such user exists.
    pub fn set_subscription(
        &self,
        id: Uuid,
        status: SubscriptionStatus,
        plan: Option<Plan>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET
                    subscription_status = ?2,
                    plan = COALESCE(?3, plan),
                    updated_at = ?4
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    status.as_str(),
                    plan.map(|p| p.as_str()),
                    now_timestamp()
                ],
            )?;
            Ok(changed == 1)
        })
    }
}

fn query_user(conn: &Connection, predicate: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {predicate}");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([value], map_user).optional()?;
    Ok(row)
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: get_uuid(row, 0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        role: get_enum(row, 4)?,
        barber_shop: row.get(5)?,
        status: get_enum(row, 6)?,
        stripe_customer_id: row.get(7)?,
        subscription_status: get_enum(row, 8)?,
        plan: get_enum(row, 9)?,
        password_reset_token: row.get(10)?,
        password_reset_expires: get_opt_timestamp(row, 11)?,
        created_at: get_timestamp(row, 12)?,
        updated_at: get_timestamp(row, 13)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use barberflow_types::models::UserRole;
    use chrono::Duration;

    fn new_user<'a>(email: &'a str) -> NewUser<'a> {
        NewUser {
            name: "Sam",
            email,
            password_hash: "hash",
            role: UserRole::Barber,
            barber_shop: Some("Fade Street"),
        }
    }

    #[test]
    fn create_user_applies_defaults() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user(&new_user("sam@example.com")).unwrap();
        assert_eq!(user.plan, Plan::Free);
        assert_eq!(user.subscription_status, SubscriptionStatus::None);
        assert!(user.stripe_customer_id.is_none());

        let found = db.get_user_by_email("sam@example.com").unwrap().unwrap();
        assert_eq!(found.id, user.id);
    }

    #[test]
    fn duplicate_email_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&new_user("sam@example.com")).unwrap();
        let err = db.create_user(&new_user("sam@example.com")).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
    }

    #[test]
    fn reset_token_is_single_use() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user(&new_user("sam@example.com")).unwrap();
        let now = Utc::now();
        db.set_reset_token(user.id, "digest", now + Duration::minutes(10)).unwrap();

        assert_eq!(db.consume_reset_token("digest", now, "new-hash").unwrap(), Some(user.id));
        assert_eq!(db.consume_reset_token("digest", now, "other").unwrap(), None);

        let row = db.get_user_by_id(user.id).unwrap().unwrap();
        assert_eq!(row.password, "new-hash");
        assert!(row.password_reset_token.is_none());
    }

    #[test]
    fn expired_reset_token_rejected() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user(&new_user("sam@example.com")).unwrap();
        let now = Utc::now();
        db.set_reset_token(user.id, "digest", now - Duration::seconds(1)).unwrap();

        assert_eq!(db.consume_reset_token("digest", now, "new-hash").unwrap(), None);
        assert_eq!(db.get_user_by_id(user.id).unwrap().unwrap().password, "hash");
    }

    #[test]
    fn subscription_update_can_keep_plan() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user(&new_user("sam@example.com")).unwrap();
        db.set_stripe_customer(user.id, "cus_123").unwrap();

        assert!(db.set_subscription(user.id, SubscriptionStatus::Active, Some(Plan::Business)).unwrap());
        assert!(db.set_subscription(user.id, SubscriptionStatus::Trialing, None).unwrap());

        let row = db.get_user_by_stripe_customer("cus_123").unwrap().unwrap();
        assert_eq!(row.plan, Plan::Business);
        assert_eq!(row.subscription_status, SubscriptionStatus::Trialing);
        assert!(!db.set_subscription(Uuid::new_v4(), SubscriptionStatus::None, None).unwrap());
    }

    #[test]
    fn profile_update_rejects_taken_email() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&new_user("sam@example.com")).unwrap();
        let other = db.create_user(&new_user("alex@example.com")).unwrap();

        let update = ProfileUpdate {
            email: Some("sam@example.com".into()),
            ..Default::default()
        };
        assert!(matches!(db.update_profile(other.id, &update), Err(StoreError::Duplicate)));

        let update = ProfileUpdate {
            name: Some("Alex".into()),
            ..Default::default()
        };
        let row = db.update_profile(other.id, &update).unwrap().unwrap();
        assert_eq!(row.name, "Alex");
        assert_eq!(row.barber_shop.as_deref(), Some("Fade Street"));
    }
}
