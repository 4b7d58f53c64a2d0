use anyhow::Result;
use barberflow_types::models::{Client, normalize_email};
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use super::{get_enum, get_opt_timestamp, get_timestamp, get_uuid};
use crate::models::{ClientUpdate, NewClient};
use crate::{Database, StoreError, now_timestamp};

const CLIENT_COLUMNS: &str = "id, name, email, phone, shop_id, total_bookings, total_spent, last_visit,
     notes, status, created_at, updated_at";

impl Database {
    pub fn create_client(&self, shop_id: Uuid, client: &NewClient<'_>) -> Result<Client, StoreError> {
        let id = Uuid::new_v4();
        let now = now_timestamp();
        let row = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO clients (id, name, email, phone, notes, shop_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    id.to_string(),
                    client.name,
                    client.email,
                    client.phone,
                    client.notes,
                    shop_id.to_string(),
                    now
                ],
            )?;
            query_client(conn, shop_id, id)?
                .ok_or_else(|| anyhow::anyhow!("Client {} vanished after insert", id))
        })?;
        Ok(row)
    }

    /// Newest first.
    pub fn list_clients(&self, shop_id: Uuid) -> Result<Vec<Client>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {CLIENT_COLUMNS} FROM clients WHERE shop_id = ?1 ORDER BY created_at DESC, rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([shop_id.to_string()], map_client)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_client(&self, shop_id: Uuid, id: Uuid) -> Result<Option<Client>> {
        self.with_conn(|conn| query_client(conn, shop_id, id))
    }

    pub fn update_client(
        &self,
        shop_id: Uuid,
        id: Uuid,
        update: &ClientUpdate,
    ) -> Result<Option<Client>, StoreError> {
        let row = self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE clients SET
                    name = COALESCE(?3, name),
                    email = COALESCE(?4, email),
                    phone = COALESCE(?5, phone),
                    notes = COALESCE(?6, notes),
                    status = COALESCE(?7, status),
                    updated_at = ?8
                 WHERE id = ?1 AND shop_id = ?2",
                params![
                    id.to_string(),
                    shop_id.to_string(),
                    update.name,
                    update.email,
                    update.phone,
                    update.notes,
                    update.status.map(|s| s.as_str()),
                    now_timestamp()
                ],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_client(conn, shop_id, id)
        })?;
        Ok(row)
    }

    pub fn delete_client(&self, shop_id: Uuid, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM clients WHERE id = ?1 AND shop_id = ?2",
                params![id.to_string(), shop_id.to_string()],
            )?;
            Ok(changed == 1)
        })
    }
}

/// Count a completed visit against the shop's client record with this email, if any.
pub(crate) fn record_visit(
    conn: &Connection,
    shop_id: &str,
    email: &str,
    amount: f64,
    visited_at: &str,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE clients SET
            total_bookings = total_bookings + 1,
            total_spent = total_spent + ?3,
            last_visit = CASE WHEN last_visit IS NULL OR last_visit < ?4 THEN ?4 ELSE last_visit END,
            updated_at = ?5
         WHERE shop_id = ?1 AND email = ?2",
        params![shop_id, normalize_email(email), amount, visited_at, now_timestamp()],
    )?;
    Ok(changed == 1)
}

fn query_client(conn: &Connection, shop_id: Uuid, id: Uuid) -> Result<Option<Client>> {
    let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1 AND shop_id = ?2");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt
        .query_row(params![id.to_string(), shop_id.to_string()], map_client)
        .optional()?;
    Ok(row)
}

fn map_client(row: &Row<'_>) -> rusqlite::Result<Client> {
    Ok(Client {
        id: get_uuid(row, 0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        shop_id: get_uuid(row, 4)?,
        total_bookings: row.get(5)?,
        total_spent: row.get(6)?,
        last_visit: get_opt_timestamp(row, 7)?,
        notes: row.get(8)?,
        status: get_enum(row, 9)?,
        created_at: get_timestamp(row, 10)?,
        updated_at: get_timestamp(row, 11)?,
    })
}
