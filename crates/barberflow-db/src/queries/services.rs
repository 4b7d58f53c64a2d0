use anyhow::Result;
use barberflow_types::models::Service;
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use super::{get_timestamp, get_uuid};
use crate::models::{NewService, ServiceUpdate};
use crate::{Database, now_timestamp};

pub(crate) const SERVICE_COLUMNS: &str =
    "id, name, description, duration, price, category, is_active, barber_id, created_at, updated_at";

impl Database {
    pub fn create_service(&self, barber_id: Uuid, service: &NewService<'_>) -> Result<Service> {
        let id = Uuid::new_v4();
        let now = now_timestamp();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO services (id, name, description, duration, price, category, barber_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, COALESCE(?6, 'General'), ?7, ?8, ?8)",
                params![
                    id.to_string(),
                    service.name,
                    service.description,
                    service.duration,
                    service.price,
                    service.category,
                    barber_id.to_string(),
                    now
                ],
            )?;
            query_service(conn, barber_id, id)?
                .ok_or_else(|| anyhow::anyhow!("Service {} vanished after insert", id))
        })
    }

    pub fn list_services(&self, barber_id: Uuid) -> Result<Vec<Service>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {SERVICE_COLUMNS} FROM services WHERE barber_id = ?1 ORDER BY created_at"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([barber_id.to_string()], map_service)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Owner-scoped lookup: another barber's service reads as missing.
    pub fn get_service(&self, barber_id: Uuid, id: Uuid) -> Result<Option<Service>> {
        self.with_conn(|conn| query_service(conn, barber_id, id))
    }

    pub fn update_service(
        &self,
        barber_id: Uuid,
        id: Uuid,
        update: &ServiceUpdate,
    ) -> Result<Option<Service>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE services SET
                    name = COALESCE(?3, name),
                    description = COALESCE(?4, description),
                    duration = COALESCE(?5, duration),
                    price = COALESCE(?6, price),
                    category = COALESCE(?7, category),
                    is_active = COALESCE(?8, is_active),
                    updated_at = ?9
                 WHERE id = ?1 AND barber_id = ?2",
                params![
                    id.to_string(),
                    barber_id.to_string(),
                    update.name,
                    update.description,
                    update.duration,
                    update.price,
                    update.category,
                    update.is_active,
                    now_timestamp()
                ],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_service(conn, barber_id, id)
        })
    }

    pub fn delete_service(&self, barber_id: Uuid, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM services WHERE id = ?1 AND barber_id = ?2",
                params![id.to_string(), barber_id.to_string()],
            )?;
            Ok(changed == 1)
        })
    }
}

fn query_service(conn: &Connection, barber_id: Uuid, id: Uuid) -> Result<Option<Service>> {
    let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?1 AND barber_id = ?2");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt
        .query_row(params![id.to_string(), barber_id.to_string()], map_service)
        .optional()?;
    Ok(row)
}

/// Maps the `SERVICE_COLUMNS` projection starting at column `offset`.
pub(crate) fn map_service_at(row: &Row<'_>, offset: usize) -> rusqlite::Result<Service> {
    Ok(Service {
        id: get_uuid(row, offset)?,
        name: row.get(offset + 1)?,
        description: row.get(offset + 2)?,
        duration: row.get(offset + 3)?,
        price: row.get(offset + 4)?,
        category: row.get(offset + 5)?,
        is_active: row.get(offset + 6)?,
        barber: get_uuid(row, offset + 7)?,
        created_at: get_timestamp(row, offset + 8)?,
        updated_at: get_timestamp(row, offset + 9)?,
    })
}

fn map_service(row: &Row<'_>) -> rusqlite::Result<Service> {
    map_service_at(row, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use barberflow_types::models::UserRole;

    fn barber(db: &Database, email: &str) -> Uuid {
        db.create_user(&NewUser {
            name: "Barber",
            email,
            password_hash: "hash",
            role: UserRole::Barber,
            barber_shop: None,
        })
        .unwrap()
        .id
    }

    fn haircut() -> NewService<'static> {
        NewService {
            name: "Haircut",
            description: None,
            duration: 30,
            price: 25.0,
            category: None,
        }
    }

    #[test]
    fn services_are_scoped_to_owner() {
        let db = Database::open_in_memory().unwrap();
        let owner = barber(&db, "a@example.com");
        let intruder = barber(&db, "b@example.com");
        let service = db.create_service(owner, &haircut()).unwrap();
        assert_eq!(service.category, "General");
        assert!(service.is_active);

        assert!(db.get_service(intruder, service.id).unwrap().is_none());
        assert!(db.list_services(intruder).unwrap().is_empty());
        let update = ServiceUpdate {
            price: Some(1.0),
            ..Default::default()
        };
        assert!(db.update_service(intruder, service.id, &update).unwrap().is_none());
        assert!(!db.delete_service(intruder, service.id).unwrap());

        assert_eq!(db.list_services(owner).unwrap().len(), 1);
    }

    #[test]
    fn partial_update_keeps_other_fields() {
        let db = Database::open_in_memory().unwrap();
        let owner = barber(&db, "a@example.com");
        let service = db.create_service(owner, &haircut()).unwrap();

        let update = ServiceUpdate {
            price: Some(30.0),
            is_active: Some(false),
            ..Default::default()
        };
        let updated = db.update_service(owner, service.id, &update).unwrap().unwrap();
        assert_eq!(updated.price, 30.0);
        assert!(!updated.is_active);
        assert_eq!(updated.name, "Haircut");
        assert_eq!(updated.duration, 30);

        assert!(db.delete_service(owner, service.id).unwrap());
        assert!(db.get_service(owner, service.id).unwrap().is_none());
    }
}
