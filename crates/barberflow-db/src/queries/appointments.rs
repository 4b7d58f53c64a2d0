use anyhow::Result;
use barberflow_types::models::{Appointment, AppointmentStatus};
use barberflow_types::schedule::TimeSlot;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use tracing::debug;
use uuid::Uuid;

use super::clients::record_visit;
use super::services::map_service_at;
use super::{get_enum, get_timestamp, get_uuid};
use crate::models::NewAppointment;
use crate::{Database, StoreError, format_timestamp, now_timestamp};

const APPOINTMENT_COLUMNS: &str = "a.id, a.client_name, a.client_email, a.service_id, a.barber_id,
     a.start_time, a.end_time, a.status, a.price, a.notes, a.created_at, a.updated_at";

const APPOINTMENT_COLUMN_COUNT: usize = 12;

impl Database {
    /// Insert an appointment unless it overlaps a non-cancelled booking of the
    /// same barber. Check and insert share one IMMEDIATE transaction.
    pub fn book_appointment(&self, booking: &NewAppointment<'_>) -> Result<Appointment, StoreError> {
        let id = Uuid::new_v4();
        let now = now_timestamp();
        let barber = booking.barber_id.to_string();
        let start = format_timestamp(booking.slot.start);
        let end = format_timestamp(booking.slot.end);

        let booked = self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if let Some(existing) = find_conflict(&tx, &barber, &booking.slot, None)? {
                debug!(barber = %barber, conflicting = %existing, "Slot overlaps existing appointment");
                return Ok(None);
            }

            tx.execute(
                "INSERT INTO appointments
                    (id, client_name, client_email, service_id, barber_id, start_time, end_time,
                     status, price, notes, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
                params![
                    id.to_string(),
                    booking.client_name,
                    booking.client_email,
                    booking.service_id.to_string(),
                    barber,
                    start,
                    end,
                    booking.status.as_str(),
                    booking.price,
                    booking.notes,
                    now
                ],
            )?;
            let appointment = query_appointment(&tx, &barber, &id.to_string())?;
            tx.commit()?;
            Ok(appointment)
        })?;

        booked.ok_or(StoreError::SlotTaken)
    }

    /// The barber's appointments ordered by start time, each with its service
    /// when it still exists. `window` keeps those starting within `[from, to]`.
    pub fn list_appointments(
        &self,
        barber_id: Uuid,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<Appointment>> {
        self.with_conn(|conn| {
            let window_filter = if window.is_some() {
                "AND a.start_time >= ?2 AND a.start_time <= ?3"
            } else {
                ""
            };
            let sql = format!(
                "SELECT {APPOINTMENT_COLUMNS},
                        s.id, s.name, s.description, s.duration, s.price, s.category,
                        s.is_active, s.barber_id, s.created_at, s.updated_at
                 FROM appointments a
                 LEFT JOIN services s ON s.id = a.service_id
                 WHERE a.barber_id = ?1 {window_filter}
                 ORDER BY a.start_time"
            );
            let mut stmt = conn.prepare(&sql)?;
            let map_row = |row: &Row<'_>| -> rusqlite::Result<Appointment> {
                let mut appointment = map_appointment(row)?;
                if row.get::<_, Option<String>>(APPOINTMENT_COLUMN_COUNT)?.is_some() {
                    appointment.service = Some(map_service_at(row, APPOINTMENT_COLUMN_COUNT)?);
                }
                Ok(appointment)
            };
            let rows = match window {
                Some((from, to)) => stmt
                    .query_map(
                        params![barber_id.to_string(), format_timestamp(from), format_timestamp(to)],
                        map_row,
                    )?
                    .collect::<std::result::Result<Vec<_>, _>>()?,
                None => stmt
                    .query_map([barber_id.to_string()], map_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?,
            };
            Ok(rows)
        })
    }

    pub fn get_appointment(&self, barber_id: Uuid, id: Uuid) -> Result<Option<Appointment>> {
        self.with_conn(|conn| query_appointment(conn, &barber_id.to_string(), &id.to_string()))
    }

    /// Owner-scoped status change. Moving into `completed` credits the visit
    /// to the matching client record of the shop. Reopening a cancelled
    /// appointment re-runs the conflict check against the rest of the calendar.
    pub fn update_appointment_status(
        &self,
        barber_id: Uuid,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Option<Appointment>, StoreError> {
        let barber = barber_id.to_string();
        let id = id.to_string();
        let updated = self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let Some(previous) = query_appointment(&tx, &barber, &id)? else {
                return Ok(None);
            };

            if status.blocks_slot() && !previous.status.blocks_slot() {
                let slot = TimeSlot {
                    start: previous.start_time,
                    end: previous.end_time,
                };
                if let Some(existing) = find_conflict(&tx, &barber, &slot, Some(&id))? {
                    debug!(barber = %barber, conflicting = %existing, "Reopened slot is taken");
                    return Err(StoreError::SlotTaken.into());
                }
            }

            tx.execute(
                "UPDATE appointments SET status = ?3, updated_at = ?4 WHERE id = ?1 AND barber_id = ?2",
                params![id, barber, status.as_str(), now_timestamp()],
            )?;

            if status == AppointmentStatus::Completed
                && previous.status != AppointmentStatus::Completed
            {
                let credited = record_visit(
                    &tx,
                    &barber,
                    &previous.client_email,
                    previous.price,
                    &format_timestamp(previous.start_time),
                )?;
                debug!(appointment = %id, credited, "Appointment completed");
            }

            let updated = query_appointment(&tx, &barber, &id)?;
            tx.commit()?;
            Ok(updated)
        })?;
        Ok(updated)
    }

    pub fn delete_appointment(&self, barber_id: Uuid, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM appointments WHERE id = ?1 AND barber_id = ?2",
                params![id.to_string(), barber_id.to_string()],
            )?;
            Ok(changed == 1)
        })
    }
}

/// Any blocking appointment with `stored.start < new.end AND stored.end > new.start`,
/// other than `exclude`.
fn find_conflict(
    conn: &Connection,
    barber_id: &str,
    slot: &TimeSlot,
    exclude: Option<&str>,
) -> Result<Option<String>> {
    let id = conn
        .query_row(
            "SELECT id FROM appointments
             WHERE barber_id = ?1
               AND status != 'cancelled'
               AND start_time < ?3
               AND end_time > ?2
               AND id IS NOT ?4
             LIMIT 1",
            params![
                barber_id,
                format_timestamp(slot.start),
                format_timestamp(slot.end),
                exclude
            ],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

fn query_appointment(conn: &Connection, barber_id: &str, id: &str) -> Result<Option<Appointment>> {
    let sql = format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments a WHERE a.id = ?1 AND a.barber_id = ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row(params![id, barber_id], map_appointment).optional()?;
    Ok(row)
}

fn map_appointment(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: get_uuid(row, 0)?,
        client_name: row.get(1)?,
        client_email: row.get(2)?,
        service_id: get_uuid(row, 3)?,
        service: None,
        barber: get_uuid(row, 4)?,
        start_time: get_timestamp(row, 5)?,
        end_time: get_timestamp(row, 6)?,
        status: get_enum(row, 7)?,
        price: row.get(8)?,
        notes: row.get(9)?,
        created_at: get_timestamp(row, 10)?,
        updated_at: get_timestamp(row, 11)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewClient, NewService, NewUser};
    use barberflow_types::models::UserRole;
    use chrono::TimeZone;

    struct Fixture {
        db: Database,
        barber: Uuid,
        service: Uuid,
    }

    fn fixture() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let barber = add_barber(&db, "barber@example.com");
        let service = db
            .create_service(
                barber,
                &NewService {
                    name: "Fade",
                    description: None,
                    duration: 30,
                    price: 20.0,
                    category: None,
                },
            )
            .unwrap()
            .id;
        Fixture { db, barber, service }
    }

    fn add_barber(db: &Database, email: &str) -> Uuid {
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

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, hour, minute, 0).unwrap()
    }

    fn book(f: &Fixture, barber: Uuid, hour: u32, minute: u32) -> Result<Appointment, StoreError> {
        f.db.book_appointment(&NewAppointment {
            client_name: "Casey",
            client_email: "casey@example.com",
            service_id: f.service,
            barber_id: barber,
            slot: TimeSlot::for_duration(at(hour, minute), 30).unwrap(),
            price: 20.0,
            notes: None,
            status: AppointmentStatus::Confirmed,
        })
    }

    #[test]
    fn overlapping_booking_rejected() {
        let f = fixture();
        book(&f, f.barber, 10, 0).unwrap();
        assert!(matches!(book(&f, f.barber, 10, 15), Err(StoreError::SlotTaken)));
        assert!(matches!(book(&f, f.barber, 9, 45), Err(StoreError::SlotTaken)));
        assert!(matches!(book(&f, f.barber, 10, 0), Err(StoreError::SlotTaken)));
        assert_eq!(f.db.list_appointments(f.barber, None).unwrap().len(), 1);
    }

    #[test]
    fn adjacent_bookings_succeed() {
        let f = fixture();
        book(&f, f.barber, 10, 0).unwrap();
        book(&f, f.barber, 10, 30).unwrap();
        book(&f, f.barber, 9, 30).unwrap();

        let starts: Vec<_> = f
            .db
            .list_appointments(f.barber, None)
            .unwrap()
            .into_iter()
            .map(|a| a.start_time)
            .collect();
        assert_eq!(starts, vec![at(9, 30), at(10, 0), at(10, 30)]);
    }

    #[test]
    fn cancelled_booking_frees_slot() {
        let f = fixture();
        let first = book(&f, f.barber, 10, 0).unwrap();
        f.db.update_appointment_status(f.barber, first.id, AppointmentStatus::Cancelled)
            .unwrap()
            .unwrap();
        book(&f, f.barber, 10, 0).unwrap();
    }

    #[test]
    fn reopening_into_taken_slot_rejected() {
        let f = fixture();
        let first = book(&f, f.barber, 10, 0).unwrap();
        f.db.update_appointment_status(f.barber, first.id, AppointmentStatus::Cancelled)
            .unwrap();
        book(&f, f.barber, 10, 15).unwrap();

        let reopened =
            f.db.update_appointment_status(f.barber, first.id, AppointmentStatus::Confirmed);
        assert!(matches!(reopened, Err(StoreError::SlotTaken)));
        let still = f.db.get_appointment(f.barber, first.id).unwrap().unwrap();
        assert_eq!(still.status, AppointmentStatus::Cancelled);

        // An appointment never conflicts with itself.
        let second = book(&f, f.barber, 12, 0).unwrap();
        f.db.update_appointment_status(f.barber, second.id, AppointmentStatus::Cancelled)
            .unwrap();
        f.db.update_appointment_status(f.barber, second.id, AppointmentStatus::Pending)
            .unwrap()
            .unwrap();
    }

    #[test]
    fn other_barbers_do_not_conflict() {
        let f = fixture();
        let other = add_barber(&f.db, "other@example.com");
        book(&f, f.barber, 10, 0).unwrap();
        book(&f, other, 10, 0).unwrap();
    }

    #[test]
    fn listing_populates_service_and_filters_window() {
        let f = fixture();
        book(&f, f.barber, 9, 0).unwrap();
        book(&f, f.barber, 12, 0).unwrap();

        let all = f.db.list_appointments(f.barber, None).unwrap();
        assert_eq!(all[0].service.as_ref().map(|s| s.name.as_str()), Some("Fade"));

        let morning = f.db.list_appointments(f.barber, Some((at(8, 0), at(10, 0)))).unwrap();
        assert_eq!(morning.len(), 1);
        assert_eq!(morning[0].start_time, at(9, 0));

        f.db.delete_service(f.barber, f.service).unwrap();
        let orphaned = f.db.list_appointments(f.barber, None).unwrap();
        assert_eq!(orphaned.len(), 2);
        assert!(orphaned[0].service.is_none());
    }

    #[test]
    fn status_and_delete_are_owner_scoped() {
        let f = fixture();
        let other = add_barber(&f.db, "other@example.com");
        let appt = book(&f, f.barber, 10, 0).unwrap();

        assert!(f.db.get_appointment(other, appt.id).unwrap().is_none());
        assert!(
            f.db.update_appointment_status(other, appt.id, AppointmentStatus::Cancelled)
                .unwrap()
                .is_none()
        );
        assert!(!f.db.delete_appointment(other, appt.id).unwrap());
        assert!(f.db.delete_appointment(f.barber, appt.id).unwrap());
    }

    #[test]
    fn completing_credits_client_once() {
        let f = fixture();
        f.db.create_client(
            f.barber,
            &NewClient {
                name: "Casey",
                email: "casey@example.com",
                phone: None,
                notes: None,
            },
        )
        .unwrap();
        let appt = book(&f, f.barber, 10, 0).unwrap();

        for _ in 0..2 {
            let done = f
                .db
                .update_appointment_status(f.barber, appt.id, AppointmentStatus::Completed)
                .unwrap()
                .unwrap();
            assert_eq!(done.status, AppointmentStatus::Completed);
        }

        let client = &f.db.list_clients(f.barber).unwrap()[0];
        assert_eq!(client.total_bookings, 1);
        assert_eq!(client.total_spent, 20.0);
        assert_eq!(client.last_visit, Some(at(10, 0)));
    }
}
