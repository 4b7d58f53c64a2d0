use anyhow::Result;
use barberflow_types::models::{DashboardStats, RevenuePoint, ServiceShare};
use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::{Database, format_timestamp};

impl Database {
    /// Revenue, count and average ticket over completed appointments; client
    /// count over distinct emails of every appointment.
    pub fn dashboard_stats(&self, barber_id: Uuid) -> Result<DashboardStats> {
        let barber = barber_id.to_string();
        self.with_conn(|conn| {
            let (total_revenue, booking_count, average_ticket): (f64, i64, f64) = conn.query_row(
                "SELECT COALESCE(SUM(price), 0.0), COUNT(*), COALESCE(AVG(price), 0.0)
                 FROM appointments
                 WHERE barber_id = ?1 AND status = 'completed'",
                [&barber],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

            let client_count: i64 = conn.query_row(
                "SELECT COUNT(DISTINCT client_email) FROM appointments WHERE barber_id = ?1",
                [&barber],
                |row| row.get(0),
            )?;

            Ok(DashboardStats {
                total_revenue,
                booking_count,
                average_ticket,
                client_count,
            })
        })
    }

    /// Completed revenue per UTC day since `since`, oldest day first.
    pub fn revenue_trends(&self, barber_id: Uuid, since: DateTime<Utc>) -> Result<Vec<RevenuePoint>> {
        self.with_conn(|conn| {
            // start_time is fixed-width UTC RFC 3339, so its first 10 chars are the day.
            let mut stmt = conn.prepare(
                "SELECT substr(start_time, 1, 10) AS day, SUM(price), COUNT(*)
                 FROM appointments
                 WHERE barber_id = ?1 AND status = 'completed' AND start_time >= ?2
                 GROUP BY day
                 ORDER BY day",
            )?;
            let rows = stmt
                .query_map(params![barber_id.to_string(), format_timestamp(since)], |row| {
                    Ok(RevenuePoint {
                        day: row.get(0)?,
                        revenue: row.get(1)?,
                        bookings: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Completed bookings grouped by service name, most popular first.
    /// Appointments whose service was deleted are left out.
    pub fn service_distribution(&self, barber_id: Uuid) -> Result<Vec<ServiceShare>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT s.name, COUNT(*) AS value, SUM(a.price)
                 FROM appointments a
                 JOIN services s ON s.id = a.service_id
                 WHERE a.barber_id = ?1 AND a.status = 'completed'
                 GROUP BY s.name
                 ORDER BY value DESC, s.name",
            )?;
            let rows = stmt
                .query_map([barber_id.to_string()], |row| {
                    Ok(ServiceShare {
                        name: row.get(0)?,
                        value: row.get(1)?,
                        revenue: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
