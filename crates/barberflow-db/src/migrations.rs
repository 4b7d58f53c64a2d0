use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                      TEXT PRIMARY KEY,
                name                    TEXT NOT NULL,
                email                   TEXT NOT NULL UNIQUE,
                password                TEXT NOT NULL,
                role                    TEXT NOT NULL DEFAULT 'BARBER',
                barber_shop             TEXT,
                status                  TEXT NOT NULL DEFAULT 'active',
                stripe_customer_id      TEXT,
                subscription_status     TEXT NOT NULL DEFAULT 'none',
                plan                    TEXT NOT NULL DEFAULT 'free',
                password_reset_token    TEXT,
                password_reset_expires  TEXT,
                created_at              TEXT NOT NULL,
                updated_at              TEXT NOT NULL
            );

            CREATE INDEX idx_users_stripe_customer ON users(stripe_customer_id);
            CREATE INDEX idx_users_reset_token ON users(password_reset_token);

            CREATE TABLE services (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                description TEXT,
                duration    INTEGER NOT NULL,
                price       REAL NOT NULL,
                category    TEXT NOT NULL DEFAULT 'General',
                is_active   INTEGER NOT NULL DEFAULT 1,
                barber_id   TEXT NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_services_barber ON services(barber_id);

            CREATE TABLE clients (
                id              TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                email           TEXT NOT NULL,
                phone           TEXT,
                shop_id         TEXT NOT NULL REFERENCES users(id),
                total_bookings  INTEGER NOT NULL DEFAULT 0,
                total_spent     REAL NOT NULL DEFAULT 0,
                last_visit      TEXT,
                notes           TEXT,
                status          TEXT NOT NULL DEFAULT 'active',
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL,
                UNIQUE(shop_id, email)
            );

            -- service_id carries no FK: deleting a service keeps its booking history
            CREATE TABLE appointments (
                id              TEXT PRIMARY KEY,
                client_name     TEXT NOT NULL,
                client_email    TEXT NOT NULL,
                service_id      TEXT NOT NULL,
                barber_id       TEXT NOT NULL REFERENCES users(id),
                start_time      TEXT NOT NULL,
                end_time        TEXT NOT NULL,
                status          TEXT NOT NULL DEFAULT 'confirmed',
                price           REAL NOT NULL,
                notes           TEXT,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_appointments_slot
                ON appointments(barber_id, start_time, end_time);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
