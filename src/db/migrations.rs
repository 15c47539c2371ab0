use crate::db::Database;
use crate::error::Result;

const MIGRATIONS: &[&str] = &[
    // Migration 1: Initial schema
    r#"
    CREATE TABLE IF NOT EXISTS plots (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        country_code TEXT NOT NULL DEFAULT 'SV',
        latitude REAL,
        longitude REAL,
        owner_email TEXT NOT NULL,
        owner_name TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS alerts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        plot_id INTEGER NOT NULL REFERENCES plots(id) ON DELETE CASCADE,
        alert_type TEXT NOT NULL DEFAULT 'general',
        message TEXT NOT NULL,
        created_at TEXT NOT NULL,
        notified INTEGER NOT NULL DEFAULT 0,
        resolved INTEGER NOT NULL DEFAULT 0,
        user_response TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS weather_records (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        plot_id INTEGER NOT NULL REFERENCES plots(id) ON DELETE CASCADE,
        timestamp TEXT NOT NULL,
        temperature_c REAL,
        humidity_percent REAL,
        rain_mm REAL,
        wind_ms REAL,
        category TEXT,
        recommendation TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS schema_migrations (
        version INTEGER PRIMARY KEY,
        applied_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    "#,
    // Migration 2: Add indexes
    r#"
    CREATE INDEX IF NOT EXISTS idx_alerts_plot_open
        ON alerts(plot_id, resolved, created_at);
    CREATE INDEX IF NOT EXISTS idx_weather_records_plot_timestamp
        ON weather_records(plot_id, timestamp);
    "#,
];

pub fn count() -> usize {
    MIGRATIONS.len()
}

pub fn run(db: &Database) -> Result<()> {
    db.with_conn_mut(|conn| {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            let version = (i + 1) as i32;
            if version > current_version {
                tracing::info!("Applying migration {}", version);
                let tx = conn.transaction()?;
                tx.execute_batch(migration)?;
                tx.execute(
                    "INSERT INTO schema_migrations (version) VALUES (?1)",
                    [version],
                )?;
                tx.commit()?;
            }
        }

        Ok(())
    })
}
