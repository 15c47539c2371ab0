use crate::db::Database;
use crate::error::{AgroError, Result};
use crate::models::{
    AlertDecision, AlertRecord, AlertType, Plot, RecommendationCategory, WeatherRecord,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, params_from_iter, Connection, Row, TransactionBehavior};
use tracing::warn;

// Timestamps are written with a fixed width so TEXT ordering matches time ordering.
fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(value: &str, column: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| {
            warn!(column, value, "Unparseable timestamp in database, using now");
            Utc::now()
        })
}

// Plot Queries

impl Database {
    pub fn create_plot(&self, plot: &Plot) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO plots
                    (name, description, country_code, latitude, longitude, owner_email, owner_name, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    plot.name,
                    plot.description,
                    plot.country_code,
                    plot.latitude,
                    plot.longitude,
                    plot.owner_email,
                    plot.owner_name,
                    ts(&plot.created_at),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_plot(&self, id: i64) -> Result<Option<Plot>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT * FROM plots WHERE id = ?1", [id], row_to_plot)
                .optional()
                .map_err(Into::into)
        })
    }

    pub fn require_plot(&self, id: i64) -> Result<Plot> {
        self.get_plot(id)?
            .ok_or_else(|| AgroError::NotFound(format!("plot {}", id)))
    }

    pub fn list_plots(&self) -> Result<Vec<Plot>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM plots ORDER BY id")?;
            let plots = stmt
                .query_map([], row_to_plot)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(plots)
        })
    }

    /// Delete a plot together with its alerts and weather history.
    pub fn delete_plot(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM plots WHERE id = ?1", [id])?;
            Ok(removed > 0)
        })
    }
}

fn row_to_plot(row: &Row) -> rusqlite::Result<Plot> {
    let created_at_str: String = row.get("created_at")?;

    Ok(Plot {
        id: Some(row.get("id")?),
        name: row.get("name")?,
        description: row.get("description")?,
        country_code: row.get("country_code")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        owner_email: row.get("owner_email")?,
        owner_name: row.get("owner_name")?,
        created_at: parse_ts(&created_at_str, "plots.created_at"),
    })
}

// Alert Queries

impl Database {
    pub fn insert_alert(&self, alert: &AlertRecord) -> Result<i64> {
        self.with_conn(|conn| insert_alert(conn, alert))
    }

    pub fn get_alert(&self, id: i64) -> Result<Option<AlertRecord>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT * FROM alerts WHERE id = ?1", [id], row_to_alert)
                .optional()
                .map_err(Into::into)
        })
    }

    /// Most recent unresolved alert for the plot whose type is in `types`.
    pub fn latest_open_alert(
        &self,
        plot_id: i64,
        types: &[AlertType],
    ) -> Result<Option<AlertRecord>> {
        self.with_conn(|conn| latest_open_alert(conn, plot_id, types))
    }

    pub fn update_alert(&self, alert: &AlertRecord) -> Result<()> {
        let id = alert
            .id
            .ok_or_else(|| AgroError::InvalidData("Alert has no ID".into()))?;

        self.with_conn(|conn| {
            let updated = conn.execute(
                r#"
                UPDATE alerts SET
                    alert_type = ?1, message = ?2, notified = ?3, resolved = ?4, user_response = ?5
                WHERE id = ?6
                "#,
                params![
                    alert.alert_type.as_str(),
                    alert.message,
                    alert.notified,
                    alert.resolved,
                    alert.user_response,
                    id,
                ],
            )?;
            if updated == 0 {
                return Err(AgroError::NotFound(format!("alert {}", id)));
            }
            Ok(())
        })
    }

    pub fn mark_alert_notified(&self, id: i64, notified: bool) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE alerts SET notified = ?1 WHERE id = ?2",
                params![notified, id],
            )?;
            Ok(())
        })
    }

    /// Alerts newest first, optionally narrowed to one plot and to open ones.
    pub fn list_alerts(&self, plot_id: Option<i64>, open_only: bool) -> Result<Vec<AlertRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT * FROM alerts
                WHERE (?1 IS NULL OR plot_id = ?1)
                  AND (?2 = 0 OR resolved = 0)
                ORDER BY created_at DESC, id DESC
                "#,
            )?;
            let alerts = stmt
                .query_map(params![plot_id, open_only], row_to_alert)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(alerts)
        })
    }

    /// Read the plot's latest open alert within `types`, let `decide` judge it
    /// and insert the alert it asks for, all in one transaction.
    pub fn apply_alert_decision<F>(
        &self,
        plot_id: i64,
        types: &[AlertType],
        notified: bool,
        decide: F,
    ) -> Result<(AlertDecision, Option<AlertRecord>)>
    where
        F: FnOnce(Option<&AlertRecord>) -> AlertDecision,
    {
        self.with_conn_mut(|conn| {
            // IMMEDIATE takes the write lock before the read, so another
            // process cannot slip an insert in between.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let latest = latest_open_alert(&tx, plot_id, types)?;
            let decision = decide(latest.as_ref());

            let created = match &decision {
                AlertDecision::NoAction => None,
                AlertDecision::CreateAlert {
                    alert_type,
                    message,
                } => {
                    let mut alert = AlertRecord::new(plot_id, *alert_type, message.clone())
                        .with_notified(notified);
                    alert.id = Some(insert_alert(&tx, &alert)?);
                    Some(alert)
                }
            };

            tx.commit()?;
            Ok((decision, created))
        })
    }

    /// Resolve the plot's newest open alert of any type with `response`, or
    /// record a resolved general alert carrying `fallback_message` when none
    /// is open.
    pub fn resolve_latest_or_insert(
        &self,
        plot_id: i64,
        response: &str,
        fallback_message: &str,
    ) -> Result<AlertRecord> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let alert = match latest_open_alert(&tx, plot_id, AlertType::all())? {
                Some(mut alert) => {
                    alert.resolve(response);
                    tx.execute(
                        "UPDATE alerts SET resolved = 1, user_response = ?1 WHERE id = ?2",
                        params![alert.user_response, alert.id],
                    )?;
                    alert
                }
                None => {
                    let mut alert = AlertRecord::new(plot_id, AlertType::General, fallback_message);
                    alert.resolve(response);
                    alert.id = Some(insert_alert(&tx, &alert)?);
                    alert
                }
            };
            tx.commit()?;
            Ok(alert)
        })
    }
}

fn insert_alert(conn: &Connection, alert: &AlertRecord) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO alerts
            (plot_id, alert_type, message, created_at, notified, resolved, user_response)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            alert.plot_id,
            alert.alert_type.as_str(),
            alert.message,
            ts(&alert.created_at),
            alert.notified,
            alert.resolved,
            alert.user_response,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn latest_open_alert(
    conn: &Connection,
    plot_id: i64,
    types: &[AlertType],
) -> Result<Option<AlertRecord>> {
    if types.is_empty() {
        return Ok(None);
    }

    let placeholders = vec!["?"; types.len()].join(", ");
    let sql = format!(
        "SELECT * FROM alerts WHERE plot_id = ? AND resolved = 0 AND alert_type IN ({}) \
         ORDER BY created_at DESC, id DESC LIMIT 1",
        placeholders
    );

    let mut values: Vec<rusqlite::types::Value> = Vec::with_capacity(types.len() + 1);
    values.push(plot_id.into());
    values.extend(types.iter().map(|t| t.as_str().to_string().into()));

    conn.query_row(&sql, params_from_iter(values), row_to_alert)
        .optional()
        .map_err(Into::into)
}

fn row_to_alert(row: &Row) -> rusqlite::Result<AlertRecord> {
    let alert_type_str: String = row.get("alert_type")?;
    let created_at_str: String = row.get("created_at")?;

    let alert_type = AlertType::from_str(&alert_type_str).unwrap_or_else(|| {
        warn!(
            alert_type = %alert_type_str,
            "Unknown alert_type in database, defaulting to general"
        );
        AlertType::General
    });

    Ok(AlertRecord {
        id: Some(row.get("id")?),
        plot_id: row.get("plot_id")?,
        alert_type,
        message: row.get("message")?,
        created_at: parse_ts(&created_at_str, "alerts.created_at"),
        notified: row.get("notified")?,
        resolved: row.get("resolved")?,
        user_response: row.get("user_response")?,
    })
}

// Weather History Queries

impl Database {
    pub fn insert_weather_record(&self, record: &WeatherRecord) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO weather_records
                    (plot_id, timestamp, temperature_c, humidity_percent, rain_mm, wind_ms,
                     category, recommendation)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    record.plot_id,
                    ts(&record.timestamp),
                    record.temperature_c,
                    record.humidity_percent,
                    record.rain_mm,
                    record.wind_ms,
                    record.category.map(|c| c.as_str()),
                    record.recommendation,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn recent_weather_records(&self, plot_id: i64, limit: usize) -> Result<Vec<WeatherRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM weather_records WHERE plot_id = ?1 \
                 ORDER BY timestamp DESC, id DESC LIMIT ?2",
            )?;
            let records = stmt
                .query_map(params![plot_id, limit as i64], row_to_weather_record)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
    }
}

fn row_to_weather_record(row: &Row) -> rusqlite::Result<WeatherRecord> {
    let timestamp_str: String = row.get("timestamp")?;
    let category_str: Option<String> = row.get("category")?;

    let category = category_str.as_ref().and_then(|c| {
        RecommendationCategory::from_str(c).or_else(|| {
            warn!(category = %c, "Unknown recommendation category in database, ignoring");
            None
        })
    });

    Ok(WeatherRecord {
        id: Some(row.get("id")?),
        plot_id: row.get("plot_id")?,
        timestamp: parse_ts(&timestamp_str, "weather_records.timestamp"),
        temperature_c: row.get("temperature_c")?,
        humidity_percent: row.get("humidity_percent")?,
        rain_mm: row.get("rain_mm")?,
        wind_ms: row.get("wind_ms")?,
        category,
        recommendation: row.get("recommendation")?,
    })
}

trait OptionalExt<T> {
    fn optional(self) -> rusqlite::Result<Option<T>>;
}

impl<T> OptionalExt<T> for rusqlite::Result<T> {
    fn optional(self) -> rusqlite::Result<Option<T>> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
