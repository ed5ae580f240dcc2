// Instrument registry stored in a single-file SQLite database

use std::path::Path;

use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension, Row};

use calcert_core::tag::registry_key;
use calcert_core::{InstrumentRecord, Numeric};
use calcert_recon::{GatewayError, RegistryGateway};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS instruments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tag TEXT NOT NULL,
    serial_instrument TEXT,
    serial_sensor TEXT,
    min_range REAL,      -- legacy rows may hold TEXT
    max_range REAL
);
"#;

const COLUMNS: &str = "tag, serial_instrument, serial_sensor, min_range, max_range";

pub struct SqliteRegistry {
    conn: Connection,
}

fn backend(e: rusqlite::Error) -> GatewayError {
    GatewayError::Backend(e.to_string())
}

impl SqliteRegistry {
    /// Open (creating if needed) the registry at `path`.
    pub fn open(path: &Path) -> Result<Self, GatewayError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| GatewayError::Backend(format!("{}: {e}", parent.display())))?;
        }
        let conn = Connection::open(path).map_err(backend)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, GatewayError> {
        Self::with_connection(Connection::open_in_memory().map_err(backend)?)
    }

    fn with_connection(conn: Connection) -> Result<Self, GatewayError> {
        conn.execute_batch(SCHEMA).map_err(backend)?;
        Ok(Self { conn })
    }

    /// All records, in insertion order.
    pub fn list(&self) -> Result<Vec<InstrumentRecord>, GatewayError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {COLUMNS} FROM instruments ORDER BY id"))
            .map_err(backend)?;
        let rows = stmt.query_map([], record_from_row).map_err(backend)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(backend)
    }

    /// Replace the record with `record.tag`, or insert it.
    pub fn upsert(&mut self, record: &InstrumentRecord) -> Result<(), GatewayError> {
        let changed = self
            .conn
            .execute(
                "UPDATE instruments
                 SET serial_instrument = ?1, serial_sensor = ?2, min_range = ?3, max_range = ?4
                 WHERE UPPER(TRIM(tag)) = ?5",
                params![
                    record.serial_instrument,
                    record.serial_sensor,
                    sql_value(&record.min_range),
                    sql_value(&record.max_range),
                    registry_key(&record.tag),
                ],
            )
            .map_err(backend)?;
        if changed == 0 {
            self.insert(record)?;
        }
        Ok(())
    }

    fn query_one(&self, filter: &str, key: &str) -> Result<Option<InstrumentRecord>, GatewayError> {
        self.conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM instruments WHERE {filter} ORDER BY id LIMIT 1"),
                params![key],
                record_from_row,
            )
            .optional()
            .map_err(backend)
    }

    fn update(&mut self, sql: &str, value: &str, key: (&'static str, &str)) -> Result<(), GatewayError> {
        let changed = self.conn.execute(sql, params![value, key.1]).map_err(backend)?;
        if changed == 0 {
            return Err(GatewayError::NotFound {
                key: key.0,
                value: key.1.to_string(),
            });
        }
        Ok(())
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<InstrumentRecord> {
    Ok(InstrumentRecord {
        tag: row.get(0)?,
        serial_instrument: row.get(1)?,
        serial_sensor: row.get(2)?,
        min_range: numeric(row.get(3)?),
        max_range: numeric(row.get(4)?),
    })
}

/// Range columns are dynamically typed: numbers pass through, text is kept
/// verbatim for the range rule to normalize.
fn numeric(value: Value) -> Option<Numeric> {
    match value {
        Value::Null | Value::Blob(_) => None,
        Value::Integer(i) => Some(Numeric::Value(i as f64)),
        Value::Real(f) => Some(Numeric::Value(f)),
        Value::Text(s) => Some(Numeric::Text(s)),
    }
}

fn sql_value(value: &Option<Numeric>) -> Value {
    match value {
        None => Value::Null,
        Some(Numeric::Value(v)) => Value::Real(*v),
        Some(Numeric::Text(s)) => Value::Text(s.clone()),
    }
}

impl RegistryGateway for SqliteRegistry {
    fn find_by_tag(&self, tag: &str) -> Result<Option<InstrumentRecord>, GatewayError> {
        self.query_one("UPPER(TRIM(tag)) = ?1", &registry_key(tag))
    }

    fn find_by_instrument_serial(
        &self,
        serial: &str,
    ) -> Result<Option<InstrumentRecord>, GatewayError> {
        self.query_one("TRIM(serial_instrument) = ?1", serial.trim())
    }

    fn insert(&mut self, record: &InstrumentRecord) -> Result<(), GatewayError> {
        self.conn
            .execute(
                &format!("INSERT INTO instruments ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
                params![
                    record.tag,
                    record.serial_instrument,
                    record.serial_sensor,
                    sql_value(&record.min_range),
                    sql_value(&record.max_range),
                ],
            )
            .map_err(backend)?;
        Ok(())
    }

    fn update_instrument_serial(&mut self, tag: &str, serial: &str) -> Result<(), GatewayError> {
        self.update(
            "UPDATE instruments SET serial_instrument = ?1 WHERE UPPER(TRIM(tag)) = ?2",
            serial,
            ("tag", &registry_key(tag)),
        )
    }

    fn update_sensor_serial(&mut self, tag: &str, serial: &str) -> Result<(), GatewayError> {
        self.update(
            "UPDATE instruments SET serial_sensor = ?1 WHERE UPPER(TRIM(tag)) = ?2",
            serial,
            ("tag", &registry_key(tag)),
        )
    }

    fn update_tag(&mut self, serial: &str, new_tag: &str) -> Result<(), GatewayError> {
        self.update(
            "UPDATE instruments SET tag = ?1 WHERE TRIM(serial_instrument) = ?2",
            new_tag,
            ("serial", serial.trim()),
        )
    }

    fn update_range(&mut self, tag: &str, min: f64, max: f64) -> Result<(), GatewayError> {
        let key = registry_key(tag);
        let changed = self
            .conn
            .execute(
                "UPDATE instruments SET min_range = ?1, max_range = ?2 WHERE UPPER(TRIM(tag)) = ?3",
                params![min, max, key],
            )
            .map_err(backend)?;
        if changed == 0 {
            return Err(GatewayError::NotFound { key: "tag", value: key });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(tag: &str, serial: &str) -> InstrumentRecord {
        InstrumentRecord {
            tag: tag.into(),
            serial_instrument: Some(serial.into()),
            serial_sensor: None,
            min_range: Some(Numeric::Value(0.0)),
            max_range: Some(Numeric::Value(10.0)),
        }
    }

    #[test]
    fn insert_and_lookup() {
        let mut reg = SqliteRegistry::open_in_memory().unwrap();
        reg.insert(&record("FIT-100-PT", "SN1")).unwrap();

        let by_tag = reg.find_by_tag("fit-100-pt ").unwrap().unwrap();
        assert_eq!(by_tag.serial_instrument.as_deref(), Some("SN1"));
        assert_eq!(by_tag.max_range, Some(Numeric::Value(10.0)));
        assert!(reg.find_by_instrument_serial("SN1").unwrap().is_some());
        assert!(reg.find_by_tag("FIT-999-PT").unwrap().is_none());
    }

    #[test]
    fn legacy_text_range_is_preserved() {
        let reg = SqliteRegistry::open_in_memory().unwrap();
        reg.conn
            .execute(
                "INSERT INTO instruments (tag, serial_instrument, min_range, max_range) VALUES ('TT-1-A', 'X1', '0', '150,0')",
                [],
            )
            .unwrap();
        let rec = reg.find_by_tag("TT-1-A").unwrap().unwrap();
        // SQLite REAL affinity converts '0' but keeps the comma form as text.
        assert_eq!(rec.min_range.and_then(|n| n.to_f64()), Some(0.0));
        assert_eq!(rec.max_range, Some(Numeric::Text("150,0".into())));
    }

    #[test]
    fn mutators_touch_one_row() {
        let mut reg = SqliteRegistry::open_in_memory().unwrap();
        reg.insert(&record("FIT-100-PT", "SN1")).unwrap();
        reg.insert(&record("TT-200-A", "SN2")).unwrap();

        reg.update_instrument_serial("FIT-100-PT", "SN1B").unwrap();
        reg.update_sensor_serial("FIT-100-PT", "SENS").unwrap();
        reg.update_range("FIT-100-PT", 5.0, 15.0).unwrap();
        reg.update_tag("SN2", "TT-200-B").unwrap();

        let all = reg.list().unwrap();
        assert_eq!(all[0].serial_instrument.as_deref(), Some("SN1B"));
        assert_eq!(all[0].serial_sensor.as_deref(), Some("SENS"));
        assert_eq!(all[0].min_range, Some(Numeric::Value(5.0)));
        assert_eq!(all[1].tag, "TT-200-B");
        assert_eq!(all[1].serial_instrument.as_deref(), Some("SN2"));
    }

    #[test]
    fn missing_rows_are_not_found() {
        let mut reg = SqliteRegistry::open_in_memory().unwrap();
        assert!(matches!(
            reg.update_range("NOPE-1", 0.0, 1.0),
            Err(GatewayError::NotFound { key: "tag", .. })
        ));
        assert!(matches!(
            reg.update_tag("SN0", "X-1"),
            Err(GatewayError::NotFound { key: "serial", .. })
        ));
    }

    #[test]
    fn upsert_replaces_existing() {
        let mut reg = SqliteRegistry::open_in_memory().unwrap();
        reg.upsert(&record("PIT-1-A", "A")).unwrap();
        reg.upsert(&record("pit-1-a", "B")).unwrap();
        let all = reg.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].serial_instrument.as_deref(), Some("B"));
    }

    #[test]
    fn persists_across_connections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("registry.db");
        {
            let mut reg = SqliteRegistry::open(&path).unwrap();
            reg.insert(&record("DPT-5-A", "SN5")).unwrap();
        }
        let reg = SqliteRegistry::open(&path).unwrap();
        assert_eq!(reg.list().unwrap().len(), 1);
    }
}
