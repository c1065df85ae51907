//! SQLite-backed rent roll store

use super::guard::read_only_statement;
use super::{Comparator, RentRollStore, ThresholdField};
use crate::error::QueryServiceError;
use crate::models::{NewUnitRecord, SummaryStatistics, UnitRecord};
use crate::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::query::Query;
use sqlx::sqlite::{
    Sqlite, SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Column, FromRow, Row, TypeInfo, ValueRef};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Default cap on rows returned by a raw statement
pub const DEFAULT_MAX_RAW_ROWS: usize = 1000;

const CREATE_RENT_ROLL_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS rent_roll (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  unit TEXT NOT NULL UNIQUE,
  name TEXT,
  type TEXT,
  sq_ft INTEGER NOT NULL DEFAULT 0,
  autobill REAL NOT NULL,
  deposit REAL NOT NULL,
  moved_in TEXT,
  lease_ends TEXT,
  status TEXT NOT NULL
);
"#;

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_rent_roll_status ON rent_roll (status);",
    "CREATE INDEX IF NOT EXISTS idx_rent_roll_lease_ends ON rent_roll (lease_ends);",
];

const SELECT_UNITS: &str = "SELECT id, unit, name, type, sq_ft, autobill, deposit, moved_in, lease_ends, status FROM rent_roll";

const SUMMARY_STATISTICS: &str = r#"
SELECT
  COUNT(*) AS total_units,
  COALESCE(SUM(CASE WHEN status = 'O' THEN 1 ELSE 0 END), 0) AS occupied_units,
  COALESCE(SUM(CASE WHEN status IN ('VU', 'VD') THEN 1 ELSE 0 END), 0) AS vacant_units,
  TOTAL(autobill) AS total_potential_rent,
  TOTAL(CASE WHEN status = 'O' THEN autobill ELSE 0 END) AS total_actual_rent,
  AVG(CASE WHEN status = 'O' THEN autobill END) AS avg_occupied_rent
FROM rent_roll
"#;

/// Rent roll store over a SQLite connection pool.
///
/// Cloning is cheap and every clone shares the pool and the schema
/// readiness flag.
#[derive(Clone)]
pub struct SqliteRentRollStore {
    pool: SqlitePool,
    schema_ready: Arc<OnceCell<()>>,
    max_raw_rows: usize,
}

impl SqliteRentRollStore {
    /// Open (or create) the database at `database_url` and wait for the
    /// schema to be in place.
    pub async fn connect(database_url: &str, max_raw_rows: usize) -> Result<Self> {
        let in_memory = is_in_memory(database_url);

        if !in_memory {
            ensure_parent_dir(database_url)?;
        }

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| {
                QueryServiceError::ConfigError(format!(
                    "Invalid DATABASE_URL '{}': {}",
                    database_url, e
                ))
            })?
            .create_if_missing(true);

        // An in-memory database lives only as long as its connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| {
                QueryServiceError::DatabaseError(format!(
                    "Failed to open rent roll database {}: {}",
                    database_url, e
                ))
            })?;

        info!(database_url, in_memory, "Rent roll database connected");

        let store = Self::from_pool(pool, max_raw_rows);
        store.ready().await?;
        Ok(store)
    }

    /// Private in-memory database, mostly for tests and demos.
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:", DEFAULT_MAX_RAW_ROWS).await
    }

    /// Wrap an existing pool. The schema is created lazily on first use.
    pub fn from_pool(pool: SqlitePool, max_raw_rows: usize) -> Self {
        Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
            max_raw_rows: max_raw_rows.max(1),
        }
    }

    /// Close the pool, waiting for connections to shut down.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn is_ready(&self) -> bool {
        self.schema_ready.initialized()
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(CREATE_RENT_ROLL_TABLE)
                    .execute(&self.pool)
                    .await?;

                for statement in CREATE_INDEXES {
                    sqlx::query(statement).execute(&self.pool).await?;
                }

                info!("Rent roll schema and indexes ready");
                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| {
                QueryServiceError::DatabaseError(format!(
                    "Failed to initialize rent roll schema: {}",
                    e
                ))
            })?;

        Ok(())
    }

    async fn fetch_units<'q>(
        &self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Result<Vec<UnitRecord>> {
        self.ensure_schema().await?;

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter()
            .map(UnitRecord::from_row)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(QueryServiceError::from)
    }
}

#[async_trait]
impl RentRollStore for SqliteRentRollStore {
    async fn ready(&self) -> Result<()> {
        self.ensure_schema().await
    }

    async fn insert(&self, record: &NewUnitRecord) -> Result<i64> {
        record.validate()?;
        self.ensure_schema().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO rent_roll (unit, name, type, sq_ft, autobill, deposit, moved_in, lease_ends, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.unit)
        .bind(&record.name)
        .bind(&record.unit_type)
        .bind(record.square_feet)
        .bind(record.billed_amount)
        .bind(record.deposit)
        .bind(&record.moved_in_date)
        .bind(&record.lease_end_date)
        .bind(&record.status)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let duplicate = matches!(
                &e,
                sqlx::Error::Database(db_err) if db_err.is_unique_violation()
            );
            if duplicate {
                QueryServiceError::ConstraintViolation(format!(
                    "unit {} already exists",
                    record.unit
                ))
            } else {
                QueryServiceError::from(e)
            }
        })?;

        let id = result.last_insert_rowid();
        debug!(unit = %record.unit, id, "Inserted rent roll row");
        Ok(id)
    }

    async fn find_all(&self, limit: u32) -> Result<Vec<UnitRecord>> {
        let sql = format!("{} ORDER BY id LIMIT ?", SELECT_UNITS);
        self.fetch_units(sqlx::query(&sql).bind(i64::from(limit)))
            .await
    }

    async fn find_by_status(&self, status: &str) -> Result<Vec<UnitRecord>> {
        let sql = format!("{} WHERE status = ? ORDER BY id", SELECT_UNITS);
        self.fetch_units(sqlx::query(&sql).bind(status)).await
    }

    async fn find_by_unit(&self, unit: &str) -> Result<Vec<UnitRecord>> {
        let sql = format!("{} WHERE unit = ? ORDER BY id", SELECT_UNITS);
        self.fetch_units(sqlx::query(&sql).bind(unit)).await
    }

    async fn find_by_threshold(
        &self,
        field: ThresholdField,
        comparator: Comparator,
        value: f64,
    ) -> Result<Vec<UnitRecord>> {
        let sql = format!(
            "{} WHERE {} {} ? ORDER BY id",
            SELECT_UNITS,
            field.column(),
            comparator.operator()
        );
        self.fetch_units(sqlx::query(&sql).bind(value)).await
    }

    async fn find_lease_expiring_in_year(&self, year: i32) -> Result<Vec<UnitRecord>> {
        let sql = format!(
            "{} WHERE lease_ends IS NOT NULL AND lease_ends LIKE ? ORDER BY id",
            SELECT_UNITS
        );
        let pattern = format!("%/{}%", year);
        self.fetch_units(sqlx::query(&sql).bind(pattern)).await
    }

    async fn summary_statistics(&self) -> Result<SummaryStatistics> {
        self.ensure_schema().await?;

        let stats = sqlx::query_as::<_, SummaryStatistics>(SUMMARY_STATISTICS)
            .fetch_one(&self.pool)
            .await?;
        Ok(stats)
    }

    async fn unit_count(&self) -> Result<i64> {
        self.ensure_schema().await?;

        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM rent_roll")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn execute_raw(&self, sql: &str, params: &[Value]) -> Result<Vec<Value>> {
        let statement = read_only_statement(sql, params.len())?;
        self.ensure_schema().await?;

        debug!(sql = %statement, params = params.len(), "Executing raw SQL");

        // One extra row tells us whether the cap cut anything off.
        let bounded = format!(
            "SELECT * FROM (\n{}\n) LIMIT {}",
            statement,
            self.max_raw_rows + 1
        );

        let mut query = sqlx::query(&bounded);
        for param in params {
            query = bind_json(query, param)?;
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| QueryServiceError::QueryError(e.to_string()))?;

        if rows.len() > self.max_raw_rows {
            warn!(
                max_rows = self.max_raw_rows,
                "Raw SQL result truncated"
            );
        }

        rows.iter()
            .take(self.max_raw_rows)
            .map(row_to_json)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| QueryServiceError::QueryError(e.to_string()))
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

fn ensure_parent_dir(database_url: &str) -> Result<()> {
    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    Ok(())
}

fn bind_json<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> Result<Query<'q, Sqlite, SqliteArguments<'q>>> {
    let query = match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(f) = n.as_f64() {
                query.bind(f)
            } else {
                return Err(QueryServiceError::QueryError(format!(
                    "unsupported numeric parameter {}",
                    n
                )));
            }
        }
        Value::String(s) => query.bind(s.clone()),
        other => {
            return Err(QueryServiceError::QueryError(format!(
                "parameters must be scalars, got {}",
                other
            )))
        }
    };
    Ok(query)
}

fn row_to_json(row: &SqliteRow) -> std::result::Result<Value, sqlx::Error> {
    let mut object = Map::with_capacity(row.columns().len());

    for column in row.columns() {
        let value = column_value(row, column.ordinal())?;
        object.insert(column.name().to_string(), value);
    }

    Ok(Value::Object(object))
}

/// Decode by the value's storage class, since raw statements have no
/// declared result types.
fn column_value(row: &SqliteRow, index: usize) -> std::result::Result<Value, sqlx::Error> {
    let storage_class = {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        raw.type_info().name().to_string()
    };

    let value = match storage_class.as_str() {
        "INTEGER" | "BOOLEAN" => Value::from(row.try_get::<i64, _>(index)?),
        "REAL" | "NUMERIC" => Value::from(row.try_get::<f64, _>(index)?),
        "BLOB" => {
            let bytes = row.try_get::<Vec<u8>, _>(index)?;
            Value::from(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => Value::from(row.try_get::<String, _>(index)?),
    };

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn unit(unit: &str, status: &str, rent: f64, lease_ends: Option<&str>) -> NewUnitRecord {
        NewUnitRecord {
            unit: unit.to_string(),
            name: (status == "O").then(|| format!("Tenant {}", unit)),
            unit_type: Some("1x1.1".to_string()),
            square_feet: 744,
            billed_amount: rent,
            deposit: 500.0,
            moved_in_date: (status == "O").then(|| "09/07/2024".to_string()),
            lease_end_date: lease_ends.map(str::to_string),
            status: status.to_string(),
        }
    }

    async fn seeded_store() -> SqliteRentRollStore {
        let store = SqliteRentRollStore::in_memory().await.unwrap();
        let rows = vec![
            unit("110", "O", 1664.36, Some("06/06/2026")),
            unit("111", "O", 1383.70, Some("08/23/2025")),
            unit("112", "VU", 24.60, None),
            unit("204", "VD", 1450.00, None),
            unit("305", "NR", 1700.00, Some("01/31/2025")),
        ];
        for row in &rows {
            store.insert(row).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_ready_is_idempotent() {
        let store = SqliteRentRollStore::in_memory().await.unwrap();
        assert!(store.is_ready());
        assert_ok!(store.ready().await);

        // A second store over the same pool re-runs CREATE ... IF NOT EXISTS.
        let again = SqliteRentRollStore::from_pool(store.pool.clone(), 10);
        assert!(!again.is_ready());
        assert_ok!(again.ready().await);
        assert!(again.is_ready());
    }

    #[tokio::test]
    async fn test_insert_then_find_by_unit() {
        let store = SqliteRentRollStore::in_memory().await.unwrap();
        let record = unit("110", "O", 1664.36, Some("06/06/2026"));

        let id = store.insert(&record).await.unwrap();
        let found = store.find_by_unit("110").await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
        assert_eq!(found[0].unit, "110");
        assert_eq!(found[0].name.as_deref(), Some("Tenant 110"));
        assert_eq!(found[0].billed_amount, 1664.36);
        assert_eq!(found[0].lease_end_date.as_deref(), Some("06/06/2026"));
        assert!(store.find_by_unit("999").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_unit_is_rejected() {
        let store = seeded_store().await;
        let before = store.unit_count().await.unwrap();

        let err = store
            .insert(&unit("110", "VU", 10.0, None))
            .await
            .unwrap_err();

        assert!(matches!(err, QueryServiceError::ConstraintViolation(_)));
        assert_eq!(store.unit_count().await.unwrap(), before);
        assert_eq!(store.find_by_unit("110").await.unwrap()[0].status, "O");
    }

    #[tokio::test]
    async fn test_invalid_record_is_rejected() {
        let store = SqliteRentRollStore::in_memory().await.unwrap();
        let mut record = unit("120", "O", 900.0, None);
        record.billed_amount = -5.0;

        assert_err!(store.insert(&record).await);
        assert_eq!(store.unit_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_by_status() {
        let store = SqliteRentRollStore::in_memory().await.unwrap();
        store.insert(&unit("1", "VU", 100.0, None)).await.unwrap();
        store.insert(&unit("2", "O", 200.0, None)).await.unwrap();
        store.insert(&unit("3", "VD", 300.0, None)).await.unwrap();

        let vacant = store.find_by_status("VU").await.unwrap();
        assert_eq!(vacant.len(), 1);
        assert_eq!(vacant[0].unit, "1");
    }

    #[tokio::test]
    async fn test_find_by_threshold() {
        let store = seeded_store().await;

        let above = store
            .find_by_threshold(ThresholdField::BilledAmount, Comparator::GreaterThan, 1500.0)
            .await
            .unwrap();
        let units: Vec<_> = above.iter().map(|r| r.unit.as_str()).collect();
        assert_eq!(units, vec!["110", "305"]);

        let below = store
            .find_by_threshold(ThresholdField::BilledAmount, Comparator::LessThan, 1400.0)
            .await
            .unwrap();
        let units: Vec<_> = below.iter().map(|r| r.unit.as_str()).collect();
        assert_eq!(units, vec!["111", "112"]);
    }

    #[tokio::test]
    async fn test_lease_expiring_uses_substring_match() {
        let store = seeded_store().await;

        let expiring = store.find_lease_expiring_in_year(2025).await.unwrap();
        let units: Vec<_> = expiring.iter().map(|r| r.unit.as_str()).collect();
        assert_eq!(units, vec!["111", "305"]);

        assert!(store.find_lease_expiring_in_year(2031).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_summary_statistics() {
        let store = seeded_store().await;
        let stats = store.summary_statistics().await.unwrap();

        assert_eq!(stats.total_units, 5);
        assert_eq!(stats.occupied_units, 2);
        assert_eq!(stats.vacant_units, 2);
        assert!(stats.occupied_units + stats.vacant_units <= stats.total_units);
        assert!((stats.total_potential_rent - 6222.66).abs() < 1e-6);
        assert!((stats.total_actual_rent - 3048.06).abs() < 1e-6);
        assert!((stats.avg_occupied_rent.unwrap() - 1524.03).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_summary_statistics_on_empty_store() {
        let store = SqliteRentRollStore::in_memory().await.unwrap();
        let stats = store.summary_statistics().await.unwrap();

        assert_eq!(stats.total_units, 0);
        assert_eq!(stats.occupied_units, 0);
        assert_eq!(stats.total_potential_rent, 0.0);
        assert_eq!(stats.avg_occupied_rent, None);
    }

    #[tokio::test]
    async fn test_execute_raw_with_params() {
        let store = seeded_store().await;

        let rows = store
            .execute_raw("SELECT * FROM rent_roll WHERE autobill > ?", &[json!(1500)])
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert!(row["autobill"].as_f64().unwrap() > 1500.0);
        }
        assert_eq!(rows[0]["unit"], json!("110"));
        assert_eq!(rows[0]["name"], json!("Tenant 110"));
    }

    #[tokio::test]
    async fn test_execute_raw_aggregates_and_nulls() {
        let store = seeded_store().await;

        let rows = store
            .execute_raw(
                "SELECT COUNT(*) AS total, SUM(CASE WHEN status = 'O' THEN 1 ELSE 0 END) AS occupied FROM rent_roll",
                &[],
            )
            .await
            .unwrap();
        assert_eq!(rows, vec![json!({"total": 5, "occupied": 2})]);

        let rows = store
            .execute_raw("SELECT unit, lease_ends FROM rent_roll WHERE unit = ?", &[json!("112")])
            .await
            .unwrap();
        assert_eq!(rows, vec![json!({"unit": "112", "lease_ends": null})]);
    }

    #[tokio::test]
    async fn test_execute_raw_rejects_writes_and_bad_sql() {
        let store = seeded_store().await;

        let err = store.execute_raw("DELETE FROM rent_roll", &[]).await.unwrap_err();
        assert!(matches!(err, QueryServiceError::QueryError(_)));
        assert_eq!(store.unit_count().await.unwrap(), 5);

        let err = store.execute_raw("SELECT * FROM no_such_table", &[]).await.unwrap_err();
        assert!(matches!(err, QueryServiceError::QueryError(_)));

        let err = store
            .execute_raw("SELECT * FROM rent_roll WHERE unit = ?", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, QueryServiceError::QueryError(_)));
    }

    #[tokio::test]
    async fn test_execute_raw_with_comments() {
        let store = seeded_store().await;

        let rows = store
            .execute_raw("SELECT unit FROM rent_roll -- all rows", &[])
            .await
            .unwrap();
        assert_eq!(rows.len(), 5);

        let rows = store
            .execute_raw(
                "SELECT unit FROM rent_roll WHERE name = ? -- who?",
                &[json!("Tenant 110")],
            )
            .await
            .unwrap();
        assert_eq!(rows, vec![json!({"unit": "110"})]);

        let rows = store
            .execute_raw("/* vacancies */ SELECT unit FROM rent_roll WHERE status = 'VU';", &[])
            .await
            .unwrap();
        assert_eq!(rows, vec![json!({"unit": "112"})]);
    }

    #[tokio::test]
    async fn test_execute_raw_caps_rows() {
        let store = seeded_store().await;
        let capped = SqliteRentRollStore::from_pool(store.pool.clone(), 2);

        let rows = capped.execute_raw("SELECT unit FROM rent_roll", &[]).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_reads() {
        let store = seeded_store().await;

        let (occupied, vacant, stats) = tokio::join!(
            store.find_by_status("O"),
            store.find_by_status("VU"),
            store.summary_statistics(),
        );

        assert_eq!(occupied.unwrap().len(), 2);
        assert_eq!(vacant.unwrap().len(), 1);
        assert_eq!(stats.unwrap().total_units, 5);
    }

    #[tokio::test]
    async fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}/nested/rent_roll.db", dir.path().display());

        {
            let store = SqliteRentRollStore::connect(&url, 100).await.unwrap();
            store.insert(&unit("110", "O", 1664.36, None)).await.unwrap();
            store.close().await;
        }

        let reopened = SqliteRentRollStore::connect(&url, 100).await.unwrap();
        assert_eq!(reopened.unit_count().await.unwrap(), 1);
    }
}
