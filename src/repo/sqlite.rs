use crate::models::api::QueryResult;
use crate::models::error::{AuditError, Result};
use crate::models::log_code::default_log_codes;
use crate::models::query_payload::{Condition, QueryPayload, SortDirection};
use crate::models::severity::Severity;
use crate::repo::storage::{StorageClient, LOG_CODES_TABLE, LOG_TABLE};
use log::{debug, info};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{Type, Value as SqlValue, ValueRef};
use rusqlite::Row;
use serde_json::{Map, Value};

type DbPool = Pool<SqliteConnectionManager>;

/// Timestamp layout of the `ts` column, e.g. `2018-01-30 18:39:48.796263+05:30`
const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f%:z";

pub fn is_in_memory(db_file: &str) -> bool {
    db_file == ":memory:" || db_file.starts_with("file::memory:")
}

/// Tables the storage service is willing to read
#[derive(Debug, Clone, Copy, PartialEq)]
enum Table {
    LogCodes,
    Log,
}

impl Table {
    fn parse(name: &str) -> Result<Table> {
        match name {
            LOG_CODES_TABLE => Ok(Table::LogCodes),
            LOG_TABLE => Ok(Table::Log),
            other => Err(AuditError::UnknownTable(other.to_string())),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Table::LogCodes => LOG_CODES_TABLE,
            Table::Log => LOG_TABLE,
        }
    }

    fn columns(self) -> &'static [&'static str] {
        match self {
            Table::LogCodes => &["code", "description"],
            Table::Log => &["id", "code", "level", "log", "ts"],
        }
    }

    /// Columns whose TEXT content is itself JSON
    fn is_json_column(self, column: &str) -> bool {
        self == Table::Log && column == "log"
    }

    fn select_list(self) -> String {
        self.columns()
            .iter()
            .map(|column| format!("\"{}\"", column))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Audit storage backed by a pooled SQLite database
pub struct SqliteStorage {
    pool: DbPool,
}

impl SqliteStorage {
    pub fn open(db_file: &str) -> Result<Self> {
        if db_file.is_empty() {
            return Err(AuditError::DatabasePool(
                "Database file path cannot be empty. Provide a valid path or use ':memory:' for in-memory database.".to_string()
            ));
        }

        info!("Initializing database connection pool: {}", db_file);

        let in_memory = is_in_memory(db_file);
        let use_wal = !in_memory;

        let manager = SqliteConnectionManager::file(db_file).with_init(move |conn| {
            let mut pragmas = String::from(
                "PRAGMA busy_timeout = 5000;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;",
            );

            if use_wal {
                pragmas.push_str(" PRAGMA journal_mode = WAL;");
            }

            conn.execute_batch(&pragmas)
        });

        // An in-memory database lives and dies with its connection, so the pool
        // holds exactly one and never recycles it
        let mut builder = Pool::<SqliteConnectionManager>::builder();
        let pool_size = if in_memory {
            builder = builder.max_lifetime(None).idle_timeout(None);
            1
        } else {
            num_cpus::get_physical() + 7
        };
        let pool = builder
            .max_size(pool_size as u32)
            .build(manager)
            .map_err(|e| {
                AuditError::DatabasePool(format!("Failed to create database connection pool: {}", e))
            })?;

        info!("Database pool created with {} connections", pool_size);
        Ok(Self { pool })
    }

    fn get_connection(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| {
            AuditError::DatabasePool(format!(
                "Failed to get database connection from pool: {}",
                e
            ))
        })
    }

    pub fn setup_database(&self, seed_log_codes: bool) -> Result<()> {
        info!("Initializing database schema");
        let setup_queries = "BEGIN;
        PRAGMA ENCODING = 'UTF-8';

        CREATE TABLE IF NOT EXISTS log_codes(
            code          TEXT    not null
                constraint log_codes_pk
                    primary key,
            description   TEXT    not null);

        CREATE TABLE IF NOT EXISTS log(
            id            integer not null
                constraint log_pk
                    primary key autoincrement,
            code          TEXT    not null
                constraint log_log_codes_fk
                    references log_codes,
            level         integer not null,
            log           TEXT,
            ts            TEXT    not null,
            constraint log_level_check
                check (level BETWEEN 1 AND 4));

        CREATE INDEX IF NOT EXISTS log_ts_index
                on log (ts DESC);

        CREATE INDEX IF NOT EXISTS log_code_ts_index
                on log (code, ts DESC);

        COMMIT;";

        let mut conn = self.get_connection()?;
        conn.execute_batch(setup_queries)
            .map_err(|cause| AuditError::DatabaseQuery {
                operation: "create tables".to_string(),
                cause,
            })?;

        if seed_log_codes {
            let tx = conn
                .transaction()
                .map_err(|cause| AuditError::DatabaseQuery {
                    operation: "begin log code seeding".to_string(),
                    cause,
                })?;
            let log_codes = default_log_codes();
            for log_code in &log_codes {
                tx.execute(
                    "INSERT OR IGNORE INTO log_codes (code, description) VALUES (?1, ?2)",
                    (&log_code.code, &log_code.description),
                )
                .map_err(|cause| AuditError::DatabaseInsert {
                    table: LOG_CODES_TABLE.to_string(),
                    cause,
                })?;
            }
            tx.commit().map_err(|cause| AuditError::DatabaseQuery {
                operation: "commit log code seeding".to_string(),
                cause,
            })?;
            debug!("Seeded {} log codes", log_codes.len());
        }

        info!("Database schema initialized successfully");
        Ok(())
    }

    /// Record an audit entry stamped with the current local time
    pub fn insert_audit_entry(&self, code: &str, severity: Severity, log: &Value) -> Result<i64> {
        let ts = chrono::Local::now().format(TS_FORMAT).to_string();
        self.insert_audit_entry_at(code, severity, log, &ts)
    }

    pub fn insert_audit_entry_at(
        &self,
        code: &str,
        severity: Severity,
        log: &Value,
        ts: &str,
    ) -> Result<i64> {
        let conn = self.get_connection()?;
        let id = conn
            .query_row(
                "INSERT INTO log (code, level, log, ts) VALUES (?1, ?2, ?3, ?4) RETURNING id",
                (code, severity.index(), log.to_string(), ts),
                |row| row.get(0),
            )
            .map_err(|cause| AuditError::DatabaseInsert {
                table: LOG_TABLE.to_string(),
                cause,
            })?;

        debug!("Inserted {} audit entry {} ({})", severity, id, code);
        Ok(id)
    }

    fn run_select(
        &self,
        table: Table,
        sql: &str,
        params: &[SqlValue],
        with_count: bool,
    ) -> Result<QueryResult> {
        debug!("Storage query: {} {:?}", sql, params);
        let operation = format!("select from {}", table.name());
        let conn = self.get_connection()?;

        let mut stmt = conn
            .prepare(sql)
            .map_err(|cause| AuditError::DatabaseQuery {
                operation: operation.clone(),
                cause,
            })?;

        let rows = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                row_to_json(table, row, with_count)
            })
            .map_err(|cause| AuditError::DatabaseQuery {
                operation: operation.clone(),
                cause,
            })?;

        let rows = rows
            .collect::<rusqlite::Result<Vec<Value>>>()
            .map_err(|cause| AuditError::DatabaseQuery { operation, cause })?;

        Ok(QueryResult { rows })
    }
}

impl StorageClient for SqliteStorage {
    fn query_tbl(&self, table: &str) -> Result<QueryResult> {
        let table = Table::parse(table)?;
        let sql = format!(
            "SELECT {} FROM \"{}\" ORDER BY rowid",
            table.select_list(),
            table.name()
        );
        self.run_select(table, &sql, &[], false)
    }

    fn query_tbl_with_payload(&self, table: &str, payload: &str) -> Result<QueryResult> {
        let table = Table::parse(table)?;
        let payload: QueryPayload = serde_json::from_str(payload)
            .map_err(|e| AuditError::InvalidPayload(e.to_string()))?;
        let (sql, params) = build_select(table, &payload)?;
        self.run_select(table, &sql, &params, true)
    }
}

/// Render a payload into parameterised SQL. Every row carries `count`, the
/// number of rows matching the filter before LIMIT/OFFSET apply.
fn build_select(table: Table, payload: &QueryPayload) -> Result<(String, Vec<SqlValue>)> {
    let mut sql = format!(
        "SELECT {}, COUNT(*) OVER () AS \"count\" FROM \"{}\" WHERE ",
        table.select_list(),
        table.name()
    );
    let mut params = Vec::new();

    render_condition(table, &payload.filter, &mut sql, &mut params)?;

    if let Some(sort) = &payload.sort {
        let column = known_column(table, &sort.column)?;
        let direction = match sort.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        sql.push_str(&format!(" ORDER BY \"{}\" {}", column, direction));
    }

    match (payload.limit, payload.skip) {
        (Some(limit), skip) => {
            sql.push_str(" LIMIT ?");
            params.push(SqlValue::Integer(to_i64(limit, "limit")?));
            if let Some(skip) = skip {
                sql.push_str(" OFFSET ?");
                params.push(SqlValue::Integer(to_i64(skip, "skip")?));
            }
        }
        (None, Some(skip)) => {
            sql.push_str(" LIMIT -1 OFFSET ?");
            params.push(SqlValue::Integer(to_i64(skip, "skip")?));
        }
        (None, None) => {}
    }

    Ok((sql, params))
}

fn render_condition(
    table: Table,
    condition: &Condition,
    sql: &mut String,
    params: &mut Vec<SqlValue>,
) -> Result<()> {
    let operator = sql_operator(&condition.condition)?;

    // Numeric "columns" such as the `1 = 1` base clause are compared as text
    if is_numeric_literal(&condition.column) {
        sql.push_str(&format!("'{}' {} ?", condition.column, operator));
        params.push(SqlValue::Text(match &condition.value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }));
    } else {
        let column = known_column(table, &condition.column)?;
        sql.push_str(&format!("\"{}\" {} ?", column, operator));
        params.push(to_sql_value(&condition.value)?);
    }

    if let Some(and) = &condition.and {
        sql.push_str(" AND (");
        render_condition(table, and, sql, params)?;
        sql.push(')');
    }
    if let Some(or) = &condition.or {
        sql.push_str(" OR (");
        render_condition(table, or, sql, params)?;
        sql.push(')');
    }

    Ok(())
}

fn sql_operator(condition: &str) -> Result<&'static str> {
    match condition.to_ascii_lowercase().as_str() {
        "=" => Ok("="),
        "!=" => Ok("!="),
        "<>" => Ok("<>"),
        "<" => Ok("<"),
        ">" => Ok(">"),
        "<=" => Ok("<="),
        ">=" => Ok(">="),
        "like" => Ok("LIKE"),
        other => Err(AuditError::InvalidPayload(format!(
            "unsupported condition '{}'",
            other
        ))),
    }
}

fn known_column<'a>(table: Table, column: &'a str) -> Result<&'a str> {
    if table.columns().contains(&column) {
        Ok(column)
    } else {
        Err(AuditError::InvalidPayload(format!(
            "unknown column '{}' for table {}",
            column,
            table.name()
        )))
    }
}

fn is_numeric_literal(column: &str) -> bool {
    !column.is_empty() && column.bytes().all(|b| b.is_ascii_digit())
}

fn to_sql_value(value: &Value) -> Result<SqlValue> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(flag) => Ok(SqlValue::Integer(i64::from(*flag))),
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                Ok(SqlValue::Integer(integer))
            } else if let Some(real) = number.as_f64() {
                Ok(SqlValue::Real(real))
            } else {
                Err(AuditError::InvalidPayload(format!(
                    "number out of range: {}",
                    number
                )))
            }
        }
        Value::String(text) => Ok(SqlValue::Text(text.clone())),
        Value::Array(_) | Value::Object(_) => Err(AuditError::InvalidPayload(
            "condition values must be scalars".to_string(),
        )),
    }
}

fn to_i64(value: u64, field: &str) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| AuditError::InvalidPayload(format!("{} is too large: {}", field, value)))
}

fn row_to_json(table: Table, row: &Row, with_count: bool) -> rusqlite::Result<Value> {
    let mut object = Map::new();

    for (idx, column) in table.columns().iter().enumerate() {
        let value = match row.get_ref(idx)? {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(integer) => Value::from(integer),
            ValueRef::Real(real) => serde_json::Number::from_f64(real)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ValueRef::Text(bytes) => {
                let text = String::from_utf8_lossy(bytes).into_owned();
                if table.is_json_column(column) {
                    serde_json::from_str(&text).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
                    })?
                } else {
                    Value::String(text)
                }
            }
            ValueRef::Blob(_) => {
                return Err(rusqlite::Error::InvalidColumnType(
                    idx,
                    column.to_string(),
                    Type::Blob,
                ))
            }
        };
        object.insert(column.to_string(), value);
    }

    if with_count {
        let count: i64 = row.get(table.columns().len())?;
        object.insert("count".to_string(), Value::from(count));
    }

    Ok(Value::Object(object))
}
