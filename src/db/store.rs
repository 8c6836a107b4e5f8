use std::sync::Mutex;

use anyhow::Context;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use serde_json::Value;

/// A single row, keyed by column name.
pub type Record = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Tenants,
    Calls,
    Appointments,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Tenants => "tenants",
            Table::Calls => "calls",
            Table::Appointments => "appointments",
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::Tenants => &[
                "id",
                "name",
                "phone_number",
                "hours_json",
                "insurances_json",
                "services_json",
                "faq_json",
                "location_json",
                "created_at",
            ],
            Table::Calls => &[
                "id",
                "call_id",
                "tenant_id",
                "caller_number",
                "status",
                "transcript",
                "intent",
                "intent_confidence",
                "faq_matched",
                "response_text",
                "created_at",
            ],
            Table::Appointments => &[
                "id",
                "call_id",
                "tenant_id",
                "customer_name",
                "customer_phone",
                "service_type",
                "urgency",
                "preferred_date",
                "preferred_time",
                "scheduled_at",
                "notes",
                "status",
                "created_at",
            ],
        }
    }

    // Call logs are read newest first; profiles and appointments in insertion order.
    fn order_clause(&self) -> &'static str {
        match self {
            Table::Calls => "ORDER BY rowid DESC",
            _ => "ORDER BY rowid ASC",
        }
    }

    fn check_column(&self, column: &str) -> anyhow::Result<()> {
        if self.columns().contains(&column) {
            Ok(())
        } else {
            anyhow::bail!("unknown column {column} for table {}", self.as_str())
        }
    }
}

/// Generic insert/select contract over the relational store.
pub trait RecordStore: Send + Sync {
    /// Inserts a record and returns it as stored (with a generated `id` when
    /// the caller did not supply one).
    fn insert(&self, table: Table, record: Record) -> anyhow::Result<Record>;

    /// Returns up to `limit` records whose columns equal every filter value.
    fn select(
        &self,
        table: Table,
        filters: &[(&str, &str)],
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<Record>>;
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database connection lock poisoned"))
    }
}

impl RecordStore for SqliteStore {
    fn insert(&self, table: Table, mut record: Record) -> anyhow::Result<Record> {
        if record.is_empty() {
            anyhow::bail!("refusing to insert an empty record into {}", table.as_str());
        }

        let mut columns = Vec::with_capacity(record.len());
        let mut values = Vec::with_capacity(record.len());
        for (column, value) in &record {
            table.check_column(column)?;
            columns.push(column.as_str());
            values.push(to_sql_value(column, value)?);
        }

        let placeholders = (1..=columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            table.as_str(),
            columns.join(", ")
        );

        let conn = self.lock()?;
        conn.execute(&sql, params_from_iter(values))
            .with_context(|| format!("failed to insert into {}", table.as_str()))?;

        if !record.contains_key("id") {
            record.insert("id".to_string(), Value::from(conn.last_insert_rowid()));
        }
        Ok(record)
    }

    fn select(
        &self,
        table: Table,
        filters: &[(&str, &str)],
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<Record>> {
        let columns = table.columns();
        let mut sql = format!("SELECT {} FROM {}", columns.join(", "), table.as_str());

        let mut params: Vec<SqlValue> = Vec::with_capacity(filters.len() + 1);
        for (i, (column, value)) in filters.iter().enumerate() {
            table.check_column(column)?;
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            sql.push_str(&format!("{column} = ?{}", i + 1));
            params.push(SqlValue::Text(value.to_string()));
        }

        sql.push(' ');
        sql.push_str(table.order_clause());
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT ?{}", params.len() + 1));
            params.push(SqlValue::Integer(limit as i64));
        }

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&sql)
            .with_context(|| format!("failed to prepare select on {}", table.as_str()))?;

        let rows = stmt.query_map(params_from_iter(params), |row| {
            let mut raw = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                raw.push(row.get::<_, SqlValue>(i)?);
            }
            Ok(raw)
        })?;

        let mut records = vec![];
        for row in rows {
            let raw = row?;
            let mut record = Record::new();
            for (column, value) in columns.iter().zip(raw) {
                record.insert(column.to_string(), from_sql_value(column, value));
            }
            records.push(record);
        }
        Ok(records)
    }
}

fn is_json_column(column: &str) -> bool {
    column.ends_with("_json")
}

fn to_sql_value(column: &str, value: &Value) -> anyhow::Result<SqlValue> {
    if is_json_column(column) {
        return Ok(match value {
            Value::Null => SqlValue::Null,
            other => SqlValue::Text(serde_json::to_string(other)?),
        });
    }

    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(serde_json::to_string(other)?),
    })
}

fn from_sql_value(column: &str, value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::from(i),
        SqlValue::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        SqlValue::Text(text) if is_json_column(column) => {
            serde_json::from_str(&text).unwrap_or_else(|e| {
                tracing::warn!(column, error = %e, "stored JSON column is malformed");
                Value::String(text)
            })
        }
        SqlValue::Text(text) => Value::String(text),
        SqlValue::Blob(_) => Value::Null,
    }
}
