//! PostgreSQL driver.

use super::Driver;
use crate::dialect::Dialect;
use crate::error::{TrellisError, TrellisResult};
use crate::record::RawRow;
use crate::value::Value;
use async_trait::async_trait;
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::{Column, Connection, Row, TypeInfo};
use tracing::debug;

pub struct PostgresDriver {
    conn: Option<PgConnection>,
    log: bool,
}

impl PostgresDriver {
    pub(crate) async fn connect(url: &str, log: bool) -> Result<Self, sqlx::Error> {
        let conn = PgConnection::connect(url).await?;
        Ok(Self {
            conn: Some(conn),
            log,
        })
    }

    fn conn(&mut self) -> TrellisResult<&mut PgConnection> {
        self.conn
            .as_mut()
            .ok_or_else(|| TrellisError::Connection("connection is closed".to_string()))
    }
}

#[async_trait]
impl Driver for PostgresDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn fetch(&mut self, sql: &str, params: &[Value]) -> TrellisResult<Vec<RawRow>> {
        if self.log {
            debug!(target: "trellis::driver", sql = %sql, params = params.len(), "postgres fetch");
        }
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_value(query, param);
        }
        let rows: Vec<PgRow> = query
            .fetch_all(self.conn()?)
            .await
            .map_err(|e| TrellisError::Execution(e.to_string()))?;
        Ok(rows.iter().map(row_to_map).collect())
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> TrellisResult<u64> {
        if self.log {
            debug!(target: "trellis::driver", sql = %sql, params = params.len(), "postgres execute");
        }
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_value(query, param);
        }
        let result = query
            .execute(self.conn()?)
            .await
            .map_err(|e| TrellisError::Execution(e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn begin(&mut self) -> TrellisResult<()> {
        let verb = self.dialect().generator().begin_statement();
        self.execute(verb, &[]).await.map(|_| ())
    }

    async fn commit(&mut self) -> TrellisResult<()> {
        let verb = self.dialect().generator().commit_statement();
        self.execute(verb, &[]).await.map(|_| ())
    }

    async fn rollback(&mut self) -> TrellisResult<()> {
        let verb = self.dialect().generator().rollback_statement();
        self.execute(verb, &[]).await.map(|_| ())
    }

    async fn close(mut self: Box<Self>) -> TrellisResult<()> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .await
                .map_err(|e| TrellisError::Connection(e.to_string()))?;
        }
        Ok(())
    }
}

fn bind_value<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    value: &Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(i) => query.bind(*i),
        Value::Float(f) => query.bind(*f),
        Value::String(s) => query.bind(s.clone()),
        Value::Uuid(u) => query.bind(*u),
        Value::Json(v) => query.bind(v.clone()),
    }
}

/// Convert a PgRow to a field map, handling Postgres-specific types.
fn row_to_map(row: &PgRow) -> RawRow {
    use sqlx::ValueRef;

    let mut map = RawRow::new();

    for (i, column) in row.columns().iter().enumerate() {
        let name = column.name().to_string();
        let type_name = column.type_info().name();

        let value_ref = row.try_get_raw(i);
        if value_ref.is_err() || value_ref.as_ref().map(|v| v.is_null()).unwrap_or(true) {
            map.insert(name, serde_json::Value::Null);
            continue;
        }

        let value: serde_json::Value = match type_name {
            "BOOL" => row
                .try_get::<bool, _>(i)
                .map(serde_json::Value::Bool)
                .unwrap_or(serde_json::Value::Null),
            "INT2" | "INT4" => row
                .try_get::<i32, _>(i)
                .map(|v| serde_json::Value::Number(v.into()))
                .unwrap_or(serde_json::Value::Null),
            "INT8" => row
                .try_get::<i64, _>(i)
                .map(|v| serde_json::Value::Number(v.into()))
                .unwrap_or(serde_json::Value::Null),
            "FLOAT4" => row
                .try_get::<f32, _>(i)
                .ok()
                .and_then(|v| serde_json::Number::from_f64(v as f64))
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            "FLOAT8" => row
                .try_get::<f64, _>(i)
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            "NUMERIC" => row
                .try_get::<rust_decimal::Decimal, _>(i)
                .map(|v| serde_json::Value::String(v.to_string()))
                .unwrap_or(serde_json::Value::Null),
            "UUID" => row
                .try_get::<sqlx::types::Uuid, _>(i)
                .map(|v| serde_json::Value::String(v.to_string()))
                .unwrap_or(serde_json::Value::Null),
            "TIMESTAMPTZ" | "TIMESTAMP" => row
                .try_get::<chrono::DateTime<chrono::Utc>, _>(i)
                .map(|v| serde_json::Value::String(v.to_rfc3339()))
                .or_else(|_| {
                    row.try_get::<chrono::NaiveDateTime, _>(i)
                        .map(|v| serde_json::Value::String(v.to_string()))
                })
                .unwrap_or(serde_json::Value::Null),
            "DATE" => row
                .try_get::<chrono::NaiveDate, _>(i)
                .map(|v| serde_json::Value::String(v.to_string()))
                .unwrap_or(serde_json::Value::Null),
            "TEXT" | "VARCHAR" | "CHAR" | "NAME" => row
                .try_get::<String, _>(i)
                .map(serde_json::Value::String)
                .unwrap_or(serde_json::Value::Null),
            "JSONB" | "JSON" => row
                .try_get::<serde_json::Value, _>(i)
                .unwrap_or(serde_json::Value::Null),
            _ => row
                .try_get::<String, _>(i)
                .map(serde_json::Value::String)
                .unwrap_or_else(|_| serde_json::Value::String(format!("<{}>", type_name))),
        };

        map.insert(name, value);
    }

    map
}
