//! PostgreSQL implementation of [`TableWriter`].

use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, info, warn};

use crate::connection::ConnectionDescriptor;
use crate::error::{ImportError, ImportResult};
use crate::schema::ColumnTypeHints;
use crate::types::{DataSet, Value};

use super::{
    create_table_sql, drop_table_sql, insert_sql, plan_columns, SqlType, TableTarget, TableWriter, WriteSummary,
};

/// PostgreSQL caps a statement at 65535 bind parameters.
const MAX_BIND_PARAMS: usize = u16::MAX as usize;
const MAX_ROWS_PER_INSERT: usize = 1_000;

type BoxedParam = Box<dyn ToSql + Sync + Send>;

/// Build the process-wide pool for `descriptor`. No connection is opened until first use.
pub fn build_pool(descriptor: &ConnectionDescriptor, max_size: usize) -> ImportResult<Pool> {
    let config = descriptor.to_pg_config()?;
    let manager = Manager::from_config(
        config,
        NoTls,
        ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        },
    );
    Pool::builder(manager)
        .max_size(max_size)
        .build()
        .map_err(|e| ImportError::connection(format!("failed to build connection pool: {e}")))
}

/// Periodically drop pooled connections that have been idle for longer than `max_idle`.
pub fn spawn_idle_reaper(pool: Pool, max_idle: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval((max_idle / 4).max(Duration::from_secs(1)));
        loop {
            tick.tick().await;
            if pool.is_closed() {
                break;
            }
            let result = pool.retain(|_, metrics| metrics.last_used() < max_idle);
            if !result.removed.is_empty() {
                debug!(removed = result.removed.len(), "reaped idle connections");
            }
        }
    })
}

/// Writes datasets to PostgreSQL.
///
/// Imports aimed at the base descriptor borrow a pooled connection; imports with per-request
/// credentials open a dedicated connection. Either way the connection is released when the write
/// returns.
#[derive(Clone)]
pub struct PostgresWriter {
    pool: Pool,
    base: ConnectionDescriptor,
}

impl PostgresWriter {
    pub fn new(pool: Pool, base: ConnectionDescriptor) -> Self {
        Self { pool, base }
    }

    async fn open(&self, descriptor: &ConnectionDescriptor) -> ImportResult<Session> {
        descriptor.validate()?;
        if *descriptor == self.base {
            let object = self
                .pool
                .get()
                .await
                .map_err(|e| ImportError::connection(format!("failed to acquire pooled connection: {e}")))?;
            return Ok(Session::Pooled(object));
        }

        let config = descriptor.to_pg_config()?;
        let (client, connection) = config
            .connect(NoTls)
            .await
            .map_err(|e| ImportError::connection(format_postgres_error(&e)))?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "postgres connection closed with error");
            }
        });
        Ok(Session::Direct(client))
    }
}

enum Session {
    Pooled(Object),
    Direct(Client),
}

impl Session {
    fn client(&self) -> &Client {
        match self {
            Session::Pooled(object) => object,
            Session::Direct(client) => client,
        }
    }
}

#[async_trait]
impl TableWriter for PostgresWriter {
    async fn replace_table(
        &self,
        descriptor: &ConnectionDescriptor,
        target: &TableTarget,
        dataset: &DataSet,
        hints: &ColumnTypeHints,
    ) -> ImportResult<WriteSummary> {
        let session = self.open(descriptor).await?;
        let client = session.client();
        let columns = plan_columns(dataset, hints);
        let write_err = |e: tokio_postgres::Error| ImportError::write(format_postgres_error(&e));

        info!(
            table = %target.qualified_name(),
            database = %descriptor.database,
            rows = dataset.row_count(),
            "replacing table"
        );
        client.batch_execute(&drop_table_sql(target)).await.map_err(write_err)?;
        client
            .batch_execute(&create_table_sql(target, &columns))
            .await
            .map_err(write_err)?;

        let batch = rows_per_insert(columns.len());
        let mut written = 0;
        for chunk in dataset.rows.chunks(batch) {
            let mut params: Vec<BoxedParam> = Vec::with_capacity(chunk.len() * columns.len());
            for row in chunk {
                for (value, column) in row.iter().zip(&columns) {
                    params.push(to_param(value, column.sql_type, &column.name)?);
                }
            }
            let refs: Vec<&(dyn ToSql + Sync)> = params
                .iter()
                .map(|p| p.as_ref() as &(dyn ToSql + Sync))
                .collect();
            let sql = insert_sql(target, &columns, chunk.len());
            written += client.execute(sql.as_str(), &refs).await.map_err(write_err)? as usize;
            debug!(table = %target.qualified_name(), written, "inserted batch");
        }

        Ok(WriteSummary {
            rows_written: written,
            columns,
        })
    }
}

fn rows_per_insert(width: usize) -> usize {
    (MAX_BIND_PARAMS / width.max(1)).clamp(1, MAX_ROWS_PER_INSERT)
}

fn to_param(value: &Value, sql_type: SqlType, column: &str) -> ImportResult<BoxedParam> {
    let param: BoxedParam = match (sql_type, value) {
        (SqlType::BigInt, Value::Null) => Box::new(None::<i64>),
        (SqlType::BigInt, Value::Int64(i)) => Box::new(*i),
        (SqlType::DoublePrecision, Value::Null) => Box::new(None::<f64>),
        (SqlType::DoublePrecision, Value::Float64(f)) => Box::new(*f),
        (SqlType::DoublePrecision, Value::Int64(i)) => Box::new(*i as f64),
        (SqlType::Boolean, Value::Null) => Box::new(None::<bool>),
        (SqlType::Boolean, Value::Bool(b)) => Box::new(*b),
        (SqlType::Text, Value::Null) => Box::new(None::<String>),
        (SqlType::Text, v) => Box::new(v.to_string()),
        (SqlType::Jsonb, Value::Null) => Box::new(None::<serde_json::Value>),
        (SqlType::Jsonb, v) => Box::new(v.clone().into_json()),
        (t, v) => {
            return Err(ImportError::write(format!(
                "value {v:?} in column '{column}' cannot be stored as {}",
                t.as_sql()
            )));
        }
    };
    Ok(param)
}

fn format_postgres_error(error: &tokio_postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut message = db_error.message().to_string();
    if let Some(detail) = db_error.detail().filter(|d| !d.trim().is_empty()) {
        message.push_str(&format!(" (detail: {detail})"));
    }
    if let Some(hint) = db_error.hint().filter(|h| !h.trim().is_empty()) {
        message.push_str(&format!(" (hint: {hint})"));
    }

    match db_error.code().code() {
        "23505" => format!("duplicate value violates unique constraint: {message}"),
        "23502" => format!("null value violates not-null constraint: {message}"),
        "22P02" => format!("invalid input syntax: {message}"),
        "28P01" => format!("authentication failed: {message}"),
        "3D000" => format!("database does not exist: {message}"),
        "42501" => format!("insufficient privilege: {message}"),
        code => format!("{message} (code: {code})"),
    }
}
