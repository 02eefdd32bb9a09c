//! Common test helpers shared across integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tabula_orm::{
    ColumnDef, Connection, ConnectionProvider, DataType, EntityDescriptor, Field, ForeignKey,
    FutureResult, Row, SqlType, Statement, Transaction,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

// Common test entities used across multiple test files

pub fn users() -> EntityDescriptor {
    EntityDescriptor::builder("user")
        .description("Users")
        .column(ColumnDef::new("id", SqlType::Int))
        .column(ColumnDef::new("name", SqlType::NVarChar).max_length(50))
        .column(ColumnDef::new("email", SqlType::NVarChar).check(|value| match value {
            sea_query::Value::String(Some(s)) if s.contains('@') => Ok(()),
            _ => Err("must be an email address".to_string()),
        }))
        .column(ColumnDef::new("status", SqlType::VarChar).nullable())
        .column(ColumnDef::new("age", SqlType::Int).nullable())
        .column(ColumnDef::new("created_at", SqlType::DateTime2).nullable())
        .build()
}

pub fn posts() -> EntityDescriptor {
    EntityDescriptor::builder("post")
        .description("Blog Posts")
        .column(ColumnDef::new("id", SqlType::BigInt))
        .column(ColumnDef::new("title", SqlType::NVarChar))
        .column(ColumnDef::new("author_id", SqlType::Int).nullable())
        .column(ColumnDef::new("editor_id", SqlType::Int).nullable())
        .column(ColumnDef::new("tag", SqlType::VarChar).nullable())
        .column(ColumnDef::untyped("body"))
        .foreign_key(ForeignKey::new("author_id", "users", "id"))
        .foreign_key(ForeignKey::new("editor_id", "users", "id"))
        .foreign_key(ForeignKey::new("tag", "tags", "code"))
        .build()
}

pub fn tags() -> EntityDescriptor {
    EntityDescriptor::builder("tag")
        .table("tags")
        .identifier("code")
        .column(ColumnDef::new("code", SqlType::VarChar))
        .column(ColumnDef::new("label", SqlType::NVarChar))
        .build()
}

/// Build a result row from name/value pairs.
pub fn row(fields: &[(&str, DataType)]) -> Row {
    Row {
        index: String::new(),
        fields: fields
            .iter()
            .map(|(name, value)| Field {
                name: (*name).to_string(),
                value: value.clone(),
            })
            .collect(),
    }
}

/// In-memory connection recording every statement it receives.
///
/// Queries answer with the canned rows registered for the table named in
/// `FROM [table]`; `exec` answers with `affected`.
#[derive(Debug, Default)]
pub struct MockConnection {
    statements: Mutex<Vec<Statement>>,
    rows: Mutex<HashMap<String, Vec<Row>>>,
    journal: Mutex<Vec<String>>,
    fail_with: Mutex<Option<String>>,
    pub affected: u32,
}

impl MockConnection {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            affected: 1,
            ..Self::default()
        })
    }

    pub fn with_rows(self: &Arc<Self>, table: &str, rows: Vec<Row>) -> Arc<Self> {
        self.rows.lock().insert(table.to_string(), rows);
        Arc::clone(self)
    }

    pub fn fail_with(&self, message: &str) {
        *self.fail_with.lock() = Some(message.to_string());
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.statements.lock().clone()
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().clone()
    }

    fn record(&self, statement: Statement) -> anyhow::Result<String> {
        let sql = statement.sql.clone();
        self.journal.lock().push(sql.clone());
        self.statements.lock().push(statement);
        if let Some(message) = self.fail_with.lock().clone() {
            anyhow::bail!(message);
        }
        Ok(sql)
    }

    fn canned(&self, sql: &str) -> Vec<Row> {
        let table = sql
            .split("FROM [")
            .nth(1)
            .and_then(|rest| rest.split(']').next())
            .unwrap_or_default();
        self.rows.lock().get(table).cloned().unwrap_or_default()
    }
}

impl Connection for MockConnection {
    fn query(&self, statement: Statement) -> FutureResult<Vec<Row>> {
        let result = self.record(statement).map(|sql| self.canned(&sql));
        async move { result }.boxed()
    }

    fn exec(&self, statement: Statement) -> FutureResult<u32> {
        let affected = self.affected;
        let result = self.record(statement).map(|_| affected);
        async move { result }.boxed()
    }
}

impl Transaction for MockConnection {
    fn commit(&self) -> FutureResult<()> {
        self.journal.lock().push("COMMIT".to_string());
        async { Ok(()) }.boxed()
    }

    fn rollback(&self) -> FutureResult<()> {
        self.journal.lock().push("ROLLBACK".to_string());
        async { Ok(()) }.boxed()
    }
}

/// Provider handing out one shared [`MockConnection`].
#[derive(Debug)]
pub struct MockProvider(pub Arc<MockConnection>);

impl ConnectionProvider for MockProvider {
    fn acquire(&self) -> FutureResult<Arc<dyn Connection>> {
        let connection: Arc<dyn Connection> = Arc::clone(&self.0) as Arc<dyn Connection>;
        async move { Ok(connection) }.boxed()
    }

    fn begin(&self) -> FutureResult<Arc<dyn Transaction>> {
        let tx: Arc<dyn Transaction> = Arc::clone(&self.0) as Arc<dyn Transaction>;
        async move { Ok(tx) }.boxed()
    }
}

pub fn provider(connection: &Arc<MockConnection>) -> Arc<dyn ConnectionProvider> {
    Arc::new(MockProvider(Arc::clone(connection)))
}

/// Install a test subscriber once; filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_test_writer())
        .try_init();
}

/// Normalize SQL by collapsing whitespace.
fn normalize_sql(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonicalize SQL for comparison by removing identifier brackets and normalizing whitespace.
/// Preserves brackets inside string literals.
fn canonicalize_sql(sql: &str) -> String {
    let mut cleaned = String::with_capacity(sql.len());
    let mut in_single_quote = false;

    for ch in sql.chars() {
        match ch {
            '\'' => {
                in_single_quote = !in_single_quote;
                cleaned.push(ch);
            }
            '[' | ']' if !in_single_quote => {
                // Strip identifier quoting to avoid brittle comparisons.
            }
            _ => cleaned.push(ch),
        }
    }

    normalize_sql(&cleaned)
}

/// Assert that SQL contains all expected fragments in order.
///
/// It strips identifier brackets, normalizes whitespace, and checks that
/// fragments appear sequentially in the generated SQL.
#[allow(clippy::missing_panics_doc)]
pub fn assert_sql_contains(actual: &str, fragments: &[&str]) {
    let actual_canonical = canonicalize_sql(actual);
    let mut search_start = 0usize;

    for fragment in fragments {
        let fragment_canonical = canonicalize_sql(fragment);
        if fragment_canonical.is_empty() {
            continue;
        }

        if let Some(pos) = actual_canonical[search_start..].find(&fragment_canonical) {
            search_start += pos + fragment_canonical.len();
        } else {
            panic!(
                "expected SQL fragment `{fragment_canonical}` not found in `{actual_canonical}`"
            );
        }
    }
}
