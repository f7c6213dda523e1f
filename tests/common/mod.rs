//! In-process mock driver for integration tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use trellis::dialect::Dialect;
use trellis::driver::Driver;
use trellis::error::{TrellisError, TrellisResult};
use trellis::record::RawRow;
use trellis::value::Value;

/// Everything the driver was asked to do, shared with the test body.
#[derive(Debug, Default)]
pub struct DriverLog {
    pub fetches: Vec<(String, Vec<Value>)>,
    pub executes: Vec<String>,
    pub closes: usize,
}

pub struct MockDriver {
    dialect: Dialect,
    pub log: Arc<Mutex<DriverLog>>,
    responses: VecDeque<Vec<RawRow>>,
    /// Substring of a statement that should fail with an execution error.
    fail_on: Option<String>,
}

impl MockDriver {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            log: Arc::new(Mutex::new(DriverLog::default())),
            responses: VecDeque::new(),
            fail_on: None,
        }
    }

    /// Queue a canned result set for the next fetch.
    pub fn respond(mut self, rows: Vec<RawRow>) -> Self {
        self.responses.push_back(rows);
        self
    }

    pub fn fail_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    pub fn log_handle(&self) -> Arc<Mutex<DriverLog>> {
        self.log.clone()
    }

    fn check_failure(&self, sql: &str) -> TrellisResult<()> {
        if let Some(needle) = &self.fail_on {
            if sql.contains(needle.as_str()) {
                return Err(TrellisError::Execution(format!("forced failure: {}", sql)));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Driver for MockDriver {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn fetch(&mut self, sql: &str, params: &[Value]) -> TrellisResult<Vec<RawRow>> {
        self.log
            .lock()
            .unwrap()
            .fetches
            .push((sql.to_string(), params.to_vec()));
        self.check_failure(sql)?;
        Ok(self.responses.pop_front().unwrap_or_default())
    }

    async fn execute(&mut self, sql: &str, _params: &[Value]) -> TrellisResult<u64> {
        self.log.lock().unwrap().executes.push(sql.to_string());
        self.check_failure(sql)?;
        Ok(1)
    }

    async fn begin(&mut self) -> TrellisResult<()> {
        let verb = self.dialect.generator().begin_statement();
        self.execute(verb, &[]).await.map(|_| ())
    }

    async fn commit(&mut self) -> TrellisResult<()> {
        let verb = self.dialect.generator().commit_statement();
        self.execute(verb, &[]).await.map(|_| ())
    }

    async fn rollback(&mut self) -> TrellisResult<()> {
        let verb = self.dialect.generator().rollback_statement();
        self.execute(verb, &[]).await.map(|_| ())
    }

    async fn close(self: Box<Self>) -> TrellisResult<()> {
        self.log.lock().unwrap().closes += 1;
        Ok(())
    }
}

/// Shorthand for building a raw row from a JSON object literal.
pub fn row(value: serde_json::Value) -> RawRow {
    value.as_object().expect("row literal must be an object").clone()
}
