//! Query execution against a driver.

use super::QueryBuilder;
use crate::driver::Driver;
use crate::entity::Registry;
use crate::error::{TrellisError, TrellisResult};
use crate::record::{RawRow, Record};
use crate::relation;
use crate::serializer;
use crate::stmt;

impl QueryBuilder {
    /// Execute the select, serialize the rows, and resolve any requested
    /// relations. The registry is consulted only for relation fetches.
    pub async fn fetch_all(
        &self,
        driver: &mut dyn Driver,
        registry: &Registry,
    ) -> TrellisResult<Vec<Record>> {
        let (sql, params) = self.render()?;
        let rows = driver.fetch(&sql, &params).await?;
        let mut records = match &self.entity {
            Some(entity) => serializer::serialize_rows(entity, &rows, self.field_allow_list()),
            None => rows.iter().map(serializer::serialize_untyped).collect(),
        };
        if !self.relations.is_empty() {
            let entity = self.entity.as_ref().ok_or_else(|| {
                TrellisError::Config(format!(
                    "relation fetch on '{}' requires an entity-bound query",
                    self.table
                ))
            })?;
            relation::resolve(
                driver,
                registry,
                self.dialect,
                entity.as_ref(),
                &mut records,
                &self.relations,
            )
            .await?;
        }
        Ok(records)
    }

    /// Fetch at most one record.
    pub async fn fetch_one(
        &self,
        driver: &mut dyn Driver,
        registry: &Registry,
    ) -> TrellisResult<Option<Record>> {
        let mut limited = self.clone();
        limited.limit = Some(1);
        let mut records = limited.fetch_all(driver, registry).await?;
        Ok(if records.is_empty() {
            None
        } else {
            Some(records.remove(0))
        })
    }

    /// Fetch exactly one record; fail on empty.
    pub async fn fetch_one_or_fail(
        &self,
        driver: &mut dyn Driver,
        registry: &Registry,
    ) -> TrellisResult<Record> {
        self.fetch_one(driver, registry)
            .await?
            .ok_or(TrellisError::NotFound)
    }

    /// `COUNT(*)` over the current intent, ignoring order and paging.
    pub async fn count(&self, driver: &mut dyn Driver) -> TrellisResult<i64> {
        let mut counting = self.clone();
        counting = counting.select(["COUNT(*) AS total"]);
        counting.order_items.clear();
        counting.limit = None;
        counting.offset = None;
        let (sql, params) = counting.render()?;
        let rows = driver.fetch(&sql, &params).await?;
        Ok(rows
            .first()
            .and_then(|row| row.get("total"))
            .and_then(|v| v.as_i64())
            .unwrap_or(0))
    }

    pub async fn exists(&self, driver: &mut dyn Driver) -> TrellisResult<bool> {
        Ok(self.count(driver).await? > 0)
    }

    /// Execute an UPDATE with the accumulated WHERE; returns affected rows.
    pub async fn update(&self, driver: &mut dyn Driver, changes: &RawRow) -> TrellisResult<u64> {
        let (sql, params) = stmt::update::build_update(self, changes)?;
        driver.execute(&sql, &params).await
    }

    /// Execute a DELETE with the accumulated WHERE; returns affected rows.
    pub async fn delete(&self, driver: &mut dyn Driver) -> TrellisResult<u64> {
        let (sql, params) = stmt::delete::build_delete(self)?;
        driver.execute(&sql, &params).await
    }
}
