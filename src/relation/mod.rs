//! Batched relation resolution.
//!
//! Given a batch of loaded owner records and the relation names to
//! fetch, the engine issues exactly one additional query per relation
//! (never one per record) and merges the related rows back onto their
//! owners by string-normalized key equality.

use crate::builder::QueryBuilder;
use crate::dialect::Dialect;
use crate::driver::Driver;
use crate::entity::{EntityDef, Registry, RelationDef, RelationKind};
use crate::error::{TrellisError, TrellisResult};
use crate::record::{Record, Related};
use crate::serializer::{self, PIVOT_KEY};
use crate::value::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Resolve the requested relations onto the owner batch.
pub async fn resolve(
    driver: &mut dyn Driver,
    registry: &Registry,
    dialect: Dialect,
    owner: &EntityDef,
    owners: &mut [Record],
    relations: &[String],
) -> TrellisResult<()> {
    for name in relations {
        let relation = owner.relation(name)?.clone();
        match relation.kind() {
            RelationKind::BelongsTo => {
                resolve_belongs_to(driver, registry, dialect, owners, &relation).await?
            }
            RelationKind::HasOne | RelationKind::HasMany => {
                resolve_has(driver, registry, dialect, owner, owners, &relation).await?
            }
            RelationKind::ManyToMany => {
                resolve_many_to_many(driver, registry, dialect, owner, owners, &relation).await?
            }
        }
    }
    Ok(())
}

/// Owner FK values -> related rows keyed by their primary key.
async fn resolve_belongs_to(
    driver: &mut dyn Driver,
    registry: &Registry,
    dialect: Dialect,
    owners: &mut [Record],
    relation: &RelationDef,
) -> TrellisResult<()> {
    let target = registry.entity(relation.target())?;
    let target_pk = target.primary_key()?.clone();
    let fk_field = required_foreign_key(relation)?;

    let (bind_values, _) = owner_keys(owners, &fk_field);
    if bind_values.is_empty() {
        for record in owners.iter_mut() {
            record
                .relations
                .insert(relation.name().to_string(), Related::One(None));
        }
        return Ok(());
    }

    let rows = fetch_in(driver, dialect, &target, target_pk.name(), bind_values).await?;

    let mut by_pk: HashMap<String, Record> = HashMap::new();
    let pk_db = target_pk.db_name();
    for row in &rows {
        if let Some(key) = row.get(pk_db.as_str()).and_then(key_string) {
            by_pk.insert(key, serializer::serialize_row(&target, row, None));
        }
    }

    for record in owners.iter_mut() {
        let related = record
            .get(&fk_field)
            .and_then(key_string)
            .and_then(|key| by_pk.get(&key))
            .cloned()
            .map(Box::new);
        record
            .relations
            .insert(relation.name().to_string(), Related::One(related));
    }
    Ok(())
}

/// Owner PK values -> related rows grouped by their foreign key.
async fn resolve_has(
    driver: &mut dyn Driver,
    registry: &Registry,
    dialect: Dialect,
    owner: &EntityDef,
    owners: &mut [Record],
    relation: &RelationDef,
) -> TrellisResult<()> {
    let target = registry.entity(relation.target())?;
    // The related side must declare a primary key before any resolution
    // is attempted, whether or not this query groups by it.
    target.primary_key()?;
    let owner_pk = owner.primary_key()?.clone();
    let fk_field = required_foreign_key(relation)?;
    let single = relation.kind() == RelationKind::HasOne;

    let (bind_values, _) = owner_keys(owners, owner_pk.name());
    if bind_values.is_empty() {
        for record in owners.iter_mut() {
            record.relations.insert(
                relation.name().to_string(),
                if single {
                    Related::One(None)
                } else {
                    Related::Many(vec![])
                },
            );
        }
        return Ok(());
    }

    let rows = fetch_in(driver, dialect, &target, &fk_field, bind_values).await?;

    let mut groups: HashMap<String, Vec<Record>> = HashMap::new();
    let fk_db = target.db_column(&fk_field);
    for row in &rows {
        if let Some(key) = row.get(fk_db.as_str()).and_then(key_string) {
            groups
                .entry(key)
                .or_default()
                .push(serializer::serialize_row(&target, row, None));
        }
    }

    for record in owners.iter_mut() {
        let group = record
            .get(owner_pk.name())
            .and_then(key_string)
            .and_then(|key| groups.get(&key));
        let related = if single {
            // hasOne: last row wins when the data holds more than one.
            Related::One(group.and_then(|g| g.last()).cloned().map(Box::new))
        } else {
            Related::Many(group.cloned().unwrap_or_default())
        };
        record
            .relations
            .insert(relation.name().to_string(), related);
    }
    Ok(())
}

/// Pivot-joined fetch with the owner-side key annotated on each row.
async fn resolve_many_to_many(
    driver: &mut dyn Driver,
    registry: &Registry,
    dialect: Dialect,
    owner: &EntityDef,
    owners: &mut [Record],
    relation: &RelationDef,
) -> TrellisResult<()> {
    let target = registry.entity(relation.target())?;
    let target_pk = target.primary_key()?.clone();
    let owner_pk = owner.primary_key()?.clone();

    let through_name = relation.through_entity().ok_or_else(|| {
        TrellisError::Config(format!(
            "many-to-many relation '{}' declares no through entity",
            relation.name()
        ))
    })?;
    let pivot = registry.entity(through_name)?;

    let reciprocal = find_reciprocal(&target, owner.name(), through_name)?;

    let owner_fk_field = relation.through_foreign_key_field().ok_or_else(|| {
        TrellisError::Config(format!(
            "many-to-many relation '{}' declares no through foreign key",
            relation.name()
        ))
    })?;
    let related_fk_field = reciprocal.through_foreign_key_field().ok_or_else(|| {
        TrellisError::Config(format!(
            "many-to-many relation '{}' declares no through foreign key",
            reciprocal.name()
        ))
    })?;

    let (bind_values, _) = owner_keys(owners, owner_pk.name());
    if bind_values.is_empty() {
        for record in owners.iter_mut() {
            record
                .relations
                .insert(relation.name().to_string(), Related::Many(vec![]));
        }
        return Ok(());
    }

    let generator = dialect.generator();
    let pivot_table = generator.quote_identifier(pivot.table_name());
    let target_table = generator.quote_identifier(target.table_name());
    let owner_fk_sql = format!(
        "{}.{}",
        pivot_table,
        generator.quote_identifier(&pivot.db_column(owner_fk_field))
    );

    let query = QueryBuilder::for_entity(dialect, target.clone())
        .select([
            format!("{}.*", target_table),
            format!(
                "{} AS {}",
                owner_fk_sql,
                generator.quote_identifier(PIVOT_KEY)
            ),
        ])
        .join_raw(&format!(
            "INNER JOIN {} ON {}.{} = {}.{}",
            pivot_table,
            pivot_table,
            generator.quote_identifier(&pivot.db_column(related_fk_field)),
            target_table,
            generator.quote_identifier(&target_pk.db_name())
        ))
        .filter_in_prequoted(&owner_fk_sql, bind_values);

    let (sql, params) = query.render()?;
    let rows = driver.fetch(&sql, &params).await?;

    let mut groups: HashMap<String, Vec<Record>> = HashMap::new();
    for row in &rows {
        if let Some(key) = row.get(PIVOT_KEY).and_then(key_string) {
            groups
                .entry(key)
                .or_default()
                .push(serializer::serialize_row(&target, row, None));
        }
    }

    for record in owners.iter_mut() {
        let group = record
            .get(owner_pk.name())
            .and_then(key_string)
            .and_then(|key| groups.get(&key))
            .cloned()
            .unwrap_or_default();
        record
            .relations
            .insert(relation.name().to_string(), Related::Many(group));
    }
    Ok(())
}

/// Locate the reciprocal many-to-many declaration on the related entity.
///
/// Candidates share the through entity; when the related side declares
/// several through the same pivot, the one targeting the owner wins,
/// else the first in registration order. No candidate is terminal.
fn find_reciprocal<'a>(
    target: &'a EntityDef,
    owner_name: &str,
    through: &str,
) -> TrellisResult<&'a RelationDef> {
    let candidates: Vec<&RelationDef> = target
        .relations()
        .iter()
        .filter(|r| r.kind() == RelationKind::ManyToMany && r.through_entity() == Some(through))
        .collect();
    candidates
        .iter()
        .find(|r| r.target() == owner_name)
        .or_else(|| candidates.first())
        .copied()
        .ok_or_else(|| TrellisError::MissingReciprocal {
            entity: target.name().to_string(),
            through: through.to_string(),
        })
}

/// One `IN`-batched fetch against the target entity.
async fn fetch_in(
    driver: &mut dyn Driver,
    dialect: Dialect,
    target: &Arc<EntityDef>,
    field: &str,
    keys: Vec<Value>,
) -> TrellisResult<Vec<crate::record::RawRow>> {
    let query = QueryBuilder::for_entity(dialect, target.clone()).filter_in(field, keys);
    let (sql, params) = query.render()?;
    driver.fetch(&sql, &params).await
}

fn required_foreign_key(relation: &RelationDef) -> TrellisResult<String> {
    relation
        .foreign_key_field()
        .map(str::to_string)
        .ok_or_else(|| {
            TrellisError::Config(format!(
                "relation '{}' declares no foreign key",
                relation.name()
            ))
        })
}

/// Distinct non-null key values from the owner batch, in first-seen
/// order, as bind values plus their normalized forms.
fn owner_keys(owners: &[Record], field: &str) -> (Vec<Value>, Vec<String>) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut bind_values = Vec::new();
    let mut normalized = Vec::new();
    for record in owners {
        let Some(value) = record.get(field) else {
            continue;
        };
        let Some(key) = key_string(value) else {
            continue;
        };
        if seen.insert(key.clone()) {
            bind_values.push(Value::from_json(value));
            normalized.push(key);
        }
    }
    (bind_values, normalized)
}

/// String-normalize a key value so numeric/string representation
/// differences across drivers cannot break the merge.
fn key_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_string_normalizes() {
        assert_eq!(key_string(&json!(5)), Some("5".to_string()));
        assert_eq!(key_string(&json!("5")), Some("5".to_string()));
        assert_eq!(key_string(&json!(null)), None);
        assert_eq!(key_string(&json!({"a": 1})), None);
    }

    #[test]
    fn test_owner_keys_dedup_in_order() {
        let mut a = Record::new();
        a.set("id", json!(2));
        let mut b = Record::new();
        b.set("id", json!(1));
        let mut c = Record::new();
        c.set("id", json!(2));
        let mut d = Record::new();
        d.set("id", json!(null));
        let (values, normalized) = owner_keys(&[a, b, c, d], "id");
        assert_eq!(normalized, vec!["2".to_string(), "1".to_string()]);
        assert_eq!(values, vec![Value::Int(2), Value::Int(1)]);
    }
}
