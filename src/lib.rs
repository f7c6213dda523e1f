//! Trellis, a cross-dialect query compiler and relation mapper.
//!
//! Builds parameterized SQL through a fluent builder, translates a
//! dialect-neutral placeholder/identifier syntax into MySQL, Postgres,
//! or SQLite wire format, resolves declared entity relations in batched
//! secondary queries, and manages transaction-scoped connections with
//! uniform begin/commit/rollback semantics.

pub mod builder;
pub mod case;
pub mod dialect;
pub mod driver;
pub mod entity;
pub mod error;
pub mod record;
pub mod relation;
pub mod serializer;
pub mod source;
pub mod stmt;
pub mod txn;
pub mod value;

pub mod prelude {
    pub use crate::builder::{Operator, QueryBuilder, SortOrder};
    pub use crate::dialect::Dialect;
    pub use crate::driver::Driver;
    pub use crate::entity::{ColumnDef, EntityDef, Registry, RelationKind};
    pub use crate::error::{TrellisError, TrellisResult};
    pub use crate::record::{Record, Related};
    pub use crate::source::{DataSource, SourceConfig};
    pub use crate::txn::{Transaction, with_transaction};
    pub use crate::value::Value;
}
