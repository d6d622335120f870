//! Document-style query filters (`{"status": {"$in": [...]}}`) compiled to
//! parameterised Postgres SQL. Used by the Postgres store for list and count queries.

pub mod error;
pub mod filter;
pub mod filter_order;
pub mod filter_where;
pub mod types;

pub use error::FilterError;
pub use filter::Filter;
pub use types::*;
