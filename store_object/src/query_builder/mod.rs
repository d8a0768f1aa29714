//! Query options and SQL builders
//!
//! [`QueryBuilder`] accumulates options; [`SqlGenerator`] turns them into
//! statements.

pub mod builder;
pub mod filter;
pub mod ordering;
pub mod pagination;
pub mod sql_generation;
pub mod update;


pub use builder::QueryBuilder;
pub use filter::{LogicalOperator, QueryCondition, QueryFilter, QueryOperator};
pub use ordering::SortOrder;
pub use pagination::{page_offset, Page};
pub use sql_generation::SqlGenerator;
pub use update::UpdateOperation;
