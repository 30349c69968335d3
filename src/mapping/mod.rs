//! Row-to-value mapping through explicit constructors.

mod cache;
mod constructor;
mod mapper;

pub use cache::MapperCache;
pub use constructor::{Args, Constructor, FromRow, ParamType};
pub use mapper::{RowMapper, Selector, combine};
