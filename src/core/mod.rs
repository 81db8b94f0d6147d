pub mod dashboard;
pub mod fetcher;
pub mod filter;
pub mod normalizer;
pub mod reader;
pub mod selector;

pub use crate::domain::model::{
    CanonicalColumn, DateRange, NormalizedTable, ProcessedTable, Table,
};
pub use crate::domain::ports::ConfigProvider;
pub use crate::utils::error::Result;
