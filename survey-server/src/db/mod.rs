//! Survey and response repositories

pub mod responses;
pub mod surveys;

pub use responses::DbReportSource;
