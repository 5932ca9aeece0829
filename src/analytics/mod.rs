//! Aggregations over a filtered [`TableView`](crate::data::model::TableView).
//!
//! Everything here is a pure function of its inputs and returns plain data;
//! an empty view produces empty tables and zero KPIs, never an error.

pub mod aggregate;
pub mod kpi;
pub mod report;
pub mod rfm;
pub mod stats;
