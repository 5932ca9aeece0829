//! Data layer: core types, loading, filtering, and export.
//!
//! Architecture:
//! ```text
//!  .csv / .json / .parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → TransactionTable (derived columns filled in)
//!   └──────────┘
//!        │            source: caches the table per path, explicit invalidation
//!        ▼
//!   ┌──────────────────┐
//!   │ TransactionTable  │  Vec<Transaction>, country/product index, bounds
//!   └──────────────────┘
//!        │            segment: per-customer facts over the full table
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  apply FilterSpec → TableView (row indices)
//!   └──────────┘
//!        │
//!        ▼
//!   analytics / export
//! ```

pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod segment;
pub mod source;
