//! sellers.json import pipeline.
//!
//! 1. **Loading** (`loader`) - Reads sellers.json from disk or HTTP
//! 2. **Data Preparation** (`data_builder`) - Turns raw entries into seller and domain rows
//! 3. **Database Operations** (`database_operations`, `upsert`) - Per-table upsert statements and conflict policies
//! 4. **Batch Writing** (`batch_writer`) - One transaction per batch, failed batches are skipped
//! 5. **Snapshot** (`snapshot`) - Daily summary row
//! 6. **Coordination** (`coordinator`) - Runs the stages in order
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use sellers_importer::config::ImportConfig;
//! use sellers_importer::import::SellersImporter;
//!
//! let importer = SellersImporter::new(ImportConfig::from_env()?);
//! let stats = importer.run().await?;
//!
//! println!("Imported {} sellers", stats.sellers.rows_written);
//! ```

pub mod batch_writer;
pub mod coordinator;
pub mod data_builder;
pub mod data_structures;
pub mod database_operations;
pub mod loader;
pub mod retry;
pub mod snapshot;
pub mod stats;
pub mod upsert;

pub use coordinator::SellersImporter;
pub use stats::{ImportStats, WriteReport};
