//! Stat repositories, CSV loaders, ground truth, and result ledgers.

pub mod csv_storage;
pub mod ledger;
pub mod memory;
pub mod outcomes;

pub use csv_storage::CsvStorage;
pub use ledger::{CsvLedger, MemoryLedger};
pub use memory::InMemoryStatRepository;
pub use outcomes::GroundTruth;
