pub mod ballot;
pub mod stats;
