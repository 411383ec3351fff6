pub mod accounts;
pub mod export;
pub mod inference;
pub mod ingestion;
pub mod sentiment;
pub mod visualization;
