//! Scan orchestration: upload, analyze, persist, and owner-scoped reads.
//!
//! An upload runs three external calls strictly in order:
//! - store the raw image and sign a retrieval URL
//! - ask the vision model for a structured analysis
//! - persist the scan row
//!
//! Reads never trust a stored URL; a fresh one is signed for every record.

mod error;
mod service;
mod types;

pub use error::ScanError;
pub use service::{ScanRepository, ScanService};
pub use types::{NewScan, Scan, ScanConfig, ScanUploadResult, ScanView, UploadScanInput};
