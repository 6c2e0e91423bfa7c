//! Core scan logic for NatureScan.
//!
//! This crate contains the scan orchestration with ZERO web or database dependencies.
//! Persistence is reached through the [`scan::ScanRepository`] trait.
//!
//! # Modules
//!
//! - `storage` - Object storage and signed retrieval URLs
//! - `vision` - Vision model adapter and strict analysis parsing
//! - `scan` - Upload, analyze, persist and owner-scoped reads

pub mod scan;
pub mod storage;
pub mod vision;
