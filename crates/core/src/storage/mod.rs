//! Object storage for scan images using Apache OpenDAL.
//!
//! This module provides vendor-agnostic object storage with support for:
//! - S3-compatible: Cloudflare R2, Supabase Storage, AWS S3, DigitalOcean Spaces
//! - Azure Blob Storage
//! - Local filesystem (development only)
//! - In-memory (tests)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Apache OpenDAL                              │
//! │                   (Unified Storage API)                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ op.write("key", data)      │ op.presign_read("key", duration)   │
//! │ op.read("key")             │ UrlSigner (no native presigning)   │
//! │ op.delete("key")           │ op.stat("key")                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only the storage key is durable. Signed URLs are derived on every read.

mod config;
mod error;
mod service;
mod signer;

pub use config::{StorageConfig, StorageProvider};
pub use error::StorageError;
pub use service::{SignedUrl, StorageService, StoredObject};
pub use signer::UrlSigner;
