//! Repository implementations.

mod scan;

pub use scan::ScanRepository;
