//! Record store backed by SQLite

pub mod init;
pub mod records;

pub use init::*;
pub use records::*;
