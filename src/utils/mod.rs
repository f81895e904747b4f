pub mod error_helpers;
pub mod file_io;
