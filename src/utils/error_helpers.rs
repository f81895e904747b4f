use crate::error::{HelperError, Result};
use std::io;
use std::path::Path;

pub trait IoErrorMapper<T> {
    fn map_io_err(self, path: &Path) -> Result<T>;
}

impl<T> IoErrorMapper<T> for std::result::Result<T, io::Error> {
    fn map_io_err(self, path: &Path) -> Result<T> {
        self.map_err(|e| HelperError::io(path, e))
    }
}

pub trait ParseErrorMapper<T> {
    fn map_parse_err(self, context: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> ParseErrorMapper<T> for std::result::Result<T, E> {
    fn map_parse_err(self, context: &str) -> Result<T> {
        self.map_err(|e| HelperError::Parse(format!("{}: {}", context, e)))
    }
}
