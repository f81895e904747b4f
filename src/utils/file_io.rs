use crate::error::Result;
use crate::utils::error_helpers::IoErrorMapper;
use std::fs;
use std::path::Path;

pub fn read_file_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).map_io_err(path)
}

pub fn read_file_string<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path).map_io_err(path)
}

pub fn write_file_bytes<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, data).map_io_err(path)
}

pub fn write_file_string<P: AsRef<Path>>(path: P, contents: &str) -> Result<()> {
    write_file_bytes(path, contents.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HelperError;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_maps_to_not_found() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("absent.bin");
        match read_file_bytes(&missing) {
            Err(HelperError::NotFound(path)) => assert_eq!(path, missing),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_write_into_missing_directory_keeps_path() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("no_such_dir").join("out.bin");
        let err = write_file_bytes(&target, b"x").unwrap_err();
        assert!(format!("{}", err).contains("out.bin"));
    }
}
