use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HelperError {
	#[error("IO error at {}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error("File not found: {}", .0.display())]
	NotFound(PathBuf),

	#[error("Encoding error: {0}")]
	Encode(String),

	#[error("Decoding error: {0}")]
	Decode(String),

	/// The file holds a different kind of record than the caller asked for,
	/// e.g. a bare weights file passed to the optimizer restore.
	#[error("Expected a {expected} record, found a {found} record")]
	WrongRecordKind { expected: String, found: String },

	#[error("Missing key in state dict: {0}")]
	MissingKey(String),

	#[error("Unexpected key in state dict: {0}")]
	UnexpectedKey(String),

	#[error("Shape mismatch for {key}: expected {expected:?}, found {found:?}")]
	ShapeMismatch {
		key: String,
		expected: Vec<usize>,
		found: Vec<usize>,
	},

	#[error("Optimizer structure mismatch: {0}")]
	StructureMismatch(String),

	#[error("Invalid parameter: {0}")]
	InvalidParameter(String),

	#[error("Parse error: {0}")]
	Parse(String),
}

impl HelperError {
	pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
		let path = path.into();
		if source.kind() == io::ErrorKind::NotFound {
			HelperError::NotFound(path)
		} else {
			HelperError::Io { path, source }
		}
	}
}

pub type Result<T> = std::result::Result<T, HelperError>;
