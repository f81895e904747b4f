//! On-disk record codec shared by checkpoints and bare weights files.
//!
//! Binary records are `MAGIC | kind | xz(shuffle(bincode(payload)))`. JSON
//! records are the plain serde encoding of the payload and are recognised by
//! their leading `{`.

use crate::config::SaveOptions;
use crate::constants::{quantization, record};
use crate::error::{HelperError, Result};
use crate::state::{Checkpoint, StateDict};
use crate::tensor::Tensor;
use byteorder::{BigEndian, ByteOrder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::io::Read;
use std::num::FpCategory;
use xz2::read::{XzDecoder, XzEncoder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordFormat {
	Binary,
	Json,
}

impl RecordFormat {
	pub fn from_str(s: &str) -> Result<Self> {
		match s.to_lowercase().as_str() {
			"binary" | "bin" => Ok(RecordFormat::Binary),
			"json" => Ok(RecordFormat::Json),
			_ => Err(HelperError::InvalidParameter(format!(
				"Unknown record format: {}. Use 'binary' or 'json'",
				s
			))),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
	Checkpoint,
	Weights,
}

impl RecordKind {
	fn tag(self) -> u8 {
		match self {
			RecordKind::Checkpoint => record::KIND_CHECKPOINT,
			RecordKind::Weights => record::KIND_WEIGHTS,
		}
	}

	fn from_tag(tag: u8) -> Result<Self> {
		match tag {
			record::KIND_CHECKPOINT => Ok(RecordKind::Checkpoint),
			record::KIND_WEIGHTS => Ok(RecordKind::Weights),
			other => Err(HelperError::Decode(format!("Unknown record kind tag {}", other))),
		}
	}
}

impl fmt::Display for RecordKind {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			RecordKind::Checkpoint => write!(f, "checkpoint"),
			RecordKind::Weights => write!(f, "bare weights"),
		}
	}
}

pub fn detect_format(data: &[u8]) -> Result<RecordFormat> {
	if data.starts_with(record::MAGIC) {
		return Ok(RecordFormat::Binary);
	}
	match data.iter().find(|b| !b.is_ascii_whitespace()) {
		Some(b'{') => Ok(RecordFormat::Json),
		_ => Err(HelperError::Decode("Unrecognised record format".to_string())),
	}
}

pub fn checkpoint_to_bytes(checkpoint: &Checkpoint, options: &SaveOptions) -> Result<Vec<u8>> {
	let mut checkpoint = checkpoint.clone();
	prepare_tensors(checkpoint.model.tensors_mut(), options.quantise);
	prepare_tensors(
		checkpoint
			.optimizer
			.state
			.values_mut()
			.flat_map(|entries| entries.values_mut().filter_map(|v| v.as_tensor_mut())),
		options.quantise,
	);
	if options.format == RecordFormat::Json {
		ensure_json_safe_checkpoint(&checkpoint)?;
	}
	encode(RecordKind::Checkpoint, &checkpoint, options)
}

pub fn weights_to_bytes(weights: &StateDict, options: &SaveOptions) -> Result<Vec<u8>> {
	let mut weights = weights.clone();
	prepare_tensors(weights.tensors_mut(), options.quantise);
	if options.format == RecordFormat::Json {
		ensure_finite(weights.iter().map(|(name, t)| (name.clone(), t)))?;
	}
	encode(RecordKind::Weights, &weights, options)
}

pub fn checkpoint_from_bytes(data: &[u8]) -> Result<Checkpoint> {
	decode(RecordKind::Checkpoint, data)
}

pub fn weights_from_bytes(data: &[u8]) -> Result<StateDict> {
	decode(RecordKind::Weights, data)
}

/// Reports which kind of record `data` holds without decoding the payload
/// (binary) or after a structural look at the top-level keys (JSON).
pub fn peek_kind(data: &[u8]) -> Result<RecordKind> {
	match detect_format(data)? {
		RecordFormat::Binary => binary_kind(data),
		RecordFormat::Json => {
			let value: serde_json::Value =
				serde_json::from_slice(data).map_err(|e| HelperError::Decode(format!("JSON record: {}", e)))?;
			Ok(json_kind(&value))
		}
	}
}

fn encode<T: Serialize>(kind: RecordKind, payload: &T, options: &SaveOptions) -> Result<Vec<u8>> {
	match options.format {
		RecordFormat::Json => serde_json::to_vec(payload)
			.map_err(|e| HelperError::Encode(format!("{} encoding failed: {}", kind, e))),
		RecordFormat::Binary => {
			let serialized =
				bincode::serialize(payload).map_err(|e| HelperError::Encode(format!("{} encoding failed: {}", kind, e)))?;
			let shuffled = shuffle(&serialized, record::SHUFFLE_STRIDE);
			let mut compressed = Vec::new();
			XzEncoder::new(shuffled.as_slice(), options.compression_level)
				.read_to_end(&mut compressed)
				.map_err(|e| HelperError::Encode(format!("xz compression failed: {}", e)))?;

			let mut out = Vec::with_capacity(record::HEADER_LEN + compressed.len());
			out.extend_from_slice(record::MAGIC);
			out.push(kind.tag());
			out.extend_from_slice(&compressed);
			Ok(out)
		}
	}
}

fn decode<T: DeserializeOwned>(expected: RecordKind, data: &[u8]) -> Result<T> {
	match detect_format(data)? {
		RecordFormat::Binary => {
			let found = binary_kind(data)?;
			if found != expected {
				return Err(wrong_kind(expected, found));
			}
			let mut decompressed = Vec::new();
			XzDecoder::new(&data[record::HEADER_LEN..])
				.read_to_end(&mut decompressed)
				.map_err(|e| HelperError::Decode(format!("xz decompression failed: {}", e)))?;
			let unshuffled = unshuffle(&decompressed, record::SHUFFLE_STRIDE);
			bincode::deserialize(&unshuffled)
				.map_err(|e| HelperError::Decode(format!("{} decoding failed: {}", expected, e)))
		}
		RecordFormat::Json => {
			let value: serde_json::Value =
				serde_json::from_slice(data).map_err(|e| HelperError::Decode(format!("JSON record: {}", e)))?;
			if expected == RecordKind::Weights && json_kind(&value) == RecordKind::Checkpoint {
				return Err(wrong_kind(expected, RecordKind::Checkpoint));
			}
			serde_json::from_value(value)
				.map_err(|e| HelperError::Decode(format!("{} decoding failed: {}", expected, e)))
		}
	}
}

fn binary_kind(data: &[u8]) -> Result<RecordKind> {
	if data.len() < record::HEADER_LEN {
		return Err(HelperError::Decode("Truncated record header".to_string()));
	}
	RecordKind::from_tag(data[record::MAGIC.len()])
}

/// A JSON object is a checkpoint when its `optimizer` value carries
/// `param_groups` and its `model` value is a mapping rather than a tensor.
/// Anything else, including weights whose parameters happen to be named
/// `model` or `optimizer`, is a bare weights file.
fn json_kind(value: &serde_json::Value) -> RecordKind {
	let object = match value.as_object() {
		Some(object) => object,
		None => return RecordKind::Weights,
	};
	let has_optimizer_state = object
		.get("optimizer")
		.and_then(serde_json::Value::as_object)
		.map_or(false, |o| o.contains_key("param_groups"));
	let has_model_dict = object
		.get("model")
		.map_or(false, |m| m.is_object() && !looks_like_tensor(m));
	if has_optimizer_state && has_model_dict {
		RecordKind::Checkpoint
	} else {
		RecordKind::Weights
	}
}

fn looks_like_tensor(value: &serde_json::Value) -> bool {
	value
		.as_object()
		.map_or(false, |o| o.contains_key("data") && o.contains_key("device"))
}

fn wrong_kind(expected: RecordKind, found: RecordKind) -> HelperError {
	HelperError::WrongRecordKind {
		expected: expected.to_string(),
		found: found.to_string(),
	}
}

/// Flushes subnormals to zero and, when `quantise` is set, zeroes the 12 least
/// significant bits of every finite value to improve compression. NaN and
/// infinities are kept bit for bit.
fn prepare_tensors<'a>(tensors: impl Iterator<Item = &'a mut Tensor>, quantise: bool) {
	for tensor in tensors {
		for e in tensor.data.iter_mut() {
			if let FpCategory::Subnormal = e.classify() {
				*e = 0.0;
			}
			if quantise && e.is_finite() {
				let mut bytes = [0; 4];
				BigEndian::write_f32(&mut bytes, *e);
				bytes[2] &= quantization::QUANTIZE_MASK_HIGH;
				bytes[3] &= quantization::QUANTIZE_MASK_LOW;
				*e = BigEndian::read_f32(&bytes);
			}
		}
	}
}

/// JSON has no representation for NaN or infinity; serde_json writes them as
/// `null`, which cannot be read back.
fn ensure_finite<'a>(tensors: impl Iterator<Item = (String, &'a Tensor)>) -> Result<()> {
	for (key, tensor) in tensors {
		if tensor.data.iter().any(|v| !v.is_finite()) {
			return Err(non_finite(&key));
		}
	}
	Ok(())
}

fn ensure_json_safe_checkpoint(checkpoint: &Checkpoint) -> Result<()> {
	ensure_finite(checkpoint.model.iter().map(|(name, t)| (format!("model.{}", name), t)))?;
	ensure_finite(checkpoint.optimizer.state.iter().flat_map(|(index, entries)| {
		entries
			.iter()
			.filter_map(move |(name, value)| value.as_tensor().map(|t| (format!("optimizer.state.{}.{}", index, name), t)))
	}))?;
	for (i, group) in checkpoint.optimizer.param_groups.iter().enumerate() {
		if !group.lr.is_finite() {
			return Err(non_finite(&format!("optimizer.param_groups.{}.lr", i)));
		}
		if let Some((name, _)) = group.options.iter().find(|(_, v)| !v.is_finite()) {
			return Err(non_finite(&format!("optimizer.param_groups.{}.{}", i, name)));
		}
	}
	Ok(())
}

fn non_finite(key: &str) -> HelperError {
	HelperError::Encode(format!("{} holds a NaN or infinite value, which a JSON record cannot store", key))
}

/// Groups byte `k` of every `stride`-sized word together, which compresses
/// float data considerably better.
fn shuffle(data: &[u8], stride: usize) -> Vec<u8> {
	let mut out = Vec::with_capacity(data.len());
	for offset in 0..stride {
		out.extend(data.iter().skip(offset).step_by(stride));
	}
	debug_assert_eq!(out.len(), data.len());
	out
}

/// Inverts `shuffle()`.
fn unshuffle(data: &[u8], stride: usize) -> Vec<u8> {
	let mut out = vec![0; data.len()];
	let mut src = data.iter();
	for offset in 0..stride {
		for dst in out.iter_mut().skip(offset).step_by(stride) {
			if let Some(b) = src.next() {
				*dst = *b;
			}
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::state::OptimizerState;

	fn sample_weights() -> StateDict {
		let mut dict = StateDict::new();
		dict.insert("w", Tensor::from_shape_vec(&[2, 2], vec![0.5, -1.25, 3.0, 1e-3]).unwrap());
		dict
	}

	#[test]
	fn test_shuffle_inverts_for_ragged_lengths() {
		let data: Vec<u8> = (0..23).collect();
		assert_eq!(unshuffle(&shuffle(&data, 4), 4), data);
		assert_eq!(shuffle(&[1, 2, 3, 4, 5, 6, 7, 8], 4), vec![1, 5, 2, 6, 3, 7, 4, 8]);
	}

	#[test]
	fn test_binary_header_marks_kind() {
		let bytes = weights_to_bytes(&sample_weights(), &SaveOptions::default()).unwrap();
		assert!(bytes.starts_with(record::MAGIC));
		assert_eq!(peek_kind(&bytes).unwrap(), RecordKind::Weights);
		assert!(matches!(
			checkpoint_from_bytes(&bytes),
			Err(HelperError::WrongRecordKind { .. })
		));
	}

	#[test]
	fn test_json_checkpoint_is_not_weights() {
		let checkpoint = Checkpoint {
			model: sample_weights(),
			optimizer: OptimizerState::default(),
		};
		let options = SaveOptions::builder().format(RecordFormat::Json).build();
		let bytes = checkpoint_to_bytes(&checkpoint, &options).unwrap();
		assert_eq!(detect_format(&bytes).unwrap(), RecordFormat::Json);
		assert_eq!(peek_kind(&bytes).unwrap(), RecordKind::Checkpoint);
		assert!(matches!(weights_from_bytes(&bytes), Err(HelperError::WrongRecordKind { .. })));
		assert_eq!(checkpoint_from_bytes(&bytes).unwrap(), checkpoint);
	}

	#[test]
	fn test_quantise_drops_low_bits() {
		let options = SaveOptions::builder().quantise(true).build();
		let bytes = weights_to_bytes(&sample_weights(), &options).unwrap();
		let restored = weights_from_bytes(&bytes).unwrap();
		for v in restored.get("w").unwrap().data.iter() {
			assert_eq!(v.to_bits() & 0x0FFF, 0);
		}
	}

	#[test]
	fn test_quantise_keeps_nan_payload() {
		let nan = f32::from_bits(0x7F80_0001);
		let mut dict = StateDict::new();
		dict.insert("w", Tensor::from_shape_vec(&[2], vec![nan, f32::INFINITY]).unwrap());
		let options = SaveOptions::builder().quantise(true).build();
		let restored = weights_from_bytes(&weights_to_bytes(&dict, &options).unwrap()).unwrap();
		let values = &restored.get("w").unwrap().data;
		assert_eq!(values[[0]].to_bits(), 0x7F80_0001);
		assert_eq!(values[[1]], f32::INFINITY);
	}

	#[test]
	fn test_json_rejects_non_finite_values() {
		let json = SaveOptions::builder().format(RecordFormat::Json).build();
		let mut dict = sample_weights();
		dict.insert("bad", Tensor::from_shape_vec(&[1], vec![f32::NAN]).unwrap());
		assert!(matches!(
			weights_to_bytes(&dict, &json),
			Err(HelperError::Encode(ref msg)) if msg.contains("bad")
		));
		assert!(weights_to_bytes(&dict, &SaveOptions::default()).is_ok());

		let checkpoint = Checkpoint {
			model: sample_weights(),
			optimizer: OptimizerState {
				state: Default::default(),
				param_groups: vec![crate::state::ParamGroup::new(f64::INFINITY, vec![0])],
			},
		};
		assert!(matches!(
			checkpoint_to_bytes(&checkpoint, &json),
			Err(HelperError::Encode(ref msg)) if msg.contains("param_groups.0.lr")
		));
	}

	#[test]
	fn test_json_weights_named_like_checkpoint_fields() {
		let mut dict = StateDict::new();
		dict.insert("model", Tensor::zeros(&[2]));
		dict.insert("optimizer", Tensor::zeros(&[3]));
		let json = SaveOptions::builder().format(RecordFormat::Json).build();
		let bytes = weights_to_bytes(&dict, &json).unwrap();
		assert_eq!(peek_kind(&bytes).unwrap(), RecordKind::Weights);
		assert_eq!(weights_from_bytes(&bytes).unwrap(), dict);
		assert!(checkpoint_from_bytes(&bytes).is_err());
	}

	#[test]
	fn test_subnormals_are_flushed() {
		let mut dict = StateDict::new();
		dict.insert("tiny", Tensor::from_shape_vec(&[1], vec![1e-40]).unwrap());
		let bytes = weights_to_bytes(&dict, &SaveOptions::default()).unwrap();
		assert_eq!(weights_from_bytes(&bytes).unwrap().get("tiny").unwrap().data[[0]], 0.0);
	}

	#[test]
	fn test_garbage_is_rejected() {
		assert!(matches!(detect_format(b"\x00\x01garbage"), Err(HelperError::Decode(_))));
		assert!(weights_from_bytes(b"MHLP").is_err());
		assert!(weights_from_bytes(b"MHLP\x02not xz").is_err());
	}
}
