pub mod seed {
	pub const DEFAULT_SEED: u64 = 1234;
	pub const HASH_SEED_VAR: &str = "PYTHONHASHSEED";
	pub const ALT_DETERMINISM_VAR: &str = "TF_DETERMINISTIC_OPS";
}

pub mod record {
	pub const MAGIC: &[u8; 4] = b"MHLP";
	pub const KIND_CHECKPOINT: u8 = 1;
	pub const KIND_WEIGHTS: u8 = 2;
	pub const HEADER_LEN: usize = 5;
	pub const SHUFFLE_STRIDE: usize = 4;
	pub const DEFAULT_COMPRESSION_LEVEL: u32 = 7;
	pub const MAX_COMPRESSION_LEVEL: u32 = 9;
}

pub mod quantization {
	pub const QUANTIZE_MASK_HIGH: u8 = 0xF0;
	pub const QUANTIZE_MASK_LOW: u8 = 0x00;
}

pub mod file {
	pub const DEFAULT_CONFIG_FILE: &str = "model_helpers.toml";
}
