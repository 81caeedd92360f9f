//! Generic EIP-712 hashing utilities shared across the SDK.
//!
//! These helpers provide:
//! - A minimal ABI encoder for the static field types used by agent messages
//! - Final digest computation (0x1901 || domainHash || structHash)
//!
//! Encoding order and widths are a correctness invariant: a field encoded in
//! the wrong width or position produces a digest that recovers the wrong
//! signer without any error surfacing. Every value is encoded as a single
//! 32-byte word, addresses as their 20 raw bytes left-padded with zeros.

use alloy_primitives::{keccak256, Address, B256, U256};

/// Minimal ABI encoder for static types used in EIP-712 struct hashing.
pub struct Eip712Encoder {
	buf: Vec<u8>,
}

impl Default for Eip712Encoder {
	fn default() -> Self {
		Self::new()
	}
}

impl Eip712Encoder {
	pub fn new() -> Self {
		Self { buf: Vec::new() }
	}

	pub fn push_b256(&mut self, v: &B256) {
		self.buf.extend_from_slice(v.as_slice());
	}

	pub fn push_address(&mut self, addr: &Address) {
		let mut word = [0u8; 32];
		word[12..].copy_from_slice(addr.as_slice());
		self.buf.extend_from_slice(&word);
	}

	pub fn push_u256(&mut self, v: U256) {
		let word: [u8; 32] = v.to_be_bytes::<32>();
		self.buf.extend_from_slice(&word);
	}

	pub fn push_u64(&mut self, v: u64) {
		self.push_u256(U256::from(v));
	}

	pub fn finish(self) -> Vec<u8> {
		self.buf
	}
}

/// Compute the final EIP-712 digest: keccak256(0x19 || 0x01 || domainHash || structHash).
///
/// Pure function with no I/O; both signer paths must consume byte-identical
/// output from this function.
pub fn signing_digest(domain_hash: &B256, struct_hash: &B256) -> B256 {
	let mut out = Vec::with_capacity(2 + 32 + 32);
	out.push(0x19);
	out.push(0x01);
	out.extend_from_slice(domain_hash.as_slice());
	out.extend_from_slice(struct_hash.as_slice());
	keccak256(out)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_encoder_pads_address_to_word() {
		let addr: Address = "0x2222222222222222222222222222222222222222"
			.parse()
			.unwrap();
		let mut enc = Eip712Encoder::new();
		enc.push_address(&addr);
		let bytes = enc.finish();
		assert_eq!(bytes.len(), 32);
		assert_eq!(&bytes[..12], &[0u8; 12]);
		assert_eq!(&bytes[12..], addr.as_slice());
	}

	#[test]
	fn test_encoder_u256_big_endian() {
		let mut enc = Eip712Encoder::new();
		enc.push_u256(U256::from(10u64));
		let bytes = enc.finish();
		assert_eq!(bytes.len(), 32);
		assert_eq!(bytes[31], 10);
		assert_eq!(&bytes[..31], &[0u8; 31]);
	}

	#[test]
	fn test_signing_digest_uses_1901_prefix() {
		let domain_hash = keccak256(b"domain");
		let struct_hash = keccak256(b"struct");
		let mut expected = Vec::new();
		expected.extend_from_slice(&[0x19, 0x01]);
		expected.extend_from_slice(domain_hash.as_slice());
		expected.extend_from_slice(struct_hash.as_slice());
		assert_eq!(
			signing_digest(&domain_hash, &struct_hash),
			keccak256(expected)
		);
	}
}
