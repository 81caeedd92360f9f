//! DID string construction and parsing.
//!
//! Agent identities are addressed as
//! `did:ethr:<chainId>:<lowercased address>[:<agentId>]`, where the agent id
//! segment appears only for registry-scoped agents.

use alloy_primitives::{Address, U256};
use thiserror::Error;

/// Method prefix of every agent DID.
pub const DID_PREFIX: &str = "did:ethr";

/// Errors that can occur when parsing a DID string.
#[derive(Debug, Error)]
pub enum DidError {
	/// Error that occurs when the DID string does not match the expected
	/// shape.
	#[error("Malformed DID '{0}': {1}")]
	Malformed(String, String),
}

/// Components of a parsed agent DID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDid {
	/// The chain the identity lives on.
	pub chain_id: u64,
	/// The identity contract address.
	pub address: Address,
	/// The agent id for registry contracts.
	pub agent_id: Option<U256>,
}

/// Builds the DID string for an agent identity.
pub fn build_did(chain_id: u64, address: &Address, agent_id: Option<U256>) -> String {
	let base = format!(
		"{}:{}:0x{}",
		DID_PREFIX,
		chain_id,
		hex::encode(address.as_slice())
	);
	match agent_id {
		Some(agent_id) => format!("{}:{}", base, agent_id),
		None => base,
	}
}

/// Parses a DID string back into its components.
pub fn parse_did(did: &str) -> Result<ParsedDid, DidError> {
	let malformed = |reason: &str| DidError::Malformed(did.to_string(), reason.to_string());

	let parts: Vec<&str> = did.split(':').collect();
	if parts.len() < 4 || parts.len() > 5 {
		return Err(malformed("expected 4 or 5 colon-separated segments"));
	}
	if parts[0] != "did" || parts[1] != "ethr" {
		return Err(malformed("expected the did:ethr prefix"));
	}

	let chain_id: u64 = parts[2]
		.parse()
		.map_err(|_| malformed("chain id is not an unsigned integer"))?;
	let address: Address = parts[3]
		.parse()
		.map_err(|_| malformed("invalid contract address"))?;
	let agent_id = match parts.get(4) {
		Some(segment) => Some(
			U256::from_str_radix(segment, 10)
				.map_err(|_| malformed("agent id is not an unsigned integer"))?,
		),
		None => None,
	};

	Ok(ParsedDid {
		chain_id,
		address,
		agent_id,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn addr() -> Address {
		"0x5FbDB2315678afecb367f032d93F642f64180aa3"
			.parse()
			.unwrap()
	}

	#[test]
	fn test_build_did_lowercases_address() {
		let did = build_did(1, &addr(), None);
		assert_eq!(
			did,
			"did:ethr:1:0x5fbdb2315678afecb367f032d93f642f64180aa3"
		);
	}

	#[test]
	fn test_build_did_with_agent_id() {
		let did = build_did(31337, &addr(), Some(U256::from(7u64)));
		assert!(did.ends_with(":7"));
	}

	#[test]
	fn test_round_trip() {
		for agent_id in [None, Some(U256::from(42u64))] {
			let did = build_did(5, &addr(), agent_id);
			let parsed = parse_did(&did).unwrap();
			assert_eq!(parsed.chain_id, 5);
			assert_eq!(parsed.address, addr());
			assert_eq!(parsed.agent_id, agent_id);
		}
	}

	#[test]
	fn test_parse_rejects_wrong_prefix() {
		assert!(parse_did("did:web:1:0x5fbdb2315678afecb367f032d93f642f64180aa3").is_err());
		assert!(parse_did("did:ethr:1").is_err());
		assert!(parse_did("did:ethr:x:0x5fbdb2315678afecb367f032d93f642f64180aa3").is_err());
	}
}
