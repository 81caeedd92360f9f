//! EIP-712 domain separator for the agent identity contract.
//!
//! Every authorization signed against a given deployed contract instance
//! shares an identical domain; the separator changes only when the signing
//! contract address or the chain changes.

use alloy_primitives::{keccak256, Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::eip712::Eip712Encoder;

/// The fixed domain name baked into the agent identity contract.
pub const DOMAIN_NAME: &str = "AetheriaAgentDID";

/// The fixed domain version baked into the agent identity contract.
pub const DOMAIN_VERSION: &str = "1";

/// Canonical EIP-712 domain type string, including the version field.
pub const DOMAIN_TYPE: &str =
	"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// EIP-712 signing domain for a contract instance.
///
/// Immutable value object constructed fresh per authorization; the name and
/// version components are fixed protocol constants and only the chain id and
/// verifying contract vary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
	/// The chain ID where signatures are valid.
	pub chain_id: u64,
	/// The contract that verifies signatures over this domain.
	pub verifying_contract: Address,
}

impl Domain {
	/// Creates a domain for the given chain and verifying contract.
	pub fn new(chain_id: u64, verifying_contract: Address) -> Self {
		Self {
			chain_id,
			verifying_contract,
		}
	}

	/// Computes the domain separator hash:
	/// keccak256(abi.encode(typeHash, nameHash, versionHash, chainId, verifyingContract)).
	pub fn separator(&self) -> B256 {
		let mut enc = Eip712Encoder::new();
		enc.push_b256(&keccak256(DOMAIN_TYPE.as_bytes()));
		enc.push_b256(&keccak256(DOMAIN_NAME.as_bytes()));
		enc.push_b256(&keccak256(DOMAIN_VERSION.as_bytes()));
		enc.push_u64(self.chain_id);
		enc.push_address(&self.verifying_contract);
		keccak256(enc.finish())
	}

	/// Converts to the `alloy-sol-types` domain representation used by the
	/// structured-data signer path.
	pub fn to_sol_domain(&self) -> alloy_sol_types::Eip712Domain {
		alloy_sol_types::Eip712Domain {
			name: Some(DOMAIN_NAME.into()),
			version: Some(DOMAIN_VERSION.into()),
			chain_id: Some(U256::from(self.chain_id)),
			verifying_contract: Some(self.verifying_contract),
			salt: None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn contract() -> Address {
		"0x1111111111111111111111111111111111111111"
			.parse()
			.unwrap()
	}

	#[test]
	fn test_separator_is_stable() {
		let domain = Domain::new(1, contract());
		assert_eq!(domain.separator(), domain.separator());
	}

	#[test]
	fn test_separator_changes_with_chain_id() {
		let a = Domain::new(1, contract());
		let b = Domain::new(5, contract());
		assert_ne!(a.separator(), b.separator());
	}

	#[test]
	fn test_separator_changes_with_contract() {
		let a = Domain::new(1, contract());
		let b = Domain::new(
			1,
			"0x2222222222222222222222222222222222222222"
				.parse()
				.unwrap(),
		);
		assert_ne!(a.separator(), b.separator());
	}

	#[test]
	fn test_separator_matches_sol_domain() {
		let domain = Domain::new(1, contract());
		assert_eq!(domain.separator(), domain.to_sol_domain().hash_struct());
	}
}
