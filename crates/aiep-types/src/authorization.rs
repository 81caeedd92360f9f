//! Signed authorization artifacts.
//!
//! A [`SignedAuthorization`] is the self-contained, replayable output of the
//! authorization builder: it carries the domain, the exact message fields
//! that were hashed, the signature, and the execution target, so any
//! downstream submitter can reconstruct and check the digest independently
//! without re-querying chain state.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

use crate::did::build_did;
use crate::domain::Domain;
use crate::message::TypedMessage;

/// A 65-byte recoverable ECDSA signature (r || s || v), opaque to every
/// component except the signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(pub Vec<u8>);

impl Signature {
	/// Wraps raw signature bytes.
	pub fn new(bytes: Vec<u8>) -> Self {
		Self(bytes)
	}

	/// The raw signature bytes.
	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}

	/// The signature as a 0x-prefixed hex string.
	pub fn to_hex(&self) -> String {
		format!("0x{}", hex::encode(&self.0))
	}
}

impl std::fmt::Display for Signature {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.to_hex())
	}
}

/// Where a signed authorization executes on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExecutionTarget {
	/// A deployed agent contract; delegated calls go straight to it.
	Deployed {
		/// The agent contract address.
		contract: Address,
	},
	/// A not-yet-deployed agent at a deterministically derived address;
	/// submission routes through the factory's deploy-and-execute entry
	/// points.
	Counterfactual {
		/// The factory contract that deploys the agent.
		factory: Address,
		/// The agent owner (cold key).
		owner: Address,
		/// The delegated agent signer (hot key).
		signer: Address,
		/// Metadata URI passed to the factory constructor arguments.
		metadata_uri: String,
		/// CREATE2-style salt the address derivation is bound to.
		salt: B256,
	},
}

/// A complete, replayable delegated authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAuthorization {
	/// The domain the message was signed against; for counterfactual flows
	/// the verifying contract is the precomputed deployment address.
	pub domain: Domain,
	/// The exact message fields that were hashed and signed.
	pub message: TypedMessage,
	/// The 65-byte recoverable signature over the digest.
	pub signature: Signature,
	/// Where submitters should execute the authorization.
	pub target: ExecutionTarget,
}

impl SignedAuthorization {
	/// Recomputes the signing digest from the embedded domain and message.
	///
	/// Submitters use this to verify the artifact without chain access.
	pub fn signing_digest(&self) -> B256 {
		self.message.signing_digest(&self.domain)
	}

	/// The DID string identifying the authorizing agent.
	pub fn did(&self) -> String {
		build_did(
			self.domain.chain_id,
			&self.domain.verifying_contract,
			self.message.agent_id(),
		)
	}
}
