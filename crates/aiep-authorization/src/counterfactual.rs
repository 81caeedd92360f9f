//! Counterfactual agent identities.
//!
//! An agent can authorize actions before its identity contract is deployed:
//! the verifying contract used in the signing domain is the deterministic
//! address the factory will deploy to, and the nonce is fixed at zero. The
//! factory's combined deploy-and-execute entry points then deploy the
//! contract and execute the authorization in one transaction.

use aiep_types::{
	contracts::{decode_computed_address, encode_compute_address},
	ChainStateInterface, ExecutionTarget,
};
use alloy_primitives::{keccak256, Address, B256};

use crate::AuthorizationError;

/// A not-yet-deployed agent identity bound to a factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterfactualAgent {
	/// The factory contract that will deploy the agent.
	pub factory: Address,
	/// The agent owner (cold key).
	pub owner: Address,
	/// The delegated agent signer (hot key).
	pub signer: Address,
	/// Metadata URI passed to the constructor.
	pub metadata_uri: String,
	/// Explicit salt; derived from owner and signer when absent.
	pub salt: Option<B256>,
}

impl CounterfactualAgent {
	/// The salt the deployment address is bound to.
	pub fn salt(&self) -> B256 {
		self.salt
			.unwrap_or_else(|| derive_salt(&self.owner, &self.signer))
	}

	/// Asks the factory for the deterministic deployment address.
	///
	/// The address is a pure function of the factory's deployment bytecode
	/// and the constructor arguments; the factory exposes it as a view call.
	pub async fn compute_address(
		&self,
		chain: &dyn ChainStateInterface,
	) -> Result<Address, AuthorizationError> {
		let call = encode_compute_address(
			self.factory,
			self.owner,
			self.signer,
			&self.metadata_uri,
			self.salt(),
		);
		let data = chain.call(&call).await?;
		Ok(decode_computed_address(&data)?)
	}

	/// The execution target submitters use for this agent.
	pub fn execution_target(&self) -> ExecutionTarget {
		ExecutionTarget::Counterfactual {
			factory: self.factory,
			owner: self.owner,
			signer: self.signer,
			metadata_uri: self.metadata_uri.clone(),
			salt: self.salt(),
		}
	}
}

/// Derives the default deployment salt:
/// keccak256 of the checksummed `owner:signer` string.
pub fn derive_salt(owner: &Address, signer: &Address) -> B256 {
	keccak256(format!("{}:{}", owner, signer).as_bytes())
}
