//! Read-side client for a deployed agent identity contract.

use std::sync::Arc;

use aiep_types::{
	contracts::{decode_nonce, encode_nonce_call},
	build_did, ChainStateInterface,
};
use alloy_primitives::{Address, U256};

use crate::AuthorizationError;

/// Wraps the chain-state reader for contract reads against one agent.
pub struct AgentClient {
	chain: Arc<dyn ChainStateInterface>,
	contract: Address,
	agent_id: Option<U256>,
}

impl AgentClient {
	/// Creates a client for the given contract and optional agent id.
	pub fn new(
		chain: Arc<dyn ChainStateInterface>,
		contract: Address,
		agent_id: Option<U256>,
	) -> Self {
		Self {
			chain,
			contract,
			agent_id,
		}
	}

	/// Reads the current authorization nonce from the contract.
	///
	/// Always read immediately before building a message; the chain is the
	/// single source of truth and the nonce is consumed only by successful
	/// on-chain execution.
	pub async fn nonce(&self) -> Result<U256, AuthorizationError> {
		let call = encode_nonce_call(self.contract, self.agent_id);
		let data = self.chain.call(&call).await?;
		Ok(decode_nonce(&data)?)
	}

	/// Whether the contract has code on-chain.
	pub async fn is_deployed(&self) -> Result<bool, AuthorizationError> {
		let code = self.chain.get_code(self.contract).await?;
		Ok(!code.is_empty())
	}

	/// The DID string of the agent identity.
	pub async fn did(&self) -> Result<String, AuthorizationError> {
		let chain_id = self.chain.chain_id().await?;
		Ok(build_did(chain_id, &self.contract, self.agent_id))
	}
}
