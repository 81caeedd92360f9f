//! HTTP relayer backend.
//!
//! Posts signed authorizations as JSON to a relayer service that pays gas
//! and broadcasts on the signer's behalf. Large integers are carried as
//! decimal strings so relayers in precision-losing environments can parse
//! them safely. The response shape is opaque beyond the transaction hash
//! and an optional error message; receipts are read from chain state, not
//! from the relayer.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use aiep_types::{
	without_0x_prefix, ChainStateInterface, ExecutionTarget, PendingHandle, SignedAuthorization,
	SubmissionResult, TransactionHash, TypedMessage,
};

use crate::{classify_error, DeliveryError, DeliveryInterface};

/// Backend that posts authorizations to an HTTP relayer.
pub struct RelayerDelivery {
	/// HTTP client, connection-pooled across submissions.
	client: reqwest::Client,
	/// Base URL of the relayer service, without a trailing slash.
	base_url: String,
	/// Chain-state reader used for receipt lookups.
	chain: Arc<dyn ChainStateInterface>,
}

impl RelayerDelivery {
	/// Creates a relayer backend for the given service URL.
	pub fn new(base_url: String, chain: Arc<dyn ChainStateInterface>) -> Self {
		Self {
			client: reqwest::Client::new(),
			base_url: base_url.trim_end_matches('/').to_string(),
			chain,
		}
	}

	/// The fixed relay path for a message type.
	fn path(message: &TypedMessage) -> &'static str {
		match message {
			TypedMessage::PayEth(_) => "/relay/pay-eth",
			TypedMessage::PayErc20(_) => "/relay/pay-erc20",
			TypedMessage::Execute(_) => "/relay/execute",
			TypedMessage::CreateAuthorizedKey(_) => "/relay/create-authorized-key",
		}
	}

	/// Builds the JSON request body for an authorization.
	///
	/// Amounts, values, nonces, and agent ids are decimal strings;
	/// addresses and byte payloads are 0x-prefixed hex.
	fn body(auth: &SignedAuthorization) -> Value {
		let mut body = json!({
			"chainId": auth.domain.chain_id.to_string(),
			"verifyingContract": auth.domain.verifying_contract.to_string(),
			"nonce": auth.message.nonce().to_string(),
			"deadline": auth.message.deadline().to_string(),
			"signature": auth.signature.to_hex(),
		});
		if let Some(agent_id) = auth.message.agent_id() {
			body["agentId"] = json!(agent_id.to_string());
		}
		match &auth.message {
			TypedMessage::PayEth(msg) => {
				body["to"] = json!(msg.to.to_string());
				body["amount"] = json!(msg.amount.to_string());
			}
			TypedMessage::PayErc20(msg) => {
				body["token"] = json!(msg.token.to_string());
				body["to"] = json!(msg.to.to_string());
				body["amount"] = json!(msg.amount.to_string());
			}
			TypedMessage::Execute(msg) => {
				body["target"] = json!(msg.target.to_string());
				body["value"] = json!(msg.value.to_string());
				body["data"] = json!(format!("0x{}", hex::encode(&msg.data)));
			}
			TypedMessage::CreateAuthorizedKey(msg) => {
				body["keyHash"] = json!(format!("0x{}", hex::encode(msg.key_hash)));
				body["expireAt"] = json!(msg.expire_at.to_string());
				body["permissions"] = json!(msg.permissions.to_string());
			}
		}
		if let ExecutionTarget::Counterfactual {
			factory,
			owner,
			signer,
			metadata_uri,
			salt,
		} = &auth.target
		{
			body["deployment"] = json!({
				"factory": factory.to_string(),
				"owner": owner.to_string(),
				"signer": signer.to_string(),
				"metadataURI": metadata_uri,
				"salt": format!("0x{}", hex::encode(salt)),
			});
		}
		body
	}
}

#[async_trait]
impl DeliveryInterface for RelayerDelivery {
	fn name(&self) -> &str {
		"relayer"
	}

	async fn submit(&self, auth: &SignedAuthorization) -> Result<PendingHandle, DeliveryError> {
		let url = format!("{}{}", self.base_url, Self::path(&auth.message));
		let response = self
			.client
			.post(&url)
			.json(&Self::body(auth))
			.send()
			.await
			.map_err(|e| DeliveryError::Transport(format!("Relayer request failed: {}", e)))?;

		let status = response.status();
		let payload: Value = response
			.json()
			.await
			.map_err(|e| DeliveryError::Transport(format!("Invalid relayer response: {}", e)))?;

		if !status.is_success() {
			let message = payload
				.get("error")
				.and_then(Value::as_str)
				.map(str::to_string)
				.unwrap_or_else(|| format!("Relayer returned status {}", status));
			return Err(classify_error(&message));
		}

		let tx_hash = payload
			.get("txHash")
			.and_then(Value::as_str)
			.ok_or_else(|| {
				DeliveryError::Transport("Relayer response missing txHash".to_string())
			})?;
		let bytes = hex::decode(without_0x_prefix(tx_hash)).map_err(|e| {
			DeliveryError::Transport(format!("Relayer returned malformed txHash: {}", e))
		})?;
		tracing::info!(tx_hash, "Relayer accepted authorization");
		Ok(PendingHandle(bytes))
	}

	async fn fetch_result(
		&self,
		handle: &PendingHandle,
	) -> Result<Option<SubmissionResult>, DeliveryError> {
		let receipt = self
			.chain
			.get_receipt(&TransactionHash(handle.0.clone()))
			.await?;
		Ok(receipt.map(|receipt| SubmissionResult::confirmed(handle.clone(), receipt)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use aiep_types::{Domain, PayErc20, Signature};
	use alloy_primitives::{Address, U256};

	fn erc20_auth() -> SignedAuthorization {
		SignedAuthorization {
			domain: Domain::new(1, Address::from([0x11; 20])),
			message: TypedMessage::PayErc20(PayErc20 {
				agent_id: Some(U256::from(7u64)),
				token: Address::from([0x33; 20]),
				to: Address::from([0x22; 20]),
				amount: U256::from(1_000_000_000_000_000_000u128),
				nonce: U256::from(4u64),
				deadline: 1_234_567_890,
			}),
			signature: Signature(vec![0xab; 65]),
			target: ExecutionTarget::Deployed {
				contract: Address::from([0x11; 20]),
			},
		}
	}

	#[test]
	fn test_body_uses_decimal_strings_for_integers() {
		let body = RelayerDelivery::body(&erc20_auth());
		assert_eq!(body["amount"], "1000000000000000000");
		assert_eq!(body["nonce"], "4");
		assert_eq!(body["agentId"], "7");
		assert_eq!(body["deadline"], "1234567890");
		assert!(body.get("deployment").is_none());
	}

	#[test]
	fn test_path_is_fixed_per_message_type() {
		assert_eq!(RelayerDelivery::path(&erc20_auth().message), "/relay/pay-erc20");
	}

	#[test]
	fn test_counterfactual_body_carries_deployment() {
		let mut auth = erc20_auth();
		auth.target = ExecutionTarget::Counterfactual {
			factory: Address::from([0xfa; 20]),
			owner: Address::from([0x01; 20]),
			signer: Address::from([0x02; 20]),
			metadata_uri: "ipfs://agent".to_string(),
			salt: alloy_primitives::B256::from([0x33; 32]),
		};
		let body = RelayerDelivery::body(&auth);
		assert_eq!(body["deployment"]["metadataURI"], "ipfs://agent");
		assert_eq!(
			body["deployment"]["salt"],
			format!("0x{}", "33".repeat(32))
		);
	}
}
