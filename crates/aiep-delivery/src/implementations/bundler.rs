//! Account-abstraction bundler backend.
//!
//! Wraps a signed authorization in a user operation and submits it through
//! a bundler's JSON-RPC endpoint with `eth_sendUserOperation`. The sender
//! is the agent identity contract itself; for counterfactual agents the
//! operation carries the factory init code so the bundler deploys the
//! contract in the same operation. Results come back through
//! `eth_getUserOperationReceipt`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use aiep_types::{
	contracts::encode_init_code, encode_submission, without_0x_prefix, ChainStateInterface,
	ExecutionTarget, PendingHandle, SignedAuthorization, SubmissionResult, TransactionHash,
	TransactionReceipt,
};
use alloy_primitives::Address;

use crate::{classify_error, DeliveryError, DeliveryInterface};

/// Gas defaults for user operations the bundler may re-estimate.
const DEFAULT_CALL_GAS_LIMIT: u64 = 1_000_000;
const DEFAULT_VERIFICATION_GAS_LIMIT: u64 = 150_000;
const DEFAULT_PRE_VERIFICATION_GAS: u64 = 50_000;

/// Backend that submits authorizations as user operations.
pub struct BundlerDelivery {
	/// HTTP client for the bundler's JSON-RPC endpoint.
	client: reqwest::Client,
	/// Bundler JSON-RPC URL.
	url: String,
	/// The entry point contract the bundler executes against.
	entry_point: Address,
	/// Chain-state reader used for fee data.
	chain: Arc<dyn ChainStateInterface>,
	/// Incrementing JSON-RPC request id.
	request_id: AtomicU64,
}

impl BundlerDelivery {
	/// Creates a bundler backend for the given endpoint and entry point.
	pub fn new(url: String, entry_point: Address, chain: Arc<dyn ChainStateInterface>) -> Self {
		Self {
			client: reqwest::Client::new(),
			url,
			entry_point,
			chain,
			request_id: AtomicU64::new(1),
		}
	}

	/// Sends one JSON-RPC request and returns the `result` value.
	async fn rpc(&self, method: &str, params: Value) -> Result<Value, DeliveryError> {
		let id = self.request_id.fetch_add(1, Ordering::SeqCst);
		let response: Value = self
			.client
			.post(&self.url)
			.json(&json!({
				"jsonrpc": "2.0",
				"id": id,
				"method": method,
				"params": params,
			}))
			.send()
			.await
			.map_err(|e| DeliveryError::Transport(format!("Bundler request failed: {}", e)))?
			.json()
			.await
			.map_err(|e| DeliveryError::Transport(format!("Invalid bundler response: {}", e)))?;

		if let Some(error) = response.get("error") {
			let message = error
				.get("message")
				.and_then(Value::as_str)
				.unwrap_or("bundler error");
			return Err(classify_error(message));
		}
		response
			.get("result")
			.cloned()
			.ok_or_else(|| DeliveryError::Transport("Bundler response missing result".to_string()))
	}

	/// Builds the user-operation JSON for an authorization.
	///
	/// The call data is the delegated call encoded against the agent
	/// contract; the entry point invokes it on the sender after
	/// verification.
	async fn user_operation(&self, auth: &SignedAuthorization) -> Result<Value, DeliveryError> {
		let sender = auth.domain.verifying_contract;

		// Encode against the deployed form regardless of target kind; for
		// counterfactual agents the init code handles deployment.
		let mut deployed = auth.clone();
		deployed.target = ExecutionTarget::Deployed { contract: sender };
		let call = encode_submission(&deployed)?;

		let init_code = match &auth.target {
			ExecutionTarget::Deployed { .. } => Vec::new(),
			ExecutionTarget::Counterfactual {
				factory,
				owner,
				signer,
				metadata_uri,
				salt,
			} => encode_init_code(*factory, *owner, *signer, metadata_uri, *salt),
		};

		let gas_price = self.chain.gas_price().await?;
		Ok(json!({
			"sender": sender.to_string(),
			"nonce": format!("{:#x}", auth.message.nonce()),
			"initCode": format!("0x{}", hex::encode(&init_code)),
			"callData": format!("0x{}", hex::encode(&call.data)),
			"callGasLimit": format!("{:#x}", DEFAULT_CALL_GAS_LIMIT),
			"verificationGasLimit": format!("{:#x}", DEFAULT_VERIFICATION_GAS_LIMIT),
			"preVerificationGas": format!("{:#x}", DEFAULT_PRE_VERIFICATION_GAS),
			"maxFeePerGas": format!("{:#x}", gas_price),
			"maxPriorityFeePerGas": format!("{:#x}", gas_price),
			"paymasterAndData": "0x",
			"signature": auth.signature.to_hex(),
		}))
	}
}

#[async_trait]
impl DeliveryInterface for BundlerDelivery {
	fn name(&self) -> &str {
		"bundler"
	}

	async fn submit(&self, auth: &SignedAuthorization) -> Result<PendingHandle, DeliveryError> {
		let user_op = self.user_operation(auth).await?;
		let result = self
			.rpc(
				"eth_sendUserOperation",
				json!([user_op, self.entry_point.to_string()]),
			)
			.await?;
		let hash = result.as_str().ok_or_else(|| {
			DeliveryError::Transport("Bundler returned non-string user-op hash".to_string())
		})?;
		let bytes = hex::decode(without_0x_prefix(hash)).map_err(|e| {
			DeliveryError::Transport(format!("Bundler returned malformed hash: {}", e))
		})?;
		tracing::info!(user_op_hash = hash, "Bundler accepted user operation");
		Ok(PendingHandle(bytes))
	}

	async fn fetch_result(
		&self,
		handle: &PendingHandle,
	) -> Result<Option<SubmissionResult>, DeliveryError> {
		let result = self
			.rpc("eth_getUserOperationReceipt", json!([handle.to_hex()]))
			.await?;
		if result.is_null() {
			return Ok(None);
		}

		let success = result
			.get("success")
			.and_then(Value::as_bool)
			.unwrap_or(false);
		let receipt = result.get("receipt").ok_or_else(|| {
			DeliveryError::Transport("User-op receipt missing inner receipt".to_string())
		})?;
		let tx_hash = receipt
			.get("transactionHash")
			.and_then(Value::as_str)
			.ok_or_else(|| {
				DeliveryError::Transport("User-op receipt missing transactionHash".to_string())
			})?;
		let hash_bytes = hex::decode(without_0x_prefix(tx_hash)).map_err(|e| {
			DeliveryError::Transport(format!("Malformed transactionHash: {}", e))
		})?;
		let block_number = receipt
			.get("blockNumber")
			.and_then(Value::as_str)
			.and_then(|s| u64::from_str_radix(without_0x_prefix(s), 16).ok())
			.unwrap_or(0);

		Ok(Some(SubmissionResult::confirmed(
			handle.clone(),
			TransactionReceipt {
				hash: TransactionHash(hash_bytes),
				block_number,
				success,
			},
		)))
	}
}
