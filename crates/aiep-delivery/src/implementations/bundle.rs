//! Block-builder bundle backend.
//!
//! Signs the authorization's contract call as a raw transaction offline
//! and submits it to a block builder with `eth_sendBundle`, targeting the
//! next block. Builders give no acknowledgment beyond accepting the
//! bundle, so the pending handle wraps the raw transaction's own hash and
//! results are read from chain state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use aiep_types::{
	encode_submission, ChainStateInterface, PendingHandle, SignedAuthorization, SubmissionResult,
	TransactionHash,
};

use crate::{classify_error, DeliveryError, DeliveryInterface};

/// Backend that submits authorizations through a block builder.
pub struct BundleDelivery {
	/// HTTP client for the builder's JSON-RPC endpoint.
	client: reqwest::Client,
	/// Builder JSON-RPC URL.
	url: String,
	/// Chain-state reader used for signing and receipt lookups.
	chain: Arc<dyn ChainStateInterface>,
	/// Incrementing JSON-RPC request id.
	request_id: AtomicU64,
}

impl BundleDelivery {
	/// Creates a bundle backend for the given builder endpoint.
	pub fn new(url: String, chain: Arc<dyn ChainStateInterface>) -> Self {
		Self {
			client: reqwest::Client::new(),
			url,
			chain,
			request_id: AtomicU64::new(1),
		}
	}
}

#[async_trait]
impl DeliveryInterface for BundleDelivery {
	fn name(&self) -> &str {
		"bundle"
	}

	async fn submit(&self, auth: &SignedAuthorization) -> Result<PendingHandle, DeliveryError> {
		let call = encode_submission(auth)?;
		let (tx_hash, raw_tx) = self.chain.build_raw_transaction(&call).await?;
		let target_block = self.chain.block_number().await? + 1;

		let id = self.request_id.fetch_add(1, Ordering::SeqCst);
		let response: Value = self
			.client
			.post(&self.url)
			.json(&json!({
				"jsonrpc": "2.0",
				"id": id,
				"method": "eth_sendBundle",
				"params": [{
					"txs": [format!("0x{}", hex::encode(&raw_tx))],
					"blockNumber": format!("{:#x}", target_block),
				}],
			}))
			.send()
			.await
			.map_err(|e| DeliveryError::Transport(format!("Builder request failed: {}", e)))?
			.json()
			.await
			.map_err(|e| DeliveryError::Transport(format!("Invalid builder response: {}", e)))?;

		if let Some(error) = response.get("error") {
			let message = error
				.get("message")
				.and_then(Value::as_str)
				.unwrap_or("builder error");
			return Err(classify_error(message));
		}

		tracing::info!(
			tx_hash = %tx_hash,
			target_block,
			"Builder accepted bundle"
		);
		Ok(PendingHandle(tx_hash.0))
	}

	async fn fetch_result(
		&self,
		handle: &PendingHandle,
	) -> Result<Option<SubmissionResult>, DeliveryError> {
		// Bundles can silently miss their target block; an absent receipt
		// here just means not included yet.
		let receipt = self
			.chain
			.get_receipt(&TransactionHash(handle.0.clone()))
			.await?;
		Ok(receipt.map(|receipt| SubmissionResult::confirmed(handle.clone(), receipt)))
	}
}
