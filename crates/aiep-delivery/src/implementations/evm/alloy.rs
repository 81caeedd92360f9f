//! Alloy-backed chain state and direct broadcast backend.
//!
//! [`AlloyChainState`] wraps an HTTP JSON-RPC provider behind the
//! chain-state trait used by builders and submitters. [`DirectDelivery`]
//! is the simplest backend: it encodes the authorization into its target
//! contract call and broadcasts through the provider's own wallet.

use std::sync::Arc;

use alloy_eips::eip2718::Encodable2718;
use alloy_network::{EthereumWallet, TransactionBuilder};
use alloy_primitives::{Address, FixedBytes};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport_http::Http;
use async_trait::async_trait;

use aiep_types::{
	encode_submission, with_0x_prefix, ChainError, ChainStateInterface, ContractCall,
	PendingHandle, SignedAuthorization, SubmissionResult, TransactionHash, TransactionReceipt,
};

use crate::{DeliveryError, DeliveryInterface};

/// Chain-state reader and broadcaster over an Alloy HTTP provider.
///
/// The provider signs with the wallet installed at construction time, so
/// broadcast transactions are funded by the submitter key, never the
/// authorization signer.
pub struct AlloyChainState {
	/// Provider with recommended fillers and the submitter wallet.
	provider: Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>,
	/// Wallet retained for offline raw-transaction building.
	wallet: EthereumWallet,
	/// The submitter address transactions are sent from.
	sender: Address,
	/// Chain id fetched once at construction.
	chain_id: u64,
}

impl AlloyChainState {
	/// Connects to the RPC endpoint and probes its chain id.
	pub async fn new(rpc_url: &str, signer: PrivateKeySigner) -> Result<Self, ChainError> {
		let url = rpc_url
			.parse()
			.map_err(|e| ChainError::Rpc(format!("Invalid RPC URL: {}", e)))?;
		let sender = signer.address();
		let wallet = EthereumWallet::from(signer);
		let provider = ProviderBuilder::new()
			.with_recommended_fillers()
			.wallet(wallet.clone())
			.on_http(url);
		let chain_id = provider
			.get_chain_id()
			.await
			.map_err(|e| ChainError::Rpc(format!("Failed to get chain id: {}", e)))?;
		Ok(Self {
			provider: Arc::new(provider),
			wallet,
			sender,
			chain_id,
		})
	}

	fn request(&self, call: &ContractCall) -> TransactionRequest {
		TransactionRequest::default()
			.with_to(call.to)
			.with_value(call.value)
			.with_input(call.data.clone())
	}
}

#[async_trait]
impl ChainStateInterface for AlloyChainState {
	async fn chain_id(&self) -> Result<u64, ChainError> {
		Ok(self.chain_id)
	}

	async fn get_code(&self, address: Address) -> Result<Vec<u8>, ChainError> {
		let code = self
			.provider
			.get_code_at(address)
			.await
			.map_err(|e| ChainError::Rpc(format!("Failed to get code: {}", e)))?;
		Ok(code.to_vec())
	}

	async fn call(&self, call: &ContractCall) -> Result<Vec<u8>, ChainError> {
		let data = self
			.provider
			.call(&self.request(call))
			.await
			.map_err(|e| ChainError::Rpc(format!("Call failed: {}", e)))?;
		Ok(data.to_vec())
	}

	async fn estimate_gas(&self, call: &ContractCall) -> Result<u64, ChainError> {
		self.provider
			.estimate_gas(&self.request(call).with_from(self.sender))
			.await
			.map_err(|e| ChainError::Rpc(format!("Failed to estimate gas: {}", e)))
	}

	async fn gas_price(&self) -> Result<u128, ChainError> {
		self.provider
			.get_gas_price()
			.await
			.map_err(|e| ChainError::Rpc(format!("Failed to get gas price: {}", e)))
	}

	async fn block_number(&self) -> Result<u64, ChainError> {
		self.provider
			.get_block_number()
			.await
			.map_err(|e| ChainError::Rpc(format!("Failed to get block number: {}", e)))
	}

	async fn send_transaction(&self, call: &ContractCall) -> Result<TransactionHash, ChainError> {
		// The provider's fillers supply nonce and fees; its wallet signs.
		let pending = self
			.provider
			.send_transaction(self.request(call))
			.await
			.map_err(|e| ChainError::Rpc(format!("Failed to send transaction: {}", e)))?;
		let hash = *pending.tx_hash();
		let hash_str = with_0x_prefix(&hex::encode(hash.0));
		tracing::info!(tx_hash = %hash_str, chain_id = self.chain_id, "Broadcast transaction");
		Ok(TransactionHash(hash.0.to_vec()))
	}

	async fn build_raw_transaction(
		&self,
		call: &ContractCall,
	) -> Result<(TransactionHash, Vec<u8>), ChainError> {
		let nonce = self
			.provider
			.get_transaction_count(self.sender)
			.await
			.map_err(|e| ChainError::Rpc(format!("Failed to get transaction count: {}", e)))?;
		let mut request = self
			.request(call)
			.with_from(self.sender)
			.with_nonce(nonce)
			.with_chain_id(self.chain_id);
		let gas = self
			.provider
			.estimate_gas(&request)
			.await
			.map_err(|e| ChainError::Rpc(format!("Failed to estimate gas: {}", e)))?;
		let gas_price = self.gas_price().await?;
		request = request.with_gas_limit(gas).with_gas_price(gas_price);
		let envelope = request
			.build(&self.wallet)
			.await
			.map_err(|e| ChainError::Rpc(format!("Failed to sign transaction: {}", e)))?;
		let hash = *envelope.tx_hash();
		Ok((TransactionHash(hash.0.to_vec()), envelope.encoded_2718()))
	}

	async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, ChainError> {
		if hash.0.len() != 32 {
			return Err(ChainError::InvalidResponse(format!(
				"Transaction hash must be 32 bytes, got {}",
				hash.0.len()
			)));
		}
		let tx_hash = FixedBytes::<32>::from_slice(&hash.0);
		match self.provider.get_transaction_receipt(tx_hash).await {
			Ok(Some(receipt)) => Ok(Some(TransactionReceipt {
				hash: TransactionHash(receipt.transaction_hash.0.to_vec()),
				block_number: receipt.block_number.unwrap_or(0),
				success: receipt.status(),
			})),
			Ok(None) => Ok(None),
			Err(e) => Err(ChainError::Rpc(format!("Failed to get receipt: {}", e))),
		}
	}
}

/// Backend that broadcasts authorizations directly through the provider.
pub struct DirectDelivery {
	chain: Arc<dyn ChainStateInterface>,
}

impl DirectDelivery {
	/// Creates a direct backend over a chain-state broadcaster.
	pub fn new(chain: Arc<dyn ChainStateInterface>) -> Self {
		Self { chain }
	}
}

#[async_trait]
impl DeliveryInterface for DirectDelivery {
	fn name(&self) -> &str {
		"direct"
	}

	async fn submit(&self, auth: &SignedAuthorization) -> Result<PendingHandle, DeliveryError> {
		let call = encode_submission(auth)?;
		let hash = self.chain.send_transaction(&call).await?;
		Ok(PendingHandle(hash.0))
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
