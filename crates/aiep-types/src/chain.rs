//! Chain-state reader trait used by builders and submitters.
//!
//! The chain is the single source of truth for nonces and deployment state;
//! nothing in the SDK caches or increments chain state locally. Concurrent
//! authorization builds against a stale nonce are allowed to race, and the
//! losing one surfaces as an on-chain rejection at submission time.

use async_trait::async_trait;
use thiserror::Error;

use alloy_primitives::Address;

use crate::contracts::ContractCall;
use crate::delivery::{TransactionHash, TransactionReceipt};

/// Errors that can occur while reading chain state or broadcasting.
#[derive(Debug, Error)]
pub enum ChainError {
	/// Error returned by the RPC endpoint or the transport beneath it.
	#[error("RPC error: {0}")]
	Rpc(String),
	/// Error that occurs when a response cannot be decoded.
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
}

/// Trait defining the chain-state collaborator.
///
/// Implementations wrap a JSON-RPC provider. The SDK's builders use the read
/// methods; the direct and bundle submission backends additionally use the
/// broadcast methods.
#[async_trait]
pub trait ChainStateInterface: Send + Sync {
	/// The chain id of the connected network.
	async fn chain_id(&self) -> Result<u64, ChainError>;

	/// The deployed bytecode at an address; empty when not deployed.
	async fn get_code(&self, address: Address) -> Result<Vec<u8>, ChainError>;

	/// Executes a read-only contract call and returns the raw return data.
	async fn call(&self, call: &ContractCall) -> Result<Vec<u8>, ChainError>;

	/// Estimates gas for the given call.
	async fn estimate_gas(&self, call: &ContractCall) -> Result<u64, ChainError>;

	/// The current recommended gas price in wei.
	async fn gas_price(&self) -> Result<u128, ChainError>;

	/// The latest block number. Used by the bundle backend to target the
	/// next block.
	async fn block_number(&self) -> Result<u64, ChainError>;

	/// Signs and broadcasts a transaction for the given call, returning its
	/// hash.
	async fn send_transaction(&self, call: &ContractCall) -> Result<TransactionHash, ChainError>;

	/// Builds and signs a raw transaction for the given call without
	/// broadcasting it, returning the hash it will have and the encoded
	/// bytes. Used by the block-builder bundle backend.
	async fn build_raw_transaction(
		&self,
		call: &ContractCall,
	) -> Result<(TransactionHash, Vec<u8>), ChainError>;

	/// The receipt for a transaction, or `None` while it is unmined.
	async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, ChainError>;
}
