//! Authorization builder for the AIEP delegated-authorization SDK.
//!
//! This module assembles signed authorizations: it reads the current
//! contract nonce from chain state, fills in a deadline, constructs the
//! typed message, obtains a digest and signature through the account
//! service, and returns a self-contained [`SignedAuthorization`] artifact
//! that any submission backend can execute and verify independently.
//!
//! Builds are side-effect-free; nothing is broadcast and no nonce is
//! consumed until a submitter lands the authorization on-chain. Concurrent
//! builds against the same agent may race on the nonce, and the loser
//! surfaces as an on-chain rejection at submission time.

use std::sync::Arc;

use thiserror::Error;

use aiep_account::{AccountError, AccountService};
use aiep_types::{
	current_timestamp, ChainError, ChainStateInterface, CreateAuthorizedKey, Domain, EncodeError,
	ExecutionTarget, Execute, PayErc20, PayEth, SignedAuthorization, TypedMessage,
};
use alloy_primitives::{Address, Bytes, B256, U256};

pub mod agent;
pub mod counterfactual;

pub use agent::AgentClient;
pub use counterfactual::{derive_salt, CounterfactualAgent};

/// Seconds added to the current time when no deadline is supplied.
pub const DEFAULT_DEADLINE_SECS: u64 = 3600;

/// Errors that can occur while building authorizations.
#[derive(Debug, Error)]
pub enum AuthorizationError {
	/// Error that occurs while reading chain state.
	#[error("Chain state error: {0}")]
	Chain(#[from] ChainError),
	/// Error that occurs in the signing account.
	#[error("Account error: {0}")]
	Account(#[from] AccountError),
	/// Error that occurs while encoding contract interactions.
	#[error("Encoding error: {0}")]
	Encode(#[from] EncodeError),
	/// Error that occurs when an operation does not fit the agent binding.
	#[error("Invalid binding: {0}")]
	InvalidBinding(String),
}

/// The agent identity an authorization is built against.
#[derive(Debug, Clone)]
pub enum AgentBinding {
	/// A deployed identity contract, optionally agent-scoped on a registry.
	Deployed {
		/// The identity contract address.
		contract: Address,
		/// The agent id on registry contracts.
		agent_id: Option<U256>,
	},
	/// A not-yet-deployed identity at a deterministic address.
	Counterfactual(CounterfactualAgent),
}

/// Service that builds signed authorizations.
pub struct AuthorizationService {
	/// Chain-state reader; the single source of truth for nonces.
	chain: Arc<dyn ChainStateInterface>,
	/// The signing account.
	account: Arc<AccountService>,
}

impl AuthorizationService {
	/// Creates a new AuthorizationService over a chain-state reader and an
	/// account.
	pub fn new(chain: Arc<dyn ChainStateInterface>, account: Arc<AccountService>) -> Self {
		Self { chain, account }
	}

	/// Builds a signed native-ETH payment authorization.
	pub async fn build_pay_eth(
		&self,
		binding: &AgentBinding,
		to: Address,
		amount: U256,
		deadline: Option<u64>,
	) -> Result<SignedAuthorization, AuthorizationError> {
		let prepared = self.prepare(binding).await?;
		let message = TypedMessage::PayEth(PayEth {
			agent_id: prepared.agent_id,
			to,
			amount,
			nonce: prepared.nonce,
			deadline: resolve_deadline(deadline),
		});
		self.seal(prepared, message).await
	}

	/// Builds a signed ERC-20 payment authorization.
	pub async fn build_pay_erc20(
		&self,
		binding: &AgentBinding,
		token: Address,
		to: Address,
		amount: U256,
		deadline: Option<u64>,
	) -> Result<SignedAuthorization, AuthorizationError> {
		let prepared = self.prepare(binding).await?;
		let message = TypedMessage::PayErc20(PayErc20 {
			agent_id: prepared.agent_id,
			token,
			to,
			amount,
			nonce: prepared.nonce,
			deadline: resolve_deadline(deadline),
		});
		self.seal(prepared, message).await
	}

	/// Builds a signed arbitrary-call authorization.
	///
	/// The full call data is kept in the artifact; only its keccak256 hash
	/// enters the signed struct.
	pub async fn build_execute(
		&self,
		binding: &AgentBinding,
		target: Address,
		value: U256,
		data: Bytes,
		deadline: Option<u64>,
	) -> Result<SignedAuthorization, AuthorizationError> {
		let prepared = self.prepare(binding).await?;
		let message = TypedMessage::Execute(Execute {
			agent_id: prepared.agent_id,
			target,
			value,
			data,
			nonce: prepared.nonce,
			deadline: resolve_deadline(deadline),
		});
		self.seal(prepared, message).await
	}

	/// Builds a signed authorized-key creation for a registry agent.
	pub async fn build_create_authorized_key(
		&self,
		binding: &AgentBinding,
		key_hash: B256,
		expire_at: u64,
		permissions: U256,
		deadline: Option<u64>,
	) -> Result<SignedAuthorization, AuthorizationError> {
		let prepared = self.prepare(binding).await?;
		let agent_id = prepared.agent_id.ok_or_else(|| {
			AuthorizationError::InvalidBinding(
				"authorized keys require an agent-scoped registry binding".to_string(),
			)
		})?;
		let message = TypedMessage::CreateAuthorizedKey(CreateAuthorizedKey {
			agent_id,
			key_hash,
			expire_at,
			permissions,
			nonce: prepared.nonce,
			deadline: resolve_deadline(deadline),
		});
		self.seal(prepared, message).await
	}

	/// Resolves the binding into a domain, nonce, and execution target.
	async fn prepare(&self, binding: &AgentBinding) -> Result<Prepared, AuthorizationError> {
		let chain_id = self.chain.chain_id().await?;
		match binding {
			AgentBinding::Deployed { contract, agent_id } => {
				let client = AgentClient::new(self.chain.clone(), *contract, *agent_id);
				let nonce = client.nonce().await?;
				Ok(Prepared {
					domain: Domain::new(chain_id, *contract),
					nonce,
					agent_id: *agent_id,
					target: ExecutionTarget::Deployed {
						contract: *contract,
					},
				})
			}
			AgentBinding::Counterfactual(agent) => {
				let address = agent.compute_address(self.chain.as_ref()).await?;
				// The contract does not exist yet, so its nonce is zero by
				// construction.
				Ok(Prepared {
					domain: Domain::new(chain_id, address),
					nonce: U256::ZERO,
					agent_id: None,
					target: agent.execution_target(),
				})
			}
		}
	}

	/// Signs the message and assembles the final artifact.
	async fn seal(
		&self,
		prepared: Prepared,
		message: TypedMessage,
	) -> Result<SignedAuthorization, AuthorizationError> {
		let signature = self.account.sign_message(&prepared.domain, &message).await?;
		let auth = SignedAuthorization {
			domain: prepared.domain,
			message,
			signature,
			target: prepared.target,
		};
		tracing::debug!(
			did = %auth.did(),
			message = auth.message.primary_type(),
			nonce = %auth.message.nonce(),
			deadline = auth.message.deadline(),
			"Built signed authorization"
		);
		Ok(auth)
	}
}

/// Intermediate state shared by every build operation.
struct Prepared {
	domain: Domain,
	nonce: U256,
	agent_id: Option<U256>,
	target: ExecutionTarget,
}

/// The caller-supplied deadline, or now + [`DEFAULT_DEADLINE_SECS`].
fn resolve_deadline(deadline: Option<u64>) -> u64 {
	deadline.unwrap_or_else(|| current_timestamp() + DEFAULT_DEADLINE_SECS)
}

#[cfg(test)]
mod tests {
	use super::*;
	use aiep_account::implementations::local::LocalSigner;
	use async_trait::async_trait;
	use aiep_types::{
		contracts::{encode_compute_address, IAgentFactory},
		ContractCall, SecretString, TransactionHash, TransactionReceipt,
	};
	use alloy_sol_types::SolCall;

	const TEST_KEY: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";

	/// Chain-state stub returning canned nonce and address reads.
	struct MockChainState {
		chain_id: u64,
		nonce: U256,
		computed: Address,
		code: Vec<u8>,
	}

	#[async_trait]
	impl ChainStateInterface for MockChainState {
		async fn chain_id(&self) -> Result<u64, ChainError> {
			Ok(self.chain_id)
		}

		async fn get_code(&self, _address: Address) -> Result<Vec<u8>, ChainError> {
			Ok(self.code.clone())
		}

		async fn call(&self, call: &ContractCall) -> Result<Vec<u8>, ChainError> {
			if call.data[..4] == IAgentFactory::computeAddressCall::SELECTOR {
				let mut word = [0u8; 32];
				word[12..].copy_from_slice(self.computed.as_slice());
				Ok(word.to_vec())
			} else {
				Ok(self.nonce.to_be_bytes::<32>().to_vec())
			}
		}

		async fn estimate_gas(&self, _call: &ContractCall) -> Result<u64, ChainError> {
			Ok(21_000)
		}

		async fn gas_price(&self) -> Result<u128, ChainError> {
			Ok(1_000_000_000)
		}

		async fn block_number(&self) -> Result<u64, ChainError> {
			Ok(1)
		}

		async fn send_transaction(
			&self,
			_call: &ContractCall,
		) -> Result<TransactionHash, ChainError> {
			Ok(TransactionHash(vec![0x01; 32]))
		}

		async fn build_raw_transaction(
			&self,
			_call: &ContractCall,
		) -> Result<(TransactionHash, Vec<u8>), ChainError> {
			Ok((TransactionHash(vec![0x01; 32]), vec![0x02; 8]))
		}

		async fn get_receipt(
			&self,
			_hash: &TransactionHash,
		) -> Result<Option<TransactionReceipt>, ChainError> {
			Ok(None)
		}
	}

	fn service(chain: MockChainState) -> AuthorizationService {
		let signer = LocalSigner::from_secret(&SecretString::from(TEST_KEY)).unwrap();
		AuthorizationService::new(
			Arc::new(chain),
			Arc::new(AccountService::new(Box::new(signer))),
		)
	}

	fn deployed_binding() -> AgentBinding {
		AgentBinding::Deployed {
			contract: Address::from([0x11; 20]),
			agent_id: None,
		}
	}

	#[tokio::test]
	async fn test_build_pay_eth_reads_nonce_from_chain() {
		let service = service(MockChainState {
			chain_id: 31337,
			nonce: U256::from(5u64),
			computed: Address::ZERO,
			code: vec![0x60],
		});
		let auth = service
			.build_pay_eth(
				&deployed_binding(),
				Address::from([0x22; 20]),
				U256::from(10u64),
				Some(1_234_567_890),
			)
			.await
			.unwrap();
		assert_eq!(auth.message.nonce(), U256::from(5u64));
		assert_eq!(auth.domain.chain_id, 31337);
		assert_eq!(auth.domain.verifying_contract, Address::from([0x11; 20]));
		assert_eq!(auth.message.deadline(), 1_234_567_890);
	}

	#[tokio::test]
	async fn test_default_deadline_is_an_hour_out() {
		let service = service(MockChainState {
			chain_id: 1,
			nonce: U256::ZERO,
			computed: Address::ZERO,
			code: vec![0x60],
		});
		let before = current_timestamp();
		let auth = service
			.build_pay_eth(
				&deployed_binding(),
				Address::from([0x22; 20]),
				U256::from(10u64),
				None,
			)
			.await
			.unwrap();
		assert!(auth.message.deadline() >= before + DEFAULT_DEADLINE_SECS);
	}

	#[tokio::test]
	async fn test_counterfactual_build_uses_precomputed_address_and_zero_nonce() {
		let precomputed = Address::from([0xcf; 20]);
		let service = service(MockChainState {
			chain_id: 1,
			nonce: U256::from(99u64),
			computed: precomputed,
			code: vec![],
		});
		let agent = CounterfactualAgent {
			factory: Address::from([0xfa; 20]),
			owner: Address::from([0x01; 20]),
			signer: Address::from([0x02; 20]),
			metadata_uri: "ipfs://agent".to_string(),
			salt: None,
		};
		let auth = service
			.build_pay_eth(
				&AgentBinding::Counterfactual(agent.clone()),
				Address::from([0x22; 20]),
				U256::from(10u64),
				Some(1_234_567_890),
			)
			.await
			.unwrap();
		assert_eq!(auth.message.nonce(), U256::ZERO);
		assert_eq!(auth.domain.verifying_contract, precomputed);
		assert_eq!(auth.target, agent.execution_target());
	}

	#[tokio::test]
	async fn test_create_authorized_key_requires_registry_binding() {
		let service = service(MockChainState {
			chain_id: 1,
			nonce: U256::ZERO,
			computed: Address::ZERO,
			code: vec![0x60],
		});
		let err = service
			.build_create_authorized_key(
				&deployed_binding(),
				B256::from([0x44; 32]),
				0,
				U256::from(0b111u64),
				Some(1_234_567_890),
			)
			.await
			.unwrap_err();
		assert!(matches!(err, AuthorizationError::InvalidBinding(_)));
	}

	#[tokio::test]
	async fn test_artifact_digest_recovers_to_account_address() {
		let service = service(MockChainState {
			chain_id: 1,
			nonce: U256::ZERO,
			computed: Address::ZERO,
			code: vec![0x60],
		});
		let auth = service
			.build_pay_eth(
				&AgentBinding::Deployed {
					contract: Address::from([0x11; 20]),
					agent_id: Some(U256::from(1u64)),
				},
				Address::from([0x22; 20]),
				U256::from(10u64),
				Some(1_234_567_890),
			)
			.await
			.unwrap();
		let digest = auth.signing_digest();
		let parsed =
			alloy_primitives::PrimitiveSignature::try_from(auth.signature.as_bytes()).unwrap();
		let signer = LocalSigner::from_secret(&SecretString::from(TEST_KEY)).unwrap();
		use aiep_account::SignerInterface;
		assert_eq!(
			parsed.recover_address_from_prehash(&digest).unwrap(),
			signer.address()
		);
	}

	#[test]
	fn test_compute_address_call_is_pure_encoding() {
		let a = encode_compute_address(
			Address::from([0xfa; 20]),
			Address::from([0x01; 20]),
			Address::from([0x02; 20]),
			"ipfs://agent",
			B256::from([0x33; 32]),
		);
		let b = encode_compute_address(
			Address::from([0xfa; 20]),
			Address::from([0x01; 20]),
			Address::from([0x02; 20]),
			"ipfs://agent",
			B256::from([0x33; 32]),
		);
		assert_eq!(a, b);
	}
}
