//! Static contract call tables and submission encoding.
//!
//! The `sol!` definitions below are the SDK's ABI tables: static
//! configuration generated once at compile time and never mutated. Three
//! surfaces exist in the protocol: the per-agent account contract, the
//! multi-agent registry, and the factory with its deploy-and-execute entry
//! points for counterfactual flows.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall};
use thiserror::Error;

use crate::authorization::{ExecutionTarget, SignedAuthorization};
use crate::message::TypedMessage;

sol! {
	/// Per-agent identity contract: one agent per deployment.
	interface IAgentAccount {
		function getNonce() external view returns (uint256);
		function delegatedPayEth(address to, uint256 amount, uint256 deadline, bytes calldata signature) external;
		function delegatedPayERC20(address token, address to, uint256 amount, uint256 deadline, bytes calldata signature) external;
		function delegatedExecute(address target, uint256 value, bytes calldata data, uint256 deadline, bytes calldata signature) external;
	}

	/// Multi-agent registry contract: agent state keyed by agent id.
	interface IAgentRegistry {
		function getNonce(uint256 agentId) external view returns (uint256);
		function delegatedPayEth(uint256 agentId, address to, uint256 amount, uint256 deadline, bytes calldata signature) external;
		function delegatedPayERC20(uint256 agentId, address token, address to, uint256 amount, uint256 deadline, bytes calldata signature) external;
		function delegatedExecute(uint256 agentId, address target, uint256 value, bytes calldata data, uint256 deadline, bytes calldata signature) external;
		function delegatedCreateAuthorizedKey(uint256 agentId, bytes32 keyHash, uint256 expireAt, uint256 permissions, uint256 deadline, bytes calldata signature) external;
	}

	/// Factory contract deploying agent accounts at deterministic addresses.
	interface IAgentFactory {
		function computeAddress(address owner, address signer, string calldata metadataURI, bytes32 salt) external view returns (address);
		function deployAgent(address owner, address signer, string calldata metadataURI, bytes32 salt) external returns (address);
		function deployAndDelegatedPayEth(address owner, address signer, string calldata metadataURI, bytes32 salt, address to, uint256 amount, uint256 deadline, bytes calldata signature) external returns (address);
		function deployAndDelegatedPayERC20(address owner, address signer, string calldata metadataURI, bytes32 salt, address token, address to, uint256 amount, uint256 deadline, bytes calldata signature) external returns (address);
		function deployAndDelegatedExecute(address owner, address signer, string calldata metadataURI, bytes32 salt, address target, uint256 value, bytes calldata data, uint256 deadline, bytes calldata signature) external returns (address);
	}
}

/// Errors that can occur while encoding or decoding contract interactions.
#[derive(Debug, Error)]
pub enum EncodeError {
	/// Error that occurs when a message cannot execute against its target.
	#[error("Unknown message type for target: {0}")]
	UnknownMessageType(String),
	/// Error that occurs when contract return data cannot be decoded.
	#[error("Invalid return data: {0}")]
	InvalidReturnData(String),
}

/// A fully encoded contract interaction ready for broadcast or `eth_call`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
	/// The contract the call is addressed to.
	pub to: Address,
	/// ETH value attached to the call, in wei.
	pub value: U256,
	/// ABI-encoded call data.
	pub data: Vec<u8>,
}

impl ContractCall {
	/// A zero-value call carrying the given data.
	pub fn new(to: Address, data: Vec<u8>) -> Self {
		Self {
			to,
			value: U256::ZERO,
			data,
		}
	}
}

/// Encodes the on-chain call that executes a signed authorization.
///
/// Deployed targets route to the agent contract's `delegated*` entry points
/// (registry variants when the message is agent-scoped); counterfactual
/// targets route to the factory's combined deploy-and-execute entry points.
pub fn encode_submission(auth: &SignedAuthorization) -> Result<ContractCall, EncodeError> {
	let signature = Bytes::copy_from_slice(auth.signature.as_bytes());
	match &auth.target {
		ExecutionTarget::Deployed { contract } => {
			let data = match &auth.message {
				TypedMessage::PayEth(m) => match m.agent_id {
					None => IAgentAccount::delegatedPayEthCall {
						to: m.to,
						amount: m.amount,
						deadline: U256::from(m.deadline),
						signature,
					}
					.abi_encode(),
					Some(agent_id) => IAgentRegistry::delegatedPayEthCall {
						agentId: agent_id,
						to: m.to,
						amount: m.amount,
						deadline: U256::from(m.deadline),
						signature,
					}
					.abi_encode(),
				},
				TypedMessage::PayErc20(m) => match m.agent_id {
					None => IAgentAccount::delegatedPayERC20Call {
						token: m.token,
						to: m.to,
						amount: m.amount,
						deadline: U256::from(m.deadline),
						signature,
					}
					.abi_encode(),
					Some(agent_id) => IAgentRegistry::delegatedPayERC20Call {
						agentId: agent_id,
						token: m.token,
						to: m.to,
						amount: m.amount,
						deadline: U256::from(m.deadline),
						signature,
					}
					.abi_encode(),
				},
				TypedMessage::Execute(m) => match m.agent_id {
					None => IAgentAccount::delegatedExecuteCall {
						target: m.target,
						value: m.value,
						data: m.data.clone(),
						deadline: U256::from(m.deadline),
						signature,
					}
					.abi_encode(),
					Some(agent_id) => IAgentRegistry::delegatedExecuteCall {
						agentId: agent_id,
						target: m.target,
						value: m.value,
						data: m.data.clone(),
						deadline: U256::from(m.deadline),
						signature,
					}
					.abi_encode(),
				},
				TypedMessage::CreateAuthorizedKey(m) => {
					IAgentRegistry::delegatedCreateAuthorizedKeyCall {
						agentId: m.agent_id,
						keyHash: m.key_hash,
						expireAt: U256::from(m.expire_at),
						permissions: m.permissions,
						deadline: U256::from(m.deadline),
						signature,
					}
					.abi_encode()
				}
			};
			Ok(ContractCall::new(*contract, data))
		}
		ExecutionTarget::Counterfactual {
			factory,
			owner,
			signer,
			metadata_uri,
			salt,
		} => {
			if auth.message.agent_id().is_some() {
				return Err(EncodeError::UnknownMessageType(
					"agent-scoped messages cannot execute counterfactually".to_string(),
				));
			}
			let data = match &auth.message {
				TypedMessage::PayEth(m) => IAgentFactory::deployAndDelegatedPayEthCall {
					owner: *owner,
					signer: *signer,
					metadataURI: metadata_uri.clone(),
					salt: *salt,
					to: m.to,
					amount: m.amount,
					deadline: U256::from(m.deadline),
					signature,
				}
				.abi_encode(),
				TypedMessage::PayErc20(m) => IAgentFactory::deployAndDelegatedPayERC20Call {
					owner: *owner,
					signer: *signer,
					metadataURI: metadata_uri.clone(),
					salt: *salt,
					token: m.token,
					to: m.to,
					amount: m.amount,
					deadline: U256::from(m.deadline),
					signature,
				}
				.abi_encode(),
				TypedMessage::Execute(m) => IAgentFactory::deployAndDelegatedExecuteCall {
					owner: *owner,
					signer: *signer,
					metadataURI: metadata_uri.clone(),
					salt: *salt,
					target: m.target,
					value: m.value,
					data: m.data.clone(),
					deadline: U256::from(m.deadline),
					signature,
				}
				.abi_encode(),
				TypedMessage::CreateAuthorizedKey(_) => {
					// Unreachable in practice: the message always carries an
					// agent id, which is rejected above.
					return Err(EncodeError::UnknownMessageType(
						"the factory has no deploy-and-create-authorized-key entry point"
							.to_string(),
					));
				}
			};
			Ok(ContractCall::new(*factory, data))
		}
	}
}

/// Encodes the read of a contract nonce for the given agent binding.
pub fn encode_nonce_call(contract: Address, agent_id: Option<U256>) -> ContractCall {
	let data = match agent_id {
		None => IAgentAccount::getNonceCall {}.abi_encode(),
		Some(agent_id) => IAgentRegistry::getNonceCall { agentId: agent_id }.abi_encode(),
	};
	ContractCall::new(contract, data)
}

/// Decodes the return data of a nonce read.
pub fn decode_nonce(data: &[u8]) -> Result<U256, EncodeError> {
	IAgentAccount::getNonceCall::abi_decode_returns(data, true)
		.map(|ret| ret._0)
		.map_err(|e| EncodeError::InvalidReturnData(format!("getNonce: {}", e)))
}

/// Encodes the factory's deterministic address computation.
pub fn encode_compute_address(
	factory: Address,
	owner: Address,
	signer: Address,
	metadata_uri: &str,
	salt: B256,
) -> ContractCall {
	let data = IAgentFactory::computeAddressCall {
		owner,
		signer,
		metadataURI: metadata_uri.to_string(),
		salt,
	}
	.abi_encode();
	ContractCall::new(factory, data)
}

/// Decodes the return data of a `computeAddress` call.
pub fn decode_computed_address(data: &[u8]) -> Result<Address, EncodeError> {
	IAgentFactory::computeAddressCall::abi_decode_returns(data, true)
		.map(|ret| ret._0)
		.map_err(|e| EncodeError::InvalidReturnData(format!("computeAddress: {}", e)))
}

/// Encodes the ERC-4337 `initCode` deploying a counterfactual agent:
/// the factory address followed by the `deployAgent` call data.
pub fn encode_init_code(
	factory: Address,
	owner: Address,
	signer: Address,
	metadata_uri: &str,
	salt: B256,
) -> Vec<u8> {
	let mut init_code = factory.as_slice().to_vec();
	init_code.extend_from_slice(
		&IAgentFactory::deployAgentCall {
			owner,
			signer,
			metadataURI: metadata_uri.to_string(),
			salt,
		}
		.abi_encode(),
	);
	init_code
}
