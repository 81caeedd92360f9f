//! Typed message variants and their canonical EIP-712 struct hashing.
//!
//! Messages are a closed sum type with an exhaustive encode per variant, so
//! a missing field or a wrong width is a compile-time concern rather than a
//! runtime one. The first three variants exist in two shapes: the
//! single-agent shape used by per-agent identity contracts, and the
//! agent-scoped shape with a leading `uint256 agentId` field used by the
//! multi-agent registry contract. `CreateAuthorizedKey` is registry-only.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::Domain;
use crate::eip712::{signing_digest, Eip712Encoder};

/// Canonical type string for single-agent ETH payments.
pub const PAY_ETH_TYPE: &str = "PayEth(address to,uint256 amount,uint256 nonce,uint256 deadline)";
/// Canonical type string for agent-scoped ETH payments.
pub const PAY_ETH_AGENT_TYPE: &str =
	"PayEth(uint256 agentId,address to,uint256 amount,uint256 nonce,uint256 deadline)";
/// Canonical type string for single-agent ERC-20 payments.
pub const PAY_ERC20_TYPE: &str =
	"PayERC20(address token,address to,uint256 amount,uint256 nonce,uint256 deadline)";
/// Canonical type string for agent-scoped ERC-20 payments.
pub const PAY_ERC20_AGENT_TYPE: &str =
	"PayERC20(uint256 agentId,address token,address to,uint256 amount,uint256 nonce,uint256 deadline)";
/// Canonical type string for single-agent arbitrary calls.
pub const EXECUTE_TYPE: &str =
	"Execute(address target,uint256 value,bytes32 dataHash,uint256 nonce,uint256 deadline)";
/// Canonical type string for agent-scoped arbitrary calls.
pub const EXECUTE_AGENT_TYPE: &str =
	"Execute(uint256 agentId,address target,uint256 value,bytes32 dataHash,uint256 nonce,uint256 deadline)";
/// Canonical type string for delegated authorized-key creation.
pub const CREATE_AUTHORIZED_KEY_TYPE: &str =
	"CreateAuthorizedKey(uint256 agentId,bytes32 keyHash,uint256 expireAt,uint256 permissions,uint256 nonce,uint256 deadline)";

/// Native ETH payment from the agent's balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayEth {
	/// Agent id for registry contracts; `None` for per-agent contracts.
	pub agent_id: Option<U256>,
	/// Payment recipient.
	pub to: Address,
	/// Amount in wei.
	pub amount: U256,
	/// Contract nonce the signature is bound to.
	pub nonce: U256,
	/// Unix timestamp after which the contract rejects the authorization.
	pub deadline: u64,
}

/// ERC-20 token payment from the agent's balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayErc20 {
	/// Agent id for registry contracts; `None` for per-agent contracts.
	pub agent_id: Option<U256>,
	/// Token contract address.
	pub token: Address,
	/// Payment recipient.
	pub to: Address,
	/// Amount in the token's smallest unit.
	pub amount: U256,
	/// Contract nonce the signature is bound to.
	pub nonce: U256,
	/// Unix timestamp after which the contract rejects the authorization.
	pub deadline: u64,
}

/// Arbitrary contract call executed by the agent.
///
/// The signed struct carries only `keccak256(data)`; the full call data is
/// kept alongside so the artifact stays self-contained for submitters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execute {
	/// Agent id for registry contracts; `None` for per-agent contracts.
	pub agent_id: Option<U256>,
	/// Call target contract.
	pub target: Address,
	/// ETH value forwarded with the call, in wei.
	pub value: U256,
	/// Opaque call data; hashed into the signed struct.
	pub data: Bytes,
	/// Contract nonce the signature is bound to.
	pub nonce: U256,
	/// Unix timestamp after which the contract rejects the authorization.
	pub deadline: u64,
}

/// Delegated creation of an authorized key on a registry agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAuthorizedKey {
	/// Agent id on the registry contract.
	pub agent_id: U256,
	/// Hash identifying the key being authorized.
	pub key_hash: B256,
	/// Unix expiry of the key; 0 means no expiry.
	pub expire_at: u64,
	/// Permission bitmask granted to the key.
	pub permissions: U256,
	/// Contract nonce the signature is bound to.
	pub nonce: U256,
	/// Unix timestamp after which the contract rejects the authorization.
	pub deadline: u64,
}

/// Tagged variant over every delegated-authorization message type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TypedMessage {
	PayEth(PayEth),
	PayErc20(PayErc20),
	Execute(Execute),
	CreateAuthorizedKey(CreateAuthorizedKey),
}

impl TypedMessage {
	/// The EIP-712 primary type name for this message.
	pub fn primary_type(&self) -> &'static str {
		match self {
			TypedMessage::PayEth(_) => "PayEth",
			TypedMessage::PayErc20(_) => "PayERC20",
			TypedMessage::Execute(_) => "Execute",
			TypedMessage::CreateAuthorizedKey(_) => "CreateAuthorizedKey",
		}
	}

	/// The canonical type signature string hashed into the type hash.
	pub fn type_signature(&self) -> &'static str {
		match self {
			TypedMessage::PayEth(m) if m.agent_id.is_some() => PAY_ETH_AGENT_TYPE,
			TypedMessage::PayEth(_) => PAY_ETH_TYPE,
			TypedMessage::PayErc20(m) if m.agent_id.is_some() => PAY_ERC20_AGENT_TYPE,
			TypedMessage::PayErc20(_) => PAY_ERC20_TYPE,
			TypedMessage::Execute(m) if m.agent_id.is_some() => EXECUTE_AGENT_TYPE,
			TypedMessage::Execute(_) => EXECUTE_TYPE,
			TypedMessage::CreateAuthorizedKey(_) => CREATE_AUTHORIZED_KEY_TYPE,
		}
	}

	/// keccak256 of the canonical type signature.
	pub fn type_hash(&self) -> B256 {
		keccak256(self.type_signature().as_bytes())
	}

	/// The agent id carried by the message, if agent-scoped.
	pub fn agent_id(&self) -> Option<U256> {
		match self {
			TypedMessage::PayEth(m) => m.agent_id,
			TypedMessage::PayErc20(m) => m.agent_id,
			TypedMessage::Execute(m) => m.agent_id,
			TypedMessage::CreateAuthorizedKey(m) => Some(m.agent_id),
		}
	}

	/// The contract nonce the signature is bound to.
	pub fn nonce(&self) -> U256 {
		match self {
			TypedMessage::PayEth(m) => m.nonce,
			TypedMessage::PayErc20(m) => m.nonce,
			TypedMessage::Execute(m) => m.nonce,
			TypedMessage::CreateAuthorizedKey(m) => m.nonce,
		}
	}

	/// The authorization deadline as a unix timestamp.
	pub fn deadline(&self) -> u64 {
		match self {
			TypedMessage::PayEth(m) => m.deadline,
			TypedMessage::PayErc20(m) => m.deadline,
			TypedMessage::Execute(m) => m.deadline,
			TypedMessage::CreateAuthorizedKey(m) => m.deadline,
		}
	}

	/// Computes the EIP-712 struct hash: keccak256(typeHash || encoded fields
	/// in declaration order).
	pub fn struct_hash(&self) -> B256 {
		let mut enc = Eip712Encoder::new();
		enc.push_b256(&self.type_hash());
		match self {
			TypedMessage::PayEth(m) => {
				if let Some(agent_id) = m.agent_id {
					enc.push_u256(agent_id);
				}
				enc.push_address(&m.to);
				enc.push_u256(m.amount);
				enc.push_u256(m.nonce);
				enc.push_u64(m.deadline);
			}
			TypedMessage::PayErc20(m) => {
				if let Some(agent_id) = m.agent_id {
					enc.push_u256(agent_id);
				}
				enc.push_address(&m.token);
				enc.push_address(&m.to);
				enc.push_u256(m.amount);
				enc.push_u256(m.nonce);
				enc.push_u64(m.deadline);
			}
			TypedMessage::Execute(m) => {
				if let Some(agent_id) = m.agent_id {
					enc.push_u256(agent_id);
				}
				enc.push_address(&m.target);
				enc.push_u256(m.value);
				enc.push_b256(&keccak256(&m.data));
				enc.push_u256(m.nonce);
				enc.push_u64(m.deadline);
			}
			TypedMessage::CreateAuthorizedKey(m) => {
				enc.push_u256(m.agent_id);
				enc.push_b256(&m.key_hash);
				enc.push_u64(m.expire_at);
				enc.push_u256(m.permissions);
				enc.push_u256(m.nonce);
				enc.push_u64(m.deadline);
			}
		}
		keccak256(enc.finish())
	}

	/// Computes the final signing digest for this message under a domain.
	pub fn signing_digest(&self, domain: &Domain) -> B256 {
		signing_digest(&domain.separator(), &self.struct_hash())
	}

	/// EIP-712 type definitions for this message, as the `types` entry of a
	/// typed-data document.
	pub fn type_definitions(&self) -> Value {
		let mut fields = Vec::new();
		if self.agent_id().is_some() {
			fields.push(json!({"name": "agentId", "type": "uint256"}));
		}
		match self {
			TypedMessage::PayEth(_) => {
				fields.push(json!({"name": "to", "type": "address"}));
				fields.push(json!({"name": "amount", "type": "uint256"}));
			}
			TypedMessage::PayErc20(_) => {
				fields.push(json!({"name": "token", "type": "address"}));
				fields.push(json!({"name": "to", "type": "address"}));
				fields.push(json!({"name": "amount", "type": "uint256"}));
			}
			TypedMessage::Execute(_) => {
				fields.push(json!({"name": "target", "type": "address"}));
				fields.push(json!({"name": "value", "type": "uint256"}));
				fields.push(json!({"name": "dataHash", "type": "bytes32"}));
			}
			TypedMessage::CreateAuthorizedKey(_) => {
				fields.push(json!({"name": "keyHash", "type": "bytes32"}));
				fields.push(json!({"name": "expireAt", "type": "uint256"}));
				fields.push(json!({"name": "permissions", "type": "uint256"}));
			}
		}
		fields.push(json!({"name": "nonce", "type": "uint256"}));
		fields.push(json!({"name": "deadline", "type": "uint256"}));
		json!({ self.primary_type(): fields })
	}

	/// The message body as a typed-data JSON object, with integers as
	/// 0x-prefixed hex quantities.
	pub fn to_message_json(&self) -> Value {
		let mut body = serde_json::Map::new();
		if let Some(agent_id) = self.agent_id() {
			body.insert("agentId".into(), json!(format!("{agent_id:#x}")));
		}
		match self {
			TypedMessage::PayEth(m) => {
				body.insert("to".into(), json!(m.to.to_string()));
				body.insert("amount".into(), json!(format!("{:#x}", m.amount)));
			}
			TypedMessage::PayErc20(m) => {
				body.insert("token".into(), json!(m.token.to_string()));
				body.insert("to".into(), json!(m.to.to_string()));
				body.insert("amount".into(), json!(format!("{:#x}", m.amount)));
			}
			TypedMessage::Execute(m) => {
				body.insert("target".into(), json!(m.target.to_string()));
				body.insert("value".into(), json!(format!("{:#x}", m.value)));
				body.insert("dataHash".into(), json!(keccak256(&m.data).to_string()));
			}
			TypedMessage::CreateAuthorizedKey(m) => {
				body.insert("keyHash".into(), json!(m.key_hash.to_string()));
				body.insert(
					"expireAt".into(),
					json!(format!("{:#x}", U256::from(m.expire_at))),
				);
				body.insert("permissions".into(), json!(format!("{:#x}", m.permissions)));
			}
		}
		body.insert(
			"nonce".into(),
			json!(format!("{:#x}", self.nonce())),
		);
		body.insert(
			"deadline".into(),
			json!(format!("{:#x}", U256::from(self.deadline()))),
		);
		Value::Object(body)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn addr(byte: u8) -> Address {
		Address::from([byte; 20])
	}

	fn pay_eth() -> TypedMessage {
		TypedMessage::PayEth(PayEth {
			agent_id: None,
			to: addr(0x22),
			amount: U256::from(10u64),
			nonce: U256::ZERO,
			deadline: 1_234_567_890,
		})
	}

	#[test]
	fn test_type_hash_matches_signature_string() {
		let msg = pay_eth();
		assert_eq!(msg.type_hash(), keccak256(PAY_ETH_TYPE.as_bytes()));
	}

	#[test]
	fn test_agent_scoped_type_signature_differs() {
		let plain = pay_eth();
		let scoped = TypedMessage::PayEth(PayEth {
			agent_id: Some(U256::from(1u64)),
			to: addr(0x22),
			amount: U256::from(10u64),
			nonce: U256::ZERO,
			deadline: 1_234_567_890,
		});
		assert_ne!(plain.type_signature(), scoped.type_signature());
		assert_ne!(plain.struct_hash(), scoped.struct_hash());
	}

	#[test]
	fn test_struct_hash_changes_with_amount() {
		let base = pay_eth();
		let changed = TypedMessage::PayEth(PayEth {
			agent_id: None,
			to: addr(0x22),
			amount: U256::from(11u64),
			nonce: U256::ZERO,
			deadline: 1_234_567_890,
		});
		assert_ne!(base.struct_hash(), changed.struct_hash());
	}

	#[test]
	fn test_struct_hash_changes_with_every_field() {
		let base = PayErc20 {
			agent_id: None,
			token: addr(0x33),
			to: addr(0x44),
			amount: U256::from(123u64),
			nonce: U256::ZERO,
			deadline: 1_234_567_890,
		};
		let variants = vec![
			PayErc20 {
				token: addr(0x34),
				..base.clone()
			},
			PayErc20 {
				to: addr(0x45),
				..base.clone()
			},
			PayErc20 {
				amount: U256::from(124u64),
				..base.clone()
			},
			PayErc20 {
				nonce: U256::from(1u64),
				..base.clone()
			},
			PayErc20 {
				deadline: 1_234_567_891,
				..base.clone()
			},
		];
		let base_hash = TypedMessage::PayErc20(base).struct_hash();
		for variant in variants {
			assert_ne!(base_hash, TypedMessage::PayErc20(variant).struct_hash());
		}
	}

	#[test]
	fn test_execute_hashes_call_data() {
		let with_data = |data: &[u8]| {
			TypedMessage::Execute(Execute {
				agent_id: None,
				target: addr(0x55),
				value: U256::ZERO,
				data: Bytes::copy_from_slice(data),
				nonce: U256::ZERO,
				deadline: 1_234_567_890,
			})
		};
		assert_ne!(
			with_data(&[0x01, 0x02]).struct_hash(),
			with_data(&[0x01, 0x03]).struct_hash()
		);
	}

	#[test]
	fn test_digest_is_reproducible() {
		let domain = Domain::new(1, addr(0x11));
		let msg = pay_eth();
		assert_eq!(msg.signing_digest(&domain), msg.signing_digest(&domain));
	}

	#[test]
	fn test_message_json_shape() {
		let msg = pay_eth();
		let body = msg.to_message_json();
		assert_eq!(body["to"], json!(addr(0x22).to_string()));
		assert_eq!(body["amount"], json!("0xa"));
		assert_eq!(body["nonce"], json!("0x0"));
		assert!(body.get("agentId").is_none());
	}
}
