//! Common types module for the AIEP delegated-authorization SDK.
//!
//! This module defines the core data types and structures used throughout
//! the SDK. It provides a centralized location for shared types to ensure
//! consistency across all components: the EIP-712 domain and message
//! variants, signing digests, authorization artifacts, the chain-state
//! collaborator trait, and submission results.

/// Signed authorization artifacts and signature bytes.
pub mod authorization;
/// Chain-state reader trait used by builders and submitters.
pub mod chain;
/// Static contract call tables and submission encoding.
pub mod contracts;
/// Submission handles, receipts, and result types.
pub mod delivery;
/// DID string construction and parsing.
pub mod did;
/// EIP-712 domain separator for the agent identity contract.
pub mod domain;
/// Minimal ABI encoder and digest computation for EIP-712 hashing.
pub mod eip712;
/// Typed message variants and their canonical struct hashing.
pub mod message;
/// Secure string type for private keys.
pub mod secret_string;
/// Utility functions for hex prefixes and timestamps.
pub mod utils;

// Re-export all types for convenient access
pub use authorization::*;
pub use chain::*;
pub use contracts::{encode_submission, ContractCall, EncodeError};
pub use delivery::*;
pub use did::*;
pub use domain::*;
pub use message::*;
pub use secret_string::SecretString;
pub use utils::{current_timestamp, with_0x_prefix, without_0x_prefix};
