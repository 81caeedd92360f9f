//! Account management module for the AIEP delegated-authorization SDK.
//!
//! This module provides abstractions for the cryptographic signer behind an
//! agent identity. It defines the signer interface, the error taxonomy for
//! key handling, and a service wrapper around a boxed implementation.
//!
//! Signatures are produced over the EIP-712 digest of a typed message; the
//! local implementation supports two interchangeable digest paths that are
//! proven equivalent by the test suite.

use async_trait::async_trait;
use thiserror::Error;

use aiep_types::{Domain, Signature, TypedMessage};
use alloy_primitives::{Address, B256};

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// Error that occurs when signing operations fail.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// Error that occurs when a private key is malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// Internal consistency failure: the structured-data digest disagrees
	/// with the manual digest. Never surfaced to callers; it only steers
	/// the path selection at initialization.
	#[error("Digest mismatch between encoder paths")]
	DigestMismatch,
}

/// Trait defining the interface for signer implementations.
///
/// Implementations produce 65-byte recoverable signatures such that
/// recovering the signature over the digest yields [`Self::address`].
#[async_trait]
pub trait SignerInterface: Send + Sync {
	/// The address corresponding to the signing key.
	fn address(&self) -> Address;

	/// Signs a precomputed 32-byte digest.
	async fn sign_digest(&self, digest: &B256) -> Result<Signature, AccountError>;

	/// Derives the EIP-712 digest for the message under the domain and
	/// signs it.
	async fn sign_message(
		&self,
		domain: &Domain,
		message: &TypedMessage,
	) -> Result<Signature, AccountError>;
}

/// Service that manages signing operations.
///
/// Wraps an underlying signer implementation behind a uniform interface,
/// following the service pattern used across the SDK.
pub struct AccountService {
	/// The underlying signer implementation.
	implementation: Box<dyn SignerInterface>,
}

impl AccountService {
	/// Creates a new AccountService with the specified implementation.
	pub fn new(implementation: Box<dyn SignerInterface>) -> Self {
		Self { implementation }
	}

	/// The address of the managed signing key.
	pub fn address(&self) -> Address {
		self.implementation.address()
	}

	/// Signs a typed message under a domain.
	pub async fn sign_message(
		&self,
		domain: &Domain,
		message: &TypedMessage,
	) -> Result<Signature, AccountError> {
		self.implementation.sign_message(domain, message).await
	}

	/// Signs a precomputed digest.
	pub async fn sign_digest(&self, digest: &B256) -> Result<Signature, AccountError> {
		self.implementation.sign_digest(digest).await
	}
}
