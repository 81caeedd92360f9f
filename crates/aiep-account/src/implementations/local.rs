//! Local private-key signer with two interchangeable digest paths.
//!
//! Path one derives the EIP-712 digest through the generic structured-data
//! facility (`alloy-dyn-abi`'s typed-data resolver); path two computes the
//! digest manually from the message's struct hash and the domain separator.
//! Both feed the same raw-hash ECDSA signing, so for a given key and message
//! they produce bit-identical signatures. The path is selected once at
//! initialization by probing the structured facility against the manual
//! digest; any probe failure falls back to the manual path with no
//! caller-visible difference.

use async_trait::async_trait;

use aiep_types::{Domain, PayEth, SecretString, Signature, TypedMessage};
use alloy_dyn_abi::TypedData;
use alloy_primitives::{Address, B256, U256};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;

use crate::{AccountError, SignerInterface};

/// Which digest derivation a [`LocalSigner`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestPath {
	/// Derive the digest through the typed-data resolver.
	StructuredData,
	/// Compute the digest from the struct hash and domain separator.
	Manual,
}

/// Signer backed by an in-memory private key.
#[derive(Debug)]
pub struct LocalSigner {
	/// The underlying key.
	inner: PrivateKeySigner,
	/// The digest path selected at initialization.
	path: DigestPath,
}

impl LocalSigner {
	/// Creates a signer from a 0x-prefixed hex private key, probing the
	/// structured-data facility to select the digest path.
	pub fn from_secret(private_key: &SecretString) -> Result<Self, AccountError> {
		let inner: PrivateKeySigner = private_key.with_exposed(|key| {
			key.parse()
				.map_err(|_| AccountError::InvalidKey("not a 32-byte hex private key".to_string()))
		})?;
		let path = match probe_structured_path() {
			Ok(()) => DigestPath::StructuredData,
			Err(e) => {
				tracing::debug!(error = %e, "structured-data probe failed, using manual digest path");
				DigestPath::Manual
			}
		};
		Ok(Self { inner, path })
	}

	/// Creates a signer pinned to a specific digest path.
	///
	/// The probing constructor is the normal entry point; this one exists
	/// for the equivalence checks between the two paths.
	pub fn from_secret_with_path(
		private_key: &SecretString,
		path: DigestPath,
	) -> Result<Self, AccountError> {
		let inner: PrivateKeySigner = private_key.with_exposed(|key| {
			key.parse()
				.map_err(|_| AccountError::InvalidKey("not a 32-byte hex private key".to_string()))
		})?;
		Ok(Self { inner, path })
	}

	/// The digest path this signer resolved to.
	pub fn digest_path(&self) -> DigestPath {
		self.path
	}

	/// Derives the digest for a message according to the selected path.
	fn digest(&self, domain: &Domain, message: &TypedMessage) -> B256 {
		match self.path {
			DigestPath::Manual => message.signing_digest(domain),
			DigestPath::StructuredData => match structured_digest(domain, message) {
				Ok(digest) => digest,
				// The facility misbehaved after a clean probe; the manual
				// path is always available and byte-identical.
				Err(e) => {
					tracing::debug!(error = %e, "structured-data digest failed, using manual digest");
					message.signing_digest(domain)
				}
			},
		}
	}
}

#[async_trait]
impl SignerInterface for LocalSigner {
	fn address(&self) -> Address {
		self.inner.address()
	}

	async fn sign_digest(&self, digest: &B256) -> Result<Signature, AccountError> {
		let signature = self
			.inner
			.sign_hash(digest)
			.await
			.map_err(|e| AccountError::SigningFailed(e.to_string()))?;
		Ok(Signature::new(signature.as_bytes().to_vec()))
	}

	async fn sign_message(
		&self,
		domain: &Domain,
		message: &TypedMessage,
	) -> Result<Signature, AccountError> {
		let digest = self.digest(domain, message);
		self.sign_digest(&digest).await
	}
}

/// Derives the EIP-712 digest through the typed-data resolver.
fn structured_digest(domain: &Domain, message: &TypedMessage) -> Result<B256, AccountError> {
	let types: alloy_dyn_abi::Eip712Types = serde_json::from_value(message.type_definitions())
		.map_err(|e| AccountError::SigningFailed(format!("type resolution: {}", e)))?;
	let typed = TypedData {
		domain: domain.to_sol_domain(),
		resolver: types.into(),
		primary_type: message.primary_type().to_string(),
		message: message.to_message_json(),
	};
	typed
		.eip712_signing_hash()
		.map_err(|e| AccountError::SigningFailed(format!("typed-data hashing: {}", e)))
}

/// Probes the structured-data facility with a fixture message and checks
/// its digest against the manual computation.
fn probe_structured_path() -> Result<(), AccountError> {
	let domain = Domain::new(1, Address::ZERO);
	let message = TypedMessage::PayEth(PayEth {
		agent_id: None,
		to: Address::ZERO,
		amount: U256::ZERO,
		nonce: U256::ZERO,
		deadline: 0,
	});
	let structured = structured_digest(&domain, &message)?;
	if structured != message.signing_digest(&domain) {
		return Err(AccountError::DigestMismatch);
	}
	Ok(())
}

/// Creates a boxed signer from a private key.
pub fn create_signer(private_key: &SecretString) -> Result<Box<dyn SignerInterface>, AccountError> {
	Ok(Box::new(LocalSigner::from_secret(private_key)?))
}
