//! Submission backends for signed authorizations.
//!
//! This module handles getting a [`SignedAuthorization`] on-chain. It
//! provides a uniform interface over four backend kinds: direct broadcast
//! through a JSON-RPC provider, an HTTP relayer, an account-abstraction
//! bundler, and block-builder bundle submission. Every backend exposes the
//! same two operations, submit and fetch-result, so the retry loop and
//! callers never branch on the backend kind.
//!
//! Upstream failure text is normalized into a small error taxonomy by
//! case-insensitive substring matching. This is a best-effort heuristic:
//! a revert reason that merely contains a matched word will misclassify,
//! which is why the original message is always preserved in the error.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use aiep_types::{ChainError, EncodeError, PendingHandle, SignedAuthorization, SubmissionResult};

pub mod retry;

pub mod implementations {
	pub mod bundle;
	pub mod bundler;
	pub mod evm {
		pub mod alloy;
	}
	pub mod relayer;
}

pub use retry::RetryPolicy;

/// Errors that can occur during authorization submission.
///
/// The classified variants let callers branch on kind instead of raw text;
/// [`DeliveryError::Transport`] carries upstream messages no pattern
/// recognized.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// The authorization's deadline passed before execution.
	#[error("Authorization expired: {0}")]
	UserOpExpired(String),
	/// The paying account cannot cover the transfer plus gas.
	#[error("Insufficient funds: {0}")]
	InsufficientFunds(String),
	/// The contract rejected the signature.
	#[error("Invalid signature: {0}")]
	SignatureInvalid(String),
	/// The call executed and reverted.
	#[error("Execution reverted: {0}")]
	ExecutionReverted(String),
	/// Error that occurs while encoding the submission; local and never
	/// retried.
	#[error("Encoding error: {0}")]
	Encode(#[from] EncodeError),
	/// Error that occurs when no backend is registered under a name.
	#[error("No backend available: {0}")]
	NoBackendAvailable(String),
	/// Any other transport or upstream failure, message preserved verbatim.
	#[error("Transport error: {0}")]
	Transport(String),
}

impl DeliveryError {
	/// Whether the retry loop should attempt this submission again.
	///
	/// Encoding failures are deterministic and excluded; everything the
	/// chain or transport produced may be transient from the submitter's
	/// point of view.
	pub fn is_retryable(&self) -> bool {
		!matches!(
			self,
			DeliveryError::Encode(_) | DeliveryError::NoBackendAvailable(_)
		)
	}
}

impl From<ChainError> for DeliveryError {
	fn from(err: ChainError) -> Self {
		classify_error(&err.to_string())
	}
}

/// Classifies an upstream failure message into an error kind.
///
/// Matching is case-insensitive substring search with a fixed precedence:
/// expired, then insufficient funds, then invalid signature, then execution
/// reverted. A message matching none of these becomes a transport error
/// carrying the original text.
pub fn classify_error(message: &str) -> DeliveryError {
	let lowered = message.to_lowercase();
	if lowered.contains("expired") {
		DeliveryError::UserOpExpired(message.to_string())
	} else if lowered.contains("insufficient funds") {
		DeliveryError::InsufficientFunds(message.to_string())
	} else if lowered.contains("invalid signature") {
		DeliveryError::SignatureInvalid(message.to_string())
	} else if lowered.contains("execution reverted") {
		DeliveryError::ExecutionReverted(message.to_string())
	} else {
		DeliveryError::Transport(message.to_string())
	}
}

/// Trait defining the interface for submission backends.
///
/// This trait must be implemented by any backend that wants to carry
/// authorizations on-chain. Submission and result retrieval are separate so
/// the retry loop can poll without resubmitting.
#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	/// A short stable name identifying the backend, used for registry
	/// lookups and logging.
	fn name(&self) -> &str;

	/// Submits the authorization and returns an opaque pending handle.
	///
	/// Errors must already be classified; implementations funnel upstream
	/// failure text through [`classify_error`].
	async fn submit(&self, auth: &SignedAuthorization) -> Result<PendingHandle, DeliveryError>;

	/// Fetches the current result for a pending handle.
	///
	/// Returns `Ok(None)` while the submission is still unmined; an absent
	/// result is not an error.
	async fn fetch_result(
		&self,
		handle: &PendingHandle,
	) -> Result<Option<SubmissionResult>, DeliveryError>;
}

/// Service that manages authorization submission across backends.
///
/// Holds a registry of named backends and a retry policy, and drives each
/// submission through the retry loop followed by the receipt wait.
pub struct DeliveryService {
	/// Registered backends keyed by their name.
	backends: HashMap<String, Arc<dyn DeliveryInterface>>,
	/// Retry and confirmation-wait parameters.
	policy: RetryPolicy,
}

impl DeliveryService {
	/// Creates a new DeliveryService over the given backends and policy.
	pub fn new(backends: Vec<Arc<dyn DeliveryInterface>>, policy: RetryPolicy) -> Self {
		let backends = backends
			.into_iter()
			.map(|backend| (backend.name().to_string(), backend))
			.collect();
		Self { backends, policy }
	}

	/// Looks up a backend by name.
	pub fn backend(&self, name: &str) -> Result<&Arc<dyn DeliveryInterface>, DeliveryError> {
		self.backends
			.get(name)
			.ok_or_else(|| DeliveryError::NoBackendAvailable(name.to_string()))
	}

	/// Submits with retries and waits for the receipt.
	///
	/// Returns a pending result when the confirmation wait times out; the
	/// caller may keep polling through [`DeliveryService::fetch_result`].
	pub async fn send(
		&self,
		backend: &str,
		auth: &SignedAuthorization,
	) -> Result<SubmissionResult, DeliveryError> {
		let backend = self.backend(backend)?;
		retry::send(backend.as_ref(), auth, &self.policy, None).await
	}

	/// Like [`DeliveryService::send`], invoking `on_retry` between failed
	/// submission attempts.
	pub async fn send_with_observer(
		&self,
		backend: &str,
		auth: &SignedAuthorization,
		on_retry: retry::RetryObserver<'_>,
	) -> Result<SubmissionResult, DeliveryError> {
		let backend = self.backend(backend)?;
		retry::send(backend.as_ref(), auth, &self.policy, Some(on_retry)).await
	}

	/// Submits once through the named backend, without retries or waiting.
	pub async fn submit(
		&self,
		backend: &str,
		auth: &SignedAuthorization,
	) -> Result<PendingHandle, DeliveryError> {
		self.backend(backend)?.submit(auth).await
	}

	/// Fetches the current result for a handle from the named backend.
	pub async fn fetch_result(
		&self,
		backend: &str,
		handle: &PendingHandle,
	) -> Result<Option<SubmissionResult>, DeliveryError> {
		self.backend(backend)?.fetch_result(handle).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_classify_execution_reverted() {
		let err = classify_error("rpc error: execution reverted: bad nonce");
		assert!(matches!(err, DeliveryError::ExecutionReverted(_)));
	}

	#[test]
	fn test_classify_insufficient_funds() {
		let err = classify_error("Insufficient Funds for gas * price + value");
		assert!(matches!(err, DeliveryError::InsufficientFunds(_)));
	}

	#[test]
	fn test_classify_invalid_signature() {
		let err = classify_error("execution failed: INVALID SIGNATURE");
		assert!(matches!(err, DeliveryError::SignatureInvalid(_)));
	}

	#[test]
	fn test_classify_expired_wins_over_reverted() {
		// Both substrings present; precedence picks the expiry.
		let err = classify_error("execution reverted: authorization expired");
		assert!(matches!(err, DeliveryError::UserOpExpired(_)));
	}

	#[test]
	fn test_classify_unrecognized_preserves_text() {
		let err = classify_error("connection refused");
		match err {
			DeliveryError::Transport(msg) => assert_eq!(msg, "connection refused"),
			other => panic!("unexpected classification: {:?}", other),
		}
	}

	#[test]
	fn test_encode_errors_are_not_retryable() {
		let err = DeliveryError::Encode(EncodeError::UnknownMessageType(
			"agent-scoped counterfactual".to_string(),
		));
		assert!(!err.is_retryable());
		assert!(DeliveryError::Transport("timeout".to_string()).is_retryable());
	}
}
