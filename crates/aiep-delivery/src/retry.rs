//! Retry and receipt-wait loop around submission backends.
//!
//! Submission failures are retried with exponential backoff up to a bounded
//! attempt count; confirmation timeouts are not failures and are never
//! retried. After a successful submission the loop polls the backend on a
//! fixed interval until a result appears or the confirmation window
//! elapses, in which case a pending result is returned and the caller
//! decides whether to keep polling.

use std::time::Duration;

use aiep_types::{PendingHandle, SignedAuthorization, SubmissionResult};

use crate::{DeliveryError, DeliveryInterface};

/// Retry and confirmation-wait parameters.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
	/// Retries after the initial attempt; total attempts is this plus one.
	pub max_retries: u32,
	/// Backoff before the first retry; doubles on each subsequent retry.
	pub initial_backoff: Duration,
	/// How long to wait for a receipt before returning a pending result.
	pub confirmation_timeout: Duration,
	/// Sleep between receipt polls; the floor that prevents busy-spinning.
	pub poll_interval: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_retries: 3,
			initial_backoff: Duration::from_millis(500),
			confirmation_timeout: Duration::from_secs(60),
			poll_interval: Duration::from_secs(2),
		}
	}
}

/// Observer invoked between failed submission attempts.
///
/// Receives the zero-based index of the attempt that just failed and the
/// classified error. Purely informational; it cannot alter the retry
/// schedule.
pub type RetryObserver<'a> = &'a (dyn Fn(u32, &DeliveryError) + Send + Sync);

/// Submits the authorization, retrying classified failures with
/// exponential backoff.
///
/// The delay before retry `n` (zero-based) is `initial_backoff * 2^n`.
/// Exhausting the retry budget re-raises the last classified error.
pub async fn submit_with_retry(
	backend: &dyn DeliveryInterface,
	auth: &SignedAuthorization,
	policy: &RetryPolicy,
	on_retry: Option<RetryObserver<'_>>,
) -> Result<PendingHandle, DeliveryError> {
	let mut attempt: u32 = 0;
	loop {
		match backend.submit(auth).await {
			Ok(handle) => {
				tracing::info!(
					backend = backend.name(),
					handle = %handle,
					attempt,
					"Submitted authorization"
				);
				return Ok(handle);
			}
			Err(err) if !err.is_retryable() => return Err(err),
			Err(err) => {
				if attempt >= policy.max_retries {
					tracing::warn!(
						backend = backend.name(),
						attempts = attempt + 1,
						error = %err,
						"Submission retries exhausted"
					);
					return Err(err);
				}
				if let Some(observer) = on_retry {
					observer(attempt, &err);
				}
				let delay = policy.initial_backoff * 2u32.saturating_pow(attempt);
				tracing::debug!(
					backend = backend.name(),
					attempt,
					delay_ms = delay.as_millis() as u64,
					error = %err,
					"Submission failed, backing off"
				);
				tokio::time::sleep(delay).await;
				attempt += 1;
			}
		}
	}
}

/// Polls the backend for a result until one appears or the confirmation
/// window elapses.
///
/// A timeout is not an error: the returned result carries the handle with
/// an absent receipt and a pending status. Poll failures are treated the
/// same as an absent result; the submission already happened, so an
/// unreachable backend must not discard the handle.
pub async fn await_result(
	backend: &dyn DeliveryInterface,
	handle: PendingHandle,
	policy: &RetryPolicy,
) -> Result<SubmissionResult, DeliveryError> {
	let deadline = tokio::time::Instant::now() + policy.confirmation_timeout;
	loop {
		match backend.fetch_result(&handle).await {
			Ok(Some(result)) => return Ok(result),
			Ok(None) => {}
			Err(err) => {
				tracing::debug!(
					backend = backend.name(),
					handle = %handle,
					error = %err,
					"Result poll failed, treating as not yet available"
				);
			}
		}
		if tokio::time::Instant::now() + policy.poll_interval > deadline {
			tracing::debug!(
				backend = backend.name(),
				handle = %handle,
				"Confirmation wait elapsed, returning pending result"
			);
			return Ok(SubmissionResult::pending(handle));
		}
		tokio::time::sleep(policy.poll_interval).await;
	}
}

/// Submits with retries, then waits for the receipt.
pub async fn send(
	backend: &dyn DeliveryInterface,
	auth: &SignedAuthorization,
	policy: &RetryPolicy,
	on_retry: Option<RetryObserver<'_>>,
) -> Result<SubmissionResult, DeliveryError> {
	let handle = submit_with_retry(backend, auth, policy, on_retry).await?;
	await_result(backend, handle, policy).await
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::classify_error;
	use aiep_types::{
		Domain, PayEth, Signature, SubmissionStatus, TransactionHash, TransactionReceipt,
		TypedMessage,
	};
	use aiep_types::{ExecutionTarget, SignedAuthorization};
	use alloy_primitives::{Address, U256};
	use async_trait::async_trait;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::sync::Mutex;

	/// Backend stub that fails a fixed number of submissions, then
	/// succeeds; the first `fail_polls` result polls error out, and
	/// results stay absent for a fixed number of polls after that.
	struct FlakyBackend {
		fail_submissions: u32,
		submissions: AtomicU32,
		fail_polls: u32,
		polls_until_result: Option<u32>,
		polls: AtomicU32,
		error_message: String,
	}

	impl FlakyBackend {
		fn new(fail_submissions: u32, polls_until_result: Option<u32>) -> Self {
			Self {
				fail_submissions,
				submissions: AtomicU32::new(0),
				fail_polls: 0,
				polls_until_result,
				polls: AtomicU32::new(0),
				error_message: "connection reset".to_string(),
			}
		}

		fn with_poll_failures(mut self, fail_polls: u32) -> Self {
			self.fail_polls = fail_polls;
			self
		}
	}

	#[async_trait]
	impl DeliveryInterface for FlakyBackend {
		fn name(&self) -> &str {
			"flaky"
		}

		async fn submit(
			&self,
			_auth: &SignedAuthorization,
		) -> Result<PendingHandle, DeliveryError> {
			let n = self.submissions.fetch_add(1, Ordering::SeqCst);
			if n < self.fail_submissions {
				Err(classify_error(&self.error_message))
			} else {
				Ok(PendingHandle(vec![0xaa; 32]))
			}
		}

		async fn fetch_result(
			&self,
			handle: &PendingHandle,
		) -> Result<Option<SubmissionResult>, DeliveryError> {
			let n = self.polls.fetch_add(1, Ordering::SeqCst);
			if n < self.fail_polls {
				return Err(classify_error(&self.error_message));
			}
			match self.polls_until_result {
				Some(needed) if n >= needed => Ok(Some(SubmissionResult::confirmed(
					handle.clone(),
					TransactionReceipt {
						hash: TransactionHash(handle.0.clone()),
						block_number: 7,
						success: true,
					},
				))),
				_ => Ok(None),
			}
		}
	}

	fn fast_policy() -> RetryPolicy {
		RetryPolicy {
			max_retries: 3,
			initial_backoff: Duration::from_millis(1),
			confirmation_timeout: Duration::from_millis(50),
			poll_interval: Duration::from_millis(5),
		}
	}

	fn test_auth() -> SignedAuthorization {
		SignedAuthorization {
			domain: Domain::new(1, Address::from([0x11; 20])),
			message: TypedMessage::PayEth(PayEth {
				agent_id: None,
				to: Address::from([0x22; 20]),
				amount: U256::from(10u64),
				nonce: U256::ZERO,
				deadline: 1_234_567_890,
			}),
			signature: Signature(vec![0u8; 65]),
			target: ExecutionTarget::Deployed {
				contract: Address::from([0x11; 20]),
			},
		}
	}

	#[tokio::test]
	async fn test_fails_twice_then_succeeds() {
		let backend = FlakyBackend::new(2, Some(0));
		let observed = Mutex::new(Vec::new());
		let observer = |attempt: u32, err: &DeliveryError| {
			observed
				.lock()
				.unwrap()
				.push((attempt, err.to_string()));
		};
		let result = send(&backend, &test_auth(), &fast_policy(), Some(&observer))
			.await
			.unwrap();
		assert_eq!(result.status, SubmissionStatus::Confirmed);
		let observed = observed.into_inner().unwrap();
		assert_eq!(observed.len(), 2);
		assert_eq!(observed[0].0, 0);
		assert_eq!(observed[1].0, 1);
	}

	#[tokio::test]
	async fn test_exhausted_retries_surface_last_error() {
		let backend = FlakyBackend {
			error_message: "execution reverted: bad nonce".to_string(),
			..FlakyBackend::new(u32::MAX, None)
		};
		let policy = RetryPolicy {
			max_retries: 2,
			..fast_policy()
		};
		let err = send(&backend, &test_auth(), &policy, None)
			.await
			.unwrap_err();
		// Initial attempt plus two retries.
		assert_eq!(backend.submissions.load(Ordering::SeqCst), 3);
		assert!(matches!(err, DeliveryError::ExecutionReverted(_)));
	}

	#[tokio::test]
	async fn test_confirmation_timeout_is_pending_not_error() {
		let backend = FlakyBackend::new(0, None);
		let result = send(&backend, &test_auth(), &fast_policy(), None)
			.await
			.unwrap();
		assert_eq!(result.status, SubmissionStatus::Pending);
		assert!(result.receipt.is_none());
		assert_eq!(result.handle, PendingHandle(vec![0xaa; 32]));
	}

	#[tokio::test]
	async fn test_non_retryable_error_fails_fast() {
		struct EncodeFailBackend;

		#[async_trait]
		impl DeliveryInterface for EncodeFailBackend {
			fn name(&self) -> &str {
				"encode-fail"
			}

			async fn submit(
				&self,
				_auth: &SignedAuthorization,
			) -> Result<PendingHandle, DeliveryError> {
				Err(DeliveryError::Encode(
					aiep_types::EncodeError::UnknownMessageType("unsupported".to_string()),
				))
			}

			async fn fetch_result(
				&self,
				_handle: &PendingHandle,
			) -> Result<Option<SubmissionResult>, DeliveryError> {
				Ok(None)
			}
		}

		let observed = AtomicU32::new(0);
		let observer = |_: u32, _: &DeliveryError| {
			observed.fetch_add(1, Ordering::SeqCst);
		};
		let err = send(&EncodeFailBackend, &test_auth(), &fast_policy(), Some(&observer))
			.await
			.unwrap_err();
		assert!(matches!(err, DeliveryError::Encode(_)));
		assert_eq!(observed.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn test_result_found_after_a_few_polls() {
		let backend = FlakyBackend::new(0, Some(3));
		let result = send(&backend, &test_auth(), &fast_policy(), None)
			.await
			.unwrap();
		assert_eq!(result.status, SubmissionStatus::Confirmed);
		assert!(backend.polls.load(Ordering::SeqCst) >= 4);
	}

	#[tokio::test]
	async fn test_poll_errors_do_not_abort_confirmation_wait() {
		let backend = FlakyBackend::new(0, Some(2)).with_poll_failures(2);
		let result = send(&backend, &test_auth(), &fast_policy(), None)
			.await
			.unwrap();
		assert_eq!(result.status, SubmissionStatus::Confirmed);
		assert!(backend.polls.load(Ordering::SeqCst) >= 3);
	}

	#[tokio::test]
	async fn test_unreachable_backend_after_submission_is_pending() {
		let backend = FlakyBackend::new(0, None).with_poll_failures(u32::MAX);
		let result = send(&backend, &test_auth(), &fast_policy(), None)
			.await
			.unwrap();
		// The submission went through; a backend that cannot answer
		// result polls must still hand the caller the handle back.
		assert_eq!(result.status, SubmissionStatus::Pending);
		assert!(result.receipt.is_none());
		assert_eq!(result.handle, PendingHandle(vec![0xaa; 32]));
	}
}
