//! Submission handles, receipts, and result types.
//!
//! These types describe the life of a submitted authorization: an opaque
//! pending handle returned by a backend, the eventual transaction receipt,
//! and the combined submission result. An absent receipt is not an error;
//! it means confirmation has not been observed yet.

use serde::{Deserialize, Serialize};

/// Blockchain transaction hash representation.
///
/// Stores hashes as raw bytes; the same shape also carries user-operation
/// hashes returned by bundlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHash(pub Vec<u8>);

impl std::fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "0x{}", hex::encode(&self.0))
	}
}

/// Transaction receipt containing execution details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub hash: TransactionHash,
	/// The block number where the transaction was included.
	pub block_number: u64,
	/// Whether the transaction executed successfully.
	pub success: bool,
}

/// Opaque handle to an in-flight submission.
///
/// Depending on the backend this wraps a transaction hash, a user-operation
/// hash, or a bundle hash; callers only ever pass it back to the backend
/// that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingHandle(pub Vec<u8>);

impl PendingHandle {
	/// The handle identifier as a 0x-prefixed hex string.
	pub fn to_hex(&self) -> String {
		format!("0x{}", hex::encode(&self.0))
	}
}

impl std::fmt::Display for PendingHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.to_hex())
	}
}

/// Terminal and non-terminal states of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
	/// Submitted but not yet confirmed; the caller may keep polling.
	Pending,
	/// Confirmed on-chain and executed successfully.
	Confirmed,
	/// Confirmed on-chain but the execution reverted.
	Failed,
}

/// Result of a submission attempt after the confirmation wait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
	/// The handle identifying the submission.
	pub handle: PendingHandle,
	/// The receipt, absent until confirmed or when the wait timed out.
	pub receipt: Option<TransactionReceipt>,
	/// The observed status.
	pub status: SubmissionStatus,
}

impl SubmissionResult {
	/// A still-pending result with no receipt.
	pub fn pending(handle: PendingHandle) -> Self {
		Self {
			handle,
			receipt: None,
			status: SubmissionStatus::Pending,
		}
	}

	/// A result carrying a confirmed receipt; the status reflects whether
	/// the execution succeeded.
	pub fn confirmed(handle: PendingHandle, receipt: TransactionReceipt) -> Self {
		let status = if receipt.success {
			SubmissionStatus::Confirmed
		} else {
			SubmissionStatus::Failed
		};
		Self {
			handle,
			receipt: Some(receipt),
			status,
		}
	}
}
