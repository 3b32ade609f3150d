//! Storage contracts and built-in store implementations for account credentials and inbox
//! mirrors.

pub mod file;
pub mod memory;
pub mod mirror;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use mirror::*;

// self
use crate::{
	_prelude::*,
	auth::{AccountCredential, CredentialUpdate, UserId},
};

/// Boxed future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for account credentials.
///
/// Implementations keep at most one [`AccountCredential`] per [`UserId`].
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Fetches the credential owned by `user_id`, if present.
	fn find_by_user_id<'a>(
		&'a self,
		user_id: &'a UserId,
	) -> StoreFuture<'a, Option<AccountCredential>>;

	/// Creates or updates the credential owned by `user_id` and returns the stored record.
	///
	/// Fields left `None` in `update` keep their stored value. Creating a record without an access
	/// token fails with [`StoreError::Incomplete`].
	fn upsert<'a>(
		&'a self,
		user_id: &'a UserId,
		update: CredentialUpdate,
	) -> StoreFuture<'a, AccountCredential>;
}

/// Error type produced by store implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// The update lacks fields required to create a record.
	#[error("Incomplete record: {message}.")]
	Incomplete {
		/// Human-readable error payload.
		message: String,
	},
}
