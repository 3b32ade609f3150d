//! File-backed [`CredentialStore`] for single-node deployments.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{AccountCredential, CredentialUpdate, UserId},
	store::{CredentialStore, StoreError, StoreFuture},
};

/// Persists credentials to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<HashMap<UserId, AccountCredential>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the snapshot file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<HashMap<UserId, AccountCredential>, StoreError> {
		if !path.exists() {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(HashMap::new());
		}

		let records: Vec<AccountCredential> =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		Ok(records.into_iter().map(|record| (record.user_id.clone(), record)).collect())
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(
		&self,
		contents: &HashMap<UserId, AccountCredential>,
	) -> Result<(), StoreError> {
		let mut snapshot = contents.values().collect::<Vec<_>>();

		snapshot.sort_by(|a, b| a.user_id.cmp(&b.user_id));

		let serialized =
			serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl CredentialStore for FileStore {
	fn find_by_user_id<'a>(
		&'a self,
		user_id: &'a UserId,
	) -> StoreFuture<'a, Option<AccountCredential>> {
		Box::pin(async move { Ok(self.inner.read().get(user_id).cloned()) })
	}

	fn upsert<'a>(
		&'a self,
		user_id: &'a UserId,
		update: CredentialUpdate,
	) -> StoreFuture<'a, AccountCredential> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let record =
				update.apply(user_id, guard.get(user_id).cloned(), OffsetDateTime::now_utc())?;
			let previous = guard.insert(user_id.clone(), record.clone());

			if let Err(e) = self.persist_locked(&guard) {
				match previous {
					Some(previous) => guard.insert(user_id.clone(), previous),
					None => guard.remove(user_id),
				};

				return Err(e);
			}

			Ok(record)
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;

	fn temp_path() -> PathBuf {
		let unique = format!(
			"boop_instagram_file_store_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[tokio::test]
	async fn upsert_survives_reopen() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let user = UserId::new("u1").expect("User fixture should be valid.");
		let expires_at = OffsetDateTime::now_utc() + Duration::days(60);

		store
			.upsert(
				&user,
				CredentialUpdate::default()
					.access_token("tok1")
					.expires_at(expires_at)
					.instagram_account("17841400000000000", Some("boop".into())),
			)
			.await
			.expect("Failed to upsert fixture credential into file store.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let fetched = reopened
			.find_by_user_id(&user)
			.await
			.expect("Failed to read credential from file store.")
			.expect("File store lost credential after reopen.");

		assert_eq!(fetched.access_token.expose(), "tok1");
		assert_eq!(fetched.expires_at, Some(expires_at));
		assert_eq!(fetched.username.as_deref(), Some("boop"));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[tokio::test]
	async fn creating_without_token_leaves_snapshot_untouched() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let user = UserId::new("u2").expect("User fixture should be valid.");
		let err = store
			.upsert(&user, CredentialUpdate::default().scope("instagram_basic"))
			.await
			.expect_err("Creating a credential without a token should fail.");

		assert!(matches!(err, StoreError::Incomplete { .. }));
		assert!(!path.exists());
	}
}
