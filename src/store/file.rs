//! Simple file-backed [`SessionPersistence`] for desktop shells and bots.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::CredentialPair,
	store::{PersistenceError, PersistenceFuture, SessionPersistence},
};

/// Persists the credential pair to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FilePersistence {
	path: PathBuf,
	// Serializes file writes so a slow `save` cannot land after a later `clear`.
	io: Arc<Mutex<()>>,
}
impl FilePersistence {
	/// Prepares a backend at the provided path, creating parent directories on demand.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		Ok(Self { path, io: Default::default() })
	}

	/// Returns the file location used by this backend.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_now(path: &Path) -> Result<Option<CredentialPair>, PersistenceError> {
		if !path.exists() {
			return Ok(None);
		}

		let metadata = path.metadata().map_err(|e| PersistenceError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(None);
		}

		let bytes = fs::read(path).map_err(|e| PersistenceError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;
		let pair = serde_json::from_slice(&bytes).map_err(|e| PersistenceError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})?;

		Ok(Some(pair))
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), PersistenceError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| PersistenceError::Backend {
				message: format!("Failed to create session directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_now(&self, pair: &CredentialPair) -> Result<(), PersistenceError> {
		let _io = self.io.lock();

		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(pair).map_err(|e| PersistenceError::Serialization {
				message: format!("Failed to serialize credential pair: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| PersistenceError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| PersistenceError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| PersistenceError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| PersistenceError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	fn remove_now(&self) -> Result<(), PersistenceError> {
		let _io = self.io.lock();

		match fs::remove_file(&self.path) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(PersistenceError::Backend {
				message: format!("Failed to remove {}: {e}", self.path.display()),
			}),
		}
	}
}
impl SessionPersistence for FilePersistence {
	fn load(&self) -> PersistenceFuture<'_, Option<CredentialPair>> {
		Box::pin(async move { Self::load_now(&self.path) })
	}

	fn save(&self, pair: CredentialPair) -> PersistenceFuture<'_, ()> {
		Box::pin(async move { self.persist_now(&pair) })
	}

	fn clear(&self) -> PersistenceFuture<'_, ()> {
		Box::pin(async move { self.remove_now() })
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;

	fn temp_path() -> PathBuf {
		let unique = format!(
			"guestbook_client_session_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn save_and_reload_round_trip() {
		let path = temp_path();
		let persistence = FilePersistence::open(&path).expect("Failed to open file persistence.");
		let pair = CredentialPair::new("access-token", "refresh-token");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file persistence test.");

		rt.block_on(persistence.save(pair.clone()))
			.expect("Failed to save fixture pair to file persistence.");
		drop(persistence);

		let reopened = FilePersistence::open(&path).expect("Failed to reopen file persistence.");
		let loaded = rt
			.block_on(reopened.load())
			.expect("Failed to load fixture pair from file persistence.")
			.expect("File persistence lost the pair after reopen.");

		assert_eq!(loaded, pair);

		rt.block_on(reopened.clear()).expect("Failed to clear file persistence.");

		assert!(!path.exists());
		assert!(
			rt.block_on(reopened.load()).expect("Load after clear should succeed.").is_none()
		);
	}

	#[test]
	fn clearing_missing_file_is_not_an_error() {
		let persistence = FilePersistence::open(temp_path()).expect("Failed to open persistence.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file persistence test.");

		rt.block_on(persistence.clear()).expect("Clearing a missing file should succeed.");
	}
}
