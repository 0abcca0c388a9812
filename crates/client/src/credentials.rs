//! Credential persistence (the token store).
//!
//! Credentials are kept in a small key-value [`CredentialStorage`] under a
//! single canonical key set ([`keys`]). Two backends are provided:
//!
//! - [`MemoryStorage`] - lives as long as the process (a browser session)
//! - [`FileStorage`] - a JSON file that survives restarts
//!
//! [`TokenStore`] is the typed view the session client works with. Writes are
//! visible to every clone immediately; there is no caching layer on top of
//! the backend.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::debug;

/// Storage keys for credential data.
pub mod keys {
    /// Bearer access token.
    pub const ACCESS_TOKEN: &str = "access_token";

    /// Refresh token used to obtain a new access token.
    pub const REFRESH_TOKEN: &str = "refresh_token";

    /// RFC 3339 timestamp of when the current access token was stored.
    pub const ISSUED_AT: &str = "access_token_issued_at";

    /// Display name shown in the storefront header.
    pub const USER_NAME: &str = "user_name";
}

/// Errors from a credential storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("credential storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file is not valid JSON.
    #[error("credential storage is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// A string key-value store for credentials.
pub trait CredentialStorage: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove several keys at once.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn remove(&self, keys: &[&str]) -> Result<(), StorageError>;
}

// =============================================================================
// Memory backend
// =============================================================================

/// Process-lifetime storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

// =============================================================================
// File backend
// =============================================================================

/// JSON-file storage that survives restarts.
///
/// The whole map is rewritten on every change through a temporary file and a
/// rename, so a crash never leaves a half-written file behind.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) the credential file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if an existing file cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match std::fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => HashMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), keys = entries.len(), "Opened credential file");
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        restrict_permissions(&tmp)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

impl CredentialStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_owned(), value.to_owned());
        self.persist(&entries)
    }

    fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        for key in keys {
            entries.remove(*key);
        }
        if entries.len() == before {
            return Ok(());
        }
        self.persist(&entries)
    }
}

// =============================================================================
// TokenStore
// =============================================================================

/// The credential set of the signed-in user.
#[derive(Debug, Clone)]
pub struct SessionCredentials {
    /// Bearer token attached to requests.
    pub access_token: SecretString,
    /// Token used to obtain a new access token, if the backend issued one.
    pub refresh_token: Option<SecretString>,
    /// When the access token was stored.
    pub issued_at: DateTime<Utc>,
}

impl SessionCredentials {
    /// Credentials issued now.
    #[must_use]
    pub fn new(access_token: SecretString, refresh_token: Option<SecretString>) -> Self {
        Self {
            access_token,
            refresh_token,
            issued_at: Utc::now(),
        }
    }
}

/// Typed access to the stored credentials.
///
/// Cloning is cheap; all clones share the same backend.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn CredentialStorage>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}

impl TokenStore {
    /// Wrap a storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn CredentialStorage>) -> Self {
        Self { storage }
    }

    /// A store backed by [`MemoryStorage`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// A store backed by a [`FileStorage`] at `path`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the file exists but cannot be read.
    pub fn file(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        Ok(Self::new(Arc::new(FileStorage::open(path)?)))
    }

    /// The current access token.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub fn access_token(&self) -> Result<Option<SecretString>, StorageError> {
        Ok(self.storage.get(keys::ACCESS_TOKEN)?.map(SecretString::from))
    }

    /// The current refresh token.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub fn refresh_token(&self) -> Result<Option<SecretString>, StorageError> {
        Ok(self.storage.get(keys::REFRESH_TOKEN)?.map(SecretString::from))
    }

    /// When the current access token was stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub fn issued_at(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        Ok(self
            .storage
            .get(keys::ISSUED_AT)?
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|ts| ts.with_timezone(&Utc)))
    }

    /// The full credential set, if an access token is stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub fn credentials(&self) -> Result<Option<SessionCredentials>, StorageError> {
        let Some(access_token) = self.access_token()? else {
            return Ok(None);
        };
        Ok(Some(SessionCredentials {
            access_token,
            refresh_token: self.refresh_token()?,
            issued_at: self.issued_at()?.unwrap_or_else(Utc::now),
        }))
    }

    /// Whether an access token is stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub fn is_signed_in(&self) -> Result<bool, StorageError> {
        Ok(self.storage.get(keys::ACCESS_TOKEN)?.is_some())
    }

    /// Replace the whole credential set.
    ///
    /// A missing refresh token removes any previously stored one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    pub fn set_credentials(&self, credentials: &SessionCredentials) -> Result<(), StorageError> {
        self.storage.set(
            keys::ACCESS_TOKEN,
            credentials.access_token.expose_secret(),
        )?;
        self.storage
            .set(keys::ISSUED_AT, &credentials.issued_at.to_rfc3339())?;
        match &credentials.refresh_token {
            Some(token) => self.storage.set(keys::REFRESH_TOKEN, token.expose_secret()),
            None => self.storage.remove(&[keys::REFRESH_TOKEN]),
        }
    }

    /// Overwrite the access token after a refresh, keeping the refresh token.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    pub fn set_access_token(&self, token: &SecretString) -> Result<(), StorageError> {
        self.storage.set(keys::ACCESS_TOKEN, token.expose_secret())?;
        self.storage.set(keys::ISSUED_AT, &Utc::now().to_rfc3339())
    }

    /// Overwrite the refresh token (for backends that rotate it).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    pub fn set_refresh_token(&self, token: &SecretString) -> Result<(), StorageError> {
        self.storage.set(keys::REFRESH_TOKEN, token.expose_secret())
    }

    /// Name to greet the user with.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub fn display_name(&self) -> Result<Option<String>, StorageError> {
        self.storage.get(keys::USER_NAME)
    }

    /// Store the name to greet the user with.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    pub fn set_display_name(&self, name: &str) -> Result<(), StorageError> {
        self.storage.set(keys::USER_NAME, name)
    }

    /// Forget everything: tokens, issue time and display name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(&[
            keys::ACCESS_TOKEN,
            keys::REFRESH_TOKEN,
            keys::ISSUED_AT,
            keys::USER_NAME,
        ])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("lockshop-credentials-{}.json", uuid::Uuid::new_v4()))
    }

    fn signed_in(store: &TokenStore) {
        store
            .set_credentials(&SessionCredentials::new(
                SecretString::from("access-1"),
                Some(SecretString::from("refresh-1")),
            ))
            .unwrap();
        store.set_display_name("Aziz").unwrap();
    }

    #[test]
    fn test_set_and_read_credentials() {
        let store = TokenStore::in_memory();
        assert!(store.credentials().unwrap().is_none());
        assert!(!store.is_signed_in().unwrap());

        signed_in(&store);

        let creds = store.credentials().unwrap().unwrap();
        assert_eq!(creds.access_token.expose_secret(), "access-1");
        assert_eq!(
            creds.refresh_token.unwrap().expose_secret(),
            "refresh-1"
        );
        assert!(store.issued_at().unwrap().is_some());
        assert_eq!(store.display_name().unwrap().as_deref(), Some("Aziz"));
    }

    #[test]
    fn test_set_access_token_keeps_refresh_token() {
        let store = TokenStore::in_memory();
        signed_in(&store);

        store
            .set_access_token(&SecretString::from("access-2"))
            .unwrap();

        assert_eq!(
            store.access_token().unwrap().unwrap().expose_secret(),
            "access-2"
        );
        assert_eq!(
            store.refresh_token().unwrap().unwrap().expose_secret(),
            "refresh-1"
        );
    }

    #[test]
    fn test_credentials_without_refresh_token_remove_old_one() {
        let store = TokenStore::in_memory();
        signed_in(&store);

        store
            .set_credentials(&SessionCredentials::new(SecretString::from("a"), None))
            .unwrap();
        assert!(store.refresh_token().unwrap().is_none());
    }

    #[test]
    fn test_clear_removes_everything() {
        let store = TokenStore::in_memory();
        signed_in(&store);

        store.clear().unwrap();

        assert!(store.access_token().unwrap().is_none());
        assert!(store.refresh_token().unwrap().is_none());
        assert!(store.issued_at().unwrap().is_none());
        assert!(store.display_name().unwrap().is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let store = TokenStore::in_memory();
        let other = store.clone();
        signed_in(&store);
        assert!(other.is_signed_in().unwrap());
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let path = temp_path();
        {
            let store = TokenStore::file(&path).unwrap();
            signed_in(&store);
        }

        let reopened = TokenStore::file(&path).unwrap();
        assert_eq!(
            reopened.access_token().unwrap().unwrap().expose_secret(),
            "access-1"
        );

        reopened.clear().unwrap();
        let cleared = TokenStore::file(&path).unwrap();
        assert!(!cleared.is_signed_in().unwrap());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_file_storage_rejects_corrupt_file() {
        let path = temp_path();
        std::fs::write(&path, b"{not json").unwrap();

        assert!(matches!(
            FileStorage::open(&path),
            Err(StorageError::Corrupt(_))
        ));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_debug_does_not_leak_tokens() {
        let creds = SessionCredentials::new(SecretString::from("super-secret"), None);
        assert!(!format!("{creds:?}").contains("super-secret"));
    }
}
