//! secrets::encrypted_file
//!
//! A single document encrypted at rest.
//!
//! # Security
//!
//! - The document is stored as an `iv:authTag:ciphertext` blob (see
//!   [`super::crypto`]), never as plaintext
//! - File permissions are set to 0600 on Unix (owner read/write only)
//! - All writes are atomic (write to temp file, then rename)
//! - Contents are NEVER logged, printed, or included in error messages
//!
//! # Example
//!
//! ```ignore
//! use octocode_credentials::secrets::EncryptedFile;
//!
//! let file = EncryptedFile::new(paths.credentials_file(), paths.key_file());
//! file.write("{\"version\":1,\"credentials\":{}}")?;
//! assert!(file.read()?.is_some());
//! ```

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use super::crypto::{self, EncryptionKey};
use super::traits::SecretError;

/// An encrypted document on disk plus the key file that protects it.
#[derive(Debug, Clone)]
pub struct EncryptedFile {
    /// Path to the encrypted document
    path: PathBuf,
    /// Path to the hex-encoded key
    key_path: PathBuf,
}

impl EncryptedFile {
    /// Create a handle for `path`, protected by the key at `key_path`.
    ///
    /// Nothing is touched on disk until the first read or write.
    pub fn new(path: PathBuf, key_path: PathBuf) -> Self {
        Self { path, key_path }
    }

    /// Path to the encrypted document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path to the key file.
    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    /// Read and decrypt the document.
    ///
    /// Returns `Ok(None)` if the document does not exist yet. Reading never
    /// creates or replaces the key file; a missing or damaged key is a
    /// `Decryption` error.
    pub fn read(&self) -> Result<Option<String>, SecretError> {
        let blob = match fs::read_to_string(&self.path) {
            Ok(blob) => blob,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SecretError::ReadError(format!(
                    "cannot read encrypted file: {}",
                    e
                )))
            }
        };

        let key = EncryptionKey::load(&self.key_path)?;
        crypto::decrypt(&blob, &key).map(Some)
    }

    /// Encrypt and atomically replace the document.
    ///
    /// Generates the key file if it is missing or damaged.
    pub fn write(&self, plaintext: &str) -> Result<(), SecretError> {
        let key = EncryptionKey::load_or_create(&self.key_path)?;
        let blob = crypto::encrypt(plaintext, &key)?;
        write_private_file(&self.path, blob.as_bytes())
    }
}

/// Distinguishes temp files of concurrent writers in one process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// `<name>.<pid>.<n>.tmp` next to `path`.
fn temp_path_for(path: &Path) -> PathBuf {
    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(format!(
        ".{}.{}.tmp",
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    path.with_file_name(temp_name)
}

/// Write `content` to `path` atomically with owner-only permissions.
///
/// Creates the parent directory if needed. Every call writes its own temp
/// file, so concurrent writers never share one.
pub(crate) fn write_private_file(path: &Path, content: &[u8]) -> Result<(), SecretError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| SecretError::WriteError(format!("cannot create directory: {}", e)))?;
    }

    let temp_path = temp_path_for(path);
    let result = write_and_rename(&temp_path, path, content);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_and_rename(temp_path: &Path, path: &Path, content: &[u8]) -> Result<(), SecretError> {
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(temp_path)
            .map_err(|e| SecretError::WriteError(format!("cannot create temp file: {}", e)))?;

        // Restrict before any content lands on disk
        #[cfg(unix)]
        {
            let permissions = fs::Permissions::from_mode(0o600);
            file.set_permissions(permissions).map_err(|e| {
                SecretError::WriteError(format!("cannot set permissions: {}", e))
            })?;
        }

        file.write_all(content)
            .map_err(|e| SecretError::WriteError(format!("cannot write file: {}", e)))?;

        file.sync_all()
            .map_err(|e| SecretError::WriteError(format!("cannot sync to disk: {}", e)))?;
    }

    fs::rename(temp_path, path)
        .map_err(|e| SecretError::WriteError(format!("cannot rename temp file: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_file() -> (TempDir, EncryptedFile) {
        let temp = TempDir::new().expect("create temp dir");
        let file = EncryptedFile::new(
            temp.path().join("credentials.json"),
            temp.path().join(".key"),
        );
        (temp, file)
    }

    #[test]
    fn read_missing_returns_none_without_key() {
        let (_temp, file) = create_test_file();

        assert!(file.read().expect("read").is_none());
        assert!(!file.key_path().exists());
    }

    #[test]
    fn write_and_read() {
        let (_temp, file) = create_test_file();

        file.write("{\"version\":1}").expect("write");
        assert_eq!(file.read().expect("read").as_deref(), Some("{\"version\":1}"));
    }

    #[test]
    fn content_is_not_plaintext_on_disk() {
        let (_temp, file) = create_test_file();

        file.write("ghp_visible_secret").expect("write");

        let raw = fs::read_to_string(file.path()).expect("raw read");
        assert!(!raw.contains("ghp_visible_secret"));
        assert_eq!(raw.split(':').count(), 3);
    }

    #[test]
    fn creates_directory_if_missing() {
        let temp = TempDir::new().expect("create temp dir");
        let dir = temp.path().join("subdir");
        let file = EncryptedFile::new(dir.join("credentials.json"), dir.join(".key"));

        assert!(!dir.exists());
        file.write("{}").expect("write");
        assert!(dir.join("credentials.json").exists());
        assert!(dir.join(".key").exists());
    }

    #[test]
    fn lost_key_makes_document_unreadable() {
        let (_temp, file) = create_test_file();

        file.write("{}").expect("write");
        fs::remove_file(file.key_path()).expect("remove key");

        assert!(matches!(file.read(), Err(SecretError::Decryption(_))));
        assert!(!file.key_path().exists());
    }

    #[test]
    fn read_never_rewrites_damaged_key() {
        let (_temp, file) = create_test_file();

        file.write("{}").expect("write");
        fs::write(file.key_path(), "damaged").expect("damage key");

        assert!(matches!(file.read(), Err(SecretError::Decryption(_))));
        assert_eq!(fs::read_to_string(file.key_path()).expect("key"), "damaged");

        // The next write starts over with a fresh key.
        file.write("{\"version\":1}").expect("write");
        assert_eq!(file.read().expect("read").as_deref(), Some("{\"version\":1}"));
    }

    #[test]
    fn no_temp_file_left_behind() {
        let (temp, file) = create_test_file();

        file.write("{}").expect("write");
        file.write("{\"again\":true}").expect("second write");

        let names: Vec<String> = fs::read_dir(temp.path())
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().all(|name| !name.ends_with(".tmp")), "{:?}", names);
    }

    #[test]
    fn temp_names_are_unique() {
        let path = Path::new("/tmp/octocode/credentials.json");
        let first = temp_path_for(path);
        let second = temp_path_for(path);

        assert_ne!(first, second);
        assert_eq!(first.parent(), path.parent());
        let name = first.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("credentials.json."));
        assert!(name.ends_with(".tmp"));
    }

    #[cfg(unix)]
    #[test]
    fn permissions_0600_on_unix() {
        let (_temp, file) = create_test_file();

        file.write("{}").expect("write");

        let mode = fs::metadata(file.path()).expect("metadata").permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "permissions should be 0600");
    }
}
