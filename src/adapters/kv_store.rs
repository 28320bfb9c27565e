//! Key-value store adapter.
//!
//! Implements both [`StoragePort`] and [`ProfilePort`] for the host.
//!
//! # Security
//!
//! - Profile validation: every field is checked before persistence. On
//!   load a bad phone or email is dropped on its own, so one broken contact
//!   never silences the channels that still work. Only an unusable name
//!   rejects the stored profile.
//! - Atomic writes: the backing file is replaced by writing a sibling temp
//!   file and renaming it over the live file.
//! - The store never holds relay credentials; those come from the
//!   environment at startup.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use super::utils::{is_printable, is_printable_ascii};
use crate::app::ports::{ProfileError, ProfilePort, StorageError, StoragePort};
use crate::profile::{CaregiverProfile, PROFILE_KEY};

const MAX_NAME_CHARS: usize = 64;
const MIN_PHONE_DIGITS: usize = 7;
const MAX_PHONE_CHARS: usize = 20;
const MAX_EMAIL_CHARS: usize = 254;

pub struct KvStore {
    entries: BTreeMap<String, String>,
    /// Backing file. `None` keeps everything in memory.
    path: Option<PathBuf>,
}

impl KvStore {
    /// Volatile store (tests, dry runs).
    pub fn in_memory() -> Self {
        info!("KvStore: in-memory backend");
        Self {
            entries: BTreeMap::new(),
            path: None,
        }
    }

    /// Open a file-backed store. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                warn!("KvStore: {} is not a valid store: {}", path.display(), e);
                StorageError::Corrupted
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("KvStore: cannot read {}: {}", path.display(), e);
                return Err(StorageError::IoError);
            }
        };
        info!("KvStore: opened {} ({} keys)", path.display(), entries.len());
        Ok(Self {
            entries,
            path: Some(path),
        })
    }

    /// Write the whole map to disk through a temp file and rename.
    fn persist(&self) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let text = serde_json::to_string_pretty(&self.entries).map_err(|_| StorageError::IoError)?;
        let tmp = temp_path(path);
        fs::write(&tmp, text)
            .and_then(|()| fs::rename(&tmp, path))
            .map_err(|e| {
                warn!("KvStore: write to {} failed: {}", path.display(), e);
                let _ = fs::remove_file(&tmp);
                StorageError::IoError
            })
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

// ── Validation ───────────────────────────────────────────────

/// Check a (normalised) profile before it is stored.
pub fn validate_profile(p: &CaregiverProfile) -> Result<(), ProfileError> {
    validate_name(&p.name)?;
    if let Some(phone) = &p.phone {
        validate_phone(phone)?;
    }
    if let Some(email) = &p.email {
        validate_email(email)?;
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), ProfileError> {
    let len = name.chars().count();
    if len == 0 || len > MAX_NAME_CHARS {
        return Err(ProfileError::ValidationFailed("name must be 1–64 characters"));
    }
    if !is_printable(name) {
        return Err(ProfileError::ValidationFailed("name must not contain control characters"));
    }
    Ok(())
}

fn validate_phone(phone: &str) -> Result<(), ProfileError> {
    if phone.len() > MAX_PHONE_CHARS
        || !phone.chars().all(|c| c.is_ascii_digit() || "+()- ".contains(c))
    {
        return Err(ProfileError::ValidationFailed(
            "phone must be up to 20 of: digits, space, + ( ) -",
        ));
    }
    if phone.chars().filter(char::is_ascii_digit).count() < MIN_PHONE_DIGITS {
        return Err(ProfileError::ValidationFailed("phone must contain at least 7 digits"));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ProfileError> {
    let shape_ok = email.len() <= MAX_EMAIL_CHARS
        && is_printable_ascii(email)
        && !email.contains(' ')
        && match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
            }
            None => false,
        };
    if !shape_ok {
        return Err(ProfileError::ValidationFailed("email must look like name@domain.tld"));
    }
    Ok(())
}

/// Drop a stored contact field that no longer validates.
fn keep_valid(
    field: Option<String>,
    what: &str,
    check: fn(&str) -> Result<(), ProfileError>,
) -> Option<String> {
    let value = field?;
    match check(&value) {
        Ok(()) => Some(value),
        Err(e) => {
            warn!("KvStore: ignoring stored caregiver {}: {}", what, e);
            None
        }
    }
}

// ── Ports ────────────────────────────────────────────────────

impl StoragePort for KvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let previous = self.entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.persist() {
            // Keep memory consistent with what is on disk.
            match previous {
                Some(v) => self.entries.insert(key.to_string(), v),
                None => self.entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StorageError> {
        if let Some(previous) = self.entries.remove(key) {
            if let Err(e) = self.persist() {
                self.entries.insert(key.to_string(), previous);
                return Err(e);
            }
        }
        Ok(())
    }

    fn exists(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl ProfilePort for KvStore {
    fn load(&self) -> Result<Option<CaregiverProfile>, ProfileError> {
        let Some(json) = self.get(PROFILE_KEY)? else {
            return Ok(None);
        };
        let profile: CaregiverProfile =
            serde_json::from_str(&json).map_err(|_| ProfileError::Corrupted)?;
        let profile = profile.normalized();
        validate_name(&profile.name)?;
        Ok(Some(CaregiverProfile {
            phone: keep_valid(profile.phone, "phone", validate_phone),
            email: keep_valid(profile.email, "email", validate_email),
            name: profile.name,
        }))
    }

    fn save(&mut self, profile: &CaregiverProfile) -> Result<(), ProfileError> {
        let profile = profile.clone().normalized();
        validate_profile(&profile)?;
        let json = serde_json::to_string(&profile).map_err(|_| ProfileError::Corrupted)?;
        self.set(PROFILE_KEY, &json)?;
        info!("KvStore: caregiver profile saved");
        Ok(())
    }

    fn clear(&mut self) -> Result<(), ProfileError> {
        self.delete(PROFILE_KEY)?;
        info!("KvStore: caregiver profile cleared");
        Ok(())
    }
}
