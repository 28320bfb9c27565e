//! Caregiver profile: the single alert destination.
//!
//! Edited through the settings collaborator (the `set-caregiver` CLI
//! command on the host), persisted as JSON in the key-value store, and
//! snapshotted into each alert cycle when it starts.

use serde::{Deserialize, Serialize};

/// Storage key used by the web client.
pub const PROFILE_KEY: &str = "caregiverData";

/// Who gets alerted, and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaregiverProfile {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl CaregiverProfile {
    /// Build a profile, trimming fields and folding blank strings to `None`.
    pub fn new(name: &str, phone: Option<&str>, email: Option<&str>) -> Self {
        Self {
            name: name.trim().to_string(),
            phone: non_blank(phone),
            email: non_blank(email),
        }
        .normalized()
    }

    /// Trim fields and fold blank phone/email to `None`.
    ///
    /// The web settings form stored empty strings for untouched fields;
    /// profiles loaded from such stores go through here.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            phone: non_blank(self.phone.as_deref()),
            email: non_blank(self.email.as_deref()),
        }
    }
}

fn non_blank(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}
