//! Doctor models.

use serde::{Deserialize, Serialize};

use super::RecordId;

/// A doctor bills can be attributed to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    /// Store-assigned identifier
    pub id: RecordId,
    /// Display name, unique within the set (case-sensitive)
    pub name: String,
}

/// Insert payload for a doctor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewDoctor {
    pub name: String,
}

impl NewDoctor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Check whether `name` is already taken. Exact, case-sensitive match.
pub fn doctor_exists(doctors: &[Doctor], name: &str) -> bool {
    doctors.iter().any(|d| d.name == name)
}
