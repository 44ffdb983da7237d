//! The organization's repository permission vocabulary.
//!
//! Repository permissions are reported as one of six labels. They collapse
//! onto the package lattice as follows:
//!
//! | Label                          | Package permissions |
//! |--------------------------------|---------------------|
//! | `ADMIN`, `MAINTAIN`, `WRITE`   | `{read, write}`     |
//! | `TRIAGE`, `READ`               | `{read}`            |
//! | `NONE`                         | `{}`                |
//!
//! Anything else is an environment mismatch and fails with
//! [`CoreError::UnknownPermission`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::permission::PermissionSet;

/// A repository permission as reported by the organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PermissionLabel {
    Admin,
    Maintain,
    Write,
    Triage,
    Read,
    None,
}

impl PermissionLabel {
    /// All labels of the vocabulary.
    pub const ALL: [PermissionLabel; 6] = [
        PermissionLabel::Admin,
        PermissionLabel::Maintain,
        PermissionLabel::Write,
        PermissionLabel::Triage,
        PermissionLabel::Read,
        PermissionLabel::None,
    ];

    /// Wire name of the label.
    pub const fn as_str(self) -> &'static str {
        match self {
            PermissionLabel::Admin => "ADMIN",
            PermissionLabel::Maintain => "MAINTAIN",
            PermissionLabel::Write => "WRITE",
            PermissionLabel::Triage => "TRIAGE",
            PermissionLabel::Read => "READ",
            PermissionLabel::None => "NONE",
        }
    }

    /// Package permissions conferred by this label.
    pub const fn package_permissions(self) -> PermissionSet {
        match self {
            PermissionLabel::Admin | PermissionLabel::Maintain | PermissionLabel::Write => {
                PermissionSet::READ_WRITE
            }
            PermissionLabel::Triage | PermissionLabel::Read => PermissionSet::READ,
            PermissionLabel::None => PermissionSet::EMPTY,
        }
    }
}

impl FromStr for PermissionLabel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        PermissionLabel::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| CoreError::UnknownPermission(s.to_string()))
    }
}

impl fmt::Display for PermissionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a raw label, as found in a remote response, to package permissions.
///
/// An absent label is as much of an error as an unrecognized one.
pub fn map_label(raw: Option<&str>) -> Result<PermissionSet> {
    let raw = raw.ok_or_else(|| CoreError::UnknownPermission("<absent>".to_string()))?;
    Ok(raw.parse::<PermissionLabel>()?.package_permissions())
}
