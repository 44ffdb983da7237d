//! Package permissions and permission sets.
//!
//! The package side of the mapping is a two-valued lattice: a user may
//! `read` a package, `write` it, both, or neither. A [`PermissionSet`] is a
//! subset of `{read, write}` and merging grants is plain set union.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// A permission on a published package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackagePermission {
    /// Install / fetch the package.
    Read,
    /// Publish or unpublish versions of the package.
    Write,
}

impl PackagePermission {
    /// All package permissions, in display order.
    pub const ALL: [PackagePermission; 2] = [PackagePermission::Read, PackagePermission::Write];

    const fn bit(self) -> u8 {
        match self {
            PackagePermission::Read => 0b01,
            PackagePermission::Write => 0b10,
        }
    }

    /// Lowercase name used in configuration and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            PackagePermission::Read => "read",
            PackagePermission::Write => "write",
        }
    }
}

impl fmt::Display for PackagePermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of package permissions.
///
/// Always a subset of `{read, write}`. Order of insertion is irrelevant and
/// inserting the same permission twice is a no-op.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<PackagePermission>", from = "Vec<PackagePermission>")]
pub struct PermissionSet(u8);

impl PermissionSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// `{read}`.
    pub const READ: Self = Self(PackagePermission::Read.bit());

    /// `{read, write}`.
    pub const READ_WRITE: Self = Self(PackagePermission::Read.bit() | PackagePermission::Write.bit());

    /// Create an empty set.
    pub const fn new() -> Self {
        Self::EMPTY
    }

    /// Whether `permission` is a member of this set.
    pub const fn contains(self, permission: PackagePermission) -> bool {
        self.0 & permission.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Add a permission to this set.
    pub fn insert(&mut self, permission: PackagePermission) {
        self.0 |= permission.bit();
    }

    /// Return a new set with `permission` added.
    #[must_use]
    pub const fn with(self, permission: PackagePermission) -> Self {
        Self(self.0 | permission.bit())
    }

    /// Iterate the members in display order (`read` before `write`).
    pub fn iter(self) -> impl Iterator<Item = PackagePermission> {
        PackagePermission::ALL
            .into_iter()
            .filter(move |p| self.contains(*p))
    }
}

/// Union of two permission sets.
///
/// Returns a new set containing every element of both inputs. Idempotent
/// and commutative, so merging grants in any order, or merging the same
/// grant twice, yields the same result.
pub fn union(a: PermissionSet, b: PermissionSet) -> PermissionSet {
    PermissionSet(a.0 | b.0)
}

impl BitOr for PermissionSet {
    type Output = PermissionSet;

    fn bitor(self, rhs: Self) -> Self::Output {
        union(self, rhs)
    }
}

impl BitOrAssign for PermissionSet {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = union(*self, rhs);
    }
}

impl FromIterator<PackagePermission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = PackagePermission>>(iter: I) -> Self {
        iter.into_iter()
            .fold(PermissionSet::EMPTY, |set, p| set.with(p))
    }
}

impl From<Vec<PackagePermission>> for PermissionSet {
    fn from(permissions: Vec<PackagePermission>) -> Self {
        permissions.into_iter().collect()
    }
}

impl From<PermissionSet> for Vec<PackagePermission> {
    fn from(set: PermissionSet) -> Self {
        set.iter().collect()
    }
}

impl fmt::Debug for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, permission) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(permission.as_str())?;
        }
        f.write_str("}")
    }
}
