//! Proptest generators for property-based testing.

use std::collections::BTreeMap;

use proptest::prelude::*;

use teamgate_core::{
    Catalog, Login, PackagePermission, PermissionLabel, PermissionSet, RegistryUser,
    RepositoryPermissions,
};
use teamgate_perms::RepositoryPermissionMap;

/// Generate a label of the known vocabulary.
pub fn permission_label() -> impl Strategy<Value = PermissionLabel> {
    prop::sample::select(PermissionLabel::ALL.to_vec())
}

/// Generate a raw label, valid or not.
pub fn raw_label() -> impl Strategy<Value = String> {
    prop_oneof![
        permission_label().prop_map(|label| label.as_str().to_string()),
        "[A-Za-z_]{0,12}",
    ]
}

/// Generate a package permission.
pub fn package_permission() -> impl Strategy<Value = PackagePermission> {
    prop::sample::select(PackagePermission::ALL.to_vec())
}

/// Generate any permission set, empty included.
pub fn permission_set() -> impl Strategy<Value = PermissionSet> {
    prop::collection::vec(package_permission(), 0..=2).prop_map(|perms| perms.into_iter().collect())
}

/// Generate a username in random case, e.g. `uSeR_3`.
pub fn username() -> impl Strategy<Value = String> {
    (0usize..8, any::<u8>()).prop_map(|(n, mask)| {
        format!("user_{n}")
            .chars()
            .enumerate()
            .map(|(i, c)| if mask & (1 << (i % 8)) != 0 { c.to_ascii_uppercase() } else { c })
            .collect()
    })
}

/// Generate a team name from a small pool, so generated users and
/// generated grants overlap.
pub fn team_name() -> impl Strategy<Value = String> {
    (0usize..4).prop_map(|n| format!("team_{n}"))
}

/// Generate the grants of one repository.
pub fn repository_permissions() -> impl Strategy<Value = RepositoryPermissions> {
    (
        prop::collection::btree_map(username().prop_map(Login::new), permission_set(), 0..4),
        prop::collection::btree_map(team_name(), permission_set(), 0..3),
    )
        .prop_map(|(users, teams)| RepositoryPermissions { users, teams })
}

/// Inputs of one resolution: a user, a catalog and an aggregate.
#[derive(Debug, Clone)]
pub struct ResolutionParams {
    pub user: RegistryUser,
    pub catalog: Catalog,
    pub repositories: RepositoryPermissionMap,
}

impl Arbitrary for ResolutionParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            username(),
            prop::collection::vec(team_name(), 0..3),
            // package index → repository index; repositories 0..6 but only
            // 0..4 exist, so some packages point nowhere.
            prop::collection::btree_map(0usize..8, 0usize..6, 0..8),
            prop::collection::vec(repository_permissions(), 4),
        )
            .prop_map(|(user, teams, packages, repositories)| ResolutionParams {
                user: RegistryUser::new(Login::new(user), teams),
                catalog: packages
                    .into_iter()
                    .map(|(p, r)| (format!("pkg_{p}"), format!("repo_{r}")))
                    .collect(),
                repositories: repositories
                    .into_iter()
                    .enumerate()
                    .map(|(i, perms)| (format!("repo_{i}"), perms))
                    .collect::<BTreeMap<_, _>>(),
            })
            .boxed()
    }
}
