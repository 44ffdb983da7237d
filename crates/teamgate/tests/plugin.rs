//! End-to-end behaviour of the registry plugin against the standard test
//! organization.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use teamgate::remote::{queries, MemoryDirectory, RemoteError};
use teamgate::{
    AuthConfig, AuthError, AuthOutcome, AuthPlugin, ConfigError, PluginError, Settings,
};
use teamgate_testkit::OrgFixture;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn plugin_with(directory: &MemoryDirectory, settings: Settings) -> AuthPlugin {
    AuthPlugin::new(&settings, Arc::new(directory.clone()), Arc::new(directory.clone()))
}

fn plugin(fixture: &OrgFixture, directory: &MemoryDirectory) -> AuthPlugin {
    plugin_with(directory, Settings::new(fixture.organization(), "admin-token"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Authentication
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_authenticate_returns_groups() {
    init_tracing();
    let fixture = OrgFixture::new();
    let directory = fixture.directory();
    let plugin = plugin(&fixture, &directory);

    let outcome = plugin.authenticate(&fixture.user(1), &fixture.token(1)).await;

    assert_eq!(outcome, AuthOutcome::Authorized(fixture.groups(1)));
    assert_eq!(fixture.groups(1), vec!["acme", "team_1", "team_2"]);
}

#[tokio::test]
async fn test_forged_credential_is_unauthorized() {
    let fixture = OrgFixture::new();
    let directory = fixture.directory();
    let plugin = plugin(&fixture, &directory);

    let outcome = plugin.authenticate(&fixture.user(1), "forged").await;

    assert_eq!(outcome, AuthOutcome::Unauthorized);
    assert_eq!(outcome.into_result().unwrap_err().status(), 401);
}

#[tokio::test]
async fn test_credential_of_another_user_is_unauthorized() {
    let fixture = OrgFixture::new();
    let directory = fixture.directory();
    let plugin = plugin(&fixture, &directory);

    let outcome = plugin.authenticate(&fixture.user(1), &fixture.token(2)).await;

    assert_eq!(outcome, AuthOutcome::Unauthorized);
    // Identity failed first; membership was never consulted.
    assert_eq!(directory.calls(&queries::ORGANIZATION_MEMBERS), 0);
}

#[tokio::test]
async fn test_non_member_is_unauthorized() {
    let fixture = OrgFixture::new();
    let directory = fixture.directory();
    let plugin = plugin(&fixture, &directory);

    let outcome = plugin.authenticate(&fixture.user(3), &fixture.token(3)).await;

    assert_eq!(outcome, AuthOutcome::Unauthorized);
    assert_eq!(directory.calls(&queries::ORGANIZATION_TEAMS), 0);
}

#[tokio::test]
async fn test_upstream_failure_is_internal() {
    init_tracing();
    let fixture = OrgFixture::new();
    let directory = fixture.directory();
    directory.fail_query(
        &queries::ORGANIZATION_MEMBERS,
        RemoteError::Status {
            status: 502,
            message: "bad gateway".into(),
        },
    );
    let plugin = plugin(&fixture, &directory);

    let outcome = plugin.authenticate(&fixture.user(1), &fixture.token(1)).await;

    assert_eq!(outcome, AuthOutcome::InternalError);
    assert_eq!(outcome.into_result().unwrap_err().status(), 500);
}

#[tokio::test]
async fn test_team_failure_is_internal_not_partial() {
    let fixture = OrgFixture::new();
    let directory = fixture.directory();
    directory.fail_query(&queries::ORGANIZATION_TEAMS, RemoteError::Transport("reset".into()));
    let plugin = plugin(&fixture, &directory);

    let outcome = plugin.authenticate(&fixture.user(1), &fixture.token(1)).await;

    assert_eq!(outcome, AuthOutcome::InternalError);
}

#[tokio::test]
async fn test_blank_username_is_unauthorized() {
    let fixture = OrgFixture::new();
    let directory = fixture.directory();
    let plugin = plugin(&fixture, &directory);

    assert_eq!(plugin.authenticate("  ", &fixture.token(1)).await, AuthOutcome::Unauthorized);
    assert_eq!(directory.total_calls(), 0);
}

#[tokio::test]
async fn test_verification_is_cached_per_login_and_credential() {
    let fixture = OrgFixture::new();
    let directory = fixture.directory();
    let plugin = plugin(&fixture, &directory);

    plugin.authenticate(&fixture.user(1), &fixture.token(1)).await;
    plugin.authenticate(&fixture.user(1).to_uppercase(), &fixture.token(1)).await;
    assert_eq!(directory.calls(&queries::VIEWER), 1);

    // A different credential is verified on its own.
    let outcome = plugin.authenticate(&fixture.user(1), &fixture.token(2)).await;
    assert_eq!(outcome, AuthOutcome::Unauthorized);
    assert_eq!(directory.calls(&queries::VIEWER), 2);

    // Membership and teams are organization-wide snapshots.
    plugin.authenticate(&fixture.user(2), &fixture.token(2)).await;
    assert_eq!(directory.calls(&queries::ORGANIZATION_MEMBERS), 1);
    assert_eq!(directory.calls(&queries::ORGANIZATION_TEAMS), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_authentications_share_upstream_calls() {
    let fixture = OrgFixture::new();
    let directory = fixture.directory().with_latency(Duration::from_millis(50));
    let plugin = plugin(&fixture, &directory);

    let (user_a, token_a) = (fixture.user(1), fixture.token(1));
    let (user_b, token_b) = (fixture.user(1), fixture.token(1));
    let (a, b) = tokio::join!(
        plugin.authenticate(&user_a, &token_a),
        plugin.authenticate(&user_b, &token_b),
    );

    assert_eq!(a, b);
    assert_eq!(directory.calls(&queries::VIEWER), 1);
    assert_eq!(directory.calls(&queries::ORGANIZATION_MEMBERS), 1);
}

#[tokio::test(start_paused = true)]
async fn test_membership_changes_apply_after_ttl() {
    let fixture = OrgFixture::new();
    let directory = fixture.directory();
    let settings = Settings::new(fixture.organization(), "admin-token").with_cache_ttl(Duration::from_secs(60));
    let plugin = plugin_with(&directory, settings);

    assert!(matches!(
        plugin.authenticate(&fixture.user(2), &fixture.token(2)).await,
        AuthOutcome::Authorized(_)
    ));

    directory.remove_member(&fixture.user(2));
    assert!(matches!(
        plugin.authenticate(&fixture.user(2), &fixture.token(2)).await,
        AuthOutcome::Authorized(_)
    ));

    tokio::time::advance(Duration::from_secs(61)).await;
    assert_eq!(
        plugin.authenticate(&fixture.user(2), &fixture.token(2)).await,
        AuthOutcome::Unauthorized
    );
}

#[tokio::test]
async fn test_authenticate_callback() {
    let fixture = OrgFixture::new();
    let directory = fixture.directory();
    let plugin = plugin(&fixture, &directory);
    let calls = AtomicUsize::new(0);

    plugin
        .authenticate_with(&fixture.user(3), &fixture.token(3), |result| {
            calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(result, Err(PluginError::Unauthorized));
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Access Checks
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_access_and_publish() {
    let fixture = OrgFixture::new();
    let directory = fixture.directory();
    let plugin = plugin(&fixture, &directory);
    let user_1 = fixture.registry_user(1);
    let user_2 = fixture.registry_user(2);

    for n in 1..=3 {
        assert!(plugin.allow_access(&user_1, &fixture.package(n)).await.unwrap(), "pkg_{n}");
    }
    assert!(plugin.allow_publish(&user_1, &fixture.package(1)).await.unwrap());
    assert!(plugin.allow_publish(&user_1, &fixture.package(2)).await.unwrap());
    assert!(!plugin.allow_publish(&user_1, &fixture.package(3)).await.unwrap());
    assert!(!plugin.allow_access(&user_1, &fixture.package(4)).await.unwrap());

    assert!(plugin.allow_access(&user_2, &fixture.package(1)).await.unwrap());
    assert!(!plugin.allow_publish(&user_2, &fixture.package(1)).await.unwrap());
    assert!(!plugin.allow_access(&user_2, &fixture.package(2)).await.unwrap());
    assert!(!plugin.allow_access(&user_2, &fixture.package(4)).await.unwrap());
}

#[tokio::test]
async fn test_unpublish_follows_publish() {
    let fixture = OrgFixture::new();
    let directory = fixture.directory();
    let plugin = plugin(&fixture, &directory);

    for n in 1..=2 {
        let user = fixture.registry_user(n);
        for p in 1..=4 {
            let package = fixture.package(p);
            assert_eq!(
                plugin.allow_unpublish(&user, &package).await.unwrap(),
                plugin.allow_publish(&user, &package).await.unwrap(),
            );
        }
    }
}

#[tokio::test]
async fn test_unknown_package_is_denied() {
    let fixture = OrgFixture::new();
    let directory = fixture.directory();
    let plugin = plugin(&fixture, &directory);

    assert!(!plugin.allow_access(&fixture.registry_user(1), "not-a-package").await.unwrap());
}

#[tokio::test]
async fn test_excluded_repository_is_not_a_package() {
    let fixture = OrgFixture::new();
    let directory = fixture.directory();
    let config = AuthConfig::from_value(serde_json::json!({
        "organization": fixture.organization(),
        "token": "admin-token",
        "excludeRepositories": [fixture.repository(1)],
    }))
    .unwrap();
    let plugin = plugin_with(&directory, config.validate().unwrap());

    assert!(!plugin.allow_access(&fixture.registry_user(1), &fixture.package(1)).await.unwrap());
    assert!(plugin.allow_access(&fixture.registry_user(1), &fixture.package(2)).await.unwrap());
}

#[tokio::test]
async fn test_access_checks_share_snapshots() {
    let fixture = OrgFixture::new();
    let directory = fixture.directory();
    let plugin = plugin(&fixture, &directory);

    for n in 1..=2 {
        let user = fixture.registry_user(n);
        for p in 1..=4 {
            plugin.allow_access(&user, &fixture.package(p)).await.unwrap();
            plugin.allow_publish(&user, &fixture.package(p)).await.unwrap();
        }
    }

    assert_eq!(directory.calls(&queries::REPOSITORY_MANIFESTS), 1);
    assert_eq!(directory.calls(&queries::REPOSITORY_PERMISSIONS), 1);
}

#[tokio::test]
async fn test_access_error_is_returned_raw() {
    let fixture = OrgFixture::new();
    let directory = fixture.directory();
    directory.fail_query(&queries::REPOSITORY_MANIFESTS, RemoteError::Transport("reset".into()));
    let plugin = plugin(&fixture, &directory);

    let result = plugin.allow_access(&fixture.registry_user(1), &fixture.package(1)).await;

    assert!(matches!(result, Err(AuthError::Permission(_))));
}

#[tokio::test]
async fn test_access_callbacks() {
    let fixture = OrgFixture::new();
    let directory = fixture.directory();
    let plugin = plugin(&fixture, &directory);
    let user = fixture.registry_user(2);
    let answers = std::sync::Mutex::new(Vec::new());

    plugin
        .allow_access_with(&user, &fixture.package(1), |r| answers.lock().unwrap().push(r.unwrap()))
        .await;
    plugin
        .allow_publish_with(&user, &fixture.package(1), |r| answers.lock().unwrap().push(r.unwrap()))
        .await;
    plugin
        .allow_unpublish_with(&user, &fixture.package(1), |r| answers.lock().unwrap().push(r.unwrap()))
        .await;

    assert_eq!(*answers.lock().unwrap(), vec![true, false, false]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_from_config_requires_organization_and_token() {
    let missing_org = AuthConfig::from_yaml("token: t\n").unwrap();
    assert!(matches!(AuthPlugin::from_config(&missing_org), Err(ConfigError::Missing("organization"))));

    let missing_token = AuthConfig::from_yaml("organization: acme\n").unwrap();
    assert!(matches!(AuthPlugin::from_config(&missing_token), Err(ConfigError::Missing("token"))));
}
