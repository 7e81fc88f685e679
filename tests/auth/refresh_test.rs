use std::sync::Arc;

use async_trait::async_trait;
use commerce_identity::modules::auth::interface::{
    RefreshTokenRepository, RepoError, RepoResult,
};
use commerce_identity::modules::auth::model::{RefreshToken, RefreshTokenWithUser};
use commerce_identity::modules::auth::schema::{ClientInfo, RefreshTokenRequest};
use commerce_identity::AuthError;

use crate::common::{client, seed_and_login, test_email, MemoryRepo, MemoryStore, TestContext};

fn refresh_request(token: &str) -> RefreshTokenRequest {
    RefreshTokenRequest {
        refresh_token: token.to_string(),
    }
}

#[tokio::test]
async fn refresh_rotates_the_token_pair() {
    let ctx = TestContext::new();
    let email = test_email();
    let tokens = seed_and_login(&ctx, &email).await;

    let rotated = ctx
        .auth
        .refresh_token(refresh_request(&tokens.refresh_token), client())
        .await
        .unwrap();
    assert_ne!(rotated.refresh_token, tokens.refresh_token);

    // Exactly one live row: the old token was deleted, the new one persisted.
    let stored = ctx.store.tokens.lock().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].token, rotated.refresh_token);
}

#[tokio::test]
async fn used_refresh_token_is_rejected_on_second_use() {
    let ctx = TestContext::new();
    let email = test_email();
    let tokens = seed_and_login(&ctx, &email).await;

    ctx.auth
        .refresh_token(refresh_request(&tokens.refresh_token), client())
        .await
        .unwrap();

    let err = ctx
        .auth
        .refresh_token(refresh_request(&tokens.refresh_token), client())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::RefreshTokenAlreadyUsed));
}

#[tokio::test]
async fn refresh_keeps_the_device_but_updates_its_identity() {
    let ctx = TestContext::new();
    let email = test_email();
    let tokens = seed_and_login(&ctx, &email).await;

    let roaming = ClientInfo {
        user_agent: "Mozilla/5.0 (new browser)".to_string(),
        ip: "203.0.113.99".to_string(),
    };
    ctx.auth
        .refresh_token(refresh_request(&tokens.refresh_token), roaming.clone())
        .await
        .unwrap();

    let devices = ctx.store.devices.lock().unwrap();
    assert_eq!(devices.len(), 1, "refresh must not create a new device");
    assert_eq!(devices[0].user_agent, roaming.user_agent);
    assert_eq!(devices[0].ip, roaming.ip);

    let stored = ctx.store.tokens.lock().unwrap();
    assert_eq!(stored[0].device_id, devices[0].id);
}

#[tokio::test]
async fn garbage_token_is_unauthorized() {
    let ctx = TestContext::new();
    let err = ctx
        .auth
        .refresh_token(refresh_request("not.a.jwt"), client())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Unauthorized));
}

/// Token store whose delete always loses to a concurrent consumer.
struct ContestedTokens(Arc<MemoryStore>);

#[async_trait]
impl RefreshTokenRepository for ContestedTokens {
    async fn create(&self, token: &RefreshToken) -> RepoResult<()> {
        MemoryRepo(self.0.clone()).create(token).await
    }

    async fn find_with_user(&self, token: &str) -> RepoResult<Option<RefreshTokenWithUser>> {
        MemoryRepo(self.0.clone()).find_with_user(token).await
    }

    async fn delete(&self, _token: &str) -> RepoResult<RefreshToken> {
        Err(RepoError::NotFound)
    }
}

#[tokio::test]
async fn losing_the_rotation_race_reads_as_already_used() {
    let ctx = TestContext::with_token_repo(|store| Arc::new(ContestedTokens(store)));
    let email = test_email();
    let tokens = seed_and_login(&ctx, &email).await;

    // The lookup passed but another consumer deleted the row first. The
    // reuse signal must survive the unauthorized-collapse of the refresh path.
    let err = ctx
        .auth
        .refresh_token(refresh_request(&tokens.refresh_token), client())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::RefreshTokenAlreadyUsed));
}

#[tokio::test]
async fn well_signed_but_never_persisted_token_reads_as_already_used() {
    let ctx = TestContext::new();
    let email = test_email();
    let tokens = seed_and_login(&ctx, &email).await;

    // Simulate theft detection: the row vanished (revoked elsewhere) while
    // the token itself still verifies.
    ctx.store.tokens.lock().unwrap().clear();

    let err = ctx
        .auth
        .refresh_token(refresh_request(&tokens.refresh_token), client())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::RefreshTokenAlreadyUsed));
}
