use chrono::Utc;

use commerce_identity::modules::auth::model::{Device, RefreshToken};
use commerce_identity::modules::auth::schema::LogoutRequest;
use commerce_identity::services::jwt::JwtService;
use commerce_identity::AuthError;

use crate::common::{seed_and_login, seed_user, test_email, TestContext};

fn logout_request(token: &str) -> LogoutRequest {
    LogoutRequest {
        refresh_token: token.to_string(),
    }
}

#[tokio::test]
async fn logout_revokes_the_token_and_deactivates_the_device() {
    let ctx = TestContext::new();
    let email = test_email();
    let tokens = seed_and_login(&ctx, &email).await;

    ctx.auth
        .logout(logout_request(&tokens.refresh_token))
        .await
        .unwrap();

    assert!(ctx.store.tokens.lock().unwrap().is_empty());
    let devices = ctx.store.devices.lock().unwrap();
    assert_eq!(devices.len(), 1, "device history is kept");
    assert!(!devices[0].is_active);
}

#[tokio::test]
async fn logout_is_not_idempotent_against_a_used_token() {
    let ctx = TestContext::new();
    let email = test_email();
    let tokens = seed_and_login(&ctx, &email).await;

    ctx.auth
        .logout(logout_request(&tokens.refresh_token))
        .await
        .unwrap();

    // The caller is told the token no longer exists instead of a silent ok.
    let err = ctx
        .auth
        .logout(logout_request(&tokens.refresh_token))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::RefreshTokenAlreadyUsed));
}

#[tokio::test]
async fn tampered_token_is_unauthorized() {
    let ctx = TestContext::new();
    let err = ctx
        .auth
        .logout(logout_request("not.a.jwt"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Unauthorized));
}

#[tokio::test]
async fn expired_refresh_token_can_still_be_logged_out() {
    let ctx = TestContext::new();
    let email = test_email();
    let user = seed_user(&ctx, &email);

    // Sign with the same secret but an expiry in the past.
    let expired_signer = JwtService::new(
        "access-secret".to_string(),
        "refresh-secret".to_string(),
        900,
        -300,
    );
    let token = expired_signer.sign_refresh_token(&user.id).unwrap();

    let device = Device::new(&user.id, "Mozilla/5.0 (test)", "198.51.100.1");
    ctx.store.devices.lock().unwrap().push(device.clone());
    ctx.store.tokens.lock().unwrap().push(RefreshToken {
        token: token.clone(),
        user_id: user.id.clone(),
        device_id: device.id.clone(),
        expires_at: Utc::now() - chrono::Duration::seconds(300),
        created_at: Utc::now() - chrono::Duration::days(8),
    });

    ctx.auth.logout(logout_request(&token)).await.unwrap();

    assert!(ctx.store.tokens.lock().unwrap().is_empty());
    assert!(!ctx.store.devices.lock().unwrap()[0].is_active);
}
