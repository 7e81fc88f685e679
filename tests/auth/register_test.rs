use chrono::{Duration, Utc};

use commerce_identity::modules::auth::model::{CodePurpose, VerificationCode};
use commerce_identity::AuthError;

use crate::common::{register_request, request_otp, seed_user, test_email, TestContext};

#[tokio::test]
async fn register_with_valid_otp_creates_user_and_consumes_code() {
    let ctx = TestContext::new();
    let email = test_email();
    let code = request_otp(&ctx, &email, CodePurpose::Register).await;

    let user = ctx
        .auth
        .register(register_request(&email, &code))
        .await
        .unwrap();
    assert_eq!(user.email, email);

    assert!(ctx
        .store
        .users
        .lock()
        .unwrap()
        .iter()
        .any(|u| u.email == email));
    // Code row is gone after consumption.
    assert!(ctx.store.codes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn register_twice_with_same_code_fails_with_invalid_code() {
    let ctx = TestContext::new();
    let email = test_email();
    let code = request_otp(&ctx, &email, CodePurpose::Register).await;

    ctx.auth
        .register(register_request(&email, &code))
        .await
        .unwrap();

    // The code was consumed, so the duplicate submission fails on the code
    // check, before the email uniqueness check can fire.
    let err = ctx
        .auth
        .register(register_request(&email, &code))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCode));
}

#[tokio::test]
async fn register_with_wrong_code_fails() {
    let ctx = TestContext::new();
    let email = test_email();
    let code = request_otp(&ctx, &email, CodePurpose::Register).await;
    let wrong = if code == "000000" { "000001" } else { "000000" };

    let err = ctx
        .auth
        .register(register_request(&email, wrong))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCode));
}

#[tokio::test]
async fn register_with_expired_code_fails() {
    let ctx = TestContext::new();
    let email = test_email();

    let mut row = VerificationCode::new(&email, "123456", CodePurpose::Register, Duration::zero());
    row.expires_at = Utc::now() - Duration::seconds(1);
    ctx.store
        .codes
        .lock()
        .unwrap()
        .insert((email.clone(), CodePurpose::Register), row);

    let err = ctx
        .auth
        .register(register_request(&email, "123456"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::CodeExpired));
}

#[tokio::test]
async fn register_with_taken_email_fails_with_email_already_exists() {
    let ctx = TestContext::new();
    let email = test_email();
    seed_user(&ctx, &email);

    // A code issued before the account existed can still be presented.
    let row = VerificationCode::new(&email, "654321", CodePurpose::Register, Duration::minutes(5));
    ctx.store
        .codes
        .lock()
        .unwrap()
        .insert((email.clone(), CodePurpose::Register), row);

    let err = ctx
        .auth
        .register(register_request(&email, "654321"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::EmailAlreadyExists));
}

#[tokio::test]
async fn register_assigns_default_client_role() {
    let ctx = TestContext::new();
    let email = test_email();
    let code = request_otp(&ctx, &email, CodePurpose::Register).await;

    let user = ctx
        .auth
        .register(register_request(&email, &code))
        .await
        .unwrap();
    assert_eq!(user.role_id, crate::common::CLIENT_ROLE_ID);
}
