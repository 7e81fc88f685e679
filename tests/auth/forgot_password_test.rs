use commerce_identity::modules::auth::model::CodePurpose;
use commerce_identity::modules::auth::schema::ForgotPasswordRequest;
use commerce_identity::AuthError;

use crate::common::{
    client, login_request, request_otp, seed_user, test_email, TestContext, TEST_PASSWORD,
};

const NEW_PASSWORD: &str = "brand-New-passw0rd";

fn forgot_request(email: &str, code: &str) -> ForgotPasswordRequest {
    ForgotPasswordRequest {
        email: email.to_string(),
        code: code.to_string(),
        new_password: NEW_PASSWORD.to_string(),
        confirm_new_password: NEW_PASSWORD.to_string(),
    }
}

#[tokio::test]
async fn forgot_password_changes_the_password_and_consumes_the_code() {
    let ctx = TestContext::new();
    let email = test_email();
    seed_user(&ctx, &email);
    let code = request_otp(&ctx, &email, CodePurpose::ForgotPassword).await;

    ctx.auth
        .forgot_password(forgot_request(&email, &code))
        .await
        .unwrap();

    // Old password no longer works, new one does.
    let err = ctx
        .auth
        .login(login_request(&email, TEST_PASSWORD), client())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidPassword));
    ctx.auth
        .login(login_request(&email, NEW_PASSWORD), client())
        .await
        .unwrap();

    // A second reset with the consumed code fails.
    let err = ctx
        .auth
        .forgot_password(forgot_request(&email, &code))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCode));
}

#[tokio::test]
async fn forgot_password_for_unknown_email_fails() {
    let ctx = TestContext::new();
    let err = ctx
        .auth
        .forgot_password(forgot_request(&test_email(), "123456"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::EmailNotFound));
}

#[tokio::test]
async fn forgot_password_with_wrong_code_leaves_the_password_unchanged() {
    let ctx = TestContext::new();
    let email = test_email();
    seed_user(&ctx, &email);
    let code = request_otp(&ctx, &email, CodePurpose::ForgotPassword).await;
    let wrong = if code == "000000" { "000001" } else { "000000" };

    let err = ctx
        .auth
        .forgot_password(forgot_request(&email, wrong))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCode));

    ctx.auth
        .login(login_request(&email, TEST_PASSWORD), client())
        .await
        .unwrap();
}

#[tokio::test]
async fn register_purpose_code_does_not_reset_a_password() {
    let ctx = TestContext::new();
    let email = test_email();
    seed_user(&ctx, &email);

    // Issue a code under the wrong purpose directly; purposes never cross.
    let row = commerce_identity::modules::auth::model::VerificationCode::new(
        &email,
        "222333",
        CodePurpose::Register,
        chrono::Duration::minutes(5),
    );
    ctx.store
        .codes
        .lock()
        .unwrap()
        .insert((email.clone(), CodePurpose::Register), row);

    let err = ctx
        .auth
        .forgot_password(forgot_request(&email, "222333"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCode));
}
