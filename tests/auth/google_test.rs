use commerce_identity::modules::auth::google::{GoogleProfile, GoogleService};
use commerce_identity::AuthError;

use crate::common::{client, seed_user, test_email, TestContext, CLIENT_ROLE_ID};

const AVATAR_URL: &str = "https://lh3.example.com/avatar.png";

fn google(ctx: &TestContext) -> GoogleService {
    GoogleService::new(
        reqwest::Client::new(),
        "client-123".to_string(),
        "client-secret".to_string(),
        "https://app.example.com/cb".to_string(),
        ctx.auth.clone(),
    )
}

fn profile(email: &str) -> GoogleProfile {
    GoogleProfile {
        email: Some(email.to_string()),
        name: Some("Google User".to_string()),
        picture: Some(AVATAR_URL.to_string()),
    }
}

#[tokio::test]
async fn first_federated_login_provisions_a_client_account() {
    let ctx = TestContext::new();
    let email = test_email();

    let tokens = google(&ctx)
        .complete_login(profile(&email), client())
        .await
        .unwrap();
    assert!(!tokens.access_token.is_empty());
    assert!(!tokens.refresh_token.is_empty());

    {
        let users = ctx.store.users.lock().unwrap();
        let user = users.iter().find(|u| u.email == email).unwrap();
        assert_eq!(user.role_id, CLIENT_ROLE_ID);
        assert_eq!(user.name, "Google User");
        assert_eq!(user.avatar.as_deref(), Some(AVATAR_URL));
        // Placeholder credential: present, but unknown to anyone.
        assert!(!user.password_hash.is_empty());
    }

    assert_eq!(ctx.store.devices.lock().unwrap().len(), 1);
    assert_eq!(ctx.store.tokens.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn returning_federated_login_reuses_the_existing_account() {
    let ctx = TestContext::new();
    let email = test_email();
    let seeded = seed_user(&ctx, &email);

    let tokens = google(&ctx)
        .complete_login(profile(&email), client())
        .await
        .unwrap();
    assert!(!tokens.refresh_token.is_empty());

    let users = ctx.store.users.lock().unwrap();
    assert_eq!(users.len(), 1, "no second account for a known email");
    assert_eq!(users[0].id, seeded.id);
    // The existing profile is left untouched.
    assert!(users[0].avatar.is_none());
}

#[tokio::test]
async fn profile_without_email_is_rejected_and_leaves_no_state() {
    let ctx = TestContext::new();

    let err = google(&ctx)
        .complete_login(GoogleProfile::default(), client())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::GoogleUserInfo));

    assert!(ctx.store.users.lock().unwrap().is_empty());
    assert!(ctx.store.devices.lock().unwrap().is_empty());
    assert!(ctx.store.tokens.lock().unwrap().is_empty());
}
