mod common;

use std::sync::Arc;

use authgate::auth::{
    SessionValidator, TokenClaims, TokenClass, TokenCodec, TokenIssuer, TokenSecrets,
};
use authgate::error::{AppError, AuthError};
use authgate::SessionStore;
use chrono::{Duration, Utc};
use common::{harness, principal, ACCESS_SECRET, REFRESH_SECRET};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use tokio_test::{assert_err, assert_ok};

fn secrets() -> TokenSecrets {
    TokenSecrets::new(ACCESS_SECRET, REFRESH_SECRET)
}

fn is_auth_error(result: &Result<impl std::fmt::Debug, AppError>, expected: fn(&AuthError) -> bool) -> bool {
    matches!(result, Err(AppError::AuthError(e)) if expected(e))
}

#[test_log::test(tokio::test)]
async fn issued_access_token_validates_to_its_principal() {
    let h = harness().await;
    let issued = assert_ok!(h.service.login("u1@example.com", "password123").await);

    let resolved = assert_ok!(h.service.authenticate(&issued.tokens.access_token).await);
    assert_eq!(resolved, principal("u1"));
    assert_eq!(issued.principal, principal("u1"));
}

#[tokio::test]
async fn issued_tokens_carry_distinct_ids_and_windows() {
    let h = harness().await;
    let issued = h.service.login("u1@example.com", "password123").await.unwrap();

    let codec = TokenCodec::new();
    let access = codec.parse(&issued.tokens.access_token, ACCESS_SECRET).unwrap();
    let refresh = codec.parse(&issued.tokens.refresh_token, REFRESH_SECRET).unwrap();

    assert_ne!(access.jti, refresh.jti);
    assert_eq!(access.user_id, "u1");
    assert_eq!(access.iss, "u1");
    assert_eq!(access.exp - access.iat, Duration::minutes(15).num_seconds());
    assert_eq!(refresh.exp - refresh.iat, Duration::days(7).num_seconds());
    assert_eq!(h.store.get(&access.jti).await.unwrap(), "u1");
    assert_eq!(h.store.get(&refresh.jti).await.unwrap(), "u1");
}

#[test_log::test(tokio::test)]
async fn rotation_revokes_old_refresh_token_and_new_pair_validates() {
    let h = harness().await;
    let first = h.service.login("u1@example.com", "password123").await.unwrap();

    let second = assert_ok!(h.service.refresh(&first.tokens.refresh_token).await);
    assert_ne!(second.tokens, first.tokens);

    // the old refresh token's session is gone
    let replay = h.service.refresh(&first.tokens.refresh_token).await;
    assert!(is_auth_error(&replay, |e| matches!(e, AuthError::RevokedOrUnknownSession)));

    let logout_old = h.service.logout(&first.tokens.refresh_token).await;
    assert!(is_auth_error(&logout_old, |e| matches!(e, AuthError::RevokedOrUnknownSession)));

    // the new pair is live
    assert_eq!(
        h.service.authenticate(&second.tokens.access_token).await.unwrap(),
        principal("u1")
    );
    assert_ok!(h.service.refresh(&second.tokens.refresh_token).await);
}

#[tokio::test]
async fn logout_revokes_refresh_token() {
    let h = harness().await;
    let issued = h.service.login("u1@example.com", "password123").await.unwrap();

    let principal_out = assert_ok!(h.service.logout(&issued.tokens.refresh_token).await);
    assert_eq!(principal_out, principal("u1"));

    let after = h.service.refresh(&issued.tokens.refresh_token).await;
    assert!(is_auth_error(&after, |e| matches!(e, AuthError::RevokedOrUnknownSession)));
}

#[tokio::test]
async fn wrong_secret_or_algorithm_fails_regardless_of_store_state() {
    let h = harness().await;
    let claims = TokenClaims::new(&principal("u1"), "live-id".into(), Utc::now(), Duration::minutes(15))
        .unwrap();
    h.store.put("live-id", "u1", Duration::minutes(15)).await.unwrap();

    let codec = TokenCodec::new();
    let wrong_secret = codec.issue(&claims, "not-the-secret").unwrap();
    let result = h.service.authenticate(&wrong_secret).await;
    assert!(is_auth_error(&result, |e| matches!(e, AuthError::MalformedOrUnsignedToken)));

    let other_alg = encode(
        &Header::new(Algorithm::HS384),
        &claims,
        &EncodingKey::from_secret(ACCESS_SECRET.as_bytes()),
    )
    .unwrap();
    let result = h.service.authenticate(&other_alg).await;
    assert!(is_auth_error(&result, |e| matches!(e, AuthError::UnsupportedAlgorithm)));

    // the access token must not be accepted as a refresh token either
    let access = codec.issue(&claims, ACCESS_SECRET).unwrap();
    let result = h.service.refresh(&access).await;
    assert!(is_auth_error(&result, |e| matches!(e, AuthError::MalformedOrUnsignedToken)));
    assert_eq!(h.store.get("live-id").await.unwrap(), "u1");
}

#[tokio::test]
async fn store_present_token_past_its_expiry_is_expired() {
    let h = harness().await;
    let claims = TokenClaims::new(
        &principal("u1"),
        "stale".into(),
        Utc::now() - Duration::hours(1),
        Duration::minutes(15),
    )
    .unwrap();
    h.store.put("stale", "u1", Duration::hours(2)).await.unwrap();
    let token = TokenCodec::new().issue(&claims, ACCESS_SECRET).unwrap();

    let result = h.service.authenticate(&token).await;
    assert!(is_auth_error(&result, |e| matches!(e, AuthError::TokenExpired)));
}

#[tokio::test]
async fn removed_user_is_principal_not_found() {
    let h = harness().await;
    let issued = h.service.login("u1@example.com", "password123").await.unwrap();
    h.directory.remove("u1").await;

    let result = h.service.authenticate(&issued.tokens.access_token).await;
    assert!(is_auth_error(&result, |e| matches!(e, AuthError::PrincipalNotFound)));
}

#[tokio::test(start_paused = true)]
async fn store_expiry_revokes_access_before_embedded_expiry() {
    let h = harness().await;
    let issued = h.service.login("u1@example.com", "password123").await.unwrap();

    assert_eq!(
        h.service.authenticate(&issued.tokens.access_token).await.unwrap().id,
        "u1"
    );

    // Only the tokio clock moves; the wall clock the claims are checked against does not
    tokio::time::advance(std::time::Duration::from_secs(15 * 60 + 1)).await;

    let claims = TokenCodec::new()
        .parse(&issued.tokens.access_token, ACCESS_SECRET)
        .unwrap();
    assert!(!claims.is_expired_at(Utc::now()));

    let result = h.service.authenticate(&issued.tokens.access_token).await;
    assert!(is_auth_error(&result, |e| matches!(e, AuthError::RevokedOrUnknownSession)));

    // the refresh entry has its own, longer TTL
    assert_ok!(h.service.refresh(&issued.tokens.refresh_token).await);
}

#[test_log::test(tokio::test)]
async fn concurrent_rotation_of_one_refresh_token_succeeds_once() {
    let h = harness().await;
    let issued = h.service.login("u1@example.com", "password123").await.unwrap();
    let token = issued.tokens.refresh_token.clone();

    let (a, b) = tokio::join!(h.service.refresh(&token), h.service.refresh(&token));

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1);
    let failure = if a.is_err() { a } else { b };
    assert!(is_auth_error(&failure, |e| matches!(e, AuthError::RevokedOrUnknownSession)));

    let result = h.service.refresh(&token).await;
    assert!(is_auth_error(&result, |e| matches!(e, AuthError::RevokedOrUnknownSession)));
}

#[tokio::test]
async fn concurrent_rotation_across_tasks_succeeds_once() {
    let h = harness().await;
    let issued = h.service.login("u1@example.com", "password123").await.unwrap();
    let service = Arc::new(h.service);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            let token = issued.tokens.refresh_token.clone();
            tokio::spawn(async move { service.refresh(&token).await.is_ok() })
        })
        .collect();

    let results = futures::future::join_all(handles).await;
    let successes = results.into_iter().filter(|r| *r.as_ref().unwrap()).count();
    assert_eq!(successes, 1);
}

#[tokio::test]
async fn issuer_and_validator_compose_directly() {
    let h = harness().await;
    let store: Arc<dyn SessionStore> = h.store.clone();
    let issuer = TokenIssuer::new(TokenCodec::new(), secrets(), store.clone());
    let validator = SessionValidator::new(TokenCodec::new(), secrets(), store, h.directory.clone());

    let issued = issuer
        .issue(&principal("u1"), Duration::minutes(15), Duration::days(7))
        .await
        .unwrap();

    let access = validator
        .validate(&issued.tokens.access_token, TokenClass::Access)
        .await
        .unwrap();
    let refresh = validator
        .validate(&issued.tokens.refresh_token, TokenClass::Refresh)
        .await
        .unwrap();
    assert_eq!(access, refresh);

    assert_err!(
        validator
            .validate(&issued.tokens.refresh_token, TokenClass::Access)
            .await
    );
}
