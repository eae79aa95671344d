//! Credential files written after registration, read back by the relay

use oob_relay::credentials::{decode_user_jwt, load_envelope, CredentialStore};
use oob_relay::{Identity, IdentityKind, OobError};

#[tokio::test]
async fn test_materialized_credentials_connect_as_listen_only_user() {
    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::in_dir(dir.path());
    let account = Identity::generate_account();

    let saved = store.materialize(&account, 1_700_000_000).await.unwrap();

    // The relay only needs the creds file
    let envelope = load_envelope(&saved.creds_path).await.unwrap();
    let jwt = decode_user_jwt(&envelope.jwt).unwrap();
    jwt.verify().unwrap();
    assert_eq!(jwt.claims.iss, account.public_key());
    assert_eq!(jwt.claims.iat, 1_700_000_000);

    let user = Identity::from_seed(&envelope.seed).unwrap();
    assert_eq!(user.kind(), IdentityKind::User);
    assert_eq!(user.public_key(), jwt.claims.sub);
    assert_eq!(user.public_key(), saved.user_public_key);

    let claims = serde_json::to_value(&jwt.claims).unwrap();
    assert_eq!(claims["nats"]["pub"]["deny"], serde_json::json!([">"]));
    assert_eq!(claims["nats"]["sub"]["allow"], serde_json::json!([">"]));
}

#[tokio::test]
async fn test_stored_account_can_add_codes_later() {
    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::in_dir(dir.path());
    let account = Identity::generate_account();
    store.materialize(&account, 1_700_000_000).await.unwrap();

    let reloaded = CredentialStore::in_dir(dir.path()).load_account().await.unwrap();
    assert_eq!(reloaded.public_key(), account.public_key());

    let message = b"addServiceProviderCode";
    let signature = reloaded.sign(message).unwrap();
    assert!(account.verify(message, &signature));
}

#[tokio::test]
async fn test_missing_account_seed_is_invalid_seed() {
    let dir = tempfile::tempdir().unwrap();
    let err = CredentialStore::in_dir(dir.path())
        .load_account()
        .await
        .unwrap_err();
    assert!(matches!(err, OobError::InvalidSeed(_)));
}

#[tokio::test]
async fn test_corrupt_creds_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("user.creds");
    tokio::fs::write(&path, "-----BEGIN NATS USER JWT-----\n").await.unwrap();

    let err = load_envelope(&path).await.unwrap_err();
    assert!(matches!(err, OobError::InvalidCredentials(_)));
}
