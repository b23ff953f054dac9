//! Account to service resolution

mod common;

use common::{NOW, account, clock, http, settings, store_with, token_body};
use mailbridge::{
    EmailServiceFactory, ListEmailsParams, MailError, Provider, ProviderEndpoints,
    create_email_service,
};
use mockito::Matcher;
use serde_json::json;

#[test]
fn test_gmail_account_gets_gmail_service_with_stored_token() {
    let mut server = mockito::Server::new();
    let list_mock = server
        .mock("GET", "/gmail/v1/users/me/messages")
        .match_query(Matcher::Any)
        .match_header("authorization", "Bearer stored-token")
        .with_status(200)
        .with_body(json!({}).to_string())
        .create();

    let factory = EmailServiceFactory::new(
        store_with(vec![account("g-1", Provider::Google, "stored-token", NOW + 3600)]),
        http(),
        settings(&server),
    )
    .with_clock(clock());

    let service = factory.create_email_service_from_account("g-1").unwrap();
    assert_eq!(service.provider(), Provider::Google);

    service.list_emails(&ListEmailsParams::default()).unwrap();
    list_mock.assert();
}

#[test]
fn test_expired_outlook_token_is_refreshed_before_use() {
    let mut server = mockito::Server::new();
    let token_mock = server
        .mock("POST", "/common/oauth2/v2.0/token")
        .with_status(200)
        .with_body(token_body("refreshed", 3600))
        .expect(1)
        .create();
    let folders_mock = server
        .mock("GET", "/v1.0/me/mailFolders")
        .match_query(Matcher::Any)
        .match_header("authorization", "Bearer refreshed")
        .with_status(200)
        .with_body(json!({ "value": [] }).to_string())
        .create();

    let factory = EmailServiceFactory::new(
        store_with(vec![account("o-1", Provider::Microsoft, "expired", NOW - 10)]),
        http(),
        settings(&server),
    )
    .with_clock(clock());

    let service = factory.create_email_service_from_account("o-1").unwrap();
    assert_eq!(service.provider(), Provider::Microsoft);
    assert!(service.list_folders().unwrap().is_empty());

    token_mock.assert();
    folders_mock.assert();
}

#[test]
fn test_revoked_token_fails_before_any_provider_call() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/token")
        .with_status(400)
        .with_body(json!({ "error": "invalid_grant" }).to_string())
        .create();
    let api_mock = server
        .mock("GET", Matcher::Regex("^/gmail/".to_string()))
        .expect(0)
        .create();

    let factory = EmailServiceFactory::new(
        store_with(vec![account("g-1", Provider::Google, "expired", NOW)]),
        http(),
        settings(&server),
    )
    .with_clock(clock());

    let err = factory.create_email_service_from_account("g-1").err().unwrap();
    assert!(matches!(err, MailError::TokenExpiredOrRevoked { .. }));
    api_mock.assert();
}

#[test]
fn test_unknown_account() {
    let server = mockito::Server::new();
    let factory = EmailServiceFactory::new(store_with(vec![]), http(), settings(&server));

    let err = factory.create_email_service_from_account("nobody").err().unwrap();
    assert!(matches!(err, MailError::AccountNotFound { .. }));
}

#[test]
fn test_create_from_token_picks_provider() {
    let endpoints = ProviderEndpoints::default();
    assert_eq!(
        create_email_service(Provider::Google, http(), "t", &endpoints).provider(),
        Provider::Google
    );
    assert_eq!(
        create_email_service(Provider::Microsoft, http(), "t", &endpoints).provider(),
        Provider::Microsoft
    );
}
