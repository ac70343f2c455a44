//! Helpers shared by unit tests.

use std::{sync::Arc, time::Duration};

use common::DateTime;

use crate::{
    command::IssueToken,
    domain::{token, user, Token},
    infra::Memory,
    Command as _, Config, SessionManager, TokenManager,
};

/// [`Config`] with a non-default secret.
pub(crate) fn config() -> Config {
    Config {
        secret_key: "test-secret".to_owned().into(),
        token_salt: "test-salt".to_owned().into(),
        ..Config::default()
    }
}

pub(crate) fn tokens(db: Memory) -> TokenManager<Memory> {
    tokens_with(config(), db)
}

pub(crate) fn tokens_with(config: Config, db: Memory) -> TokenManager<Memory> {
    TokenManager::new(Arc::new(config), db)
}

pub(crate) fn sessions(db: Memory) -> SessionManager<Memory> {
    SessionManager::new(Arc::new(config()), db)
}

pub(crate) fn user_id() -> user::Id {
    user::Id::new()
}

pub(crate) fn credential(hash: &str) -> token::Binding {
    token::Binding::Credential(hash.to_owned().into())
}

/// Issues a [`Token`] of the provided [`token::Kind`] expiring in an hour.
pub(crate) async fn issue(
    tokens: &TokenManager<Memory>,
    kind: token::Kind,
) -> Token {
    let binding = match kind {
        token::Kind::Csrf => token::Binding::Opaque(token::Nonce::random()),
        token::Kind::Registration
        | token::Kind::PasswordReset
        | token::Kind::Redirect
        | token::Kind::State => credential("hash"),
    };
    tokens
        .execute(IssueToken {
            user_id: user_id(),
            binding,
            last_login: Some(DateTime::now().coerce()),
            kind,
            expires_at: Some(
                (DateTime::now() + Duration::from_secs(60 * 60)).coerce(),
            ),
        })
        .await
        .unwrap()
}
