//! [`Command`] for issuing a new [`Token`].

use common::{operations::Insert, DateTime};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{token, user, Token},
    infra::{database, Database},
    TokenManager,
};

use super::Command;

/// [`Command`] for issuing a new [`Token`].
#[derive(Clone, Debug)]
pub struct IssueToken {
    /// ID of the user the [`Token`] is issued for.
    pub user_id: user::Id,

    /// [`token::Binding`] the [`Token`] is signed with.
    pub binding: token::Binding,

    /// Last sign-in of the user, if any.
    pub last_login: Option<user::LastLoginDateTime>,

    /// [`token::Kind`] of the [`Token`].
    pub kind: token::Kind,

    /// Explicit expiration of the [`Token`].
    ///
    /// If [`None`], the configured lifetime of the [`token::Kind`] is used.
    pub expires_at: Option<token::ExpirationDateTime>,
}

impl<Db> Command<IssueToken> for TokenManager<Db>
where
    Db: Database<Insert<Token>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Token;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: IssueToken) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let IssueToken {
            user_id,
            binding,
            last_login,
            kind,
            expires_at,
        } = cmd;

        let now = DateTime::now();
        let expires_at = match expires_at {
            Some(at) => at,
            None => {
                let lifetime = self
                    .config
                    .tokens
                    .expiry(kind)
                    .ok_or(E::UnrecognizedKind(kind))
                    .map_err(tracerr::wrap!())?;
                (now + lifetime).coerce()
            }
        };

        let time_zone = self.config.time_zone;
        let digest = token::Digest::sign(
            &token::Payload {
                user_id,
                binding: &binding,
                last_login,
                timestamp: token::Timestamp::at(now, time_zone),
                kind,
                time_zone,
            },
            &self.signer,
        );
        let token = Token {
            digest,
            kind,
            user_id,
            binding,
            last_login,
            expires_at,
            created_at: now.coerce(),
            updated_at: Some(now.coerce()),
        };

        {
            let _guard = self.lock.write().await;
            self.database()
                .execute(Insert(token.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
        }

        log::debug!("Issued `{kind}` token for `User(id: {user_id})`");

        Ok(token)
    }
}

/// Error of [`IssueToken`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`token::Kind`] has no configured lifetime and no explicit expiration
    /// was provided.
    #[display("Unrecognized `{_0}` token kind")]
    UnrecognizedKind(#[error(not(source))] token::Kind),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{
        operations::{By, Select},
        DateTime,
    };

    use crate::{
        domain::token::{self, Kind},
        infra::{Database as _, Memory},
        testing, Command as _,
    };

    use super::{ExecutionError, IssueToken};

    #[tokio::test]
    async fn stores_issued_token() {
        let tokens = testing::tokens(Memory::new());
        let user_id = testing::user_id();

        let token = tokens
            .execute(IssueToken {
                user_id,
                binding: testing::credential("hash"),
                last_login: None,
                kind: Kind::Registration,
                expires_at: None,
            })
            .await
            .unwrap();

        let stored = tokens
            .database()
            .execute(Select(By::new((
                token.digest.clone(),
                Kind::Registration,
            ))))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.user_id, user_id);
        assert_eq!(stored.digest, token.digest);
        assert!(stored.updated_at.is_some());
    }

    #[tokio::test]
    async fn applies_kind_lifetime() {
        let tokens = testing::tokens(Memory::new());
        let before = DateTime::now();

        let token = tokens
            .execute(IssueToken {
                user_id: testing::user_id(),
                binding: testing::credential("hash"),
                last_login: None,
                kind: Kind::PasswordReset,
                expires_at: None,
            })
            .await
            .unwrap();

        let lifetime = token.expires_at.saturating_duration_since(before);
        assert!(lifetime >= Duration::from_secs(60 * 60), "{lifetime:?}");
        assert!(lifetime < Duration::from_secs(60 * 60 + 5), "{lifetime:?}");
    }

    #[tokio::test]
    async fn honors_explicit_expiration() {
        let tokens = testing::tokens(Memory::new());
        let expires_at: token::ExpirationDateTime =
            (DateTime::now() + Duration::from_secs(42)).coerce();

        let token = tokens
            .execute(IssueToken {
                user_id: testing::user_id(),
                binding: testing::credential("hash"),
                last_login: None,
                kind: Kind::Redirect,
                expires_at: Some(expires_at),
            })
            .await
            .unwrap();

        assert_eq!(token.expires_at, expires_at);
    }

    #[tokio::test]
    async fn rejects_kind_without_lifetime() {
        let tokens = testing::tokens(Memory::new());

        for kind in [Kind::Redirect, Kind::State] {
            let err = tokens
                .execute(IssueToken {
                    user_id: testing::user_id(),
                    binding: testing::credential("hash"),
                    last_login: None,
                    kind,
                    expires_at: None,
                })
                .await
                .unwrap_err();

            assert!(
                matches!(
                    err.as_ref(),
                    ExecutionError::UnrecognizedKind(k) if *k == kind,
                ),
                "{err}",
            );
        }
    }
}
