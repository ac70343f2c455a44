//! [`Command`] for revoking a [`Token`].

use common::operations::{By, Delete};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{token, Token},
    infra::{database, Database},
    TokenManager,
};

use super::Command;

/// [`Command`] for revoking a [`Token`] by its [`token::Digest`].
///
/// Revoking a [`Token`] that is not stored is not an error.
#[derive(Clone, Debug)]
pub struct DropToken {
    /// [`token::Digest`] of the [`Token`] to revoke.
    pub digest: token::Digest,
}

impl<Db> Command<DropToken> for TokenManager<Db>
where
    Db: Database<
        Delete<By<Token, token::Digest>>,
        Ok = (),
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        DropToken { digest }: DropToken,
    ) -> Result<Self::Ok, Self::Err> {
        let _guard = self.lock.write().await;
        self.database()
            .execute(Delete(By::new(digest)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> ExecutionError))
    }
}

/// Error of [`DropToken`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Select};

    use crate::{
        domain::token::Kind,
        infra::{Database as _, Memory},
        query::{check_token, CheckToken},
        testing, Command as _, Query as _,
    };

    use super::DropToken;

    #[tokio::test]
    async fn removes_token_of_every_kind() {
        let tokens = testing::tokens(Memory::new());
        let token = testing::issue(&tokens, Kind::PasswordReset).await;

        tokens
            .execute(DropToken {
                digest: token.digest.clone(),
            })
            .await
            .unwrap();

        let stored = tokens
            .database()
            .execute(Select(By::new((token.digest, Kind::PasswordReset))))
            .await
            .unwrap();
        assert!(stored.is_none());
    }

    #[tokio::test]
    async fn is_idempotent() {
        let tokens = testing::tokens(Memory::new());
        let token = testing::issue(&tokens, Kind::Csrf).await;

        for _ in 0..2 {
            tokens
                .execute(DropToken {
                    digest: token.digest.clone(),
                })
                .await
                .unwrap();

            let err = tokens
                .execute(CheckToken {
                    digest: token.digest.clone(),
                    kind: Kind::Csrf,
                })
                .await
                .unwrap_err();
            assert!(
                matches!(
                    err.as_ref(),
                    check_token::ExecutionError::InvalidToken,
                ),
                "{err}",
            );
        }
    }
}
