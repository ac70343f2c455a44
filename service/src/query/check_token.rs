//! [`Query`] for checking a presented [`Token`].

use common::{
    operations::{By, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{token, Token},
    infra::{database, Database},
    TokenManager,
};

use super::Query;

/// [`Query`] for checking that a presented [`token::Digest`] identifies a
/// live [`Token`] of the expected [`token::Kind`].
///
/// The [`Token`] stays stored after the check.
#[derive(Clone, Debug)]
pub struct CheckToken {
    /// Presented [`token::Digest`].
    pub digest: token::Digest,

    /// Expected [`token::Kind`].
    pub kind: token::Kind,
}

impl<Db> Query<CheckToken> for TokenManager<Db>
where
    Db: Database<
        Select<By<Option<Token>, (token::Digest, token::Kind)>>,
        Ok = Option<Token>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Token;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        CheckToken { digest, kind }: CheckToken,
    ) -> Result<Self::Ok, Self::Err> {
        let stored = {
            let _guard = self.lock.read().await;
            self.database()
                .execute(Select(By::new((digest.clone(), kind))))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> ExecutionError))?
        };
        self.verify(&digest, stored).map_err(tracerr::wrap!())
    }
}

impl<Db> TokenManager<Db> {
    /// Verifies the presented [`token::Digest`] against the [`Token`] stored
    /// under it.
    ///
    /// # Errors
    ///
    /// - [`ExecutionError::InvalidToken`] if nothing is stored, or the
    ///   [`token::Digest`] is malformed or doesn't match the stored fields.
    /// - [`ExecutionError::ExpiredToken`] if the stored [`Token`] is expired.
    pub(crate) fn verify(
        &self,
        digest: &token::Digest,
        stored: Option<Token>,
    ) -> Result<Token, ExecutionError> {
        use ExecutionError as E;

        let token = stored.ok_or(E::InvalidToken)?;
        if token.is_expired_at(DateTime::now()) {
            return Err(E::ExpiredToken);
        }

        let timestamp = digest.timestamp().ok_or(E::InvalidToken)?;
        let payload =
            token::Payload::of(&token, timestamp, self.config.time_zone);
        if !token::verify(digest, &payload, &self.signer) {
            return Err(E::InvalidToken);
        }

        Ok(token)
    }
}

/// Error of [`CheckToken`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Token`] is unknown, malformed or doesn't match its stored fields.
    #[display("Token is invalid")]
    InvalidToken,

    /// [`Token`] is expired.
    #[display("Token is expired")]
    ExpiredToken,
}
