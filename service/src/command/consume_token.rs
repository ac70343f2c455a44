//! [`Command`] for redeeming a single-use [`Token`].

use common::operations::{By, Delete, Select};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{token, Token},
    infra::{database, Database},
    query::check_token::ExecutionError,
    TokenManager,
};

use super::Command;

/// [`Command`] for checking a presented [`Token`] and revoking it at once.
///
/// No concurrent [`ConsumeToken`] of the same [`token::Digest`] may succeed
/// twice.
#[derive(Clone, Debug)]
pub struct ConsumeToken {
    /// Presented [`token::Digest`].
    pub digest: token::Digest,

    /// Expected [`token::Kind`].
    pub kind: token::Kind,
}

impl<Db> Command<ConsumeToken> for TokenManager<Db>
where
    Db: Database<
            Select<By<Option<Token>, (token::Digest, token::Kind)>>,
            Ok = Option<Token>,
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<Token, token::Digest>>,
            Ok = (),
            Err = Traced<database::Error>,
        >,
{
    type Ok = Token;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        ConsumeToken { digest, kind }: ConsumeToken,
    ) -> Result<Self::Ok, Self::Err> {
        let _guard = self.lock.write().await;

        let stored = self
            .database()
            .execute(Select(By::new((digest.clone(), kind))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> ExecutionError))?;
        let token = self.verify(&digest, stored).map_err(tracerr::wrap!())?;

        self.database()
            .execute(Delete(By::new(digest)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> ExecutionError))?;

        log::debug!("Consumed `{kind}` token of `User(id: {})`", token.user_id);

        Ok(token)
    }
}
