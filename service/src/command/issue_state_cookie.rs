//! [`Command`] for issuing a state-restore [`Token`] along with its
//! [`Cookie`].

use common::DateTime;
use cookie::Cookie;
use tracerr::Traced;

use crate::{
    cookies,
    domain::{token, user, Token},
    TokenManager,
};

use super::{
    issue_token::{ExecutionError, IssueToken},
    Command,
};

/// [`Command`] for issuing a [`token::Kind::State`] [`Token`] and the
/// [`Cookie`] carrying it.
///
/// The [`Cookie`] is readable by client-side scripts, so it may be used to
/// restore the client state after a sign-in.
#[derive(Clone, Debug)]
pub struct IssueStateCookie {
    /// ID of the signed-in user.
    pub user_id: user::Id,

    /// Current [`user::PasswordHash`] of the user.
    pub password_hash: user::PasswordHash,

    /// Last sign-in of the user, if any.
    pub last_login: Option<user::LastLoginDateTime>,

    /// Explicit expiration of the [`Token`], usually the one of the
    /// accompanying session [`Cookie`].
    ///
    /// If [`None`], the configured state lifetime is used.
    pub expires_at: Option<token::ExpirationDateTime>,

    /// Domain of the [`Cookie`].
    ///
    /// If [`None`], the configured site host is used.
    pub domain: Option<String>,
}

/// Result of [`IssueStateCookie`] [`Command`] execution.
#[derive(Clone, Debug)]
pub struct Output {
    /// Issued [`Token`].
    pub token: Token,

    /// [`Cookie`] carrying the [`Token`].
    pub cookie: Cookie<'static>,
}

impl<Db> Command<IssueStateCookie> for TokenManager<Db>
where
    Self: Command<IssueToken, Ok = Token, Err = Traced<ExecutionError>>,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: IssueStateCookie,
    ) -> Result<Self::Ok, Self::Err> {
        let IssueStateCookie {
            user_id,
            password_hash,
            last_login,
            expires_at,
            domain,
        } = cmd;

        let expires_at = expires_at.unwrap_or_else(|| {
            (DateTime::now() + self.config.tokens.state_expiry).coerce()
        });

        let token = self
            .execute(IssueToken {
                user_id,
                binding: token::Binding::Credential(password_hash),
                last_login,
                kind: token::Kind::State,
                expires_at: Some(expires_at),
            })
            .await
            .map_err(tracerr::wrap!())?;

        let cookie = cookies::secure(
            self.config.tokens.state_cookie_name.clone(),
            token.digest.to_string(),
            domain.unwrap_or_else(|| self.config.site_host.clone()),
            expires_at,
        )
        .http_only(false)
        .build();

        Ok(Output { token, cookie })
    }
}
