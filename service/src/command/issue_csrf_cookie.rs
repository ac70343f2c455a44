//! [`Command`] for issuing a CSRF [`Token`] along with its [`Cookie`].

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

/// [`Command`] for issuing a [`token::Kind::Csrf`] [`Token`] and the
/// [`Cookie`] carrying it.
///
/// The [`Token`] is bound to a random [`token::Nonce`] and to the moment of
/// its issuance.
#[derive(Clone, Debug)]
pub struct IssueCsrfCookie {
    /// ID of the user the [`Token`] is issued for.
    pub user_id: user::Id,

    /// Domain of the [`Cookie`].
    ///
    /// If [`None`], the configured site host is used.
    pub domain: Option<String>,
}

/// Result of [`IssueCsrfCookie`] [`Command`] execution.
#[derive(Clone, Debug)]
pub struct Output {
    /// Issued [`Token`].
    pub token: Token,

    /// [`Cookie`] carrying the [`Token`].
    pub cookie: Cookie<'static>,
}

impl<Db> Command<IssueCsrfCookie> for TokenManager<Db>
where
    Self: Command<IssueToken, Ok = Token, Err = Traced<ExecutionError>>,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        IssueCsrfCookie { user_id, domain }: IssueCsrfCookie,
    ) -> Result<Self::Ok, Self::Err> {
        let now = DateTime::now();
        let expires_at: token::ExpirationDateTime =
            (now + self.config.tokens.csrf_expiry).coerce();

        let token = self
            .execute(IssueToken {
                user_id,
                binding: token::Binding::Opaque(token::Nonce::random()),
                last_login: Some(now.coerce()),
                kind: token::Kind::Csrf,
                expires_at: Some(expires_at),
            })
            .await
            .map_err(tracerr::wrap!())?;

        let cookie = cookies::secure(
            self.config.tokens.csrf_cookie_name.clone(),
            token.digest.to_string(),
            domain.unwrap_or_else(|| self.config.site_host.clone()),
            expires_at,
        )
        .build();

        Ok(Output { token, cookie })
    }
}
