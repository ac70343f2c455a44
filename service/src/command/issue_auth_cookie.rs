//! [`Command`] for issuing a [`Cookie`] carrying a [`session::Id`].

use std::convert::Infallible;

use common::DateTime;
use cookie::{Cookie, SameSite};

use crate::{domain::session, SessionManager};

use super::Command;

/// [`Command`] for issuing a [`Cookie`] authenticating its bearer with the
/// provided [`session::Id`].
#[derive(Clone, Debug)]
pub struct IssueAuthCookie {
    /// [`session::Id`] carried by the [`Cookie`].
    pub session_id: session::Id,

    /// Domain of the [`Cookie`].
    ///
    /// If [`None`], the configured site host is used.
    pub domain: Option<String>,
}

impl<Db> Command<IssueAuthCookie> for SessionManager<Db> {
    type Ok = Cookie<'static>;
    type Err = Infallible;

    async fn execute(
        &self,
        IssueAuthCookie { session_id, domain }: IssueAuthCookie,
    ) -> Result<Self::Ok, Self::Err> {
        let sessions = &self.config.sessions;
        let expires_at = DateTime::now() + sessions.max_age;

        Ok(crate::cookies::secure(
            sessions.cookie_name.clone(),
            session_id.to_string(),
            domain.unwrap_or_else(|| self.config.site_host.clone()),
            expires_at,
        )
        .same_site(SameSite::Strict)
        .build())
    }
}
