//! HTTP middleware binding [`Token`]s and [`Session`]s to requests.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use service::{
    domain::{token, Session, Token},
    query::{self, get_session, Query as _},
};
use tracing as log;

use crate::{
    error::{SessionError, TokenError},
    AsError, Error, Service,
};

/// Verified CSRF [`Token`] of the current request.
#[derive(Clone, Debug)]
pub struct CsrfToken(pub Token);

/// [`Session`] of the current request.
#[derive(Clone, Debug)]
pub struct CurrentSession(pub Session);

/// Requires a valid CSRF [`Token`] cookie, exposing it as [`CsrfToken`].
///
/// # Errors
///
/// If the cookie is missing or carries an invalid or expired [`Token`].
pub async fn csrf(
    State(service): State<Service>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, Error> {
    let digest = jar
        .get(&service.config().tokens.csrf_cookie_name)
        .ok_or(TokenError::CsrfNotFound)?
        .value()
        .to_owned();

    let token = service
        .tokens()
        .execute(query::CheckToken {
            digest: digest.into(),
            kind: token::Kind::Csrf,
        })
        .await
        .map_err(AsError::into_error)?;

    drop(req.extensions_mut().insert(CsrfToken(token)));
    Ok(next.run(req).await)
}

/// Requires a live [`Session`] cookie, exposing it as [`CurrentSession`].
///
/// # Errors
///
/// With `REDIRECT_TO_LOGIN` code if there is no live [`Session`], so the
/// client may redirect to its login page.
pub async fn session(
    State(service): State<Service>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, Error> {
    let session = from_cookie(&service, &jar)
        .await?
        .ok_or(SessionError::RedirectToLogin)?;

    drop(req.extensions_mut().insert(CurrentSession(session)));
    Ok(next.run(req).await)
}

/// Exposes the live [`Session`], if any, as [`CurrentSession`].
///
/// Never rejects a request.
pub async fn optional_session(
    State(service): State<Service>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    match from_cookie(&service, &jar).await {
        Ok(Some(session)) => {
            drop(req.extensions_mut().insert(CurrentSession(session)));
        }
        Ok(None) => {}
        Err(e) => log::warn!("failed to load `Session`: {e}"),
    }
    next.run(req).await
}

/// Loads the [`Session`] referenced by the cookie in the provided
/// [`CookieJar`].
async fn from_cookie(
    service: &Service,
    jar: &CookieJar,
) -> Result<Option<Session>, Error> {
    let Some(cookie) = jar.get(&service.config().sessions.cookie_name) else {
        return Ok(None);
    };

    match service
        .sessions()
        .execute(query::GetSession {
            id: cookie.value().to_owned().into(),
        })
        .await
    {
        Ok(session) => Ok(Some(session)),
        Err(e)
            if matches!(e.as_ref(), get_session::ExecutionError::NotFound) =>
        {
            Ok(None)
        }
        Err(e) => Err(e.into_error()),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CsrfToken
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| TokenError::CsrfNotFound.into())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| SessionError::RedirectToLogin.into())
    }
}
