//! HTTP API definitions.

use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::CookieJar;
use serde::Serialize;
use service::{
    command::{self, Command as _},
    cookies,
    domain::{token, user, Session},
    query::{self, Query as _},
};

use crate::{
    error::{SessionError, TokenError},
    middleware, AsError, CsrfToken, CurrentSession, Error, Service,
};

/// Builds the HTTP API [`Router`] on top of the provided [`Service`].
///
/// No route verifies user credentials. The embedding application does that
/// and then calls [`sign_in()`] to authenticate the [`Session`].
pub fn router(service: Service) -> Router {
    let session = from_fn_with_state(service.clone(), middleware::session);
    let optional =
        from_fn_with_state(service.clone(), middleware::optional_session);
    let csrf = from_fn_with_state(service.clone(), middleware::csrf);

    Router::new()
        .route(
            "/api/session",
            get(show_session)
                .route_layer(session.clone())
                .merge(post(start_session).route_layer(optional)),
        )
        .route("/api/csrf", post(issue_csrf).route_layer(session.clone()))
        .route(
            "/api/logout",
            post(logout).route_layer(csrf).route_layer(session),
        )
        .route("/api/state", get(restore_state))
        .with_state(service)
}

/// Authenticates the provided [`Session`] as the user with the provided
/// [`user::Identity`], whose credentials the caller has verified already.
///
/// Returns the saved [`Session`] along with the `jar` carrying its session
/// cookie and a state-restore token cookie expiring with it.
///
/// # Errors
///
/// If the [`Session`] cannot be saved, or the state-restore token cannot be
/// issued.
pub async fn sign_in(
    service: &Service,
    mut session: Session,
    identity: &user::Identity,
    password_hash: user::PasswordHash,
    last_login: Option<user::LastLoginDateTime>,
    jar: CookieJar,
) -> Result<(Session, CookieJar), Error> {
    session
        .authenticate(identity)
        .map_err(|e| Error::internal(&e))?;
    let session = service
        .sessions()
        .execute(command::SaveSession(session))
        .await
        .map_err(AsError::into_error)?;

    let auth = service
        .sessions()
        .execute(command::IssueAuthCookie {
            session_id: session.id().clone(),
            domain: None,
        })
        .await
        .unwrap_or_else(|e| match e {});
    let state = service
        .tokens()
        .execute(command::IssueStateCookie {
            user_id: identity.id,
            password_hash,
            last_login,
            expires_at: Some(session.expires_at().coerce()),
            domain: None,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok((session, jar.add(auth).add(state.cookie)))
}

/// Publicly visible state of a [`Session`].
#[derive(Debug, Serialize)]
pub struct SessionView {
    /// Indicator whether the [`Session`] is authenticated.
    pub authenticated: bool,

    /// Signed-in user, if any.
    pub user: Option<user::Identity>,

    /// [RFC 3339] moment the [`Session`] expires at.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    pub expires_at: String,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            authenticated: session.is_authenticated(),
            user: session.identity().ok(),
            expires_at: session.expires_at().to_rfc3339(),
        }
    }
}

/// Restored client state.
#[derive(Debug, Serialize)]
pub struct StateView {
    /// ID of the user the state belongs to.
    pub user_id: user::Id,
}

/// Returns the current [`Session`].
async fn show_session(
    CurrentSession(session): CurrentSession,
) -> Json<SessionView> {
    Json((&session).into())
}

/// Returns the current [`Session`], starting a new anonymous one if there is
/// none.
async fn start_session(
    State(service): State<Service>,
    current: Option<CurrentSession>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SessionView>), Error> {
    if let Some(CurrentSession(session)) = current {
        return Ok((jar, Json((&session).into())));
    }

    let session = service
        .sessions()
        .execute(command::CreateSession::default())
        .await
        .map_err(AsError::into_error)?;
    let cookie = service
        .sessions()
        .execute(command::IssueAuthCookie {
            session_id: session.id().clone(),
            domain: None,
        })
        .await
        .unwrap_or_else(|e| match e {});

    Ok((jar.add(cookie), Json((&session).into())))
}

/// Issues a new CSRF token cookie for the signed-in user.
async fn issue_csrf(
    State(service): State<Service>,
    CurrentSession(session): CurrentSession,
    jar: CookieJar,
) -> Result<(http::StatusCode, CookieJar), Error> {
    let user_id = session
        .user_id()
        .map_err(|_| Error::from(SessionError::RedirectToLogin))?;

    let out = service
        .tokens()
        .execute(command::IssueCsrfCookie {
            user_id,
            domain: None,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok((http::StatusCode::NO_CONTENT, jar.add(out.cookie)))
}

/// Ends the current [`Session`], revoking the CSRF token it was confirmed
/// with.
async fn logout(
    State(service): State<Service>,
    CurrentSession(session): CurrentSession,
    CsrfToken(csrf): CsrfToken,
    jar: CookieJar,
) -> Result<(http::StatusCode, CookieJar), Error> {
    service
        .tokens()
        .execute(command::DropToken {
            digest: csrf.digest,
        })
        .await
        .map_err(AsError::into_error)?;
    service
        .sessions()
        .execute(command::DeleteSession {
            id: session.id().clone(),
        })
        .await
        .map_err(AsError::into_error)?;

    let config = service.config();
    let jar = [
        &config.sessions.cookie_name,
        &config.tokens.csrf_cookie_name,
        &config.tokens.state_cookie_name,
    ]
    .into_iter()
    .fold(jar, |jar, name| {
        jar.add(cookies::removal(name.clone(), config.site_host.clone()))
    });

    Ok((http::StatusCode::NO_CONTENT, jar))
}

/// Verifies the state-restore token cookie.
async fn restore_state(
    State(service): State<Service>,
    jar: CookieJar,
) -> Result<Json<StateView>, Error> {
    let digest = jar
        .get(&service.config().tokens.state_cookie_name)
        .ok_or(TokenError::Invalid)?
        .value()
        .to_owned();

    let token = service
        .tokens()
        .execute(query::CheckToken {
            digest: digest.into(),
            kind: token::Kind::State,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(StateView {
        user_id: token.user_id,
    }))
}

#[cfg(test)]
mod spec {
    use axum::{body::Body, response::Response, Router};
    use axum_extra::extract::{cookie::Cookie, CookieJar};
    use service::{
        command::{self, Command as _},
        domain::{token, user},
        infra::{Memory, Store},
        query::{check_token, Query as _},
        task,
    };
    use tower::ServiceExt as _;

    use crate::Service;

    use super::{router, sign_in};

    fn app() -> (Router, Service) {
        let (_trigger, shutdown) = task::shutdown::channel();
        let (service, _background) = Service::new(
            service::Config::default(),
            Store::from(Memory::new()),
            shutdown,
        );
        (router(service.clone()), service)
    }

    async fn send(
        app: &Router,
        method: http::Method,
        uri: &str,
        cookies: &[&Cookie<'_>],
    ) -> Response {
        let mut req = http::Request::builder().method(method).uri(uri);
        for cookie in cookies {
            req = req.header(
                http::header::COOKIE,
                format!("{}={}", cookie.name(), cookie.value()),
            );
        }
        app.clone()
            .oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    fn set_cookie(res: &Response, name: &str) -> Option<Cookie<'static>> {
        res.headers()
            .get_all(http::header::SET_COOKIE)
            .iter()
            .filter_map(|h| Cookie::parse(h.to_str().ok()?.to_owned()).ok())
            .find(|c| c.name() == name)
    }

    async fn json(res: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn signed_in(service: &Service) -> (Cookie<'static>, user::Id) {
        let (jar, user_id) = sign_in_alice(service).await;
        (jar.get("sfd-session-id").unwrap().clone(), user_id)
    }

    async fn sign_in_alice(service: &Service) -> (CookieJar, user::Id) {
        let identity = user::Identity {
            id: user::Id::new(),
            username: user::Username::from("alice".to_owned()),
        };
        let session = service
            .sessions()
            .execute(command::CreateSession::default())
            .await
            .unwrap();

        let (session, jar) = sign_in(
            service,
            session,
            &identity,
            user::PasswordHash::from("hash".to_owned()),
            None,
            CookieJar::new(),
        )
        .await
        .unwrap();

        assert!(session.is_authenticated());
        (jar, identity.id)
    }

    #[tokio::test]
    async fn redirects_to_login_without_session() {
        let (app, _) = app();

        let res = send(&app, http::Method::GET, "/api/session", &[]).await;

        assert_eq!(res.status(), http::StatusCode::UNAUTHORIZED);
        assert_eq!(json(res).await["code"], "REDIRECT_TO_LOGIN");
    }

    #[tokio::test]
    async fn ignores_unknown_session_cookie() {
        let (app, _) = app();
        let stale = Cookie::new("sfd-session-id", "unknown");

        let res =
            send(&app, http::Method::GET, "/api/session", &[&stale]).await;

        assert_eq!(res.status(), http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn starts_anonymous_session() {
        let (app, _) = app();

        let res = send(&app, http::Method::POST, "/api/session", &[]).await;
        assert_eq!(res.status(), http::StatusCode::OK);
        let cookie = set_cookie(&res, "sfd-session-id").unwrap();
        assert_eq!(cookie.http_only(), Some(true));

        let res =
            send(&app, http::Method::GET, "/api/session", &[&cookie]).await;
        assert_eq!(res.status(), http::StatusCode::OK);
        assert_eq!(json(res).await["authenticated"], false);

        let res =
            send(&app, http::Method::POST, "/api/session", &[&cookie]).await;
        assert_eq!(res.status(), http::StatusCode::OK);
        assert!(set_cookie(&res, "sfd-session-id").is_none());
    }

    #[tokio::test]
    async fn issues_csrf_cookie_only_to_signed_in_user() {
        let (app, service) = app();

        let res = send(&app, http::Method::POST, "/api/session", &[]).await;
        let anonymous = set_cookie(&res, "sfd-session-id").unwrap();
        let res =
            send(&app, http::Method::POST, "/api/csrf", &[&anonymous]).await;
        assert_eq!(res.status(), http::StatusCode::UNAUTHORIZED);

        let (session, _) = signed_in(&service).await;
        let res =
            send(&app, http::Method::POST, "/api/csrf", &[&session]).await;
        assert_eq!(res.status(), http::StatusCode::NO_CONTENT);
        assert!(set_cookie(&res, "X-CSRF-Token").is_some());
    }

    #[tokio::test]
    async fn logs_out_with_csrf_token() {
        let (app, service) = app();
        let (session, _) = signed_in(&service).await;

        let res =
            send(&app, http::Method::POST, "/api/csrf", &[&session]).await;
        let csrf = set_cookie(&res, "X-CSRF-Token").unwrap();

        let res =
            send(&app, http::Method::POST, "/api/logout", &[&session]).await;
        assert_eq!(res.status(), http::StatusCode::BAD_REQUEST);
        assert_eq!(json(res).await["code"], "CSRF_TOKEN_NOT_FOUND");

        let res = send(
            &app,
            http::Method::POST,
            "/api/logout",
            &[&session, &csrf],
        )
        .await;
        assert_eq!(res.status(), http::StatusCode::NO_CONTENT);
        let removed = set_cookie(&res, "sfd-session-id").unwrap();
        assert_eq!(removed.max_age().map(|a| a.whole_seconds()), Some(0));

        let res =
            send(&app, http::Method::GET, "/api/session", &[&session]).await;
        assert_eq!(res.status(), http::StatusCode::UNAUTHORIZED);

        let err = service
            .tokens()
            .execute(service::query::CheckToken {
                digest: csrf.value().to_owned().into(),
                kind: token::Kind::Csrf,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            check_token::ExecutionError::InvalidToken,
        ));
    }

    #[tokio::test]
    async fn restores_state_from_cookie() {
        let (app, service) = app();
        let user_id = user::Id::new();
        let out = service
            .tokens()
            .execute(command::IssueStateCookie {
                user_id,
                password_hash: user::PasswordHash::from("hash".to_owned()),
                last_login: None,
                expires_at: None,
                domain: None,
            })
            .await
            .unwrap();

        let res =
            send(&app, http::Method::GET, "/api/state", &[&out.cookie]).await;
        assert_eq!(res.status(), http::StatusCode::OK);
        assert_eq!(json(res).await["user_id"], user_id.to_string());

        let forged = Cookie::new("sfd-user-state-restore", "MTIz-deadbeef");
        let res =
            send(&app, http::Method::GET, "/api/state", &[&forged]).await;
        assert_eq!(res.status(), http::StatusCode::BAD_REQUEST);
        assert_eq!(json(res).await["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn keeps_user_identity_in_session() {
        let (app, service) = app();
        let (session, user_id) = signed_in(&service).await;

        let res =
            send(&app, http::Method::GET, "/api/session", &[&session]).await;
        let body = json(res).await;

        assert_eq!(body["authenticated"], true);
        assert_eq!(body["user"]["id"], user_id.to_string());
        assert_eq!(body["user"]["username"], "alice");
    }

    #[tokio::test]
    async fn signs_in_with_session_and_state_cookies() {
        let (app, service) = app();
        let (jar, user_id) = sign_in_alice(&service).await;
        let session = jar.get("sfd-session-id").unwrap();
        let state = jar.get("sfd-user-state-restore").unwrap();
        assert_eq!(session.http_only(), Some(true));
        assert_eq!(state.http_only(), Some(false));

        let res =
            send(&app, http::Method::GET, "/api/session", &[session]).await;
        assert_eq!(res.status(), http::StatusCode::OK);
        assert_eq!(json(res).await["authenticated"], true);

        let res = send(&app, http::Method::GET, "/api/state", &[state]).await;
        assert_eq!(res.status(), http::StatusCode::OK);
        assert_eq!(json(res).await["user_id"], user_id.to_string());
    }
}
