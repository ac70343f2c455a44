//! [`Command`] definition.

pub mod consume_token;
pub mod create_session;
pub mod delete_session;
pub mod drop_token;
pub mod issue_auth_cookie;
pub mod issue_csrf_cookie;
pub mod issue_state_cookie;
pub mod issue_token;
pub mod save_session;

/// [`Command`] of a [`TokenManager`] or a [`SessionManager`].
///
/// [`SessionManager`]: crate::SessionManager
/// [`TokenManager`]: crate::TokenManager
pub use common::Handler as Command;

pub use self::{
    consume_token::ConsumeToken, create_session::CreateSession,
    delete_session::DeleteSession, drop_token::DropToken,
    issue_auth_cookie::IssueAuthCookie, issue_csrf_cookie::IssueCsrfCookie,
    issue_state_cookie::IssueStateCookie, issue_token::IssueToken,
    save_session::SaveSession,
};
