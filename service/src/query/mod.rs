//! [`Query`] definition.

pub mod check_token;
pub mod get_session;

/// [`Query`] of a [`TokenManager`] or a [`SessionManager`].
///
/// [`SessionManager`]: crate::SessionManager
/// [`TokenManager`]: crate::TokenManager
pub use common::Handler as Query;

pub use self::{check_token::CheckToken, get_session::GetSession};
