//! Domain definitions.

pub mod session;
pub mod token;
pub mod user;

pub use self::{session::Session, token::Token};
