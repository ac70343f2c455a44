//! Application exposes the token and session [`Service`] over HTTP.

#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod api;
pub mod args;
pub mod config;
pub mod error;
pub mod middleware;

// Used in binary.
use axum_client_ip as _;
use futures as _;
use refinery as _;
use tokio as _;
use tower_http as _;
use tracing_subscriber as _;

pub use self::{
    api::router,
    args::Args,
    config::Config,
    error::{AsError, Error},
    middleware::{CsrfToken, CurrentSession},
};

/// [`Service`] with filled infrastructure dependencies.
///
/// [`Service`]: service::Service
pub type Service = service::Service<service::infra::Store>;
