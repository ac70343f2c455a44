use std::{future::IntoFuture as _, io, sync::OnceLock, time};

use application::{config::StoreKind, router, Args, Config, Service};
use axum::extract::MatchedPath;
use axum_client_ip::InsecureClientIp;
use futures::{future, TryFutureExt as _};
use service::{
    infra::{postgres, Memory, Postgres, Store},
    task,
};
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing as log;
use tracing_subscriber::{
    filter::filter_fn,
    layer::{Layer as _, SubscriberExt as _},
    util::SubscriberInitExt as _,
};

const STDERR_LEVELS: &[log::Level] = &[log::Level::WARN, log::Level::ERROR];

static LOG_LEVEL: OnceLock<log::Level> = OnceLock::new();

postgres::embed_migrations!("../migrations");

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true)
                .with_thread_names(true)
                .with_writer(io::stdout)
                .with_filter(filter_fn(|meta| {
                    meta.is_span()
                        || (!STDERR_LEVELS.contains(meta.level()))
                            && LOG_LEVEL
                                .get()
                                .copied()
                                .unwrap_or(log::Level::INFO)
                                >= *meta.level()
                })),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true)
                .with_thread_names(true)
                .with_writer(io::stderr)
                .with_filter(filter_fn(|meta| {
                    meta.is_span()
                        || (STDERR_LEVELS.contains(meta.level()))
                            && LOG_LEVEL
                                .get()
                                .copied()
                                .unwrap_or(log::Level::INFO)
                                >= *meta.level()
                })),
        )
        .init();

    _ = start().await;
}

async fn start() -> Result<(), ()> {
    let Args { config, store } = Args::parse().map_err(|e| {
        log::error!("failed to parse command line arguments: {e}");
    })?;

    let Config {
        server,
        service,
        store: store_config,
        postgres,
        log,
    } = Config::new(config).map_err(|e| {
        log::error!("failed to load `Config`: {e}");
    })?;

    LOG_LEVEL
        .set(log.level.into())
        .unwrap_or_else(|_| unreachable!("first initialization"));

    let service_config = service::Config::try_from(service).map_err(|e| {
        log::error!("malformed `service.time_zone`: {e}");
    })?;

    let store = match store.unwrap_or(store_config.kind) {
        StoreKind::Memory => {
            log::warn!("using in-memory store, revocations are lost on exit");
            Store::from(Memory::new())
        }
        StoreKind::Postgres => {
            let postgres_config = postgres.into();
            let mut postgres =
                Postgres::new(&postgres_config).map_err(|e| {
                    log::error!("failed to initialize `Postgres` client: {e}");
                })?;

            migrations::runner()
                .run_async(&mut postgres)
                .await
                .map_err(|e| {
                    log::error!("failed to run database migrations: {e}");
                })?;

            Store::from(postgres)
        }
    };

    let (trigger, shutdown) = task::shutdown::channel();
    let (service, background) =
        Service::new(service_config, store, shutdown);

    let app = router(service).layer(
        TraceLayer::new_for_http()
            .make_span_with(|r: &http::Request<_>| {
                tracing::info_span!(
                    "HTTP request",
                    http.client_ip = InsecureClientIp::from(
                        r.headers(),
                        r.extensions()
                    )
                        .map(|ip| ip.0.to_string())
                        .ok(),
                    http.flavor = ?r.version(),
                    http.host = r.uri().host(),
                    http.method = r.method().as_str(),
                    http.route = r
                        .extensions()
                        .get::<MatchedPath>()
                        .map(MatchedPath::as_str),
                    http.scheme = r
                        .uri()
                        .scheme()
                        .map(http::uri::Scheme::as_str),
                    http.target = r
                        .uri()
                        .path_and_query()
                        .map(http::uri::PathAndQuery::as_str),
                    http.user_agent = r
                        .headers()
                        .get("User-Agent")
                        .and_then(|h| h.to_str().ok()),
                    http.status_code = tracing::field::Empty,
                )
            })
            .on_response(
                |r: &http::Response<_>,
                 dur: time::Duration,
                 span: &tracing::Span| {
                    span.record(
                        "http.status_code",
                        tracing::field::display(r.status().as_u16()),
                    );

                    if r.status().is_server_error() {
                        tracing::error!(
                            duration = format!("{}ms", dur.as_millis()),
                        );
                    } else {
                        tracing::info!(
                            duration = format!("{}ms", dur.as_millis()),
                        );
                    }
                },
            ),
    );

    let listener = TcpListener::bind((server.host.clone(), server.port))
        .await
        .map_err(|e| {
            log::error!(
                "failed to listen on `{}:{}`: {e}",
                server.host,
                server.port,
            );
        })?;

    log::info!("listening on `{}:{}`", server.host, server.port);

    let serve =
        axum::serve(listener, app).with_graceful_shutdown(async move {
            if let Err(e) = signal::ctrl_c().await {
                log::error!("failed to listen for shutdown signal: {e}");
            }
            log::info!("shutting down");
            trigger.fire();
        });

    future::try_join(
        serve
            .into_future()
            .map_err(|e| log::error!("webserver failed: {e}")),
        background.into_future().map_err(|e| {
            log::error!("background task failed: {e}");
        }),
    )
    .await
    .map(drop)
}
