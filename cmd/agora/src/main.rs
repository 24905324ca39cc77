//! # agora
//!
//! Assembles the server from configuration: document store, comment
//! layout, propagation mode and the HTTP adapter.

#[cfg(not(feature = "web-axum"))]
compile_error!("agora needs a web adapter; enable the `web-axum` feature");

use std::sync::Arc;

use anyhow::{bail, Context};
use api_adapters::{router, AppState, Metrics};
use configs::{
    CommentLayout, LogFormat, PropagationMode, Settings, SiblingOrder as ConfiguredOrder,
    StoreBackend, StoreSettings,
};
use domains::{CommentRepository, DocumentStore, PostRepository, ProfileRepository};
use services::{
    AlbumService, AncestorWalk, CommentTreeService, PostService, ProfileService, Propagator,
    PropagationWorker, RetryPolicy, SiblingOrder, VoteLedger,
};
use storage_adapters::{
    ChildListComments, DocumentAlbum, DocumentPosts, DocumentProfiles, DocumentVotes,
    MemoryDocumentStore, ParentPointerComments, TimedStore,
};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    init_tracing(&settings);
    info!(env = %settings.environment, "configuration loaded");

    let store = build_store(&settings.store).await?;
    let (state, worker) = assemble(&settings, store);

    let address = settings.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!(%address, "agora listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    if let Some(worker) = worker {
        info!("draining propagation queue");
        worker.shutdown().await;
    }
    info!("agora stopped");
    Ok(())
}

/// `RUST_LOG` wins over `log.filter` when set.
fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match settings.log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

async fn build_store(settings: &StoreSettings) -> anyhow::Result<Arc<dyn DocumentStore>> {
    let inner: Arc<dyn DocumentStore> = match settings.backend {
        StoreBackend::Memory => {
            warn!("using the in-memory store; data is lost on restart");
            Arc::new(MemoryDocumentStore::new())
        }
        StoreBackend::Postgres => connect_postgres(settings).await?,
    };
    Ok(Arc::new(TimedStore::new(inner, settings.op_timeout())))
}

#[cfg(feature = "db-postgres")]
async fn connect_postgres(settings: &StoreSettings) -> anyhow::Result<Arc<dyn DocumentStore>> {
    use secrecy::ExposeSecret;
    use storage_adapters::PgDocumentStore;

    let Some(url) = settings.database_url.as_ref() else {
        bail!("store.database_url is required for the postgres backend");
    };
    let store = PgDocumentStore::connect(url.expose_secret(), settings.max_connections)
        .await
        .context("connecting to postgres")?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "db-postgres"))]
async fn connect_postgres(_settings: &StoreSettings) -> anyhow::Result<Arc<dyn DocumentStore>> {
    bail!("store.backend = postgres, but agora was built without the `db-postgres` feature")
}

fn assemble(settings: &Settings, store: Arc<dyn DocumentStore>) -> (AppState, Option<PropagationWorker>) {
    let forum = &settings.forum;

    let profiles: Arc<dyn ProfileRepository> = Arc::new(DocumentProfiles::new(store.clone()));
    let posts: Arc<dyn PostRepository> = Arc::new(DocumentPosts::new(store.clone()));
    let comments: Arc<dyn CommentRepository> = match forum.comment_layout {
        CommentLayout::ChildList => Arc::new(ChildListComments::new(store.clone())),
        CommentLayout::ParentPointer => Arc::new(ParentPointerComments::new(store.clone())),
    };

    let walk = Arc::new(AncestorWalk::new(comments.clone(), posts.clone()));
    let (propagator, worker) = match forum.propagation.mode {
        PropagationMode::Inline => (Propagator::inline(walk), None),
        PropagationMode::Background => {
            let policy = RetryPolicy {
                queue_capacity: forum.propagation.queue_capacity,
                max_attempts: forum.propagation.max_attempts,
                backoff: forum.propagation.retry_backoff(),
            };
            let (propagator, worker) = Propagator::background(walk, policy);
            (propagator, Some(worker))
        }
    };
    let order = match forum.sibling_order {
        ConfiguredOrder::BestFirst => SiblingOrder::BestFirst,
        ConfiguredOrder::Insertion => SiblingOrder::Insertion,
    };
    info!(layout = ?forum.comment_layout, propagation = ?forum.propagation.mode, ?order,
        "forum assembled");

    let state = AppState {
        profiles: Arc::new(ProfileService::new(profiles.clone())),
        album: Arc::new(AlbumService::new(Arc::new(DocumentAlbum::new(store.clone())))),
        posts: Arc::new(PostService::new(posts.clone(), profiles.clone())),
        comments: Arc::new(CommentTreeService::new(comments, posts, profiles, propagator, order)),
        votes: Arc::new(VoteLedger::new(Arc::new(DocumentVotes::new(store)))),
        metrics: Arc::new(Metrics::new()),
    };
    (state, worker)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
