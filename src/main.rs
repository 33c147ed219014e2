use clap::Parser; // for cli
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feedback_edge::board_access::INSTALL_SQL;
use feedback_edge::cache::{ResponseCache, cache_janitor};
use feedback_edge::config::Args;
use feedback_edge::rate_limit::{RateLimiter, bucket_sweeper};
use feedback_edge::store::{EntityStore, HttpEntityStore, MemoryEntityStore};
use feedback_edge::{AppState, build_router};

// this is main async function with tokio
#[tokio::main]
async fn main() {
    // parse cli arguments
    let args = Args::parse();

    if args.print_rls_sql {
        print!("{INSTALL_SQL}");
        return;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feedback_edge=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store: Arc<dyn EntityStore> = match &args.backend_url {
        Some(url) => {
            info!("Forwarding entity operations to {}", url);
            Arc::new(HttpEntityStore::new(
                reqwest::Client::new(),
                url,
                args.service_key.clone(),
                args.anon_key.clone(),
            ))
        }
        None => {
            info!("No backend configured, using in-memory entity store");
            Arc::new(MemoryEntityStore::new())
        }
    };

    let rate_limiter = Arc::new(RateLimiter::new());
    let cache = Arc::new(ResponseCache::new(args.cache_ttl()));

    // spawn the background sweeper
    tokio::spawn(bucket_sweeper(
        Arc::clone(&rate_limiter),
        args.sweep_interval(),
        args.bucket_retention(),
    ));
    if args.cache_ttl > 0 {
        tokio::spawn(cache_janitor(Arc::clone(&cache), args.cache_ttl()));
    }

    // creating shared state
    let state = Arc::new(AppState::new(store, rate_limiter, cache));
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!("Edge functions running on http://localhost:{}", args.port);
    info!("Response cache TTL: {} seconds", args.cache_ttl);
    info!(
        "Rate limit buckets swept every {} seconds, retained {} seconds",
        args.sweep_interval, args.bucket_retention
    );

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
