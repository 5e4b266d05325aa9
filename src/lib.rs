pub mod authz;
pub mod config;
pub mod error;
pub mod handlers;
pub mod lock;
pub mod router;
pub mod storage;
pub mod token;

use std::sync::Arc;

use axum::extract::Request;
use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::router::Dispatcher;
use crate::storage::Storage;
use crate::token::TokenService;

/// Shared application state. Handlers receive a clone per request; the
/// collaborators behind the Arcs are the only process-wide mutables.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, tokens: Arc<TokenService>) -> Self {
        Self { storage, tokens }
    }
}

/// Build the application router.
///
/// Every request funnels through the regex dispatcher mounted as the
/// fallback; axum itself owns no routes. The route table is built once here
/// and read-only afterwards.
pub fn app(state: AppState) -> Router {
    let dispatcher = Arc::new(Dispatcher::new(handlers::routes(), state));

    Router::new()
        .fallback(move |request: Request| {
            let dispatcher = Arc::clone(&dispatcher);
            async move { dispatcher.dispatch(request).await }
        })
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
