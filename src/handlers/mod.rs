// Route handlers, one module per resource
pub mod accounts;
pub mod playlists;
pub mod tracks;

use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::error::ApiError;
use crate::router::{HandlerResult, RequestContext, RouteTable};
use crate::storage::{AccountRecord, Storage, StorageError};

/// Build the route table.
///
/// Order matters: the dispatcher takes the first entry whose pattern and
/// method both match, so `/users/signin` is reachable only because nothing
/// before it claims POST on that path. Collection patterns accept an
/// optional trailing slash.
pub fn routes() -> RouteTable {
    let mut table = RouteTable::new();

    table.register(Method::GET, "/", welcome);

    table.register(Method::POST, "/users(/|)", accounts::create);
    table.register(Method::DELETE, "/users/(?P<id>[^/]+)", accounts::delete);
    table.register(Method::PATCH, "/users/(?P<id>[^/]+)", accounts::update);
    table.register(Method::GET, "/users/(?P<id>[^/]+)", accounts::show);
    table.register(Method::GET, "/users(/|)", accounts::list);
    table.register(Method::POST, "/users/signin", accounts::signin);
    table.register(Method::POST, "/users/refreshToken", accounts::refresh_token);

    table.register(Method::GET, "/playlists(/|)", playlists::list);
    table.register(Method::GET, "/playlists/(?P<id>[^/]+)", playlists::show);
    table.register(Method::POST, "/playlists(/|)", playlists::create);
    table.register(Method::PATCH, "/playlists/(?P<id>[^/]+)", playlists::update);
    table.register(Method::DELETE, "/playlists/(?P<id>[^/]+)", playlists::delete);
    table.register(Method::POST, "/playlists/(?P<id>[^/]+)/track", playlists::add_track);

    table.register(Method::PATCH, "/tracks/(?P<id>[^/]+)", tracks::update);
    table.register(Method::DELETE, "/tracks/(?P<id>[^/]+)", tracks::delete);

    table
}

/// GET / - unauthenticated liveness greeting
async fn welcome(_ctx: RequestContext) -> HandlerResult {
    Ok((
        StatusCode::OK,
        Json(json!({ "message": "Welcome to tracksync-server" })),
    )
        .into_response())
}

/// Load the account behind a verified token identity.
///
/// A token can outlive its account; when the account is gone the session is
/// no longer good for anything, which is an authentication failure rather
/// than a lookup miss.
pub(crate) async fn account_for_identity(
    storage: &dyn Storage,
    identity: &str,
) -> Result<AccountRecord, ApiError> {
    storage.account_by_email(identity).await.map_err(|err| match err {
        StorageError::NotFound { .. } => ApiError::unauthorized("Failed to find user account"),
        other => other.into(),
    })
}
