use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::core::middleware::{auth_middleware, optional_auth_middleware};
use crate::features::auth::IdentityProvider;
use crate::features::files::handlers::{
    create_upload_slot, delete_my_file, list_my_files, resolve_download,
};
use crate::features::files::services::TransferService;

/// Create routes for the files feature
///
/// Owner routes require a bearer token, uploads take one if present, and
/// downloads are public.
pub fn routes(service: Arc<TransferService>, identity: Arc<dyn IdentityProvider>) -> Router {
    let owner_routes = Router::new()
        .route("/api/files/my", get(list_my_files))
        .route("/api/files/my/{token}", delete(delete_my_file))
        .route_layer(from_fn_with_state(identity.clone(), auth_middleware));

    let upload_routes = Router::new()
        .route("/api/files/upload", post(create_upload_slot))
        .route_layer(from_fn_with_state(identity, optional_auth_middleware));

    let public_routes = Router::new().route("/api/files/download/{token}", get(resolve_download));

    Router::new()
        .merge(owner_routes)
        .merge(upload_routes)
        .merge(public_routes)
        .with_state(service)
}
