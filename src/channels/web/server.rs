//! Axum HTTP server for the case management API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::{Method, Uri, header};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tower_http::cors::{AllowHeaders, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::channels::web::auth::auth_middleware;
use crate::channels::web::handlers::{
    auth, cases, clients, companies, documents, notes, tasks, users,
};
use crate::channels::web::types::HealthResponse;
use crate::config::Config;
use crate::db::{Database, PageLimits};
use crate::error::{ApiError, GatewayError};
use crate::practice::access::AccessPolicy;

/// Request body cap for everything except document uploads.
const REQUEST_BODY_LIMIT: usize = 1024 * 1024;
/// Maximum size of a single uploaded file (10 MiB).
pub const UPLOAD_FILE_SIZE_LIMIT: usize = 10 * 1024 * 1024;

/// Shared state for all gateway handlers.
pub struct GatewayState {
    /// System of record.
    pub store: Arc<dyn Database>,
    /// Role rules for write operations.
    pub access: AccessPolicy,
    /// Default and maximum list sizes.
    pub page_limits: PageLimits,
    /// Simulated network latency applied to every API request.
    pub latency: Duration,
    /// Shutdown signal sender.
    pub shutdown_tx: tokio::sync::RwLock<Option<oneshot::Sender<()>>>,
    /// The serving task, awaited by [`GatewayState::shutdown`].
    pub serve_task: Mutex<Option<JoinHandle<()>>>,
    /// Server startup time for uptime calculation.
    pub startup_time: Instant,
}

impl GatewayState {
    pub fn new(store: Arc<dyn Database>, config: &Config) -> Self {
        Self {
            store,
            access: AccessPolicy::new(config.gateway.enforce_roles),
            page_limits: config.store.page_limits,
            latency: config.gateway.latency,
            shutdown_tx: tokio::sync::RwLock::new(None),
            serve_task: Mutex::new(None),
            startup_time: Instant::now(),
        }
    }

    /// Signal graceful shutdown and wait until in-flight requests finish and
    /// the listener is closed. A no-op when the server was never started.
    pub async fn shutdown(&self) {
        if let Some(tx) = self.shutdown_tx.write().await.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.serve_task.lock().await.take()
            && let Err(e) = task.await
        {
            tracing::error!("Web gateway task failed: {}", e);
        }
    }
}

/// Build the API router. Public routes are health and login; everything else
/// goes through [`auth_middleware`].
pub fn build_router(state: Arc<GatewayState>) -> Router {
    let public = Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/auth/login", axum::routing::post(auth::login_handler));

    let protected = Router::new()
        .route("/api/auth/me", get(auth::me_handler))
        // Users
        .route(
            "/api/users",
            get(users::users_list_handler).post(users::users_create_handler),
        )
        .route(
            "/api/users/{id}",
            get(users::users_get_handler)
                .put(users::users_update_handler)
                .delete(users::users_delete_handler),
        )
        // Clients
        .route(
            "/api/clients",
            get(clients::clients_list_handler).post(clients::clients_create_handler),
        )
        .route(
            "/api/clients/{id}",
            get(clients::clients_get_handler)
                .put(clients::clients_update_handler)
                .delete(clients::clients_delete_handler),
        )
        // Cases
        .route(
            "/api/cases",
            get(cases::cases_list_handler).post(cases::cases_create_handler),
        )
        .route(
            "/api/cases/{id}",
            get(cases::cases_get_handler)
                .put(cases::cases_update_handler)
                .delete(cases::cases_delete_handler),
        )
        .route("/api/cases/{id}/assistants", get(cases::case_team_list_handler))
        .route(
            "/api/cases/{id}/assistants/{assistant_id}",
            axum::routing::post(cases::case_team_assign_handler)
                .delete(cases::case_team_remove_handler),
        )
        .route(
            "/api/cases/{id}/companies",
            get(companies::case_companies_handler),
        )
        // Tasks
        .route(
            "/api/tasks",
            get(tasks::tasks_list_handler).post(tasks::tasks_create_handler),
        )
        .route(
            "/api/tasks/{id}",
            get(tasks::tasks_get_handler)
                .put(tasks::tasks_update_handler)
                .delete(tasks::tasks_delete_handler),
        )
        // Documents
        .route(
            "/api/documents",
            get(documents::documents_list_handler)
                .post(documents::documents_create_handler)
                .layer(DefaultBodyLimit::max(UPLOAD_FILE_SIZE_LIMIT)),
        )
        .route(
            "/api/documents/{id}",
            get(documents::documents_get_handler).delete(documents::documents_delete_handler),
        )
        .route(
            "/api/documents/{id}/download",
            get(documents::documents_download_handler),
        )
        // Notes
        .route(
            "/api/notes",
            get(notes::notes_list_handler).post(notes::notes_create_handler),
        )
        .route(
            "/api/notes/{id}",
            get(notes::notes_get_handler)
                .put(notes::notes_update_handler)
                .delete(notes::notes_delete_handler),
        )
        // Companies
        .route(
            "/api/companies",
            get(companies::companies_list_handler).post(companies::companies_create_handler),
        )
        .route("/api/companies/{id}", get(companies::companies_get_handler))
        .route(
            "/api/companies/{id}/cases/{case_id}",
            axum::routing::post(companies::company_link_handler)
                .delete(companies::company_unlink_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .fallback(not_implemented_handler)
        .method_not_allowed_fallback(not_implemented_handler)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            simulated_latency,
        ))
        .layer(DefaultBodyLimit::max(REQUEST_BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            header::HeaderValue::from_static("nosniff"),
        ))
        .with_state(state)
}

/// Start the gateway HTTP server.
///
/// Returns the actual bound `SocketAddr` (useful when binding to port 0).
pub async fn start_server(
    addr: SocketAddr,
    state: Arc<GatewayState>,
) -> Result<SocketAddr, GatewayError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| GatewayError::StartupFailed {
            reason: format!("Failed to bind to {}: {}", addr, e),
        })?;
    let bound_addr = listener
        .local_addr()
        .map_err(|e| GatewayError::StartupFailed {
            reason: format!("Failed to get local addr: {}", e),
        })?;

    // CORS: only the browser client served from this host may call the API.
    let origins = [
        format!("http://{}:{}", bound_addr.ip(), bound_addr.port()),
        format!("http://localhost:{}", bound_addr.port()),
        "http://localhost:5173".to_string(),
    ]
    .iter()
    .map(|origin| origin.parse())
    .collect::<Result<Vec<header::HeaderValue>, _>>()
    .map_err(|e| GatewayError::StartupFailed {
        reason: format!("Invalid CORS origin: {}", e),
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
        ]));

    let app = build_router(state.clone()).layer(cors);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    *state.shutdown_tx.write().await = Some(shutdown_tx);

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Web gateway shutting down");
            })
            .await
        {
            tracing::error!("Web gateway server error: {}", e);
        }
    });
    *state.serve_task.lock().await = Some(task);

    tracing::info!(addr = %bound_addr, "Web gateway listening");
    Ok(bound_addr)
}

/// Delay every API response so clients exercise their loading states.
async fn simulated_latency(
    State(state): State<Arc<GatewayState>>,
    request: Request,
    next: Next,
) -> Response {
    tokio::time::sleep(state.latency).await;
    next.run(request).await
}

// --- Health ---

async fn health_handler(State(state): State<Arc<GatewayState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        backend: state.store.backend_name(),
        uptime_secs: state.startup_time.elapsed().as_secs(),
    })
}

/// Unknown paths and unsupported methods.
async fn not_implemented_handler(method: Method, uri: Uri) -> ApiError {
    ApiError::Unsupported(format!("{} {} not implemented", method, uri.path()))
}
