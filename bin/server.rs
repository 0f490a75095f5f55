// Delivery Routes - Web Server
// REST API with Axum: login, upload, carriers, stops, optimized route

use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use delivery_routes::{
    carrier_codes, load_records_from_bytes, plan_route, AddressResolver, AppConfig, CarrierStops,
    DeliveryRecord, LoginOutcome, PasswordGate, RouteError, RouteSummary, RoutingClient, Session,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Sessions untouched for this long are dropped at the next login
const SESSION_IDLE_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Per-user state: authentication plus the last uploaded table
struct UserSession {
    session: Session,
    records: Vec<DeliveryRecord>,
    last_seen: Instant,
}

type SessionMap = HashMap<String, UserSession>;

/// Drop every session idle for longer than `ttl`, returning how many went
fn prune_idle_sessions(sessions: &mut SessionMap, now: Instant, ttl: Duration) -> usize {
    let before = sessions.len();
    sessions.retain(|_, user| now.saturating_duration_since(user.last_seen) <= ttl);
    before - sessions.len()
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    gate: Arc<PasswordGate>,
    sessions: Arc<Mutex<SessionMap>>,
    resolver: Arc<AddressResolver>,
    client: Arc<dyn RoutingClient>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Response {
        (
            StatusCode::OK,
            Json(Self {
                success: true,
                data: Some(data),
                error: None,
            }),
        )
            .into_response()
    }
}

fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message.into()),
        }),
    )
        .into_response()
}

fn route_error_response(err: &RouteError) -> Response {
    let status = match err {
        RouteError::MissingColumns { .. } | RouteError::Load(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RouteError::EmptyRoute => StatusCode::NOT_FOUND,
        RouteError::Routing(_) => StatusCode::BAD_GATEWAY,
        RouteError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    api_error(status, err.to_string())
}

#[derive(Deserialize)]
struct LoginRequest {
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
}

#[derive(Deserialize)]
struct UploadQuery {
    filename: String,
}

#[derive(Serialize)]
struct UploadResponse {
    rows: usize,
    carriers: Vec<String>,
}

#[derive(Serialize)]
struct CarrierResponse {
    code: String,
    home_city: String,
    rows: usize,
}

// ============================================================================
// Session helpers
// ============================================================================

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
}

/// Run `f` against the caller's authenticated session, or answer 401
fn with_session<F>(state: &AppState, headers: &HeaderMap, f: F) -> Response
where
    F: FnOnce(&mut UserSession) -> Response,
{
    let token = match bearer_token(headers) {
        Some(t) => t,
        None => return api_error(StatusCode::UNAUTHORIZED, "Missing bearer token"),
    };

    let mut sessions = match state.sessions.lock() {
        Ok(guard) => guard,
        Err(_) => return api_error(StatusCode::INTERNAL_SERVER_ERROR, "Session store poisoned"),
    };

    match sessions.get_mut(&token) {
        Some(user) if user.session.is_authenticated() => {
            user.last_seen = Instant::now();
            f(user)
        }
        _ => api_error(StatusCode::UNAUTHORIZED, "Not logged in"),
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    ApiResponse::ok("OK")
}

/// POST /api/login - Exchange the shared password for a session token
async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Response {
    let mut session = Session::new(&state.gate);

    match session.login(&state.gate, &req.password) {
        LoginOutcome::Accepted => {}
        LoginOutcome::Rejected => return api_error(StatusCode::UNAUTHORIZED, "Wrong password."),
        LoginOutcome::Empty => return api_error(StatusCode::BAD_REQUEST, "Password is required"),
    }

    let token = uuid::Uuid::new_v4().to_string();
    match state.sessions.lock() {
        Ok(mut sessions) => {
            let now = Instant::now();
            let dropped = prune_idle_sessions(&mut sessions, now, SESSION_IDLE_TTL);
            if dropped > 0 {
                log::info!("Dropped {} idle sessions", dropped);
            }
            sessions.insert(
                token.clone(),
                UserSession {
                    session,
                    records: Vec::new(),
                    last_seen: now,
                },
            );
        }
        Err(_) => return api_error(StatusCode::INTERNAL_SERVER_ERROR, "Session store poisoned"),
    }

    ApiResponse::ok(LoginResponse { token })
}

/// POST /api/logout - Forget the caller's session
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let (Some(token), Ok(mut sessions)) = (bearer_token(&headers), state.sessions.lock()) {
        sessions.remove(&token);
    }
    ApiResponse::ok("OK")
}

/// POST /api/upload?filename=... - Replace the caller's table with the request body
async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UploadQuery>,
    body: axum::body::Bytes,
) -> Response {
    let authorized = with_session(&state, &headers, |_| StatusCode::OK.into_response());
    if authorized.status() != StatusCode::OK {
        return authorized;
    }

    // Parse off the runtime and outside the session lock
    let filename = query.filename.clone();
    let parsed =
        tokio::task::spawn_blocking(move || load_records_from_bytes(&filename, body.to_vec()))
            .await;

    match parsed {
        Ok(Ok(records)) => with_session(&state, &headers, |user| {
            let response = UploadResponse {
                rows: records.len(),
                carriers: carrier_codes(&records),
            };
            user.records = records;
            ApiResponse::ok(response)
        }),
        Ok(Err(e)) => {
            log::warn!("Rejected upload {}: {}", query.filename, e);
            route_error_response(&e)
        }
        Err(e) => {
            log::error!("Upload task panicked: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Upload failed")
        }
    }
}

/// GET /api/carriers - Carriers in the uploaded table
async fn get_carriers(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let resolver = state.resolver.clone();
    with_session(&state, &headers, |user| {
        let carriers: Vec<CarrierResponse> = carrier_codes(&user.records)
            .into_iter()
            .map(|code| CarrierResponse {
                rows: user.records.iter().filter(|r| r.carrier_code == code).count(),
                home_city: resolver.carriers().home_city(&code).to_string(),
                code,
            })
            .collect();
        ApiResponse::ok(carriers)
    })
}

/// GET /api/carriers/:code/stops - Origin and unique destinations
async fn get_stops(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(code): Path<String>,
) -> Response {
    let resolver = state.resolver.clone();
    with_session(&state, &headers, |user| {
        ApiResponse::ok(resolver.stops_for(&user.records, &code))
    })
}

/// POST /api/carriers/:code/route - Optimized route for one carrier
async fn compute_route(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(code): Path<String>,
) -> Response {
    // Resolve under the lock, call the service outside it
    let mut stops: Option<CarrierStops> = None;
    let resolver = state.resolver.clone();
    let denied = with_session(&state, &headers, |user| {
        stops = Some(resolver.stops_for(&user.records, &code));
        StatusCode::OK.into_response()
    });

    let stops = match stops {
        Some(s) => s,
        None => return denied,
    };

    let client = state.client.clone();
    let result = tokio::task::spawn_blocking(move || {
        plan_route(client.as_ref(), &stops.origin.location, &stops.destinations())
    })
    .await;

    match result {
        Ok(Ok(plan)) => ApiResponse::ok(RouteSummary::from_plan(&plan)),
        Ok(Err(e)) => {
            log::warn!("Route for {} failed: {}", code, e);
            route_error_response(&e)
        }
        Err(e) => {
            log::error!("Routing task panicked: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Routing task failed")
        }
    }
}

// ============================================================================
// Main Server
// ============================================================================

fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("🌐 Delivery Routes - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = AppConfig::from_env()?;

    // No routing client → no partial service
    let client = match config.routing_client() {
        Ok(client) => client,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let resolver = AddressResolver::new(config.carrier_directory()?);
    let gate = PasswordGate::new(config.password.as_deref());
    if gate.is_open() {
        log::warn!("No password configured, the dashboard API is open");
    }

    println!("✓ Carrier home bases: {}", resolver.carriers().len());

    // The blocking HTTP client must be created and dropped outside the runtime
    let client: Arc<dyn RoutingClient> = Arc::new(client);
    let state = AppState {
        gate: Arc::new(gate),
        sessions: Arc::new(Mutex::new(HashMap::new())),
        resolver: Arc::new(resolver),
        client: client.clone(),
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(serve(state, &config.bind_addr));
    drop(runtime);
    drop(client);

    result
}

async fn serve(state: AppState, addr: &str) -> anyhow::Result<()> {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/upload", post(upload))
        .route("/carriers", get(get_carriers))
        .route("/carriers/:code/stops", get(get_stops))
        .route("/carriers/:code/route", post(compute_route))
        .with_state(state);

    let app = Router::new().nest("/api", api_routes).layer(
        ServiceBuilder::new()
            .layer(CorsLayer::permissive())
            .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/carriers", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app).await?;
    Ok(())
}
