// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::multiple_crate_versions)]

mod live;
mod provision;
mod session;

use axum::{
    Json, Router,
    extract::{Path, Query, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::Parser;
use custody_api::{
    AnnotateTransferRequest, ApiError, AssetDetailResponse, CreateTransferRequest, ErrorKind,
    ListAssetsQuery, ListAssetsResponse, ListColleaguesResponse, ListTransfersQuery,
    ListTransfersResponse, LoginRequest, LoginResponse, OtpAttemptPolicy, OtpEnrollmentResponse,
    ResolveTransferRequest, SessionPolicy, TransferResponse, TransferServices, UserProfile,
    VerifyOtpRequest, VerifyOtpResponse,
};
use custody_domain::{AssetId, TransferId};
use custody_persistence::Persistence;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::live::{LiveEventBroadcaster, live_events_handler};
use crate::session::SessionUser;

/// Custody Server - HTTP server for equipment custody transfers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the `SQLite` database file. If not provided, uses in-memory database.
    #[arg(short, long, env = "CUSTODY_DATABASE")]
    database: Option<PathBuf>,

    /// Address to bind the server to
    #[arg(short, long, env = "CUSTODY_BIND", default_value = "127.0.0.1")]
    bind: String,

    /// Port to bind the server to
    #[arg(short, long, env = "CUSTODY_PORT", default_value_t = 3000)]
    port: u16,

    /// Session lifetime in hours
    #[arg(long, env = "CUSTODY_SESSION_HOURS", default_value_t = 12)]
    session_hours: i64,

    /// Failed one-time codes tolerated before a lockout
    #[arg(long, env = "CUSTODY_OTP_MAX_FAILURES", default_value_t = 5)]
    otp_max_failures: u32,

    /// Length of the one-time code lockout in seconds
    #[arg(long, env = "CUSTODY_OTP_LOCKOUT_SECONDS", default_value_t = 300)]
    otp_lockout_seconds: i64,

    /// JSON file of organizations, users and assets to load at startup
    #[arg(long, env = "CUSTODY_PROVISION")]
    provision: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is not set
    #[arg(long, env = "CUSTODY_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    /// The persistence layer. Every request holds the lock for its whole
    /// read-decide-write sequence.
    persistence: Arc<Mutex<Persistence>>,
    /// Verifier, attempt limiter and notifier.
    services: Arc<TransferServices>,
    /// Session lifetime.
    session_policy: SessionPolicy,
    /// Broadcaster for the live event stream.
    live_broadcaster: Arc<LiveEventBroadcaster>,
}

impl AppState {
    fn new(
        persistence: Persistence,
        session_policy: SessionPolicy,
        otp_policy: OtpAttemptPolicy,
    ) -> Self {
        let live_broadcaster: Arc<LiveEventBroadcaster> = Arc::new(LiveEventBroadcaster::new());
        Self {
            persistence: Arc::new(Mutex::new(persistence)),
            services: Arc::new(TransferServices::new(live_broadcaster.clone(), otp_policy)),
            session_policy,
            live_broadcaster,
        }
    }
}

/// Error response type.
#[derive(Debug, Clone, Serialize)]
struct ErrorResponse {
    /// Error indicator.
    error: bool,
    /// Stable machine-readable code.
    code: &'static str,
    /// Error message.
    message: String,
}

/// HTTP error wrapper that implements `IntoResponse`.
#[derive(Debug)]
struct HttpError {
    /// The HTTP status code.
    status: StatusCode,
    /// Stable machine-readable code.
    code: &'static str,
    /// The error message.
    message: String,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body: Json<ErrorResponse> = Json(ErrorResponse {
            error: true,
            code: self.code,
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        let status: StatusCode = match err.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
            ErrorKind::InvalidState => StatusCode::CONFLICT,
            ErrorKind::ValidationFailed => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::AuthFactorFailed if err.code() == "otp_locked_out" => {
                StatusCode::TOO_MANY_REQUESTS
            }
            ErrorKind::AuthFactorFailed => StatusCode::FORBIDDEN,
            ErrorKind::AuthenticationFailed => StatusCode::UNAUTHORIZED,
            ErrorKind::Infrastructure => {
                error!(error = %err, "Infrastructure error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            code: err.code(),
            message: err.to_string(),
        }
    }
}

// ========================================================================
// Authentication
// ========================================================================

/// Handler for POST `/auth/login`.
async fn handle_login(
    AxumState(app_state): AxumState<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response: LoginResponse = custody_api::login(
        &mut persistence,
        &req,
        &app_state.session_policy,
        OffsetDateTime::now_utc(),
    )?;
    Ok(Json(response))
}

/// Handler for POST `/auth/logout`.
async fn handle_logout(
    AxumState(app_state): AxumState<AppState>,
    SessionUser { session_token, .. }: SessionUser,
) -> Result<StatusCode, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    custody_api::logout(&mut persistence, &session_token)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET `/auth/me`.
async fn handle_whoami(
    AxumState(app_state): AxumState<AppState>,
    SessionUser { user, .. }: SessionUser,
) -> Result<Json<UserProfile>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    Ok(Json(custody_api::whoami(&mut persistence, &user)?))
}

/// Handler for GET `/auth/otp/enrollment`.
async fn handle_otp_enrollment(
    AxumState(app_state): AxumState<AppState>,
    SessionUser { user, .. }: SessionUser,
) -> Result<Json<OtpEnrollmentResponse>, HttpError> {
    Ok(Json(custody_api::otp_enrollment(&app_state.services, &user)?))
}

/// Handler for POST `/auth/otp/verify`.
async fn handle_verify_otp(
    AxumState(app_state): AxumState<AppState>,
    SessionUser { user, .. }: SessionUser,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Json<VerifyOtpResponse>, HttpError> {
    let response: VerifyOtpResponse =
        custody_api::verify_otp(&app_state.services, &user, req, OffsetDateTime::now_utc())?;
    Ok(Json(response))
}

// ========================================================================
// Transfers
// ========================================================================

/// Handler for POST `/transfers`.
async fn handle_create_transfer(
    AxumState(app_state): AxumState<AppState>,
    SessionUser { user, .. }: SessionUser,
    Json(req): Json<CreateTransferRequest>,
) -> Result<(StatusCode, Json<TransferResponse>), HttpError> {
    info!(
        user_id = user.id.value(),
        asset_id = req.asset_id.value(),
        receiver_id = req.receiver_id.value(),
        "Handling create_transfer request"
    );

    let mut persistence = app_state.persistence.lock().await;
    let response: TransferResponse = custody_api::create_transfer(
        &mut persistence,
        &app_state.services,
        &user,
        req,
        OffsetDateTime::now_utc(),
    )?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Handler for GET `/transfers`.
async fn handle_list_transfers(
    AxumState(app_state): AxumState<AppState>,
    SessionUser { user, .. }: SessionUser,
    Query(query): Query<ListTransfersQuery>,
) -> Result<Json<ListTransfersResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    Ok(Json(custody_api::list_transfers(
        &mut persistence,
        &user,
        query,
    )?))
}

/// Handler for GET `/transfers/{id}`.
async fn handle_get_transfer(
    AxumState(app_state): AxumState<AppState>,
    SessionUser { user, .. }: SessionUser,
    Path(transfer_id): Path<TransferId>,
) -> Result<Json<TransferResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    Ok(Json(custody_api::get_transfer(
        &mut persistence,
        &user,
        transfer_id,
    )?))
}

/// Handler for POST `/transfers/{id}/resolve`.
async fn handle_resolve_transfer(
    AxumState(app_state): AxumState<AppState>,
    SessionUser { user, .. }: SessionUser,
    Path(transfer_id): Path<TransferId>,
    Json(req): Json<ResolveTransferRequest>,
) -> Result<Json<TransferResponse>, HttpError> {
    info!(
        user_id = user.id.value(),
        transfer_id = transfer_id.value(),
        decision = ?req.decision,
        "Handling resolve_transfer request"
    );

    let mut persistence = app_state.persistence.lock().await;
    let response: TransferResponse = custody_api::resolve_transfer(
        &mut persistence,
        &app_state.services,
        &user,
        transfer_id,
        req,
        OffsetDateTime::now_utc(),
    )?;
    Ok(Json(response))
}

/// Handler for POST `/transfers/{id}/comment`.
async fn handle_annotate_transfer(
    AxumState(app_state): AxumState<AppState>,
    SessionUser { user, .. }: SessionUser,
    Path(transfer_id): Path<TransferId>,
    Json(req): Json<AnnotateTransferRequest>,
) -> Result<Json<TransferResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    let response: TransferResponse = custody_api::annotate_transfer(
        &mut persistence,
        &app_state.services,
        &user,
        transfer_id,
        req,
        OffsetDateTime::now_utc(),
    )?;
    Ok(Json(response))
}

// ========================================================================
// Assets & Users
// ========================================================================

/// Handler for GET `/assets`.
async fn handle_list_assets(
    AxumState(app_state): AxumState<AppState>,
    SessionUser { user, .. }: SessionUser,
    Query(query): Query<ListAssetsQuery>,
) -> Result<Json<ListAssetsResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    Ok(Json(custody_api::list_assets(&mut persistence, &user, &query)?))
}

/// Handler for GET `/assets/mine`.
async fn handle_list_my_assets(
    AxumState(app_state): AxumState<AppState>,
    SessionUser { user, .. }: SessionUser,
) -> Result<Json<ListAssetsResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    Ok(Json(custody_api::list_my_assets(&mut persistence, &user)?))
}

/// Handler for GET `/assets/transferable`.
async fn handle_list_transferable_assets(
    AxumState(app_state): AxumState<AppState>,
    SessionUser { user, .. }: SessionUser,
) -> Result<Json<ListAssetsResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    Ok(Json(custody_api::list_transferable_assets(
        &mut persistence,
        &user,
    )?))
}

/// Handler for GET `/assets/{id}`.
async fn handle_get_asset(
    AxumState(app_state): AxumState<AppState>,
    SessionUser { user, .. }: SessionUser,
    Path(asset_id): Path<AssetId>,
) -> Result<Json<AssetDetailResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    Ok(Json(custody_api::get_asset(
        &mut persistence,
        &user,
        asset_id,
    )?))
}

/// Handler for GET `/users/colleagues`.
async fn handle_list_colleagues(
    AxumState(app_state): AxumState<AppState>,
    SessionUser { user, .. }: SessionUser,
) -> Result<Json<ListColleaguesResponse>, HttpError> {
    let mut persistence = app_state.persistence.lock().await;
    Ok(Json(custody_api::list_colleagues(&mut persistence, &user)?))
}

/// Builds the application router.
fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/auth/login", post(handle_login))
        .route("/auth/logout", post(handle_logout))
        .route("/auth/me", get(handle_whoami))
        .route("/auth/otp/enrollment", get(handle_otp_enrollment))
        .route("/auth/otp/verify", post(handle_verify_otp))
        .route(
            "/transfers",
            post(handle_create_transfer).get(handle_list_transfers),
        )
        .route("/transfers/{id}", get(handle_get_transfer))
        .route("/transfers/{id}/resolve", post(handle_resolve_transfer))
        .route("/transfers/{id}/comment", post(handle_annotate_transfer))
        .route("/assets", get(handle_list_assets))
        .route("/assets/mine", get(handle_list_my_assets))
        .route("/assets/transferable", get(handle_list_transferable_assets))
        .route("/assets/{id}", get(handle_get_asset))
        .route("/users/colleagues", get(handle_list_colleagues))
        .route("/live", get(live_events_handler))
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    info!("Initializing Custody Server");

    let mut persistence: Persistence = if let Some(db_path) = &args.database {
        info!(path = %db_path.display(), "Using file-based database");
        Persistence::new_with_file(db_path)?
    } else {
        info!("Using in-memory database");
        Persistence::new_in_memory()?
    };

    if let Some(path) = &args.provision {
        provision::load_provisioning(&mut persistence, path, OffsetDateTime::now_utc())?;
    }

    let app_state: AppState = AppState::new(
        persistence,
        SessionPolicy {
            lifetime: Duration::hours(args.session_hours),
        },
        OtpAttemptPolicy {
            max_failures: args.otp_max_failures,
            lockout: Duration::seconds(args.otp_lockout_seconds),
        },
    );

    let app: Router = build_router(app_state);

    let addr: std::net::SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode as HttpStatusCode},
    };
    use custody::{OtpCode, TotpVerifier};
    use custody_domain::{OtpSecret, User};
    use custody_persistence::{NewAsset, NewUser};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    const TEST_SECRET: &str = "JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP";
    const TEST_PASSWORD: &str = "correct horse battery staple";

    struct TestServer {
        app: Router,
        alice: User,
        bob: User,
        laptop: AssetId,
    }

    fn create_test_new_user(login_name: &str) -> NewUser {
        NewUser {
            login_name: login_name.to_string(),
            password: TEST_PASSWORD.to_string(),
            first_name: String::from("Test"),
            last_name: login_name.to_string(),
            middle_name: None,
            email: None,
            position: None,
            organization: None,
            is_active: true,
            is_advanced_access: false,
            otp_secret: OtpSecret::parse(TEST_SECRET).unwrap(),
        }
    }

    /// Alice holds laptop E1; bob holds nothing.
    fn create_test_server() -> TestServer {
        let mut persistence: Persistence = Persistence::new_in_memory()
            .expect("Failed to create in-memory persistence")
            .with_password_cost(4);
        let now = OffsetDateTime::now_utc();
        let alice_id = persistence
            .create_user(&create_test_new_user("alice"), now)
            .unwrap();
        let bob_id = persistence
            .create_user(&create_test_new_user("bob"), now)
            .unwrap();
        let laptop = persistence
            .register_asset(
                &NewAsset {
                    serial_number: String::from("E1"),
                    model: String::from("ThinkPad T14"),
                    initial_owner: Some(alice_id),
                    ..NewAsset::default()
                },
                now,
            )
            .unwrap();
        let alice = persistence.get_user(alice_id).unwrap().unwrap();
        let bob = persistence.get_user(bob_id).unwrap().unwrap();

        let app_state: AppState = AppState::new(
            persistence,
            SessionPolicy::default(),
            OtpAttemptPolicy::default(),
        );
        TestServer {
            app: build_router(app_state),
            alice,
            bob,
            laptop,
        }
    }

    fn current_code(user: &User) -> String {
        TotpVerifier::new()
            .generate(&user.otp_secret, OffsetDateTime::now_utc())
            .unwrap()
    }

    fn wrong_code(user: &User) -> String {
        let verifier = TotpVerifier::new();
        let now = OffsetDateTime::now_utc();
        // Codes valid at neighbouring steps are rejected too, so the
        // result stays wrong if the clock ticks over during the test.
        let accepted = |candidate: &str, at: OffsetDateTime| {
            verifier
                .verify(&user.otp_secret, &OtpCode::new(candidate), at)
                .unwrap()
        };
        (0..1_000_000)
            .map(|n| format!("{n:06}"))
            .find(|c| {
                !accepted(c.as_str(), now) && !accepted(c.as_str(), now + Duration::seconds(30))
            })
            .unwrap()
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (HttpStatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn login_as(app: &Router, login_name: &str) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "login_name": login_name, "password": TEST_PASSWORD })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK);
        body["session_token"].as_str().unwrap().to_string()
    }

    async fn create_laptop_transfer(server: &TestServer, token: &str) -> i64 {
        let (status, body) = send(
            &server.app,
            "POST",
            "/transfers",
            Some(token),
            Some(json!({
                "asset_id": server.laptop.value(),
                "receiver_id": server.bob.id.value(),
                "comment": "handoff"
            })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::CREATED);
        body["transfer_id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_login_with_wrong_password_is_unauthorized() {
        let server = create_test_server();

        let (status, body) = send(
            &server.app,
            "POST",
            "/auth/login",
            None,
            Some(json!({ "login_name": "alice", "password": "nope" })),
        )
        .await;

        assert_eq!(status, HttpStatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], true);
        assert_eq!(body["code"], "authentication_failed");
    }

    #[tokio::test]
    async fn test_missing_bearer_token_is_unauthorized() {
        let server = create_test_server();

        let (status, body) = send(&server.app, "GET", "/assets/mine", None, None).await;

        assert_eq!(status, HttpStatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "authentication_failed");
    }

    #[tokio::test]
    async fn test_whoami_returns_profile() {
        let server = create_test_server();
        let token = login_as(&server.app, "Alice").await;

        let (status, body) = send(&server.app, "GET", "/auth/me", Some(&token), None).await;

        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(body["login_name"], "alice");
        assert_eq!(body["user_id"], server.alice.id.value());
        assert!(body.get("otp_secret").is_none());
    }

    #[tokio::test]
    async fn test_enrollment_returns_callers_uri() {
        let server = create_test_server();
        let token = login_as(&server.app, "bob").await;

        let (status, body) =
            send(&server.app, "GET", "/auth/otp/enrollment", Some(&token), None).await;

        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(body["secret"], server.bob.otp_secret.expose());
        let uri = body["otpauth_uri"].as_str().unwrap();
        assert!(uri.starts_with("otpauth://totp/Custody:"));
    }

    #[tokio::test]
    async fn test_enrollment_requires_session() {
        let server = create_test_server();

        let (status, _) = send(&server.app, "GET", "/auth/otp/enrollment", None, None).await;

        assert_eq!(status, HttpStatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_catalog_search_and_scope() {
        let server = create_test_server();
        let alice_token = login_as(&server.app, "alice").await;
        let bob_token = login_as(&server.app, "bob").await;

        let (status, own) = send(
            &server.app,
            "GET",
            "/assets?search=thinkpad&ordering=model",
            Some(&alice_token),
            None,
        )
        .await;
        let (_, none) = send(&server.app, "GET", "/assets", Some(&bob_token), None).await;

        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(own["assets"][0]["serial_number"], "E1");
        assert_eq!(none["assets"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_full_handover_moves_custody() {
        let server = create_test_server();
        let alice_token = login_as(&server.app, "alice").await;
        let bob_token = login_as(&server.app, "bob").await;
        let transfer_id = create_laptop_transfer(&server, &alice_token).await;

        let (status, incoming) = send(
            &server.app,
            "GET",
            "/transfers?direction=incoming&pending_only=true",
            Some(&bob_token),
            None,
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(incoming["transfers"][0]["transfer_id"], transfer_id);
        assert_eq!(incoming["transfers"][0]["capabilities"]["can_resolve"], true);

        let (status, resolved) = send(
            &server.app,
            "POST",
            &format!("/transfers/{transfer_id}/resolve"),
            Some(&bob_token),
            Some(json!({ "decision": "accepted", "otp_code": current_code(&server.bob) })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(resolved["status"], "accepted");
        assert_eq!(resolved["comment"], "handoff");
        assert!(resolved["accepted_at"].is_string());

        let (_, mine) = send(&server.app, "GET", "/assets/mine", Some(&bob_token), None).await;
        assert_eq!(mine["assets"][0]["serial_number"], "E1");

        let (_, alice_assets) =
            send(&server.app, "GET", "/assets/mine", Some(&alice_token), None).await;
        assert_eq!(alice_assets["assets"], json!([]));
    }

    #[tokio::test]
    async fn test_sender_cannot_resolve() {
        let server = create_test_server();
        let alice_token = login_as(&server.app, "alice").await;
        let transfer_id = create_laptop_transfer(&server, &alice_token).await;

        let (status, body) = send(
            &server.app,
            "POST",
            &format!("/transfers/{transfer_id}/resolve"),
            Some(&alice_token),
            Some(json!({ "decision": "accepted", "otp_code": current_code(&server.alice) })),
        )
        .await;

        assert_eq!(status, HttpStatusCode::FORBIDDEN);
        assert_eq!(body["code"], "not_authorized");
    }

    #[tokio::test]
    async fn test_unknown_transfer_is_not_found() {
        let server = create_test_server();
        let bob_token = login_as(&server.app, "bob").await;

        let (status, body) =
            send(&server.app, "GET", "/transfers/999", Some(&bob_token), None).await;

        assert_eq!(status, HttpStatusCode::NOT_FOUND);
        assert_eq!(body["code"], "transfer_not_found");
    }

    #[tokio::test]
    async fn test_second_resolution_conflicts() {
        let server = create_test_server();
        let alice_token = login_as(&server.app, "alice").await;
        let bob_token = login_as(&server.app, "bob").await;
        let transfer_id = create_laptop_transfer(&server, &alice_token).await;
        let uri = format!("/transfers/{transfer_id}/resolve");

        let (status, _) = send(
            &server.app,
            "POST",
            &uri,
            Some(&bob_token),
            Some(json!({ "decision": "rejected", "otp_code": current_code(&server.bob) })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK);

        let (status, body) = send(
            &server.app,
            "POST",
            &uri,
            Some(&bob_token),
            Some(json!({ "decision": "accepted", "otp_code": current_code(&server.bob) })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::CONFLICT);
        assert_eq!(body["code"], "already_resolved");
    }

    #[tokio::test]
    async fn test_self_transfer_is_unprocessable() {
        let server = create_test_server();
        let alice_token = login_as(&server.app, "alice").await;

        let (status, body) = send(
            &server.app,
            "POST",
            "/transfers",
            Some(&alice_token),
            Some(json!({
                "asset_id": server.laptop.value(),
                "receiver_id": server.alice.id.value()
            })),
        )
        .await;

        assert_eq!(status, HttpStatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "self_transfer_not_allowed");
    }

    #[tokio::test]
    async fn test_repeated_wrong_codes_lock_out() {
        let server = create_test_server();
        let alice_token = login_as(&server.app, "alice").await;
        let bob_token = login_as(&server.app, "bob").await;
        let transfer_id = create_laptop_transfer(&server, &alice_token).await;
        let uri = format!("/transfers/{transfer_id}/resolve");

        for _ in 0..5 {
            let (status, body) = send(
                &server.app,
                "POST",
                &uri,
                Some(&bob_token),
                Some(json!({ "decision": "accepted", "otp_code": wrong_code(&server.bob) })),
            )
            .await;
            assert_eq!(status, HttpStatusCode::FORBIDDEN);
            assert_eq!(body["code"], "invalid_otp");
        }

        let (status, body) = send(
            &server.app,
            "POST",
            &uri,
            Some(&bob_token),
            Some(json!({ "decision": "accepted", "otp_code": current_code(&server.bob) })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["code"], "otp_locked_out");
    }

    #[tokio::test]
    async fn test_comment_update_keeps_request_pending() {
        let server = create_test_server();
        let alice_token = login_as(&server.app, "alice").await;
        let bob_token = login_as(&server.app, "bob").await;
        let transfer_id = create_laptop_transfer(&server, &alice_token).await;

        let (status, body) = send(
            &server.app,
            "POST",
            &format!("/transfers/{transfer_id}/comment"),
            Some(&bob_token),
            Some(json!({ "otp_code": current_code(&server.bob), "comment": "Friday" })),
        )
        .await;

        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(body["status"], "pending");
        assert_eq!(body["comment"], "Friday");
        assert_eq!(body["accepted_at"], Value::Null);
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let server = create_test_server();
        let token = login_as(&server.app, "alice").await;

        let (status, _) = send(&server.app, "POST", "/auth/logout", Some(&token), None).await;
        assert_eq!(status, HttpStatusCode::NO_CONTENT);

        let (status, _) = send(&server.app, "GET", "/auth/me", Some(&token), None).await;
        assert_eq!(status, HttpStatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_asset_detail_hidden_from_unrelated_user() {
        let server = create_test_server();
        let bob_token = login_as(&server.app, "bob").await;

        let (status, body) = send(
            &server.app,
            "GET",
            &format!("/assets/{}", server.laptop.value()),
            Some(&bob_token),
            None,
        )
        .await;

        assert_eq!(status, HttpStatusCode::NOT_FOUND);
        assert_eq!(body["code"], "asset_not_found");
    }
}
