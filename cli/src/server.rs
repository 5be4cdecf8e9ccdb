use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;

use sevenday_core::db::LocalBackend;
use sevenday_core::models::{MAX_EVENTS, MOOD_MAX, WeekRecord};
use sevenday_core::service::WeekBackend;
use sevenday_core::stats;
use sevenday_core::week::WeekKey;

const BODY_LIMIT: usize = 2 * 1024 * 1024; // 2 MB

#[derive(Clone)]
struct AppState {
    store: Arc<LocalBackend>,
    api_key: Option<String>,
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct BatchRequest {
    weeks: Vec<String>,
}

#[derive(Serialize)]
struct WeekRow {
    week_start: WeekKey,
    record: WeekRecord,
}

#[derive(Deserialize)]
struct StatsQuery {
    weeks: Option<usize>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(err) => {
                eprintln!("Internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Validation ---

fn parse_key(raw: &str) -> Result<WeekKey, ApiError> {
    WeekKey::parse(raw).map_err(|e| ApiError::BadRequest(format!("{e}")))
}

/// Reject rows that could never have been produced by a well-behaved
/// client: too many events, event dates outside the addressed week, moods
/// out of range, or meal entries for non-existent day slots.
fn validate_record(week: WeekKey, record: &WeekRecord) -> Result<(), ApiError> {
    if record.events.len() > MAX_EVENTS {
        return Err(ApiError::BadRequest(format!(
            "A week can hold at most {MAX_EVENTS} events"
        )));
    }
    for event in &record.events {
        if !week.contains(event.date) {
            return Err(ApiError::BadRequest(format!(
                "Event date {} is outside week {week}",
                event.date
            )));
        }
    }
    for mood in record.moods {
        if mood > MOOD_MAX {
            return Err(ApiError::BadRequest(format!(
                "Mood scores must be between 0 and {MOOD_MAX} (got {mood})"
            )));
        }
    }
    if record.meals.keys().any(|day| *day > 6) {
        return Err(ApiError::BadRequest(
            "Meal day slots must be between 0 and 6".to_string(),
        ));
    }
    Ok(())
}

// --- Handlers ---

async fn list_weeks(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<Vec<WeekKey>>, ApiError> {
    let keys = state.store.list_week_keys(&user)?;
    Ok(Json(keys))
}

async fn get_week(
    State(state): State<AppState>,
    Path((user, key)): Path<(String, String)>,
) -> Result<Json<WeekRecord>, ApiError> {
    let week = parse_key(&key)?;
    let record = state
        .store
        .fetch(&user, week)?
        .ok_or_else(|| ApiError::NotFound(format!("No entry for week {week}")))?;
    Ok(Json(record))
}

async fn put_week(
    State(state): State<AppState>,
    Path((user, key)): Path<(String, String)>,
    Json(record): Json<WeekRecord>,
) -> Result<StatusCode, ApiError> {
    let week = parse_key(&key)?;
    validate_record(week, &record)?;
    state.store.upsert(&user, week, &record)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn batch_weeks(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<Vec<WeekRow>>, ApiError> {
    let mut weeks = Vec::with_capacity(req.weeks.len());
    for raw in &req.weeks {
        weeks.push(parse_key(raw)?);
    }

    let rows = state.store.fetch_many(&user, &weeks)?;
    Ok(Json(
        rows.into_iter()
            .map(|(week_start, record)| WeekRow { week_start, record })
            .collect(),
    ))
}

async fn get_stats(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Query(params): Query<StatsQuery>,
) -> Result<Json<Vec<stats::WeekStats>>, ApiError> {
    let limit = params.weeks.unwrap_or(8);
    let trends = stats::week_trends(state.store.as_ref(), &user, limit)?;
    Ok(Json(trends))
}

// --- Router builder ---

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/users/{user}/weeks", get(list_weeks))
        .route("/api/users/{user}/weeks/batch", post(batch_weeks))
        .route(
            "/api/users/{user}/weeks/{key}",
            get(get_week).put(put_week),
        )
        .route("/api/users/{user}/stats", get(get_stats))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(
    store: LocalBackend,
    port: u16,
    bind: &str,
    api_key: Option<String>,
) -> anyhow::Result<()> {
    let state = AppState {
        store: Arc::new(store),
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    if let Some(ref key) = api_key {
        eprintln!(
            "API key: {}...{} (see api_key file in data directory)",
            &key[..4],
            &key[key.len() - 4..],
        );
    } else {
        eprintln!("Warning: Authentication disabled (--no-auth). API is open to anyone.");
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        eprintln!(
            "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    eprintln!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
