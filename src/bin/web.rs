use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use custom_league::api::openfootball_api::{
    generate_standings, upcoming_matches, FeedMatch, OpenFootballClient,
};
use custom_league::config::LeagueConfig;
use custom_league::standings::combine_standings;
use custom_league::{
    init_logging, open_ledger, DirectSubmission, LedgerError, PairedSubmission, SharedLedger,
    TeamId, DEFAULT_UPCOMING_LIMIT,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};

/// How long a fetched season feed is served before refetching
const FEED_TTL: Duration = Duration::from_secs(300);

struct AppState {
    ledger: SharedLedger,
    feed_url: String,
    laliga_cache: RwLock<Option<(Instant, Vec<FeedMatch>)>>,
}

type SharedState = Arc<AppState>;

/// Error body in the `{ success: false, error }` shape
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "success": false, "error": self.message })),
        )
            .into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Validation(e) => Self::bad_request(e.to_string()),
            other => {
                tracing::error!(error = %other, "ledger operation failed");
                Self::internal(other.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(format!("Missing or invalid fields: {}", rejection.body_text()))
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

#[derive(Debug, Deserialize)]
struct ResultsQuery {
    action: Option<String>,
    jornada: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultBody {
    home_team: String,
    away_team: String,
    home_goals: u32,
    away_goals: u32,
    jornada: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PointsBody {
    team: String,
    points: u8,
    home_goals: u32,
    away_goals: u32,
    jornada: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
enum ResultsAction {
    AddResult(ResultBody),
    ResetSeason,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
enum PointsAction {
    AddPoints(PointsBody),
    ResetSeason,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StandingsQuery {
    #[serde(default)]
    include_custom: bool,
}

#[derive(Debug, Deserialize)]
struct UpcomingQuery {
    limit: Option<usize>,
}

async fn custom_standings(State(state): State<SharedState>) -> ApiResult {
    Ok(Json(json!({
        "success": true,
        "data": state.ledger.current_standings(),
        "lastUpdated": Utc::now(),
    })))
}

async fn custom_results(
    State(state): State<SharedState>,
    Query(query): Query<ResultsQuery>,
) -> ApiResult {
    let ledger = &state.ledger;
    let data = match query.action.as_deref() {
        Some("standings") => json!(ledger.current_standings()),
        Some("results") => match query.jornada {
            Some(round) => json!(ledger.results_for_round(round)),
            None => json!(ledger.all_results()),
        },
        Some("stats") => json!(ledger.stats()),
        Some("next-jornada") => json!({ "proxima_jornada": ledger.next_round() }),
        _ => return Err(ApiError::bad_request("Invalid action")),
    };
    Ok(Json(json!({ "success": true, "data": data })))
}

fn reset(state: &AppState) -> ApiResult {
    state.ledger.reset_season()?;
    Ok(Json(json!({
        "success": true,
        "data": { "success": true, "message": "Season reset" },
    })))
}

async fn add_result(
    State(state): State<SharedState>,
    body: Result<Json<ResultsAction>, JsonRejection>,
) -> ApiResult {
    let Json(action) = body?;
    match action {
        ResultsAction::AddResult(body) => {
            let submission = PairedSubmission {
                home_team: TeamId::new(body.home_team),
                away_team: TeamId::new(body.away_team),
                home_goals: body.home_goals,
                away_goals: body.away_goals,
                round: body.jornada.unwrap_or_else(|| state.ledger.next_round()),
            };
            let event = state.ledger.submit_paired(&submission)?;
            Ok(Json(json!({
                "success": true,
                "data": event,
                "standings": state.ledger.current_standings(),
            })))
        }
        ResultsAction::ResetSeason => reset(&state),
    }
}

async fn add_points(
    State(state): State<SharedState>,
    body: Result<Json<PointsAction>, JsonRejection>,
) -> ApiResult {
    let Json(action) = body?;
    match action {
        PointsAction::AddPoints(body) => {
            let submission = DirectSubmission {
                team: TeamId::new(body.team),
                points: body.points,
                goals_for: body.home_goals,
                goals_against: body.away_goals,
                round: body.jornada.unwrap_or_else(|| state.ledger.next_round()),
            };
            let event = state.ledger.submit_direct(&submission)?;
            Ok(Json(json!({
                "success": true,
                "data": event,
                "standings": state.ledger.current_standings(),
            })))
        }
        PointsAction::ResetSeason => reset(&state),
    }
}

/// Season feed, refetched once the cached copy is older than `FEED_TTL`
async fn feed_matches(state: &AppState) -> Result<Vec<FeedMatch>, ApiError> {
    if let Some((fetched_at, matches)) = state.laliga_cache.read().await.as_ref() {
        if fetched_at.elapsed() < FEED_TTL {
            return Ok(matches.clone());
        }
    }

    let client = OpenFootballClient::new(state.feed_url.clone())
        .map_err(|e| ApiError::internal(format!("Failed to build HTTP client: {}", e)))?;
    let matches = client.fetch_matches().await.map_err(|e| {
        tracing::error!(error = %e, "failed to fetch season feed");
        ApiError::internal("Failed to fetch La Liga matches")
    })?;

    *state.laliga_cache.write().await = Some((Instant::now(), matches.clone()));
    Ok(matches)
}

/// La Liga table, optionally with the custom league ranked in among the clubs
async fn laliga_standings(
    State(state): State<SharedState>,
    Query(query): Query<StandingsQuery>,
) -> ApiResult {
    let matches = feed_matches(&state).await?;
    let laliga = generate_standings(&matches);
    if !query.include_custom {
        return Ok(Json(json!({
            "success": true,
            "data": laliga,
            "lastUpdated": Utc::now(),
        })));
    }

    let custom_teams = state.ledger.teams();
    let rows: Vec<Value> = combine_standings(&laliga, &state.ledger.current_standings())
        .into_iter()
        .map(|row| {
            let custom = custom_teams.contains(&row.aggregate.team);
            let mut value = json!(row);
            value["custom"] = json!(custom);
            value
        })
        .collect();
    Ok(Json(json!({
        "success": true,
        "data": rows,
        "lastUpdated": Utc::now(),
    })))
}

async fn laliga_upcoming(
    State(state): State<SharedState>,
    Query(query): Query<UpcomingQuery>,
) -> ApiResult {
    let matches = feed_matches(&state).await?;
    let limit = query.limit.unwrap_or(DEFAULT_UPCOMING_LIMIT);
    Ok(Json(json!({
        "success": true,
        "data": upcoming_matches(&matches, Utc::now().date_naive(), limit),
    })))
}

fn app(state: SharedState) -> Router {
    Router::new()
        .route("/api/custom-standings", get(custom_standings))
        .route(
            "/api/custom-results",
            get(custom_results).post(add_result),
        )
        .route("/api/custom-points", axum::routing::post(add_points))
        .route("/api/laliga/clasificacion", get(laliga_standings))
        .route("/api/laliga/proximos-partidos", get(laliga_upcoming))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = LeagueConfig::from_env()?;
    let ledger = open_ledger(&config)?;
    tracing::info!(teams = ledger.teams().len(), "custom league loaded");

    let state = Arc::new(AppState {
        ledger,
        feed_url: config.laliga_feed_url.clone(),
        laliga_cache: RwLock::new(None),
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, app(state)).await?;
    Ok(())
}
