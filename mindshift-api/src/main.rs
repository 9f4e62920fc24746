//! MindShift HTTP Driver
//!
//! Serves one game session over a small JSON API. Every request dispatches at
//! most one action and answers with the resulting snapshot. A background task
//! advances the session's logical clock in step with wall time, which fires
//! the countdown, presentation, mutation and AI timers.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use mindshift_ai::Engine;
use mindshift_core::{Action, Board, Difficulty, GameMode, GameState, Move, Pacing, Player, Pos, Session};

// =============================================================================
// Configuration
// =============================================================================

#[derive(Parser, Debug, Clone)]
#[command(name = "mindshift-api", about = "HTTP driver for a MindShift session")]
struct Config {
    /// Address to bind
    #[arg(long, env = "MINDSHIFT_HOST", default_value = "127.0.0.1")]
    host: String,

    #[arg(long, env = "MINDSHIFT_PORT", default_value_t = 8000)]
    port: u16,

    /// Session seed; defaults to the current time
    #[arg(long, env = "MINDSHIFT_SEED")]
    seed: Option<u64>,

    /// Wall-clock interval between clock advances
    #[arg(long, env = "MINDSHIFT_TICK_MS", default_value_t = 100)]
    driver_tick_ms: u64,

    /// AI node budget per move; 0 searches to full depth
    #[arg(long, env = "MINDSHIFT_NODE_BUDGET", default_value_t = mindshift_ai::DEFAULT_NODE_BUDGET)]
    node_budget: u64,

    /// Mode of the first game
    #[arg(long, env = "MINDSHIFT_MODE", default_value_t = GameMode::Ai)]
    mode: GameMode,

    /// Difficulty of the first game
    #[arg(long, env = "MINDSHIFT_DIFFICULTY", default_value_t = Difficulty::Medium)]
    difficulty: Difficulty,
}

// =============================================================================
// Shared State
// =============================================================================

struct AppState {
    session: Mutex<Session>,
}

type SharedState = Arc<AppState>;

impl AppState {
    /// A session with the engine as player 2, already started.
    fn new(seed: u64, node_budget: Option<u64>, mode: GameMode, difficulty: Difficulty) -> Self {
        let engine = Engine::new(Player::Two).with_node_budget(node_budget);
        let mut session = Session::new(seed, Pacing::default()).with_opponent(Box::new(engine));
        session.dispatch(Action::InitGame {
            board: None,
            mode,
            difficulty,
        });
        Self {
            session: Mutex::new(session),
        }
    }
}

// =============================================================================
// JSON Models
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotModel {
    #[serde(flatten)]
    game: GameState,
    clock_ms: u64,
    awaiting_switch: bool,
}

impl SnapshotModel {
    fn of(session: &Session) -> Self {
        Self {
            game: session.state().clone(),
            clock_ms: session.now(),
            awaiting_switch: session.awaiting_switch(),
        }
    }
}

#[derive(Deserialize)]
struct NewGameRequest {
    mode: Option<GameMode>,
    difficulty: Option<Difficulty>,
    board: Option<Board>,
}

#[derive(Serialize)]
struct MoveModel {
    from: Pos,
    to: Pos,
}

#[derive(Serialize)]
struct HealthModel {
    status: String,
}

// =============================================================================
// API Endpoints
// =============================================================================

async fn health() -> Json<HealthModel> {
    Json(HealthModel {
        status: "ok".to_string(),
    })
}

async fn get_game(State(state): State<SharedState>) -> Json<SnapshotModel> {
    let session = state.session.lock().await;
    Json(SnapshotModel::of(&session))
}

async fn dispatch_action(State(state): State<SharedState>, Json(action): Json<Action>) -> Json<SnapshotModel> {
    let mut session = state.session.lock().await;
    debug!(?action, "dispatch");
    session.dispatch(action);
    Json(SnapshotModel::of(&session))
}

async fn new_game(State(state): State<SharedState>, Json(req): Json<NewGameRequest>) -> Json<SnapshotModel> {
    let mut session = state.session.lock().await;
    let current = session.state();
    let action = Action::InitGame {
        mode: req.mode.unwrap_or(current.game_mode),
        difficulty: req.difficulty.unwrap_or(current.difficulty),
        board: req.board,
    };
    info!(?action, "new game");
    session.dispatch(action);
    Json(SnapshotModel::of(&session))
}

async fn undo(State(state): State<SharedState>) -> Json<SnapshotModel> {
    let mut session = state.session.lock().await;
    session.dispatch(Action::UndoMove);
    Json(SnapshotModel::of(&session))
}

async fn reset(State(state): State<SharedState>) -> Json<SnapshotModel> {
    let mut session = state.session.lock().await;
    session.dispatch(Action::ResetGame);
    Json(SnapshotModel::of(&session))
}

async fn get_moves(State(state): State<SharedState>) -> Json<Vec<MoveModel>> {
    let session = state.session.lock().await;
    let moves = session
        .state()
        .legal_moves()
        .into_iter()
        .map(|(from, to)| MoveModel { from, to })
        .collect();
    Json(moves)
}

async fn get_history(State(state): State<SharedState>) -> Json<Vec<Move>> {
    let session = state.session.lock().await;
    Json(session.state().move_history.clone())
}

// =============================================================================
// Server
// =============================================================================

fn create_app(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/game", get(get_game))
        .route("/game/new", post(new_game))
        .route("/action", post(dispatch_action))
        .route("/undo", post(undo))
        .route("/reset", post(reset))
        .route("/moves", get(get_moves))
        .route("/history", get(get_history))
        .layer(cors)
        .with_state(state)
}

/// Advance the session clock by the wall time elapsed since the last tick.
/// Sub-millisecond remainders carry over to the next tick.
async fn drive_clock(state: SharedState, tick: Duration) {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last = Instant::now();
    loop {
        interval.tick().await;
        let elapsed_ms = last.elapsed().as_millis() as u64;
        if elapsed_ms == 0 {
            continue;
        }
        last += Duration::from_millis(elapsed_ms);

        let mut session = state.session.lock().await;
        // AI searches run inside timer callbacks.
        tokio::task::block_in_place(|| {
            session.advance(elapsed_ms);
        });
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, stopping server...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    let seed = config.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default()
    });
    let node_budget = (config.node_budget > 0).then_some(config.node_budget);
    info!(
        seed,
        mode = %config.mode,
        difficulty = %config.difficulty,
        ?node_budget,
        "starting session"
    );

    let state = Arc::new(AppState::new(seed, node_budget, config.mode, config.difficulty));
    tokio::spawn(drive_clock(
        Arc::clone(&state),
        Duration::from_millis(config.driver_tick_ms.max(1)),
    ));

    let app = create_app(state);
    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_state(mode: GameMode) -> SharedState {
        Arc::new(AppState::new(5, Some(2_000), mode, Difficulty::Easy))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        read(response).await
    }

    async fn post_json(app: Router, uri: &str, json: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(json.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        read(response).await
    }

    async fn read(response: axum::response::Response) -> (StatusCode, Value) {
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_app(test_state(GameMode::Ai));
        let (status, body) = get(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_initial_game() {
        let state = test_state(GameMode::Ai);

        let (status, body) = get(create_app(state.clone()), "/game").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phase"], "playing");
        assert_eq!(body["currentPlayer"], "player1");
        assert_eq!(body["gameMode"], "ai");
        assert_eq!(body["clockMs"], 0);
        assert_eq!(body["awaitingSwitch"], false);
        assert_eq!(body["board"].as_array().unwrap().len(), 6);

        let (status, moves) = get(create_app(state), "/moves").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(moves.as_array().unwrap().len(), 14);
    }

    #[tokio::test]
    async fn test_select_and_move() {
        let state = test_state(GameMode::Local);

        let select = r#"{"type":"SELECT_TILE","payload":{"row":5,"col":1}}"#;
        let (status, body) = post_json(create_app(state.clone()), "/action", select).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["selectedTile"]["row"], 5);
        assert_eq!(body["possibleMoves"].as_array().unwrap().len(), 2);

        let mv = r#"{"type":"MOVE_TILE","payload":{"row":3,"col":2}}"#;
        let (status, body) = post_json(create_app(state.clone()), "/action", mv).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isAnimating"], true);
        assert_eq!(body["board"][3][2]["type"], "knight");

        let (_, history) = get(create_app(state), "/history").await;
        let history = history.as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["player"], "player1");
    }

    #[tokio::test]
    async fn test_selecting_opponent_tile_clears_selection() {
        let state = test_state(GameMode::Local);
        let select = r#"{"type":"SELECT_TILE","payload":{"row":5,"col":1}}"#;
        post_json(create_app(state.clone()), "/action", select).await;

        let other = r#"{"type":"SELECT_TILE","payload":{"row":0,"col":1}}"#;
        let (status, body) = post_json(create_app(state), "/action", other).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["selectedTile"].is_null());
        assert!(body["possibleMoves"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_undo_and_reset() {
        let state = test_state(GameMode::Local);
        post_json(
            create_app(state.clone()),
            "/action",
            r#"{"type":"SELECT_TILE","payload":{"row":5,"col":1}}"#,
        )
        .await;
        post_json(
            create_app(state.clone()),
            "/action",
            r#"{"type":"MOVE_TILE","payload":{"row":3,"col":2}}"#,
        )
        .await;

        let (status, body) = post_json(create_app(state.clone()), "/undo", "").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["moveHistory"].as_array().unwrap().is_empty());
        assert_eq!(body["undosLeft"]["player1"], 1);

        let (status, body) = post_json(create_app(state), "/reset", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phase"], "playing");
        assert_eq!(body["gameMode"], "local");
        assert_eq!(body["undosLeft"]["player1"], 2);
    }

    #[tokio::test]
    async fn test_new_game_with_board() {
        let state = test_state(GameMode::Ai);
        let board = Board::standard();
        let request = serde_json::json!({
            "mode": "local",
            "difficulty": "expert",
            "board": board,
        });
        let (status, body) = post_json(create_app(state), "/game/new", &request.to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gameMode"], "local");
        assert_eq!(body["difficulty"], "expert");
        assert_eq!(body["phase"], "playing");
    }

    #[tokio::test]
    async fn test_new_game_keeps_current_settings() {
        let state = test_state(GameMode::Local);
        let (status, body) = post_json(create_app(state), "/game/new", "{}").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gameMode"], "local");
        assert_eq!(body["difficulty"], "easy");
    }

    #[tokio::test]
    async fn test_rejects_bad_board() {
        let state = test_state(GameMode::Ai);
        let request = r#"{"board":[[null,null],[null]]}"#;
        let (status, _) = post_json(create_app(state), "/game/new", request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_rejects_out_of_range_position() {
        let state = test_state(GameMode::Ai);
        let select = r#"{"type":"SELECT_TILE","payload":{"row":6,"col":0}}"#;
        let (status, _) = post_json(create_app(state), "/action", select).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_rejects_malformed_json() {
        let state = test_state(GameMode::Ai);
        let (status, _) = post_json(create_app(state), "/action", "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
