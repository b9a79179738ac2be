//! JSON-over-HTTP control surface plus an SSE feed of tick frames.

use std::{
    collections::BTreeSet,
    convert::Infallible,
    net::SocketAddr,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{net::TcpListener, sync::broadcast};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{debug, error, info};

use crate::{
    actions::{self, ActionError, PlantReport},
    catalog::{ActionKind, Biome, CatalogError, CropProfile, Species, GRID_WIDTH},
    components::Environment,
    engine::{Engine, EngineBuilder, EngineSettings, PendingAction, Speed, TickReport},
    scenario::Scenario,
    selection::{Selection, SelectionError},
    suitability::{self, Recommendation, SoilReading},
    world::{Farm, FarmSnapshot, PlotSnapshot, RestoreError},
};

const DEFAULT_RECOMMENDATIONS: usize = 3;

pub struct WebServerConfig {
    pub scenario: Scenario,
    pub snapshot_interval: u64,
    pub snapshot_dir: PathBuf,
    pub host: String,
    pub port: u16,
    /// Start ticking immediately instead of waiting for `/api/control`.
    pub autostart: bool,
}

struct Session {
    engine: Engine,
    farm: Farm,
}

pub struct AppState {
    session: Mutex<Session>,
    broadcaster: broadcast::Sender<String>,
    scenario_name: String,
}

impl AppState {
    pub fn new(engine: Engine, farm: Farm) -> Self {
        let (broadcaster, _) = broadcast::channel::<String>(512);
        Self {
            scenario_name: engine.scenario_name().to_string(),
            session: Mutex::new(Session { engine, farm }),
            broadcaster,
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn view(&self, session: &Session) -> StateView {
        StateView {
            farm: session.farm.snapshot(&self.scenario_name),
            running: session.engine.is_running(),
            speed: session.engine.speed(),
            pending: session.engine.pending().cloned(),
            tick_interval_ms: session.engine.tick_interval().as_millis() as u64,
        }
    }

    /// Steps the engine once if it is due to tick and returns the frame.
    fn tick(&self) -> Option<UiFrame> {
        let mut session = self.session();
        if !session.engine.should_step() {
            return None;
        }
        let Session { engine, farm } = &mut *session;
        match engine.step(farm) {
            Ok(report) => Some(UiFrame {
                report,
                state: self.view(&session),
            }),
            Err(err) => {
                error!(error = ?err, "tick failed");
                None
            }
        }
    }

    fn publish(&self, frame: &UiFrame) {
        if let Ok(payload) = serde_json::to_string(frame) {
            let _ = self.broadcaster.send(payload);
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StateView {
    pub farm: FarmSnapshot,
    pub running: bool,
    pub speed: Speed,
    pub pending: Option<PendingAction>,
    pub tick_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UiFrame {
    pub report: TickReport,
    pub state: StateView,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Restore(#[from] RestoreError),
    #[error("cell ({row}, {col}) is outside the field")]
    CellNotFound { row: usize, col: usize },
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Action(ActionError::Busy | ActionError::NotRunning) => StatusCode::CONFLICT,
            ApiError::Action(_) | ApiError::Selection(_) => StatusCode::BAD_REQUEST,
            ApiError::Catalog(_) | ApiError::CellNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Restore(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/meta", get(meta))
        .route("/api/state", get(latest_state).put(restore_state))
        .route("/api/grid/:row/:col", get(grid_cell))
        .route("/api/control", post(control))
        .route("/api/environment", post(update_environment))
        .route("/api/plant", post(plant))
        .route("/api/action", post(start_action))
        .route("/api/clear_dead", post(clear_dead))
        .route("/api/recommend", get(recommend))
        .route("/api/events", get(stream_events))
        .with_state(state)
}

pub async fn run(config: WebServerConfig) -> Result<()> {
    let WebServerConfig {
        scenario,
        snapshot_interval,
        snapshot_dir,
        host,
        port,
        autostart,
    } = config;

    let farm = scenario.build_farm()?;
    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        snapshot_interval_ticks: snapshot_interval,
        snapshot_dir,
        speed: scenario.speed,
    };
    let mut engine = EngineBuilder::new(settings)
        .with_default_systems(scenario.alert_cooldown_ticks)
        .build();
    if autostart {
        engine.start();
    }

    let state = Arc::new(AppState::new(engine, farm));
    tokio::spawn(drive(state.clone()));

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("Invalid listen address {host}:{port}"))?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, scenario = %scenario.name, "farm server listening (Ctrl+C to stop)");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Sleeps for the engine's current interval, steps, then broadcasts.
async fn drive(state: Arc<AppState>) {
    loop {
        let interval = state.session().engine.tick_interval();
        tokio::time::sleep(interval).await;
        if let Some(frame) = state.tick() {
            state.publish(&frame);
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down farm server");
}

#[derive(Debug, Serialize)]
pub struct ActionMeta {
    pub key: &'static str,
    pub name: &'static str,
    pub cost_per_cell: u64,
    pub duration_ticks: u32,
}

#[derive(Debug, Serialize)]
pub struct Meta {
    pub scenario: String,
    pub grid_width: usize,
    pub biome: Biome,
    pub biomes: Vec<Biome>,
    pub species: Vec<&'static CropProfile>,
    pub actions: Vec<ActionMeta>,
}

async fn meta(State(state): State<Arc<AppState>>) -> Json<Meta> {
    let biome = state.session().farm.environment().biome;
    Json(Meta {
        scenario: state.scenario_name.clone(),
        grid_width: GRID_WIDTH,
        biome,
        biomes: Biome::ALL.to_vec(),
        species: Species::ALL.iter().map(|species| species.profile()).collect(),
        actions: ActionKind::ALL
            .iter()
            .map(|action| {
                let def = action.def();
                ActionMeta {
                    key: action.key(),
                    name: def.name,
                    cost_per_cell: def.cost.for_biome(biome),
                    duration_ticks: def.duration_ticks,
                }
            })
            .collect(),
    })
}

async fn latest_state(State(state): State<Arc<AppState>>) -> Json<StateView> {
    let session = state.session();
    Json(state.view(&session))
}

/// Replaces the farm with a snapshot. Refused while a timed action runs.
async fn restore_state(
    State(state): State<Arc<AppState>>,
    Json(snapshot): Json<FarmSnapshot>,
) -> Result<Json<StateView>, ApiError> {
    let mut session = state.session();
    if session.engine.is_busy() {
        return Err(ActionError::Busy.into());
    }
    session.farm = Farm::restore(&snapshot)?;
    session.engine.pause();
    info!(tick = snapshot.tick, "farm restored from snapshot");
    Ok(Json(state.view(&session)))
}

#[derive(Debug, Serialize)]
pub struct CellView {
    pub plot: PlotSnapshot,
    pub recommendations: Vec<Recommendation>,
}

async fn grid_cell(
    State(state): State<Arc<AppState>>,
    Path((row, col)): Path<(usize, usize)>,
) -> Result<Json<CellView>, ApiError> {
    if row >= GRID_WIDTH || col >= GRID_WIDTH {
        return Err(ApiError::CellNotFound { row, col });
    }
    let session = state.session();
    let index = row * GRID_WIDTH + col;
    let plot = session
        .farm
        .plot_snapshot(index)
        .ok_or(ApiError::CellNotFound { row, col })?;
    let reading = SoilReading::for_plot(session.farm.environment(), &plot.soil);
    Ok(Json(CellView {
        plot,
        recommendations: suitability::recommend(&reading, DEFAULT_RECOMMENDATIONS),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct ControlRequest {
    #[serde(default)]
    pub running: Option<bool>,
    #[serde(default)]
    pub speed: Option<Speed>,
}

async fn control(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ControlRequest>,
) -> Json<StateView> {
    let mut session = state.session();
    match request.running {
        Some(true) => session.engine.start(),
        Some(false) => session.engine.pause(),
        None => {}
    }
    if let Some(speed) = request.speed {
        session.engine.set_speed(speed);
    }
    debug!(
        running = session.engine.is_running(),
        speed = ?session.engine.speed(),
        "control updated"
    );
    Json(state.view(&session))
}

#[derive(Debug, Default, Deserialize)]
pub struct EnvironmentUpdate {
    pub sun: Option<f64>,
    pub rain: Option<f64>,
    pub wind: Option<f64>,
    pub temperature_c: Option<f64>,
    pub location: Option<String>,
    pub biome: Option<Biome>,
    /// Used to pick the biome when `biome` is absent.
    pub elevation_m: Option<f64>,
}

async fn update_environment(
    State(state): State<Arc<AppState>>,
    Json(update): Json<EnvironmentUpdate>,
) -> Json<Environment> {
    let mut session = state.session();
    let env = session.farm.environment_mut();
    if let Some(sun) = update.sun {
        env.set_sun(sun);
    }
    if let Some(rain) = update.rain {
        env.set_rain(rain);
    }
    if let Some(wind) = update.wind {
        env.set_wind(wind);
    }
    if let Some(temperature_c) = update.temperature_c {
        env.temperature_c = temperature_c;
    }
    if let Some(location) = update.location {
        env.location = location;
    }
    if let Some(biome) = update
        .biome
        .or_else(|| update.elevation_m.map(Biome::from_elevation))
    {
        env.biome = biome;
    }
    Json(env.clone())
}

/// Cells, rows and columns to select. Repeats are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct SelectionRequest {
    #[serde(default)]
    pub cells: Vec<usize>,
    #[serde(default)]
    pub rows: Vec<usize>,
    #[serde(default)]
    pub cols: Vec<usize>,
    #[serde(default)]
    pub all: bool,
}

impl SelectionRequest {
    pub fn build(&self) -> Result<Selection, SelectionError> {
        if self.all {
            return Ok(Selection::all());
        }
        let mut selection = Selection::from_cells(self.cells.iter().copied())?;
        for row in self.rows.iter().copied().collect::<BTreeSet<_>>() {
            selection.toggle_row(row)?;
        }
        for col in self.cols.iter().copied().collect::<BTreeSet<_>>() {
            selection.toggle_col(col)?;
        }
        Ok(selection)
    }
}

#[derive(Debug, Deserialize)]
pub struct PlantRequest {
    pub species: String,
    #[serde(flatten)]
    pub selection: SelectionRequest,
}

async fn plant(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PlantRequest>,
) -> Result<Json<PlantReport>, ApiError> {
    let species: Species = request.species.parse()?;
    let selection = request.selection.build()?;
    let mut session = state.session();
    let report = actions::plant(&mut session.farm, species, &selection)?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    #[serde(flatten)]
    pub selection: SelectionRequest,
}

async fn start_action(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ActionRequest>,
) -> Result<(StatusCode, Json<PendingAction>), ApiError> {
    let action: ActionKind = request.action.parse()?;
    let selection = request.selection.build()?;
    let mut session = state.session();
    let Session { engine, farm } = &mut *session;
    let pending = engine.begin_action(farm, action, selection)?;
    Ok((StatusCode::ACCEPTED, Json(pending)))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearedResponse {
    pub cleared: usize,
}

async fn clear_dead(State(state): State<Arc<AppState>>) -> Json<ClearedResponse> {
    let cleared = actions::clear_dead(&mut state.session().farm);
    Json(ClearedResponse { cleared })
}

#[derive(Debug, Default, Deserialize)]
pub struct RecommendQuery {
    pub top: Option<usize>,
}

async fn recommend(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecommendQuery>,
) -> Json<Vec<Recommendation>> {
    let reading = SoilReading::from_environment(state.session().farm.environment());
    Json(suitability::recommend(
        &reading,
        query.top.unwrap_or(DEFAULT_RECOMMENDATIONS),
    ))
}

async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.broadcaster.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok(Event::default().data(payload))),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(2))
            .text("keep-alive"),
    )
}
