//! Application routing and request handlers.

use crate::cli::CommandLineArgs;
use crate::dataset::Dataset;
use crate::error::EvaluationError;
use crate::metric::MetricRegistry;
use crate::metrics;
use crate::models::{EvaluateParams, EvaluateResponse, MetricOutcome, ReductionMode, VariablesResponse};
use crate::pipeline;
use crate::plot::PngRenderer;
use crate::uploads::SpooledPayload;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Json, Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use validator::Validate;

/// Shared state of the request handlers.
///
/// The registry is built once at startup and read-only afterwards; each
/// request decodes its own datasets.
pub struct AppState {
    pub registry: MetricRegistry,
    pub renderer: PngRenderer,
    pub upload_dir: PathBuf,
}

type SharedState = Arc<AppState>;

/// Build the application router.
pub fn router(args: &CommandLineArgs) -> Router {
    let state = Arc::new(AppState {
        registry: MetricRegistry::with_builtins(),
        renderer: PngRenderer::new(&args.plot_dir),
        upload_dir: PathBuf::from(&args.upload_dir),
    });
    Router::new()
        .route("/evaluate", post(evaluate))
        .route("/variables", post(variables))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/health", get(health))
        .nest_service("/plots", ServeDir::new(&args.plot_dir))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .on_request(metrics::request_counter)
                        .on_response(metrics::record_response_metrics),
                )
                // The original service allows cross-origin requests from any
                // frontend host.
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(args.max_upload_size)),
        )
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

/// Evaluate a simulation against an observation.
///
/// Consumes a multipart form: `simulationFile`, `observationFile`, `metrics`
/// (a JSON-encoded list of metric identifiers), optional `variable` and
/// optional `mode` (defaults to `overall`).
async fn evaluate(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Json<EvaluateResponse>, EvaluationError> {
    let (simulation, observation, params) = read_evaluate_form(multipart).await?;

    let sim_spool = SpooledPayload::write(&state.upload_dir, &simulation)?;
    let obs_spool = SpooledPayload::write(&state.upload_dir, &observation)?;
    let sim = Dataset::from_netcdf(sim_spool.path())?;
    let obs = Dataset::from_netcdf(obs_spool.path())?;

    let response = pipeline::evaluate(
        &state.registry,
        Some(&state.renderer),
        &sim,
        &obs,
        &params,
    )?;
    for (name, outcome) in &response.results {
        if let MetricOutcome::Ok(_) = outcome {
            metrics::EVALUATIONS
                .with_label_values(&[name, &params.mode.to_string()])
                .inc();
        }
    }
    Ok(Json(response))
}

/// List the data variables of one uploaded payload.
async fn variables(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<VariablesResponse>, EvaluationError> {
    let mut file = None;
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            file = Some(field.bytes().await?);
        }
    }
    let file = file.ok_or(EvaluationError::MissingInput { name: "file" })?;
    let spool = SpooledPayload::write(&state.upload_dir, &file)?;
    let dataset = Dataset::from_netcdf(spool.path())?;
    Ok(Json(VariablesResponse {
        variables: pipeline::discover_variables(&dataset),
    }))
}

/// Read the evaluation form fields from a multipart body.
async fn read_evaluate_form(
    mut multipart: Multipart,
) -> Result<(Bytes, Bytes, EvaluateParams), EvaluationError> {
    let mut simulation = None;
    let mut observation = None;
    let mut metrics: Option<Vec<String>> = None;
    let mut variable = None;
    let mut mode = None;
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "simulationFile" => simulation = Some(field.bytes().await?),
            "observationFile" => observation = Some(field.bytes().await?),
            "metrics" => metrics = Some(serde_json::from_str(&field.text().await?)?),
            "variable" => {
                let text = field.text().await?;
                if !text.is_empty() {
                    variable = Some(text);
                }
            }
            "mode" => mode = Some(ReductionMode::parse(&field.text().await?)?),
            _ => (),
        }
    }
    let simulation = simulation.ok_or(EvaluationError::MissingInput {
        name: "simulationFile",
    })?;
    let observation = observation.ok_or(EvaluationError::MissingInput {
        name: "observationFile",
    })?;
    let metrics = metrics.ok_or(EvaluationError::MissingInput { name: "metrics" })?;
    let params = EvaluateParams {
        metrics,
        variable,
        mode: mode.unwrap_or(ReductionMode::Overall),
    };
    params.validate()?;
    Ok((simulation, observation, params))
}
