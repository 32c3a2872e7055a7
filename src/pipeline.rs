//! The evaluation pipeline: select, validate, align, compute, assemble.
//!
//! One pipeline serves every reduction mode; mode and metrics are explicit
//! parameters. Failures before the metric loop (missing variables or
//! dimensions, empty coordinate intersection) fail the whole request.
//! Failures inside the metric loop are scoped to the one metric and reported
//! as inline outcome markers.

use crate::align::{align, AlignedPair};
use crate::dataset::{Dataset, LAT, LON, REQUIRED_DIMS, TIME};
use crate::error::EvaluationError;
use crate::metric::{Metric, MetricRegistry};
use crate::models::{
    Coords, EvaluateParams, EvaluateResponse, MetricOutcome, MetricValue, ReductionMode,
};
use crate::plot::PlotRenderer;
use crate::reduce::{nanmean, reduce};

use ndarray::Zip;
use std::collections::BTreeMap;

/// Run the evaluation pipeline over two decoded datasets.
///
/// The registry is injected by the caller; the renderer is optional so the
/// pipeline stays pure when no artifacts are wanted.
pub fn evaluate(
    registry: &MetricRegistry,
    renderer: Option<&dyn PlotRenderer>,
    sim: &Dataset,
    obs: &Dataset,
    params: &EvaluateParams,
) -> Result<EvaluateResponse, EvaluationError> {
    let sim_var = sim.variable(params.variable.as_deref(), "simulation")?;
    // When no variable was requested, the simulation's default choice binds
    // both sides.
    let obs_var = obs.variable(
        Some(params.variable.as_deref().unwrap_or(&sim_var.name)),
        "observation",
    )?;

    let sim_missing = sim_var.missing_dims(&REQUIRED_DIMS);
    let obs_missing = obs_var.missing_dims(&REQUIRED_DIMS);
    if !sim_missing.is_empty() || !obs_missing.is_empty() {
        return Err(EvaluationError::MissingDimensions {
            simulation: sim_missing,
            observation: obs_missing,
        });
    }

    let aligned = align(sim_var, obs_var)?;

    let mut outcomes = Vec::with_capacity(params.metrics.len());
    let mut series = Vec::new();
    for name in &params.metrics {
        let outcome = match registry.lookup(name) {
            None => MetricOutcome::NotImplemented,
            Some(metric) => match compute(metric, &aligned, params.mode, renderer) {
                Ok(value) => {
                    if params.mode == ReductionMode::Temporal {
                        series.push((name.clone(), value.values.clone()));
                    }
                    MetricOutcome::Ok(value)
                }
                // One failed metric must not abort the others.
                Err(err) => MetricOutcome::Error {
                    message: err.to_string(),
                },
            },
        };
        outcomes.push((name.clone(), outcome));
    }

    let mut results = assemble(outcomes);
    if params.mode == ReductionMode::Temporal {
        attach_series_artifact(renderer, &aligned, &series, &mut results);
    }

    Ok(EvaluateResponse {
        mode: params.mode,
        variable: aligned.sim.name.clone(),
        results,
        coords: Coords {
            lat: aligned_coord(&aligned, LAT),
            lon: aligned_coord(&aligned, LON),
            time: aligned_coord(&aligned, TIME),
        },
    })
}

/// Ordered list of data variable names in one decoded dataset.
pub fn discover_variables(dataset: &Dataset) -> Vec<String> {
    dataset.variable_names()
}

/// Compute one metric over the aligned pair.
///
/// Materialises that metric's pointwise field, reduces it according to
/// `mode`, applies the metric's finaliser per group and derives the summary
/// scalar. In spatial mode each metric renders its own field artifact.
fn compute(
    metric: &Metric,
    aligned: &AlignedPair,
    mode: ReductionMode,
    renderer: Option<&dyn PlotRenderer>,
) -> Result<MetricValue, EvaluationError> {
    let field = Zip::from(&aligned.sim.values)
        .and(&aligned.obs.values)
        .map_collect(|sim, obs| metric.pointwise(*sim, *obs));
    let mut reduced = reduce(&field, &aligned.sim.dims, mode);
    reduced.values.mapv_inplace(|mean| metric.finalize(mean));
    let summary = round4(nanmean(&reduced.values));

    let artifact = match (mode, renderer) {
        (ReductionMode::Spatial, Some(renderer)) => {
            let lat = aligned_coord(aligned, LAT);
            let lon = aligned_coord(aligned, LON);
            match renderer.render_field(metric.name(), &reduced, &lat, &lon) {
                Ok(artifact) => Some(artifact.url_path),
                // Rendering is best-effort decoration; the values stand.
                Err(err) => {
                    tracing::warn!("failed to render {} field: {}", metric.name(), err);
                    None
                }
            }
        }
        _ => None,
    };

    Ok(MetricValue {
        summary,
        dims: reduced.dims,
        shape: reduced.shape,
        values: reduced.values.iter().copied().collect(),
        artifact,
    })
}

/// Package per-metric outcomes into the response map.
///
/// Every requested identifier keeps an entry, so callers can distinguish
/// "not computed" from "zero error".
fn assemble(outcomes: Vec<(String, MetricOutcome)>) -> BTreeMap<String, MetricOutcome> {
    outcomes.into_iter().collect()
}

/// Render the shared temporal-series artifact and attach it to each computed
/// metric.
fn attach_series_artifact(
    renderer: Option<&dyn PlotRenderer>,
    aligned: &AlignedPair,
    series: &[(String, Vec<f64>)],
    results: &mut BTreeMap<String, MetricOutcome>,
) {
    let renderer = match renderer {
        Some(renderer) if !series.is_empty() => renderer,
        _ => return,
    };
    let time = aligned_coord(aligned, TIME);
    match renderer.render_series(series, &time) {
        Ok(artifact) => {
            for (name, _) in series {
                if let Some(MetricOutcome::Ok(value)) = results.get_mut(name) {
                    value.artifact = Some(artifact.url_path.clone());
                }
            }
        }
        Err(err) => tracing::warn!("failed to render series artifact: {}", err),
    }
}

fn aligned_coord(aligned: &AlignedPair, dim: &str) -> Vec<f64> {
    aligned
        .sim
        .coord(dim)
        .expect("aligned variables carry required coordinates")
        .to_vec()
}

/// Round to 4 decimal places, as summaries are reported.
fn round4(value: f64) -> f64 {
    (value * 1e4).round() / 1e4
}
