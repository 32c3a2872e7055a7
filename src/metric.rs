//! Pointwise error metrics and the registry that names them.
//!
//! A metric is applied in two stages: a pointwise function over corresponding
//! simulation/observation cells, then a NaN-excluding mean over the reduction
//! axes. Metrics whose aggregate is not a plain mean (RMSE) additionally
//! carry a finaliser applied to each reduced group mean.

/// Pointwise error function: `(simulation, observation) -> error`.
///
/// NaN-propagating: a NaN input yields a NaN output, which the reduction
/// stage then excludes.
pub type PointwiseFn = fn(f64, f64) -> f64;

/// Finaliser applied to each reduced group mean.
pub type FinalizeFn = fn(f64) -> f64;

/// Registry key of the mean absolute error metric.
pub const MAE: &str = "Mean Absolute Error (MAE)";
/// Registry key of the root mean square error metric.
pub const RMSE: &str = "Root Mean Square Error (RMSE)";

/// A named error metric.
#[derive(Clone, Debug)]
pub struct Metric {
    name: String,
    pointwise: PointwiseFn,
    finalize: FinalizeFn,
}

impl Metric {
    /// The registry key of this metric.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Apply the pointwise stage to one pair of cells.
    pub fn pointwise(&self, sim: f64, obs: f64) -> f64 {
        (self.pointwise)(sim, obs)
    }

    /// Apply the finaliser to one reduced group mean.
    pub fn finalize(&self, mean: f64) -> f64 {
        (self.finalize)(mean)
    }
}

/// The set of known metrics.
///
/// Constructed once at process start and passed into the pipeline explicitly;
/// immutable afterwards. Looking up an unknown identifier is not an error
/// here: the pipeline reports it as a per-metric "not implemented" outcome.
#[derive(Clone, Debug, Default)]
pub struct MetricRegistry {
    metrics: Vec<Metric>,
}

impl MetricRegistry {
    /// Return an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a registry holding the built-in metrics.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(MAE, absolute_error);
        registry.register_with_finalize(RMSE, squared_error, f64::sqrt);
        registry
    }

    /// Register a metric with a plain mean aggregate.
    pub fn register(&mut self, name: &str, pointwise: PointwiseFn) {
        self.register_with_finalize(name, pointwise, identity)
    }

    /// Register a metric whose reduced group means pass through `finalize`.
    pub fn register_with_finalize(
        &mut self,
        name: &str,
        pointwise: PointwiseFn,
        finalize: FinalizeFn,
    ) {
        self.metrics.push(Metric {
            name: name.to_string(),
            pointwise,
            finalize,
        });
    }

    /// Look up a metric by its identifier.
    pub fn lookup(&self, name: &str) -> Option<&Metric> {
        self.metrics.iter().find(|metric| metric.name == name)
    }

    /// Registered metric identifiers, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.metrics.iter().map(|metric| metric.name()).collect()
    }
}

fn identity(mean: f64) -> f64 {
    mean
}

fn absolute_error(sim: f64, obs: f64) -> f64 {
    (sim - obs).abs()
}

fn squared_error(sim: f64, obs: f64) -> f64 {
    (sim - obs).powi(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_registered() {
        let registry = MetricRegistry::with_builtins();
        assert_eq!(vec![MAE, RMSE], registry.names());
        assert!(registry.lookup(MAE).is_some());
        assert!(registry.lookup(RMSE).is_some());
        assert!(registry.lookup("Bias").is_none());
    }

    #[test]
    fn absolute_error_is_nonnegative() {
        let metric = MetricRegistry::with_builtins();
        let mae = metric.lookup(MAE).unwrap();
        for (sim, obs) in [(3.0, 1.0), (1.0, 3.0), (-2.5, 4.0), (0.0, 0.0)] {
            let error = mae.pointwise(sim, obs);
            assert!(error >= 0.0);
            assert_eq!((sim - obs).abs(), error);
        }
    }

    #[test]
    fn pointwise_propagates_nan() {
        let registry = MetricRegistry::with_builtins();
        for name in [MAE, RMSE] {
            let metric = registry.lookup(name).unwrap();
            assert!(metric.pointwise(f64::NAN, 1.0).is_nan());
            assert!(metric.pointwise(1.0, f64::NAN).is_nan());
        }
    }

    #[test]
    fn rmse_finaliser_is_square_root() {
        let registry = MetricRegistry::with_builtins();
        let rmse = registry.lookup(RMSE).unwrap();
        assert_eq!(9.0, rmse.pointwise(4.0, 1.0));
        assert_eq!(3.0, rmse.finalize(9.0));
    }

    #[test]
    fn mae_finaliser_is_identity() {
        let registry = MetricRegistry::with_builtins();
        let mae = registry.lookup(MAE).unwrap();
        assert_eq!(2.5, mae.finalize(2.5));
    }

    #[test]
    fn custom_metric_registration() {
        fn bias(sim: f64, obs: f64) -> f64 {
            sim - obs
        }
        let mut registry = MetricRegistry::with_builtins();
        registry.register("Bias", bias);
        let metric = registry.lookup("Bias").unwrap();
        assert_eq!(-1.0, metric.pointwise(1.0, 2.0));
    }
}
