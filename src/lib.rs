//! This crate provides a gridded model evaluation server. It compares a
//! simulated and an observed geophysical dataset, each a function of
//! latitude, longitude and time, and reports quantitative agreement metrics
//! together with rendered plot artifacts. The two grids are aligned on the
//! exact intersection of their coordinates, a pointwise error metric is
//! applied, and the result is averaged down to a map, a time series or a
//! single scalar depending on the requested reduction mode.
//!
//! The server is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Axum](axum) web framework, built by the Tokio team and built on top of
//!   various popular components, including the [hyper] HTTP library.
//! * [Serde](serde) performs (de)serialisation of JSON response data.
//! * [netcdf] decodes the uploaded NetCDF payloads.
//! * [ndarray] provides [NumPy](https://numpy.org)-like n-dimensional arrays
//!   used in numerical computation.
//! * [image] renders plot artifacts as PNG rasters.

pub mod align;
pub mod app;
pub mod cli;
pub mod dataset;
pub mod error;
pub mod metric;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod plot;
pub mod reduce;
pub mod server;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
pub mod uploads;
