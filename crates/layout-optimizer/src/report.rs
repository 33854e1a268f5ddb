//! JSON reports for manual and optimization runs

use crate::optimize::{CountTrial, OptimizationResult};
use crate::{OptimizerConfig, Result, SearchBounds};
use chrono::Utc;
use led_photometry::{
    FieldSummary, IrradianceField, LayoutParams, ParamVector, PhotometricBreakdown,
    ReceiverGeometry, SourceSpec,
};
use ndarray::Array2;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// Field statistics plus the two center-line scans
#[derive(Debug, Clone, Serialize)]
pub struct FieldReport {
    pub summary: FieldSummary,
    pub x_axis: Vec<f64>,
    pub y_axis: Vec<f64>,
    /// Illuminance along y = 0 (middle row)
    pub center_row: Vec<f64>,
    /// Illuminance along x = 0 (middle column)
    pub center_column: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<FieldGrid>,
}

/// Full coordinate and illuminance matrices, row-major `[row][col]`
#[derive(Debug, Clone, Serialize)]
pub struct FieldGrid {
    pub x: Vec<Vec<f64>>,
    pub y: Vec<Vec<f64>>,
    pub lux: Vec<Vec<f64>>,
}

fn nested_rows(a: &Array2<f64>) -> Vec<Vec<f64>> {
    a.rows().into_iter().map(|r| r.to_vec()).collect()
}

impl FieldGrid {
    pub fn new(field: &IrradianceField) -> Self {
        Self {
            x: nested_rows(&field.x),
            y: nested_rows(&field.y),
            lux: nested_rows(&field.lux),
        }
    }
}

impl FieldReport {
    pub fn new(field: &IrradianceField, include_grid: bool) -> Self {
        let grid = include_grid.then(|| FieldGrid::new(field));
        Self {
            summary: field.summary(),
            x_axis: field.x_axis().to_vec(),
            y_axis: field.y_axis().to_vec(),
            center_row: field.center_row().to_vec(),
            center_column: field.center_column().to_vec(),
            grid,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ManualReport {
    pub generated_at: String,
    pub source: SourceSpec,
    pub photometry: PhotometricBreakdown,
    pub lambertian_order: f64,
    pub receiver: ReceiverGeometry,
    pub layout: LayoutParams,
    pub field: FieldReport,
}

impl ManualReport {
    pub fn new(
        source: SourceSpec,
        photometry: PhotometricBreakdown,
        lambertian_order: f64,
        receiver: ReceiverGeometry,
        layout: LayoutParams,
        field: &IrradianceField,
        include_grid: bool,
    ) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339(),
            source,
            photometry,
            lambertian_order,
            receiver,
            layout,
            field: FieldReport::new(field, include_grid),
        }
    }
}

/// Where the search started and how it went
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub initial_guess: ParamVector,
    pub start: ParamVector,
    pub start_clamped: bool,
    pub initial_uniformity: Option<f64>,
    pub trials: Vec<CountTrial>,
    pub evaluations: usize,
    pub converged: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizationReport {
    pub generated_at: String,
    pub source: SourceSpec,
    pub center_intensity_cd: f64,
    pub receiver: ReceiverGeometry,
    pub bounds: SearchBounds,
    pub optimizer: OptimizerConfig,
    pub layout: LayoutParams,
    pub params: ParamVector,
    pub uniformity: f64,
    pub search: SearchReport,
    pub field: FieldReport,
}

impl OptimizationReport {
    pub fn new(
        source: SourceSpec,
        center_intensity_cd: f64,
        receiver: ReceiverGeometry,
        bounds: SearchBounds,
        optimizer: OptimizerConfig,
        result: &OptimizationResult,
        include_grid: bool,
    ) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339(),
            source,
            center_intensity_cd,
            receiver,
            bounds,
            optimizer,
            layout: result.layout,
            params: result.params,
            uniformity: result.uniformity,
            search: SearchReport {
                initial_guess: result.initial_guess,
                start: result.start,
                start_clamped: result.start_clamped,
                initial_uniformity: result.initial_uniformity,
                trials: result.trials.clone(),
                evaluations: result.evaluations,
                converged: result.converged,
            },
            field: FieldReport::new(&result.field, include_grid),
        }
    }
}

/// Write any report as pretty-printed JSON
pub fn write_report<T: Serialize>(path: impl AsRef<Path>, report: &T) -> Result<()> {
    let path = path.as_ref();
    info!("Writing report to {:?}", path);
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}
