//! Fieldmap preprocessing.

use super::{run_stage, Stage};
use crate::backend::{FieldMapRequest, ImagingBackend};
use crate::config::PipelineConfig;
use crate::paths::{FieldMapPaths, WorkingDirPaths};
use crate::{PipelineError, PipelineResult};
use std::fs;

/// Turns the magnitude/phase pair into a field map under `<workingdir>/FieldMap/`.
///
/// Failure here ends the run before any modality is touched.
pub fn prepare_fieldmap<B: ImagingBackend>(
    config: &PipelineConfig,
    working_dir: &WorkingDirPaths,
    backend: &B,
) -> PipelineResult<FieldMapPaths> {
    let paths = working_dir.fieldmap();
    fs::create_dir_all(paths.dir()).map_err(|source| PipelineError::WorkingDirCreation {
        path: paths.dir().to_path_buf(),
        source,
    })?;

    let request = FieldMapRequest {
        working_dir: paths.dir(),
        magnitude: config.fmap_magnitude(),
        phase: config.fmap_phase(),
        echo_diff: config.echo_diff(),
        gd_coeffs: config.gd_coeffs(),
        out_magnitude: paths.magnitude(),
        out_magnitude_brain: paths.magnitude_brain(),
        out_phase: paths.phase(),
        out_fieldmap: paths.fieldmap(),
    };
    run_stage(Stage::FieldMapPreprocessing, || {
        backend.prepare_fieldmap(&request)
    })?;

    Ok(paths)
}
