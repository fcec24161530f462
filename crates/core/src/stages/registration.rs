//! T2w-to-T1w registration.
//!
//! The T2w distortion-correction warp and the registration affine are composed
//! into one field and applied to the original T2w image, so the published
//! image is resampled once rather than twice.

use super::distortion::CorrectedModality;
use super::publish::publish_images;
use super::{run_stage, Stage};
use crate::backend::{ImagingBackend, Interpolation, MathsExpr, MathsOp, RegistrationOutputs};
use crate::config::{PipelineConfig, T2wSettings};
use crate::constants::{FLOAT_DATATYPE, T2W_INTENSITY_OFFSET};
use crate::image::ImagePath;
use crate::paths::WorkingDirPaths;
use crate::{PipelineError, PipelineResult};
use std::fs;

/// Registers the corrected T2w to the corrected T1w and publishes the result.
///
/// Returns the output paths written.
pub fn register_t2w_to_t1w<B: ImagingBackend>(
    config: &PipelineConfig,
    t2w: &T2wSettings,
    t1w_corrected: &CorrectedModality,
    t2w_corrected: &CorrectedModality,
    working_dir: &WorkingDirPaths,
    backend: &B,
) -> PipelineResult<Vec<ImagePath>> {
    let paths = working_dir.registration();
    fs::create_dir_all(paths.dir()).map_err(|source| PipelineError::WorkingDirCreation {
        path: paths.dir().to_path_buf(),
        source,
    })?;

    let registration = RegistrationOutputs {
        image: paths.registered_t2w(),
        matrix: paths.registration_matrix(),
    };
    run_stage(Stage::CrossModalRegistration, || {
        backend.register_cross_modal(
            &t2w_corrected.brain,
            &t1w_corrected.image,
            &t1w_corrected.brain,
            &registration,
        )
    })?;

    let original_t1w = &config.t1w().image;
    let composed = paths.composed_warp();
    run_stage(Stage::ComposeWarp, || {
        backend.compose_warp(
            original_t1w,
            &t2w_corrected.warp,
            &registration.matrix,
            &composed,
        )
    })?;

    let registered = paths.registered_t2w();
    run_stage(Stage::ApplyComposedWarp, || {
        backend.apply_warp(
            &t2w.inputs.image,
            original_t1w,
            &composed,
            Interpolation::Spline,
            &registered,
        )
    })?;

    let offset = MathsExpr::new(registered.clone(), registered.clone())
        .op(MathsOp::Add(T2W_INTENSITY_OFFSET))
        .datatype(FLOAT_DATATYPE);
    run_stage(Stage::OffsetIntensity, || backend.maths(&offset))?;

    let geometric_mean = MathsExpr::new(registered.clone(), paths.geometric_mean())
        .op(MathsOp::Mul(original_t1w.clone()))
        .op(MathsOp::Sqrt)
        .datatype(FLOAT_DATATYPE);
    run_stage(Stage::GeometricMean, || backend.maths(&geometric_mean))?;

    publish_images(
        Stage::PublishT2w,
        &[
            (&composed, &t2w.outputs.transform),
            (&registered, &t2w.outputs.image),
        ],
        backend,
    )
}
