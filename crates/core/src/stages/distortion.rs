//! Per-modality distortion correction.
//!
//! The field map is computed once in fieldmap space and re-registered into
//! each modality's space, because dwell time and geometry differ between the
//! T1w and T2w acquisitions.

use super::publish::publish_images;
use super::{run_stage, Stage};
use crate::backend::{
    ForwardWarpRequest, ImagingBackend, Interpolation, MathsExpr, MathsOp, RegistrationOutputs,
};
use crate::config::PipelineConfig;
use crate::image::ImagePath;
use crate::modality::{Modality, ModalityPass};
use crate::paths::{FieldMapPaths, WorkingDirPaths};
use crate::PipelineResult;

/// Artifacts of one completed correction pass.
#[derive(Clone, Debug)]
pub struct CorrectedModality {
    pub modality: Modality,
    /// Relative deformation field mapping the distorted image onto corrected space.
    pub warp: ImagePath,
    pub image: ImagePath,
    pub brain: ImagePath,
    /// Output copies written for this pass (T1w only).
    pub published: Vec<ImagePath>,
}

/// Corrects one modality's full and brain images.
pub fn correct_modality<B: ImagingBackend>(
    pass: ModalityPass<'_>,
    config: &PipelineConfig,
    working_dir: &WorkingDirPaths,
    fieldmap: &FieldMapPaths,
    backend: &B,
) -> PipelineResult<CorrectedModality> {
    let inputs = pass.inputs;
    let m = inputs.modality;
    let paths = working_dir.modality(inputs);
    let fmap = fieldmap.fieldmap();

    tracing::info!("{}: distortion correction", m);

    let magnitude_brain = fieldmap.magnitude_brain();
    let warped_magnitude = paths.warped_magnitude();
    run_stage(Stage::ForwardWarpMagnitude(m), || {
        backend.forward_warp(&ForwardWarpRequest {
            input: &magnitude_brain,
            fieldmap: &fmap,
            dwell: &inputs.sample_spacing,
            direction: config.unwarp_dir(),
            output: &warped_magnitude,
        })
    })?;

    let registration = RegistrationOutputs {
        image: paths.registered_magnitude(),
        matrix: paths.fieldmap_matrix(),
    };
    run_stage(Stage::RegisterMagnitude(m), || {
        backend.register_rigid(&warped_magnitude, &inputs.brain, &registration)
    })?;

    let aligned = paths.aligned_fieldmap();
    run_stage(Stage::AlignFieldMap(m), || {
        backend.apply_affine(&fmap, &inputs.brain, &registration.matrix, &aligned)
    })?;

    let shift_map = paths.shift_map();
    run_stage(Stage::ShiftMap(m), || {
        backend.fieldmap_to_shiftmap(&aligned, &inputs.sample_spacing, &shift_map)
    })?;

    let warp = paths.warp();
    run_stage(Stage::ShiftMapToWarp(m), || {
        backend.shiftmap_to_warp(&shift_map, &inputs.brain, config.unwarp_dir(), &warp)
    })?;

    let image = paths.corrected_image();
    run_stage(Stage::CorrectImage(m), || {
        backend.apply_warp(&inputs.image, &inputs.image, &warp, Interpolation::Spline, &image)
    })?;

    let brain = paths.corrected_brain();
    run_stage(Stage::CorrectBrain(m), || {
        backend.apply_warp(
            &inputs.brain,
            &inputs.brain,
            &warp,
            Interpolation::NearestNeighbour,
            &brain,
        )
    })?;

    // The brain output doubles as the mask and the masked result.
    let masked = MathsExpr::new(image.clone(), brain.clone()).op(MathsOp::Mask(brain.clone()));
    run_stage(Stage::MaskCorrectedBrain(m), || backend.maths(&masked))?;

    let published = match pass.publish_to {
        Some(outputs) => publish_images(
            Stage::PublishT1w,
            &[
                (&warp, &outputs.transform),
                (&image, &outputs.image),
                (&brain, &outputs.brain),
            ],
            backend,
        )?,
        None => Vec::new(),
    };

    Ok(CorrectedModality {
        modality: m,
        warp,
        image,
        brain,
        published,
    })
}
