//! Pipeline stages.
//!
//! Each stage issues a fixed sequence of backend calls. Every call goes through
//! [`run_stage`], which logs the stage name and tags any failure with it, so a
//! broken run reports where it stopped.

pub mod distortion;
pub mod fieldmap;
pub mod publish;
pub mod registration;

use crate::backend::ToolResult;
use crate::modality::Modality;
use crate::{PipelineError, PipelineResult};
use std::fmt;

/// A named step of the run, used for logging and error context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    FieldMapPreprocessing,
    ForwardWarpMagnitude(Modality),
    RegisterMagnitude(Modality),
    AlignFieldMap(Modality),
    ShiftMap(Modality),
    ShiftMapToWarp(Modality),
    CorrectImage(Modality),
    CorrectBrain(Modality),
    MaskCorrectedBrain(Modality),
    PublishT1w,
    CrossModalRegistration,
    ComposeWarp,
    ApplyComposedWarp,
    OffsetIntensity,
    GeometricMean,
    PublishT2w,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldMapPreprocessing => f.write_str("fieldmap preprocessing"),
            Self::ForwardWarpMagnitude(m) => write!(f, "{m}: forward-warp fieldmap magnitude"),
            Self::RegisterMagnitude(m) => write!(f, "{m}: register warped magnitude"),
            Self::AlignFieldMap(m) => write!(f, "{m}: align field map"),
            Self::ShiftMap(m) => write!(f, "{m}: field map to shift map"),
            Self::ShiftMapToWarp(m) => write!(f, "{m}: shift map to warp"),
            Self::CorrectImage(m) => write!(f, "{m}: correct image"),
            Self::CorrectBrain(m) => write!(f, "{m}: correct brain image"),
            Self::MaskCorrectedBrain(m) => write!(f, "{m}: mask corrected brain"),
            Self::PublishT1w => f.write_str("publish T1w outputs"),
            Self::CrossModalRegistration => f.write_str("T2w to T1w registration"),
            Self::ComposeWarp => f.write_str("compose T2w warp"),
            Self::ApplyComposedWarp => f.write_str("apply composed T2w warp"),
            Self::OffsetIntensity => f.write_str("offset T2w intensity"),
            Self::GeometricMean => f.write_str("T1w/T2w geometric mean"),
            Self::PublishT2w => f.write_str("publish T2w outputs"),
        }
    }
}

/// Runs one backend call, attaching `stage` to any failure.
pub(crate) fn run_stage(stage: Stage, call: impl FnOnce() -> ToolResult<()>) -> PipelineResult<()> {
    tracing::info!("-- {}", stage);
    call().map_err(|source| {
        tracing::error!("stage '{}' failed: {}", stage, source);
        PipelineError::Stage { stage, source }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ToolError;

    #[test]
    fn stage_display_includes_modality() {
        assert_eq!(
            Stage::CorrectBrain(Modality::T2w).to_string(),
            "T2w: correct brain image"
        );
    }

    #[test]
    fn run_stage_tags_failures() {
        let err = run_stage(Stage::ComposeWarp, || {
            Err(ToolError::Failed {
                program: "convertwarp".into(),
                code: Some(2),
            })
        })
        .unwrap_err();

        assert!(matches!(err, PipelineError::Stage { stage: Stage::ComposeWarp, .. }));
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().starts_with("stage 'compose T2w warp' failed"));
    }
}
