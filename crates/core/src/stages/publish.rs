//! Copies working-directory artifacts to caller-chosen output paths.
//!
//! Outputs are copies; the working directory keeps the canonical files.

use super::{run_stage, Stage};
use crate::backend::ImagingBackend;
use crate::image::ImagePath;
use crate::{PipelineError, PipelineResult};
use std::fs;

/// Copies each `(source, destination)` pair, overwriting existing destinations.
///
/// Missing destination directories are created first.
pub fn publish_images<B: ImagingBackend>(
    stage: Stage,
    pairs: &[(&ImagePath, &ImagePath)],
    backend: &B,
) -> PipelineResult<Vec<ImagePath>> {
    let mut published = Vec::with_capacity(pairs.len());

    for (from, to) in pairs {
        if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| PipelineError::OutputDirCreation {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        run_stage(stage, || backend.copy_image(from, to))?;
        published.push((*to).clone());
    }

    Ok(published)
}
