//! # dcreg core
//!
//! Orchestration for correcting T1w and T2w structural images for
//! fieldmap-derived geometric distortion, followed by T2w-to-T1w registration.
//!
//! The numerical work (unwarping, registration, resampling, voxel arithmetic)
//! is done by an external imaging toolkit behind [`ImagingBackend`]. This crate
//! owns the decisions around it:
//! - which modalities run, based on whether a T2w image was supplied
//! - the ordered sequence of backend calls and where each artifact lands
//! - publishing output copies, the run log and the QA script
//!
//! **No process-environment access**: tool locations, the launch directory and
//! the invocation line are resolved by the binary and passed in.

pub mod backend;
pub mod config;
pub mod constants;
pub mod error;
pub mod image;
pub mod modality;
pub mod paths;
pub mod pipeline;
pub mod qa;
pub mod run_log;
pub mod stages;

pub use backend::{FslBackend, ImagingBackend, SystemRunner};
pub use config::{PipelineArgs, PipelineConfig, ToolLocations};
pub use error::{PipelineError, PipelineResult};
pub use image::{image_base_name, strip_image_extension, ImagePath};
pub use modality::{active_modalities, using_t2, Modality};
pub use pipeline::{Pipeline, RunSummary};
