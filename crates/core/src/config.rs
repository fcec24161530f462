//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the
//! pipeline. The core never reads process-wide environment variables itself:
//! the binary resolves `FSLDIR`, the scripts directory, the launch directory and
//! the invocation line, and hands them over here.

use crate::constants::DEFAULT_WORKING_DIR;
use crate::image::{is_unset, ImagePath};
use crate::modality::{Modality, ModalityInputs, T1wOutputs};
use crate::{PipelineError, PipelineResult};
use dcreg_types::{PositiveDecimal, UnwarpDirection};
use std::path::{Component, Path, PathBuf};

/// Where the external executables live.
#[derive(Clone, Debug, Default)]
pub struct ToolLocations {
    fsl_bin_dir: Option<PathBuf>,
    global_scripts_dir: Option<PathBuf>,
}

impl ToolLocations {
    /// Resolve tool locations from optional environment values.
    ///
    /// `fsl_dir` is the FSL installation root; executables are taken from its
    /// `bin/` subdirectory. When a value is absent the program name is looked up
    /// on `PATH` at spawn time. A value that is present but blank is rejected.
    pub fn from_env_values(
        fsl_dir: Option<String>,
        global_scripts_dir: Option<String>,
    ) -> PipelineResult<Self> {
        fn non_blank(name: &str, value: Option<String>) -> PipelineResult<Option<PathBuf>> {
            match value {
                None => Ok(None),
                Some(v) if v.trim().is_empty() => Err(PipelineError::InvalidInput(format!(
                    "{name} is set but empty"
                ))),
                Some(v) => Ok(Some(PathBuf::from(v.trim()))),
            }
        }

        Ok(Self {
            fsl_bin_dir: non_blank("FSLDIR", fsl_dir)?.map(|dir| dir.join("bin")),
            global_scripts_dir: non_blank("HCPPIPEDIR_Global", global_scripts_dir)?,
        })
    }

    /// Path (or bare name) used to launch an FSL executable.
    pub fn fsl_program(&self, name: &str) -> PathBuf {
        match &self.fsl_bin_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    /// Path (or bare name) used to launch a pipeline-suite script.
    pub fn script(&self, name: &str) -> PathBuf {
        match &self.global_scripts_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }
}

/// Raw flag values exactly as supplied on the command line.
#[derive(Clone, Debug, Default)]
pub struct PipelineArgs {
    pub working_dir: Option<String>,
    pub t1: String,
    pub t1_brain: String,
    pub t2: String,
    pub t2_brain: String,
    pub fmap_mag: String,
    pub fmap_phase: String,
    pub echo_diff: String,
    pub t1_sample_spacing: String,
    pub t2_sample_spacing: String,
    pub unwarp_dir: String,
    pub out_t1: String,
    pub out_t1_brain: String,
    pub out_t1_warp: String,
    pub out_t2: String,
    pub out_t2_warp: String,
    pub gd_coeffs: Option<String>,
}

/// Destinations for the published T2w artifacts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct T2wOutputs {
    pub image: ImagePath,
    pub transform: ImagePath,
}

/// Everything a T2w run needs beyond the T1w inputs.
#[derive(Clone, Debug)]
pub struct T2wSettings {
    pub inputs: ModalityInputs,
    pub outputs: T2wOutputs,
}

/// Immutable configuration for one pipeline run.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    working_dir: PathBuf,
    t1w: ModalityInputs,
    t1w_outputs: T1wOutputs,
    t2w: Option<T2wSettings>,
    fmap_magnitude: ImagePath,
    fmap_phase: ImagePath,
    echo_diff: PositiveDecimal,
    unwarp_dir: UnwarpDirection,
    gd_coeffs: Option<PathBuf>,
    launch_dir: PathBuf,
    invocation: String,
}

fn required_image(role: &'static str, raw: &str) -> PipelineResult<ImagePath> {
    ImagePath::parse(raw)
        .ok_or_else(|| PipelineError::InvalidInput(format!("{role} must not be empty")))
}

fn required_number(role: &'static str, raw: &str) -> PipelineResult<PositiveDecimal> {
    raw.parse::<PositiveDecimal>()
        .map_err(|e| PipelineError::InvalidInput(format!("{role}: {e}")))
}

/// Resolves `path` against `base` without touching the filesystem.
fn lexical_absolute(base: &Path, path: &Path) -> PathBuf {
    let mut resolved = PathBuf::new();
    for component in base.join(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other.as_os_str()),
        }
    }
    resolved
}

/// Corrected images are written to `<workingdir>/<base name>`, so every
/// structural input needs its own base name.
fn ensure_distinct_names(images: &[(&'static str, &ImagePath)]) -> PipelineResult<()> {
    for (i, (role, image)) in images.iter().enumerate() {
        let name = image.base_name();
        if let Some((other_role, _)) = images[i + 1..]
            .iter()
            .find(|(_, other)| other.base_name() == name)
        {
            return Err(PipelineError::InvalidInput(format!(
                "{role} and {other_role} must have distinct file names (both are '{name}')"
            )));
        }
    }
    Ok(())
}

/// Rejects a working directory that holds a structural input, since the
/// corrected copy would replace the input itself.
fn ensure_outside_working_dir(
    working_dir: &Path,
    launch_dir: &Path,
    images: &[(&'static str, &ImagePath)],
) -> PipelineResult<()> {
    let working_dir = lexical_absolute(launch_dir, working_dir);
    for (role, image) in images {
        let input_dir = lexical_absolute(launch_dir, image.parent().unwrap_or(Path::new("")));
        if input_dir == working_dir {
            return Err(PipelineError::InvalidInput(format!(
                "--workingdir {} holds the {role} input; corrected images would overwrite it",
                working_dir.display()
            )));
        }
    }
    Ok(())
}

impl PipelineConfig {
    /// Build the configuration from raw flag values.
    ///
    /// This is pure string handling: extensions are stripped, numbers and the
    /// unwarp direction parsed, and the T2w branch enabled only when a T2w image
    /// is supplied. Filesystem checks happen in [`PipelineConfig::verify_inputs`].
    pub fn from_args(
        args: PipelineArgs,
        launch_dir: PathBuf,
        invocation: String,
    ) -> PipelineResult<Self> {
        let working_dir = args
            .working_dir
            .filter(|wd| !wd.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_WORKING_DIR.to_owned());

        let t1w = ModalityInputs {
            modality: Modality::T1w,
            image: required_image("--t1", &args.t1)?,
            brain: required_image("--t1brain", &args.t1_brain)?,
            sample_spacing: required_number("--t1sampspacing", &args.t1_sample_spacing)?,
        };

        let t1w_outputs = T1wOutputs {
            image: required_image("--ot1", &args.out_t1)?,
            brain: required_image("--ot1brain", &args.out_t1_brain)?,
            transform: required_image("--ot1warp", &args.out_t1_warp)?,
        };

        let t2w = match ImagePath::parse(&args.t2) {
            None => None,
            Some(image) => {
                let inputs = ModalityInputs {
                    modality: Modality::T2w,
                    image,
                    brain: required_image("--t2brain", &args.t2_brain)?,
                    sample_spacing: required_number("--t2sampspacing", &args.t2_sample_spacing)?,
                };
                Some(T2wSettings {
                    inputs,
                    outputs: T2wOutputs {
                        image: required_image("--ot2", &args.out_t2)?,
                        transform: required_image("--ot2warp", &args.out_t2_warp)?,
                    },
                })
            }
        };

        let mut structural = vec![("--t1", &t1w.image), ("--t1brain", &t1w.brain)];
        if let Some(t2w) = &t2w {
            structural.push(("--t2", &t2w.inputs.image));
            structural.push(("--t2brain", &t2w.inputs.brain));
        }
        ensure_distinct_names(&structural)?;
        ensure_outside_working_dir(Path::new(working_dir.trim()), &launch_dir, &structural)?;

        let unwarp_dir = args
            .unwarp_dir
            .parse::<UnwarpDirection>()
            .map_err(|e| PipelineError::InvalidInput(format!("--unwarpdir: {e}")))?;

        let gd_coeffs = args
            .gd_coeffs
            .filter(|value| !is_unset(value))
            .map(|value| PathBuf::from(value.trim()));

        Ok(Self {
            working_dir: PathBuf::from(working_dir.trim()),
            t1w,
            t1w_outputs,
            t2w,
            fmap_magnitude: required_image("--fmapmag", &args.fmap_mag)?,
            fmap_phase: required_image("--fmapphase", &args.fmap_phase)?,
            echo_diff: required_number("--echodiff", &args.echo_diff)?,
            unwarp_dir,
            gd_coeffs,
            launch_dir,
            invocation: invocation.trim().to_owned(),
        })
    }

    /// Check that every input the run consumes exists before any tool starts.
    pub fn verify_inputs(&self) -> PipelineResult<()> {
        let mut images: Vec<(&'static str, &ImagePath)> = vec![
            ("--t1", &self.t1w.image),
            ("--t1brain", &self.t1w.brain),
            ("--fmapmag", &self.fmap_magnitude),
            ("--fmapphase", &self.fmap_phase),
        ];
        if let Some(t2w) = &self.t2w {
            images.push(("--t2", &t2w.inputs.image));
            images.push(("--t2brain", &t2w.inputs.brain));
        }

        for (role, image) in images {
            if !image.exists() {
                return Err(PipelineError::MissingInput {
                    role,
                    path: image.base().to_path_buf(),
                });
            }
        }

        if let Some(coeffs) = &self.gd_coeffs {
            if !coeffs.is_file() {
                return Err(PipelineError::MissingInput {
                    role: "--gdcoeffs",
                    path: coeffs.clone(),
                });
            }
        }

        if self.working_dir.exists() && !self.working_dir.is_dir() {
            return Err(PipelineError::InvalidInput(format!(
                "working directory {} exists and is not a directory",
                self.working_dir.display()
            )));
        }

        Ok(())
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn t1w(&self) -> &ModalityInputs {
        &self.t1w
    }

    pub fn t1w_outputs(&self) -> &T1wOutputs {
        &self.t1w_outputs
    }

    pub fn t2w(&self) -> Option<&T2wSettings> {
        self.t2w.as_ref()
    }

    pub fn fmap_magnitude(&self) -> &ImagePath {
        &self.fmap_magnitude
    }

    pub fn fmap_phase(&self) -> &ImagePath {
        &self.fmap_phase
    }

    pub fn echo_diff(&self) -> &PositiveDecimal {
        &self.echo_diff
    }

    pub fn unwarp_dir(&self) -> UnwarpDirection {
        self.unwarp_dir
    }

    pub fn gd_coeffs(&self) -> Option<&Path> {
        self.gd_coeffs.as_deref()
    }

    pub fn launch_dir(&self) -> &Path {
        &self.launch_dir
    }

    pub fn invocation(&self) -> &str {
        &self.invocation
    }
}
