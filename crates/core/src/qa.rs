//! Inspection script generation.
//!
//! `qa.txt` lists viewer commands for checking a run by eye. It is written for
//! a person to paste into a shell and is never executed by the pipeline.

use crate::config::PipelineConfig;
use crate::constants::QA_VIEWER;
use crate::image::ImagePath;
use crate::paths::WorkingDirPaths;
use crate::{PipelineError, PipelineResult};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
enum QaLine {
    ChangeDir(String),
    Comment(&'static str),
    View(Vec<String>),
}

/// The inspection script for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QaScript {
    lines: Vec<QaLine>,
}

impl QaScript {
    /// Builds the script: one before/after view for T1w, and when T2w is used
    /// a before/after view for T2w plus the cross-modality overlay.
    pub fn for_run(config: &PipelineConfig, working_dir: &WorkingDirPaths) -> Self {
        let display = |image: &ImagePath| image.base().display().to_string();

        let t1w = config.t1w();
        let t1w_paths = working_dir.modality(t1w);

        let mut lines = vec![
            QaLine::ChangeDir(config.launch_dir().display().to_string()),
            QaLine::Comment("T1w before and after distortion correction"),
            QaLine::View(vec![
                display(&t1w.image),
                display(&t1w_paths.corrected_image()),
            ]),
        ];

        if let Some(t2w) = config.t2w() {
            let registration = working_dir.registration();
            lines.push(QaLine::Comment(
                "T2w before and after distortion correction and registration",
            ));
            lines.push(QaLine::View(vec![
                display(&t2w.inputs.image),
                display(&registration.registered_t2w()),
            ]));
            lines.push(QaLine::Comment("T2w overlaid on distortion-corrected T1w"));
            lines.push(QaLine::View(vec![
                display(&config.t1w_outputs().image),
                display(&t2w.outputs.image),
            ]));
        }

        Self { lines }
    }

    /// Number of viewer invocations in the script.
    pub fn viewer_lines(&self) -> usize {
        self.lines
            .iter()
            .filter(|line| matches!(line, QaLine::View(_)))
            .count()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                QaLine::ChangeDir(dir) => out.push_str(&format!("cd {dir}\n")),
                QaLine::Comment(text) => out.push_str(&format!("# {text}\n")),
                QaLine::View(images) => {
                    out.push_str(QA_VIEWER);
                    for image in images {
                        out.push(' ');
                        out.push_str(image);
                    }
                    out.push('\n');
                }
            }
        }
        out
    }

    /// Replaces any existing script at `path` with this one.
    pub fn write(&self, path: &Path) -> PipelineResult<()> {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(PipelineError::QaScriptWrite(e)),
        }
        fs::write(path, self.render()).map_err(PipelineError::QaScriptWrite)
    }
}
