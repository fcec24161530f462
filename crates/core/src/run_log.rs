//! Append-only run log kept in the working directory.

use crate::{PipelineError, PipelineResult};
use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Appends one entry recording how, where and when the pipeline was started.
pub fn append_run_log<Tz>(
    log_path: &Path,
    invocation: &str,
    launch_dir: &Path,
    started_at: DateTime<Tz>,
) -> PipelineResult<()>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let entry = format!(
        "{}\nPWD = {}\ndate: {}\n \n",
        invocation,
        launch_dir.display(),
        started_at.format("%a %b %e %H:%M:%S %z %Y")
    );

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(PipelineError::RunLogWrite)?;
    file.write_all(entry.as_bytes())
        .map_err(PipelineError::RunLogWrite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn appends_entries_in_order() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("log.txt");
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();

        append_run_log(&log, "dcreg --t1=a", Path::new("/launch"), at).unwrap();
        append_run_log(&log, "dcreg --t1=b", Path::new("/launch"), at).unwrap();

        let contents = fs::read_to_string(&log).unwrap();
        assert_eq!(
            contents,
            "dcreg --t1=a\nPWD = /launch\ndate: Tue Mar  5 14:07:09 +0000 2024\n \n\
             dcreg --t1=b\nPWD = /launch\ndate: Tue Mar  5 14:07:09 +0000 2024\n \n"
        );
    }

    #[test]
    fn missing_directory_is_reported() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("absent").join("log.txt");
        let err = append_run_log(&log, "dcreg", Path::new("/"), Utc::now()).unwrap_err();
        assert!(matches!(err, PipelineError::RunLogWrite(_)));
    }
}
