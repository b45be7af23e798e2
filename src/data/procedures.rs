//! Stored procedure runner used by data refresh jobs.
//!
//! This path is independent from report generation: a missing or empty
//! procedure list is a configuration error, while individual procedure
//! failures are only logged.

use std::fs;
use std::path::Path;

use log::info;

use super::postgres::PgDataSource;
use crate::config::ConfigError;

/// Reads procedure names from `path`, skipping blank lines and `#` comments.
pub fn read_procedure_names(path: &Path) -> Result<Vec<String>, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ProcedureFile {
        path: path.to_path_buf(),
        source,
    })?;

    let names: Vec<String> = parse_procedure_names(&contents);
    if names.is_empty() {
        return Err(ConfigError::NoProcedures {
            path: path.to_path_buf(),
        });
    }
    Ok(names)
}

fn parse_procedure_names(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect()
}

/// Calls every procedure in order.
pub fn run_procedures(source: &PgDataSource, names: &[String]) {
    info!("Running {} stored procedure(s)", names.len());
    for name in names {
        source.invoke_procedure(name);
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::{parse_procedure_names, read_procedure_names};
    use crate::config::ConfigError;

    fn scratch_file(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fci_report_procedures_{}", std::process::id()));
        fs::create_dir_all(&dir).expect("create scratch dir");
        let path = dir.join(name);
        fs::write(&path, contents).expect("write procedure file");
        path
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let names = parse_procedure_names("# nightly\nrefresh_aum\n\n  refresh_efectos  \n#old_proc\n");
        assert_eq!(names, vec!["refresh_aum".to_string(), "refresh_efectos".to_string()]);
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let err = read_procedure_names(&PathBuf::from("/__fci_report_missing__/procs.txt"))
            .expect_err("file does not exist");
        assert!(matches!(err, ConfigError::ProcedureFile { .. }));
    }

    #[test]
    fn file_without_procedures_is_rejected() {
        let path = scratch_file("only_comments.txt", "# nothing here\n\n");
        let err = read_procedure_names(&path).expect_err("no procedures listed");
        assert!(matches!(err, ConfigError::NoProcedures { .. }));
    }

    #[test]
    fn reads_names_from_disk() {
        let path = scratch_file("procs.txt", "refresh_aum\n");
        assert_eq!(read_procedure_names(&path).expect("read"), vec!["refresh_aum".to_string()]);
    }
}
