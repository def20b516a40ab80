use std::error::Error;
use std::fs;
use std::path::Path;

use anyhow::Context as _;
use uiaquery_runtime::SessionConfig;

pub type CliResult<T> = Result<T, Box<dyn Error>>;

pub fn load_config(path: Option<&Path>) -> CliResult<SessionConfig> {
    let Some(path) = path else {
        return Ok(SessionConfig::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("failed to read config {}", path.display()))?;
    let config =
        SessionConfig::from_json_str(&text).with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

/// Read a value that may be given inline or as `@file`.
pub fn read_argument(value: &str) -> CliResult<String> {
    match value.strip_prefix('@') {
        Some(path) => Ok(fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?),
        None => Ok(value.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_config_path_uses_defaults() {
        assert_eq!(load_config(None).expect("config"), SessionConfig::default());
    }

    #[test]
    fn config_file_is_json() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"commandTimeoutMs": 250, "includeContextElementInSearch": true}}"#).expect("write");
        let config = load_config(Some(file.path())).expect("config");
        assert!(config.include_context_element_in_search);
        assert_eq!(config.command_timeout_ms, Some(250));
    }

    #[test]
    fn unreadable_config_names_the_file() {
        let err = load_config(Some(Path::new("/nonexistent/uiaquery.json"))).expect_err("missing");
        assert!(err.to_string().contains("/nonexistent/uiaquery.json"));
    }

    #[test]
    fn at_prefix_reads_a_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "1.2").expect("write");
        let argument = format!("@{}", file.path().display());
        assert_eq!(read_argument(&argument).expect("read"), "1.2\n");
        assert_eq!(read_argument("3.4").expect("inline"), "3.4");
    }
}
