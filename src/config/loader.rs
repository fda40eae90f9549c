//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::MeridianConfig;
use crate::domain::errors::MeridianError;
use crate::domain::result::Result;
use regex::Regex;
use secrecy::Secret;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into MeridianConfig
/// 4. Applies environment variable overrides (`MERIDIAN_*` prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if the file cannot be read, TOML parsing fails, a
/// referenced environment variable is unset, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use meridian::config::load_config;
///
/// let config = load_config("meridian.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<MeridianConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MeridianError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        MeridianError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: MeridianConfig = toml::from_str(&contents)
        .map_err(|e| MeridianError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        MeridianError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are left untouched. Returns an error listing every
/// referenced variable that is not set.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("static regex");
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        let trimmed = line.trim_start();

        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{var_name}}}");
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(MeridianError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the `MERIDIAN_*` prefix
///
/// Variables follow the pattern `MERIDIAN_<SECTION>_<KEY>`, for example
/// `MERIDIAN_FHIR_BASE_URL` or `MERIDIAN_LOAD_CHUNK_SIZE`.
fn apply_env_overrides(config: &mut MeridianConfig) {
    if let Ok(val) = std::env::var("MERIDIAN_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    if let Ok(val) = std::env::var("MERIDIAN_FHIR_BASE_URL") {
        config.fhir.base_url = val;
    }
    if let Ok(val) = std::env::var("MERIDIAN_FHIR_TOKEN") {
        config.fhir.token = Some(Secret::new(val.into()));
    }
    if let Ok(val) = std::env::var("MERIDIAN_FHIR_TIMEOUT_SECONDS") {
        if let Ok(secs) = val.parse() {
            config.fhir.timeout_seconds = secs;
        }
    }
    if let Ok(val) = std::env::var("MERIDIAN_FHIR_TLS_VERIFY") {
        config.fhir.tls_verify = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("MERIDIAN_FHIR_RETRY_MAX_RETRIES") {
        if let Ok(retries) = val.parse() {
            config.fhir.retry.max_retries = retries;
        }
    }

    if let Ok(val) = std::env::var("MERIDIAN_SOURCE_PATH") {
        config.source.path = val;
    }

    if let Ok(val) = std::env::var("MERIDIAN_MAPPING_IDENTIFIER_SYSTEM") {
        config.mapping.identifier_system = val;
    }
    if let Ok(val) = std::env::var("MERIDIAN_MAPPING_DECORATE_NAMES") {
        config.mapping.decorate_names = val.parse().unwrap_or(false);
    }

    if let Ok(val) = std::env::var("MERIDIAN_LOAD_CHUNK_SIZE") {
        if let Ok(size) = val.parse() {
            config.load.chunk_size = size;
        }
    }
    if let Ok(val) = std::env::var("MERIDIAN_LOAD_BUNDLE_TYPE") {
        config.load.bundle_type = val;
    }

    if let Ok(val) = std::env::var("MERIDIAN_VERIFICATION_ENABLED") {
        config.verification.enabled = val.parse().unwrap_or(true);
    }

    if let Ok(val) = std::env::var("MERIDIAN_LOGGING_FILE_ENABLED") {
        config.logging.file_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("MERIDIAN_LOGGING_FILE_PATH") {
        config.logging.file_path = val;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("MERIDIAN_TEST_VAR", "test_value");
        let input = "token = \"${MERIDIAN_TEST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "token = \"test_value\"\n");
        std::env::remove_var("MERIDIAN_TEST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("MERIDIAN_MISSING_VAR");
        let input = "token = \"${MERIDIAN_MISSING_VAR}\"";
        let result = substitute_env_vars(input);
        assert!(result.is_err());
    }

    #[test]
    fn test_substitute_skips_comments() {
        let input = "# token = \"${NOT_SET_ANYWHERE}\"\nvalue = 1";
        let result = substitute_env_vars(input).unwrap();
        assert!(result.contains("${NOT_SET_ANYWHERE}"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
[application]
log_level = "debug"

[fhir]
base_url = "https://hapi.fhir.org/baseR4"

[source]
path = "data/legacy_patients.csv"

[load]
chunk_size = 50
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.fhir.base_url, "https://hapi.fhir.org/baseR4");
        assert_eq!(config.load.chunk_size, 50);
    }

    #[test]
    fn test_load_config_invalid_chunk_size() {
        let toml_content = r#"
[fhir]
base_url = "https://hapi.fhir.org/baseR4"

[source]
path = "data.csv"

[load]
chunk_size = 0
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}
