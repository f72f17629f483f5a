//! Configuration document reading with environment variable substitution.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use stepflow_types::ConfigError;

use crate::config::document::{parse_xml, Element};

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var regex"));

/// Substitute `${VAR_NAME}` patterns with environment variable values.
///
/// # Errors
///
/// Returns [`ConfigError::MissingEnvVar`] naming every referenced variable
/// that is not set.
pub fn substitute_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut missing: Vec<String> = Vec::new();
    let result = expand(input, &mut missing);

    if !missing.is_empty() {
        return Err(ConfigError::MissingEnvVar(missing));
    }

    Ok(result)
}

fn expand(input: &str, missing: &mut Vec<String>) -> String {
    ENV_VAR_RE
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(val) => val,
                Err(_) => {
                    if !missing.iter().any(|m| m == var_name) {
                        missing.push(var_name.to_string());
                    }
                    String::new()
                }
            }
        })
        .into_owned()
}

/// Parse a configuration document from a string, then substitute env vars
/// in attribute values and text.
///
/// Substitution happens on the parsed tree, so a value is never read as
/// markup.
///
/// # Errors
///
/// Returns an error if the XML is malformed or a referenced variable is unset.
pub fn parse_document_str(xml: &str) -> Result<Element, ConfigError> {
    let mut root = parse_xml(xml)?;
    let mut missing: Vec<String> = Vec::new();
    root.rewrite_values(&mut |value: &str| expand(value, &mut missing));

    if !missing.is_empty() {
        return Err(ConfigError::MissingEnvVar(missing));
    }

    Ok(root)
}

/// Parse a configuration document file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the document is invalid.
pub fn parse_document(path: &Path) -> Result<Element, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_document_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("SF_TEST_HOST", "db.example.com");
        let input = "<connectionString name=\"crm\">Server=${SF_TEST_HOST}</connectionString>";
        let result = substitute_env_vars(input).unwrap();
        assert!(result.contains("db.example.com"));
        assert!(!result.contains("${SF_TEST_HOST}"));
        std::env::remove_var("SF_TEST_HOST");
    }

    #[test]
    fn test_multiple_env_vars() {
        std::env::set_var("SF_TEST_A", "alpha");
        std::env::set_var("SF_TEST_B", "beta");
        let input = "${SF_TEST_A} and ${SF_TEST_B}";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "alpha and beta");
        std::env::remove_var("SF_TEST_A");
        std::env::remove_var("SF_TEST_B");
    }

    #[test]
    fn test_no_env_vars_passthrough() {
        let input = "<jobs><job id=\"a\"/></jobs>";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, input);
    }

    #[test]
    fn test_missing_env_vars_all_reported() {
        let input = "${SF_MISSING_X} and ${SF_MISSING_Y} and ${SF_MISSING_X}";
        let err = substitute_env_vars(input).unwrap_err();
        match err {
            ConfigError::MissingEnvVar(names) => {
                assert_eq!(names, vec!["SF_MISSING_X", "SF_MISSING_Y"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_document_from_string() {
        std::env::set_var("SF_TEST_JOB", "nightly");
        let xml = r#"<integrationConfig><jobs><job id="${SF_TEST_JOB}"/></jobs></integrationConfig>"#;
        let root = parse_document_str(xml).unwrap();
        let job = root.child("jobs").unwrap().child("job").unwrap();
        assert_eq!(job.attribute("id"), Some("nightly"));
        std::env::remove_var("SF_TEST_JOB");
    }

    #[test]
    fn test_substituted_markup_characters_stay_text() {
        std::env::set_var("SF_TEST_PWD", "p&ss<1");
        std::env::set_var("SF_TEST_INJECT", r#"x"/><job id="evil"#);
        let xml = r#"<integrationConfig>
                       <connectionStrings>
                         <connectionString name="db">Password=${SF_TEST_PWD}</connectionString>
                       </connectionStrings>
                       <jobs><job id="${SF_TEST_INJECT}"/></jobs>
                     </integrationConfig>"#;
        let root = parse_document_str(xml).unwrap();
        let conn = root.child("connectionStrings").unwrap().child("connectionString").unwrap();
        assert_eq!(conn.text(), "Password=p&ss<1");
        let jobs = root.child("jobs").unwrap();
        assert_eq!(jobs.children().count(), 1);
        assert_eq!(jobs.child("job").unwrap().attribute("id"), Some(r#"x"/><job id="evil"#));
        std::env::remove_var("SF_TEST_PWD");
        std::env::remove_var("SF_TEST_INJECT");
    }

    #[test]
    fn test_parse_document_missing_vars_all_reported() {
        let xml = r#"<r a="${SF_TEST_UNSET_A}"><c>${SF_TEST_UNSET_B}</c></r>"#;
        let err = parse_document_str(xml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == &["SF_TEST_UNSET_A", "SF_TEST_UNSET_B"]));
    }

    #[test]
    fn test_parse_document_file_not_found() {
        let err = parse_document(Path::new("/nonexistent/integrationconfig.xml")).unwrap_err();
        assert!(err.to_string().contains("failed to read configuration file"));
    }
}
