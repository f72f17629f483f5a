//! Integration tests for loading configuration documents into runnable jobs.

use std::io::Write;
use std::path::PathBuf;

use stepflow_engine::config::schema::{Bindable, Property, Schema};
use stepflow_engine::{
    load_file, load_str, Capability, RunStatus, Step, StepCatalog, StepContext, StepDescriptor, StepFailure,
    StepRegistry,
};
use stepflow_types::ConfigError;

fn fixture(name: &str) -> PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn write_config(xml: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(xml.as_bytes()).unwrap();
    file
}

/// A step from an extension catalog that needs a connection string.
#[derive(Debug, Default)]
struct CrmUpload {
    connection: String,
    entity: String,
    batch_size: i64,
}

impl Bindable for CrmUpload {
    fn schema() -> Schema<Self> {
        Schema::new()
            .property(Property::connection("Connection", |s: &mut Self, v| s.connection = v).required())
            .property(Property::string("Entity", |s: &mut Self, v| s.entity = v).inline().required())
            .property(Property::integer("BatchSize", |s: &mut Self, v| s.batch_size = v))
    }
}

impl Step for CrmUpload {
    fn capability(&self) -> Capability {
        Capability::Sink
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size < 0 {
            return Err(ConfigError::invalid("batchSize must not be negative"));
        }
        Ok(())
    }

    fn execute(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepFailure> {
        while ctx.has_available() {
            ctx.dequeue()?;
        }
        Ok(())
    }
}

struct CrmCatalog;

impl StepCatalog for CrmCatalog {
    fn name(&self) -> &str {
        "crm"
    }

    fn steps(&self) -> Vec<StepDescriptor> {
        vec![StepDescriptor::of::<CrmUpload>("crm::CrmUpload").with_alias("CrmSink")]
    }
}

#[test]
fn test_load_fixture_counts_jobs_and_steps() {
    let config = load_file(&fixture("integrationconfig.xml"), StepRegistry::new(), &[])
        .expect("Failed to load fixture");

    assert_eq!(config.job_ids().collect::<Vec<_>>(), vec!["contacts", "renames"]);
    assert_eq!(config.job("contacts").unwrap().len(), 7);
    assert_eq!(config.job("renames").unwrap().len(), 2);
    assert_eq!(
        config.job("contacts").unwrap().description(),
        Some("Deduplicate and reshape contacts")
    );
    assert_eq!(config.connections().len(), 2);
    assert_eq!(
        config.connections().get("staging"),
        Some("Server=localhost;Database=staging")
    );
}

#[test]
fn test_fixture_job_runs_end_to_end() {
    let mut config = load_file(&fixture("integrationconfig.xml"), StepRegistry::new(), &[]).unwrap();
    let result = config.take_job("contacts").unwrap().run().unwrap();

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.steps.len(), 7);
    assert_eq!(result.step("read").unwrap().records_out, 3);
    assert_eq!(result.step("dedupe").unwrap().records_in, Some(3));
    assert_eq!(result.step("dedupe").unwrap().records_out, 2);
    assert_eq!(result.step("log").unwrap().records_out, 2);
    assert_eq!(result.step("first").unwrap().records_in, Some(2));
    assert_eq!(result.step("first").unwrap().records_out, 1);
    assert_eq!(result.step("audit").unwrap().records_in, Some(2));
}

#[test]
fn test_extension_catalog_binds_connection() {
    let xml = r#"
        <integrationConfig>
          <connectionStrings>
            <connectionString name="crm">Url=https://crm.example.test</connectionString>
          </connectionStrings>
          <extensions><catalog name="crm" /></extensions>
          <jobs>
            <job id="upload">
              <step id="read" type="ObjectSource"><jsonObject>{"id":1}</jsonObject></step>
              <step id="write" type="CrmSink" entity="contact">
                <connection name="connection">crm</connection>
                <batchSize>10</batchSize>
              </step>
            </job>
          </jobs>
        </integrationConfig>"#;

    let config = load_str(xml, StepRegistry::new(), &[&CrmCatalog]).unwrap();
    assert!(config.registry().contains("CrmSink"));
    let job = config.job("upload").unwrap();
    let types: Vec<&str> = job.steps().map(|s| s.type_name()).collect();
    assert_eq!(types, vec!["ObjectSource", "CrmSink"]);

    let mut config = config;
    let result = config.take_job("upload").unwrap().run().unwrap();
    assert!(result.is_success());
    assert_eq!(result.step("write").unwrap().records_in, Some(1));
}

#[test]
fn test_catalog_not_named_in_document_is_not_loaded() {
    let xml = r#"<integrationConfig><jobs><job id="j">
                   <step id="read" type="ObjectSource"/>
                   <step id="write" type="CrmSink" entity="contact"/>
                 </job></jobs></integrationConfig>"#;
    let err = load_str(xml, StepRegistry::new(), &[&CrmCatalog]).unwrap_err();
    assert!(matches!(err.root(), ConfigError::UnknownStepType(ref n) if n == "CrmSink"), "got: {err}");
}

#[test]
fn test_unresolved_connection_names_job_and_step() {
    let xml = r#"
        <integrationConfig>
          <extensions><catalog name="crm" /></extensions>
          <jobs><job id="upload">
            <step id="read" type="ObjectSource"/>
            <step id="write" type="CrmSink" entity="contact">
              <connection name="connection">nowhere</connection>
            </step>
          </job></jobs>
        </integrationConfig>"#;
    let err = load_str(xml, StepRegistry::new(), &[&CrmCatalog]).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("'write' step in job 'upload'"), "got: {msg}");
    assert!(matches!(err.root(), ConfigError::MissingConnection(ref p) if p == "connection"));
}

#[test]
fn test_catalog_colliding_with_builtin_rejected() {
    struct Shadowing;

    impl StepCatalog for Shadowing {
        fn name(&self) -> &str {
            "shadowing"
        }

        fn steps(&self) -> Vec<StepDescriptor> {
            vec![StepDescriptor::of::<CrmUpload>("crm::CrmUpload").with_alias("Distinct")]
        }
    }

    let xml = r#"<integrationConfig><extensions><catalog name="shadowing"/></extensions></integrationConfig>"#;
    let err = load_str(xml, StepRegistry::new(), &[&Shadowing]).unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateStepType(ref n) if n == "Distinct"), "got: {err}");
}

#[test]
fn test_missing_required_property_is_reported_before_run() {
    let xml = r#"<integrationConfig><jobs><job id="import">
                   <step id="read" type="ObjectSource"/>
                   <step id="dedupe" type="Distinct"/>
                 </job></jobs></integrationConfig>"#;
    let err = load_str(xml, StepRegistry::new(), &[]).unwrap_err();
    assert!(err.to_string().contains("'dedupe' step in job 'import'"), "got: {err}");
    assert!(matches!(err.root(), ConfigError::MissingProperty(ref p) if p == "keyField"));
}

#[test]
fn test_invalid_integer_is_reported() {
    let xml = r#"<integrationConfig><jobs><job id="j">
                   <step id="read" type="ObjectSource"/>
                   <step id="limit" type="LimitRecords"><top>ten</top></step>
                 </job></jobs></integrationConfig>"#;
    let err = load_str(xml, StepRegistry::new(), &[]).unwrap_err();
    assert!(matches!(err.root(), ConfigError::InvalidValue { .. }), "got: {err}");
}

#[test]
fn test_sink_first_is_invalid_topology() {
    let xml = r#"<integrationConfig><jobs><job id="j">
                   <step id="limit" type="LimitRecords"><top>1</top></step>
                 </job></jobs></integrationConfig>"#;
    let err = load_str(xml, StepRegistry::new(), &[]).unwrap_err();
    assert!(matches!(err.root(), ConfigError::InvalidTopology(_)), "got: {err}");
}

#[test]
fn test_unknown_source_reference_is_named() {
    let xml = r#"<integrationConfig><jobs><job id="j">
                   <step id="read" type="ObjectSource"/>
                   <step id="out" type="Discard" source="reader"/>
                 </job></jobs></integrationConfig>"#;
    let err = load_str(xml, StepRegistry::new(), &[]).unwrap_err();
    assert!(matches!(err.root(), ConfigError::UnknownSourceStep(ref id) if id == "reader"));
    assert!(err.to_string().contains("reader"));
}

#[test]
fn test_validation_failure_is_an_error_not_a_failed_run() {
    let xml = r#"<integrationConfig><jobs><job id="j">
                   <step id="read" type="ObjectSource"/>
                   <step id="limit" type="LimitRecords"><top>-5</top></step>
                 </job></jobs></integrationConfig>"#;
    let mut config = load_str(xml, StepRegistry::new(), &[]).unwrap();
    let err = config.take_job("j").unwrap().run().unwrap_err();
    assert!(err.to_string().contains("'limit' step in job 'j'"), "got: {err}");
}

#[test]
fn test_env_vars_substituted_from_file() {
    std::env::set_var("SF_IT_CRM_URL", "https://crm.example.test");
    std::env::set_var("SF_IT_JOB", "nightly");
    let file = write_config(
        r#"<integrationConfig>
             <connectionStrings>
               <connectionString name="crm">Url=${SF_IT_CRM_URL}</connectionString>
             </connectionStrings>
             <jobs><job id="${SF_IT_JOB}"/></jobs>
           </integrationConfig>"#,
    );

    let config = load_file(file.path(), StepRegistry::new(), &[]).unwrap();
    assert_eq!(config.connections().get("crm"), Some("Url=https://crm.example.test"));
    assert!(config.job("nightly").is_some());

    std::env::remove_var("SF_IT_CRM_URL");
    std::env::remove_var("SF_IT_JOB");
}

#[test]
fn test_env_var_with_xml_metacharacters_loads_verbatim() {
    std::env::set_var("SF_IT_DB_PASSWORD", "p&ss<1");
    let file = write_config(
        r#"<integrationConfig>
             <connectionStrings>
               <connectionString name="db">Password=${SF_IT_DB_PASSWORD}</connectionString>
             </connectionStrings>
           </integrationConfig>"#,
    );

    let config = load_file(file.path(), StepRegistry::new(), &[]).unwrap();
    assert_eq!(config.connections().get("db"), Some("Password=p&ss<1"));

    std::env::remove_var("SF_IT_DB_PASSWORD");
}

#[test]
fn test_missing_env_var_fails_load() {
    let file = write_config(r#"<integrationConfig><jobs><job id="${SF_IT_UNSET_VAR}"/></jobs></integrationConfig>"#);
    let err = load_file(file.path(), StepRegistry::new(), &[]).unwrap_err();
    assert!(matches!(err, ConfigError::MissingEnvVar(ref vars) if vars == &["SF_IT_UNSET_VAR"]));
}

#[test]
fn test_missing_file_is_io_error() {
    let err = load_file(&fixture("does_not_exist.xml"), StepRegistry::new(), &[]).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }), "got: {err}");
}

#[test]
fn test_malformed_document_is_rejected() {
    let file = write_config("<integrationConfig><jobs></integrationConfig>");
    let err = load_file(file.path(), StepRegistry::new(), &[]).unwrap_err();
    assert!(matches!(err, ConfigError::Document(_)), "got: {err}");
}
