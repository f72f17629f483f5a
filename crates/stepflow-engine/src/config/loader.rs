//! Turns a configuration document into a connection-string table, a populated
//! registry and runnable jobs.

use std::collections::BTreeMap;
use std::path::Path;

use stepflow_types::ConfigError;

use crate::config::document::Element;
use crate::config::parser::{parse_document, parse_document_str};
use crate::config::schema::BindContext;
use crate::job::{Job, JobStep};
use crate::registry::{StepCatalog, StepRegistry};

const ROOT_ELEMENT: &str = "integrationConfig";

/// Connection name to connection descriptor. Filled once at load time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionStrings {
    entries: BTreeMap<String, String>,
}

impl ConnectionStrings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// [`ConfigError::Document`] if `name` is already defined.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<(), ConfigError> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(ConfigError::Document(format!(
                "connection string {name} is defined more than once"
            )));
        }
        self.entries.insert(name, value.into());
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything a document defines, ready to run.
#[derive(Debug)]
pub struct IntegrationConfig {
    connections: ConnectionStrings,
    registry: StepRegistry,
    jobs: Vec<Job>,
}

impl IntegrationConfig {
    #[must_use]
    pub fn connections(&self) -> &ConnectionStrings {
        &self.connections
    }

    #[must_use]
    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    /// Jobs in document order.
    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    #[must_use]
    pub fn job(&self, id: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id() == id)
    }

    pub fn job_ids(&self) -> impl Iterator<Item = &str> {
        self.jobs.iter().map(Job::id)
    }

    /// Remove a job so it can be run. Running consumes the job.
    pub fn take_job(&mut self, id: &str) -> Option<Job> {
        let index = self.jobs.iter().position(|j| j.id() == id)?;
        Some(self.jobs.remove(index))
    }

    #[must_use]
    pub fn into_jobs(self) -> Vec<Job> {
        self.jobs
    }
}

/// Load a configuration file.
///
/// `registry` is extended with every catalog the document names; only
/// catalogs in `available` can be named.
///
/// # Errors
///
/// Any [`ConfigError`]. Per-step failures are wrapped with job and step
/// context.
pub fn load_file(
    path: &Path,
    registry: StepRegistry,
    available: &[&dyn StepCatalog],
) -> Result<IntegrationConfig, ConfigError> {
    tracing::info!(path = %path.display(), "Loading configuration");
    let root = parse_document(path)?;
    load_document(&root, registry, available)
}

/// Load configuration from document text.
///
/// # Errors
///
/// See [`load_file`].
pub fn load_str(
    xml: &str,
    registry: StepRegistry,
    available: &[&dyn StepCatalog],
) -> Result<IntegrationConfig, ConfigError> {
    let root = parse_document_str(xml)?;
    load_document(&root, registry, available)
}

/// Load configuration from an already parsed document.
///
/// # Errors
///
/// See [`load_file`].
pub fn load_document(
    root: &Element,
    mut registry: StepRegistry,
    available: &[&dyn StepCatalog],
) -> Result<IntegrationConfig, ConfigError> {
    if root.name() != ROOT_ELEMENT {
        return Err(ConfigError::Document(format!(
            "expected <{ROOT_ELEMENT}> root element, found <{}>",
            root.name()
        )));
    }

    let connections = load_connections(root)?;
    load_extensions(root, &mut registry, available)?;

    let ctx = BindContext::new(&connections);
    let mut jobs: Vec<Job> = Vec::new();
    for node in sections(root, "jobs", "job") {
        let job = load_job(node, &registry, &ctx)?;
        if jobs.iter().any(|j| j.id() == job.id()) {
            return Err(ConfigError::DuplicateJob(job.id().to_string()));
        }
        jobs.push(job);
    }

    tracing::info!(
        connections = connections.len(),
        step_types = registry.len(),
        jobs = jobs.len(),
        "Configuration loaded"
    );

    Ok(IntegrationConfig {
        connections,
        registry,
        jobs,
    })
}

/// `<section><item/>...</section>` items; the section may repeat or be absent.
fn sections<'a>(root: &'a Element, section: &'a str, item: &'a str) -> impl Iterator<Item = &'a Element> {
    root.children_named(section)
        .flat_map(move |s| s.children_named(item))
}

fn load_connections(root: &Element) -> Result<ConnectionStrings, ConfigError> {
    let mut connections = ConnectionStrings::new();
    for node in sections(root, "connectionStrings", "connectionString") {
        let name = node.required_attribute("name")?;
        connections.insert(name, node.text().trim())?;
    }
    Ok(connections)
}

fn load_extensions(
    root: &Element,
    registry: &mut StepRegistry,
    available: &[&dyn StepCatalog],
) -> Result<(), ConfigError> {
    for node in sections(root, "extensions", "catalog") {
        let name = node.required_attribute("name")?;
        let catalog = available
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| ConfigError::UnknownCatalog(name.to_string()))?;
        registry.merge(*catalog)?;
    }
    Ok(())
}

fn load_job(node: &Element, registry: &StepRegistry, ctx: &BindContext<'_>) -> Result<Job, ConfigError> {
    let id = node.required_attribute("id")?;
    let mut job = Job::new(id);
    if let Some(description) = node.attribute("description") {
        job = job.with_description(description);
    }

    for step_node in node.children_named("step") {
        let step_id = step_node.required_attribute("id")?;
        add_step(&mut job, step_id, step_node, registry, ctx)
            .map_err(|err| err.in_step(id, step_id))?;
    }

    tracing::debug!(job = id, steps = job.len(), "Job assembled");
    Ok(job)
}

fn add_step(
    job: &mut Job,
    step_id: &str,
    node: &Element,
    registry: &StepRegistry,
    ctx: &BindContext<'_>,
) -> Result<(), ConfigError> {
    let type_name = node.required_attribute("type")?;
    let descriptor = registry.lookup(type_name)?;
    let step = JobStep::new(step_id, type_name, descriptor.create(node, ctx)?);
    match node.attribute("source") {
        Some(source) => job.add_step_from(step, source),
        None => job.add_step(step),
    }
}
