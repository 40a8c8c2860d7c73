//! Low-level clients over the Zuul REST API.
//!
//! Each client wraps the JSON a parent returned plus a shared
//! [`ZuulSession`]; clients compare equal when they describe the same
//! entity, regardless of the session they came through.

use crate::error::SourceError;
use crate::sources::SourceResult;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

// ---------------------------------------------------------------------------
// Wire data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TenantData {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProjectData {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobData {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A job listed by a pipeline: either a single entry or its variants.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PipelineJobEntry {
    Single(JobData),
    Variants(Vec<JobData>),
}

impl PipelineJobEntry {
    fn job(&self) -> Option<&JobData> {
        match self {
            PipelineJobEntry::Single(job) => Some(job),
            PipelineJobEntry::Variants(variants) => variants.first(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineData {
    pub name: String,
    #[serde(default)]
    pub jobs: Vec<PipelineJobEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct ProjectConfig {
    #[serde(default)]
    pipelines: Vec<PipelineData>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct ProjectDetails {
    #[serde(default)]
    configs: Vec<ProjectConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VariantData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub branches: Vec<String>,
    #[serde(default)]
    pub variables: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BuildData {
    pub uuid: String,
    #[serde(default)]
    pub job_name: String,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub pipeline: Option<String>,
    /// Seconds.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub start_time: Option<String>,
}

// ---------------------------------------------------------------------------
// ZuulSession
// ---------------------------------------------------------------------------

pub struct ZuulSession {
    client: Client,
    host: String,
    api: String,
}

impl ZuulSession {
    pub fn new(host: &str, cert: Option<&Path>, timeout: Option<Duration>) -> SourceResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(path) = cert {
            let pem = std::fs::read(path).map_err(|e| {
                SourceError::Zuul(format!("cannot read certificate {}: {e}", path.display()))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| SourceError::Zuul(format!("invalid certificate {}: {e}", path.display())))?;
            builder = builder.add_root_certificate(cert);
        }
        let client = builder
            .build()
            .map_err(|e| SourceError::Zuul(format!("cannot build HTTP client: {e}")))?;

        let host = host.trim_end_matches('/').to_string();
        let api = format!("{host}/api/");
        Ok(Self { client, host, api })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn api(&self) -> &str {
        &self.api
    }

    /// GET `{api}{service}` and decode the JSON answer.
    pub fn get(&self, service: &str) -> SourceResult<Value> {
        let url = format!("{}{service}", self.api);
        debug!("GET {url}");
        self.client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| SourceError::Zuul(format!("{url}: {e}")))?
            .json()
            .map_err(|e| SourceError::Zuul(format!("{url}: invalid JSON: {e}")))
    }

    fn get_as<T: DeserializeOwned>(&self, service: &str) -> SourceResult<T> {
        let value = self.get(service)?;
        serde_json::from_value(value)
            .map_err(|e| SourceError::Zuul(format!("unexpected answer from '{service}': {e}")))
    }
}

// ---------------------------------------------------------------------------
// ZuulRestClient
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ZuulRestClient {
    session: Arc<ZuulSession>,
}

impl ZuulRestClient {
    pub fn new(session: Arc<ZuulSession>) -> Self {
        Self { session }
    }

    pub fn info(&self) -> SourceResult<Value> {
        self.session.get("info")
    }

    pub fn tenants(&self) -> SourceResult<Vec<ZuulTenantClient>> {
        let tenants: Vec<TenantData> = self.session.get_as("tenants")?;
        Ok(tenants
            .into_iter()
            .map(|data| ZuulTenantClient {
                session: self.session.clone(),
                data,
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// ZuulTenantClient
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ZuulTenantClient {
    session: Arc<ZuulSession>,
    data: TenantData,
}

impl PartialEq for ZuulTenantClient {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl std::fmt::Debug for ZuulTenantClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZuulTenantClient").field("name", &self.data.name).finish()
    }
}

impl ZuulTenantClient {
    pub fn new(session: Arc<ZuulSession>, data: TenantData) -> Self {
        Self { session, data }
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn projects(&self) -> SourceResult<Vec<ZuulProjectClient>> {
        let projects: Vec<ProjectData> = self.session.get_as(&format!("tenant/{}/projects", self.name()))?;
        Ok(projects
            .into_iter()
            .map(|data| ZuulProjectClient {
                session: self.session.clone(),
                tenant: self.clone(),
                data,
            })
            .collect())
    }

    pub fn jobs(&self) -> SourceResult<Vec<ZuulJobClient>> {
        let jobs: Vec<JobData> = self.session.get_as(&format!("tenant/{}/jobs", self.name()))?;
        Ok(jobs.into_iter().map(|data| ZuulJobClient::new(self.clone(), data)).collect())
    }

    pub fn builds(&self) -> SourceResult<Vec<BuildData>> {
        self.session.get_as(&format!("tenant/{}/builds", self.name()))
    }

    pub fn buildsets(&self) -> SourceResult<Vec<Value>> {
        self.session.get_as(&format!("tenant/{}/buildsets", self.name()))
    }
}

// ---------------------------------------------------------------------------
// ZuulProjectClient
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ZuulProjectClient {
    session: Arc<ZuulSession>,
    tenant: ZuulTenantClient,
    data: ProjectData,
}

impl PartialEq for ZuulProjectClient {
    fn eq(&self, other: &Self) -> bool {
        self.tenant == other.tenant && self.data == other.data
    }
}

impl std::fmt::Debug for ZuulProjectClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZuulProjectClient")
            .field("tenant", &self.tenant.name())
            .field("name", &self.data.name)
            .finish()
    }
}

impl ZuulProjectClient {
    pub fn tenant(&self) -> &ZuulTenantClient {
        &self.tenant
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn url(&self) -> String {
        format!("{}/t/{}/project/{}", self.session.host(), self.tenant.name(), self.name())
    }

    /// Pipelines of every configuration branch of the project.
    pub fn pipelines(&self) -> SourceResult<Vec<ZuulPipelineClient>> {
        let details: ProjectDetails = self
            .session
            .get_as(&format!("tenant/{}/project/{}", self.tenant.name(), self.name()))?;
        Ok(details
            .configs
            .into_iter()
            .flat_map(|config| config.pipelines)
            .map(|data| ZuulPipelineClient {
                project: self.clone(),
                data,
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// ZuulPipelineClient
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ZuulPipelineClient {
    project: ZuulProjectClient,
    data: PipelineData,
}

impl PartialEq for ZuulPipelineClient {
    fn eq(&self, other: &Self) -> bool {
        self.data.name == other.data.name && self.project.name() == other.project.name()
    }
}

impl std::fmt::Debug for ZuulPipelineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZuulPipelineClient")
            .field("project", &self.project.name())
            .field("name", &self.data.name)
            .finish()
    }
}

impl ZuulPipelineClient {
    pub fn project(&self) -> &ZuulProjectClient {
        &self.project
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    /// Jobs triggered by this pipeline, as listed in the project config.
    pub fn jobs(&self) -> SourceResult<Vec<ZuulJobClient>> {
        Ok(self
            .data
            .jobs
            .iter()
            .filter_map(PipelineJobEntry::job)
            .map(|job| {
                ZuulJobClient::new(
                    self.project.tenant.clone(),
                    JobData {
                        name: job.name.clone(),
                        description: None,
                    },
                )
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// ZuulJobClient
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ZuulJobClient {
    tenant: ZuulTenantClient,
    data: JobData,
}

impl PartialEq for ZuulJobClient {
    fn eq(&self, other: &Self) -> bool {
        self.tenant == other.tenant && self.data.name == other.data.name
    }
}

impl std::fmt::Debug for ZuulJobClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZuulJobClient")
            .field("tenant", &self.tenant.name())
            .field("name", &self.data.name)
            .finish()
    }
}

impl ZuulJobClient {
    pub fn new(tenant: ZuulTenantClient, data: JobData) -> Self {
        Self { tenant, data }
    }

    pub fn tenant(&self) -> &ZuulTenantClient {
        &self.tenant
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn description(&self) -> Option<&str> {
        self.data.description.as_deref()
    }

    pub fn url(&self) -> String {
        format!(
            "{}/t/{}/job/{}",
            self.tenant.session.host(),
            self.tenant.name(),
            self.name()
        )
    }

    pub fn variants(&self) -> SourceResult<Vec<ZuulVariantClient>> {
        let variants: Vec<VariantData> = self
            .tenant
            .session
            .get_as(&format!("tenant/{}/job/{}", self.tenant.name(), self.name()))?;
        Ok(variants
            .into_iter()
            .map(|data| ZuulVariantClient {
                job: self.clone(),
                data,
            })
            .collect())
    }

    /// Builds of this job, newest first.
    pub fn builds(&self) -> SourceResult<Vec<BuildData>> {
        self.tenant.session.get_as(&format!(
            "tenant/{}/builds?job_name={}",
            self.tenant.name(),
            self.name()
        ))
    }

    /// Pipelines, across every project of the tenant, that trigger this job.
    pub fn pipelines(&self) -> SourceResult<Vec<ZuulPipelineClient>> {
        let mut result = Vec::new();
        for project in self.tenant.projects()? {
            for pipeline in project.pipelines()? {
                if pipeline.jobs()?.iter().any(|job| job == self) {
                    result.push(pipeline);
                }
            }
        }
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// ZuulVariantClient
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ZuulVariantClient {
    job: ZuulJobClient,
    data: VariantData,
}

impl PartialEq for ZuulVariantClient {
    fn eq(&self, other: &Self) -> bool {
        self.job == other.job && self.data == other.data
    }
}

impl std::fmt::Debug for ZuulVariantClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZuulVariantClient")
            .field("job", &self.job.name())
            .field("data", &self.data)
            .finish()
    }
}

impl ZuulVariantClient {
    pub fn job(&self) -> &ZuulJobClient {
        &self.job
    }

    pub fn data(&self) -> &VariantData {
        &self.data
    }

    /// Variables of the variant; with `recursive`, the parent job's are
    /// included underneath, own values taking precedence.
    pub fn variables(&self, recursive: bool) -> SourceResult<Map<String, Value>> {
        if !recursive {
            return Ok(self.data.variables.clone());
        }
        let mut visited = BTreeSet::from([self.job.name().to_string()]);
        self.collect_variables(&mut visited)
    }

    fn collect_variables(&self, visited: &mut BTreeSet<String>) -> SourceResult<Map<String, Value>> {
        let mut result = Map::new();
        if let Some(parent) = &self.data.parent {
            if visited.insert(parent.clone()) {
                let parent_job = ZuulJobClient::new(
                    self.job.tenant.clone(),
                    JobData {
                        name: parent.clone(),
                        description: None,
                    },
                );
                if let Some(first) = parent_job.variants()?.into_iter().next() {
                    result = first.collect_variables(visited)?;
                }
            } else {
                debug!("job '{}' inherits from itself through '{parent}'", self.job.name());
            }
        }
        for (key, value) in &self.data.variables {
            result.insert(key.clone(), value.clone());
        }
        Ok(result)
    }
}
