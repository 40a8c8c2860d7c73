//! Filtered requests over the REST clients.
//!
//! A request collects filters with `with_*` calls and only talks to the
//! host on `get()`, which returns typed responses.

use super::rest::{
    BuildData, VariantData, ZuulJobClient, ZuulPipelineClient, ZuulProjectClient, ZuulRestClient,
    ZuulTenantClient, ZuulVariantClient,
};
use crate::filtering::{apply_filters, Filter, PatternSet};
use crate::sources::SourceResult;
use serde_json::{Map, Value};
use std::sync::Arc;

fn pattern_filter<T: 'static>(patterns: &[String], field: impl Fn(&T) -> String + 'static) -> Filter<'static, T> {
    let set = PatternSet::new(patterns);
    Box::new(move |item: &T| set.is_match(&field(item)))
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// Anything that can list jobs: a tenant or a pipeline.
pub trait JobsProvider {
    fn jobs(&self) -> SourceResult<Vec<ZuulJobClient>>;
}

impl JobsProvider for ZuulTenantClient {
    fn jobs(&self) -> SourceResult<Vec<ZuulJobClient>> {
        ZuulTenantClient::jobs(self)
    }
}

impl JobsProvider for ZuulPipelineClient {
    fn jobs(&self) -> SourceResult<Vec<ZuulJobClient>> {
        ZuulPipelineClient::jobs(self)
    }
}

/// Anything that can list pipelines: a project or a job.
pub trait PipelinesProvider {
    fn pipelines(&self) -> SourceResult<Vec<ZuulPipelineClient>>;
}

impl PipelinesProvider for ZuulProjectClient {
    fn pipelines(&self) -> SourceResult<Vec<ZuulPipelineClient>> {
        ZuulProjectClient::pipelines(self)
    }
}

impl PipelinesProvider for ZuulJobClient {
    fn pipelines(&self) -> SourceResult<Vec<ZuulPipelineClient>> {
        ZuulJobClient::pipelines(self)
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub struct TenantsRequest {
    api: ZuulRestClient,
    filters: Vec<Filter<'static, ZuulTenantClient>>,
}

impl TenantsRequest {
    pub fn new(api: ZuulRestClient) -> Self {
        Self {
            api,
            filters: Vec::new(),
        }
    }

    pub fn with_name(mut self, patterns: &[String]) -> Self {
        self.filters
            .push(pattern_filter(patterns, |t: &ZuulTenantClient| t.name().to_string()));
        self
    }

    pub fn get(self) -> SourceResult<Vec<TenantResponse>> {
        let tenants = apply_filters(self.api.tenants()?, &self.filters);
        Ok(tenants.into_iter().map(TenantResponse).collect())
    }
}

pub struct ProjectsRequest {
    tenant: ZuulTenantClient,
    filters: Vec<Filter<'static, ZuulProjectClient>>,
}

impl ProjectsRequest {
    pub fn new(tenant: ZuulTenantClient) -> Self {
        Self {
            tenant,
            filters: Vec::new(),
        }
    }

    pub fn with_name(mut self, patterns: &[String]) -> Self {
        self.filters
            .push(pattern_filter(patterns, |p: &ZuulProjectClient| p.name().to_string()));
        self
    }

    pub fn get(self) -> SourceResult<Vec<ProjectResponse>> {
        let projects = apply_filters(self.tenant.projects()?, &self.filters);
        Ok(projects.into_iter().map(ProjectResponse).collect())
    }
}

pub struct PipelinesRequest {
    provider: Box<dyn PipelinesProvider>,
    filters: Vec<Filter<'static, ZuulPipelineClient>>,
}

impl PipelinesRequest {
    pub fn new(provider: impl PipelinesProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
            filters: Vec::new(),
        }
    }

    pub fn with_name(mut self, patterns: &[String]) -> Self {
        self.filters
            .push(pattern_filter(patterns, |p: &ZuulPipelineClient| p.name().to_string()));
        self
    }

    pub fn get(self) -> SourceResult<Vec<PipelineResponse>> {
        let pipelines = apply_filters(self.provider.pipelines()?, &self.filters);
        Ok(pipelines.into_iter().map(PipelineResponse).collect())
    }
}

pub struct JobsRequest {
    provider: Box<dyn JobsProvider>,
    filters: Vec<Filter<'static, ZuulJobClient>>,
}

impl JobsRequest {
    pub fn new(provider: impl JobsProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
            filters: Vec::new(),
        }
    }

    pub fn with_name(mut self, patterns: &[String]) -> Self {
        self.filters
            .push(pattern_filter(patterns, |j: &ZuulJobClient| j.name().to_string()));
        self
    }

    pub fn with_url(mut self, patterns: &[String]) -> Self {
        self.filters.push(pattern_filter(patterns, ZuulJobClient::url));
        self
    }

    pub fn get(self) -> SourceResult<Vec<JobResponse>> {
        let jobs = apply_filters(self.provider.jobs()?, &self.filters);
        Ok(jobs.into_iter().map(JobResponse).collect())
    }
}

pub struct VariantsRequest {
    job: ZuulJobClient,
}

impl VariantsRequest {
    pub fn new(job: ZuulJobClient) -> Self {
        Self { job }
    }

    pub fn get(self) -> SourceResult<Vec<VariantResponse>> {
        Ok(self.job.variants()?.into_iter().map(VariantResponse).collect())
    }
}

pub struct BuildsRequest {
    job: ZuulJobClient,
    filters: Vec<Filter<'static, BuildData>>,
    last_build_only: bool,
}

impl BuildsRequest {
    pub fn new(job: ZuulJobClient) -> Self {
        Self {
            job,
            filters: Vec::new(),
            last_build_only: false,
        }
    }

    pub fn with_uuid(mut self, patterns: &[String]) -> Self {
        self.filters
            .push(pattern_filter(patterns, |b: &BuildData| b.uuid.clone()));
        self
    }

    pub fn with_status(mut self, patterns: &[String]) -> Self {
        self.filters
            .push(pattern_filter(patterns, |b: &BuildData| b.result.clone().unwrap_or_default()));
        self
    }

    pub fn with_project(mut self, patterns: &[String]) -> Self {
        self.filters
            .push(pattern_filter(patterns, |b: &BuildData| b.project.clone().unwrap_or_default()));
        self
    }

    pub fn with_pipeline(mut self, patterns: &[String]) -> Self {
        self.filters
            .push(pattern_filter(patterns, |b: &BuildData| b.pipeline.clone().unwrap_or_default()));
        self
    }

    /// Keep only the newest build that passes the other filters.
    pub fn with_last_build_only(mut self) -> Self {
        self.last_build_only = true;
        self
    }

    pub fn get(self) -> SourceResult<Vec<BuildResponse>> {
        let mut builds = apply_filters(self.job.builds()?, &self.filters);
        // Applied last: the host lists builds newest first.
        if self.last_build_only {
            builds.truncate(1);
        }
        Ok(builds
            .into_iter()
            .map(|data| BuildResponse {
                job: self.job.clone(),
                data,
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TenantResponse(ZuulTenantClient);

impl TenantResponse {
    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn projects(&self) -> ProjectsRequest {
        ProjectsRequest::new(self.0.clone())
    }

    pub fn jobs(&self) -> JobsRequest {
        JobsRequest::new(self.0.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectResponse(ZuulProjectClient);

impl ProjectResponse {
    pub fn tenant(&self) -> TenantResponse {
        TenantResponse(self.0.tenant().clone())
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn url(&self) -> String {
        self.0.url()
    }

    pub fn pipelines(&self) -> PipelinesRequest {
        PipelinesRequest::new(self.0.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResponse(ZuulPipelineClient);

impl PipelineResponse {
    pub fn project(&self) -> ProjectResponse {
        ProjectResponse(self.0.project().clone())
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn jobs(&self) -> JobsRequest {
        JobsRequest::new(self.0.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobResponse(ZuulJobClient);

impl JobResponse {
    pub fn tenant(&self) -> TenantResponse {
        TenantResponse(self.0.tenant().clone())
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn url(&self) -> String {
        self.0.url()
    }

    pub fn variants(&self) -> VariantsRequest {
        VariantsRequest::new(self.0.clone())
    }

    pub fn builds(&self) -> BuildsRequest {
        BuildsRequest::new(self.0.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantResponse(ZuulVariantClient);

impl VariantResponse {
    pub fn job(&self) -> JobResponse {
        JobResponse(self.0.job().clone())
    }

    /// Usually the same as the job's name.
    pub fn name(&self) -> &str {
        &self.0.data().name
    }

    pub fn data(&self) -> &VariantData {
        self.0.data()
    }

    pub fn variables(&self, recursive: bool) -> SourceResult<Map<String, Value>> {
        self.0.variables(recursive)
    }
}

#[derive(Debug, Clone)]
pub struct BuildResponse {
    job: ZuulJobClient,
    data: BuildData,
}

impl BuildResponse {
    pub fn job(&self) -> JobResponse {
        JobResponse(self.job.clone())
    }

    pub fn data(&self) -> &BuildData {
        &self.data
    }
}

/// Entry point for a request chain.
pub fn tenants(session: &Arc<super::rest::ZuulSession>) -> TenantsRequest {
    TenantsRequest::new(ZuulRestClient::new(session.clone()))
}
