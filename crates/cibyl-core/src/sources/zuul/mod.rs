//! Zuul REST API source.

pub mod rest;
pub mod transactions;
pub mod variants;

use self::rest::{BuildData, ZuulSession};
use self::transactions::{JobResponse, PipelineResponse, ProjectResponse, TenantResponse};
use self::variants::ReleaseSearch;
use super::{QueryOutput, Source, SourceResult};
use crate::config::{Driver, SourceConfig};
use crate::error::SourceError;
use crate::filtering::args_are_in_list;
use crate::models::{Build, Deployment, Job, Pipeline, Project, Tenant, Variant};
use crate::query::{has_values, values, QueryArgs, QueryType};
use chrono::{NaiveDateTime, TimeZone, Utc};
use std::sync::Arc;
use tracing::{debug, info};

const SPEED_INDEX: u8 = 3;

/// Project and pipeline a job was reached through.
#[derive(Debug, Clone, Copy)]
struct JobScope<'a> {
    project: &'a str,
    pipeline: &'a str,
}

fn exact(name: &str) -> Vec<String> {
    vec![format!("^{}$", regex::escape(name))]
}

pub struct Zuul {
    name: String,
    enabled: bool,
    session: Arc<ZuulSession>,
    /// Tenants queried when the user does not pick any.
    tenants: Vec<String>,
}

impl Zuul {
    pub fn new(name: impl Into<String>, session: ZuulSession, tenants: Vec<String>, enabled: bool) -> Self {
        Self {
            name: name.into(),
            enabled,
            session: Arc::new(session),
            tenants,
        }
    }

    pub fn from_config(config: &SourceConfig) -> SourceResult<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| SourceError::Zuul(format!("source '{}' has no url", config.name)))?;
        let session = ZuulSession::new(url, config.cert.as_deref(), config.timeout())?;
        Ok(Self::new(config.name.clone(), session, config.tenants.clone(), config.enabled))
    }

    fn tenant_patterns<'a>(&'a self, args: &'a QueryArgs) -> &'a [String] {
        if has_values(&args.tenants) {
            values(&args.tenants)
        } else {
            &self.tenants
        }
    }

    fn project_model(&self, project: &ProjectResponse, query: QueryType, args: &QueryArgs) -> SourceResult<Project> {
        let mut model = Project {
            name: project.name().to_string(),
            url: Some(project.url()),
            pipelines: Vec::new(),
        };
        if query < QueryType::Pipelines && args.pipelines.is_none() {
            return Ok(model);
        }

        let mut request = project.pipelines();
        if has_values(&args.pipelines) {
            request = request.with_name(values(&args.pipelines));
        }
        for pipeline in request.get()? {
            model.pipelines.push(self.pipeline_model(&pipeline, project.name(), query, args)?);
        }
        Ok(model)
    }

    /// A pipeline and, from the jobs level down, the jobs it triggers.
    fn pipeline_model(
        &self,
        pipeline: &PipelineResponse,
        project: &str,
        query: QueryType,
        args: &QueryArgs,
    ) -> SourceResult<Pipeline> {
        let mut model = Pipeline {
            name: pipeline.name().to_string(),
            jobs: Vec::new(),
        };
        if query < QueryType::Jobs {
            return Ok(model);
        }

        let mut request = pipeline.jobs();
        if has_values(&args.jobs) {
            request = request.with_name(values(&args.jobs));
        }
        if has_values(&args.job_url) {
            request = request.with_url(values(&args.job_url));
        }
        let scope = JobScope {
            project,
            pipeline: pipeline.name(),
        };
        for job in request.get()? {
            if let Some(job) = self.job_model(&job, query, args, Some(scope))? {
                model.jobs.push(job);
            }
        }
        Ok(model)
    }

    fn job_model(
        &self,
        job: &JobResponse,
        query: QueryType,
        args: &QueryArgs,
        scope: Option<JobScope<'_>>,
    ) -> SourceResult<Option<Job>> {
        let mut model = Job::new(job.name(), Some(job.url()));

        // Deployment arguments narrow every level below them too.
        if query == QueryType::Variants || args.wants_deployment() {
            let variants = job.variants().get()?;
            if args.wants_deployment() {
                let release = match variants.first() {
                    Some(first) => ReleaseSearch::new().search(first)?.unwrap_or_default(),
                    None => String::new(),
                };
                if has_values(&args.release) && !args_are_in_list(values(&args.release), [release.as_str()]) {
                    debug!("job {} rejected by release", job.name());
                    return Ok(None);
                }
                model.deployment = Some(Deployment {
                    release,
                    ..Default::default()
                });
            }
            if args.variants {
                for variant in &variants {
                    let data = variant.data();
                    model.variants.push(Variant {
                        name: data.name.clone(),
                        description: data.description.clone(),
                        parent: data.parent.clone(),
                        branches: data.branches.clone(),
                        variables: variant.variables(true)?,
                    });
                }
            }
        }

        if query == QueryType::Builds {
            let mut request = job.builds();
            if has_values(&args.builds) {
                request = request.with_uuid(values(&args.builds));
            }
            if has_values(&args.build_status) {
                request = request.with_status(values(&args.build_status));
            }
            if let Some(scope) = scope {
                request = request
                    .with_project(&exact(scope.project))
                    .with_pipeline(&exact(scope.pipeline));
            }
            if args.last_build {
                request = request.with_last_build_only();
            }
            for build in request.get()? {
                model.add_build(build_model(build.data()));
            }
            let filtered = has_values(&args.builds) || has_values(&args.build_status);
            if filtered && model.builds.is_empty() {
                return Ok(None);
            }
        }

        Ok(Some(model))
    }

    /// A tenant down to the queried level. Projects or pipelines given with
    /// a jobs-or-deeper query restrict the jobs to those their pipelines
    /// trigger, shown under them.
    fn tenant_model(&self, tenant: &TenantResponse, query: QueryType, args: &QueryArgs) -> SourceResult<Tenant> {
        let mut model = Tenant::new(tenant.name());

        let scoped_jobs = query >= QueryType::Jobs && (args.projects.is_some() || args.pipelines.is_some());
        let wants_projects = matches!(query, QueryType::Projects | QueryType::Pipelines)
            || (query == QueryType::Tenants && args.projects.is_some())
            || scoped_jobs;
        if wants_projects {
            let mut request = tenant.projects();
            if has_values(&args.projects) {
                request = request.with_name(values(&args.projects));
            }
            for project in request.get()? {
                model.projects.push(self.project_model(&project, query, args)?);
            }
        }

        if query >= QueryType::Jobs && !scoped_jobs {
            let mut request = tenant.jobs();
            if has_values(&args.jobs) {
                request = request.with_name(values(&args.jobs));
            }
            if has_values(&args.job_url) {
                request = request.with_url(values(&args.job_url));
            }
            for job in request.get()? {
                if let Some(job) = self.job_model(&job, query, args, None)? {
                    crate::models::add_job(&mut model.jobs, job);
                }
            }
        }

        Ok(model)
    }
}

fn build_model(data: &BuildData) -> Build {
    let mut build = Build::new(data.uuid.clone(), data.result.clone());
    build.duration_ms = data.duration.map(|secs| (secs * 1000.0).round().max(0.0) as u64);
    build.started_at = data
        .start_time
        .as_deref()
        .and_then(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok())
        .map(|naive| Utc.from_utc_datetime(&naive));
    build.project = data.project.clone();
    build.pipeline = data.pipeline.clone();
    build
}

impl Source for Zuul {
    fn name(&self) -> &str {
        &self.name
    }

    fn driver(&self) -> Driver {
        Driver::Zuul
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn supports(&self, query: QueryType, args: &QueryArgs) -> bool {
        match query {
            QueryType::Tests | QueryType::Stages | QueryType::None => false,
            // Only the release can be read from a job's variables.
            _ if args.wants_deployment() => {
                args.topology.is_none()
                    && args.ip_version.is_none()
                    && args.cinder_backend.is_none()
                    && args.infra_type.is_none()
                    && !args.wants_node_details()
            }
            _ => true,
        }
    }

    fn speed_index(&self, _query: QueryType, _args: &QueryArgs) -> u8 {
        SPEED_INDEX
    }

    fn get_tenants(&self, query: QueryType, args: &QueryArgs) -> SourceResult<Vec<Tenant>> {
        let mut request = transactions::tenants(&self.session);
        let patterns = self.tenant_patterns(args);
        if !patterns.is_empty() {
            request = request.with_name(patterns);
        }
        let tenants = request.get()?;
        info!("querying {} tenants of {}", tenants.len(), self.name);

        let mut result = Vec::new();
        for tenant in &tenants {
            result.push(self.tenant_model(tenant, query, args)?);
        }
        Ok(result)
    }

    /// Every level is answered through tenants.
    fn run(&self, query: QueryType, args: &QueryArgs) -> SourceResult<QueryOutput> {
        if !self.supports(query, args) {
            return Err(self.unsupported(query.as_str()));
        }
        self.get_tenants(query, args).map(QueryOutput::Tenants)
    }
}
