use serde::Serialize;
use std::fmt;

/// User input of a query.
///
/// Every list argument distinguishes three states: `None` (not given),
/// `Some(vec![])` (given without values, meaning "show this level") and
/// `Some(values)` (given with filters).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryArgs {
    pub env_name: Option<Vec<String>>,
    pub systems: Option<Vec<String>>,
    pub system_type: Option<Vec<String>>,
    pub sources: Option<Vec<String>>,

    pub jobs: Option<Vec<String>>,
    pub job_url: Option<Vec<String>>,

    pub builds: Option<Vec<String>>,
    pub build_status: Option<Vec<String>>,
    pub last_build: bool,

    pub tests: Option<Vec<String>>,
    pub test_result: Option<Vec<String>>,
    pub test_class: Option<Vec<String>>,

    pub stages: bool,

    pub tenants: Option<Vec<String>>,
    pub projects: Option<Vec<String>>,
    pub pipelines: Option<Vec<String>>,
    pub variants: bool,

    pub release: Option<Vec<String>>,
    pub topology: Option<Vec<String>>,
    pub ip_version: Option<Vec<String>>,
    pub cinder_backend: Option<Vec<String>>,
    pub infra_type: Option<Vec<String>>,
    pub network_backend: Option<Vec<String>>,
    pub storage_backend: Option<Vec<String>>,
    pub dvr: Option<Vec<String>>,
    pub tls_everywhere: Option<Vec<String>>,
    /// Ranges such as `<2` or `>=3`, all of which must hold.
    pub controllers: Option<Vec<String>>,
    pub computes: Option<Vec<String>>,
    pub spec: bool,
}

/// Values of an argument, empty when it was not given.
pub fn values(arg: &Option<Vec<String>>) -> &[String] {
    arg.as_deref().unwrap_or_default()
}

/// True when the argument was given with at least one value.
pub fn has_values(arg: &Option<Vec<String>>) -> bool {
    arg.as_ref().is_some_and(|v| !v.is_empty())
}

impl QueryArgs {
    pub fn wants_deployment(&self) -> bool {
        self.spec
            || self.release.is_some()
            || self.topology.is_some()
            || self.ip_version.is_some()
            || self.cinder_backend.is_some()
            || self.infra_type.is_some()
            || self.wants_node_details()
    }

    /// Deployment arguments that need the job name or build artifacts of a
    /// Jenkins job to be answered.
    pub fn wants_node_details(&self) -> bool {
        self.network_backend.is_some()
            || self.storage_backend.is_some()
            || self.dvr.is_some()
            || self.tls_everywhere.is_some()
            || self.controllers.is_some()
            || self.computes.is_some()
    }

    /// The deepest level this query asks for.
    ///
    /// Deployment arguments given next to a deeper level still narrow its
    /// jobs; every source applies them on top of that level.
    pub fn query_type(&self) -> QueryType {
        if self.tests.is_some() || self.test_result.is_some() || self.test_class.is_some() {
            QueryType::Tests
        } else if self.stages {
            QueryType::Stages
        } else if self.builds.is_some() || self.build_status.is_some() || self.last_build {
            QueryType::Builds
        } else if self.variants {
            QueryType::Variants
        } else if self.wants_deployment() {
            QueryType::Deployment
        } else if self.jobs.is_some() || self.job_url.is_some() {
            QueryType::Jobs
        } else if self.pipelines.is_some() {
            QueryType::Pipelines
        } else if self.projects.is_some() {
            QueryType::Projects
        } else if self.tenants.is_some() {
            QueryType::Tenants
        } else {
            QueryType::None
        }
    }
}

// ---------------------------------------------------------------------------
// QueryType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    None,
    Tenants,
    Projects,
    Pipelines,
    Jobs,
    Deployment,
    Variants,
    Builds,
    Stages,
    Tests,
}

impl QueryType {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryType::None => "none",
            QueryType::Tenants => "tenants",
            QueryType::Projects => "projects",
            QueryType::Pipelines => "pipelines",
            QueryType::Jobs => "jobs",
            QueryType::Deployment => "deployment",
            QueryType::Variants => "variants",
            QueryType::Builds => "builds",
            QueryType::Stages => "stages",
            QueryType::Tests => "tests",
        }
    }

    /// Zuul hierarchy levels collapse to a jobs query on Jenkins.
    pub fn for_jenkins(self) -> QueryType {
        match self {
            QueryType::Tenants | QueryType::Projects | QueryType::Pipelines => QueryType::Jobs,
            other => other,
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
