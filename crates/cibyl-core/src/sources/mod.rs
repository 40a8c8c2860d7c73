//! Ways of reading a CI system.
//!
//! Every driver implements [`Source`]. The orchestrator only talks to the
//! trait: it asks which sources can answer a query, ranks them by
//! [`Source::speed_index`] and falls back through them on failure.

pub mod jenkins;
pub mod jenkins_job_builder;
pub mod zuul;

use crate::config::{Driver, SourceConfig};
use crate::error::SourceError;
use crate::models::{Job, Tenant};
use crate::query::{QueryArgs, QueryType};
use std::collections::BTreeMap;

pub use jenkins::Jenkins;
pub use jenkins_job_builder::JenkinsJobBuilder;
pub use zuul::Zuul;

pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// What a source hands back for a query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    Jobs(BTreeMap<String, Job>),
    Tenants(Vec<Tenant>),
}

pub trait Source {
    fn name(&self) -> &str;

    fn driver(&self) -> Driver;

    fn is_enabled(&self) -> bool;

    /// Whether this source can answer `query` given the user's arguments.
    fn supports(&self, query: QueryType, args: &QueryArgs) -> bool;

    /// Relative speed of answering `query`; higher is preferred.
    fn speed_index(&self, query: QueryType, args: &QueryArgs) -> u8;

    fn get_jobs(&self, _args: &QueryArgs) -> SourceResult<BTreeMap<String, Job>> {
        Err(self.unsupported("get_jobs"))
    }

    fn get_builds(&self, _args: &QueryArgs) -> SourceResult<BTreeMap<String, Job>> {
        Err(self.unsupported("get_builds"))
    }

    fn get_tests(&self, _args: &QueryArgs) -> SourceResult<BTreeMap<String, Job>> {
        Err(self.unsupported("get_tests"))
    }

    fn get_stages(&self, _args: &QueryArgs) -> SourceResult<BTreeMap<String, Job>> {
        Err(self.unsupported("get_stages"))
    }

    fn get_deployment(&self, _args: &QueryArgs) -> SourceResult<BTreeMap<String, Job>> {
        Err(self.unsupported("get_deployment"))
    }

    fn get_tenants(&self, _query: QueryType, _args: &QueryArgs) -> SourceResult<Vec<Tenant>> {
        Err(self.unsupported("get_tenants"))
    }

    /// Run the operation matching `query`.
    fn run(&self, query: QueryType, args: &QueryArgs) -> SourceResult<QueryOutput> {
        let jobs = match query {
            QueryType::Tests => self.get_tests(args)?,
            QueryType::Stages => self.get_stages(args)?,
            QueryType::Builds => self.get_builds(args)?,
            QueryType::Deployment => self.get_deployment(args)?,
            QueryType::Jobs => self.get_jobs(args)?,
            QueryType::None => BTreeMap::new(),
            other => return self.get_tenants(other, args).map(QueryOutput::Tenants),
        };
        Ok(QueryOutput::Jobs(jobs))
    }

    fn unsupported(&self, operation: &str) -> SourceError {
        SourceError::Unsupported {
            source_name: self.name().to_string(),
            operation: operation.to_string(),
        }
    }
}

/// Build the source described by one configuration entry.
pub fn build_source(config: &SourceConfig) -> SourceResult<Box<dyn Source>> {
    Ok(match config.driver {
        Driver::Jenkins => Box::new(Jenkins::from_config(config)?),
        Driver::JenkinsJobBuilder => Box::new(JenkinsJobBuilder::from_config(config)?),
        Driver::Zuul => Box::new(Zuul::from_config(config)?),
    })
}
