//! Runs a query over every selected system, picking sources per system.

use crate::config::{Config, SystemType};
use crate::error::{CibylError, Result};
use crate::models::SystemReport;
use crate::query::{QueryArgs, QueryType};
use crate::sources::{build_source, QueryOutput, Source};
use crate::validator::Validator;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub struct Orchestrator {
    config: Config,
}

impl Orchestrator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// One report per selected system, in configuration order.
    ///
    /// A system that cannot answer, or whose sources all fail, gets its error
    /// recorded in the report and the remaining systems are still queried.
    /// The query only fails when no selected system can answer it at all.
    pub fn run_query(&self, args: &QueryArgs) -> Result<Vec<SystemReport>> {
        let environments = Validator::new(args).validate_environments(self.config.environments.clone())?;
        let query = args.query_type();
        debug!("query type: {query}");

        let mut reports = Vec::new();
        let mut unsupported = Vec::new();
        for env in &environments {
            for system in &env.systems {
                let mut report = SystemReport {
                    environment: env.name.clone(),
                    system: system.name.clone(),
                    system_type: system.system_type.to_string(),
                    source: None,
                    jobs: BTreeMap::new(),
                    tenants: Vec::new(),
                    error: None,
                };
                if query == QueryType::None {
                    reports.push(report);
                    continue;
                }

                let query = match system.system_type {
                    SystemType::Jenkins => query.for_jenkins(),
                    SystemType::Zuul => query,
                };

                let mut sources: Vec<Box<dyn Source>> = Vec::new();
                for config in system.sources.iter().filter(|s| s.enabled) {
                    match build_source(config) {
                        Ok(source) => sources.push(source),
                        Err(e) => warn!("skipping source {} of {}: {e}", config.name, system.name),
                    }
                }
                sources.retain(|s| s.is_enabled() && s.supports(query, args));
                if sources.is_empty() {
                    let error = CibylError::NoSupportedSource {
                        system: system.name.clone(),
                    };
                    warn!("{error}");
                    report.error = Some(error.to_string());
                    unsupported.push(system.name.clone());
                    reports.push(report);
                    continue;
                }
                // Stable: equal speeds keep configuration order.
                sources.sort_by_key(|s| std::cmp::Reverse(s.speed_index(query, args)));

                let mut last_error = None;
                for source in &sources {
                    info!("querying {} on {} with source {}", query, system.name, source.name());
                    match source.run(query, args) {
                        Ok(output) => {
                            match output {
                                QueryOutput::Jobs(jobs) => report.jobs = jobs,
                                QueryOutput::Tenants(tenants) => report.tenants = tenants,
                            }
                            report.source = Some(source.name().to_string());
                            last_error = None;
                            break;
                        }
                        Err(e) => {
                            warn!("source {} of {} failed: {e}", source.name(), system.name);
                            last_error = Some(CibylError::SourceFailed {
                                system: system.name.clone(),
                                source_name: source.name().to_string(),
                                message: e.to_string(),
                            });
                        }
                    }
                }
                report.error = last_error.map(|e| e.to_string());
                reports.push(report);
            }
        }

        if !reports.is_empty() && unsupported.len() == reports.len() {
            return Err(match unsupported.as_slice() {
                [system] => CibylError::NoSupportedSource { system: system.clone() },
                _ => CibylError::UnsupportedQuery {
                    query: query.to_string(),
                    systems: unsupported,
                },
            });
        }
        Ok(reports)
    }
}
