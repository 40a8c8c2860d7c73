use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// Test / Stage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Test {
    pub name: String,
    pub class_name: String,
    pub result: String,
    /// Milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Build {
    pub build_id: String,
    /// `None` while the build is still running.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<Test>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<Stage>,
}

impl Build {
    pub fn new(build_id: impl Into<String>, status: Option<String>) -> Self {
        Self {
            build_id: build_id.into(),
            status,
            duration_ms: None,
            started_at: None,
            project: None,
            pipeline: None,
            tests: Vec::new(),
            stages: Vec::new(),
        }
    }

    pub fn add_test(&mut self, test: Test) {
        match self.tests.iter_mut().find(|t| t.name == test.name) {
            Some(existing) => *existing = test,
            None => self.tests.push(test),
        }
    }

    fn merge(&mut self, other: Build) {
        if self.status.is_none() {
            self.status = other.status;
        }
        self.duration_ms = self.duration_ms.or(other.duration_ms);
        self.started_at = self.started_at.or(other.started_at);
        self.project = self.project.take().or(other.project);
        self.pipeline = self.pipeline.take().or(other.pipeline);
        for test in other.tests {
            self.add_test(test);
        }
        for stage in other.stages {
            if !self.stages.iter().any(|s| s.name == stage.name) {
                self.stages.push(stage);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Deployment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub role: String,
}

/// OpenStack deployment details recovered from a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    #[serde(default)]
    pub release: String,
    #[serde(default)]
    pub infra_type: String,
    #[serde(default)]
    pub topology: String,
    #[serde(default)]
    pub ip_version: String,
    #[serde(default)]
    pub cinder_backend: String,
    #[serde(default)]
    pub network_backend: String,
    #[serde(default)]
    pub storage_backend: String,
    /// `True` or `False`, empty when unknown.
    #[serde(default)]
    pub dvr: String,
    #[serde(default)]
    pub tls_everywhere: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
}

impl Deployment {
    pub fn is_empty(&self) -> bool {
        self.release.is_empty()
            && self.infra_type.is_empty()
            && self.topology.is_empty()
            && self.ip_version.is_empty()
            && self.cinder_backend.is_empty()
            && self.network_backend.is_empty()
            && self.storage_backend.is_empty()
            && self.dvr.is_empty()
            && self.tls_everywhere.is_empty()
            && self.nodes.is_empty()
    }

    /// Number of nodes with `role` in the topology, `None` without a topology.
    pub fn role_count(&self, role: &str) -> Option<u64> {
        if self.topology.is_empty() {
            return None;
        }
        let count = self
            .topology
            .split(',')
            .filter_map(|component| component.split_once(':'))
            .filter(|(name, _)| name.trim() == role)
            .filter_map(|(_, amount)| amount.trim().parse::<u64>().ok())
            .sum();
        Some(count)
    }

    /// Expand a topology string (`compute:2,controller:1`) into named nodes.
    pub fn nodes_from_topology(topology: &str) -> Vec<Node> {
        let mut nodes = Vec::new();
        for component in topology.split(',') {
            let Some((role, amount)) = component.split_once(':') else {
                continue;
            };
            let Ok(amount) = amount.trim().parse::<usize>() else {
                continue;
            };
            for i in 0..amount {
                nodes.push(Node {
                    name: format!("{role}-{i}"),
                    role: role.to_string(),
                });
            }
        }
        nodes
    }
}

// ---------------------------------------------------------------------------
// Variant (Zuul)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub variables: serde_json::Map<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub builds: Vec<Build>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<Deployment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<Variant>,
}

impl Job {
    pub fn new(name: impl Into<String>, url: Option<String>) -> Self {
        Self {
            name: name.into(),
            url,
            builds: Vec::new(),
            deployment: None,
            variants: Vec::new(),
        }
    }

    pub fn build(&self, build_id: &str) -> Option<&Build> {
        self.builds.iter().find(|b| b.build_id == build_id)
    }

    /// Add a build, merging it into an existing one with the same id.
    pub fn add_build(&mut self, build: Build) {
        match self.builds.iter_mut().find(|b| b.build_id == build.build_id) {
            Some(existing) => existing.merge(build),
            None => self.builds.push(build),
        }
    }

    pub fn merge(&mut self, other: Job) {
        if self.url.is_none() {
            self.url = other.url;
        }
        for build in other.builds {
            self.add_build(build);
        }
        let keep_own = self.deployment.as_ref().is_some_and(|d| !d.is_empty());
        if !keep_own && other.deployment.is_some() {
            self.deployment = other.deployment;
        }
        for variant in other.variants {
            if !self.variants.contains(&variant) {
                self.variants.push(variant);
            }
        }
    }
}

/// Insert `job` into `jobs`, merging when a job with that name already exists.
pub fn add_job(jobs: &mut BTreeMap<String, Job>, job: Job) {
    match jobs.get_mut(&job.name) {
        Some(existing) => existing.merge(job),
        None => {
            jobs.insert(job.name.clone(), job);
        }
    }
}

// ---------------------------------------------------------------------------
// Zuul hierarchy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub jobs: Vec<Job>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pipelines: Vec<Pipeline>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<Project>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub jobs: BTreeMap<String, Job>,
}

impl Tenant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            projects: Vec::new(),
            jobs: BTreeMap::new(),
        }
    }

    /// Distinct jobs of the tenant, including those listed under pipelines.
    pub fn job_count(&self) -> usize {
        let nested = self
            .projects
            .iter()
            .flat_map(|p| &p.pipelines)
            .flat_map(|p| &p.jobs)
            .map(|j| j.name.as_str());
        self.jobs
            .keys()
            .map(String::as_str)
            .chain(nested)
            .collect::<BTreeSet<_>>()
            .len()
    }
}

// ---------------------------------------------------------------------------
// SystemReport
// ---------------------------------------------------------------------------

/// Everything gathered for one system by a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemReport {
    pub environment: String,
    pub system: String,
    pub system_type: String,
    /// Source that answered the query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub jobs: BTreeMap<String, Job>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tenants: Vec<Tenant>,
    /// Set when every candidate source failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SystemReport {
    pub fn total_jobs(&self) -> usize {
        self.jobs.len() + self.tenants.iter().map(Tenant::job_count).sum::<usize>()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodes_from_topology_expands_roles() {
        let nodes = Deployment::nodes_from_topology("compute:2,controller:1");
        let names: Vec<_> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["compute-0", "compute-1", "controller-0"]);
        assert_eq!(nodes[2].role, "controller");
    }

    #[test]
    fn nodes_from_topology_skips_malformed_components() {
        let nodes = Deployment::nodes_from_topology("compute,ceph:x,database:1");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "database-0");
    }

    #[test]
    fn role_count_sums_matching_components() {
        let deployment = Deployment {
            topology: "compute:2,controller:3".into(),
            ..Default::default()
        };
        assert_eq!(deployment.role_count("controller"), Some(3));
        assert_eq!(deployment.role_count("ceph"), Some(0));
        assert_eq!(Deployment::default().role_count("compute"), None);
    }

    #[test]
    fn add_build_merges_tests_by_id() {
        let mut job = Job::new("ansible", None);
        job.add_build(Build::new("1", Some("SUCCESS".into())));

        let mut other = Build::new("1", None);
        other.tests.push(Test {
            name: "test1".into(),
            class_name: "class1".into(),
            result: "PASSED".into(),
            duration_ms: Some(1000),
        });
        job.add_build(other);

        assert_eq!(job.builds.len(), 1);
        let build = job.build("1").unwrap();
        assert_eq!(build.status.as_deref(), Some("SUCCESS"));
        assert_eq!(build.tests.len(), 1);
    }

    #[test]
    fn add_job_merges_existing() {
        let mut jobs = BTreeMap::new();
        add_job(&mut jobs, Job::new("a", Some("url".into())));

        let mut second = Job::new("a", None);
        second.add_build(Build::new("3", Some("FAILURE".into())));
        add_job(&mut jobs, second);

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs["a"].url.as_deref(), Some("url"));
        assert_eq!(jobs["a"].builds.len(), 1);
    }

    #[test]
    fn merge_keeps_non_empty_deployment() {
        let mut job = Job::new("a", None);
        job.deployment = Some(Deployment {
            release: "17.0".into(),
            ..Default::default()
        });
        let mut other = Job::new("a", None);
        other.deployment = Some(Deployment::default());
        job.merge(other);
        assert_eq!(job.deployment.unwrap().release, "17.0");
    }
}
