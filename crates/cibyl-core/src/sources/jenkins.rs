//! Jenkins REST API source.

use super::{Source, SourceResult};
use crate::config::{Driver, SourceConfig};
use crate::error::SourceError;
use crate::filtering::{
    args_are_in_list, satisfy_case_insensitive_match, satisfy_exact_match, satisfy_range_constraint, PatternSet,
};
use crate::models::{Build, Deployment, Job, Stage, Test};
use crate::query::{has_values, values, QueryArgs, QueryType};
use chrono::DateTime;
use regex::Regex;
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde_json::Value;
use serde_yaml::Value as YamlValue;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info};

pub const JOBS_QUERY: &str = "?tree=jobs[name,url]";
pub const BUILDS_QUERY: &str = "?tree=allBuilds[number,result,duration,timestamp]";
pub const LAST_BUILD_QUERY: &str = "?tree=jobs[name,url,lastBuild[number,result,duration,timestamp]]";
pub const DEPLOYMENT_QUERY: &str = "?tree=jobs[name,url,lastCompletedBuild[description]]";
pub const TESTS_QUERY: &str = "?tree=suites[cases[className,name,duration,status]],childReports[result[suites[cases[className,name,duration,status]]]]";

const SPEED_INDEX: u8 = 2;

/// infrared files archived next to the logs of a build.
const PROVISION_ARTIFACT: &str = "infrared/provision.yml";
const OVERCLOUD_ARTIFACT: &str = "infrared/overcloud-install.yml";

static RELEASE_RE: OnceLock<Regex> = OnceLock::new();
static IP_RE: OnceLock<Regex> = OnceLock::new();
static ROLE_RE: OnceLock<Regex> = OnceLock::new();
static NETWORK_RE: OnceLock<Regex> = OnceLock::new();
static STORAGE_RE: OnceLock<Regex> = OnceLock::new();
static INFRA_RE: OnceLock<Regex> = OnceLock::new();
static DVR_RE: OnceLock<Regex> = OnceLock::new();
static TLS_RE: OnceLock<Regex> = OnceLock::new();
static LOGS_RE: OnceLock<Regex> = OnceLock::new();

fn release_re() -> &'static Regex {
    RELEASE_RE.get_or_init(|| Regex::new(r"(?:^|_)(\d\d(?:\.\d)?)(?:_|$)").unwrap())
}

fn ip_re() -> &'static Regex {
    IP_RE.get_or_init(|| Regex::new(r"ipv(4|6)").unwrap())
}

fn role_re() -> &'static Regex {
    ROLE_RE.get_or_init(|| Regex::new(r"^(\d+)(comp|cont|ceph|db|msg|net)$").unwrap())
}

fn network_re() -> &'static Regex {
    NETWORK_RE.get_or_init(|| Regex::new(r"(?:^|_)(geneve|vxlan|gre|vlan)(?:_|$)").unwrap())
}

fn storage_re() -> &'static Regex {
    STORAGE_RE.get_or_init(|| Regex::new(r"(?:^|_)(ceph|lvm|swift|nfs|netapp)(?:_|$)").unwrap())
}

fn infra_re() -> &'static Regex {
    INFRA_RE.get_or_init(|| Regex::new(r"(?:^|_)(ovb|virt|baremetal)(?:_|$)").unwrap())
}

fn dvr_re() -> &'static Regex {
    DVR_RE.get_or_init(|| Regex::new(r"(?:^|_)(no_)?dvr(?:_|$)").unwrap())
}

fn tls_re() -> &'static Regex {
    TLS_RE.get_or_init(|| Regex::new(r"(?:^|_)(no_)?tls(?:_|$)").unwrap())
}

fn logs_re() -> &'static Regex {
    LOGS_RE.get_or_init(|| Regex::new(r#"href="([^"]+)">Browse logs"#).unwrap())
}

pub struct Jenkins {
    name: String,
    enabled: bool,
    url: String,
    username: Option<String>,
    token: Option<String>,
    cert: Option<PathBuf>,
    client: Client,
}

impl Jenkins {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        username: Option<String>,
        token: Option<String>,
        cert: Option<PathBuf>,
        timeout: Option<Duration>,
    ) -> SourceResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(path) = &cert {
            builder = builder.add_root_certificate(load_certificate(path)?);
        }
        let client = builder
            .build()
            .map_err(|e| SourceError::Jenkins(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            enabled: true,
            url: url.into(),
            username,
            token,
            cert,
            client,
        })
    }

    pub fn from_config(config: &SourceConfig) -> SourceResult<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| SourceError::Jenkins(format!("source '{}' has no url", config.name)))?;
        let mut jenkins = Self::new(
            config.name.clone(),
            url,
            config.username.clone(),
            config.token.clone(),
            config.cert.clone(),
            config.timeout(),
        )?;
        jenkins.enabled = config.enabled;
        Ok(jenkins)
    }

    pub fn cert(&self) -> Option<&Path> {
        self.cert.as_deref()
    }

    /// `{url}/{item}/api/json{query}` without doubled slashes.
    pub fn api_url(&self, query: &str, item: &str) -> String {
        let base = self.url.trim_end_matches('/');
        let item = item.trim_matches('/');
        if item.is_empty() {
            format!("{base}/api/json{query}")
        } else {
            format!("{base}/{item}/api/json{query}")
        }
    }

    fn get(&self, url: &str) -> SourceResult<Response> {
        debug!("GET {url}");
        let mut request = self.client.get(url);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.token.as_deref());
        }
        request
            .send()
            .map_err(|e| SourceError::Jenkins(format!("{url}: {e}")))
    }

    fn read_json(url: &str, response: Response) -> SourceResult<Value> {
        let response = response
            .error_for_status()
            .map_err(|e| SourceError::Jenkins(format!("{url}: {e}")))?;
        response
            .json()
            .map_err(|e| SourceError::Jenkins(format!("{url}: invalid JSON: {e}")))
    }

    /// Query the JSON API of `item` (empty for the root).
    pub fn send_request(&self, query: &str, item: &str) -> SourceResult<Value> {
        let url = self.api_url(query, item);
        let response = self.get(&url)?;
        Self::read_json(&url, response)
    }

    /// Same as [`Jenkins::send_request`], returning the body untouched.
    pub fn send_raw(&self, query: &str, item: &str) -> SourceResult<String> {
        let url = self.api_url(query, item);
        self.get(&url)?
            .error_for_status()
            .and_then(|r| r.text())
            .map_err(|e| SourceError::Jenkins(format!("{url}: {e}")))
    }

    /// Fetch `url`, treating a 404 as "nothing there".
    fn send_optional(&self, url: &str) -> SourceResult<Option<Value>> {
        let response = self.get(url)?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("{url} not found");
            return Ok(None);
        }
        Self::read_json(url, response).map(Some)
    }

    // -----------------------------------------------------------------------
    // Jobs
    // -----------------------------------------------------------------------

    fn filter_jobs(&self, response: &Value, args: &QueryArgs) -> Vec<Value> {
        let name_patterns = has_values(&args.jobs).then(|| PatternSet::new(values(&args.jobs)));
        let url_patterns = has_values(&args.job_url).then(|| PatternSet::new(values(&args.job_url)));

        job_entries(response)
            .filter(|entry| {
                let name = str_field(entry, "name").unwrap_or_default();
                let url = str_field(entry, "url").unwrap_or_default();
                name_patterns.as_ref().map_or(true, |p| p.is_match(name))
                    && url_patterns.as_ref().map_or(true, |p| p.is_match(url))
            })
            .cloned()
            .collect()
    }

    fn jobs_from_entries(entries: &[Value]) -> BTreeMap<String, Job> {
        let mut jobs = BTreeMap::new();
        for entry in entries {
            let Some(name) = str_field(entry, "name") else {
                continue;
            };
            let url = str_field(entry, "url").map(str::to_string);
            jobs.insert(name.to_string(), Job::new(name, url));
        }
        jobs
    }

    /// Jobs matching the job arguments, narrowed by the deployment ones
    /// when any was given.
    fn selected_jobs(&self, args: &QueryArgs) -> SourceResult<BTreeMap<String, Job>> {
        if args.wants_deployment() {
            self.get_deployment(args)
        } else {
            self.get_jobs(args)
        }
    }

    // -----------------------------------------------------------------------
    // Deployment
    // -----------------------------------------------------------------------

    /// Absolute URL of the logs linked from a build description.
    fn logs_url(&self, description: &str) -> Option<String> {
        let link = logs_re().captures(description)?.get(1)?.as_str();
        if link.starts_with("http://") || link.starts_with("https://") {
            return Some(link.trim_end_matches('/').to_string());
        }
        Some(format!("{}/{}", self.url.trim_end_matches('/'), link.trim_matches('/')))
    }

    /// YAML artifact at `url`, `None` when it cannot be fetched or parsed.
    fn read_artifact(&self, url: &str) -> Option<YamlValue> {
        let response = match self.get(url) {
            Ok(response) => response,
            Err(e) => {
                debug!("artifact unavailable: {e}");
                return None;
            }
        };
        let text = match response.error_for_status().and_then(Response::text) {
            Ok(text) => text,
            Err(e) => {
                debug!("artifact {url} unavailable: {e}");
                return None;
            }
        };
        serde_yaml::from_str(&text)
            .map_err(|e| debug!("artifact {url} is not YAML: {e}"))
            .ok()
    }

    /// Overwrite `deployment` with whatever the infrared artifacts under
    /// `logs` know. Fields they do not carry keep their current value.
    fn read_deployment_artifacts(&self, logs: &str, deployment: &mut Deployment) {
        if let Some(provision) = self.read_artifact(&format!("{logs}/{PROVISION_ARTIFACT}")) {
            let topology = topology_from_provision(&provision);
            if !topology.is_empty() {
                deployment.topology = topology;
            }
        }
        let Some(overcloud) = self.read_artifact(&format!("{logs}/{OVERCLOUD_ARTIFACT}")) else {
            return;
        };
        let install = &overcloud["install"];
        let protocol = yaml_string(&install["network"]["protocol"]);
        let files = yaml_string(&install["deployment"]["files"]);
        let found = [
            (&mut deployment.release, yaml_string(&install["version"])),
            (&mut deployment.network_backend, yaml_string(&install["network"]["backend"])),
            (&mut deployment.storage_backend, yaml_string(&install["storage"]["backend"])),
            (&mut deployment.dvr, yaml_string(&install["network"]["dvr"])),
            (&mut deployment.tls_everywhere, yaml_string(&install["tls"]["everywhere"])),
            (
                &mut deployment.ip_version,
                protocol.strip_prefix("ipv").map_or_else(|| protocol.clone(), str::to_string),
            ),
            (&mut deployment.infra_type, infra_from_files(&files).to_string()),
        ];
        for (field, value) in found {
            if !value.is_empty() {
                *field = value;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Builds
    // -----------------------------------------------------------------------

    /// Latest build of every job, using a single request.
    pub fn get_last_build(&self, args: &QueryArgs) -> SourceResult<BTreeMap<String, Job>> {
        let response = self.send_request(LAST_BUILD_QUERY, "")?;
        let entries = self.filter_jobs(&response, args);
        let mut jobs = Self::jobs_from_entries(&entries);

        for entry in &entries {
            let Some(job) = str_field(entry, "name").and_then(|n| jobs.get_mut(n)) else {
                continue;
            };
            match entry.get("lastBuild").and_then(parse_build) {
                Some(build) if build_passes(&build, args) => job.add_build(build),
                Some(_) => {}
                None => debug!("job {} has no builds", job.name),
            }
        }
        if args.wants_deployment() {
            let mut selected = self.get_deployment(args)?;
            jobs.retain(|name, _| selected.contains_key(name));
            for (name, job) in jobs.iter_mut() {
                job.deployment = selected.remove(name).and_then(|j| j.deployment);
            }
        }
        Ok(jobs)
    }

    fn builds_of(&self, job_name: &str, args: &QueryArgs) -> SourceResult<Vec<Build>> {
        let response = self.send_request(BUILDS_QUERY, &format!("job/{job_name}"))?;
        let builds = response
            .get("allBuilds")
            .and_then(Value::as_array)
            .map(|all| all.iter().filter_map(parse_build).collect::<Vec<_>>())
            .unwrap_or_default();
        Ok(builds.into_iter().filter(|b| build_passes(b, args)).collect())
    }

    /// Builds whose tests or stages are looked at: the requested ids, or
    /// the newest build otherwise.
    fn target_builds(&self, args: &QueryArgs) -> SourceResult<BTreeMap<String, Job>> {
        let mut jobs = self.get_builds(args)?;
        if has_values(&args.builds) || args.last_build {
            return Ok(jobs);
        }
        for job in jobs.values_mut() {
            let newest = job
                .builds
                .iter()
                .max_by_key(|b| b.build_id.parse::<u64>().unwrap_or(0))
                .cloned();
            job.builds = newest.into_iter().collect();
        }
        Ok(jobs)
    }
}

// ---------------------------------------------------------------------------
// Source impl
// ---------------------------------------------------------------------------

impl Source for Jenkins {
    fn name(&self) -> &str {
        &self.name
    }

    fn driver(&self) -> Driver {
        Driver::Jenkins
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn supports(&self, query: QueryType, args: &QueryArgs) -> bool {
        // Neither job names nor infrared artifacts carry the cinder backend.
        if args.cinder_backend.is_some() {
            return false;
        }
        matches!(
            query,
            QueryType::Jobs | QueryType::Deployment | QueryType::Builds | QueryType::Tests | QueryType::Stages
        )
    }

    fn speed_index(&self, _query: QueryType, _args: &QueryArgs) -> u8 {
        SPEED_INDEX
    }

    fn get_jobs(&self, args: &QueryArgs) -> SourceResult<BTreeMap<String, Job>> {
        let response = self.send_request(JOBS_QUERY, "")?;
        let entries = self.filter_jobs(&response, args);
        Ok(Self::jobs_from_entries(&entries))
    }

    fn get_builds(&self, args: &QueryArgs) -> SourceResult<BTreeMap<String, Job>> {
        if args.last_build {
            return self.get_last_build(args);
        }
        let mut jobs = self.selected_jobs(args)?;
        info!("fetching builds of {} jobs from {}", jobs.len(), self.name);
        for job in jobs.values_mut() {
            for build in self.builds_of(&job.name, args)? {
                job.add_build(build);
            }
        }
        Ok(jobs)
    }

    fn get_tests(&self, args: &QueryArgs) -> SourceResult<BTreeMap<String, Job>> {
        let mut jobs = self.target_builds(args)?;
        let name_patterns = has_values(&args.tests).then(|| PatternSet::new(values(&args.tests)));
        let class_patterns =
            has_values(&args.test_class).then(|| PatternSet::new(values(&args.test_class)));
        let filtering = name_patterns.is_some() || class_patterns.is_some() || has_values(&args.test_result);

        for job in jobs.values_mut() {
            for build in &mut job.builds {
                let item = format!("job/{}/{}/testReport", job.name, build.build_id);
                let Some(report) = self.send_optional(&self.api_url(TESTS_QUERY, &item))? else {
                    continue;
                };
                for test in parse_test_report(&report) {
                    let keep = name_patterns.as_ref().map_or(true, |p| p.is_match(&test.name))
                        && class_patterns.as_ref().map_or(true, |p| p.is_match(&test.class_name))
                        && (!has_values(&args.test_result)
                            || satisfy_case_insensitive_match(values(&args.test_result), &test.result));
                    if keep {
                        build.add_test(test);
                    }
                }
            }
            if filtering {
                job.builds.retain(|b| !b.tests.is_empty());
            }
        }
        if filtering {
            jobs.retain(|_, job| !job.builds.is_empty());
        }
        Ok(jobs)
    }

    fn get_stages(&self, args: &QueryArgs) -> SourceResult<BTreeMap<String, Job>> {
        let mut jobs = self.target_builds(args)?;
        let base = self.url.trim_end_matches('/').to_string();
        for job in jobs.values_mut() {
            for build in &mut job.builds {
                let url = format!("{base}/job/{}/{}/wfapi/describe", job.name, build.build_id);
                if let Some(describe) = self.send_optional(&url)? {
                    build.stages = parse_stages(&describe);
                }
            }
        }
        Ok(jobs)
    }

    /// Deployment of every job, read from the infrared artifacts of its last
    /// completed build and completed from the job name.
    fn get_deployment(&self, args: &QueryArgs) -> SourceResult<BTreeMap<String, Job>> {
        let response = self.send_request(DEPLOYMENT_QUERY, "")?;
        let entries = self.filter_jobs(&response, args);
        let mut jobs = Self::jobs_from_entries(&entries);

        for entry in &entries {
            let Some(job) = str_field(entry, "name").and_then(|n| jobs.get_mut(n)) else {
                continue;
            };
            let mut deployment = deployment_from_job_name(&job.name);
            let logs = entry
                .pointer("/lastCompletedBuild/description")
                .and_then(Value::as_str)
                .and_then(|description| self.logs_url(description));
            if let Some(logs) = logs {
                self.read_deployment_artifacts(&logs, &mut deployment);
                deployment.nodes = Deployment::nodes_from_topology(&deployment.topology);
            }
            job.deployment = Some(deployment);
        }

        jobs.retain(|name, job| {
            let keep = job.deployment.as_ref().is_some_and(|d| deployment_passes(d, args));
            if !keep {
                debug!("job {name} filtered out by deployment arguments");
            }
            keep
        });
        Ok(jobs)
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn load_certificate(path: &Path) -> SourceResult<reqwest::Certificate> {
    let pem = std::fs::read(path)
        .map_err(|e| SourceError::Jenkins(format!("cannot read certificate {}: {e}", path.display())))?;
    reqwest::Certificate::from_pem(&pem)
        .map_err(|e| SourceError::Jenkins(format!("invalid certificate {}: {e}", path.display())))
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Entries of a `jobs` listing that are jobs rather than folders or views.
fn job_entries(response: &Value) -> impl Iterator<Item = &Value> {
    response
        .get("jobs")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|entry| str_field(entry, "_class").is_some_and(is_job_class))
}

/// Folders and multibranch containers are listed next to jobs.
fn is_job_class(class: &str) -> bool {
    let class = class.to_lowercase();
    (class.contains("job") || class.contains("project"))
        && !class.contains("folder")
        && !class.contains("multibranch")
}

fn parse_build(value: &Value) -> Option<Build> {
    let number = value.get("number")?;
    let build_id = match number {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return None,
    };
    let mut build = Build::new(build_id, str_field(value, "result").map(str::to_string));
    build.duration_ms = value.get("duration").and_then(Value::as_u64);
    build.started_at = value
        .get("timestamp")
        .and_then(Value::as_i64)
        .and_then(DateTime::from_timestamp_millis);
    Some(build)
}

fn build_passes(build: &Build, args: &QueryArgs) -> bool {
    if has_values(&args.builds) && !satisfy_exact_match(values(&args.builds), &build.build_id) {
        return false;
    }
    if has_values(&args.build_status) {
        let status = build.status.as_deref().unwrap_or_default();
        if !satisfy_case_insensitive_match(values(&args.build_status), status) {
            return false;
        }
    }
    true
}

fn seconds_to_millis(seconds: f64) -> u64 {
    (seconds * 1000.0).round().max(0.0) as u64
}

/// Test cases of a report, from its own suites and from child reports.
fn parse_test_report(report: &Value) -> Vec<Test> {
    let mut suites: Vec<&Value> = report
        .get("suites")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .collect();
    let children = report.get("childReports").and_then(Value::as_array).into_iter().flatten();
    for child in children {
        if let Some(child_suites) = child.pointer("/result/suites").and_then(Value::as_array) {
            suites.extend(child_suites);
        }
    }

    let mut tests = Vec::new();
    for suite in suites {
        let cases = suite.get("cases").and_then(Value::as_array).into_iter().flatten();
        for case in cases {
            let class_name = str_field(case, "className").unwrap_or_default();
            // setUpClass and friends carry no class name.
            if class_name.is_empty() {
                continue;
            }
            tests.push(Test {
                name: str_field(case, "name").unwrap_or_default().to_string(),
                class_name: class_name.to_string(),
                result: str_field(case, "status").unwrap_or_default().to_string(),
                duration_ms: case.get("duration").and_then(Value::as_f64).map(seconds_to_millis),
            });
        }
    }
    tests
}

fn parse_stages(describe: &Value) -> Vec<Stage> {
    describe
        .get("stages")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .map(|stage| Stage {
            name: str_field(stage, "name").unwrap_or_default().to_string(),
            status: str_field(stage, "status").unwrap_or_default().to_string(),
            duration_ms: stage.get("durationMillis").and_then(Value::as_u64),
        })
        .collect()
}

fn role_for(token: &str) -> &'static str {
    match token {
        "comp" => "compute",
        "cont" => "controller",
        "ceph" => "ceph",
        "db" => "database",
        "msg" => "messaging",
        _ => "networker",
    }
}

fn deployment_passes(deployment: &Deployment, args: &QueryArgs) -> bool {
    let substrings = [
        (&args.release, &deployment.release),
        (&args.ip_version, &deployment.ip_version),
        (&args.topology, &deployment.topology),
        (&args.network_backend, &deployment.network_backend),
        (&args.storage_backend, &deployment.storage_backend),
        (&args.infra_type, &deployment.infra_type),
    ];
    let flags = [(&args.dvr, &deployment.dvr), (&args.tls_everywhere, &deployment.tls_everywhere)];
    let counts = [(&args.controllers, "controller"), (&args.computes, "compute")];

    substrings
        .iter()
        .all(|(arg, value)| !has_values(arg) || args_are_in_list(values(arg), [value.as_str()]))
        && flags
            .iter()
            .all(|(arg, value)| !has_values(arg) || satisfy_case_insensitive_match(values(arg), value))
        && counts.iter().all(|(arg, role)| {
            !has_values(arg)
                || deployment
                    .role_count(role)
                    .is_some_and(|amount| satisfy_range_constraint(values(arg), amount))
        })
}

/// Scalars as text, booleans spelled `True` and `False`.
fn yaml_string(value: &YamlValue) -> String {
    match value {
        YamlValue::String(s) => s.clone(),
        YamlValue::Bool(true) => "True".to_string(),
        YamlValue::Bool(false) => "False".to_string(),
        YamlValue::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// `compute:2,controller:3` from the node files listed in `provision.yml`.
fn topology_from_provision(provision: &YamlValue) -> String {
    let Some(nodes) = provision["provision"]["topology"]["nodes"].as_mapping() else {
        return String::new();
    };
    let mut roles: Vec<(String, u64)> = nodes
        .iter()
        .filter_map(|(file, amount)| {
            let role = file.as_str()?.trim_end_matches(".yml");
            Some((role.to_string(), amount.as_u64()?))
        })
        .collect();
    roles.sort();
    roles
        .iter()
        .map(|(role, amount)| format!("{role}:{amount}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Infrastructure behind the deployment files path, e.g. `path/to/ovb`.
fn infra_from_files(files: &str) -> &'static str {
    ["ovb", "baremetal", "virt"]
        .into_iter()
        .find(|infra| files.contains(infra))
        .unwrap_or_default()
}

fn name_token(re: &Regex, name: &str) -> String {
    re.captures(name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// `True`/`False` for names carrying `token` or `no_token`.
fn name_flag(re: &Regex, name: &str) -> String {
    match re.captures(name) {
        Some(c) if c.get(1).is_some() => "False".to_string(),
        Some(_) => "True".to_string(),
        None => String::new(),
    }
}

/// Deployment details encoded in a job name such as
/// `test_17.3_ipv4_job_2comp_1cont_geneve_no_dvr`.
pub fn deployment_from_job_name(name: &str) -> Deployment {
    let release = release_re()
        .captures(name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    let ip_version = ip_re()
        .captures(name)
        .and_then(|c| c.get(1))
        .map_or_else(|| "unknown".to_string(), |m| m.as_str().to_string());

    let mut roles: Vec<(&str, &str)> = name
        .split('_')
        .filter_map(|piece| role_re().captures(piece))
        .filter_map(|c| Some((role_for(c.get(2)?.as_str()), c.get(1)?.as_str())))
        .collect();
    roles.sort_by(|a, b| a.0.cmp(b.0));
    let topology = roles
        .iter()
        .map(|(role, amount)| format!("{role}:{amount}"))
        .collect::<Vec<_>>()
        .join(",");

    Deployment {
        release,
        ip_version,
        infra_type: name_token(infra_re(), name),
        network_backend: name_token(network_re(), name),
        storage_backend: name_token(storage_re(), name),
        dvr: name_flag(dvr_re(), name),
        tls_everywhere: name_flag(tls_re(), name),
        nodes: Deployment::nodes_from_topology(&topology),
        topology,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
