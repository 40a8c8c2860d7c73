//! Deployment details read from Jenkins Job Builder output.
//!
//! `jenkins-jobs test` renders every job into an XML file; the groovy
//! scripts and parameter defaults inside carry the deployment settings.

use super::{Source, SourceResult};
use crate::config::{Driver, SourceConfig};
use crate::error::SourceError;
use crate::filtering::{args_are_in_list, PatternSet};
use crate::models::{Deployment, Job};
use crate::query::{has_values, values, QueryArgs, QueryType};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

pub const TOPOLOGY: &str = r"[a-zA-Z0-9:,]+:[0-9]+";
pub const NODE_NAME_COUNTER: &str = r"[a-zA-Z]+:[0-9]+";
pub const IP_VERSION: &str = r"--network-protocol\s+ipv[4|6]";
pub const IP_VERSION_NUMBER: &str = r"4|6";
pub const RELEASE: &str = r".*rhos-\d\d.\d-.*patches|.*rhos-\d\d-.*patches|.*send_results_to_umb.*";
pub const RELEASE_NUMBER: &str = r"\d\d.\d|\d\d";
pub const CINDER_BACKEND: &str = r".*--storage-backend.*|.*IR_TRIPLEO_OVERCLOUD_STORAGE_BACKEND_UPD.*";
pub const CINDER_BACKEND_NAME: &str = r"ceph|lvm|netapp-iscsi|netapp-nfs|swift|nfs";
pub const DEPLOYMENT: &str = r"--deployment-files \w+\b";

const BASE_SPEED_INDEX: u8 = 3;
const CINDER_BACKEND_SPEED_INDEX: u8 = 1;

struct Patterns {
    topology: Regex,
    node_name_counter: Regex,
    ip_version: Regex,
    ip_version_number: Regex,
    release: Regex,
    release_number: Regex,
    cinder_backend: Regex,
    cinder_backend_name: Regex,
    deployment: Regex,
    text_section: Regex,
}

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| Patterns {
        topology: Regex::new(TOPOLOGY).unwrap(),
        node_name_counter: Regex::new(NODE_NAME_COUNTER).unwrap(),
        ip_version: Regex::new(IP_VERSION).unwrap(),
        ip_version_number: Regex::new(IP_VERSION_NUMBER).unwrap(),
        release: Regex::new(RELEASE).unwrap(),
        release_number: Regex::new(RELEASE_NUMBER).unwrap(),
        cinder_backend: Regex::new(CINDER_BACKEND).unwrap(),
        cinder_backend_name: Regex::new(CINDER_BACKEND_NAME).unwrap(),
        deployment: Regex::new(DEPLOYMENT).unwrap(),
        text_section: Regex::new(r"(?s)<(script|defaultValue)>(.*?)</(?:script|defaultValue)>").unwrap(),
    })
}

// ---------------------------------------------------------------------------
// XML text
// ---------------------------------------------------------------------------

fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let Some(end) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };
        let entity = &tail[1..end];
        let decoded = match entity {
            "lt" => Some('<'),
            "gt" => Some('>'),
            "amp" => Some('&'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Text of every `<script>` section followed by every `<defaultValue>`.
pub fn parse_xml(path: &Path) -> SourceResult<String> {
    let xml = std::fs::read_to_string(path)
        .map_err(|e| SourceError::JobBuilder(format!("cannot read {}: {e}", path.display())))?;
    let mut scripts = Vec::new();
    let mut defaults = Vec::new();
    for caps in patterns().text_section.captures_iter(&xml) {
        let text = decode_entities(&caps[2]);
        if &caps[1] == "script" {
            scripts.push(text);
        } else {
            defaults.push(text);
        }
    }
    let mut result = String::new();
    for text in scripts.into_iter().chain(defaults) {
        result.push('\n');
        result.push_str(&text);
    }
    Ok(result)
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Sorted `role:count` entries found on `TOPOLOGY=` lines.
pub fn extract_topology(text: &str) -> BTreeSet<String> {
    let p = patterns();
    let mut result = BTreeSet::new();
    for line in text.lines().filter(|l| l.contains("TOPOLOGY=") || l.contains("TOPOLOGY =")) {
        for topology in p.topology.find_iter(line) {
            for node in p.node_name_counter.find_iter(topology.as_str()) {
                result.insert(node.as_str().to_string());
            }
        }
    }
    result
}

pub fn extract_ip_version(text: &str) -> BTreeSet<String> {
    let p = patterns();
    let mut result = BTreeSet::new();
    for line in text.lines().filter(|l| l.contains("--network-protocol")) {
        for found in p.ip_version.find_iter(line) {
            for number in p.ip_version_number.find_iter(found.as_str()) {
                result.insert(number.as_str().to_string());
            }
        }
    }
    result
}

/// Releases from the first matching line, so `10.0` and `10` never mix.
pub fn extract_release(text: &str) -> BTreeSet<String> {
    let p = patterns();
    let mut result = BTreeSet::new();
    for line in text.lines().filter(|l| l.contains("rhos") || l.contains("send_results_to_umb")) {
        for found in p.release.find_iter(line) {
            for number in p.release_number.find_iter(found.as_str()) {
                result.insert(number.as_str().to_string());
            }
        }
        if !result.is_empty() {
            break;
        }
    }
    result
}

pub fn extract_cinder_backend(text: &str) -> BTreeSet<String> {
    let p = patterns();
    let mut result = BTreeSet::new();
    for line in text.lines() {
        for found in p.cinder_backend.find_iter(line) {
            for name in p.cinder_backend_name.find_iter(found.as_str()) {
                result.insert(name.as_str().to_string());
            }
        }
    }
    result
}

/// `ovb` wins over `baremetal`, which wins over `virt`; `None` when no
/// deployment files are referenced.
pub fn extract_infra_type(text: &str) -> Option<&'static str> {
    let p = patterns();
    let mut found = BTreeSet::new();
    for line in text.lines().filter(|l| l.contains("--deployment-files")) {
        for m in p.deployment.find_iter(line) {
            let files = m.as_str();
            if files.contains("virt") || files.contains("composable_roles") {
                found.insert("virt");
            } else if files.contains("ovb") {
                found.insert("ovb");
            } else {
                found.insert("baremetal");
            }
        }
    }
    ["ovb", "baremetal", "virt"].into_iter().find(|t| found.contains(t))
}

fn join(values: &BTreeSet<String>) -> String {
    values.iter().cloned().collect::<Vec<_>>().join(",")
}

// ---------------------------------------------------------------------------
// JenkinsJobBuilder
// ---------------------------------------------------------------------------

pub struct JenkinsJobBuilder {
    name: String,
    enabled: bool,
    xml_path: PathBuf,
}

impl JenkinsJobBuilder {
    pub fn new(name: impl Into<String>, xml_path: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            name: name.into(),
            enabled,
            xml_path: xml_path.into(),
        }
    }

    pub fn from_config(config: &SourceConfig) -> SourceResult<Self> {
        let xml_path = config
            .xml_path
            .clone()
            .ok_or_else(|| SourceError::JobBuilder(format!("source '{}' has no xml_path", config.name)))?;
        Ok(Self::new(config.name.clone(), xml_path, config.enabled))
    }

    /// Generated job files by job name.
    fn xml_files(&self) -> SourceResult<BTreeMap<String, PathBuf>> {
        let entries = std::fs::read_dir(&self.xml_path).map_err(|e| {
            SourceError::JobBuilder(format!("cannot list {}: {e}", self.xml_path.display()))
        })?;
        let mut files = BTreeMap::new();
        for entry in entries {
            let path = entry
                .map_err(|e| SourceError::JobBuilder(e.to_string()))?
                .path();
            if path.extension().and_then(|e| e.to_str()) != Some("xml") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                files.insert(stem.to_string(), path.clone());
            }
        }
        Ok(files)
    }

    fn matching_files(&self, args: &QueryArgs) -> SourceResult<BTreeMap<String, PathBuf>> {
        let mut files = self.xml_files()?;
        if has_values(&args.jobs) {
            let patterns = PatternSet::new(values(&args.jobs));
            files.retain(|name, _| patterns.is_match(name));
        }
        Ok(files)
    }

    /// Deployment of one job, or `None` when the filters reject it.
    fn deployment_for(&self, job_name: &str, text: &str, args: &QueryArgs) -> Option<Deployment> {
        let mut deployment = Deployment::default();
        let all = args.spec;

        if all || args.topology.is_some() {
            let topology = extract_topology(text);
            let wanted = values(&args.topology);
            if !wanted.is_empty() && !topology.iter().any(|n| wanted.iter().any(|w| n.contains(w.as_str()))) {
                debug!("job {job_name} rejected by topology");
                return None;
            }
            deployment.topology = join(&topology);
            deployment.nodes = Deployment::nodes_from_topology(&deployment.topology);
        }

        if all || args.ip_version.is_some() {
            let ip_version = extract_ip_version(text);
            let wanted = values(&args.ip_version);
            if !wanted.is_empty() && !ip_version.iter().any(|v| wanted.iter().any(|w| w.contains(v.as_str()))) {
                debug!("job {job_name} rejected by ip version");
                return None;
            }
            deployment.ip_version = join(&ip_version);
        }

        if all || args.release.is_some() {
            let release = extract_release(text);
            if has_values(&args.release) && !args_are_in_list(values(&args.release), release.iter().map(String::as_str)) {
                debug!("job {job_name} rejected by release");
                return None;
            }
            deployment.release = join(&release);
        }

        if all || args.cinder_backend.is_some() {
            let backends = extract_cinder_backend(text);
            if has_values(&args.cinder_backend)
                && !args_are_in_list(values(&args.cinder_backend), backends.iter().map(String::as_str))
            {
                debug!("job {job_name} rejected by cinder backend");
                return None;
            }
            deployment.cinder_backend = join(&backends);
        }

        if all || args.infra_type.is_some() {
            match extract_infra_type(text) {
                Some(infra) => {
                    if has_values(&args.infra_type) && !args_are_in_list(values(&args.infra_type), [infra]) {
                        debug!("job {job_name} rejected by infra type");
                        return None;
                    }
                    deployment.infra_type = infra.to_string();
                }
                // A job whose infra type cannot be told is only dropped when asked for.
                None if args.infra_type.is_some() => {
                    debug!("job {job_name} has no deployment files");
                    return None;
                }
                None => {}
            }
        }

        Some(deployment)
    }
}

impl Source for JenkinsJobBuilder {
    fn name(&self) -> &str {
        &self.name
    }

    fn driver(&self) -> Driver {
        Driver::JenkinsJobBuilder
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn supports(&self, query: QueryType, args: &QueryArgs) -> bool {
        // Backends, flags and node counts are not read from job definitions.
        matches!(query, QueryType::Jobs | QueryType::Deployment) && !args.wants_node_details()
    }

    fn speed_index(&self, _query: QueryType, args: &QueryArgs) -> u8 {
        if args.cinder_backend.is_some() {
            CINDER_BACKEND_SPEED_INDEX
        } else {
            BASE_SPEED_INDEX
        }
    }

    fn get_jobs(&self, args: &QueryArgs) -> SourceResult<BTreeMap<String, Job>> {
        Ok(self
            .matching_files(args)?
            .into_keys()
            .map(|name| (name.clone(), Job::new(name, None)))
            .collect())
    }

    fn get_deployment(&self, args: &QueryArgs) -> SourceResult<BTreeMap<String, Job>> {
        let mut jobs = BTreeMap::new();
        for (name, path) in self.matching_files(args)? {
            let text = parse_xml(&path)?;
            let Some(deployment) = self.deployment_for(&name, &text, args) else {
                continue;
            };
            let mut job = Job::new(name.clone(), None);
            job.deployment = Some(deployment);
            jobs.insert(name, job);
        }
        Ok(jobs)
    }
}
