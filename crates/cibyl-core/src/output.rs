//! Rendering of query results as indented text or JSON.

use crate::error::Result;
use crate::models::{Build, Deployment, Job, Stage, SystemReport, Tenant, Test, Variant};
use crate::query::QueryType;
use crate::text::{as_minutes, IndentedTextBuilder};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Colorized,
    Json,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Colorized => "colorized",
            OutputFormat::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "colorized" => Ok(OutputFormat::Colorized),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{other}' (expected text, colorized or json)")),
        }
    }
}

// ---------------------------------------------------------------------------
// Palette
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";

/// How labels and values are decorated. The plain palette adds nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    ansi: bool,
}

impl Palette {
    pub fn plain() -> Self {
        Self { ansi: false }
    }

    pub fn colorized() -> Self {
        Self { ansi: true }
    }

    pub fn for_format(format: OutputFormat) -> Self {
        Self {
            ansi: format == OutputFormat::Colorized,
        }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.ansi {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    pub fn label(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    pub fn name(&self, text: &str) -> String {
        self.paint(BLUE, text)
    }

    pub fn status_colored(&self, status: &str) -> String {
        let code = match status.to_uppercase().as_str() {
            "SUCCESS" | "PASSED" | "FIXED" => GREEN,
            "FAILURE" | "FAILED" | "REGRESSION" => RED,
            "UNSTABLE" => YELLOW,
            _ => BLUE,
        };
        self.paint(code, status)
    }
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct TextOptions {
    pub verbosity: u8,
    pub palette: Palette,
    /// Print every deployment field, even the ones that are unknown.
    pub spec: bool,
    pub query: QueryType,
}

struct Printer {
    opts: TextOptions,
}

impl Printer {
    fn field(&self, label: &str, value: impl fmt::Display) -> String {
        format!("{} {value}", self.opts.palette.label(label))
    }

    fn verbose(&self) -> bool {
        self.opts.verbosity > 0
    }

    fn tenant(&self, tenant: &Tenant) -> IndentedTextBuilder {
        let mut out = IndentedTextBuilder::default();
        out.add(self.field("Tenant:", self.opts.palette.name(&tenant.name)), 0);
        for project in &tenant.projects {
            out.add(self.field("Project:", self.opts.palette.name(&project.name)), 1);
            if let (true, Some(url)) = (self.verbose(), &project.url) {
                out.add(self.field("URL:", url), 2);
            }
            for pipeline in &project.pipelines {
                out.add(self.field("Pipeline:", self.opts.palette.name(&pipeline.name)), 2);
                for job in &pipeline.jobs {
                    out.extend_nested(self.job(job), 3);
                }
            }
        }
        for job in tenant.jobs.values() {
            out.extend_nested(self.job(job), 1);
        }
        if self.opts.query >= QueryType::Jobs {
            out.add(self.field("Total jobs found in tenant:", tenant.job_count()), 1);
        }
        out
    }

    fn job(&self, job: &Job) -> IndentedTextBuilder {
        let mut out = IndentedTextBuilder::default();
        out.add(self.field("Job:", self.opts.palette.name(&job.name)), 0);
        if let (true, Some(url)) = (self.verbose(), &job.url) {
            out.add(self.field("URL:", url), 1);
        }
        if let Some(deployment) = &job.deployment {
            out.extend_nested(self.deployment(deployment), 1);
        }
        for variant in &job.variants {
            out.extend_nested(self.variant(variant), 1);
        }
        for build in &job.builds {
            out.extend_nested(self.build(build), 1);
        }
        out
    }

    fn variant(&self, variant: &Variant) -> IndentedTextBuilder {
        let mut out = IndentedTextBuilder::default();
        out.add(self.field("Variant:", self.opts.palette.name(&variant.name)), 0);
        if let Some(description) = &variant.description {
            out.add(self.field("Description:", description), 1);
        }
        if let Some(parent) = &variant.parent {
            out.add(self.field("Parent:", parent), 1);
        }
        if !variant.branches.is_empty() {
            out.add(self.field("Branches:", variant.branches.join(", ")), 1);
        }
        if self.verbose() && !variant.variables.is_empty() {
            out.add(self.opts.palette.label("Variables:"), 1);
            for (key, value) in &variant.variables {
                let value = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                out.add(format!("{key}: {value}"), 2);
            }
        }
        out
    }

    fn build(&self, build: &Build) -> IndentedTextBuilder {
        let palette = self.opts.palette;
        let mut out = IndentedTextBuilder::default();
        out.add(self.field("Build:", palette.name(&build.build_id)), 0);
        match &build.status {
            Some(status) => out.add(self.field("Status:", palette.status_colored(status)), 1),
            None => out.add(self.field("Status:", "RUNNING"), 1),
        };
        if self.verbose() {
            if let Some(duration) = build.duration_ms {
                out.add(self.field("Duration:", format!("{:.4}min", as_minutes(duration))), 1);
            }
            if let Some(started) = build.started_at {
                out.add(self.field("Started:", started.format("%Y-%m-%d %H:%M:%S UTC")), 1);
            }
            if let Some(project) = &build.project {
                out.add(self.field("Project:", project), 1);
            }
            if let Some(pipeline) = &build.pipeline {
                out.add(self.field("Pipeline:", pipeline), 1);
            }
        }
        for stage in &build.stages {
            out.extend_nested(self.stage(stage), 1);
        }
        for test in &build.tests {
            out.extend_nested(self.test(test), 1);
        }
        out
    }

    fn stage(&self, stage: &Stage) -> IndentedTextBuilder {
        let mut out = IndentedTextBuilder::default();
        out.add(self.field("Stage:", self.opts.palette.name(&stage.name)), 0);
        out.add(self.field("Status:", self.opts.palette.status_colored(&stage.status)), 1);
        if let (true, Some(duration)) = (self.verbose(), stage.duration_ms) {
            out.add(self.field("Duration:", format!("{:.4}min", as_minutes(duration))), 1);
        }
        out
    }

    fn test(&self, test: &Test) -> IndentedTextBuilder {
        let mut out = IndentedTextBuilder::default();
        out.add(self.field("Test:", self.opts.palette.name(&test.name)), 0);
        out.add(self.field("Result:", self.opts.palette.status_colored(&test.result)), 1);
        if self.verbose() {
            out.add(self.field("Class name:", &test.class_name), 1);
            if let Some(duration) = test.duration_ms {
                out.add(self.field("Duration:", format!("{:.4}min", as_minutes(duration))), 1);
            }
        }
        out
    }

    fn deployment(&self, deployment: &Deployment) -> IndentedTextBuilder {
        let mut out = IndentedTextBuilder::default();
        out.add(self.opts.palette.label("Openstack deployment:"), 0);
        let fields = [
            ("Release:", &deployment.release),
            ("Infra type:", &deployment.infra_type),
            ("Topology:", &deployment.topology),
            ("IP version:", &deployment.ip_version),
            ("Cinder backend:", &deployment.cinder_backend),
            ("Network backend:", &deployment.network_backend),
            ("Storage backend:", &deployment.storage_backend),
            ("DVR:", &deployment.dvr),
            ("TLS everywhere:", &deployment.tls_everywhere),
        ];
        for (label, value) in fields {
            if !value.is_empty() {
                out.add(self.field(label, value), 1);
            } else if self.opts.spec {
                out.add(self.field(label, "N/A"), 1);
            }
        }
        if (self.verbose() || self.opts.spec) && !deployment.nodes.is_empty() {
            out.add(self.opts.palette.label("Nodes:"), 1);
            for node in &deployment.nodes {
                out.add(self.field("- Node name:", &node.name), 2);
                out.add(self.field("Role:", &node.role), 3);
            }
        }
        out
    }

    fn report(&self, report: &SystemReport) -> IndentedTextBuilder {
        let mut out = IndentedTextBuilder::default();
        out.add(self.field("System:", self.opts.palette.name(&report.system)), 0);
        if self.verbose() {
            if let Some(line) = out.last_mut() {
                line.append(format!(" (type: {})", report.system_type));
            }
            if let Some(source) = &report.source {
                out.add(self.field("Source:", source), 1);
            }
        }
        if let Some(error) = &report.error {
            out.add(self.field("Error:", self.opts.palette.paint(RED, error)), 1);
        }
        for tenant in &report.tenants {
            out.extend_nested(self.tenant(tenant), 1);
        }
        for job in report.jobs.values() {
            out.extend_nested(self.job(job), 1);
        }
        let jobs_queried = !report.jobs.is_empty()
            || (report.tenants.is_empty() && self.opts.query != QueryType::None);
        if jobs_queried {
            out.add(self.field("Total jobs found in query:", report.total_jobs()), 1);
        }
        out
    }
}

/// Render reports as indented text, grouped by environment.
pub fn render_text(reports: &[SystemReport], opts: TextOptions) -> String {
    let printer = Printer { opts };
    let mut out = IndentedTextBuilder::default();
    let mut current_env: Option<&str> = None;
    for report in reports {
        if current_env != Some(report.environment.as_str()) {
            out.add(printer.field("Environment:", opts.palette.name(&report.environment)), 0);
            current_env = Some(&report.environment);
        }
        out.extend_nested(printer.report(report), 1);
    }
    out.build()
}

pub fn render_json(reports: &[SystemReport]) -> Result<String> {
    Ok(serde_json::to_string_pretty(reports)?)
}
