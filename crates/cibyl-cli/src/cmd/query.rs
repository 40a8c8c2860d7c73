use crate::cmd::load_config;
use crate::Ctx;
use cibyl_core::orchestrator::Orchestrator;
use cibyl_core::output::{render_json, render_text, OutputFormat, Palette, TextOptions};
use cibyl_core::query::QueryArgs;
use clap::Args;

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// Filters taking a list accept zero or more values; given without values
/// they only ask for that level of detail.
#[derive(Args, Debug)]
pub struct QueryOpts {
    /// Environments to query
    #[arg(long, num_args = 0.., value_name = "NAME")]
    envs: Option<Vec<String>>,

    /// Systems to query (enabled even when the configuration disables them)
    #[arg(long, num_args = 0.., value_name = "NAME")]
    systems: Option<Vec<String>>,

    /// Only query systems of these types (jenkins, zuul)
    #[arg(long, num_args = 0.., value_name = "TYPE")]
    system_type: Option<Vec<String>>,

    /// Only use these sources
    #[arg(long, num_args = 0.., value_name = "NAME")]
    sources: Option<Vec<String>>,

    // Jobs / builds / tests
    /// Job name patterns
    #[arg(long, num_args = 0.., value_name = "PATTERN")]
    jobs: Option<Vec<String>>,

    /// Job URL patterns
    #[arg(long, num_args = 0.., value_name = "PATTERN")]
    job_url: Option<Vec<String>>,

    /// Build ids
    #[arg(long, num_args = 0.., value_name = "ID")]
    builds: Option<Vec<String>>,

    /// Build results (SUCCESS, FAILURE, ...)
    #[arg(long, num_args = 0.., value_name = "STATUS")]
    build_status: Option<Vec<String>>,

    /// Only the last build of each job
    #[arg(long)]
    last_build: bool,

    /// Test name patterns
    #[arg(long, num_args = 0.., value_name = "PATTERN")]
    tests: Option<Vec<String>>,

    /// Test results (PASSED, FAILED, SKIPPED, ...)
    #[arg(long, num_args = 0.., value_name = "RESULT")]
    test_result: Option<Vec<String>>,

    /// Test class name patterns
    #[arg(long, num_args = 0.., value_name = "PATTERN")]
    test_class: Option<Vec<String>>,

    /// Pipeline stages of each build
    #[arg(long)]
    stages: bool,

    // Zuul hierarchy
    /// Tenant name patterns
    #[arg(long, num_args = 0.., value_name = "PATTERN")]
    tenants: Option<Vec<String>>,

    /// Project name patterns
    #[arg(long, num_args = 0.., value_name = "PATTERN")]
    projects: Option<Vec<String>>,

    /// Pipeline name patterns
    #[arg(long, num_args = 0.., value_name = "PATTERN")]
    pipelines: Option<Vec<String>>,

    /// Job variants and their variables
    #[arg(long)]
    variants: bool,

    // Deployment
    /// OpenStack releases
    #[arg(long, num_args = 0.., value_name = "VERSION")]
    release: Option<Vec<String>>,

    /// Deployment topology (e.g. compute:2,controller:3)
    #[arg(long, num_args = 0.., value_name = "TOPOLOGY")]
    topology: Option<Vec<String>>,

    /// IP version (4 or 6)
    #[arg(long, num_args = 0.., value_name = "VERSION")]
    ip_version: Option<Vec<String>>,

    /// Cinder backend (ceph, lvm, ...)
    #[arg(long, num_args = 0.., value_name = "BACKEND")]
    cinder_backend: Option<Vec<String>>,

    /// Infrastructure type (ovb, baremetal, virt)
    #[arg(long, num_args = 0.., value_name = "TYPE")]
    infra_type: Option<Vec<String>>,

    /// Network backend (geneve, vxlan, ...)
    #[arg(long, num_args = 0.., value_name = "BACKEND")]
    network_backend: Option<Vec<String>>,

    /// Storage backend (swift, lvm, ...)
    #[arg(long, num_args = 0.., value_name = "BACKEND")]
    storage_backend: Option<Vec<String>>,

    /// Whether DVR is used (True, False)
    #[arg(long, num_args = 0.., value_name = "BOOL")]
    dvr: Option<Vec<String>>,

    /// Whether TLS is used everywhere (True, False)
    #[arg(long, num_args = 0.., value_name = "BOOL")]
    tls_everywhere: Option<Vec<String>>,

    /// Number of controllers, as ranges such as "<2" or ">=3"
    #[arg(long, num_args = 0.., value_name = "RANGE")]
    controllers: Option<Vec<String>>,

    /// Number of computes, as ranges such as "<2" or ">=3"
    #[arg(long, num_args = 0.., value_name = "RANGE")]
    computes: Option<Vec<String>>,

    /// Print every deployment field, known or not
    #[arg(long)]
    spec: bool,
}

impl From<QueryOpts> for QueryArgs {
    fn from(opts: QueryOpts) -> Self {
        QueryArgs {
            env_name: opts.envs,
            systems: opts.systems,
            system_type: opts.system_type,
            sources: opts.sources,
            jobs: opts.jobs,
            job_url: opts.job_url,
            builds: opts.builds,
            build_status: opts.build_status,
            last_build: opts.last_build,
            tests: opts.tests,
            test_result: opts.test_result,
            test_class: opts.test_class,
            stages: opts.stages,
            tenants: opts.tenants,
            projects: opts.projects,
            pipelines: opts.pipelines,
            variants: opts.variants,
            release: opts.release,
            topology: opts.topology,
            ip_version: opts.ip_version,
            cinder_backend: opts.cinder_backend,
            infra_type: opts.infra_type,
            network_backend: opts.network_backend,
            storage_backend: opts.storage_backend,
            dvr: opts.dvr,
            tls_everywhere: opts.tls_everywhere,
            controllers: opts.controllers,
            computes: opts.computes,
            spec: opts.spec,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(ctx: &Ctx, opts: QueryOpts) -> anyhow::Result<()> {
    let config = load_config(ctx.config.as_deref())?;
    let args = QueryArgs::from(opts);
    let query = args.query_type();

    let reports = Orchestrator::new(config).run_query(&args)?;

    match ctx.format {
        OutputFormat::Json => println!("{}", render_json(&reports)?),
        format => {
            let text = render_text(
                &reports,
                TextOptions {
                    verbosity: ctx.verbosity,
                    palette: Palette::for_format(format),
                    spec: args.spec,
                    query,
                },
            );
            println!("{text}");
        }
    }

    if !reports.is_empty() && reports.iter().all(|r| r.error.is_some()) {
        anyhow::bail!("every queried system failed");
    }
    Ok(())
}
