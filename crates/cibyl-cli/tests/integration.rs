#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const CONFIG: &str = r#"
environments:
  production:
    jenkins:
      system_type: jenkins
      sources:
        jjb:
          driver: jenkins_job_builder
          xml_path: XML_PATH
    staging_jenkins:
      system_type: jenkins
      enabled: false
      sources:
        jjb_staging:
          driver: jenkins_job_builder
          xml_path: XML_PATH
"#;

const JOB_XML: &str = r#"<flow-definition>
  <definition>
    <script>TOPOLOGY="controller:1,compute:2"
--network-protocol ipv4
--deployment-files virt
rhos-16-trunk-patches
</script>
  </definition>
</flow-definition>
"#;

/// A working directory with `.cibyl/cibyl.yaml` and a directory of job XML.
fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let xml = dir.path().join("xml");
    std::fs::create_dir_all(&xml).unwrap();
    std::fs::write(xml.join("periodic-16-virt.xml"), JOB_XML).unwrap();

    let config = CONFIG.replace("XML_PATH", &xml.display().to_string());
    std::fs::create_dir_all(dir.path().join(".cibyl")).unwrap();
    std::fs::write(dir.path().join(".cibyl/cibyl.yaml"), config).unwrap();
    dir
}

fn cibyl(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cibyl").unwrap();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env_remove("CIBYL_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

// ---------------------------------------------------------------------------
// cibyl --help / global flags
// ---------------------------------------------------------------------------

#[test]
fn help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    cibyl(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("query"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn unknown_output_format_is_rejected() {
    let dir = workspace();
    cibyl(&dir)
        .args(["-f", "yaml", "query"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown output format 'yaml'"));
}

#[test]
fn missing_config_lists_searched_paths() {
    let dir = TempDir::new().unwrap();
    cibyl(&dir)
        .arg("query")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: failed to load configuration"))
        .stderr(predicate::str::contains(".cibyl/cibyl.yaml"));
}

#[test]
fn explicit_config_must_exist() {
    let dir = TempDir::new().unwrap();
    cibyl(&dir)
        .args(["--config", "nowhere.yaml", "config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nowhere.yaml"));
}

// ---------------------------------------------------------------------------
// cibyl config
// ---------------------------------------------------------------------------

#[test]
fn config_show_prints_outline() {
    let dir = workspace();
    cibyl(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration: .cibyl/cibyl.yaml"))
        .stdout(predicate::str::contains("Environment: production"))
        .stdout(predicate::str::contains("  System: jenkins [jenkins]"))
        .stdout(predicate::str::contains("  System: staging_jenkins [jenkins] (disabled)"))
        .stdout(predicate::str::contains("    Source: jjb [jenkins_job_builder]"));
}

#[test]
fn config_show_json_uses_env_var() {
    let dir = workspace();
    let path = dir.path().join(".cibyl/cibyl.yaml");
    let output = cibyl(&dir)
        .env("CIBYL_CONFIG", &path)
        .args(["-f", "json", "config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["location"], path.display().to_string());
    assert_eq!(value["environments"][0]["name"], "production");
}

#[test]
fn config_validate_passes() {
    let dir = workspace();
    cibyl(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_validate_reports_errors() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.yaml");
    std::fs::write(
        &path,
        "environments:\n  env:\n    lonely:\n      system_type: zuul\n",
    )
    .unwrap();
    cibyl(&dir)
        .args(["--config", path.to_str().unwrap(), "config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("system 'env.lonely' has no sources"))
        .stderr(predicate::str::contains("config validation found errors"));
}

// ---------------------------------------------------------------------------
// cibyl query
// ---------------------------------------------------------------------------

#[test]
fn query_without_filters_lists_enabled_systems() {
    let dir = workspace();
    cibyl(&dir)
        .args(["-f", "text", "query"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Environment: production\n  System: jenkins"))
        .stdout(predicate::str::contains("staging_jenkins").not());
}

#[test]
fn query_systems_enables_disabled_system() {
    let dir = workspace();
    cibyl(&dir)
        .args(["-f", "text", "query", "--systems", "staging_jenkins"])
        .assert()
        .success()
        .stdout(predicate::str::contains("System: staging_jenkins"));
}

#[test]
fn query_unknown_environment_fails() {
    let dir = workspace();
    cibyl(&dir)
        .args(["query", "--envs", "qa"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("environment 'qa' not found in configuration; known: production"));
}

#[test]
fn query_jobs_from_job_builder() {
    let dir = workspace();
    cibyl(&dir)
        .args(["-f", "text", "query", "--jobs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("    Job: periodic-16-virt"))
        .stdout(predicate::str::contains("    Total jobs found in query: 1"));
}

#[test]
fn query_deployment_from_job_builder() {
    let dir = workspace();
    cibyl(&dir)
        .args(["-f", "text", "query", "--release", "--topology", "--infra-type", "virt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Openstack deployment:"))
        .stdout(predicate::str::contains("Release: 16"))
        .stdout(predicate::str::contains("Topology: compute:2,controller:1"))
        .stdout(predicate::str::contains("Infra type: virt"));
}

#[test]
fn query_deployment_filter_drops_jobs() {
    let dir = workspace();
    cibyl(&dir)
        .args(["-f", "text", "query", "--release", "17"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Job:").not())
        .stdout(predicate::str::contains("Total jobs found in query: 0"));
}

#[test]
fn query_builds_is_not_supported_by_job_builder() {
    let dir = workspace();
    cibyl(&dir)
        .args(["query", "--builds"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no enabled source of system 'jenkins' can answer this query"));
}

#[test]
fn debug_logs_go_to_log_file() {
    let dir = workspace();
    let log = dir.path().join("cibyl.log");
    cibyl(&dir)
        .args(["-d", "--log-file", log.to_str().unwrap(), "-f", "text", "query", "--jobs"])
        .assert()
        .success();
    let content = std::fs::read_to_string(&log).unwrap();
    assert!(content.contains("DEBUG"));
    assert!(content.contains("querying jobs on jenkins with source jjb"));
}
