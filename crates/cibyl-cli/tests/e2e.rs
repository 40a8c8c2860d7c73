//! Runs the `cibyl` binary against mocked Jenkins and Zuul servers.
#![allow(deprecated)]
use assert_cmd::Command;
use mockito::{Matcher, Server, ServerGuard};
use predicates::prelude::*;
use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::TempDir;

struct Env {
    dir: TempDir,
    config: PathBuf,
}

fn env(config: &str) -> Env {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cibyl.yaml");
    std::fs::write(&path, config).unwrap();
    Env { dir, config: path }
}

fn cibyl(env: &Env) -> Command {
    let mut cmd = Command::cargo_bin("cibyl").unwrap();
    cmd.current_dir(env.dir.path())
        .env("HOME", env.dir.path())
        .env("CIBYL_CONFIG", &env.config)
        .env_remove("RUST_LOG");
    cmd
}

fn jenkins_config(jenkins_url: &str, xml_path: &str) -> String {
    format!(
        r#"
environments:
  production:
    jenkins:
      system_type: jenkins
      sources:
        jenkins_api:
          driver: jenkins
          url: {jenkins_url}
          username: ci
          token: secret
        jjb:
          driver: jenkins_job_builder
          xml_path: {xml_path}
"#
    )
}

fn jobs_listing() -> String {
    json!({"jobs": [
        {"_class": "org.jenkinsci.plugins.workflow.job.WorkflowJob", "name": "ansible",
         "url": "http://jenkins/job/ansible/",
         "lastBuild": {"number": 7, "result": "FAILURE", "duration": 120000, "timestamp": 1651658400000u64}},
        {"_class": "hudson.model.FreeStyleProject", "name": "tempest", "url": "http://jenkins/job/tempest/",
         "lastBuild": null},
        {"_class": "com.cloudbees.hudson.plugins.folder.Folder", "name": "team"}
    ]})
    .to_string()
}

// ---------------------------------------------------------------------------
// Jenkins
// ---------------------------------------------------------------------------

#[test]
fn jenkins_last_build_uses_one_request() {
    let mut server = Server::new();
    let listing = server
        .mock("GET", "/api/json")
        .match_query(Matcher::Regex("lastBuild".into()))
        .match_header("authorization", Matcher::Regex("^Basic ".into()))
        .with_body(jobs_listing())
        .expect(1)
        .create();

    let env = env(&jenkins_config(&server.url(), "/nonexistent"));
    let output = cibyl(&env)
        .args(["-f", "json", "query", "--last-build"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    listing.assert();

    let reports: Value = serde_json::from_slice(&output.stdout).unwrap();
    let report = &reports[0];
    assert_eq!(report["source"], "jenkins_api");
    let jobs = report["jobs"].as_object().unwrap();
    assert_eq!(jobs.len(), 2);
    let builds = jobs["ansible"]["builds"].as_array().unwrap();
    assert_eq!(builds.len(), 1);
    assert_eq!(builds[0]["build_id"], "7");
    assert_eq!(builds[0]["duration_ms"], 120000);
    assert!(jobs["tempest"].get("builds").is_none());
}

#[test]
fn jenkins_tests_of_newest_build() {
    let mut server = Server::new();
    server
        .mock("GET", "/api/json")
        .match_query(Matcher::Any)
        .with_body(jobs_listing())
        .create();
    server
        .mock("GET", "/job/ansible/api/json")
        .match_query(Matcher::Any)
        .with_body(json!({"allBuilds": [{"number": 7, "result": "FAILURE"}, {"number": 6, "result": "SUCCESS"}]}).to_string())
        .create();
    server
        .mock("GET", "/job/ansible/7/testReport/api/json")
        .match_query(Matcher::Any)
        .with_body(
            json!({"suites": [{"cases": [
                {"className": "tempest.api.compute", "name": "test_boot", "duration": 30, "status": "PASSED"},
                {"className": "tempest.api.network", "name": "test_ports", "duration": 3, "status": "FAILED"}
            ]}]})
            .to_string(),
        )
        .create();

    let env = env(&jenkins_config(&server.url(), "/nonexistent"));
    cibyl(&env)
        .args(["-f", "text", "-v", "query", "--jobs", "ansible", "--test-result", "failed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Job: ansible"))
        .stdout(predicate::str::contains("Build: 7"))
        .stdout(predicate::str::contains("Test: test_ports"))
        .stdout(predicate::str::contains("Class name: tempest.api.network"))
        .stdout(predicate::str::contains("Duration: 0.0500min"))
        .stdout(predicate::str::contains("test_boot").not())
        .stdout(predicate::str::contains("Build: 6").not());
}

#[test]
fn jenkins_deployment_from_job_names() {
    let mut server = Server::new();
    server
        .mock("GET", "/api/json")
        .match_query(Matcher::Any)
        .with_body(
            json!({"jobs": [
                {"_class": "job", "name": "DFG_compute_17.1_director_ipv6_3cont_2comp", "url": "u1"},
                {"_class": "job", "name": "DFG_network_16.2_director_ipv4_1cont_1comp", "url": "u2"}
            ]})
            .to_string(),
        )
        .create();

    // A missing XML directory fails the preferred source; the REST API answers.
    let env = env(&jenkins_config(&server.url(), "/nonexistent"));
    cibyl(&env)
        .args(["-f", "text", "-v", "query", "--release", "17", "--topology"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Source: jenkins_api"))
        .stdout(predicate::str::contains("Release: 17.1"))
        .stdout(predicate::str::contains("Topology: compute:2,controller:3"))
        .stdout(predicate::str::contains("16.2").not())
        .stdout(predicate::str::contains("Total jobs found in query: 1"));
}

#[test]
fn jenkins_builds_narrowed_by_release_and_controllers() {
    let mut server = Server::new();
    server
        .mock("GET", "/api/json")
        .match_query(Matcher::Any)
        .with_body(
            json!({"jobs": [
                {"_class": "job", "name": "test_17.3_ipv4_job_2comp_1cont", "url": "u1"},
                {"_class": "job", "name": "test_16_ipv6_job_1comp_2cont", "url": "u2"}
            ]})
            .to_string(),
        )
        .create();
    server
        .mock("GET", "/job/test_17.3_ipv4_job_2comp_1cont/api/json")
        .match_query(Matcher::Any)
        .with_body(json!({"allBuilds": [{"number": 12, "result": "SUCCESS"}]}).to_string())
        .create();

    let env = env(&jenkins_config(&server.url(), "/nonexistent"));
    cibyl(&env)
        .args(["-f", "text", "query", "--builds", "--release", "17", "--controllers", "<2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Job: test_17.3_ipv4_job_2comp_1cont"))
        .stdout(predicate::str::contains("Build: 12"))
        .stdout(predicate::str::contains("test_16").not());
}

#[test]
fn failing_system_exits_with_error() {
    let mut server = Server::new();
    server
        .mock("GET", "/api/json")
        .match_query(Matcher::Any)
        .with_status(503)
        .create();

    let env = env(&jenkins_config(&server.url(), "/nonexistent"));
    cibyl(&env)
        .args(["-f", "text", "query", "--jobs"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Error: source 'jenkins_api' of system 'jenkins' failed"))
        .stderr(predicate::str::contains("error: every queried system failed"));
}

// ---------------------------------------------------------------------------
// Zuul
// ---------------------------------------------------------------------------

fn zuul_server() -> ServerGuard {
    let mut server = Server::new();
    server
        .mock("GET", "/api/tenants")
        .with_body(json!([{"name": "openstack"}, {"name": "sandbox"}]).to_string())
        .create();
    server
        .mock("GET", "/api/tenant/openstack/jobs")
        .with_body(json!([{"name": "tripleo-ci-centos-9-standalone"}, {"name": "nova-tox-py39"}]).to_string())
        .create();
    server
        .mock("GET", "/api/tenant/openstack/projects")
        .with_body(json!([{"name": "openstack/nova"}]).to_string())
        .create();
    server
        .mock("GET", "/api/tenant/openstack/project/openstack/nova")
        .with_body(
            json!({"configs": [{"pipelines": [
                {"name": "check", "jobs": [[{"name": "nova-tox-py39"}]]},
                {"name": "gate", "jobs": [[{"name": "nova-tox-py39"}]]}
            ]}]})
            .to_string(),
        )
        .create();
    server
        .mock("GET", "/api/tenant/openstack/builds")
        .match_query(Matcher::UrlEncoded("job_name".into(), "nova-tox-py39".into()))
        .with_body(
            json!([
                {"uuid": "9f1c", "job_name": "nova-tox-py39", "result": "SUCCESS", "duration": 300,
                 "start_time": "2022-05-04T10:00:00", "project": "openstack/nova", "pipeline": "gate"},
                {"uuid": "4b2a", "job_name": "nova-tox-py39", "result": "FAILURE", "duration": 120,
                 "project": "openstack/nova", "pipeline": "check"}
            ])
            .to_string(),
        )
        .create();
    server
        .mock("GET", "/api/tenant/openstack/job/tripleo-ci-centos-9-standalone")
        .with_body(
            json!([{"name": "tripleo-ci-centos-9-standalone", "parent": "tripleo-ci-base",
                    "branches": ["master"], "variables": {"featureset": "052"}}])
            .to_string(),
        )
        .create();
    server
        .mock("GET", "/api/tenant/openstack/job/tripleo-ci-base")
        .with_body(json!([{"name": "tripleo-ci-base", "variables": {"release": "master"}}]).to_string())
        .create();
    server
}

fn zuul_config(url: &str) -> String {
    format!(
        r#"
environments:
  upstream:
    zuul:
      system_type: zuul
      sources:
        zuul_api:
          driver: zuul
          url: {url}
          tenants: ["^openstack$"]
"#
    )
}

#[test]
fn zuul_builds_in_pipeline() {
    let server = zuul_server();
    let env = env(&zuul_config(&server.url()));
    cibyl(&env)
        .args(["-f", "text", "-v", "query", "--jobs", "nova", "--builds", "--pipelines", "gate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tenant: openstack"))
        .stdout(predicate::str::contains("sandbox").not())
        .stdout(predicate::str::contains("Project: openstack/nova"))
        .stdout(predicate::str::contains("Pipeline: gate"))
        .stdout(predicate::str::contains("Pipeline: check").not())
        .stdout(predicate::str::contains("tripleo").not())
        .stdout(predicate::str::contains("Job: nova-tox-py39"))
        .stdout(predicate::str::contains("Build: 9f1c"))
        .stdout(predicate::str::contains("Duration: 5.0000min"))
        .stdout(predicate::str::contains("Started: 2022-05-04 10:00:00 UTC"))
        .stdout(predicate::str::contains("Build: 4b2a").not());
}

#[test]
fn zuul_variants_inherit_variables() {
    let server = zuul_server();
    let env = env(&zuul_config(&server.url()));
    let output = cibyl(&env)
        .args(["-f", "json", "query", "--jobs", "tripleo", "--variants"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let reports: Value = serde_json::from_slice(&output.stdout).unwrap();
    let tenant = &reports[0]["tenants"][0];
    assert_eq!(tenant["name"], "openstack");
    let variant = &tenant["jobs"]["tripleo-ci-centos-9-standalone"]["variants"][0];
    assert_eq!(variant["parent"], "tripleo-ci-base");
    assert_eq!(variant["variables"]["featureset"], "052");
    assert_eq!(variant["variables"]["release"], "master");
}

#[test]
fn zuul_deployment_release() {
    let server = zuul_server();
    let env = env(&zuul_config(&server.url()));
    cibyl(&env)
        .args(["-f", "text", "query", "--jobs", "tripleo", "--release"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Job: tripleo-ci-centos-9-standalone"))
        .stdout(predicate::str::contains("Release: master"));
}

#[test]
fn zuul_alone_cannot_answer_tests() {
    let server = zuul_server();
    let env = env(&zuul_config(&server.url()));
    cibyl(&env)
        .args(["query", "--tests"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no enabled source of system 'zuul'"));
}

#[test]
fn tests_query_over_jenkins_and_zuul() {
    let zuul = zuul_server();
    let mut jenkins = Server::new();
    jenkins
        .mock("GET", "/api/json")
        .match_query(Matcher::Any)
        .with_body(jobs_listing())
        .create();
    jenkins
        .mock("GET", "/job/ansible/api/json")
        .match_query(Matcher::Any)
        .with_body(json!({"allBuilds": [{"number": 7, "result": "FAILURE"}]}).to_string())
        .create();
    jenkins
        .mock("GET", "/job/ansible/7/testReport/api/json")
        .match_query(Matcher::Any)
        .with_body(
            json!({"suites": [{"cases": [
                {"className": "tempest.api.network", "name": "test_ports", "duration": 3, "status": "FAILED"}
            ]}]})
            .to_string(),
        )
        .create();

    let config = format!(
        r#"
environments:
  production:
    jenkins:
      system_type: jenkins
      sources:
        jenkins_api:
          driver: jenkins
          url: {}
    zuul:
      system_type: zuul
      sources:
        zuul_api:
          driver: zuul
          url: {}
"#,
        jenkins.url(),
        zuul.url()
    );
    let env = env(&config);
    cibyl(&env)
        .args(["-f", "text", "query", "--jobs", "ansible", "--tests"])
        .assert()
        .success()
        .stdout(predicate::str::contains("System: jenkins"))
        .stdout(predicate::str::contains("Test: test_ports"))
        .stdout(predicate::str::contains("System: zuul"))
        .stdout(predicate::str::contains("no enabled source of system 'zuul' can answer this query"));
}
