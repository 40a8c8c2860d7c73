use crate::error::{CibylError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

// ---------------------------------------------------------------------------
// Search paths
// ---------------------------------------------------------------------------

pub const LOCAL_CONFIG: &str = ".cibyl/cibyl.yaml";
pub const USER_CONFIG: &str = ".config/cibyl/cibyl.yaml";
pub const SYSTEM_CONFIG: &str = "/etc/cibyl/cibyl.yaml";

/// Locations searched when no explicit config is given, highest priority first.
pub fn default_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
    if let Some(home) = home::home_dir() {
        paths.push(home.join(USER_CONFIG));
    }
    paths.push(PathBuf::from(SYSTEM_CONFIG));
    paths
}

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// SystemType / Driver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemType {
    Jenkins,
    Zuul,
}

impl SystemType {
    pub fn as_str(self) -> &'static str {
        match self {
            SystemType::Jenkins => "jenkins",
            SystemType::Zuul => "zuul",
        }
    }
}

impl fmt::Display for SystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Driver {
    Jenkins,
    JenkinsJobBuilder,
    Zuul,
}

impl Driver {
    pub fn as_str(self) -> &'static str {
        match self {
            Driver::Jenkins => "jenkins",
            Driver::JenkinsJobBuilder => "jenkins_job_builder",
            Driver::Zuul => "zuul",
        }
    }

    /// Whether a source using this driver can read a system of `system_type`.
    pub fn serves(self, system_type: SystemType) -> bool {
        matches!(
            (self, system_type),
            (Driver::Jenkins | Driver::JenkinsJobBuilder, SystemType::Jenkins)
                | (Driver::Zuul, SystemType::Zuul)
        )
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SourceConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceConfig {
    pub name: String,
    pub driver: Driver,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xml_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tenants: Vec<String>,
}

impl SourceConfig {
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

// ---------------------------------------------------------------------------
// System / Environment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct System {
    pub name: String,
    pub system_type: SystemType,
    pub enabled: bool,
    pub sources: Vec<SourceConfig>,
}

impl System {
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Environment {
    pub name: String,
    pub systems: Vec<System>,
}

// ---------------------------------------------------------------------------
// Raw YAML shape
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    environments: serde_yaml::Mapping,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSystem {
    system_type: SystemType,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    sources: serde_yaml::Mapping,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSource {
    driver: Driver,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    cert: Option<PathBuf>,
    #[serde(default)]
    timeout_secs: Option<u64>,
    #[serde(default)]
    xml_path: Option<PathBuf>,
    #[serde(default)]
    tenants: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

fn key_name(key: &serde_yaml::Value, what: &str) -> Result<String> {
    match key {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        other => Err(CibylError::InvalidConfig(format!(
            "{what} name must be a string, got {other:?}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub environments: Vec<Environment>,
}

impl Config {
    /// Parse a YAML document. Environment and system order follows the document.
    pub fn from_yaml(data: &str) -> Result<Self> {
        let raw: RawConfig = serde_yaml::from_str(data)
            .map_err(|e| CibylError::InvalidConfig(format!("not a cibyl configuration: {e}")))?;
        let mut environments = Vec::new();

        for (env_key, env_value) in raw.environments {
            let env_name = key_name(&env_key, "environment")?;
            let systems_map = match env_value {
                serde_yaml::Value::Mapping(m) => m,
                serde_yaml::Value::Null => serde_yaml::Mapping::new(),
                _ => {
                    return Err(CibylError::InvalidConfig(format!(
                        "environment '{env_name}' must map system names to systems"
                    )))
                }
            };

            let mut systems = Vec::new();
            for (sys_key, sys_value) in systems_map {
                let sys_name = key_name(&sys_key, "system")?;
                let raw_sys: RawSystem = serde_yaml::from_value(sys_value).map_err(|e| {
                    CibylError::InvalidConfig(format!("system '{env_name}.{sys_name}': {e}"))
                })?;
                let sources = parse_sources(&env_name, &sys_name, raw_sys.sources)?;
                systems.push(System {
                    name: sys_name,
                    system_type: raw_sys.system_type,
                    enabled: raw_sys.enabled,
                    sources,
                });
            }

            environments.push(Environment {
                name: env_name,
                systems,
            });
        }

        Ok(Config { environments })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_yaml(&data)
    }

    /// Download and parse a configuration published over HTTP(S).
    pub fn load_remote(url: &str) -> Result<Self> {
        let download_err = |e: reqwest::Error| CibylError::ConfigDownload {
            url: url.to_string(),
            message: e.to_string(),
        };
        let body = reqwest::blocking::get(url)
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(download_err)?;
        Self::from_yaml(&body)
    }

    /// Resolve and load the configuration.
    ///
    /// `explicit` (the `--config` flag or `CIBYL_CONFIG`) may be a path or an
    /// `http(s)://` URL; otherwise [`default_paths`] are tried in order.
    /// Returns the config together with the location it was read from.
    pub fn discover(explicit: Option<&str>) -> Result<(Self, String)> {
        if let Some(location) = explicit {
            if location.starts_with("http://") || location.starts_with("https://") {
                debug!("downloading configuration from {location}");
                return Ok((Self::load_remote(location)?, location.to_string()));
            }
            let path = Path::new(location);
            if !path.is_file() {
                return Err(CibylError::ConfigNotFound(vec![location.to_string()]));
            }
            return Ok((Self::load(path)?, location.to_string()));
        }

        let candidates = default_paths();
        for path in &candidates {
            if path.is_file() {
                debug!("using configuration at {}", path.display());
                return Ok((Self::load(path)?, path.display().to_string()));
            }
        }
        Err(CibylError::ConfigNotFound(
            candidates.iter().map(|p| p.display().to_string()).collect(),
        ))
    }

    /// Human-readable outline of environments, systems and their sources.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for env in &self.environments {
            out.push_str(&format!("Environment: {}\n", env.name));
            for system in &env.systems {
                let state = if system.enabled { "" } else { " (disabled)" };
                out.push_str(&format!(
                    "  System: {} [{}]{state}\n",
                    system.name, system.system_type
                ));
                for source in &system.sources {
                    let state = if source.enabled { "" } else { " (disabled)" };
                    out.push_str(&format!(
                        "    Source: {} [{}]{state}\n",
                        source.name, source.driver
                    ));
                }
            }
        }
        out
    }

    pub fn system_names(&self) -> Vec<String> {
        self.environments
            .iter()
            .flat_map(|e| e.systems.iter().map(|s| s.name.clone()))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.environments.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "no environments defined".to_string(),
            });
        }

        let mut seen_systems: Vec<&str> = Vec::new();
        for env in &self.environments {
            if env.systems.is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("environment '{}' has no systems", env.name),
                });
            }

            for system in &env.systems {
                if seen_systems.contains(&system.name.as_str()) {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Warning,
                        message: format!(
                            "system name '{}' is used more than once; --systems will select all of them",
                            system.name
                        ),
                    });
                }
                seen_systems.push(&system.name);

                if system.sources.is_empty() {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Error,
                        message: format!(
                            "system '{}.{}' has no sources",
                            env.name, system.name
                        ),
                    });
                }

                for source in &system.sources {
                    warnings.extend(validate_source(&env.name, system, source));
                }
            }
        }

        warnings
    }
}

fn parse_sources(
    env_name: &str,
    sys_name: &str,
    sources: serde_yaml::Mapping,
) -> Result<Vec<SourceConfig>> {
    let mut parsed = Vec::new();
    for (src_key, src_value) in sources {
        let src_name = key_name(&src_key, "source")?;
        let raw: RawSource = serde_yaml::from_value(src_value).map_err(|e| {
            CibylError::InvalidConfig(format!(
                "source '{env_name}.{sys_name}.{src_name}': {e}"
            ))
        })?;

        let missing = match raw.driver {
            Driver::Jenkins | Driver::Zuul if raw.url.is_none() => Some("url"),
            Driver::JenkinsJobBuilder if raw.xml_path.is_none() => Some("xml_path"),
            _ => None,
        };
        if let Some(field) = missing {
            return Err(CibylError::InvalidConfig(format!(
                "source '{env_name}.{sys_name}.{src_name}' ({}) requires '{field}'",
                raw.driver
            )));
        }

        parsed.push(SourceConfig {
            name: src_name,
            driver: raw.driver,
            enabled: raw.enabled,
            url: raw.url,
            username: raw.username,
            token: raw.token,
            cert: raw.cert,
            timeout_secs: raw.timeout_secs,
            xml_path: raw.xml_path,
            tenants: raw.tenants,
        });
    }
    Ok(parsed)
}

fn validate_source(env_name: &str, system: &System, source: &SourceConfig) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();
    let label = format!("{}.{}.{}", env_name, system.name, source.name);

    if !source.driver.serves(system.system_type) {
        warnings.push(ConfigWarning {
            level: WarnLevel::Error,
            message: format!(
                "source '{label}' uses driver '{}' which cannot read a {} system",
                source.driver, system.system_type
            ),
        });
    }

    if !source.enabled {
        warnings.push(ConfigWarning {
            level: WarnLevel::Warning,
            message: format!("source '{label}' is disabled"),
        });
    }

    if source.driver == Driver::Jenkins && (source.username.is_none() || source.token.is_none()) {
        warnings.push(ConfigWarning {
            level: WarnLevel::Warning,
            message: format!("source '{label}' has no username/token; requests will be anonymous"),
        });
    }

    if let Some(cert) = &source.cert {
        if !cert.is_file() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!("certificate '{}' for source '{label}' does not exist", cert.display()),
            });
        }
    }

    if let Some(xml_path) = &source.xml_path {
        if !xml_path.is_dir() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!("xml_path '{}' for source '{label}' is not a directory", xml_path.display()),
            });
        }
    }

    warnings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
environments:
  production:
    jenkins_prod:
      system_type: jenkins
      sources:
        jenkins_api:
          driver: jenkins
          url: https://jenkins.example.com
          username: bot
          token: secret
        jjb:
          driver: jenkins_job_builder
          xml_path: /srv/jjb
          enabled: false
  staging:
    zuul_ci:
      system_type: zuul
      enabled: false
      sources:
        zuul_api:
          driver: zuul
          url: https://zuul.example.com
          tenants: [openstack]
"#;

    #[test]
    fn parses_environments_in_document_order() {
        let cfg = Config::from_yaml(SAMPLE).unwrap();
        let names: Vec<_> = cfg.environments.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["production", "staging"]);

        let jenkins = &cfg.environments[0].systems[0];
        assert_eq!(jenkins.name, "jenkins_prod");
        assert_eq!(jenkins.system_type, SystemType::Jenkins);
        assert!(jenkins.enabled);
        assert_eq!(jenkins.sources.len(), 2);
        assert_eq!(jenkins.sources[0].driver, Driver::Jenkins);
        assert!(!jenkins.sources[1].enabled);

        let zuul = &cfg.environments[1].systems[0];
        assert!(!zuul.enabled);
        assert_eq!(zuul.sources[0].tenants, ["openstack"]);
    }

    #[test]
    fn summary_lists_every_level() {
        let cfg = Config::from_yaml(SAMPLE).unwrap();
        let summary = cfg.summary();
        assert!(summary.contains("Environment: production\n"));
        assert!(summary.contains("  System: jenkins_prod [jenkins]\n"));
        assert!(summary.contains("    Source: jjb [jenkins_job_builder] (disabled)\n"));
        assert!(summary.contains("  System: zuul_ci [zuul] (disabled)\n"));
    }

    #[test]
    fn missing_url_is_rejected() {
        let yaml = "environments:\n  env:\n    sys:\n      system_type: jenkins\n      sources:\n        api:\n          driver: jenkins\n";
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("requires 'url'"), "{err}");
    }

    #[test]
    fn malformed_yaml_is_invalid_config() {
        let err = Config::from_yaml("environments: [unclosed").unwrap_err();
        assert!(matches!(err, CibylError::InvalidConfig(_)), "{err:?}");

        let err = Config::from_yaml("environments: 3\n").unwrap_err();
        assert!(err.to_string().starts_with("invalid configuration: not a cibyl configuration"), "{err}");
    }

    #[test]
    fn unknown_system_type_is_rejected() {
        let yaml = "environments:\n  env:\n    sys:\n      system_type: gitlab\n";
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, CibylError::InvalidConfig(_)));
        assert!(err.to_string().contains("env.sys"));
    }

    #[test]
    fn token_is_not_serialized() {
        let cfg = Config::from_yaml(SAMPLE).unwrap();
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("jenkins_api"));
    }

    #[test]
    fn discover_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cibyl.yaml");
        std::fs::write(&path, SAMPLE).unwrap();
        let (cfg, location) = Config::discover(path.to_str()).unwrap();
        assert_eq!(cfg.environments.len(), 2);
        assert_eq!(location, path.display().to_string());
    }

    #[test]
    fn discover_missing_explicit_path_fails() {
        let err = Config::discover(Some("/nonexistent/cibyl.yaml")).unwrap_err();
        assert!(matches!(err, CibylError::ConfigNotFound(_)));
    }

    #[test]
    fn discover_remote_config() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/cibyl.yaml")
            .with_status(200)
            .with_body(SAMPLE)
            .create();
        let url = format!("{}/cibyl.yaml", server.url());
        let (cfg, location) = Config::discover(Some(&url)).unwrap();
        mock.assert();
        assert_eq!(location, url);
        assert_eq!(cfg.system_names(), ["jenkins_prod", "zuul_ci"]);
    }

    #[test]
    fn remote_config_http_error() {
        let mut server = mockito::Server::new();
        server.mock("GET", "/missing.yaml").with_status(404).create();
        let url = format!("{}/missing.yaml", server.url());
        let err = Config::discover(Some(&url)).unwrap_err();
        assert!(matches!(err, CibylError::ConfigDownload { .. }));
    }

    #[test]
    fn validate_flags_driver_mismatch_and_disabled() {
        let yaml = r#"
environments:
  env:
    zuul_sys:
      system_type: zuul
      sources:
        wrong:
          driver: jenkins
          url: http://x
          username: u
          token: t
          enabled: false
"#;
        let cfg = Config::from_yaml(yaml).unwrap();
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("cannot read a zuul system")));
        assert!(warnings.iter().any(|w| w.message.contains("is disabled")));
    }

    #[test]
    fn validate_system_without_sources() {
        let yaml = "environments:\n  env:\n    sys:\n      system_type: jenkins\n";
        let cfg = Config::from_yaml(yaml).unwrap();
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("has no sources")));
    }

    #[test]
    fn validate_anonymous_jenkins_warning() {
        let yaml = "environments:\n  env:\n    sys:\n      system_type: jenkins\n      sources:\n        api:\n          driver: jenkins\n          url: http://x\n";
        let cfg = Config::from_yaml(yaml).unwrap();
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("anonymous"));
    }

    #[test]
    fn driver_serves_matching_system_types() {
        assert!(Driver::Jenkins.serves(SystemType::Jenkins));
        assert!(Driver::JenkinsJobBuilder.serves(SystemType::Jenkins));
        assert!(Driver::Zuul.serves(SystemType::Zuul));
        assert!(!Driver::Zuul.serves(SystemType::Jenkins));
    }
}
