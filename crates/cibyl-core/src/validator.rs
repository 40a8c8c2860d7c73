//! Narrow the configured environments down to what the user asked for.

use crate::config::{Environment, System};
use crate::error::{CibylError, Result};
use crate::query::{has_values, QueryArgs};
use tracing::debug;

pub struct Validator<'a> {
    args: &'a QueryArgs,
}

impl<'a> Validator<'a> {
    pub fn new(args: &'a QueryArgs) -> Self {
        Self { args }
    }

    /// Keep only the environments and systems consistent with the user input.
    ///
    /// Systems named with `--systems` are enabled even when the configuration
    /// disables them; with `--sources`, unnamed sources are disabled.
    pub fn validate_environments(&self, environments: Vec<Environment>) -> Result<Vec<Environment>> {
        let env_names: Vec<String> = environments.iter().map(|e| e.name.clone()).collect();
        let system_names: Vec<String> = environments
            .iter()
            .flat_map(|e| e.systems.iter().map(|s| s.name.clone()))
            .collect();
        let source_names: Vec<String> = environments
            .iter()
            .flat_map(|e| e.systems.iter())
            .flat_map(|s| s.sources.iter().map(|src| src.name.clone()))
            .collect();

        if let Some(wanted) = &self.args.env_name {
            if let Some(name) = wanted.iter().find(|n| !env_names.contains(n)) {
                return Err(CibylError::InvalidEnvironment {
                    name: name.clone(),
                    known: env_names,
                });
            }
        }
        if let Some(wanted) = &self.args.systems {
            if let Some(name) = wanted.iter().find(|n| !system_names.contains(n)) {
                return Err(CibylError::InvalidSystem {
                    name: name.clone(),
                    known: system_names,
                });
            }
        }

        let envs = check_envs(
            environments,
            |env| self.consistent_environment(env),
            |system| self.consistent_system(system),
            "is not consistent with user input",
        );
        if envs.is_empty() {
            return Err(CibylError::NoValidSystem(system_names));
        }

        let mut envs = envs;
        self.override_enabled_systems(&mut envs);

        let envs = check_envs(envs, |_| true, |system| system.is_enabled(), "is disabled");
        if envs.is_empty() {
            return Err(CibylError::NoEnabledSystem);
        }

        let envs = check_envs(
            envs,
            |_| true,
            |system| self.system_has_valid_sources(system),
            "has no sources consistent with user input",
        );
        if envs.is_empty() {
            return Err(CibylError::NoValidSources(source_names));
        }

        Ok(envs)
    }

    fn consistent_environment(&self, env: &Environment) -> bool {
        match &self.args.env_name {
            Some(names) if !names.is_empty() => names.contains(&env.name),
            _ => true,
        }
    }

    fn consistent_system(&self, system: &System) -> bool {
        if let Some(types) = &self.args.system_type {
            if !types.is_empty() && !types.iter().any(|t| t == system.system_type.as_str()) {
                return false;
            }
        }
        if let Some(names) = &self.args.systems {
            if !names.is_empty() && !names.contains(&system.name) {
                return false;
            }
        }
        true
    }

    fn override_enabled_systems(&self, envs: &mut [Environment]) {
        if !has_values(&self.args.systems) {
            return;
        }
        let names = crate::query::values(&self.args.systems);
        for system in envs.iter_mut().flat_map(|e| e.systems.iter_mut()) {
            if names.contains(&system.name) {
                system.enable();
            }
        }
    }

    /// Disables the sources the user did not name; false when none is left.
    fn system_has_valid_sources(&self, system: &mut System) -> bool {
        let Some(wanted) = self.args.sources.as_ref().filter(|s| !s.is_empty()) else {
            return true;
        };
        let mut any_named = false;
        for source in &mut system.sources {
            if wanted.contains(&source.name) {
                any_named = true;
            } else {
                source.disable();
            }
        }
        any_named
    }
}

/// Apply one environment check and one system check, dropping environments
/// left without systems.
fn check_envs(
    environments: Vec<Environment>,
    env_check: impl Fn(&Environment) -> bool,
    mut system_check: impl FnMut(&mut System) -> bool,
    reason: &str,
) -> Vec<Environment> {
    let mut kept = Vec::new();
    for mut env in environments {
        if !env_check(&env) {
            debug!("environment {} {reason}", env.name);
            continue;
        }
        let systems = std::mem::take(&mut env.systems);
        for mut system in systems {
            if system_check(&mut system) {
                env.systems.push(system);
            } else {
                debug!("system {} {reason}", system.name);
            }
        }
        if !env.systems.is_empty() {
            kept.push(env);
        }
    }
    kept
}
