use accessgate_core::{AccessgateConfig, Group, GroupSet, OperationPolicy, OperationRegistry};

use crate::cli::args::ValidateArgs;
use crate::exit_codes;

pub fn run(args: ValidateArgs) -> anyhow::Result<i32> {
    let registry = match OperationRegistry::from_file(&args.registry) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    for (name, policy) in registry.iter() {
        println!("{}", describe(name, policy));
    }

    if let Some(path) = &args.config {
        let config = match AccessgateConfig::from_file(path).and_then(AccessgateConfig::apply_env) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: {}", e);
                return Ok(exit_codes::CONFIG_ERROR);
            }
        };
        let missing = unmapped_groups(&registry, &config);
        if !missing.is_empty() {
            eprintln!(
                "error: groups used by the registry have no directory mapping: {}",
                join(&missing)
            );
            return Ok(exit_codes::CONFIG_ERROR);
        }
    }

    println!("{} operations OK", registry.len());
    Ok(exit_codes::SUCCESS)
}

fn join(groups: &GroupSet) -> String {
    format!(
        "[{}]",
        groups
            .iter()
            .map(Group::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    )
}

pub(crate) fn describe(name: &str, policy: &OperationPolicy) -> String {
    let mut parts = Vec::new();
    if let Some(required) = &policy.gate {
        parts.push(format!("gate {}", join(required.groups())));
    }
    if let Some(capability) = &policy.capability {
        parts.push(format!(
            "read {} write {}",
            join(&capability.read),
            join(&capability.write)
        ));
    }
    if parts.is_empty() {
        parts.push("unguarded".to_string());
    }
    format!("{}: {}", name, parts.join(", "))
}

/// Groups the registry relies on that the configured directory cannot answer.
pub(crate) fn unmapped_groups(registry: &OperationRegistry, config: &AccessgateConfig) -> GroupSet {
    let Some(directory) = &config.directory else {
        return GroupSet::new();
    };
    registry
        .iter()
        .flat_map(|(_, policy)| policy.groups())
        .filter(|group| !directory.groups.contains_key(group))
        .collect()
}
