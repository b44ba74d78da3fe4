//! Static analysis and validation of the parsed AST.
//!
//! Checks for duplicate names, malformed identifiers and labels, undefined
//! references, and missing required properties before a model is built.

use std::collections::HashSet;

use cellery_common::constants::{
    HTTP_METHODS, INSTANCE_NAME_PLACEHOLDER, MAX_NAME_LENGTH, MAX_PREFIX_LENGTH,
};
use cellery_common::error::{CelleryError, Result};
use cellery_common::types::ImageRef;

use super::ast::{CellFile, ComponentDecl, DependsDecl, EnvValueDecl};

/// Validates a parsed cell file for semantic correctness.
///
/// # Checks performed
///
/// 1. Component names are unique DNS-1123 labels.
/// 2. Every component declares an `image`.
/// 3. Label keys and values follow Kubernetes label syntax.
/// 4. Environment variable names are unique per component.
/// 5. `DEPENDS` and `host()` reference known components or cell aliases.
/// 6. API definitions use known HTTP methods and non-empty paths.
///
/// Scaling blocks and gateway contexts are checked later, by the scaling
/// translator and the gateway synthesizer.
///
/// # Errors
///
/// Returns [`CelleryError::Validation`] naming the offending component.
pub fn validate(file: &CellFile) -> Result<()> {
    tracing::info!(components = file.components.len(), "validating cell file");
    check_component_names(file)?;
    let names: HashSet<&str> = file.components.iter().map(|c| c.name.as_str()).collect();
    for comp in &file.components {
        check_image_required(comp)?;
        check_labels(comp)?;
        check_env(comp)?;
        check_dependencies(comp, &names)?;
        check_ingresses(comp)?;
    }
    Ok(())
}

fn check_component_names(file: &CellFile) -> Result<()> {
    let mut seen = HashSet::new();
    for comp in &file.components {
        if !is_dns_label(&comp.name) {
            return Err(CelleryError::validation(format!(
                "component name \"{}\" is not a valid DNS-1123 label",
                comp.name
            )));
        }
        if !seen.insert(&comp.name) {
            return Err(CelleryError::validation(format!(
                "duplicate component name: \"{}\"",
                comp.name
            )));
        }
    }
    Ok(())
}

fn check_image_required(comp: &ComponentDecl) -> Result<()> {
    match comp.image.as_deref() {
        Some(image) if !image.trim().is_empty() => Ok(()),
        _ => Err(CelleryError::validation(format!(
            "component \"{}\" has no image property",
            comp.name
        ))),
    }
}

fn check_labels(comp: &ComponentDecl) -> Result<()> {
    let mut seen = HashSet::new();
    for (key, value) in &comp.labels {
        if !is_label_key(key) {
            return Err(CelleryError::validation(format!(
                "component \"{}\" has malformed label key \"{key}\"",
                comp.name
            )));
        }
        if !value.is_empty() && !is_label_name(value) {
            return Err(CelleryError::validation(format!(
                "component \"{}\" has malformed value \"{value}\" for label \"{key}\"",
                comp.name
            )));
        }
        if !seen.insert(key) {
            return Err(CelleryError::validation(format!(
                "component \"{}\" declares label \"{key}\" twice",
                comp.name
            )));
        }
    }
    Ok(())
}

fn check_env(comp: &ComponentDecl) -> Result<()> {
    let mut seen = HashSet::new();
    for env in &comp.env {
        if env.name.is_empty() {
            return Err(CelleryError::validation(format!(
                "component \"{}\" has an environment variable with an empty name",
                comp.name
            )));
        }
        if !seen.insert(&env.name) {
            return Err(CelleryError::validation(format!(
                "component \"{}\" declares environment variable \"{}\" twice",
                comp.name, env.name
            )));
        }
    }
    Ok(())
}

fn check_dependencies(comp: &ComponentDecl, components: &HashSet<&str>) -> Result<()> {
    let mut aliases = HashSet::new();
    for dep in &comp.depends {
        match dep {
            DependsDecl::Component(target) => check_component_target(comp, target, components)?,
            DependsDecl::Cell { alias, image } => {
                if alias == INSTANCE_NAME_PLACEHOLDER {
                    return Err(CelleryError::validation(format!(
                        "component \"{}\" uses reserved dependency alias \"{alias}\"",
                        comp.name
                    )));
                }
                if components.contains(alias.as_str()) {
                    return Err(CelleryError::validation(format!(
                        "component \"{}\": cell dependency alias \"{alias}\" shadows a component",
                        comp.name
                    )));
                }
                if !aliases.insert(alias.as_str()) {
                    return Err(CelleryError::validation(format!(
                        "component \"{}\" declares cell dependency \"{alias}\" twice",
                        comp.name
                    )));
                }
                let _: ImageRef = image.parse()?;
            }
        }
    }

    for env in &comp.env {
        if let EnvValueDecl::Host(target) = &env.value {
            if aliases.contains(target.as_str()) {
                continue;
            }
            check_component_target(comp, target, components)?;
        }
    }
    Ok(())
}

fn check_component_target(
    comp: &ComponentDecl,
    target: &str,
    components: &HashSet<&str>,
) -> Result<()> {
    if target == comp.name {
        return Err(CelleryError::validation(format!(
            "component \"{}\" cannot depend on itself",
            comp.name
        )));
    }
    if !components.contains(target) {
        return Err(CelleryError::validation(format!(
            "component \"{}\" references undefined component or cell dependency \"{target}\"",
            comp.name
        )));
    }
    Ok(())
}

fn check_ingresses(comp: &ComponentDecl) -> Result<()> {
    for ingress in &comp.ingresses {
        if ingress.context.trim().is_empty() {
            return Err(CelleryError::validation(format!(
                "component \"{}\" declares an API with an empty context",
                comp.name
            )));
        }
        let mut seen = HashSet::new();
        for (method, path) in &ingress.definitions {
            if !HTTP_METHODS.contains(&method.as_str()) {
                return Err(CelleryError::validation(format!(
                    "component \"{}\", context \"{}\": unknown HTTP method \"{method}\"",
                    comp.name, ingress.context
                )));
            }
            if path.is_empty() {
                return Err(CelleryError::validation(format!(
                    "component \"{}\", context \"{}\": empty path for {method}",
                    comp.name, ingress.context
                )));
            }
            if !seen.insert((method, path)) {
                return Err(CelleryError::validation(format!(
                    "component \"{}\", context \"{}\": {method} {path} declared twice",
                    comp.name, ingress.context
                )));
            }
        }
    }
    Ok(())
}

/// DNS-1123 label: lowercase alphanumerics and `-`, alphanumeric at both ends.
pub fn is_dns_label(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LENGTH
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !name.starts_with('-')
        && !name.ends_with('-')
}

/// Label name segment: `[A-Za-z0-9-_.]`, alphanumeric at both ends.
fn is_label_name(name: &str) -> bool {
    let alnum_ends = name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
        && name.chars().last().is_some_and(|c| c.is_ascii_alphanumeric());
    name.len() <= MAX_NAME_LENGTH
        && alnum_ends
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Qualified label key: optional DNS subdomain prefix followed by `/`.
fn is_label_key(key: &str) -> bool {
    match key.split_once('/') {
        Some((prefix, name)) => {
            !prefix.is_empty()
                && prefix.len() <= MAX_PREFIX_LENGTH
                && prefix.split('.').all(is_dns_label)
                && is_label_name(name)
        }
        None => is_label_name(key),
    }
}
