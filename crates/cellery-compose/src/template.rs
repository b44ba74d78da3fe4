//! `{{instance_name}}` templating and service host naming.
//!
//! `{{instance_name}}` is the only token ever expanded; any other
//! `{{...}}` text passes through untouched.

use cellery_common::constants::{
    GATEWAY_SERVICE, INSTANCE_NAME_TOKEN, INSTANCE_SEPARATOR, SERVICE_SUFFIX,
};

/// Replaces every `{{instance_name}}` token in `value` with `instance`.
#[must_use]
pub fn expand_instance_name(value: &str, instance: &str) -> String {
    value.replace(INSTANCE_NAME_TOKEN, instance)
}

/// Whether `value` still carries an unexpanded `{{instance_name}}` token.
#[must_use]
pub fn has_instance_token(value: &str) -> bool {
    value.contains(INSTANCE_NAME_TOKEN)
}

/// Wraps `name` as a `{{name}}` token.
#[must_use]
pub fn placeholder(name: &str) -> String {
    format!("{{{{{name}}}}}")
}

/// Service host of `component` inside the cell instance `instance`.
///
/// `instance` may itself be a token, as at build time.
#[must_use]
pub fn service_host(instance: &str, component: &str) -> String {
    format!("{instance}{INSTANCE_SEPARATOR}{component}{SERVICE_SUFFIX}")
}

/// Gateway host of the cell instance `instance`.
#[must_use]
pub fn gateway_host(instance: &str) -> String {
    format!("{instance}{INSTANCE_SEPARATOR}{GATEWAY_SERVICE}")
}
