//! Unit tests for dynamic module resolution

use modwire_application::resolver::{DynamicModuleResolver, resolve_dynamic_module};
use modwire_domain::error::{Error, Result};
use modwire_domain::value_objects::{
    ConfigurationObject, DynamicModuleDescriptor, ModuleDescriptor, ProviderEntry, ProviderStrategy,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ConfigOptions {
    folder: String,
}

fn config_module(config: &ConfigurationObject) -> Result<DynamicModuleDescriptor> {
    let options: ConfigOptions = config.parse()?;
    Ok(DynamicModuleDescriptor::builder("config")
        .import("filesystem")
        .provider(ProviderEntry::value("CONFIG_OPTIONS", options.folder))
        .export("CONFIG_OPTIONS")
        .build_dynamic())
}

fn options(folder: &str) -> ConfigurationObject {
    ConfigurationObject::new(serde_json::json!({ "folder": folder }))
}

#[test]
fn test_dynamic_descriptor_matches_static_shape() {
    let resolved = DynamicModuleResolver::new()
        .resolve("config", &config_module, options("./config"))
        .unwrap();

    let declared = ModuleDescriptor::builder("config")
        .import("filesystem")
        .provider(ProviderEntry::value("CONFIG_OPTIONS", "./config".to_string()))
        .export("CONFIG_OPTIONS")
        .build();

    assert_eq!(resolved.shape(), declared.shape());
}

#[test]
fn test_identity_mismatch_is_configuration_error() {
    let err = resolve_dynamic_module("settings", &config_module, options("./config")).unwrap_err();

    match &err {
        Error::IdentityMismatch { expected, actual } => {
            assert_eq!(expected.as_str(), "settings");
            assert_eq!(actual.as_str(), "config");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().starts_with("Configuration error"));
}

#[test]
fn test_factory_error_propagates() {
    let err = resolve_dynamic_module(
        "config",
        &config_module,
        ConfigurationObject::new(serde_json::json!({ "folder": 42 })),
    )
    .unwrap_err();

    assert!(matches!(err, Error::Configuration { .. }));
}

#[test]
fn test_each_call_sees_its_own_configuration() {
    let first = resolve_dynamic_module("config", &config_module, options("./a")).unwrap();
    let second = resolve_dynamic_module("config", &config_module, options("./b")).unwrap();

    assert_eq!(first.shape(), second.shape());
    assert_eq!(folder(&first).as_deref(), Some("./a"));
    assert_eq!(folder(&second).as_deref(), Some("./b"));
}

fn folder(descriptor: &ModuleDescriptor) -> Option<String> {
    match &descriptor.providers[0].strategy {
        ProviderStrategy::Value(instance) => instance.downcast_ref::<String>().cloned(),
        _ => None,
    }
}
