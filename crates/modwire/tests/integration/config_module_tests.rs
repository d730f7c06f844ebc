//! A configuration module whose providers depend on runtime options,
//! wired into applications through the public facade.

use std::collections::BTreeMap;
use std::sync::Arc;

use modwire::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ConfigOptions {
    folder: String,
    #[serde(default)]
    values: BTreeMap<String, String>,
}

struct ConfigService {
    options: Arc<ConfigOptions>,
}

impl ConfigService {
    fn get(&self, key: &str) -> Option<&str> {
        self.options.values.get(key).map(String::as_str)
    }
}

struct AppController {
    config: Arc<ConfigService>,
}

impl AppController {
    fn hello(&self) -> String {
        format!("Hello {}", self.config.get("HELLO_MESSAGE").unwrap_or("World"))
    }
}

const CONFIG_OPTIONS: &str = "CONFIG_OPTIONS";

fn config_module(config: &ConfigurationObject) -> Result<DynamicModuleDescriptor> {
    let options: ConfigOptions = config.parse()?;
    Ok(DynamicModuleDescriptor::builder("config")
        .provider(ProviderEntry::value(CONFIG_OPTIONS, options))
        .provider(
            ProviderEntry::class(Token::of::<ConfigService>(), |deps| {
                Ok(ConfigService {
                    options: deps.get::<ConfigOptions>(CONFIG_OPTIONS)?,
                })
            })
            .inject(CONFIG_OPTIONS),
        )
        .export(Token::of::<ConfigService>())
        .build_dynamic())
}

fn global_config_module(config: &ConfigurationObject) -> Result<DynamicModuleDescriptor> {
    let mut descriptor = config_module(config)?;
    descriptor.global = true;
    Ok(descriptor)
}

#[linkme::distributed_slice(DYNAMIC_MODULES)]
static CONFIG: DynamicModuleEntry = DynamicModuleEntry {
    module: "config",
    description: "Options-backed configuration service",
    factory: config_module,
};

fn controller_entry() -> ProviderEntry {
    ProviderEntry::class(Token::of::<AppController>(), |deps| {
        Ok(AppController {
            config: deps.get::<ConfigService>(Token::of::<ConfigService>())?,
        })
    })
    .inject(Token::of::<ConfigService>())
}

fn app_module() -> ModuleDescriptor {
    ModuleDescriptor::builder("app")
        .import("config")
        .entry_point(controller_entry())
        .build()
}

fn options(folder: &str, message: &str) -> ConfigurationObject {
    ConfigurationObject::new(serde_json::json!({
        "folder": folder,
        "values": { "HELLO_MESSAGE": message }
    }))
}

#[tokio::test]
async fn test_controller_reads_configured_value() {
    let context = ApplicationBuilder::new(AppConfig::default(), app_module())
        .dynamic_module("config", config_module, options("./config", "there"))
        .build()
        .await
        .unwrap();

    let controller = context
        .entry_point::<AppController>(Token::of::<AppController>())
        .unwrap();
    assert_eq!(controller.hello(), "Hello there");
    assert_eq!(controller.config.options.folder, "./config");

    context.close().await.unwrap();
}

#[tokio::test]
async fn test_config_options_are_private_to_the_module() {
    let context = ApplicationBuilder::new(AppConfig::default(), app_module())
        .dynamic_module("config", config_module, options("./config", "there"))
        .build()
        .await
        .unwrap();

    let err = context.get(CONFIG_OPTIONS).await.unwrap_err();
    assert!(matches!(err, Error::UnresolvableToken { .. }));

    let options = context
        .container()
        .resolve_in::<ConfigOptions>("config", CONFIG_OPTIONS)
        .await
        .unwrap();
    assert_eq!(options.folder, "./config");
}

#[tokio::test]
async fn test_each_application_gets_its_own_configuration() {
    let first = ApplicationBuilder::new(AppConfig::default(), app_module())
        .dynamic_module("config", config_module, options("./first", "one"))
        .build()
        .await
        .unwrap();
    let second = ApplicationBuilder::new(AppConfig::default(), app_module())
        .dynamic_module("config", config_module, options("./second", "two"))
        .build()
        .await
        .unwrap();

    let first = first
        .entry_point::<AppController>(Token::of::<AppController>())
        .unwrap();
    let second = second
        .entry_point::<AppController>(Token::of::<AppController>())
        .unwrap();
    assert_eq!(first.hello(), "Hello one");
    assert_eq!(second.hello(), "Hello two");
    assert!(!Arc::ptr_eq(&first.config, &second.config));
}

#[tokio::test]
async fn test_configured_catalog_module() {
    let config = AppConfig::default().with_module_config(
        "config",
        serde_json::json!({ "folder": "/etc/app", "values": { "HELLO_MESSAGE": "catalog" } }),
    );

    let context = init_app(config, app_module()).await.unwrap();

    let controller = context
        .entry_point::<AppController>(Token::of::<AppController>())
        .unwrap();
    assert_eq!(controller.hello(), "Hello catalog");
}

#[tokio::test]
async fn test_global_module_needs_no_import() {
    let app = ModuleDescriptor::builder("app")
        .import("cats")
        .entry_point(controller_entry())
        .build();
    let cats = ModuleDescriptor::builder("cats")
        .provider(
            ProviderEntry::class("CATS_GREETING", |deps| {
                let config = deps.get::<ConfigService>(Token::of::<ConfigService>())?;
                Ok(config.get("HELLO_MESSAGE").unwrap_or_default().to_string())
            })
            .inject(Token::of::<ConfigService>()),
        )
        .export("CATS_GREETING")
        .build();

    let context = ApplicationBuilder::new(AppConfig::default(), app)
        .module(cats)
        .dynamic_module("config", global_config_module, options("./config", "cats"))
        .build()
        .await
        .unwrap();

    let greeting = context.resolve::<String>("CATS_GREETING").await.unwrap();
    assert_eq!(greeting.as_str(), "cats");
}

#[tokio::test]
async fn test_factory_must_answer_for_its_identity() {
    let err = ApplicationBuilder::new(AppConfig::default(), app_module())
        .dynamic_module("settings", config_module, options("./config", "x"))
        .build()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::IdentityMismatch { .. }));
    assert!(err.to_string().starts_with("Configuration error"));
}
