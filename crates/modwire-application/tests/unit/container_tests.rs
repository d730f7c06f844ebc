//! Unit tests for the provider container

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use modwire_application::container::ProviderContainer;
use modwire_application::graph::DependencyGraph;
use modwire_application::registry::ModuleRegistry;
use modwire_domain::error::{CycleKind, Error, Result};
use modwire_domain::value_objects::{
    ConflictPolicy, DeferredRef, ModuleDescriptor, ProviderEntry, Token,
};

fn container(root: &'static str, modules: Vec<ModuleDescriptor>) -> ProviderContainer {
    let mut registry = ModuleRegistry::new();
    for module in modules {
        registry.register(module).unwrap();
    }
    let graph = DependencyGraph::build(registry.freeze(), ConflictPolicy::default()).unwrap();
    ProviderContainer::new(Arc::new(graph), root).unwrap()
}

struct Connection {
    url: String,
}

struct CatsService {
    connection: Arc<Connection>,
}

fn database() -> ModuleDescriptor {
    ModuleDescriptor::builder("database")
        .provider(ProviderEntry::class("CONNECTION", |_| {
            Ok(Connection {
                url: "sqlite::memory:".to_string(),
            })
        }))
        .export("CONNECTION")
        .build()
}

#[tokio::test]
async fn test_singleton_identity_within_scope() {
    let container = container("database", vec![database()]);

    let first = container.get("CONNECTION").await.unwrap();
    let second = container.get("CONNECTION").await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_importer_receives_exporters_instance() {
    let container = container(
        "c",
        vec![
            ModuleDescriptor::builder("b")
                .provider(ProviderEntry::value("X", "from b".to_string()))
                .export("X")
                .build(),
            ModuleDescriptor::builder("c").import("b").build(),
        ],
    );

    let from_c = container.resolve::<String>("X").await.unwrap();
    let from_b = container.resolve_in::<String>("b", "X").await.unwrap();

    assert_eq!(from_c.as_str(), "from b");
    assert!(Arc::ptr_eq(&from_c, &from_b));
}

#[tokio::test]
async fn test_class_provider_receives_dependencies() {
    let container = container(
        "cats",
        vec![
            database(),
            ModuleDescriptor::builder("cats")
                .import("database")
                .provider(
                    ProviderEntry::class(Token::of::<CatsService>(), |deps| {
                        Ok(CatsService {
                            connection: deps.get::<Connection>("CONNECTION")?,
                        })
                    })
                    .inject("CONNECTION"),
                )
                .build(),
        ],
    );

    let service = container
        .resolve::<CatsService>(Token::of::<CatsService>())
        .await
        .unwrap();
    let connection = container.resolve::<Connection>("CONNECTION").await.unwrap();

    assert_eq!(service.connection.url, "sqlite::memory:");
    assert!(Arc::ptr_eq(&service.connection, &connection));
}

#[tokio::test]
async fn test_transient_provider_builds_each_time() {
    let container = container(
        "app",
        vec![
            ModuleDescriptor::builder("app")
                .provider(ProviderEntry::class("REQUEST_ID", |_| Ok(0_u64)).transient())
                .build(),
        ],
    );

    let first = container.get("REQUEST_ID").await.unwrap();
    let second = container.get("REQUEST_ID").await.unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert!(container.cached("app", "REQUEST_ID").is_none());
}

#[tokio::test]
async fn test_factory_and_existing_alias() {
    let container = container(
        "app",
        vec![
            ModuleDescriptor::builder("app")
                .provider(ProviderEntry::factory("CLIENT", |_| async {
                    tokio::task::yield_now().await;
                    Ok::<_, Error>("client".to_string())
                }))
                .provider(ProviderEntry::existing("CLIENT_ALIAS", "CLIENT"))
                .build(),
        ],
    );

    let alias = container.resolve::<String>("CLIENT_ALIAS").await.unwrap();
    let client = container.resolve::<String>("CLIENT").await.unwrap();

    assert_eq!(alias.as_str(), "client");
    assert!(Arc::ptr_eq(&alias, &client));
}

#[tokio::test]
async fn test_optional_dependency_absent() {
    let container = container(
        "app",
        vec![
            ModuleDescriptor::builder("app")
                .provider(
                    ProviderEntry::class("SERVICE", |deps| {
                        Ok(deps.get_optional::<String>("CACHE")?.is_some())
                    })
                    .inject_optional("CACHE"),
                )
                .build(),
        ],
    );

    let has_cache = container.resolve::<bool>("SERVICE").await.unwrap();
    assert!(!*has_cache);
}

#[tokio::test]
async fn test_type_mismatch_reported() {
    let container = container("database", vec![database()]);

    let err = container.resolve::<String>("CONNECTION").await.unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));
}

#[tokio::test]
async fn test_unknown_token_unresolvable() {
    let container = container("database", vec![database()]);

    let err = container.get("MISSING").await.unwrap_err();
    assert!(matches!(err, Error::UnresolvableToken { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_construct_once() {
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&builds);
    let container = container(
        "app",
        vec![
            ModuleDescriptor::builder("app")
                .provider(ProviderEntry::factory("SLOW", move |_| {
                    let counter = Arc::clone(&counter);
                    async move {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, Error>(counter.fetch_add(1, Ordering::SeqCst))
                    }
                }))
                .build(),
        ],
    );

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let container = container.clone();
            tokio::spawn(async move { container.get("SLOW").await })
        })
        .collect();

    let mut instances = Vec::new();
    for handle in handles {
        instances.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert!(instances.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
}

#[tokio::test]
async fn test_failed_construction_not_cached() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let container = container(
        "app",
        vec![
            ModuleDescriptor::builder("app")
                .provider(ProviderEntry::class("FLAKY", move |_| {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        return Err(Error::construction(&"FLAKY".into(), "first attempt fails"));
                    }
                    Ok("ready".to_string())
                }))
                .build(),
        ],
    );

    assert!(container.get("FLAKY").await.is_err());
    let value = container.resolve::<String>("FLAKY").await.unwrap();

    assert_eq!(value.as_str(), "ready");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

struct Owner {
    pet: DeferredRef,
}

#[derive(Debug)]
struct Pet {
    owner: DeferredRef,
}

fn deferred_pair() -> ModuleDescriptor {
    ModuleDescriptor::builder("home")
        .provider(
            ProviderEntry::class("OWNER", |deps| {
                Ok(Owner {
                    pet: deps.deferred("PET")?,
                })
            })
            .inject_deferred("PET"),
        )
        .provider(
            ProviderEntry::class("PET", |deps| {
                Ok(Pet {
                    owner: deps.deferred("OWNER")?,
                })
            })
            .inject_deferred("OWNER"),
        )
        .build()
}

#[tokio::test]
async fn test_deferred_references_resolve_after_construction() {
    let container = container("home", vec![deferred_pair()]);

    let owner = container.resolve::<Owner>("OWNER").await.unwrap();
    let pet = owner.pet.get::<Pet>().await.unwrap();
    let owner_again = pet.owner.get::<Owner>().await.unwrap();

    assert!(Arc::ptr_eq(&owner, &owner_again));
    assert_eq!(owner.pet.token(), &Token::from("PET"));
}

#[tokio::test]
async fn test_deferred_handle_outliving_container() {
    let container = container("home", vec![deferred_pair()]);
    let owner = container.resolve::<Owner>("OWNER").await.unwrap();
    drop(container);

    let err = owner.pet.get::<Pet>().await.unwrap_err();
    assert!(matches!(err, Error::Lifecycle { .. }));
}

#[tokio::test]
async fn test_deferred_dereference_closing_cycle_reports_cycle() {
    let container = container(
        "m",
        vec![
            ModuleDescriptor::builder("m")
                .provider(
                    ProviderEntry::factory("A", |deps| async move {
                        let b = deps.deferred("B")?;
                        b.get::<u8>().await?;
                        Ok::<_, Error>(1_u8)
                    })
                    .inject_deferred("B"),
                )
                .provider(
                    ProviderEntry::factory("B", |deps| async move {
                        let a = deps.deferred("A")?;
                        a.get::<u8>().await?;
                        Ok::<_, Error>(2_u8)
                    })
                    .inject_deferred("A"),
                )
                .build(),
        ],
    );

    let err = tokio::time::timeout(Duration::from_secs(5), container.get("A"))
        .await
        .expect("resolution must not hang")
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Cycle {
            kind: CycleKind::Dependency,
            ..
        }
    ));
    assert_eq!(err.cycle_path().unwrap(), ["m::A", "m::B", "m::A"]);
}

fn delayed_cycle() -> ModuleDescriptor {
    ModuleDescriptor::builder("m")
        .provider(
            ProviderEntry::factory("A", |deps| async move {
                let b = deps.deferred("B")?;
                tokio::time::sleep(Duration::from_millis(50)).await;
                b.get::<u8>().await?;
                Ok::<_, Error>(1_u8)
            })
            .inject_deferred("B"),
        )
        .provider(
            ProviderEntry::factory("B", |deps| async move {
                let a = deps.deferred("A")?;
                tokio::time::sleep(Duration::from_millis(50)).await;
                a.get::<u8>().await?;
                Ok::<_, Error>(2_u8)
            })
            .inject_deferred("A"),
        )
        .build()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cycle_across_concurrent_requests_reports_cycle() {
    let container = container("m", vec![delayed_cycle()]);

    let first = container.clone();
    let second = container.clone();
    let a = tokio::spawn(async move { first.get("A").await });
    let b = tokio::spawn(async move { second.get("B").await });

    let (a, b) = tokio::time::timeout(Duration::from_secs(3), async {
        (a.await.unwrap(), b.await.unwrap())
    })
    .await
    .expect("concurrent resolution must not hang");

    for result in [a, b] {
        let err = result.unwrap_err();
        assert!(
            matches!(
                err,
                Error::Cycle {
                    kind: CycleKind::Dependency,
                    ..
                }
            ),
            "unexpected error: {err}"
        );
    }
    assert!(container.cached("m", "A").is_none());
    assert!(container.cached("m", "B").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pending_construction_does_not_block_unrelated_tokens() {
    let container = container(
        "app",
        vec![
            ModuleDescriptor::builder("app")
                .provider(ProviderEntry::factory("SLOW", |_| async {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    Ok::<_, Error>(1_u8)
                }))
                .provider(ProviderEntry::value("FAST", 2_u8))
                .build(),
        ],
    );

    let pending = container.clone();
    let slow = tokio::spawn(async move { pending.resolve::<u8>("SLOW").await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let fast = tokio::time::timeout(Duration::from_millis(200), container.resolve::<u8>("FAST"))
        .await
        .expect("unrelated token must not wait on a pending construction")
        .unwrap();

    assert_eq!(*fast, 2);
    assert!(!slow.is_finished());
    assert_eq!(*slow.await.unwrap().unwrap(), 1);
}

#[tokio::test]
async fn test_instantiate_all_and_construction_order() {
    let container = container(
        "app",
        vec![
            database(),
            ModuleDescriptor::builder("app")
                .import("database")
                .provider(ProviderEntry::class("SERVICE", |_| Ok(())).inject("CONNECTION"))
                .provider(ProviderEntry::class("SCRATCH", |_| Ok(())).transient())
                .build(),
        ],
    );

    let count = container.instantiate_all().await.unwrap();
    let order: Vec<String> = container
        .constructed()
        .iter()
        .map(ToString::to_string)
        .collect();

    assert_eq!(count, 2);
    assert_eq!(order, vec!["database::CONNECTION", "app::SERVICE"]);
    assert!(container.cached("app", "CONNECTION").is_some());
}

#[tokio::test]
async fn test_entry_points_built_in_scope() {
    struct Controller {
        service: Arc<String>,
    }

    let container = container(
        "app",
        vec![
            ModuleDescriptor::builder("app")
                .provider(ProviderEntry::value("SERVICE", "cats".to_string()))
                .entry_point(
                    ProviderEntry::class("CATS_CONTROLLER", |deps| {
                        Ok(Controller {
                            service: deps.get::<String>("SERVICE")?,
                        })
                    })
                    .inject("SERVICE"),
                )
                .build(),
        ],
    );

    let entry_points = container.construct_entry_points().await.unwrap();
    assert_eq!(entry_points.len(), 1);
    let controller = entry_points[0]
        .instance
        .clone()
        .downcast::<Controller>()
        .ok()
        .unwrap();
    assert_eq!(controller.service.as_str(), "cats");

    let err = container.get("CATS_CONTROLLER").await.unwrap_err();
    assert!(matches!(err, Error::UnresolvableToken { .. }));
}

#[tokio::test]
async fn test_shutdown_runs_hooks_in_reverse_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let hook = |name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>| {
        let log = Arc::clone(log);
        move |_: Arc<()>| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(name);
                Ok::<(), Error>(())
            }
        }
    };

    let container = container(
        "app",
        vec![
            ModuleDescriptor::builder("app")
                .provider(ProviderEntry::class("POOL", |_| Ok(())).on_shutdown(hook("pool", &log)))
                .provider(
                    ProviderEntry::class("REPOSITORY", |_| Ok(()))
                        .inject("POOL")
                        .on_shutdown(hook("repository", &log)),
                )
                .build(),
        ],
    );

    container.get("REPOSITORY").await.unwrap();
    container.shutdown().await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["repository", "pool"]);
    assert!(container.is_closed());
    let err = container.get("POOL").await.unwrap_err();
    assert!(matches!(err, Error::Lifecycle { .. }));
    assert!(container.shutdown().await.is_ok());
}

#[tokio::test]
async fn test_shutdown_reports_first_failure_and_runs_all_hooks() {
    let ran = Arc::new(AtomicUsize::new(0));
    let failing = Arc::clone(&ran);
    let passing = Arc::clone(&ran);

    let container = container(
        "app",
        vec![
            ModuleDescriptor::builder("app")
                .provider(ProviderEntry::class("FIRST", |_| Ok(())).on_shutdown(
                    move |_: Arc<()>| {
                        let passing = Arc::clone(&passing);
                        async move {
                            passing.fetch_add(1, Ordering::SeqCst);
                            Ok::<(), Error>(())
                        }
                    },
                ))
                .provider(
                    ProviderEntry::class("SECOND", |_| Ok(()))
                        .inject("FIRST")
                        .on_shutdown(move |_: Arc<()>| {
                            let failing = Arc::clone(&failing);
                            async move {
                                failing.fetch_add(1, Ordering::SeqCst);
                                Err::<(), _>(Error::internal("flush failed"))
                            }
                        }),
                )
                .build(),
        ],
    );

    container.instantiate_all().await.unwrap();
    let err: Error = container.shutdown().await.unwrap_err();

    assert!(err.to_string().contains("flush failed"));
    assert_eq!(ran.load(Ordering::SeqCst), 2);
}

#[test]
fn test_root_must_be_registered() {
    let mut registry = ModuleRegistry::new();
    registry.register(database()).unwrap();
    let graph = DependencyGraph::build(registry.freeze(), ConflictPolicy::default()).unwrap();

    let err: Result<ProviderContainer> = ProviderContainer::new(Arc::new(graph), "app");
    assert!(matches!(err, Err(Error::Configuration { .. })));
}
