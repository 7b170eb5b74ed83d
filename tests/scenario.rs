/// Full application scenario: a singleton logger, a scoped repository and a
/// transient handler depending on both, run under every execution mode.
use callsite_di::{
    ConstructorDescriptor, Dispose, ExecutionMode, Injectable, Lifetime, Resolver, ServiceCollection,
    ServiceProviderOptions, TypeDescriptor,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type Events = Arc<Mutex<Vec<String>>>;

trait Logger: Send + Sync {
    fn log(&self, message: &str);
}

trait Repo: Send + Sync {
    fn id(&self) -> usize;
}

struct ConsoleLogger {
    events: Events,
}

impl Logger for ConsoleLogger {
    fn log(&self, message: &str) {
        self.events.lock().push(format!("log:{}", message));
    }
}

impl Dispose for ConsoleLogger {
    fn dispose(&self) {
        self.events.lock().push("dispose:logger".to_string());
    }
}

impl Injectable for ConsoleLogger {
    fn type_descriptor() -> TypeDescriptor<Self> {
        TypeDescriptor::new()
            .constructor(
                ConstructorDescriptor::new(|a| Ok(ConsoleLogger { events: a.next()? }))
                    .param::<Mutex<Vec<String>>>(),
            )
            .disposable()
    }
}

static NEXT_REPO: AtomicUsize = AtomicUsize::new(0);

struct SqlRepo {
    id: usize,
    events: Events,
}

impl Repo for SqlRepo {
    fn id(&self) -> usize {
        self.id
    }
}

impl Dispose for SqlRepo {
    fn dispose(&self) {
        self.events.lock().push(format!("dispose:repo{}", self.id));
    }
}

impl Injectable for SqlRepo {
    fn type_descriptor() -> TypeDescriptor<Self> {
        TypeDescriptor::new()
            .constructor(
                ConstructorDescriptor::new(|a| {
                    let events = a.next::<Mutex<Vec<String>>>()?;
                    let logger = a.next::<dyn Logger>()?;
                    let id = NEXT_REPO.fetch_add(1, Ordering::SeqCst);
                    logger.log(&format!("repo{} opened", id));
                    Ok(SqlRepo { id, events })
                })
                .param::<Mutex<Vec<String>>>()
                .param::<dyn Logger>(),
            )
            .disposable()
    }
}

struct Handler {
    logger: Arc<dyn Logger>,
    repo: Arc<dyn Repo>,
    events: Events,
}

impl Dispose for Handler {
    fn dispose(&self) {
        self.events.lock().push("dispose:handler".to_string());
    }
}

impl Injectable for Handler {
    fn type_descriptor() -> TypeDescriptor<Self> {
        TypeDescriptor::new()
            .constructor(
                ConstructorDescriptor::new(|a| {
                    Ok(Handler {
                        logger: a.next()?,
                        repo: a.next()?,
                        events: a.next()?,
                    })
                })
                .param::<dyn Logger>()
                .param::<dyn Repo>()
                .param::<Mutex<Vec<String>>>(),
            )
            .disposable()
    }
}

fn services(events: &Events) -> ServiceCollection {
    let mut sc = ServiceCollection::new();
    sc.add_singleton_trait::<Mutex<Vec<String>>>(events.clone());
    sc.add_type_as::<dyn Logger, ConsoleLogger, _>(Lifetime::Singleton, |l| l as Arc<dyn Logger>);
    sc.add_type_as::<dyn Repo, SqlRepo, _>(Lifetime::Scoped, |r| r as Arc<dyn Repo>);
    sc.add_transient_type::<Handler>();
    sc
}

#[test]
fn test_logger_repo_handler_scenario() {
    for mode in [ExecutionMode::Interpreted, ExecutionMode::Compiled, ExecutionMode::Hybrid] {
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let sp = services(&events)
            .build_with(ServiceProviderOptions::strict().mode(mode))
            .unwrap();

        let s1 = sp.create_scope();
        let h1 = s1.get_required::<Handler>().unwrap();
        let h2 = s1.get_required::<Handler>().unwrap();

        assert!(!Arc::ptr_eq(&h1, &h2), "mode {}", mode);
        assert!(Arc::ptr_eq(&h1.logger, &h2.logger), "mode {}", mode);
        assert!(Arc::ptr_eq(&h1.repo, &h2.repo), "mode {}", mode);

        let s2 = sp.create_scope();
        let h3 = s2.get_required::<Handler>().unwrap();
        assert_ne!(h3.repo.id(), h1.repo.id(), "mode {}", mode);
        assert!(Arc::ptr_eq(&h3.logger, &h1.logger), "mode {}", mode);

        let repo1 = h1.repo.id();
        events.lock().clear();
        s1.dispose();
        assert_eq!(
            *events.lock(),
            vec![
                "dispose:handler".to_string(),
                "dispose:handler".to_string(),
                format!("dispose:repo{}", repo1),
            ],
            "mode {}",
            mode
        );

        // The logger belongs to the root; only disposing the provider releases it.
        events.lock().clear();
        s2.dispose();
        assert!(events.lock().iter().all(|e| e != "dispose:logger"), "mode {}", mode);
        sp.dispose();
        assert_eq!(events.lock().last().map(String::as_str), Some("dispose:logger"), "mode {}", mode);
    }
}

#[test]
fn test_unregistered_type_absent_vs_required() {
    struct NotRegistered;

    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let sp = services(&events).build();

    assert!(sp.get::<NotRegistered>().unwrap().is_none());
    assert!(matches!(
        sp.get_required::<NotRegistered>(),
        Err(callsite_di::DiError::UnresolvableDependency { required_by: None, .. })
    ));
}
