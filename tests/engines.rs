//! Every execution mode must produce the same instances with the same
//! caching and disposal behavior.

use callsite_di::{
    ConstructorDescriptor, Dispose, ExecutionMode, Injectable, Lifetime, MetricsObserver, Resolver,
    ServiceCollection, ServiceProvider, ServiceProviderOptions, TypeDescriptor,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const MODES: [ExecutionMode; 3] = [ExecutionMode::Interpreted, ExecutionMode::Compiled, ExecutionMode::Hybrid];

struct Settings {
    name: &'static str,
}

struct Repository {
    settings: Arc<Settings>,
}

struct Handler {
    repository: Arc<Repository>,
    settings: Arc<Settings>,
}

impl Injectable for Repository {
    fn type_descriptor() -> TypeDescriptor<Self> {
        TypeDescriptor::new().constructor(
            ConstructorDescriptor::new(|a| Ok(Repository { settings: a.next()? })).param::<Settings>(),
        )
    }
}

impl Injectable for Handler {
    fn type_descriptor() -> TypeDescriptor<Self> {
        TypeDescriptor::new().constructor(
            ConstructorDescriptor::new(|a| Ok(Handler { repository: a.next()?, settings: a.next()? }))
                .param::<Repository>()
                .param::<Settings>(),
        )
    }
}

struct Session {
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl Dispose for Session {
    fn dispose(&self) {
        self.log.lock().push("session");
    }
}

fn build(mode: ExecutionMode, log: Arc<Mutex<Vec<&'static str>>>) -> (ServiceProvider, Arc<AtomicUsize>) {
    let settings_built = Arc::new(AtomicUsize::new(0));
    let counter = settings_built.clone();

    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory::<Settings, _>(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Settings { name: "prod" })
    });
    sc.add_scoped_type::<Repository>();
    sc.add_transient_type::<Handler>();
    sc.add_disposable_factory::<Session, _>(Lifetime::Transient, move |_| Ok(Session { log: log.clone() }));

    let sp = sc
        .build_with(ServiceProviderOptions::new().mode(mode).hybrid_threshold(2))
        .unwrap();
    (sp, settings_built)
}

#[test]
fn test_modes_agree_on_lifetimes() {
    for mode in MODES {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (sp, settings_built) = build(mode, log.clone());

        // Resolve enough times for the hybrid engine to compile.
        for _ in 0..5 {
            let scope = sp.create_scope();
            let h1 = scope.get_required::<Handler>().unwrap();
            let h2 = scope.get_required::<Handler>().unwrap();

            assert!(!Arc::ptr_eq(&h1, &h2), "mode {}", mode);
            assert!(Arc::ptr_eq(&h1.repository, &h2.repository), "mode {}", mode);
            assert!(Arc::ptr_eq(&h1.settings, &h1.repository.settings), "mode {}", mode);
            assert_eq!(h1.settings.name, "prod");
            scope.dispose();
        }

        let other = sp.create_scope();
        let first = sp.create_scope().get_required::<Repository>().unwrap();
        assert!(!Arc::ptr_eq(&first, &other.get_required::<Repository>().unwrap()));
        assert_eq!(settings_built.load(Ordering::SeqCst), 1, "mode {}", mode);
    }
}

#[test]
fn test_modes_agree_on_disposal() {
    for mode in MODES {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (sp, _) = build(mode, log.clone());

        for round in 1..=4 {
            let scope = sp.create_scope();
            scope.get_required::<Session>().unwrap();
            scope.get_required::<Session>().unwrap();
            scope.dispose();
            assert_eq!(log.lock().len(), round * 2, "mode {}", mode);
        }
    }
}

#[test]
fn test_compiled_singleton_slot_respects_disposed_root() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (sp, _) = build(ExecutionMode::Compiled, log);
    let scope = sp.create_scope();

    scope.get_required::<Settings>().unwrap();
    sp.dispose();

    assert!(scope.get::<Settings>().is_err());
}

#[test]
fn test_hybrid_swaps_in_compiled_accessor() {
    let metrics = Arc::new(MetricsObserver::new());
    let mut sc = ServiceCollection::new();
    sc.add_transient_factory::<u64, _>(|_| Ok(11));
    sc.add_observer(metrics.clone());
    let sp = sc
        .build_with(ServiceProviderOptions::new().mode(ExecutionMode::Hybrid).hybrid_threshold(2))
        .unwrap();

    assert_eq!(*sp.get_required::<u64>().unwrap(), 11);
    assert_eq!(*sp.get_required::<u64>().unwrap(), 11);

    // Compilation runs on the rayon pool.
    let deadline = Instant::now() + Duration::from_secs(10);
    while metrics.compiled_count() == 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(metrics.compiled_count(), 1);

    for _ in 0..10 {
        assert_eq!(*sp.get_required::<u64>().unwrap(), 11);
    }
    // Only the threshold crossing schedules a compilation.
    assert_eq!(metrics.compiled_count(), 1);
}

#[test]
fn test_interpreted_and_compiled_never_compile_in_background() {
    for mode in [ExecutionMode::Interpreted, ExecutionMode::Compiled] {
        let metrics = Arc::new(MetricsObserver::new());
        let mut sc = ServiceCollection::new();
        sc.add_singleton(1u8);
        sc.add_observer(metrics.clone());
        let sp = sc.build_with(ServiceProviderOptions::new().mode(mode)).unwrap();

        for _ in 0..10 {
            sp.get_required::<u8>().unwrap();
        }
        assert_eq!(metrics.compiled_count(), 0);
        assert_eq!(metrics.resolution_count(), 10);
    }
}
