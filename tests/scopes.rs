use callsite_di::{
    ConstructorDescriptor, DiError, Injectable, Resolver, Scope, ScopeFactory, ServiceCollection, TypeDescriptor,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct RequestId(usize);

fn request_services() -> (ServiceCollection, Arc<AtomicUsize>) {
    let created = Arc::new(AtomicUsize::new(0));
    let next = created.clone();
    let mut sc = ServiceCollection::new();
    sc.add_scoped_factory::<RequestId, _>(move |_| Ok(RequestId(next.fetch_add(1, Ordering::SeqCst))));
    (sc, created)
}

#[test]
fn test_scoped_identity_per_scope() {
    let (sc, created) = request_services();
    let sp = sc.build();

    let scope1 = sp.create_scope();
    let scope2 = sp.create_scope();

    let a1 = scope1.get_required::<RequestId>().unwrap();
    let a2 = scope1.get_required::<RequestId>().unwrap();
    let b1 = scope2.get_required::<RequestId>().unwrap();

    assert!(Arc::ptr_eq(&a1, &a2));
    assert!(!Arc::ptr_eq(&a1, &b1));
    assert_ne!(a1.0, b1.0);
    assert_eq!(created.load(Ordering::SeqCst), 2);
}

#[test]
fn test_scoped_from_root_lives_in_root() {
    let (sc, _) = request_services();
    let sp = sc.build();

    let a = sp.get_required::<RequestId>().unwrap();
    let b = sp.get_required::<RequestId>().unwrap();
    let c = sp.create_scope().get_required::<RequestId>().unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
}

#[test]
fn test_singletons_shared_across_scopes() {
    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory::<Vec<u8>, _>(|_| Ok(vec![1, 2, 3]));
    let sp = sc.build();

    let from_scope = sp.create_scope().get_required::<Vec<u8>>().unwrap();
    let from_other = sp.create_scope().get_required::<Vec<u8>>().unwrap();
    let from_root = sp.get_required::<Vec<u8>>().unwrap();

    assert!(Arc::ptr_eq(&from_scope, &from_other));
    assert!(Arc::ptr_eq(&from_scope, &from_root));
}

#[test]
fn test_singleton_factory_sees_root_scope() {
    struct Holder {
        from_root: bool,
    }

    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory::<Holder, _>(|r| Ok(Holder { from_root: r.scope().is_root() }));
    sc.add_scoped_factory::<bool, _>(|r| Ok(r.scope().is_root()));

    let sp = sc.build();
    let scope = sp.create_scope();

    assert!(scope.get_required::<Holder>().unwrap().from_root);
    assert!(!*scope.get_required::<bool>().unwrap());
}

#[test]
fn test_scope_is_resolvable_as_itself() {
    let sp = ServiceCollection::new().build();
    let scope = sp.create_scope();

    let resolved = scope.get_required::<Scope>().unwrap();
    assert!(!resolved.is_root());
    assert!(sp.get_required::<Scope>().unwrap().is_root());

    // Both handles refer to the same scope.
    scope.dispose();
    assert!(resolved.is_disposed());
}

#[test]
fn test_scope_factory_creates_independent_scopes() {
    let (sc, _) = request_services();
    let sp = sc.build();

    let factory = sp.get_required::<ScopeFactory>().unwrap();
    let a = factory.create_scope();
    let b = factory.create_scope();

    let ra = a.get_required::<RequestId>().unwrap();
    let rb = b.get_required::<RequestId>().unwrap();
    assert!(!Arc::ptr_eq(&ra, &rb));

    a.dispose();
    assert!(b.get_required::<RequestId>().is_ok());
}

#[test]
fn test_scope_factory_inside_factory() {
    struct Worker {
        scopes: ScopeFactory,
    }

    let (mut sc, _) = request_services();
    sc.add_singleton_factory::<Worker, _>(|r| Ok(Worker { scopes: (*r.get_required::<ScopeFactory>()?).clone() }));
    let sp = sc.build();

    let worker = sp.get_required::<Worker>().unwrap();
    let first = worker.scopes.create_scope();
    let second = worker.scopes.create_scope();
    assert!(!Arc::ptr_eq(
        &first.get_required::<RequestId>().unwrap(),
        &second.get_required::<RequestId>().unwrap()
    ));
}

#[test]
fn test_disposed_scope_rejects_resolution() {
    let (sc, _) = request_services();
    let sp = sc.build();
    let scope = sp.create_scope();
    scope.get_required::<RequestId>().unwrap();

    scope.dispose();

    match scope.get::<RequestId>() {
        Err(DiError::ObjectDisposed(name)) => assert_eq!(name, "Scope"),
        other => panic!("unexpected: {:?}", other.map(|_| ())),
    }
    assert!(sp.create_scope().get::<RequestId>().is_ok());
}

#[test]
fn test_disposed_provider_rejects_resolution() {
    let (sc, _) = request_services();
    let sp = sc.build();
    sp.dispose();

    let err = sp.get::<RequestId>().err().unwrap();
    assert_eq!(err.to_string(), "Cannot access a disposed object: ServiceProvider");
}

#[test]
fn test_using_scope_disposes_afterwards() {
    let (sc, _) = request_services();
    let sp = sc.build();

    let mut kept = None;
    let id = sp
        .using_scope(|scope| {
            kept = Some(scope.clone());
            Ok::<_, DiError>(scope.get_required::<RequestId>()?.0)
        })
        .unwrap();

    assert_eq!(id, 0);
    assert!(kept.unwrap().is_disposed());
}

/// Runs `f` on its own thread and fails instead of hanging when it never returns.
fn within_deadline<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(f());
    });
    rx.recv_timeout(std::time::Duration::from_secs(5))
        .expect("resolution did not finish")
}

struct Clock(u64);

struct Repo {
    stamp: u64,
    clock: Arc<Clock>,
}

impl Injectable for Repo {
    fn type_descriptor() -> TypeDescriptor<Self> {
        TypeDescriptor::new().constructor(
            ConstructorDescriptor::new(|args| {
                let scope = args.next::<Scope>()?;
                let clock = scope.get_required::<Clock>()?;
                Ok(Repo { stamp: clock.0, clock })
            })
            .param::<Scope>(),
        )
    }
}

#[test]
fn test_constructor_resolves_through_injected_scope() {
    let repo_and_clock = within_deadline(|| {
        let mut sc = ServiceCollection::new();
        sc.add_scoped_factory::<Clock, _>(|_| Ok(Clock(42)));
        sc.add_scoped_type::<Repo>();
        let sp = sc.build();
        let scope = sp.create_scope();
        let repo = scope.get_required::<Repo>().unwrap();
        let clock = scope.get_required::<Clock>().unwrap();
        (repo, clock)
    });

    let (repo, clock) = repo_and_clock;
    assert_eq!(repo.stamp, 42);
    assert!(Arc::ptr_eq(&repo.clock, &clock));
}

#[test]
fn test_singleton_factory_resolves_through_context_scope() {
    struct Audit {
        started_at: u64,
    }

    let (audit, again) = within_deadline(|| {
        let mut sc = ServiceCollection::new();
        sc.add_singleton_factory::<Clock, _>(|_| Ok(Clock(7)));
        sc.add_singleton_factory::<Audit, _>(|r| {
            let clock = r.scope().get_required::<Clock>()?;
            Ok(Audit { started_at: clock.0 })
        });
        let sp = sc.build();
        let scope = sp.create_scope();
        let audit = scope.get_required::<Audit>().unwrap();
        let again = sp.get_required::<Audit>().unwrap();
        (audit, again)
    });

    assert_eq!(audit.started_at, 7);
    assert!(Arc::ptr_eq(&audit, &again));
}

#[test]
fn test_service_locator_inside_constructor_keeps_cache_serialized() {
    let created = within_deadline(|| {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = created.clone();
        let mut sc = ServiceCollection::new();
        sc.add_scoped_factory::<Clock, _>(move |_| Ok(Clock(counter.fetch_add(1, Ordering::SeqCst) as u64)));
        sc.add_scoped_type::<Repo>();
        let sp = sc.build();
        let scope = sp.create_scope();

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| scope.get_required::<Repo>().unwrap());
            }
        });
        created.load(Ordering::SeqCst)
    });

    assert_eq!(created, 1);
}
