use callsite_di::{
    ConstructorDescriptor, DiError, Injectable, Resolver, ServiceCollection, ServiceProviderOptions,
    TypeDescriptor,
};
use std::any::type_name;
use std::sync::Arc;

struct RequestContext;

struct Cache {
    _request: Arc<RequestContext>,
}

struct Controller {
    _request: Arc<RequestContext>,
}

impl Injectable for Cache {
    fn type_descriptor() -> TypeDescriptor<Self> {
        TypeDescriptor::new().constructor(
            ConstructorDescriptor::new(|a| Ok(Cache { _request: a.next()? })).param::<RequestContext>(),
        )
    }
}

impl Injectable for Controller {
    fn type_descriptor() -> TypeDescriptor<Self> {
        TypeDescriptor::new().constructor(
            ConstructorDescriptor::new(|a| Ok(Controller { _request: a.next()? })).param::<RequestContext>(),
        )
    }
}

fn services() -> ServiceCollection {
    let mut sc = ServiceCollection::new();
    sc.add_scoped_factory::<RequestContext, _>(|_| Ok(RequestContext));
    sc.add_singleton_type::<Cache>();
    sc.add_transient_type::<Controller>();
    sc
}

#[test]
fn test_singleton_consuming_scoped_is_rejected() {
    let sp = services()
        .build_with(ServiceProviderOptions::new().validate_scopes(true))
        .unwrap();
    let scope = sp.create_scope();

    let err = scope.get::<Cache>().err().unwrap();
    assert_eq!(
        err.to_string(),
        format!(
            "Invalid scope usage: Cannot consume scoped service '{}' from singleton '{}'",
            type_name::<RequestContext>(),
            type_name::<Cache>()
        )
    );
}

#[test]
fn test_scoped_from_root_is_rejected() {
    let sp = services()
        .build_with(ServiceProviderOptions::new().validate_scopes(true))
        .unwrap();

    let err = sp.get::<RequestContext>().err().unwrap();
    assert!(err
        .to_string()
        .ends_with(&format!("Cannot resolve scoped service '{}' from root provider", type_name::<RequestContext>())));

    let err = sp.get::<Controller>().err().unwrap();
    assert!(err.to_string().ends_with(&format!(
        "Cannot resolve '{}' from root provider because it requires scoped service '{}'",
        type_name::<Controller>(),
        type_name::<RequestContext>()
    )));

    // From a scope both are fine.
    let scope = sp.create_scope();
    assert!(scope.get::<RequestContext>().unwrap().is_some());
    assert!(scope.get::<Controller>().unwrap().is_some());
}

#[test]
fn test_without_validation_scoped_resolves_from_root() {
    let sp = services().build();
    assert!(sp.get::<RequestContext>().unwrap().is_some());
    assert!(sp.get::<Cache>().unwrap().is_some());
}

#[test]
fn test_validate_on_build_aggregates_failures() {
    struct Unregistered;
    struct NeedsMissing;

    impl Injectable for NeedsMissing {
        fn type_descriptor() -> TypeDescriptor<Self> {
            TypeDescriptor::new().constructor(ConstructorDescriptor::new(|_| Ok(NeedsMissing)).param::<Unregistered>())
        }
    }

    let mut sc = services();
    sc.add_transient_type::<NeedsMissing>();

    let err = sc.build_with(ServiceProviderOptions::strict()).err().unwrap();
    let failures = err.failures();

    assert_eq!(failures.len(), 2);
    assert!(matches!(failures[0], DiError::InvalidScopeUsage(_)));
    assert!(matches!(
        failures[1],
        DiError::UnresolvableDependency { required_by: Some(_), .. }
    ));
    assert!(err.to_string().starts_with("Some services are not able to be constructed: "));
}

#[test]
fn test_validate_on_build_passes_for_valid_graph() {
    let mut sc = ServiceCollection::new();
    sc.add_scoped_factory::<RequestContext, _>(|_| Ok(RequestContext));
    sc.add_transient_type::<Controller>();

    let sp = sc.build_with(ServiceProviderOptions::strict()).unwrap();
    assert!(sp.create_scope().get_required::<Controller>().is_ok());
}

#[test]
fn test_validate_on_build_catches_cycles() {
    struct Egg;
    struct Chicken;

    impl Injectable for Egg {
        fn type_descriptor() -> TypeDescriptor<Self> {
            TypeDescriptor::new().constructor(ConstructorDescriptor::new(|_| Ok(Egg)).param::<Chicken>())
        }
    }

    impl Injectable for Chicken {
        fn type_descriptor() -> TypeDescriptor<Self> {
            TypeDescriptor::new().constructor(ConstructorDescriptor::new(|_| Ok(Chicken)).param::<Egg>())
        }
    }

    let mut sc = ServiceCollection::new();
    sc.add_singleton_type::<Egg>();
    sc.add_singleton_type::<Chicken>();

    let err = sc
        .build_with(ServiceProviderOptions::new().validate_on_build(true))
        .err()
        .unwrap();
    assert_eq!(err.failures().len(), 2);
    assert!(err.failures().iter().all(|f| f.cycle().is_some()));
}
