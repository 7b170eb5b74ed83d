use callsite_di::{
    ConstructorDescriptor, Injectable, Lifetime, Resolver, ServiceCollection, TypeDescriptor,
};
use std::sync::Arc;

trait Plugin: Send + Sync {
    fn name(&self) -> &str;
}

struct Named(&'static str);

impl Plugin for Named {
    fn name(&self) -> &str {
        self.0
    }
}

fn plugins() -> ServiceCollection {
    let mut sc = ServiceCollection::new();
    sc.add_singleton_trait::<dyn Plugin>(Arc::new(Named("a")));
    sc.add_trait_factory::<dyn Plugin, _>(Lifetime::Scoped, |_| Ok(Arc::new(Named("b")) as Arc<dyn Plugin>));
    sc.add_trait_factory::<dyn Plugin, _>(Lifetime::Transient, |_| Ok(Arc::new(Named("c")) as Arc<dyn Plugin>));
    sc
}

#[test]
fn test_get_all_in_registration_order() {
    let sp = plugins().build();
    let scope = sp.create_scope();

    let all = scope.get_all::<dyn Plugin>().unwrap();
    let names: Vec<_> = all.iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn test_single_resolution_matches_last_item() {
    let sp = plugins().build();
    let scope = sp.create_scope();

    assert_eq!(scope.get_required::<dyn Plugin>().unwrap().name(), "c");
}

#[test]
fn test_scoped_item_shared_between_single_and_all() {
    let mut sc = ServiceCollection::new();
    sc.add_trait_factory::<dyn Plugin, _>(Lifetime::Scoped, |_| Ok(Arc::new(Named("x")) as Arc<dyn Plugin>));
    sc.add_trait_factory::<dyn Plugin, _>(Lifetime::Scoped, |_| Ok(Arc::new(Named("y")) as Arc<dyn Plugin>));
    let sp = sc.build();
    let scope = sp.create_scope();

    let single = scope.get_required::<dyn Plugin>().unwrap();
    let all = scope.get_all::<dyn Plugin>().unwrap();

    assert!(Arc::ptr_eq(&single, &all[1]));
    assert!(!Arc::ptr_eq(&single, &all[0]));

    // Resolving "all" again in the same scope reuses every scoped item.
    let again = scope.get_all::<dyn Plugin>().unwrap();
    assert!(Arc::ptr_eq(&all[0], &again[0]));
    assert!(Arc::ptr_eq(&all[1], &again[1]));
}

#[test]
fn test_transient_items_are_fresh() {
    let sp = plugins().build();
    let scope = sp.create_scope();

    let first = scope.get_all::<dyn Plugin>().unwrap();
    let second = scope.get_all::<dyn Plugin>().unwrap();

    assert!(Arc::ptr_eq(&first[0], &second[0]));
    assert!(Arc::ptr_eq(&first[1], &second[1]));
    assert!(!Arc::ptr_eq(&first[2], &second[2]));
}

#[test]
fn test_get_all_unregistered_is_empty() {
    let sp = ServiceCollection::new().build();
    assert!(sp.get_all::<dyn Plugin>().unwrap().is_empty());
    assert!(sp.get::<dyn Plugin>().unwrap().is_none());
}

struct Host {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl Injectable for Host {
    fn type_descriptor() -> TypeDescriptor<Self> {
        TypeDescriptor::new().constructor(
            ConstructorDescriptor::new(|args| Ok(Host { plugins: args.next_all::<dyn Plugin>()? }))
                .param_all::<dyn Plugin>(),
        )
    }
}

#[test]
fn test_sequence_parameter() {
    let mut sc = plugins();
    sc.add_scoped_type::<Host>();
    let sp = sc.build();

    let host = sp.create_scope().get_required::<Host>().unwrap();
    let names: Vec<_> = host.plugins.iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn test_sequence_parameter_without_registrations() {
    let mut sc = ServiceCollection::new();
    sc.add_transient_type::<Host>();
    let sp = sc.build();

    assert!(sp.get_required::<Host>().unwrap().plugins.is_empty());
}
