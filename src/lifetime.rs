//! Service lifetime definitions.

/// Service lifetimes controlling instance reuse and disposal ownership
///
/// The lifetime decides where a built instance is cached and which scope
/// disposes it:
///
/// - **Singleton**: cached in the root scope, disposed with the provider
/// - **Scoped**: cached in the resolving scope, disposed with that scope
/// - **Transient**: never cached, but still disposed by the resolving scope
///
/// # Examples
///
/// ```rust
/// use callsite_di::{ServiceCollection, Resolver, Lifetime};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct Repository { db_url: String }
/// struct RequestModel { id: u32 }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Database { url: "postgres://localhost".to_string() });
/// services.add_scoped_factory::<Repository, _>(|r| {
///     let db = r.get_required::<Database>()?;
///     Ok(Repository { db_url: db.url.clone() })
/// });
/// services.add_transient_factory::<RequestModel, _>(|_| Ok(RequestModel { id: 12345 }));
///
/// let provider = services.build();
///
/// // Singleton: same instance across scopes
/// let db1 = provider.get_required::<Database>().unwrap();
/// let scope1 = provider.create_scope();
/// let db2 = scope1.get_required::<Database>().unwrap();
/// assert!(Arc::ptr_eq(&db1, &db2));
///
/// // Scoped: same within a scope, different across scopes
/// let repo1a = scope1.get_required::<Repository>().unwrap();
/// let repo1b = scope1.get_required::<Repository>().unwrap();
/// assert!(Arc::ptr_eq(&repo1a, &repo1b));
/// let scope2 = provider.create_scope();
/// let repo2 = scope2.get_required::<Repository>().unwrap();
/// assert!(!Arc::ptr_eq(&repo1a, &repo2));
///
/// // Transient: always a new instance
/// let model1 = scope1.get_required::<RequestModel>().unwrap();
/// let model2 = scope1.get_required::<RequestModel>().unwrap();
/// assert!(!Arc::ptr_eq(&model1, &model2));
/// assert_eq!(model1.id, 12345);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// Single instance per provider, cached in the root scope
    Singleton,
    /// Single instance per scope, cached for the scope's lifetime
    ///
    /// Resolving a scoped service from the root provider makes it behave like
    /// a singleton; `validate_scopes` turns that into an error.
    Scoped,
    /// New instance per resolution, owned by the resolving scope for disposal
    Transient,
}

impl Lifetime {
    /// Short lowercase name used in diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Scoped => "scoped",
            Lifetime::Transient => "transient",
        }
    }
}

impl std::fmt::Display for Lifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
