//! Dependency injection container
//!
//! Callables declare the [`DependencyKey`]s they need through the
//! [`Injectable`] trait. The [`Container`] resolves those keys against its
//! bindings and hands the values to the callable in declaration order, so
//! plugin initializers and task bodies never wire their arguments by hand.
//!
//! Bindings can be replaced for the duration of one call with
//! [`Container::with_overrides`] or [`Container::with_overrides_async`]. The
//! replaced values are restored by an [`OverrideGuard`] when the scope ends,
//! whether it returns, fails, panics, or is dropped before completing.
//!
//! ```rust
//! use kbox_core::deps::{injectable, Container, Overrides};
//!
//! let container = Container::new();
//! container.register("greeting", String::from("hello"));
//!
//! let greet = injectable("example", ["greeting", "plugin"], |deps| {
//!     let greeting = deps.get::<String>("greeting")?;
//!     let plugin = deps.get::<String>("plugin")?;
//!     Ok(format!("{greeting} from {plugin}"))
//! });
//!
//! // `plugin` is only bound inside the scope
//! assert!(container.call(&greet).is_err());
//! let message = container.with_overrides(
//!     Overrides::new().with("plugin", String::from("db")),
//!     || container.call(&greet),
//! );
//! assert_eq!(message.unwrap(), "hello from db");
//! assert!(!container.contains("plugin"));
//! ```

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use kbox_plugin_protocol::DependencyKey;

use crate::types::{KboxError, KboxResult};

/// A type-erased bound value.
pub type Binding = Arc<dyn Any + Send + Sync>;

/// A callable that declares its dependencies up front.
pub trait Injectable {
    type Output;

    /// Keys to resolve, in the order the callable expects them.
    fn dependencies(&self) -> Vec<DependencyKey>;

    /// Who is asking, used to prefix resolution errors.
    fn context(&self) -> String {
        type_name::<Self>().to_string()
    }

    fn invoke(&self, deps: Resolved) -> anyhow::Result<Self::Output>;
}

/// Values resolved for one call, positionally matching the declared keys.
#[derive(Clone, Default)]
pub struct Resolved {
    values: Vec<(DependencyKey, Binding)>,
}

impl Resolved {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &DependencyKey> {
        self.values.iter().map(|(key, _)| key)
    }

    /// Binding at the given declaration position.
    pub fn at(&self, index: usize) -> Option<&Binding> {
        self.values.get(index).map(|(_, binding)| binding)
    }

    pub fn binding(&self, key: &str) -> KboxResult<&Binding> {
        self.values
            .iter()
            .find(|(declared, _)| declared.as_str() == key)
            .map(|(_, binding)| binding)
            .ok_or_else(|| KboxError::UndeclaredDependency {
                name: key.to_string(),
            })
    }

    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> KboxResult<Arc<T>> {
        downcast(key, self.binding(key)?.clone())
    }
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

fn downcast<T: Any + Send + Sync>(key: &str, binding: Binding) -> KboxResult<Arc<T>> {
    binding
        .downcast::<T>()
        .map_err(|_| KboxError::DependencyType {
            name: key.to_string(),
            expected: type_name::<T>(),
        })
}

/// Closure-backed [`Injectable`], see [`injectable`].
pub struct FnInjectable<F> {
    context: String,
    keys: Vec<DependencyKey>,
    f: F,
}

/// Wrap a closure together with the keys it depends on.
pub fn injectable<F, T, K>(
    context: impl Into<String>,
    keys: impl IntoIterator<Item = K>,
    f: F,
) -> FnInjectable<F>
where
    F: Fn(Resolved) -> anyhow::Result<T>,
    K: Into<DependencyKey>,
{
    FnInjectable {
        context: context.into(),
        keys: keys.into_iter().map(Into::into).collect(),
        f,
    }
}

impl<F, T> Injectable for FnInjectable<F>
where
    F: Fn(Resolved) -> anyhow::Result<T>,
{
    type Output = T;

    fn dependencies(&self) -> Vec<DependencyKey> {
        self.keys.clone()
    }

    fn context(&self) -> String {
        self.context.clone()
    }

    fn invoke(&self, deps: Resolved) -> anyhow::Result<T> {
        (self.f)(deps)
    }
}

/// Replacement bindings for one scoped call.
#[derive(Clone, Default)]
pub struct Overrides {
    entries: Vec<(DependencyKey, Binding)>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Any + Send + Sync>(self, key: impl Into<DependencyKey>, value: T) -> Self {
        self.with_binding(key, Arc::new(value))
    }

    pub fn with_binding(mut self, key: impl Into<DependencyKey>, binding: Binding) -> Self {
        self.entries.push((key.into(), binding));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &DependencyKey> {
        self.entries.iter().map(|(key, _)| key)
    }
}

impl fmt::Debug for Overrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

/// Name-keyed store of the currently bound values.
#[derive(Default)]
pub struct Container {
    bindings: RwLock<HashMap<DependencyKey, Binding>>,
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bindings = self.read();
        let mut keys: Vec<_> = bindings.keys().collect();
        keys.sort();
        f.debug_struct("Container").field("bindings", &keys).finish()
    }
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic inside a scoped call never happens while the lock is held, so
    // the map behind a poisoned lock is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<DependencyKey, Binding>> {
        self.bindings.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<DependencyKey, Binding>> {
        self.bindings.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind `value` under `key`, returning the binding it replaced.
    pub fn register<T: Any + Send + Sync>(
        &self,
        key: impl Into<DependencyKey>,
        value: T,
    ) -> Option<Binding> {
        self.register_binding(key, Arc::new(value))
    }

    /// Bind an already shared value, e.g. an `Arc` the caller keeps a handle to.
    pub fn register_binding(
        &self,
        key: impl Into<DependencyKey>,
        binding: Binding,
    ) -> Option<Binding> {
        self.write().insert(key.into(), binding)
    }

    pub fn remove(&self, key: &str) -> Option<Binding> {
        self.write().remove(key)
    }

    pub fn lookup(&self, key: &str) -> Option<Binding> {
        self.read().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> KboxResult<Arc<T>> {
        let binding = self
            .lookup(key)
            .ok_or_else(|| KboxError::UnresolvedDependency {
                name: key.to_string(),
                context: "container lookup".to_string(),
            })?;
        downcast(key, binding)
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    /// Declared keys of `callable`, without invoking it.
    pub fn inspect<I: Injectable + ?Sized>(callable: &I) -> Vec<DependencyKey> {
        callable.dependencies()
    }

    /// Resolve every declared key of `callable` against the current bindings.
    pub fn resolve<I: Injectable + ?Sized>(&self, callable: &I) -> KboxResult<Resolved> {
        let bindings = self.read();
        let values = callable
            .dependencies()
            .into_iter()
            .map(|key| match bindings.get(&key) {
                Some(binding) => Ok((key, binding.clone())),
                None => Err(KboxError::UnresolvedDependency {
                    name: key.to_string(),
                    context: callable.context(),
                }),
            })
            .collect::<KboxResult<Vec<_>>>()?;
        Ok(Resolved { values })
    }

    /// Resolve and invoke `callable`. Its own result passes through untouched.
    pub fn call<I: Injectable + ?Sized>(&self, callable: &I) -> anyhow::Result<I::Output> {
        let deps = self.resolve(callable)?;
        callable.invoke(deps)
    }

    /// Install `overrides` until the returned guard is dropped.
    pub fn install(&self, overrides: Overrides) -> OverrideGuard<'_> {
        let mut bindings = self.write();
        let saved = overrides
            .entries
            .into_iter()
            .map(|(key, binding)| {
                let prior = bindings.insert(key.clone(), binding);
                (key, prior)
            })
            .collect();
        OverrideGuard {
            container: self,
            saved,
        }
    }

    /// Run `scoped` with `overrides` bound, restoring the previous bindings afterwards.
    pub fn with_overrides<T>(&self, overrides: Overrides, scoped: impl FnOnce() -> T) -> T {
        let _guard = self.install(overrides);
        scoped()
    }

    /// Deferred-completion form of [`Container::with_overrides`]: the scope
    /// ends when the future returned by `scoped` completes, or when the
    /// returned future is dropped.
    pub async fn with_overrides_async<F, Fut, T>(&self, overrides: Overrides, scoped: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.install(overrides);
        scoped().await
    }
}

/// Restores overridden bindings on drop.
#[must_use = "overrides are reverted as soon as the guard is dropped"]
pub struct OverrideGuard<'a> {
    container: &'a Container,
    saved: Vec<(DependencyKey, Option<Binding>)>,
}

impl Drop for OverrideGuard<'_> {
    fn drop(&mut self) {
        let mut bindings = self.container.write();
        // Reverse order so a key overridden twice in one scope ends up at its original value.
        while let Some((key, prior)) = self.saved.pop() {
            match prior {
                Some(binding) => {
                    bindings.insert(key, binding);
                }
                None => {
                    bindings.remove(&key);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::time::Duration;

    fn container_with_plugin(name: &str) -> (Container, Binding) {
        let container = Container::new();
        let binding: Binding = Arc::new(name.to_string());
        container.register_binding(DependencyKey::PLUGIN, binding.clone());
        (container, binding)
    }

    fn assert_same(container: &Container, key: &str, expected: &Binding) {
        let current = container.lookup(key).expect("binding should exist");
        assert!(Arc::ptr_eq(&current, expected), "binding for {key} was not restored");
    }

    #[test]
    fn test_call_resolves_in_declared_order() {
        let container = Container::new();
        container.register("port", 8080u16);
        container.register("host", String::from("localhost"));

        let callable = injectable("test", ["host", "port"], |deps| {
            assert_eq!(deps.len(), 2);
            assert_eq!(deps.keys().map(|k| k.as_str()).collect::<Vec<_>>(), ["host", "port"]);
            let host = deps.at(0).unwrap().clone().downcast::<String>().unwrap();
            let port = deps.get::<u16>("port")?;
            Ok(format!("{host}:{port}"))
        });

        assert_eq!(container.call(&callable).unwrap(), "localhost:8080");
    }

    #[test]
    fn test_call_fails_on_unresolved_dependency() {
        let container = Container::new();
        container.register("host", String::from("localhost"));

        let callable = injectable("plugin [web]", ["host", "port"], |_| Ok(()));
        let err = container.call(&callable).unwrap_err();

        match err.downcast_ref::<KboxError>() {
            Some(KboxError::UnresolvedDependency { name, context }) => {
                assert_eq!(name, "port");
                assert_eq!(context, "plugin [web]");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("required by plugin [web]"));
    }

    #[test]
    fn test_call_passes_callable_errors_through() {
        let container = Container::new();
        let callable = injectable("test", Vec::<DependencyKey>::new(), |_| -> anyhow::Result<()> {
            anyhow::bail!("boom")
        });

        let err = container.call(&callable).unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert!(err.downcast_ref::<KboxError>().is_none());
    }

    #[test]
    fn test_inspect_does_not_invoke() {
        let callable = injectable(
            "test",
            [DependencyKey::APP, DependencyKey::APP_CONFIG],
            |_| -> anyhow::Result<()> { panic!("inspect must not invoke the callable") },
        );

        assert_eq!(
            Container::inspect(&callable),
            vec![DependencyKey::APP, DependencyKey::APP_CONFIG]
        );
    }

    #[test]
    fn test_typed_access_checks_type_and_declaration() {
        let container = Container::new();
        container.register("port", 8080u16);

        let callable = injectable("test", ["port"], |deps| {
            let wrong = deps.get::<String>("port").unwrap_err();
            assert!(matches!(wrong, KboxError::DependencyType { .. }));
            let undeclared = deps.get::<u16>("host").unwrap_err();
            assert!(matches!(undeclared, KboxError::UndeclaredDependency { .. }));
            Ok(())
        });
        container.call(&callable).unwrap();

        assert!(matches!(
            container.get::<u16>("missing"),
            Err(KboxError::UnresolvedDependency { .. })
        ));
    }

    #[test]
    fn test_overrides_restore_prior_binding() {
        let (container, original) = container_with_plugin("global");

        let seen = container.with_overrides(
            Overrides::new()
                .with(DependencyKey::PLUGIN, String::from("db"))
                .with("extra", 1u8),
            || {
                assert!(container.contains("extra"));
                container.get::<String>("plugin").unwrap()
            },
        );

        assert_eq!(seen.as_str(), "db");
        assert_same(&container, "plugin", &original);
        assert!(!container.contains("extra"), "new keys must be unbound after the scope");
    }

    #[test]
    fn test_overrides_restore_on_error() {
        let (container, original) = container_with_plugin("global");

        let result: anyhow::Result<()> =
            container.with_overrides(Overrides::new().with("plugin", String::from("db")), || {
                anyhow::bail!("initializer failed")
            });

        assert!(result.is_err());
        assert_same(&container, "plugin", &original);
    }

    #[test]
    fn test_overrides_restore_before_panic_propagates() {
        let (container, original) = container_with_plugin("global");

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            container.with_overrides(Overrides::new().with("plugin", String::from("db")), || {
                panic!("initializer panicked")
            })
        }));

        assert!(outcome.is_err());
        assert_same(&container, "plugin", &original);
    }

    #[test]
    fn test_nested_overrides_unwind_in_order() {
        let (container, original) = container_with_plugin("global");

        container.with_overrides(Overrides::new().with("plugin", String::from("outer")), || {
            container.with_overrides(Overrides::new().with("plugin", String::from("inner")), || {
                assert_eq!(container.get::<String>("plugin").unwrap().as_str(), "inner");
            });
            assert_eq!(container.get::<String>("plugin").unwrap().as_str(), "outer");
        });

        assert_same(&container, "plugin", &original);
    }

    #[test]
    fn test_same_key_twice_in_one_scope() {
        let (container, original) = container_with_plugin("global");

        container.with_overrides(
            Overrides::new()
                .with("plugin", String::from("first"))
                .with("plugin", String::from("second")),
            || assert_eq!(container.get::<String>("plugin").unwrap().as_str(), "second"),
        );

        assert_same(&container, "plugin", &original);
    }

    #[tokio::test]
    async fn test_async_overrides_last_until_completion() {
        let (container, original) = container_with_plugin("global");

        let seen = container
            .with_overrides_async(Overrides::new().with("plugin", String::from("db")), || async {
                tokio::task::yield_now().await;
                container.get::<String>("plugin").unwrap()
            })
            .await;

        assert_eq!(seen.as_str(), "db");
        assert_same(&container, "plugin", &original);
    }

    #[tokio::test]
    async fn test_async_overrides_restore_when_scope_never_completes() {
        let (container, original) = container_with_plugin("global");

        let timed_out = tokio::time::timeout(
            Duration::from_millis(20),
            container.with_overrides_async(Overrides::new().with("plugin", String::from("db")), || {
                std::future::pending::<()>()
            }),
        )
        .await;

        assert!(timed_out.is_err());
        assert_same(&container, "plugin", &original);
    }
}
