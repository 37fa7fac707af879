use std::collections::HashMap;
use std::fmt;

use super::value::Value;

/// The single field-access capability the evaluation engine knows about.
///
/// Every object a rule evaluates against, whether a domain entity or an
/// authorization-context object, is read through this one interface. A
/// `None` result is a terminal, never-thrown condition: the engine treats
/// the field as unset and every operator on it evaluates to false.
pub trait FieldSource {
    fn get_field(&self, name: &str) -> Option<Value>;
}

/// A map-backed entity instance.
///
/// The common adapter for request payloads and test fixtures; generated
/// accessor tables or hand-written adapters can implement [`FieldSource`]
/// directly instead.
#[derive(Debug, Clone, Default)]
pub struct Entity {
    values: HashMap<String, Value>,
}

impl Entity {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field value, builder-style.
    #[must_use]
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value.into());
        self
    }

    /// Insert a field value (mutable reference version).
    pub fn insert(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_owned(), value);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

impl FieldSource for Entity {
    fn get_field(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }
}

/// Authorization context: named context objects, one per metadata category.
///
/// Metadata requirement groups are evaluated against the object registered
/// under their category name; a missing entry leaves the group unsatisfied.
#[derive(Default)]
pub struct AuthContext {
    categories: HashMap<String, Box<dyn FieldSource + Send + Sync>>,
}

impl AuthContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a context object to a category name, builder-style.
    #[must_use]
    pub fn with(
        mut self,
        category: &str,
        source: impl FieldSource + Send + Sync + 'static,
    ) -> Self {
        self.categories.insert(category.to_owned(), Box::new(source));
        self
    }

    pub fn insert(&mut self, category: &str, source: impl FieldSource + Send + Sync + 'static) {
        self.categories.insert(category.to_owned(), Box::new(source));
    }

    #[must_use]
    pub fn category(&self, name: &str) -> Option<&(dyn FieldSource + Send + Sync)> {
        self.categories.get(name).map(AsRef::as_ref)
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.categories.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("AuthContext")
            .field("categories", &names)
            .finish()
    }
}
