//! Memory of generated mock values
//!
//! Values are remembered per object and field so that asking for the same
//! data twice gives the same answer for as long as the server runs.

use std::collections::HashMap;

use apollo_compiler::Name;
use serde_json::Value;

/// Key used for the singleton objects behind root operation types
pub(crate) const ROOT_KEY: &str = "ROOT";

/// A mocked object, identified by its concrete type and a key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ObjectRef {
    pub(crate) type_name: Name,
    pub(crate) key: String,
}

impl ObjectRef {
    pub(crate) fn new(type_name: Name, key: impl Into<String>) -> Self {
        Self {
            type_name,
            key: key.into(),
        }
    }

    pub(crate) fn root(type_name: Name) -> Self {
        Self::new(type_name, ROOT_KEY)
    }
}

/// A generated field value before it is shaped by a selection set
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Mock {
    /// A scalar or enum value
    Leaf(Value),
    List(Vec<Mock>),
    Object(ObjectRef),
}

/// Generated values for the lifetime of the server.
///
/// Entries are never evicted: every distinct object and every distinct set of
/// field arguments adds one, so memory grows with the variety of requests.
#[derive(Debug, Default)]
pub(crate) struct MockStore {
    objects: HashMap<ObjectRef, HashMap<String, Mock>>,
}

impl MockStore {
    pub(crate) fn get(&self, object: &ObjectRef, field_key: &str) -> Option<&Mock> {
        self.objects
            .get(object)
            .and_then(|fields| fields.get(field_key))
    }

    pub(crate) fn insert(&mut self, object: &ObjectRef, field_key: impl Into<String>, mock: Mock) {
        self.objects
            .entry(object.clone())
            .or_default()
            .insert(field_key.into(), mock);
    }

    /// Number of objects with at least one remembered field
    pub(crate) fn len(&self) -> usize {
        self.objects.len()
    }
}

#[cfg(test)]
mod tests {
    use apollo_compiler::name;
    use serde_json::json;

    use super::*;

    #[test]
    fn remembers_values_per_object() {
        let mut store = MockStore::default();
        let query = ObjectRef::root(name!("Query"));
        let user = ObjectRef::new(name!("User"), "1");

        store.insert(&query, "user", Mock::Object(user.clone()));
        store.insert(&user, "name", Mock::Leaf(json!("Hello World")));

        assert_eq!(store.get(&query, "user"), Some(&Mock::Object(user.clone())));
        assert_eq!(store.get(&user, "name"), Some(&Mock::Leaf(json!("Hello World"))));
        assert_eq!(store.get(&user, "email"), None);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn objects_with_the_same_key_but_different_types_are_distinct() {
        let mut store = MockStore::default();
        let user = ObjectRef::new(name!("User"), "1");
        let post = ObjectRef::new(name!("Post"), "1");

        store.insert(&user, "id", Mock::Leaf(json!("1")));

        assert!(store.get(&post, "id").is_none());
    }
}
