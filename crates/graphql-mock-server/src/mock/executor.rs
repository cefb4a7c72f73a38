//! Mock execution of a validated operation
//!
//! Walks the operation's selection sets against the schema and answers every
//! field with a generated value. Values are remembered in the [`MockStore`]
//! so an object looks the same every time it is reached by the same path.

use std::collections::{HashMap, HashSet};

use apollo_compiler::{
    ExecutableDocument, Name, Node, Schema,
    ast::{self, DirectiveList},
    executable::{Field, Selection, SelectionSet},
    schema::ExtendedType,
};
use rand::{Rng, rngs::StdRng};
use serde_json::{Map, Value};

use crate::graphql::Error;

use super::{
    MockOptions,
    store::{Mock, MockStore, ObjectRef},
    values,
};

pub(crate) const SCHEMA_FIELD: &str = "__schema";
pub(crate) const TYPE_FIELD: &str = "__type";
pub(crate) const TYPENAME_FIELD: &str = "__typename";

/// Mutable state shared by every request against a mocked schema
pub(crate) struct MockState {
    pub(crate) store: MockStore,
    pub(crate) rng: StdRng,
}

/// Fields of one selection set grouped by response key, in selection order
type GroupedFields<'doc> = Vec<(Name, Vec<&'doc Node<Field>>)>;

pub(crate) struct Executor<'a> {
    pub(crate) schema: &'a Schema,
    pub(crate) document: &'a ExecutableDocument,
    pub(crate) possible_types: &'a HashMap<Name, Vec<Name>>,
    pub(crate) options: &'a MockOptions,
    pub(crate) variables: &'a Map<String, Value>,
    pub(crate) state: &'a mut MockState,
    /// Field errors raised while mocking
    pub(crate) errors: Vec<Error>,
}

impl<'a> Executor<'a> {
    /// Execute the root selection set of an operation.
    ///
    /// `introspection` holds the already computed answers for `__schema` and
    /// `__type`, keyed by response key.
    pub(crate) fn execute_root(
        &mut self,
        root_type: &Name,
        selection_set: &'a SelectionSet,
        introspection: &Map<String, Value>,
    ) -> Map<String, Value> {
        let root = ObjectRef::root(root_type.clone());
        let grouped = self.collect_fields(&root.type_name, [selection_set]);

        let mut data = Map::new();
        for (response_key, fields) in grouped {
            let Some(field) = fields.first() else {
                continue;
            };
            let value = if is_introspection_field(&field.name) {
                introspection
                    .get(response_key.as_str())
                    .cloned()
                    .unwrap_or(Value::Null)
            } else {
                self.execute_field(&root, &fields)
            };
            data.insert(response_key.to_string(), value);
        }
        data
    }

    fn execute_selection_sets(
        &mut self,
        object: &ObjectRef,
        selection_sets: Vec<&'a SelectionSet>,
    ) -> Map<String, Value> {
        let grouped = self.collect_fields(&object.type_name, selection_sets);

        let mut result = Map::new();
        for (response_key, fields) in grouped {
            let value = self.execute_field(object, &fields);
            result.insert(response_key.to_string(), value);
        }
        result
    }

    /// Resolve and complete one response key. All fields share the same name
    /// and arguments, validation guarantees it.
    fn execute_field(&mut self, object: &ObjectRef, fields: &[&'a Node<Field>]) -> Value {
        let Some(field) = fields.first() else {
            return Value::Null;
        };
        if field.name.as_str() == TYPENAME_FIELD {
            return Value::String(object.type_name.to_string());
        }

        let named_type = field.ty().inner_named_type();
        if self.has_no_possible_types(named_type) {
            self.errors.push(Error::new(format!(
                "Cannot mock field \"{}.{}\": abstract type \"{named_type}\" has no possible types.",
                object.type_name, field.name
            )));
            return Value::Null;
        }

        let mock = self.resolve_field(object, field);
        let selection_sets: Vec<&'a SelectionSet> =
            fields.iter().map(|field| &field.selection_set).collect();
        self.complete_value(&mock, &selection_sets)
    }

    fn resolve_field(&mut self, object: &ObjectRef, field: &Field) -> Mock {
        let field_key = field_key(field, self.variables);
        if let Some(mock) = self.state.store.get(object, &field_key) {
            return mock.clone();
        }

        let mock = self.generate(field.ty());
        self.state.store.insert(object, field_key, mock.clone());
        mock
    }

    fn complete_value(&mut self, mock: &Mock, selection_sets: &[&'a SelectionSet]) -> Value {
        match mock {
            Mock::Leaf(value) => value.clone(),
            Mock::List(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.complete_value(item, selection_sets))
                    .collect(),
            ),
            Mock::Object(object) => {
                Value::Object(self.execute_selection_sets(object, selection_sets.to_vec()))
            }
        }
    }

    /// Generate an unshaped value for a field of type `ty`
    fn generate(&mut self, ty: &ast::Type) -> Mock {
        match ty {
            ast::Type::List(item) | ast::Type::NonNullList(item) => Mock::List(
                (0..self.options.list_length)
                    .map(|_| self.generate(item))
                    .collect(),
            ),
            ast::Type::Named(name) | ast::Type::NonNullNamed(name) => self.generate_named(name),
        }
    }

    fn generate_named(&mut self, name: &Name) -> Mock {
        let schema = self.schema;
        match schema.types.get(name) {
            Some(ExtendedType::Scalar(_)) => Mock::Leaf(values::scalar(
                name,
                &self.options.scalar_mocks,
                &mut self.state.rng,
            )),
            Some(ExtendedType::Enum(enum_type)) => {
                Mock::Leaf(values::enum_value(enum_type, &mut self.state.rng))
            }
            Some(ExtendedType::Object(_)) => Mock::Object(self.new_object(name.clone())),
            Some(ExtendedType::Interface(_) | ExtendedType::Union(_)) => {
                match self.pick_possible_type(name) {
                    Some(concrete) => Mock::Object(self.new_object(concrete)),
                    None => Mock::Leaf(Value::Null),
                }
            }
            // Input objects never appear in output position of a valid schema
            Some(ExtendedType::InputObject(_)) | None => Mock::Leaf(Value::Null),
        }
    }

    /// Create a new object of the given concrete type. Objects with a scalar or
    /// enum `id` field are keyed by the mocked id, others by a random UUID.
    /// Any other `id` is mocked lazily like a regular field.
    fn new_object(&mut self, type_name: Name) -> ObjectRef {
        let schema = self.schema;
        let id_type = schema
            .get_object(&type_name)
            .and_then(|object| object.fields.get("id"))
            .map(|field| field.ty.clone())
            .filter(|ty| {
                !ty.is_list()
                    && matches!(
                        schema.types.get(ty.inner_named_type()),
                        Some(ExtendedType::Scalar(_) | ExtendedType::Enum(_))
                    )
            });

        match id_type {
            Some(id_type) => {
                let id = self.generate(&id_type);
                let key = match &id {
                    Mock::Leaf(Value::String(id)) => id.clone(),
                    Mock::Leaf(value) => value.to_string(),
                    _ => values::uuid(&mut self.state.rng),
                };
                let object = ObjectRef::new(type_name, key);
                self.state.store.insert(&object, "id", id);
                object
            }
            None => ObjectRef::new(type_name, values::uuid(&mut self.state.rng)),
        }
    }

    fn has_no_possible_types(&self, type_name: &Name) -> bool {
        self.possible_types
            .get(type_name)
            .is_some_and(|candidates| candidates.is_empty())
    }

    fn pick_possible_type(&mut self, abstract_type: &Name) -> Option<Name> {
        let candidates = self.possible_types.get(abstract_type)?;
        if candidates.is_empty() {
            return None;
        }
        let index = self.state.rng.random_range(0..candidates.len());
        candidates.get(index).cloned()
    }

    /// Group the fields of `selection_sets` that apply to `object_type` by
    /// response key, following fragments and honouring `@skip`/`@include`
    fn collect_fields(
        &self,
        object_type: &Name,
        selection_sets: impl IntoIterator<Item = &'a SelectionSet>,
    ) -> GroupedFields<'a> {
        let mut grouped = GroupedFields::new();
        let mut visited_fragments = HashSet::new();
        for selection_set in selection_sets {
            self.collect_fields_into(
                object_type,
                selection_set,
                &mut visited_fragments,
                &mut grouped,
            );
        }
        grouped
    }

    fn collect_fields_into(
        &self,
        object_type: &Name,
        selection_set: &'a SelectionSet,
        visited_fragments: &mut HashSet<&'a Name>,
        grouped: &mut GroupedFields<'a>,
    ) {
        for selection in &selection_set.selections {
            match selection {
                Selection::Field(field) => {
                    if !self.should_include(&field.directives) {
                        continue;
                    }
                    let response_key = field.response_key();
                    match grouped.iter_mut().find(|(key, _)| *key == *response_key) {
                        Some((_, fields)) => fields.push(field),
                        None => grouped.push((response_key.clone(), vec![field])),
                    }
                }
                Selection::FragmentSpread(spread) => {
                    if !self.should_include(&spread.directives)
                        || !visited_fragments.insert(&spread.fragment_name)
                    {
                        continue;
                    }
                    let document = self.document;
                    let Some(fragment) = document.fragments.get(&spread.fragment_name) else {
                        continue;
                    };
                    if self.type_applies(object_type, fragment.type_condition()) {
                        self.collect_fields_into(
                            object_type,
                            &fragment.selection_set,
                            visited_fragments,
                            grouped,
                        );
                    }
                }
                Selection::InlineFragment(inline) => {
                    if !self.should_include(&inline.directives) {
                        continue;
                    }
                    let applies = inline
                        .type_condition
                        .as_ref()
                        .is_none_or(|condition| self.type_applies(object_type, condition));
                    if applies {
                        self.collect_fields_into(
                            object_type,
                            &inline.selection_set,
                            visited_fragments,
                            grouped,
                        );
                    }
                }
            }
        }
    }

    fn type_applies(&self, object_type: &Name, type_condition: &Name) -> bool {
        object_type == type_condition || self.schema.is_subtype(type_condition, object_type)
    }

    fn should_include(&self, directives: &DirectiveList) -> bool {
        if directives
            .get("skip")
            .is_some_and(|skip| self.condition(skip))
        {
            return false;
        }
        directives
            .get("include")
            .is_none_or(|include| self.condition(include))
    }

    /// Value of the `if` argument of `@skip` or `@include`
    fn condition(&self, directive: &ast::Directive) -> bool {
        directive
            .arguments
            .iter()
            .find(|argument| argument.name.as_str() == "if")
            .is_some_and(|argument| match &*argument.value {
                ast::Value::Boolean(condition) => *condition,
                ast::Value::Variable(variable) => self
                    .variables
                    .get(variable.as_str())
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                _ => false,
            })
    }
}

/// Root fields answered by schema introspection rather than by mocks
pub(crate) fn is_introspection_field(name: &str) -> bool {
    name == SCHEMA_FIELD || name == TYPE_FIELD
}

/// Store key for a field: its name, plus its arguments when it has any
pub(crate) fn field_key(field: &Field, variables: &Map<String, Value>) -> String {
    if field.arguments.is_empty() {
        return field.name.to_string();
    }

    let mut arguments: Vec<_> = field.arguments.iter().collect();
    arguments.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));
    let arguments: Map<String, Value> = arguments
        .into_iter()
        .map(|argument| {
            (
                argument.name.to_string(),
                value_to_json(&argument.value, variables),
            )
        })
        .collect();

    format!("{}:{}", field.name, Value::Object(arguments))
}

fn value_to_json(value: &ast::Value, variables: &Map<String, Value>) -> Value {
    match value {
        ast::Value::Null => Value::Null,
        ast::Value::Enum(name) => Value::String(name.to_string()),
        ast::Value::Variable(name) => variables
            .get(name.as_str())
            .cloned()
            .unwrap_or(Value::Null),
        ast::Value::String(string) => Value::String(string.clone()),
        ast::Value::Float(float) => float
            .try_to_f64()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(float.as_str().to_string())),
        ast::Value::Int(int) => int
            .as_str()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(int.as_str().to_string())),
        ast::Value::Boolean(boolean) => Value::Bool(*boolean),
        ast::Value::List(items) => Value::Array(
            items
                .iter()
                .map(|item| value_to_json(item, variables))
                .collect(),
        ),
        ast::Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(name, value)| (name.to_string(), value_to_json(value, variables)))
                .collect(),
        ),
    }
}
