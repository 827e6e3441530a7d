//! Domain type registry.
//!
//! Every value a vocabulary works with belongs to a named domain type. A
//! `TypeDescriptor` carries everything the engine needs to know about one:
//!
//! - singular and plural names (patterns write `%location%` / `%locations%`)
//! - an instance check (which `Value`s belong to the type)
//! - an optional parser (literal text -> value) used for literal fallback
//! - an optional printer (value -> display text)
//!
//! Descriptors are interned into a `TypeRegistry` and addressed by `TypeId`,
//! a plain index into the descriptor vector. The registry is filled once at
//! start-up and read-only afterwards, so ids stay stable for the life of the
//! process.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::Value;
use crate::error::RegistryError;

/// Type identifier (index into the descriptor vector).
pub type TypeId = usize;

pub type InstanceFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;
pub type TypeParseFn = Arc<dyn Fn(&str) -> Option<Value> + Send + Sync>;
pub type TypePrintFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// Everything registered about one domain type.
pub struct TypeDescriptor {
    pub name: &'static str,
    pub plural: &'static str,
    instance: InstanceFn,
    parser: Option<TypeParseFn>,
    printer: Option<TypePrintFn>,
}

impl TypeDescriptor {
    pub fn new(
        name: &'static str,
        plural: &'static str,
        instance: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        TypeDescriptor { name, plural, instance: Arc::new(instance), parser: None, printer: None }
    }

    pub fn with_parser(mut self, parser: impl Fn(&str) -> Option<Value> + Send + Sync + 'static) -> Self {
        self.parser = Some(Arc::new(parser));
        self
    }

    pub fn with_printer(mut self, printer: impl Fn(&Value) -> String + Send + Sync + 'static) -> Self {
        self.printer = Some(Arc::new(printer));
        self
    }

    pub fn is_instance(&self, value: &Value) -> bool {
        (self.instance)(value)
    }

    pub fn parse(&self, text: &str) -> Option<Value> {
        self.parser.as_ref().and_then(|p| p(text))
    }

    pub fn print(&self, value: &Value) -> Option<String> {
        self.printer.as_ref().map(|p| p(value))
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("plural", &self.plural)
            .field("parser", &self.parser.is_some())
            .field("printer", &self.printer.is_some())
            .finish()
    }
}

/// Interned, name-addressed set of type descriptors.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    descriptors: Vec<TypeDescriptor>,
    by_name: HashMap<&'static str, TypeId>,
    by_plural: HashMap<&'static str, TypeId>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor. Both the singular and plural names must be new.
    pub fn register(&mut self, descriptor: TypeDescriptor) -> Result<TypeId, RegistryError> {
        for name in [descriptor.name, descriptor.plural] {
            if self.by_name.contains_key(name) || self.by_plural.contains_key(name) {
                return Err(RegistryError::DuplicateType(name.to_string()));
            }
        }
        let id = self.descriptors.len();
        self.by_name.insert(descriptor.name, id);
        self.by_plural.insert(descriptor.plural, id);
        self.descriptors.push(descriptor);
        Ok(id)
    }

    /// Look a type up by its singular name.
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// Resolve a placeholder name to `(type, plural)`.
    ///
    /// `%location%` resolves through the singular name, `%locations%`
    /// through the plural one and flags the slot as multi-valued.
    pub fn lookup_placeholder(&self, name: &str) -> Option<(TypeId, bool)> {
        if let Some(&id) = self.by_name.get(name) {
            return Some((id, false));
        }
        self.by_plural.get(name).map(|&id| (id, true))
    }

    pub fn get(&self, id: TypeId) -> &TypeDescriptor {
        &self.descriptors[id]
    }

    pub fn name(&self, id: TypeId) -> &'static str {
        self.descriptors[id].name
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// First registered type the value is an instance of, if any.
    pub fn type_of(&self, value: &Value) -> Option<TypeId> {
        self.descriptors.iter().position(|d| d.is_instance(value))
    }

    pub fn ids(&self) -> impl Iterator<Item = TypeId> + use<> {
        0..self.descriptors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number_type() -> TypeDescriptor {
        TypeDescriptor::new("number", "numbers", |v| matches!(v, Value::Number(_)))
            .with_parser(|s| s.parse::<f64>().ok().map(Value::Number))
    }

    #[test]
    fn register_and_lookup() {
        let mut reg = TypeRegistry::new();
        let id = reg.register(number_type()).unwrap();
        assert_eq!(reg.lookup("number"), Some(id));
        assert_eq!(reg.lookup("numbers"), None);
        assert_eq!(reg.lookup_placeholder("number"), Some((id, false)));
        assert_eq!(reg.lookup_placeholder("numbers"), Some((id, true)));
        assert_eq!(reg.lookup_placeholder("nonsense"), None);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut reg = TypeRegistry::new();
        reg.register(number_type()).unwrap();
        let err = reg.register(number_type()).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateType(name) if name == "number"));
    }

    #[test]
    fn plural_collision_is_rejected() {
        let mut reg = TypeRegistry::new();
        reg.register(number_type()).unwrap();
        let clash = TypeDescriptor::new("numbers", "numberses", |_| false);
        assert!(matches!(reg.register(clash), Err(RegistryError::DuplicateType(_))));
    }

    #[test]
    fn type_of_uses_registration_order() {
        let mut reg = TypeRegistry::new();
        let num = reg.register(number_type()).unwrap();
        reg.register(TypeDescriptor::new("quantity", "quantities", |v| matches!(v, Value::Number(_)))).unwrap();
        assert_eq!(reg.type_of(&Value::Number(1.0)), Some(num));
    }

    #[test]
    fn parse_through_descriptor() {
        let mut reg = TypeRegistry::new();
        let id = reg.register(number_type()).unwrap();
        assert_eq!(reg.get(id).parse("64"), Some(Value::Number(64.0)));
        assert_eq!(reg.get(id).parse("the wind"), None);
    }
}
