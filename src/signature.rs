//! Schema signatures.
//!
//! A [`Signature`] is an immutable fragment of the declarative schema that a
//! document is bound to. It is parsed once from a `serde_json::Value` and then
//! shared by every node, validator and walker that needs it.
//!
//! Reserved leaf keys are `type`, `required`, `default`, `extensible` and
//! `restrict`. Branch keys are `elements` (alias `properties`) and
//! `polymorphic`. The key `*` declares a wildcard child.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::{json, Map, Value};

use crate::error::SignatureError;
use crate::path::DocPath;

/// Keys describing the fragment itself rather than a child.
pub const RESERVED_KEYS: [&str; 5] = ["type", "required", "default", "extensible", "restrict"];

/// The wildcard child key.
pub const WILDCARD: &str = "*";

const ELEMENTS: &str = "elements";
const PROPERTIES: &str = "properties";
const POLYMORPHIC: &str = "polymorphic";

/// A type name accepted in a signature's `type` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeName {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Null,
    Any,
}

impl TypeName {
    /// Parses a type name, ignoring case. `*` means any type.
    pub fn parse(name: &str) -> Option<Self> {
        let parsed = match name.to_ascii_lowercase().as_str() {
            "string" => TypeName::String,
            "number" => TypeName::Number,
            "integer" => TypeName::Integer,
            "boolean" => TypeName::Boolean,
            "object" => TypeName::Object,
            "array" => TypeName::Array,
            "null" => TypeName::Null,
            "*" | "any" => TypeName::Any,
            _ => return None,
        };
        Some(parsed)
    }

    /// Lower-case name used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeName::String => "string",
            TypeName::Number => "number",
            TypeName::Integer => "integer",
            TypeName::Boolean => "boolean",
            TypeName::Object => "object",
            TypeName::Array => "array",
            TypeName::Null => "null",
            TypeName::Any => "*",
        }
    }

    /// Returns true if `value` is of this type.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            TypeName::String => value.is_string(),
            TypeName::Number => value.is_number(),
            TypeName::Integer => value.is_i64() || value.is_u64(),
            TypeName::Boolean => value.is_boolean(),
            TypeName::Object => value.is_object(),
            TypeName::Array => value.is_array(),
            TypeName::Null => value.is_null(),
            TypeName::Any => true,
        }
    }
}

/// The `polymorphic` entry of a child map.
#[derive(Debug, Clone)]
pub enum Polymorphic {
    /// One alternative, usable at the parent path and at `path.0`.
    Single(Signature),
    /// Positional alternatives bound to `path.0`, `path.1`, ...
    Ordered(Vec<Signature>),
}

impl Polymorphic {
    /// The alternative bound to a child key.
    ///
    /// Ordered alternatives bind strictly by position; a key that is not an
    /// index in range has no alternative.
    pub fn alternative(&self, key: &str) -> Option<Signature> {
        match self {
            Polymorphic::Single(sig) => Some(sig.clone()),
            Polymorphic::Ordered(alts) => key.parse::<usize>().ok().and_then(|i| alts.get(i).cloned()),
        }
    }

    /// The alternative bound to a position.
    pub fn at(&self, index: usize) -> Option<Signature> {
        match self {
            Polymorphic::Single(sig) => Some(sig.clone()),
            Polymorphic::Ordered(alts) => alts.get(index).cloned(),
        }
    }
}

/// An immutable schema fragment.
///
/// Cloning is cheap; the underlying map is shared.
///
/// # Example
///
/// ```rust
/// use livedoc::Signature;
/// use serde_json::json;
///
/// let sig = Signature::parse(json!({
///     "properties": {
///         "name": {"type": "String", "required": true}
///     }
/// })).unwrap();
///
/// let name = sig.children().entry("name").unwrap();
/// assert!(name.is_required());
/// ```
#[derive(Clone, PartialEq)]
pub struct Signature {
    map: Arc<Map<String, Value>>,
}

impl Signature {
    /// Parses and checks a signature tree.
    ///
    /// # Errors
    ///
    /// Fails when any fragment is not an object, names an unknown type, carries
    /// an invalid `restrict` pattern or a malformed `polymorphic` entry.
    pub fn parse(value: Value) -> Result<Self, SignatureError> {
        match value {
            Value::Object(map) => {
                let sig = Signature { map: Arc::new(map) };
                sig.check(&DocPath::root())?;
                Ok(sig)
            }
            _ => Err(SignatureError::NotAnObject(DocPath::root())),
        }
    }

    /// The accept-anything signature used for undeclared keys of extensible nodes.
    pub fn default_signature() -> Self {
        let mut map = Map::new();
        map.insert("type".to_string(), json!("*"));
        Signature { map: Arc::new(map) }
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        Signature {
            map: Arc::new(map.clone()),
        }
    }

    /// The declared type names. Empty when `type` is absent.
    pub fn types(&self) -> Vec<TypeName> {
        match self.map.get("type") {
            Some(Value::String(name)) => TypeName::parse(name).into_iter().collect(),
            Some(Value::Array(names)) => names
                .iter()
                .filter_map(Value::as_str)
                .filter_map(TypeName::parse)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Returns true if the fragment demands a value to be present.
    pub fn is_required(&self) -> bool {
        self.map.get("required").and_then(Value::as_bool).unwrap_or(false)
    }

    /// The declared default value, if any.
    pub fn default_value(&self) -> Option<&Value> {
        self.map.get("default")
    }

    /// The explicit `extensible` option, if any.
    pub fn extensible(&self) -> Option<bool> {
        self.map.get("extensible").and_then(Value::as_bool)
    }

    /// The `restrict` pattern, if any.
    pub fn restrict(&self) -> Option<&str> {
        self.map.get("restrict").and_then(Value::as_str)
    }

    /// The nested signature under `elements` (or `properties`).
    pub fn elements(&self) -> Option<Signature> {
        [ELEMENTS, PROPERTIES]
            .iter()
            .find_map(|k| self.map.get(*k).and_then(Value::as_object))
            .map(Signature::from_map)
    }

    /// The child map of this fragment: its `elements` when present, itself otherwise.
    pub fn children(&self) -> Signature {
        self.elements().unwrap_or_else(|| self.clone())
    }

    /// The `polymorphic` entry of this map.
    pub fn polymorphic(&self) -> Option<Polymorphic> {
        match self.map.get(POLYMORPHIC)? {
            Value::Object(map) => Some(Polymorphic::Single(Signature::from_map(map))),
            Value::Array(items) => Some(Polymorphic::Ordered(
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .map(Signature::from_map)
                    .collect(),
            )),
            _ => None,
        }
    }

    /// The wildcard entry of this map.
    pub fn wildcard(&self) -> Option<Signature> {
        self.map
            .get(WILDCARD)
            .and_then(Value::as_object)
            .map(Signature::from_map)
    }

    /// A literal child declared under `key`.
    ///
    /// Reserved keys, branch keys and the wildcard never resolve literally.
    pub fn entry(&self, key: &str) -> Option<Signature> {
        if is_structural_key(key) {
            return None;
        }
        self.map
            .get(key)
            .and_then(Value::as_object)
            .map(Signature::from_map)
    }

    /// Literal children declared in this map, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, Signature)> + '_ {
        self.map.iter().filter_map(|(k, v)| {
            if is_structural_key(k) {
                return None;
            }
            v.as_object().map(|m| (k.as_str(), Signature::from_map(m)))
        })
    }

    /// Every non-reserved key of this map, in declaration order.
    ///
    /// This includes `elements`, `properties`, `polymorphic` and `*`; it is the
    /// key set the schema walker iterates.
    pub(crate) fn walk_keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.map
            .keys()
            .map(String::as_str)
            .filter(|k| !RESERVED_KEYS.contains(k))
    }

    /// Returns true if the child map declares any child (literal, wildcard or polymorphic).
    pub fn declares_children(&self) -> bool {
        let children = self.children();
        children.fields().next().is_some()
            || children.wildcard().is_some()
            || children.polymorphic().is_some()
    }

    /// Returns true if the fragment describes an ordered collection.
    pub fn is_list(&self) -> bool {
        matches!(self.types().as_slice(), [TypeName::Array])
    }

    /// Returns true if the fragment describes a keyed object.
    pub fn is_object(&self) -> bool {
        match self.types().as_slice() {
            [TypeName::Object] => true,
            [] => self.declares_children(),
            _ => false,
        }
    }

    /// Extensibility of a node bound to this fragment.
    ///
    /// An explicit `extensible` wins. Otherwise a fragment that declares no
    /// children accepts any key, and one that does inherits from its parent.
    pub fn is_extensible(&self, inherited: bool) -> bool {
        self.extensible()
            .unwrap_or_else(|| inherited || !self.declares_children())
    }

    /// The raw JSON form of this fragment.
    pub fn to_value(&self) -> Value {
        Value::Object((*self.map).clone())
    }

    fn check(&self, path: &DocPath) -> Result<(), SignatureError> {
        match self.map.get("type") {
            Some(Value::String(name)) => check_type_name(name, path)?,
            Some(Value::Array(names)) => {
                for name in names {
                    let name = name.as_str().ok_or_else(|| SignatureError::UnknownType {
                        path: path.clone(),
                        name: name.to_string(),
                    })?;
                    check_type_name(name, path)?;
                }
            }
            _ => {}
        }

        if let Some(pattern) = self.restrict() {
            Regex::new(pattern).map_err(|source| SignatureError::InvalidPattern {
                path: path.clone(),
                source,
            })?;
        }

        for (key, value) in self.map.iter() {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            let child_path = if key == ELEMENTS || key == PROPERTIES {
                path.clone()
            } else {
                path.push_field(key)
            };
            match (key.as_str(), value) {
                (POLYMORPHIC, Value::Object(map)) => {
                    Signature::from_map(map).check(&child_path)?;
                }
                (POLYMORPHIC, Value::Array(items)) => {
                    for (i, item) in items.iter().enumerate() {
                        let map = item
                            .as_object()
                            .ok_or_else(|| SignatureError::InvalidPolymorphic(path.clone()))?;
                        Signature::from_map(map).check(&path.push_index(i))?;
                    }
                }
                (POLYMORPHIC, _) => return Err(SignatureError::InvalidPolymorphic(path.clone())),
                (ELEMENTS | PROPERTIES | WILDCARD, Value::Object(map)) => {
                    Signature::from_map(map).check(&child_path)?;
                }
                (ELEMENTS | PROPERTIES | WILDCARD, _) => {
                    return Err(SignatureError::NotAnObject(child_path))
                }
                (_, Value::Object(map)) => Signature::from_map(map).check(&child_path)?,
                _ => {}
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", Value::Object((*self.map).clone()))
    }
}

fn check_type_name(name: &str, path: &DocPath) -> Result<(), SignatureError> {
    TypeName::parse(name)
        .map(|_| ())
        .ok_or_else(|| SignatureError::UnknownType {
            path: path.clone(),
            name: name.to_string(),
        })
}

/// Keys that never name a literal child.
fn is_structural_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
        || key == ELEMENTS
        || key == PROPERTIES
        || key == POLYMORPHIC
        || key == WILDCARD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(matches!(
            Signature::parse(json!("String")),
            Err(SignatureError::NotAnObject(_))
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        let err = Signature::parse(json!({"a": {"type": "Strng"}})).unwrap_err();
        match err {
            SignatureError::UnknownType { path, name } => {
                assert_eq!(path.to_string(), "a");
                assert_eq!(name, "Strng");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_pattern() {
        let err = Signature::parse(json!({"a": {"type": "String", "restrict": "("}})).unwrap_err();
        assert!(matches!(err, SignatureError::InvalidPattern { .. }));
    }

    #[test]
    fn test_parse_rejects_scalar_polymorphic() {
        let err = Signature::parse(json!({"polymorphic": 3})).unwrap_err();
        assert!(matches!(err, SignatureError::InvalidPolymorphic(_)));
    }

    #[test]
    fn test_leaf_accessors() {
        let sig = Signature::parse(json!({
            "type": "String",
            "required": true,
            "default": "x",
            "restrict": "^[a-z]+$",
            "extensible": false
        }))
        .unwrap();
        assert_eq!(sig.types(), vec![TypeName::String]);
        assert!(sig.is_required());
        assert_eq!(sig.default_value(), Some(&json!("x")));
        assert_eq!(sig.restrict(), Some("^[a-z]+$"));
        assert_eq!(sig.extensible(), Some(false));
    }

    #[test]
    fn test_type_list() {
        let sig = Signature::parse(json!({"type": ["String", "number"]})).unwrap();
        assert_eq!(sig.types(), vec![TypeName::String, TypeName::Number]);
    }

    #[test]
    fn test_children_prefers_elements() {
        let sig = Signature::parse(json!({
            "type": "Object",
            "elements": {"a": {"type": "String"}}
        }))
        .unwrap();
        let children = sig.children();
        assert!(children.entry("a").is_some());
        assert!(sig.entry("a").is_none());
        assert!(sig.is_object());
    }

    #[test]
    fn test_properties_is_elements_alias() {
        let sig = Signature::parse(json!({"properties": {"a": {"type": "String"}}})).unwrap();
        assert!(sig.children().entry("a").is_some());
    }

    #[test]
    fn test_entry_skips_structural_keys() {
        let sig = Signature::parse(json!({
            "*": {"type": "*"},
            "type": "Object",
            "name": {"type": "String"}
        }))
        .unwrap();
        assert!(sig.entry("*").is_none());
        assert!(sig.entry("type").is_none());
        assert!(sig.entry("name").is_some());
        assert!(sig.wildcard().is_some());
        let fields: Vec<_> = sig.fields().map(|(k, _)| k.to_string()).collect();
        assert_eq!(fields, vec!["name"]);
    }

    #[test]
    fn test_polymorphic_positional_binding() {
        let sig = Signature::parse(json!({
            "polymorphic": [{"type": "String"}, {"type": "Number"}]
        }))
        .unwrap();
        let poly = sig.polymorphic().unwrap();
        assert_eq!(poly.alternative("1").unwrap().types(), vec![TypeName::Number]);
        assert!(poly.alternative("2").is_none());
        assert!(poly.alternative("name").is_none());
    }

    #[test]
    fn test_polymorphic_single() {
        let sig = Signature::parse(json!({"polymorphic": {"type": "String"}})).unwrap();
        let poly = sig.polymorphic().unwrap();
        assert!(matches!(poly, Polymorphic::Single(_)));
        assert!(poly.alternative("anything").is_some());
        assert!(poly.at(7).is_some());
    }

    #[test]
    fn test_extensibility_rules() {
        let open = Signature::parse(json!({"type": "Object"})).unwrap();
        assert!(open.is_extensible(false));

        let closed = Signature::parse(json!({"properties": {"a": {"type": "String"}}})).unwrap();
        assert!(!closed.is_extensible(false));
        assert!(closed.is_extensible(true));

        let explicit = Signature::parse(json!({"type": "Object", "extensible": false})).unwrap();
        assert!(!explicit.is_extensible(true));
    }

    #[test]
    fn test_list_shape() {
        let sig = Signature::parse(json!({"type": "Array", "elements": {"type": "String"}})).unwrap();
        assert!(sig.is_list());
        assert!(!sig.is_object());
    }

    #[test]
    fn test_type_name_matching() {
        assert!(TypeName::Integer.matches(&json!(3)));
        assert!(!TypeName::Integer.matches(&json!(3.5)));
        assert!(TypeName::Number.matches(&json!(3.5)));
        assert!(TypeName::Any.matches(&json!(null)));
        assert_eq!(TypeName::parse("STRING"), Some(TypeName::String));
        assert_eq!(TypeName::parse("*"), Some(TypeName::Any));
    }
}
