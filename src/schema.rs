//! Schema DSL for describing the structure of extracted data.
//!
//! A schema is a tree of [`SchemaNode`]s built from the leaf constructors
//! [`string`], [`number`] and [`boolean`], and the composites [`array`] and
//! [`object`]. The root of a request schema is a [`Schema`], which is always an
//! object.
//!
//! ```rust
//! use tabstack::schema::{array, number, object, string, Schema};
//!
//! # fn main() -> Result<(), tabstack::Error> {
//! let schema = Schema::builder()
//!     .field(
//!         "stories",
//!         array(
//!             object()
//!                 .field("title", string())
//!                 .field("points", number())
//!                 .build()?,
//!         ),
//!     )
//!     .build()?;
//!
//! let json = schema.to_json_schema();
//! assert_eq!(json["properties"]["stories"]["type"], "array");
//! assert_eq!(Schema::from_json_schema(&json)?, schema);
//! # Ok(())
//! # }
//! ```
//!
//! Every declared field is required and objects never allow additional
//! properties. [`Schema::from_json_schema`] accepts exactly the subset of JSON
//! Schema that [`Schema::to_json_schema`] produces and rejects anything else
//! with [`Error::SchemaDefinition`] pointing at the offending keyword.

use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// The kind of a schema node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A JSON string.
    String,
    /// A JSON number.
    Number,
    /// A JSON boolean.
    Boolean,
    /// A JSON array whose elements all match one schema.
    Array(Box<SchemaNode>),
    /// A JSON object with a fixed, ordered set of required fields.
    Object(ObjectSchema),
}

/// One node of a schema tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaNode {
    kind: NodeKind,
    description: Option<String>,
}

/// Ordered fields of an object node. Names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjectSchema {
    fields: Vec<(String, SchemaNode)>,
}

/// A string leaf.
pub fn string() -> SchemaNode {
    SchemaNode::leaf(NodeKind::String)
}

/// A number leaf.
pub fn number() -> SchemaNode {
    SchemaNode::leaf(NodeKind::Number)
}

/// A boolean leaf.
pub fn boolean() -> SchemaNode {
    SchemaNode::leaf(NodeKind::Boolean)
}

/// An array whose elements match `element`.
pub fn array(element: SchemaNode) -> SchemaNode {
    SchemaNode::leaf(NodeKind::Array(Box::new(element)))
}

/// Start building an object node.
pub fn object() -> ObjectBuilder {
    ObjectBuilder::default()
}

impl SchemaNode {
    fn leaf(kind: NodeKind) -> Self {
        Self {
            kind,
            description: None,
        }
    }

    /// Attach a description to this node.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The node kind.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// The node description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Convert the node to its JSON Schema representation.
    pub fn to_json_schema(&self) -> Value {
        let mut out = Map::new();
        match &self.kind {
            NodeKind::String => {
                out.insert("type".into(), "string".into());
            }
            NodeKind::Number => {
                out.insert("type".into(), "number".into());
            }
            NodeKind::Boolean => {
                out.insert("type".into(), "boolean".into());
            }
            NodeKind::Array(element) => {
                out.insert("type".into(), "array".into());
                out.insert("items".into(), element.to_json_schema());
            }
            NodeKind::Object(fields) => {
                let properties: Map<String, Value> = fields
                    .iter()
                    .map(|(name, node)| (name.to_string(), node.to_json_schema()))
                    .collect();
                let required: Vec<Value> = fields.names().map(Value::from).collect();

                out.insert("type".into(), "object".into());
                out.insert("properties".into(), Value::Object(properties));
                out.insert("required".into(), Value::Array(required));
                out.insert("additionalProperties".into(), Value::Bool(false));
            }
        }
        if let Some(description) = &self.description {
            out.insert("description".into(), description.clone().into());
        }
        Value::Object(out)
    }

    /// Rebuild a node from JSON Schema.
    pub fn from_json_schema(json_schema: &Value) -> Result<Self> {
        parse_node(json_schema, "", false)
    }
}

impl ObjectSchema {
    /// Iterate fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaNode)> {
        self.fields.iter().map(|(name, node)| (name.as_str(), node))
    }

    /// Field names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&SchemaNode> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, node)| node)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the object has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn insert(&mut self, name: String, node: SchemaNode, pointer: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::schema("field names must not be empty", pointer));
        }
        if self.get(&name).is_some() {
            return Err(Error::schema(
                format!("duplicate field '{}'", name),
                pointer,
            ));
        }
        self.fields.push((name, node));
        Ok(())
    }
}

/// Values accepted as field schemas by [`ObjectBuilder::field`].
///
/// Lets a nested [`ObjectBuilder`] be passed without calling `build()` first;
/// its errors surface from the outer `build()`.
pub trait IntoSchemaNode {
    /// Finish construction of the node.
    fn into_schema_node(self) -> Result<SchemaNode>;
}

impl IntoSchemaNode for SchemaNode {
    fn into_schema_node(self) -> Result<SchemaNode> {
        Ok(self)
    }
}

impl IntoSchemaNode for ObjectBuilder {
    fn into_schema_node(self) -> Result<SchemaNode> {
        self.build()
    }
}

/// Builder for object nodes. Fields keep their insertion order.
#[derive(Debug, Default)]
pub struct ObjectBuilder {
    fields: ObjectSchema,
    description: Option<String>,
    error: Option<Error>,
}

impl ObjectBuilder {
    /// Add a field.
    pub fn field(mut self, name: impl Into<String>, node: impl IntoSchemaNode) -> Self {
        if self.error.is_some() {
            return self;
        }
        let name = name.into();
        let pointer = child("/properties", &name);
        let result = node
            .into_schema_node()
            .and_then(|node| self.fields.insert(name, node, &pointer));
        if let Err(e) = result {
            self.error = Some(e);
        }
        self
    }

    /// Set the object's description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Finish the object, failing on the first construction error.
    pub fn build(self) -> Result<SchemaNode> {
        if let Some(e) = self.error {
            return Err(e);
        }
        Ok(SchemaNode {
            kind: NodeKind::Object(self.fields),
            description: self.description,
        })
    }
}

/// Root schema for extraction and generation requests. Always an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    root: SchemaNode,
}

/// Builder for [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    inner: ObjectBuilder,
}

impl SchemaBuilder {
    /// Add a top-level field.
    pub fn field(mut self, name: impl Into<String>, node: impl IntoSchemaNode) -> Self {
        self.inner = self.inner.field(name, node);
        self
    }

    /// Set the root description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.inner = self.inner.description(description);
        self
    }

    /// Finish the schema.
    pub fn build(self) -> Result<Schema> {
        Ok(Schema {
            root: self.inner.build()?,
        })
    }
}

impl Schema {
    /// Start building a schema.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Build a schema from ordered `(name, node)` pairs.
    pub fn from_fields<I, K>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, SchemaNode)>,
        K: Into<String>,
    {
        fields
            .into_iter()
            .fold(Schema::builder(), |b, (name, node)| b.field(name, node))
            .build()
    }

    /// Top-level fields.
    pub fn fields(&self) -> &ObjectSchema {
        match &self.root.kind {
            NodeKind::Object(fields) => fields,
            _ => unreachable!("schema root is always an object"),
        }
    }

    /// The root object node.
    pub fn as_node(&self) -> &SchemaNode {
        &self.root
    }

    /// Convert the schema to JSON Schema.
    pub fn to_json_schema(&self) -> Value {
        self.root.to_json_schema()
    }

    /// Rebuild a schema from JSON Schema. The root must be an object.
    pub fn from_json_schema(json_schema: &Value) -> Result<Self> {
        let root = parse_node(json_schema, "", true)?;
        match root.kind {
            NodeKind::Object(_) => Ok(Schema { root }),
            _ => Err(Error::schema(
                "root schema must be of type 'object'",
                "/type",
            )),
        }
    }
}

impl TryFrom<SchemaNode> for Schema {
    type Error = Error;

    fn try_from(node: SchemaNode) -> Result<Self> {
        match node.kind {
            NodeKind::Object(_) => Ok(Schema { root: node }),
            _ => Err(Error::schema("root schema must be of type 'object'", "")),
        }
    }
}

impl TryFrom<&Value> for Schema {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self> {
        Schema::from_json_schema(value)
    }
}

impl TryFrom<Value> for Schema {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Schema::from_json_schema(&value)
    }
}

impl Serialize for SchemaNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json_schema().serialize(serializer)
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.root.serialize(serializer)
    }
}

/// Escape a JSON pointer reference token (RFC 6901).
fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn child(pointer: &str, token: &str) -> String {
    format!("{}/{}", pointer, escape_token(token))
}

fn unsupported(pointer: &str, keyword: &str) -> Error {
    Error::schema(
        format!("unsupported JSON Schema keyword '{}'", keyword),
        child(pointer, keyword),
    )
}

fn parse_node(value: &Value, pointer: &str, is_root: bool) -> Result<SchemaNode> {
    let map = value
        .as_object()
        .ok_or_else(|| Error::schema("expected a JSON Schema object", pointer))?;

    let kind_name = match map.get("type") {
        Some(Value::String(t)) => t.as_str(),
        Some(other) => {
            return Err(Error::schema(
                format!("unsupported 'type' value {}", other),
                child(pointer, "type"),
            ))
        }
        None => return Err(Error::schema("missing 'type'", pointer)),
    };

    let allowed: &[&str] = match kind_name {
        "string" | "number" | "boolean" => &["type", "description"],
        "array" => &["type", "description", "items"],
        "object" => &[
            "type",
            "description",
            "properties",
            "required",
            "additionalProperties",
        ],
        other => {
            return Err(Error::schema(
                format!("unsupported type '{}'", other),
                child(pointer, "type"),
            ))
        }
    };

    for key in map.keys() {
        let root_only = is_root && key == "$schema";
        if !root_only && !allowed.contains(&key.as_str()) {
            return Err(unsupported(pointer, key));
        }
    }

    let description = match map.get("description") {
        None => None,
        Some(Value::String(d)) => Some(d.clone()),
        Some(_) => {
            return Err(Error::schema(
                "'description' must be a string",
                child(pointer, "description"),
            ))
        }
    };

    let kind = match kind_name {
        "string" => NodeKind::String,
        "number" => NodeKind::Number,
        "boolean" => NodeKind::Boolean,
        "array" => {
            let items_pointer = child(pointer, "items");
            let items = map
                .get("items")
                .ok_or_else(|| Error::schema("array schema is missing 'items'", pointer))?;
            NodeKind::Array(Box::new(parse_node(items, &items_pointer, false)?))
        }
        _ => NodeKind::Object(parse_object(map, pointer)?),
    };

    Ok(SchemaNode { kind, description })
}

fn parse_object(map: &Map<String, Value>, pointer: &str) -> Result<ObjectSchema> {
    let properties_pointer = child(pointer, "properties");
    let mut fields = ObjectSchema::default();

    match map.get("properties") {
        None => {}
        Some(Value::Object(properties)) => {
            for (name, prop) in properties {
                let prop_pointer = child(&properties_pointer, name);
                let node = parse_node(prop, &prop_pointer, false)?;
                fields.insert(name.clone(), node, &prop_pointer)?;
            }
        }
        Some(_) => {
            return Err(Error::schema(
                "'properties' must be an object",
                properties_pointer,
            ))
        }
    }

    match map.get("additionalProperties") {
        None | Some(Value::Bool(false)) => {}
        Some(_) => {
            return Err(Error::schema(
                "only 'additionalProperties: false' is supported",
                child(pointer, "additionalProperties"),
            ))
        }
    }

    // An absent `required` means the DSL default: every field is required.
    if let Some(required) = map.get("required") {
        let required_pointer = child(pointer, "required");
        let names = required
            .as_array()
            .ok_or_else(|| Error::schema("'required' must be an array", &required_pointer))?;

        let mut seen: Vec<&str> = Vec::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            let item_pointer = format!("{}/{}", required_pointer, i);
            let name = name
                .as_str()
                .ok_or_else(|| Error::schema("'required' entries must be strings", &item_pointer))?;
            if fields.get(name).is_none() {
                return Err(Error::schema(
                    format!("'{}' is required but not declared in 'properties'", name),
                    item_pointer,
                ));
            }
            if seen.contains(&name) {
                return Err(Error::schema(
                    format!("'{}' is listed twice in 'required'", name),
                    item_pointer,
                ));
            }
            seen.push(name);
        }

        if let Some(optional) = fields.names().find(|name| !seen.contains(name)) {
            return Err(Error::schema(
                format!("optional field '{}' is not supported", optional),
                required_pointer,
            ));
        }
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pointer_of(err: Error) -> String {
        match err {
            Error::SchemaDefinition { pointer, .. } => pointer,
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    /// Deterministically enumerate trees up to `depth` levels of nesting.
    fn trees(depth: usize) -> Vec<SchemaNode> {
        let mut out = vec![
            string(),
            number(),
            boolean().with_description("flag"),
        ];
        if depth == 0 {
            return out;
        }
        let inner = trees(depth - 1);
        for (i, node) in inner.iter().enumerate() {
            out.push(array(node.clone()));
            let obj = object()
                .field(format!("f{}", i), node.clone())
                .field("z", string())
                .field("a/b~c", array(node.clone()))
                .build()
                .unwrap();
            out.push(obj);
        }
        out.push(object().build().unwrap());
        out
    }

    #[test]
    fn test_object_to_json_schema_preserves_order() {
        let node = object()
            .field("a", string())
            .field("b", number())
            .build()
            .unwrap();
        let json = node.to_json_schema();

        assert_eq!(json["type"], "object");
        assert_eq!(
            json["properties"],
            json!({"a": {"type": "string"}, "b": {"type": "number"}})
        );
        assert_eq!(json["required"], json!(["a", "b"]));
        assert_eq!(json["additionalProperties"], json!(false));

        let keys: Vec<&String> = json["properties"].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["a", "b"]);
    }

    #[test]
    fn test_reverse_insertion_order_is_kept() {
        let schema = Schema::from_fields([("zeta", string()), ("alpha", number())]).unwrap();
        let text = serde_json::to_string(&schema).unwrap();
        assert!(text.find("zeta").unwrap() < text.find("alpha").unwrap());
        assert_eq!(schema.to_json_schema()["required"], json!(["zeta", "alpha"]));
    }

    #[test]
    fn test_array_of_boolean_round_trip() {
        let input = json!({"type": "array", "items": {"type": "boolean"}});
        let node = SchemaNode::from_json_schema(&input).unwrap();
        assert_eq!(node, array(boolean()));
        assert_eq!(node.to_json_schema(), input);
    }

    #[test]
    fn test_round_trip_bounded_depth() {
        for node in trees(2) {
            let back = SchemaNode::from_json_schema(&node.to_json_schema()).unwrap();
            assert_eq!(back, node);
        }
    }

    #[test]
    fn test_schema_round_trip_with_descriptions() {
        let schema = Schema::builder()
            .description("a person")
            .field("name", string().with_description("full name"))
            .field("age", number())
            .field("tags", array(string()).with_description("labels"))
            .field(
                "address",
                object()
                    .description("postal address")
                    .field("street", string())
                    .field("city", string()),
            )
            .build()
            .unwrap();

        let json = schema.to_json_schema();
        assert_eq!(json["description"], "a person");
        assert_eq!(json["properties"]["address"]["description"], "postal address");
        assert_eq!(Schema::from_json_schema(&json).unwrap(), schema);
    }

    #[test]
    fn test_duplicate_field_fails_at_build() {
        let err = Schema::builder()
            .field("name", string())
            .field("name", number())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("duplicate field 'name'"));
    }

    #[test]
    fn test_nested_builder_error_propagates() {
        let result = Schema::builder()
            .field("outer", object().field("", string()))
            .build();
        assert!(matches!(result, Err(Error::SchemaDefinition { .. })));
    }

    #[test]
    fn test_pattern_is_rejected_with_pointer() {
        let err = SchemaNode::from_json_schema(&json!({"type": "string", "pattern": "^a+$"}))
            .unwrap_err();
        assert!(err.to_string().contains("'pattern'"));
        assert_eq!(pointer_of(err), "/pattern");
    }

    #[test]
    fn test_nested_unsupported_pointer_is_escaped() {
        let input = json!({
            "type": "object",
            "properties": {
                "a/b": {"type": "array", "items": {"type": "number", "minimum": 0}}
            }
        });
        let err = Schema::from_json_schema(&input).unwrap_err();
        assert_eq!(pointer_of(err), "/properties/a~1b/items/minimum");
    }

    #[test]
    fn test_unsupported_constructs() {
        let cases = [
            (json!({"oneOf": []}), ""),
            (json!({"type": "integer"}), "/type"),
            (json!({"type": ["string", "null"]}), "/type"),
            (json!({"type": "string", "enum": ["a"]}), "/enum"),
            (json!({"type": "array"}), ""),
            (json!({"type": "object", "additionalProperties": true}), "/additionalProperties"),
            (
                json!({"type": "object", "properties": {"a": {"type": "string"}}, "required": []}),
                "/required",
            ),
            (
                json!({"type": "object", "properties": {}, "required": ["ghost"]}),
                "/required/0",
            ),
        ];
        for (input, pointer) in cases {
            let err = SchemaNode::from_json_schema(&input).unwrap_err();
            assert_eq!(pointer_of(err), pointer, "input: {}", input);
        }
    }

    #[test]
    fn test_missing_required_means_all_required() {
        let input = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "properties": {"name": {"type": "string"}, "age": {"type": "number"}}
        });
        let schema = Schema::from_json_schema(&input).unwrap();
        assert_eq!(schema.fields().names().collect::<Vec<_>>(), ["name", "age"]);
        assert_eq!(schema.to_json_schema()["required"], json!(["name", "age"]));
    }

    #[test]
    fn test_dollar_schema_only_at_root() {
        let input = json!({
            "type": "object",
            "properties": {"a": {"$schema": "x", "type": "string"}}
        });
        let err = Schema::from_json_schema(&input).unwrap_err();
        assert_eq!(pointer_of(err), "/properties/a/$schema");
    }

    #[test]
    fn test_root_must_be_object() {
        assert!(Schema::from_json_schema(&json!({"type": "string"})).is_err());
        assert!(Schema::try_from(array(string())).is_err());
        assert!(Schema::try_from(object().build().unwrap()).is_ok());
    }
}
