//! Template values, the page context and variable resolution

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;

/// A value a template can print, test or iterate
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Text written into the page; objects have no text form
    pub fn to_output_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    (*n as i64).to_string()
                } else {
                    n.to_string()
                }
            }
            Value::String(s) => s.clone(),
            Value::Array(arr) => arr
                .iter()
                .map(|v| v.to_output_string())
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => String::new(),
        }
    }

    /// Check if the value is truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(arr) => !arr.is_empty(),
            Value::Object(_) => true,
        }
    }

    /// Get a property from an object, or an element from an array by index
    pub fn get_property(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(obj) => obj.get(key),
            Value::Array(arr) => key.parse::<usize>().ok().and_then(|i| arr.get(i)),
            _ => None,
        }
    }

    /// Walk a dotted path below this value
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        path.iter()
            .try_fold(self, |value, key| value.get_property(key.as_ref()))
    }

    /// Convert from serde_json::Value
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(arr) => Value::Array(arr.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(obj) => Value::Object(
                obj.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert any serializable value; unserializable input becomes Null
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(json) => Value::from_json(&json),
            Err(e) => {
                tracing::debug!("Value is not representable in a template: {}", e);
                Value::Null
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(map: IndexMap<String, Value>) -> Self {
        Value::Object(map)
    }
}

/// Looks up a dotted variable path
pub trait Resolve {
    fn resolve(&self, path: &[String]) -> Option<&Value>;
}

/// Variables available to one page render
#[derive(Debug, Clone, Default)]
pub struct Context {
    variables: HashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.variables.insert(name.to_string(), value.into());
    }

    pub fn set_string(&mut self, name: &str, value: &str) {
        self.set(name, Value::String(value.to_string()));
    }

    pub fn set_object<T: Serialize + ?Sized>(&mut self, name: &str, value: &T) {
        self.set(name, Value::from_serialize(value));
    }

    /// Set a nested property using dot notation (e.g. "page.toc_html")
    ///
    /// Missing intermediate objects are created; a non-object in the way
    /// leaves the context unchanged.
    pub fn set_nested(&mut self, path: &str, value: impl Into<Value>) {
        let parts: Vec<&str> = path.split('.').collect();
        let Some((last, parents)) = parts.split_last() else {
            return;
        };
        let Some((root, rest)) = parents.split_first() else {
            self.set(last, value);
            return;
        };

        let mut current = self
            .variables
            .entry(root.to_string())
            .or_insert_with(|| Value::Object(IndexMap::new()));
        for part in rest {
            current = match current {
                Value::Object(obj) => obj
                    .entry(part.to_string())
                    .or_insert_with(|| Value::Object(IndexMap::new())),
                _ => return,
            };
        }

        if let Value::Object(obj) = current {
            obj.insert(last.to_string(), value.into());
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }
}

impl Resolve for Context {
    fn resolve(&self, path: &[String]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        self.variables.get(first)?.lookup(rest)
    }
}

/// A loop variable layered over an enclosing scope
pub struct Scope<'a> {
    pub parent: &'a dyn Resolve,
    pub name: &'a str,
    pub value: &'a Value,
}

impl Resolve for Scope<'_> {
    fn resolve(&self, path: &[String]) -> Option<&Value> {
        match path.split_first() {
            Some((first, rest)) if first == self.name => self.value.lookup(rest),
            _ => self.parent.resolve(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(p: &str) -> Vec<String> {
        p.split('.').map(str::to_string).collect()
    }

    #[test]
    fn test_output_strings() {
        assert_eq!(Value::Number(3.0).to_output_string(), "3");
        assert_eq!(Value::Number(2.5).to_output_string(), "2.5");
        assert_eq!(Value::Null.to_output_string(), "");
        assert_eq!(
            Value::from_json(&json!(["a", 1, true])).to_output_string(),
            "a,1,true"
        );
        assert_eq!(Value::from_json(&json!({"a": 1})).to_output_string(), "");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::from_json(&json!([])).is_truthy());
        assert!(Value::from_json(&json!(["x"])).is_truthy());
        assert!(!Value::from_json(&json!("")).is_truthy());
        assert!(!Value::from_json(&json!(0)).is_truthy());
        assert!(Value::from_json(&json!({})).is_truthy());
    }

    #[test]
    fn test_context_resolves_dotted_paths() {
        let mut ctx = Context::new();
        ctx.set_object("site", &json!({"title": "Blog", "links": ["a", "b"]}));
        assert_eq!(ctx.resolve(&path("site.title")), Some(&Value::from("Blog")));
        assert_eq!(ctx.resolve(&path("site.links.1")), Some(&Value::from("b")));
        assert_eq!(ctx.resolve(&path("site.missing.deep")), None);
        assert_eq!(ctx.resolve(&path("nothing")), None);
    }

    #[test]
    fn test_set_nested() {
        let mut ctx = Context::new();
        ctx.set_object("page", &json!({"title": "T"}));
        ctx.set_nested("page.toc_html", "<ol></ol>");
        ctx.set_nested("meta.og.type", "article");
        assert_eq!(ctx.resolve(&path("page.title")), Some(&Value::from("T")));
        assert_eq!(ctx.resolve(&path("page.toc_html")), Some(&Value::from("<ol></ol>")));
        assert_eq!(ctx.resolve(&path("meta.og.type")), Some(&Value::from("article")));
    }

    #[test]
    fn test_scope_shadows_parent() {
        let mut ctx = Context::new();
        ctx.set_string("post", "outer");
        ctx.set_string("site", "blog");
        let item = Value::from_json(&json!({"title": "inner"}));
        let scope = Scope {
            parent: &ctx,
            name: "post",
            value: &item,
        };
        assert_eq!(scope.resolve(&path("post.title")), Some(&Value::from("inner")));
        assert_eq!(scope.resolve(&path("site")), Some(&Value::from("blog")));
    }
}
