//! Core types: class identities and call contexts
//!
//! Class names follow the JVM conventions used by serialized streams:
//! binary names (`com.example.Outer$Inner`), array descriptors
//! (`[Lcom.example.Widget;`, `[[I`) and source-style arrays
//! (`com.example.Widget[]`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a class about to be instantiated
///
/// Serialized as its name and loader only. Array-ness and the component
/// type are always derived from the name, never read from input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "ClassDescriptorRepr", into = "ClassDescriptorRepr")]
pub struct ClassDescriptor {
    /// Name exactly as it appeared in the stream
    name: String,

    /// Number of array dimensions (0 for non-array classes)
    array_dimensions: u8,

    /// Element type for arrays, the class itself otherwise
    component: String,

    /// Name of the loader that defined the class, when known
    defining_loader: Option<String>,
}

/// Wire form of [`ClassDescriptor`]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassDescriptorRepr {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    defining_loader: Option<String>,
}

impl From<ClassDescriptorRepr> for ClassDescriptor {
    fn from(repr: ClassDescriptorRepr) -> Self {
        let class = Self::new(repr.name);
        match repr.defining_loader {
            Some(loader) => class.with_loader(loader),
            None => class,
        }
    }
}

impl From<ClassDescriptor> for ClassDescriptorRepr {
    fn from(class: ClassDescriptor) -> Self {
        Self {
            name: class.name,
            defining_loader: class.defining_loader,
        }
    }
}

impl ClassDescriptor {
    /// Describe a class from its stream name
    ///
    /// Malformed array descriptors are kept as plain (non-array) names so
    /// they still go through allow-list checks.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let (array_dimensions, component) = parse_array(&name).unwrap_or((0, name.clone()));
        Self {
            name,
            array_dimensions,
            component,
            defining_loader: None,
        }
    }

    /// Attach the defining loader name
    pub fn with_loader(mut self, loader: impl Into<String>) -> Self {
        self.defining_loader = Some(loader.into());
        self
    }

    /// Name exactly as it appeared in the stream
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_array(&self) -> bool {
        self.array_dimensions > 0
    }

    pub fn array_dimensions(&self) -> u8 {
        self.array_dimensions
    }

    /// Element type name (the class name itself for non-arrays)
    pub fn component_name(&self) -> &str {
        &self.component
    }

    /// Loader that defined this class, if the reader supplied one
    pub fn defining_loader(&self) -> Option<&str> {
        self.defining_loader.as_deref()
    }
}

impl fmt::Display for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for ClassDescriptor {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ClassDescriptor {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Parse an array name into (dimensions, component). `None` if not a valid array.
fn parse_array(name: &str) -> Option<(u8, String)> {
    if let Some(rest) = name.strip_prefix('[') {
        let mut dims: u8 = 1;
        let mut rest = rest;
        while let Some(r) = rest.strip_prefix('[') {
            dims = dims.checked_add(1)?;
            rest = r;
        }
        let component = match rest {
            "Z" => "boolean".to_string(),
            "B" => "byte".to_string(),
            "C" => "char".to_string(),
            "S" => "short".to_string(),
            "I" => "int".to_string(),
            "J" => "long".to_string(),
            "F" => "float".to_string(),
            "D" => "double".to_string(),
            _ => {
                let inner = rest.strip_prefix('L')?.strip_suffix(';')?;
                if inner.is_empty() {
                    return None;
                }
                inner.to_string()
            }
        };
        return Some((dims, component));
    }

    let mut dims: u8 = 0;
    let mut base = name;
    while let Some(b) = base.strip_suffix("[]") {
        dims = dims.checked_add(1)?;
        base = b;
    }
    if dims == 0 || base.is_empty() {
        return None;
    }
    Some((dims, base.to_string()))
}

/// The call context a deserialization session is started from
///
/// Frames are fully-qualified method or component names, innermost first.
/// Mode resolution matches them against configured context rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    frames: Vec<String>,
}

impl CallContext {
    pub fn new<I, S>(frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            frames: frames.into_iter().map(Into::into).collect(),
        }
    }

    /// Context made of a single frame
    pub fn single(frame: impl Into<String>) -> Self {
        Self {
            frames: vec![frame.into()],
        }
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_class() {
        let c = ClassDescriptor::new("com.example.Widget");
        assert!(!c.is_array());
        assert_eq!(c.component_name(), "com.example.Widget");
        assert_eq!(c.name(), "com.example.Widget");
    }

    #[test]
    fn test_jvm_object_array() {
        let c = ClassDescriptor::new("[Lcom.example.Widget;");
        assert!(c.is_array());
        assert_eq!(c.array_dimensions(), 1);
        assert_eq!(c.component_name(), "com.example.Widget");
        assert_eq!(c.name(), "[Lcom.example.Widget;");
    }

    #[test]
    fn test_jvm_primitive_matrix() {
        let c = ClassDescriptor::new("[[I");
        assert_eq!(c.array_dimensions(), 2);
        assert_eq!(c.component_name(), "int");
    }

    #[test]
    fn test_source_style_array() {
        let c = ClassDescriptor::new("java.lang.String[][]");
        assert_eq!(c.array_dimensions(), 2);
        assert_eq!(c.component_name(), "java.lang.String");
    }

    #[test]
    fn test_malformed_array_is_plain() {
        for name in ["[X", "[L;", "[Lcom.example.Widget", "[]"] {
            let c = ClassDescriptor::new(name);
            assert!(!c.is_array(), "{name} should not be treated as an array");
            assert_eq!(c.component_name(), name);
        }
    }

    #[test]
    fn test_inner_class_name_kept() {
        let c = ClassDescriptor::new("com.example.Outer$Inner");
        assert!(!c.is_array());
        assert_eq!(c.to_string(), "com.example.Outer$Inner");
    }

    #[test]
    fn test_defining_loader() {
        let c = ClassDescriptor::new("a.B").with_loader("app");
        assert_eq!(c.defining_loader(), Some("app"));
        assert_eq!(ClassDescriptor::new("a.B").defining_loader(), None);
    }

    #[test]
    fn test_deserialize_derives_array_from_name() {
        let c: ClassDescriptor = serde_json::from_str(
            r#"{"name":"java.lang.Runtime","arrayDimensions":1,"component":"java.lang.Runtime"}"#,
        )
        .unwrap();
        assert!(!c.is_array());
        assert_eq!(c, ClassDescriptor::new("java.lang.Runtime"));

        let c: ClassDescriptor =
            serde_json::from_str(r#"{"name":"[Lcom.example.Widget;","arrayDimensions":0}"#).unwrap();
        assert_eq!(c.array_dimensions(), 1);
        assert_eq!(c.component_name(), "com.example.Widget");
    }

    #[test]
    fn test_serialize_name_and_loader_only() {
        let c = ClassDescriptor::new("[[I").with_loader("app");
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, r#"{"name":"[[I","definingLoader":"app"}"#);
        let parsed: ClassDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, c);
    }

    #[test]
    fn test_call_context() {
        let ctx = CallContext::new(["com.example.Rmi.read", "com.example.Server.handle"]);
        assert_eq!(ctx.frames().len(), 2);
        assert!(!ctx.is_empty());
        assert!(CallContext::default().is_empty());
        assert_eq!(CallContext::single("x").frames(), &["x".to_string()]);
    }
}
