//! Class-level metadata extraction.
//!
//! The scanner only needs a class's name and its class-level annotations, so
//! readers stop there. [`ClassMetadataReader`] keeps the bytecode format
//! swappable; [`ClassFileReader`] handles JVM `.class` files.

mod classfile;

pub use classfile::ClassFileReader;

/// Annotation element value, resolved against the constant pool.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Boolean(bool),
    Int(i64),
    Float(f64),
    Char(char),
    String(String),
    Enum { type_name: String, const_name: String },
    Class(String),
    Annotation(Annotation),
    Array(Vec<ElementValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Field descriptor of the annotation type, e.g. `Lcom/example/Marker;`.
    pub descriptor: String,
    pub elements: Vec<(String, ElementValue)>,
    /// `true` for `RuntimeVisibleAnnotations`, `false` for the invisible table.
    pub visible: bool,
}

impl Annotation {
    pub fn element(&self, name: &str) -> Option<&ElementValue> {
        self.elements
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Boolean element, defaulting to `false` when unset or not a boolean.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.element(name), Some(ElementValue::Boolean(true)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassMetadata {
    /// Fully-qualified, dot-separated name.
    pub name: String,
    pub annotations: Vec<Annotation>,
}

impl ClassMetadata {
    pub fn find_annotation(&self, descriptor: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.descriptor == descriptor)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("invalid class file: {0}")]
    Class(#[from] ristretto_classfile::Error),
    #[error("constant pool index {index} is not a {expected}")]
    BadConstant { index: u16, expected: &'static str },
}

/// Extracts [`ClassMetadata`] from one compiled class blob.
pub trait ClassMetadataReader: Send + Sync {
    fn read(&self, bytes: &[u8]) -> Result<ClassMetadata, ReadError>;
}
