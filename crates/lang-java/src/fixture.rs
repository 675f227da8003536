//! Builds minimal but well-formed class files for tests.
//!
//! Each class carries a long constant in its pool, so readers see a two-slot
//! entry ahead of the annotation descriptors.

use ristretto_classfile::attributes::{
    Annotation, AnnotationElement, AnnotationValuePair, Attribute,
};
use ristretto_classfile::{ClassAccessFlags, ClassFile, ConstantPool};

#[derive(Debug, Clone)]
pub enum FixtureValue {
    Bool(bool),
    Int(i32),
    Long(i64),
    Str(String),
    Enum(String, String),
    Array(Vec<FixtureValue>),
}

#[derive(Debug, Clone)]
struct FixtureAnnotation {
    descriptor: String,
    visible: bool,
    elements: Vec<(String, FixtureValue)>,
}

#[derive(Debug, Clone)]
pub struct ClassFileBuilder {
    internal_name: String,
    annotations: Vec<FixtureAnnotation>,
}

impl ClassFileBuilder {
    /// Accepts either `com.example.Foo` or `com/example/Foo`.
    pub fn new(name: &str) -> Self {
        Self {
            internal_name: name.replace('.', "/"),
            annotations: Vec::new(),
        }
    }

    pub fn annotation(
        mut self,
        descriptor: &str,
        visible: bool,
        elements: Vec<(&str, FixtureValue)>,
    ) -> Self {
        self.annotations.push(FixtureAnnotation {
            descriptor: descriptor.to_string(),
            visible,
            elements: elements
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        });
        self
    }

    /// Path of the `.class` file relative to a compiler output directory.
    pub fn relative_path(&self) -> String {
        format!("{}.class", self.internal_name)
    }

    pub fn build(&self) -> Vec<u8> {
        self.try_build().expect("fixture class file")
    }

    fn try_build(&self) -> ristretto_classfile::Result<Vec<u8>> {
        let mut pool = ConstantPool::default();
        let this_class = pool.add_class(&self.internal_name)?;
        let super_class = pool.add_class("java/lang/Object")?;

        pool.add_long(1)?;

        let mut attributes = Vec::new();
        for visible in [true, false] {
            let selected: Vec<_> = self
                .annotations
                .iter()
                .filter(|a| a.visible == visible)
                .collect();
            if selected.is_empty() {
                continue;
            }
            let annotations = selected
                .into_iter()
                .map(|a| to_annotation(&mut pool, a))
                .collect::<ristretto_classfile::Result<Vec<_>>>()?;
            attributes.push(if visible {
                Attribute::RuntimeVisibleAnnotations {
                    name_index: pool.add_utf8("RuntimeVisibleAnnotations")?,
                    annotations,
                }
            } else {
                Attribute::RuntimeInvisibleAnnotations {
                    name_index: pool.add_utf8("RuntimeInvisibleAnnotations")?,
                    annotations,
                }
            });
        }

        let class = ClassFile {
            constant_pool: pool,
            access_flags: ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            this_class,
            super_class,
            attributes,
            ..Default::default()
        };
        let mut bytes = Vec::new();
        class.to_bytes(&mut bytes)?;
        Ok(bytes)
    }
}

fn to_annotation(
    pool: &mut ConstantPool,
    annotation: &FixtureAnnotation,
) -> ristretto_classfile::Result<Annotation> {
    let type_index = pool.add_utf8(&annotation.descriptor)?;
    let elements = annotation
        .elements
        .iter()
        .map(|(name, value)| {
            Ok(AnnotationValuePair {
                name_index: pool.add_utf8(name)?,
                value: to_element(pool, value)?,
            })
        })
        .collect::<ristretto_classfile::Result<Vec<_>>>()?;
    Ok(Annotation {
        type_index,
        elements,
    })
}

fn to_element(
    pool: &mut ConstantPool,
    value: &FixtureValue,
) -> ristretto_classfile::Result<AnnotationElement> {
    let element = match value {
        FixtureValue::Bool(b) => AnnotationElement::Boolean {
            const_value_index: pool.add_integer(i32::from(*b))?,
        },
        FixtureValue::Int(i) => AnnotationElement::Int {
            const_value_index: pool.add_integer(*i)?,
        },
        FixtureValue::Long(l) => AnnotationElement::Long {
            const_value_index: pool.add_long(*l)?,
        },
        FixtureValue::Str(s) => AnnotationElement::String {
            const_value_index: pool.add_utf8(s)?,
        },
        FixtureValue::Enum(type_name, const_name) => AnnotationElement::Enum {
            type_name_index: pool.add_utf8(type_name)?,
            const_name_index: pool.add_utf8(const_name)?,
        },
        FixtureValue::Array(values) => AnnotationElement::Array {
            values: values
                .iter()
                .map(|v| to_element(pool, v))
                .collect::<ristretto_classfile::Result<_>>()?,
        },
    };
    Ok(element)
}
