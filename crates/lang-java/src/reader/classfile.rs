use super::{Annotation, ClassMetadata, ClassMetadataReader, ElementValue, ReadError};
use ristretto_classfile::attributes::{
    Annotation as RawAnnotation, AnnotationElement, Attribute,
};
use ristretto_classfile::{ClassFile, Constant, ConstantPool};
use std::io::Cursor;

/// Reads JVM class files and keeps only the class name and the class-level
/// annotation tables. Member annotations are ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClassFileReader;

impl ClassMetadataReader for ClassFileReader {
    fn read(&self, bytes: &[u8]) -> Result<ClassMetadata, ReadError> {
        let class = ClassFile::from_bytes(&mut Cursor::new(bytes.to_vec()))?;
        let pool = &class.constant_pool;

        let mut annotations = Vec::new();
        for attribute in &class.attributes {
            let (raw, visible) = match attribute {
                Attribute::RuntimeVisibleAnnotations { annotations, .. } => (annotations, true),
                Attribute::RuntimeInvisibleAnnotations { annotations, .. } => (annotations, false),
                _ => continue,
            };
            for annotation in raw {
                annotations.push(convert_annotation(pool, annotation, visible)?);
            }
        }

        let name = class_name(pool, class.this_class)?.replace('/', ".");
        Ok(ClassMetadata { name, annotations })
    }
}

fn class_name(pool: &ConstantPool, index: u16) -> Result<&str, ReadError> {
    match pool.get(index) {
        Some(Constant::Class(name_index)) => Ok(pool.try_get_utf8(*name_index)?),
        _ => Err(ReadError::BadConstant {
            index,
            expected: "Class",
        }),
    }
}

fn integer(pool: &ConstantPool, index: u16) -> Result<i32, ReadError> {
    match pool.get(index) {
        Some(Constant::Integer(v)) => Ok(*v),
        _ => Err(ReadError::BadConstant {
            index,
            expected: "Integer",
        }),
    }
}

fn long(pool: &ConstantPool, index: u16) -> Result<i64, ReadError> {
    match pool.get(index) {
        Some(Constant::Long(v)) => Ok(*v),
        _ => Err(ReadError::BadConstant {
            index,
            expected: "Long",
        }),
    }
}

fn floating(pool: &ConstantPool, index: u16) -> Result<f64, ReadError> {
    match pool.get(index) {
        Some(Constant::Float(v)) => Ok(f64::from(*v)),
        Some(Constant::Double(v)) => Ok(*v),
        _ => Err(ReadError::BadConstant {
            index,
            expected: "Float or Double",
        }),
    }
}

fn utf8(pool: &ConstantPool, index: u16) -> Result<String, ReadError> {
    Ok(pool.try_get_utf8(index)?.to_string())
}

fn convert_annotation(
    pool: &ConstantPool,
    annotation: &RawAnnotation,
    visible: bool,
) -> Result<Annotation, ReadError> {
    let descriptor = utf8(pool, annotation.type_index)?;
    let elements = annotation
        .elements
        .iter()
        .map(|pair| Ok((utf8(pool, pair.name_index)?, convert_element(pool, &pair.value, visible)?)))
        .collect::<Result<Vec<_>, ReadError>>()?;

    Ok(Annotation {
        descriptor,
        elements,
        visible,
    })
}

fn convert_element(
    pool: &ConstantPool,
    element: &AnnotationElement,
    visible: bool,
) -> Result<ElementValue, ReadError> {
    let value = match element {
        AnnotationElement::Boolean { const_value_index } => {
            ElementValue::Boolean(integer(pool, *const_value_index)? != 0)
        }
        AnnotationElement::Byte { const_value_index }
        | AnnotationElement::Short { const_value_index }
        | AnnotationElement::Int { const_value_index } => {
            ElementValue::Int(i64::from(integer(pool, *const_value_index)?))
        }
        AnnotationElement::Char { const_value_index } => {
            let code = integer(pool, *const_value_index)?;
            ElementValue::Char(char::from_u32(code as u32).unwrap_or(char::REPLACEMENT_CHARACTER))
        }
        AnnotationElement::Long { const_value_index } => {
            ElementValue::Int(long(pool, *const_value_index)?)
        }
        AnnotationElement::Float { const_value_index }
        | AnnotationElement::Double { const_value_index } => {
            ElementValue::Float(floating(pool, *const_value_index)?)
        }
        AnnotationElement::String { const_value_index } => {
            ElementValue::String(utf8(pool, *const_value_index)?)
        }
        AnnotationElement::Enum {
            type_name_index,
            const_name_index,
        } => ElementValue::Enum {
            type_name: utf8(pool, *type_name_index)?,
            const_name: utf8(pool, *const_name_index)?,
        },
        AnnotationElement::Class { class_info_index } => {
            ElementValue::Class(utf8(pool, *class_info_index)?)
        }
        AnnotationElement::Annotation { annotation } => {
            ElementValue::Annotation(convert_annotation(pool, annotation, visible)?)
        }
        AnnotationElement::Array { values: array_value } => ElementValue::Array(
            array_value
                .iter()
                .map(|v| convert_element(pool, v, visible))
                .collect::<Result<_, _>>()?,
        ),
    };
    Ok(value)
}
