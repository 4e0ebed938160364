////////////////////////////////////////////////////////////////////////////////
// This file is part of "Ad Astra", an embeddable scripting programming       //
// language platform.                                                         //
//                                                                            //
// This work is proprietary software with source-available code.              //
//                                                                            //
// To copy, use, distribute, or contribute to this work, you must agree to    //
// the terms of the General License Agreement:                                //
//                                                                            //
// https://github.com/Eliah-Lakhin/ad-astra/blob/master/EULA.md               //
//                                                                            //
// The agreement grants a Basic Commercial License, allowing you to use       //
// this work in non-commercial and limited commercial products with a total   //
// gross revenue cap. To remove this commercial limit for one of your         //
// products, you must acquire a Full Commercial License.                      //
//                                                                            //
// If you contribute to the source code, documentation, or related materials, //
// you must grant me an exclusive license to these contributions.             //
// Contributions are governed by the "Contributions" section of the General   //
// License Agreement.                                                         //
//                                                                            //
// Copying the work in parts is strictly forbidden, except as permitted       //
// under the General License Agreement.                                       //
//                                                                            //
// If you do not or cannot agree to the terms of this Agreement,              //
// do not use this work.                                                      //
//                                                                            //
// This work is provided "as is", without any warranties, express or implied, //
// except where such disclaimers are legally invalid.                         //
//                                                                            //
// Copyright (c) 2024 Ilya Lakhin (Илья Александрович Лахин).                 //
// All rights reserved.                                                       //
////////////////////////////////////////////////////////////////////////////////

use crate::runtime::{Primitive, RuntimeError, RuntimeResult, TypeKind, TypeMeta, Value};

/// Checks that the value can be stored in a slot of the `target` type.
///
/// Null is accepted by reference types only. Primitive targets accept boxed
/// values of primitives that [widen](Primitive::widens_to) to the target, and
/// convert them into the target's representation. Wrapper targets accept
/// values of exactly the same primitive. Any other target accepts values whose
/// runtime type is assignable to it.
pub(super) fn coerce(value: Value, target: &'static TypeMeta) -> RuntimeResult<Value> {
    match target.kind() {
        TypeKind::Primitive(primitive) => match value.primitive_kind() {
            Some(source) if source.widens_to(*primitive) => Ok(widen(value, *primitive)),
            _ => Err(mismatch(&value, target)),
        },

        TypeKind::Wrapper(primitive) => match value.primitive_kind() {
            Some(source) if source == *primitive => Ok(value),
            None if value.is_null() => Ok(value),
            _ => Err(mismatch(&value, target)),
        },

        TypeKind::Void => Err(mismatch(&value, target)),

        _ => match value.ty() {
            None => Ok(value),
            Some(ty) if target.is_assignable_from(ty) => Ok(value),
            Some(_) => Err(mismatch(&value, target)),
        },
    }
}

/// The value an uninitialized slot of the type holds.
pub(super) fn default_value(ty: &TypeMeta) -> Value {
    let TypeKind::Primitive(primitive) = ty.kind() else {
        return Value::Null;
    };

    match primitive {
        Primitive::Boolean => Value::Boolean(false),
        Primitive::Byte => Value::Byte(0),
        Primitive::Short => Value::Short(0),
        Primitive::Char => Value::Char('\0'),
        Primitive::Int => Value::Int(0),
        Primitive::Long => Value::Long(0),
        Primitive::Float => Value::Float(0.0),
        Primitive::Double => Value::Double(0.0),
    }
}

#[inline(always)]
fn mismatch(value: &Value, target: &'static TypeMeta) -> RuntimeError {
    RuntimeError::TypeMismatch {
        expected: target,
        found: value.ty(),
    }
}

// The caller guarantees that the value's primitive widens to the target.
fn widen(value: Value, target: Primitive) -> Value {
    let integral = match &value {
        Value::Byte(value) => Some(*value as i64),
        Value::Short(value) => Some(*value as i64),
        Value::Char(value) => Some(*value as u32 as i64),
        Value::Int(value) => Some(*value as i64),
        Value::Long(value) => Some(*value),
        _ => None,
    };

    match (target, integral) {
        (Primitive::Short, Some(integral)) => Value::Short(integral as i16),
        (Primitive::Int, Some(integral)) => Value::Int(integral as i32),
        (Primitive::Long, Some(integral)) => Value::Long(integral),
        (Primitive::Float, Some(integral)) => Value::Float(integral as f32),
        (Primitive::Double, Some(integral)) => Value::Double(integral as f64),

        (Primitive::Double, None) => match value {
            Value::Float(float) => Value::Double(float as f64),
            other => other,
        },

        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use crate::runtime::{
        coercion::{coerce, default_value},
        Primitive,
        RuntimeError,
        TypeMeta,
        Value,
    };

    #[test]
    fn test_primitive_widening() {
        assert_eq!(coerce(Value::Byte(7), TypeMeta::long()).unwrap(), Value::Long(7));
        assert_eq!(coerce(Value::Char('A'), TypeMeta::int()).unwrap(), Value::Int(65));
        assert_eq!(coerce(Value::Int(3), TypeMeta::double()).unwrap(), Value::Double(3.0));
        assert_eq!(coerce(Value::Float(1.5), TypeMeta::double()).unwrap(), Value::Double(1.5));
        assert_eq!(coerce(Value::Int(3), TypeMeta::int()).unwrap(), Value::Int(3));

        assert!(matches!(
            coerce(Value::Long(3), TypeMeta::int()),
            Err(RuntimeError::TypeMismatch { .. }),
        ));
        assert!(matches!(
            coerce(Value::Null, TypeMeta::boolean()),
            Err(RuntimeError::TypeMismatch { found: None, .. }),
        ));
    }

    #[test]
    fn test_reference_targets() {
        let integer = TypeMeta::wrapper(Primitive::Int);

        assert_eq!(coerce(Value::Int(1), integer).unwrap(), Value::Int(1));
        assert_eq!(coerce(Value::Null, integer).unwrap(), Value::Null);
        assert!(coerce(Value::Short(1), integer).is_err());

        assert_eq!(coerce(Value::from("a"), TypeMeta::root()).unwrap(), Value::from("a"));
        assert_eq!(coerce(Value::Int(1), TypeMeta::root()).unwrap(), Value::Int(1));
        assert!(coerce(Value::Int(1), TypeMeta::string()).is_err());
        assert!(coerce(Value::Null, TypeMeta::void()).is_err());
    }

    #[test]
    fn test_default_values() {
        assert_eq!(default_value(TypeMeta::boolean()), Value::Boolean(false));
        assert_eq!(default_value(TypeMeta::char()), Value::Char('\0'));
        assert_eq!(default_value(TypeMeta::double()), Value::Double(0.0));
        assert_eq!(default_value(TypeMeta::wrapper(Primitive::Int)), Value::Null);
        assert_eq!(default_value(TypeMeta::string()), Value::Null);
    }
}
