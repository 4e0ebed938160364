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

use std::{
    fmt::{Debug, Display, Formatter},
    sync::{Arc, RwLock},
};

use ahash::AHashMap;
use compact_str::CompactString;

use crate::runtime::{
    coercion::{coerce, default_value},
    find_method,
    Field,
    Lookup,
    MethodQuery,
    Primitive,
    RuntimeError,
    RuntimeResult,
    TypeMeta,
};

/// A type-erased runtime value.
///
/// Primitive values are always boxed: the [runtime type](Value::ty) of
/// `Value::Int(3)` is `core.Integer`. [Null](Value::Null) has no runtime
/// type, and represents an argument of unknown type during member
/// resolution.
///
/// The [PartialEq] implementation compares primitives, strings and arrays
/// structurally, and [instances](Instance) by identity. Use
/// [Value::equals] to compare objects through their declared `equals`
/// method.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Char(char),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(CompactString),
    Array(Array),
    Instance(Instance),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(this), Self::Boolean(other)) => this == other,
            (Self::Byte(this), Self::Byte(other)) => this == other,
            (Self::Short(this), Self::Short(other)) => this == other,
            (Self::Char(this), Self::Char(other)) => this == other,
            (Self::Int(this), Self::Int(other)) => this == other,
            (Self::Long(this), Self::Long(other)) => this == other,
            (Self::Float(this), Self::Float(other)) => this.to_bits() == other.to_bits(),
            (Self::Double(this), Self::Double(other)) => this.to_bits() == other.to_bits(),
            (Self::String(this), Self::String(other)) => this == other,
            (Self::Array(this), Self::Array(other)) => this == other,
            (Self::Instance(this), Self::Instance(other)) => this.ptr_eq(other),
            _ => false,
        }
    }
}

impl Debug for Value {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => formatter.write_str("Null"),
            Self::Boolean(value) => formatter.debug_tuple("Boolean").field(value).finish(),
            Self::Byte(value) => formatter.debug_tuple("Byte").field(value).finish(),
            Self::Short(value) => formatter.debug_tuple("Short").field(value).finish(),
            Self::Char(value) => formatter.debug_tuple("Char").field(value).finish(),
            Self::Int(value) => formatter.debug_tuple("Int").field(value).finish(),
            Self::Long(value) => formatter.debug_tuple("Long").field(value).finish(),
            Self::Float(value) => formatter.debug_tuple("Float").field(value).finish(),
            Self::Double(value) => formatter.debug_tuple("Double").field(value).finish(),
            Self::String(value) => formatter.debug_tuple("String").field(value).finish(),
            Self::Array(value) => Debug::fmt(value, formatter),
            Self::Instance(value) => Debug::fmt(value, formatter),
        }
    }
}

impl Display for Value {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => formatter.write_str("null"),
            Self::Boolean(value) => Display::fmt(value, formatter),
            Self::Byte(value) => Display::fmt(value, formatter),
            Self::Short(value) => Display::fmt(value, formatter),
            Self::Char(value) => Display::fmt(value, formatter),
            Self::Int(value) => Display::fmt(value, formatter),
            Self::Long(value) => Display::fmt(value, formatter),
            Self::Float(value) => Display::fmt(value, formatter),
            Self::Double(value) => Display::fmt(value, formatter),
            Self::String(value) => formatter.write_str(value),
            Self::Array(value) => Display::fmt(value, formatter),
            Self::Instance(value) => Display::fmt(value, formatter),
        }
    }
}

macro_rules! impl_value_from {
    ($($ty:ty => $variant:ident;)*) => {
        $(
        impl From<$ty> for Value {
            #[inline(always)]
            fn from(value: $ty) -> Self {
                Self::$variant(value)
            }
        }
        )*
    };
}

impl_value_from! {
    bool => Boolean;
    i8 => Byte;
    i16 => Short;
    char => Char;
    i32 => Int;
    i64 => Long;
    f32 => Float;
    f64 => Double;
    CompactString => String;
    Array => Array;
    Instance => Instance;
}

impl From<&str> for Value {
    #[inline(always)]
    fn from(value: &str) -> Self {
        Self::String(CompactString::from(value))
    }
}

impl From<String> for Value {
    #[inline(always)]
    fn from(value: String) -> Self {
        Self::String(CompactString::from(value))
    }
}

impl From<&Instance> for Value {
    #[inline(always)]
    fn from(value: &Instance) -> Self {
        Self::Instance(value.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    #[inline(always)]
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => Self::Null,
        }
    }
}

impl Value {
    /// The runtime type of the value, or `None` for [Null](Value::Null).
    pub fn ty(&self) -> Option<&'static TypeMeta> {
        Some(match self {
            Self::Null => return None,
            Self::Boolean(_) => TypeMeta::wrapper(Primitive::Boolean),
            Self::Byte(_) => TypeMeta::wrapper(Primitive::Byte),
            Self::Short(_) => TypeMeta::wrapper(Primitive::Short),
            Self::Char(_) => TypeMeta::wrapper(Primitive::Char),
            Self::Int(_) => TypeMeta::wrapper(Primitive::Int),
            Self::Long(_) => TypeMeta::wrapper(Primitive::Long),
            Self::Float(_) => TypeMeta::wrapper(Primitive::Float),
            Self::Double(_) => TypeMeta::wrapper(Primitive::Double),
            Self::String(_) => TypeMeta::string(),
            Self::Array(array) => array.ty(),
            Self::Instance(instance) => instance.ty(),
        })
    }

    #[inline(always)]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The primitive kind of a boxed primitive value.
    #[inline(always)]
    pub fn primitive_kind(&self) -> Option<Primitive> {
        match self {
            Self::Boolean(_) => Some(Primitive::Boolean),
            Self::Byte(_) => Some(Primitive::Byte),
            Self::Short(_) => Some(Primitive::Short),
            Self::Char(_) => Some(Primitive::Char),
            Self::Int(_) => Some(Primitive::Int),
            Self::Long(_) => Some(Primitive::Long),
            Self::Float(_) => Some(Primitive::Float),
            Self::Double(_) => Some(Primitive::Double),
            _ => None,
        }
    }

    /// Returns the underlying instance, if the value is an instance.
    #[inline(always)]
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Self::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    /// Converts the value into a Rust value.
    ///
    /// ```
    /// use ad_astra_reflect::runtime::Value;
    ///
    /// assert_eq!(Value::Int(5).take::<i64>().unwrap(), 5);
    /// assert_eq!(Value::Null.take::<Option<i32>>().unwrap(), None);
    /// assert!(Value::from("5").take::<i32>().is_err());
    /// ```
    #[inline(always)]
    pub fn take<T: FromValue>(self) -> RuntimeResult<T> {
        T::from_value(self)
    }

    /// Compares two values the way the object model defines equality.
    ///
    /// If this value is an instance whose type declares (or inherits) an
    /// `equals(core.Object) -> boolean` method, the method decides. Failures
    /// of the method count as inequality. Otherwise, the values are compared
    /// with [PartialEq].
    pub fn equals(&self, other: &Value) -> bool {
        let Self::Instance(instance) = self else {
            return self == other;
        };

        let query = MethodQuery::named("equals")
            .returns(TypeMeta::boolean())
            .params([Some(TypeMeta::root())]);

        let Ok(method) = find_method(instance.ty(), &query) else {
            return self == other;
        };

        match method.dispatch_unchecked(self, vec![other.clone()]) {
            Ok(Value::Boolean(result)) => result,
            _ => false,
        }
    }
}

/// A Rust type that can be extracted from a [Value].
///
/// Numeric types accept boxed primitives that widen to them, so an `i64` can
/// be taken from `Value::Int`. `Option<T>` maps [Null](Value::Null) to `None`.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> RuntimeResult<Self>;
}

impl FromValue for Value {
    #[inline(always)]
    fn from_value(value: Value) -> RuntimeResult<Self> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    #[inline(always)]
    fn from_value(value: Value) -> RuntimeResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => Ok(Some(T::from_value(other)?)),
        }
    }
}

macro_rules! impl_from_value_primitive {
    ($($ty:ty => $primitive:ident;)*) => {
        $(
        impl FromValue for $ty {
            fn from_value(value: Value) -> RuntimeResult<Self> {
                let target = TypeMeta::primitive(Primitive::$primitive);

                match coerce(value, target)? {
                    Value::$primitive(value) => Ok(value),

                    other => Err(RuntimeError::TypeMismatch {
                        expected: target,
                        found: other.ty(),
                    }),
                }
            }
        }
        )*
    };
}

impl_from_value_primitive! {
    bool => Boolean;
    i8 => Byte;
    i16 => Short;
    char => Char;
    i32 => Int;
    i64 => Long;
    f32 => Float;
    f64 => Double;
}

impl FromValue for CompactString {
    fn from_value(value: Value) -> RuntimeResult<Self> {
        match value {
            Value::String(string) => Ok(string),

            other => Err(RuntimeError::TypeMismatch {
                expected: TypeMeta::string(),
                found: other.ty(),
            }),
        }
    }
}

impl FromValue for String {
    #[inline(always)]
    fn from_value(value: Value) -> RuntimeResult<Self> {
        Ok(CompactString::from_value(value)?.into_string())
    }
}

impl FromValue for Instance {
    fn from_value(value: Value) -> RuntimeResult<Self> {
        match value {
            Value::Instance(instance) => Ok(instance),

            other => Err(RuntimeError::TypeMismatch {
                expected: TypeMeta::root(),
                found: other.ty(),
            }),
        }
    }
}

impl FromValue for Array {
    fn from_value(value: Value) -> RuntimeResult<Self> {
        match value {
            Value::Array(array) => Ok(array),

            other => Err(RuntimeError::TypeMismatch {
                expected: TypeMeta::array_of(TypeMeta::root()),
                found: other.ty(),
            }),
        }
    }
}

/// A fixed-length sequence of values of the same component type.
///
/// Arrays are values: cloning an array clones its elements, and two arrays
/// are equal if their component types and elements are equal.
#[derive(Clone, PartialEq)]
pub struct Array {
    component: &'static TypeMeta,
    items: Vec<Value>,
}

impl Debug for Array {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Array")
            .field("component", &self.component.name())
            .field("items", &self.items)
            .finish()
    }
}

impl Display for Array {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("[")?;

        let mut is_first = true;

        for item in &self.items {
            match is_first {
                true => is_first = false,
                false => formatter.write_str(", ")?,
            }

            Display::fmt(item, formatter)?;
        }

        formatter.write_str("]")
    }
}

impl Array {
    /// Creates an array, checking every item against the component type.
    ///
    /// ```
    /// use ad_astra_reflect::runtime::{Array, TypeMeta, Value};
    ///
    /// let array = Array::new(TypeMeta::long(), vec![Value::Int(1), Value::Long(2)]).unwrap();
    ///
    /// assert_eq!(array.items(), &[Value::Long(1), Value::Long(2)]);
    /// assert!(Array::new(TypeMeta::int(), vec![Value::Null]).is_err());
    /// ```
    pub fn new(component: &'static TypeMeta, items: Vec<Value>) -> RuntimeResult<Self> {
        let items = items
            .into_iter()
            .map(|item| coerce(item, component))
            .collect::<RuntimeResult<Vec<_>>>()?;

        Ok(Self { component, items })
    }

    /// Creates an array of `length` default values of the component type.
    pub fn with_length(component: &'static TypeMeta, length: usize) -> Self {
        Self {
            component,
            items: vec![default_value(component); length],
        }
    }

    #[inline(always)]
    pub fn component(&self) -> &'static TypeMeta {
        self.component
    }

    /// The array type of this array.
    #[inline(always)]
    pub fn ty(&self) -> &'static TypeMeta {
        TypeMeta::array_of(self.component)
    }

    #[inline(always)]
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline(always)]
    pub fn into_items(self) -> Vec<Value> {
        self.items
    }
}

/// A shared reference to an object of a declared class.
///
/// Cloning an Instance produces another reference to the same object. Two
/// instances are [equal](Instance::ptr_eq) only if they refer to the same
/// object.
///
/// The object stores one slot per instance field of its class and of every
/// superclass. The [read](Instance::read) and [write](Instance::write)
/// functions give member bodies direct access to these slots by exact field
/// name, bypassing visibility rules.
#[derive(Clone)]
pub struct Instance(Arc<InstanceData>);

struct InstanceData {
    ty: &'static TypeMeta,
    slots: RwLock<AHashMap<(usize, usize), Value>>,
}

impl Debug for Instance {
    #[inline]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_fmt(format_args!(
            "Instance({}@{:x})",
            self.0.ty,
            self.address()
        ))
    }
}

impl Display for Instance {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        let query = MethodQuery::named("toString")
            .returns(TypeMeta::string())
            .params([]);

        if let Ok(method) = find_method(self.0.ty, &query) {
            let receiver = Value::Instance(self.clone());

            if let Ok(Value::String(string)) = method.dispatch_unchecked(&receiver, Vec::new()) {
                return formatter.write_str(&string);
            }
        }

        formatter.write_fmt(format_args!("{}@{:x}", self.0.ty, self.address()))
    }
}

impl Instance {
    // Slots of all instance fields in the lineage are initialized here.
    pub(super) fn allocate(ty: &'static TypeMeta) -> Self {
        let mut slots = AHashMap::new();

        for level in ty.lineage() {
            for field in level.declared_fields() {
                if field.is_static() {
                    continue;
                }

                let _ = slots.insert(field.slot(), field.initial_value());
            }
        }

        Self(Arc::new(InstanceData {
            ty,
            slots: RwLock::new(slots),
        }))
    }

    /// The class of the object.
    #[inline(always)]
    pub fn ty(&self) -> &'static TypeMeta {
        self.0.ty
    }

    /// Returns true if both references point to the same object.
    #[inline(always)]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Reads the instance field with exactly this name.
    ///
    /// If several classes of the lineage declare a field with this name, the
    /// most derived one is read.
    pub fn read(&self, name: &str) -> RuntimeResult<Value> {
        let field = self.field_named(name)?;

        Ok(self.load(field))
    }

    /// Writes the instance field with exactly this name.
    ///
    /// The value is [coerced](crate::runtime::Field::set) to the field's
    /// declared type.
    pub fn write(&self, name: &str, value: Value) -> RuntimeResult<()> {
        let field = self.field_named(name)?;

        self.store(field, coerce(value, field.ty())?);

        Ok(())
    }

    pub(super) fn load(&self, field: &Field) -> Value {
        let slots = self.0.slots.read().unwrap_or_else(|poison| poison.into_inner());

        match slots.get(&field.slot()) {
            Some(value) => value.clone(),
            None => default_value(field.ty()),
        }
    }

    pub(super) fn store(&self, field: &Field, value: Value) {
        let mut slots = self.0.slots.write().unwrap_or_else(|poison| poison.into_inner());

        let _ = slots.insert(field.slot(), value);
    }

    fn field_named(&self, name: &str) -> RuntimeResult<&'static Field> {
        for level in self.0.ty.lineage() {
            for field in level.declared_fields() {
                if !field.is_static() && field.name() == name {
                    return Ok(field);
                }
            }
        }

        Err(RuntimeError::NotFound {
            lookup: Lookup::FieldName(CompactString::from(name)),
            receiver_type: self.0.ty,
            suggestion: None,
        })
    }

    #[inline(always)]
    fn address(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}
