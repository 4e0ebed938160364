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

mod fields;
mod methods;

use std::fmt::{Display, Formatter};

use crate::runtime::{
    find_constructor,
    override_access_or_fail,
    param_types,
    raise,
    Array,
    RuntimeError,
    RuntimeResult,
    TypeMeta,
    Value,
};

/// A type-erased handle to an object or to a bare type.
///
/// The handle is in one of three states:
///
///  - **Instance**: wraps a non-null [Value]. Every field and method of the
///    value's type, static or not, is available.
///  - **Type**: wraps only a [TypeMeta]. Static fields and methods are
///    available; instance-only operations fail with
///    [ObjectAbsent](RuntimeError::ObjectAbsent).
///  - **Absent**: wraps nothing. Every operation fails with
///    [ObjectAbsent](RuntimeError::ObjectAbsent).
///
/// Each field and method operation resolves the member first (see
/// [find_field](crate::runtime::find_field) and
/// [find_method](crate::runtime::find_method)), then
/// [overrides](crate::runtime::override_access) its visibility, then
/// performs the access. Errors raised by the invoked member bodies are
/// [normalized](crate::runtime::normalize), so the caller observes the
/// original failure.
///
/// Two handles are equal if they wrap [equal](Value::equals) values, the
/// same type, or if both are absent.
#[derive(Clone, Debug, Default)]
pub struct Refl {
    state: State,
}

#[derive(Clone, Debug, Default)]
enum State {
    #[default]
    Absent,
    Type(&'static TypeMeta),
    Instance(Value),
}

impl PartialEq for Refl {
    fn eq(&self, other: &Self) -> bool {
        match (&self.state, &other.state) {
            (State::Absent, State::Absent) => true,
            (State::Type(this), State::Type(other)) => this == other,
            (State::Instance(this), State::Instance(other)) => this.equals(other),
            _ => false,
        }
    }
}

impl Display for Refl {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.state {
            State::Absent => formatter.write_str("null"),
            State::Type(ty) => Display::fmt(ty, formatter),
            State::Instance(value) => Display::fmt(value, formatter),
        }
    }
}

impl Refl {
    /// Wraps a value. A [Null](Value::Null) value produces an absent handle.
    #[inline]
    pub fn new(value: impl Into<Value>) -> Self {
        let state = match value.into() {
            Value::Null => State::Absent,
            value => State::Instance(value),
        };

        Self { state }
    }

    /// Wraps a bare type, giving access to its static members.
    #[inline(always)]
    pub fn of_type(ty: &'static TypeMeta) -> Self {
        Self {
            state: State::Type(ty),
        }
    }

    #[inline(always)]
    pub fn absent() -> Self {
        Self::default()
    }

    /// Creates a new instance of the type and wraps it.
    ///
    /// The constructor is selected by the runtime types of the arguments,
    /// where [Null](Value::Null) arguments match any parameter type.
    #[inline]
    pub fn instantiate(ty: &'static TypeMeta, arguments: Vec<Value>) -> RuntimeResult<Self> {
        let params = param_types(&arguments);

        Self::construct(ty, &params, arguments)
    }

    /// Creates a new instance of the type using the constructor with exactly
    /// compatible parameter types.
    ///
    /// The `params` select the constructor the same way the argument types do
    /// in [instantiate](Self::instantiate), which is useful when some of the
    /// arguments are null.
    #[inline]
    pub fn instantiate_with(
        ty: &'static TypeMeta,
        params: &[&'static TypeMeta],
        arguments: Vec<Value>,
    ) -> RuntimeResult<Self> {
        let params = params.iter().copied().map(Some).collect::<Vec<_>>();

        Self::construct(ty, &params, arguments)
    }

    /// Like [instantiate](Self::instantiate), but looks the type up by its
    /// canonical name.
    #[inline]
    pub fn instantiate_named(name: &str, arguments: Vec<Value>) -> RuntimeResult<Self> {
        Self::instantiate(TypeMeta::by_name(name)?, arguments)
    }

    /// Returns false for absent handles.
    #[inline(always)]
    pub fn is_present(&self) -> bool {
        !matches!(&self.state, State::Absent)
    }

    /// Returns true if the handle wraps a bare type.
    #[inline(always)]
    pub fn is_type(&self) -> bool {
        matches!(&self.state, State::Type(_))
    }

    /// The wrapped value, if the handle is in the Instance state.
    #[inline(always)]
    pub fn value(&self) -> Option<&Value> {
        match &self.state {
            State::Instance(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the wrapped value, or [Null](Value::Null) if the handle does
    /// not wrap a value.
    #[inline(always)]
    pub fn into_value(self) -> Value {
        match self.state {
            State::Instance(value) => value,
            _ => Value::Null,
        }
    }

    /// The type of the wrapped value, or the wrapped type.
    #[inline(always)]
    pub fn object_type(&self) -> RuntimeResult<&'static TypeMeta> {
        self.target_type("type query")
    }

    /// Creates an array of the [object type](Self::object_type) filled with
    /// the items.
    ///
    /// Each item is checked against the component type.
    pub fn to_array(&self, items: Vec<Value>) -> RuntimeResult<Array> {
        Array::new(self.target_type("array creation")?, items)
    }

    /// Creates an array of the [object type](Self::object_type) filled with
    /// default values.
    #[inline]
    pub fn to_array_of_size(&self, length: usize) -> RuntimeResult<Array> {
        Ok(Array::with_length(
            self.target_type("array creation")?,
            length,
        ))
    }

    fn construct(
        ty: &'static TypeMeta,
        params: &[Option<&'static TypeMeta>],
        arguments: Vec<Value>,
    ) -> RuntimeResult<Self> {
        let constructor = override_access_or_fail(find_constructor(ty, params)?)?;

        match constructor.new_instance(arguments) {
            Ok(value) => Ok(Self::new(value)),
            Err(error) => raise(error),
        }
    }

    #[inline(always)]
    fn receiver(&self) -> Option<&Value> {
        self.value()
    }

    fn target_type(&self, operation: &'static str) -> RuntimeResult<&'static TypeMeta> {
        match &self.state {
            State::Absent => Err(RuntimeError::ObjectAbsent { operation }),
            State::Type(ty) => Ok(*ty),
            State::Instance(value) => value.ty().ok_or(RuntimeError::ObjectAbsent { operation }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::ops::Deref;

    use lady_deirdre::sync::Lazy;

    use crate::{
        args,
        runtime::{
            ConstructorDecl,
            FieldDecl,
            MethodDecl,
            Primitive,
            RuntimeError,
            TypeMeta,
            Value,
            Visibility,
        },
        Refl,
    };

    #[derive(Debug)]
    struct Overheat;

    impl std::fmt::Display for Overheat {
        fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("engine overheated")
        }
    }

    impl std::error::Error for Overheat {}

    static POINT: Lazy<&'static TypeMeta> = Lazy::new(|| {
        TypeMeta::class("tests.refl.Point")
            .field(FieldDecl::new("x", TypeMeta::int()).visibility(Visibility::Protected))
            .field(FieldDecl::new("y", TypeMeta::int()).visibility(Visibility::Protected))
            .field(
                FieldDecl::new("ORIGIN_LABEL", TypeMeta::string())
                    .static_field()
                    .initial("origin"),
            )
            .constructor(ConstructorDecl::new(
                [TypeMeta::int(), TypeMeta::int()],
                |mut invocation| {
                    let this = invocation.this()?.clone();

                    this.write("x", invocation.take(0)?)?;
                    this.write("y", invocation.take(1)?)?;

                    Ok(())
                },
            ))
            .constructor(
                ConstructorDecl::new([TypeMeta::string()], |_| {
                    Err(RuntimeError::raise(Overheat))
                })
                .visibility(Visibility::Private),
            )
            .method(MethodDecl::new(
                "equals",
                [TypeMeta::root()],
                TypeMeta::boolean(),
                |invocation| {
                    let this = invocation.this()?;

                    let Some(other) = invocation.arg(0).as_instance() else {
                        return Ok(Value::Boolean(false));
                    };

                    if this.ty() != other.ty() {
                        return Ok(Value::Boolean(false));
                    }

                    Ok(Value::Boolean(
                        this.read("x")? == other.read("x")? && this.read("y")? == other.read("y")?,
                    ))
                },
            ))
            .method(MethodDecl::new(
                "toString",
                [],
                TypeMeta::string(),
                |invocation| {
                    let this = invocation.this()?;

                    Ok(Value::from(format!(
                        "({}, {})",
                        this.read("x")?,
                        this.read("y")?,
                    )))
                },
            ))
            .build()
            .expect("Point declaration failed.")
    });

    #[test]
    fn test_instantiation() {
        let point = *POINT.deref();

        let handle = Refl::instantiate(point, args![3, 4]).unwrap();

        assert!(handle.is_present());
        assert!(!handle.is_type());
        assert_eq!(handle.object_type().unwrap(), point);
        assert_eq!(handle.get("x").unwrap(), Value::Int(3));
        assert_eq!(handle.to_string(), "(3, 4)");

        let integer = TypeMeta::wrapper(Primitive::Int);

        let handle = Refl::instantiate_with(point, &[integer, TypeMeta::int()], args![5, 6]).unwrap();

        assert_eq!(handle.get_as::<i32>("y").unwrap(), 6);

        let handle = Refl::instantiate_named("tests.refl.Point", args![7, 8]).unwrap();

        assert_eq!(handle.get_as::<i64>("x").unwrap(), 7);

        assert!(matches!(
            Refl::instantiate_named("tests.refl.Missing", args![]),
            Err(RuntimeError::UnknownType { .. }),
        ));

        assert!(Refl::instantiate(point, args![1])
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_instantiation_failure() {
        let error = Refl::instantiate(*POINT.deref(), args!["hot"]).unwrap_err();

        let RuntimeError::Raised { cause } = &error else {
            panic!("Unexpected error: {error:?}");
        };

        assert!(cause.is::<Overheat>());
        assert_eq!(error.to_string(), "engine overheated");
    }

    #[test]
    fn test_states() {
        let absent = Refl::new(Value::Null);

        assert!(!absent.is_present());
        assert_eq!(absent.to_string(), "null");
        assert!(absent.object_type().unwrap_err().is_object_absent());
        assert!(absent.get("x").unwrap_err().is_object_absent());
        assert!(absent.invoke("toString", args![]).unwrap_err().is_object_absent());
        assert!(absent.fields().unwrap_err().is_object_absent());
        assert!(absent.to_array_of_size(1).unwrap_err().is_object_absent());

        let ty = Refl::of_type(*POINT.deref());

        assert!(ty.is_type());
        assert_eq!(ty.to_string(), "tests.refl.Point");
        assert_eq!(ty.get_as::<String>("origin_label").unwrap(), "origin");
        assert!(ty.get("x").unwrap_err().is_object_absent());
        assert!(ty.invoke("toString", args![]).unwrap_err().is_object_absent());

        let string = Refl::new("text");

        assert_eq!(string.object_type().unwrap(), TypeMeta::string());
        assert_eq!(string.to_string(), "text");
        assert!(string.get("length").unwrap_err().is_not_found());
    }

    #[test]
    fn test_equality() {
        let point = *POINT.deref();

        let first = Refl::instantiate(point, args![1, 2]).unwrap();
        let second = Refl::instantiate(point, args![1, 2]).unwrap();
        let third = Refl::instantiate(point, args![2, 1]).unwrap();

        assert_eq!(first, second);
        assert_ne!(first, third);
        assert_eq!(Refl::new(5), Refl::new(5));
        assert_ne!(Refl::new(5), Refl::new(5i64));
        assert_eq!(Refl::absent(), Refl::new(Value::Null));
        assert_ne!(Refl::absent(), Refl::new(0));
        assert_eq!(Refl::of_type(point), Refl::of_type(point));
        assert_ne!(Refl::of_type(point), first);
        assert_ne!(Refl::of_type(point), Refl::absent());
    }

    #[test]
    fn test_float_equality() {
        let nan = Refl::new(f64::NAN);

        assert_eq!(nan, nan.clone());
        assert_eq!(Refl::new(f32::NAN), Refl::new(f32::NAN));
        assert_ne!(Refl::new(0.0f64), Refl::new(-0.0f64));
        assert_ne!(Refl::new(0.0f32), Refl::new(-0.0f32));
        assert_eq!(Refl::new(1.5f64), Refl::new(1.5f64));
    }

    #[test]
    fn test_arrays() {
        let point = *POINT.deref();
        let handle = Refl::instantiate(point, args![1, 2]).unwrap();
        let instance = handle.value().and_then(Value::as_instance).unwrap();

        let array = handle.to_array(args![instance, Value::Null]).unwrap();

        assert_eq!(array.ty(), TypeMeta::array_of(point));
        assert_eq!(array.len(), 2);

        let array = Refl::of_type(TypeMeta::int()).to_array_of_size(3).unwrap();

        assert_eq!(array.items(), [Value::Int(0), Value::Int(0), Value::Int(0)]);

        assert!(matches!(
            Refl::of_type(TypeMeta::int()).to_array(args!["x"]),
            Err(RuntimeError::TypeMismatch { .. }),
        ));
    }
}
