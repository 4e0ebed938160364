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

use crate::{
    refl::Refl,
    runtime::{
        equals_fields,
        fields,
        find_field,
        override_access_or_fail,
        Field,
        FieldQuery,
        FromValue,
        RuntimeError,
        RuntimeResult,
        RuntimeResultExt,
        TypeMeta,
        Value,
    },
};

impl Refl {
    /// Finds a field by name, ignoring letter case, and overrides its
    /// visibility.
    #[inline]
    pub fn field(&self, name: &str) -> RuntimeResult<&'static Field> {
        self.resolve_field(&FieldQuery::Name(name))
    }

    /// Finds the first field whose declared type is assignable to `ty`.
    #[inline]
    pub fn field_by_type(&self, ty: &'static TypeMeta) -> RuntimeResult<&'static Field> {
        self.resolve_field(&FieldQuery::Type(ty))
    }

    /// Like [field_by_type](Self::field_by_type), but the type is given by
    /// its canonical name.
    #[inline]
    pub fn field_nameless(&self, type_name: &str) -> RuntimeResult<&'static Field> {
        self.field_by_type(TypeMeta::by_name(type_name)?)
    }

    #[inline]
    pub fn field_where(&self, predicate: impl Fn(&Field) -> bool) -> RuntimeResult<&'static Field> {
        self.resolve_field(&FieldQuery::Predicate(&predicate))
    }

    /// Reads a field found by name.
    ///
    /// Instance fields require the handle to wrap a value. Static fields are
    /// readable from [type handles](Refl::of_type) too.
    #[inline]
    pub fn get(&self, name: &str) -> RuntimeResult<Value> {
        self.get_field(self.field(name)?)
    }

    #[inline]
    pub fn get_by_type(&self, ty: &'static TypeMeta) -> RuntimeResult<Value> {
        self.get_field(self.field_by_type(ty)?)
    }

    #[inline]
    pub fn get_nameless(&self, type_name: &str) -> RuntimeResult<Value> {
        self.get_field(self.field_nameless(type_name)?)
    }

    #[inline]
    pub fn get_where(&self, predicate: impl Fn(&Field) -> bool) -> RuntimeResult<Value> {
        self.get_field(self.field_where(predicate)?)
    }

    /// Reads a field found by name and converts its content into a Rust
    /// value.
    #[inline]
    pub fn get_as<T: FromValue>(&self, name: &str) -> RuntimeResult<T> {
        self.get(name)?.take()
    }

    /// Reads a field found by name and wraps its content into a new handle.
    #[inline]
    pub fn get_refl(&self, name: &str) -> RuntimeResult<Refl> {
        Ok(Refl::new(self.get(name)?))
    }

    #[inline]
    pub fn get_refl_by_type(&self, ty: &'static TypeMeta) -> RuntimeResult<Refl> {
        Ok(Refl::new(self.get_by_type(ty)?))
    }

    #[inline]
    pub fn get_refl_nameless(&self, type_name: &str) -> RuntimeResult<Refl> {
        Ok(Refl::new(self.get_nameless(type_name)?))
    }

    #[inline]
    pub fn get_refl_where(&self, predicate: impl Fn(&Field) -> bool) -> RuntimeResult<Refl> {
        Ok(Refl::new(self.get_where(predicate)?))
    }

    /// Reads the field from the wrapped value, or from the type if the field
    /// is static.
    pub fn get_field(&self, field: &'static Field) -> RuntimeResult<Value> {
        let field = override_access_or_fail(field)?;

        field.get(self.receiver()).normalized()
    }

    /// Writes a field found by name and returns this handle.
    ///
    /// The value must be compatible with the declared type of the field.
    #[inline]
    pub fn set(&self, name: &str, value: impl Into<Value>) -> RuntimeResult<&Self> {
        self.set_field(self.field(name)?, value)
    }

    #[inline]
    pub fn set_by_type(
        &self,
        ty: &'static TypeMeta,
        value: impl Into<Value>,
    ) -> RuntimeResult<&Self> {
        self.set_field(self.field_by_type(ty)?, value)
    }

    #[inline]
    pub fn set_nameless(&self, type_name: &str, value: impl Into<Value>) -> RuntimeResult<&Self> {
        self.set_field(self.field_nameless(type_name)?, value)
    }

    #[inline]
    pub fn set_where(
        &self,
        predicate: impl Fn(&Field) -> bool,
        value: impl Into<Value>,
    ) -> RuntimeResult<&Self> {
        self.set_field(self.field_where(predicate)?, value)
    }

    pub fn set_field(&self, field: &'static Field, value: impl Into<Value>) -> RuntimeResult<&Self> {
        let field = override_access_or_fail(field)?;

        field.set(self.receiver(), value.into()).normalized()?;

        Ok(self)
    }

    /// Lists the fields of the handle's type and of its superclasses, in the
    /// lookup order.
    #[inline]
    pub fn fields(&self) -> RuntimeResult<Vec<&'static Field>> {
        Ok(fields(self.target_type("field listing")?))
    }

    #[inline]
    pub fn static_fields(&self) -> RuntimeResult<Vec<&'static Field>> {
        self.fields_where(Field::is_static)
    }

    #[inline]
    pub fn instance_fields(&self) -> RuntimeResult<Vec<&'static Field>> {
        self.fields_where(|field| !field.is_static())
    }

    pub fn fields_where(
        &self,
        predicate: impl Fn(&Field) -> bool,
    ) -> RuntimeResult<Vec<&'static Field>> {
        let mut fields = self.fields()?;

        fields.retain(|field| predicate(field));

        Ok(fields)
    }

    /// Compares the wrapped object with the other handle's object field by
    /// field, using [equals_fields].
    ///
    /// Wrapped values that are not objects are compared with
    /// [Value::equals]. Returns false if the other handle is not in the
    /// Instance state. Fails with
    /// [ObjectAbsent](crate::runtime::RuntimeError::ObjectAbsent) if this
    /// handle is not in the Instance state.
    pub fn equals_fields(&self, other: &Refl) -> RuntimeResult<bool> {
        let Some(this) = self.value() else {
            return Err(RuntimeError::ObjectAbsent {
                operation: "field comparison",
            });
        };

        let Some(other) = other.value() else {
            return Ok(false);
        };

        match this.as_instance() {
            Some(instance) => Ok(equals_fields(instance, other)),
            None => Ok(this.equals(other)),
        }
    }

    fn resolve_field(&self, query: &FieldQuery<'_>) -> RuntimeResult<&'static Field> {
        let field = find_field(self.target_type("field lookup")?, query)?;

        override_access_or_fail(field)
    }
}

#[cfg(test)]
mod tests {
    use std::ops::Deref;

    use lady_deirdre::sync::Lazy;

    use crate::{
        args,
        runtime::{Array, Field, FieldDecl, Primitive, RuntimeError, TypeMeta, Value, Visibility},
        Refl,
    };

    struct Fixture {
        account: &'static TypeMeta,
        savings: &'static TypeMeta,
        locked: &'static TypeMeta,
    }

    static FIXTURE: Lazy<Fixture> = Lazy::new(|| {
        let account = TypeMeta::class("tests.refl.fields.Account")
            .field(FieldDecl::new("owner", TypeMeta::string()).visibility(Visibility::Protected))
            .field(
                FieldDecl::new("balance", TypeMeta::long())
                    .visibility(Visibility::Private)
                    .initial(100),
            )
            .field(FieldDecl::new("OPENED", TypeMeta::int()).static_field())
            .build()
            .expect("Account declaration failed.");

        let savings = TypeMeta::class("tests.refl.fields.Savings")
            .extends(account)
            .field(FieldDecl::new("rate", TypeMeta::double()).initial(1.5))
            .field(FieldDecl::new("history", TypeMeta::array_of(TypeMeta::long())))
            .build()
            .expect("Savings declaration failed.");

        let locked = TypeMeta::class("tests.refl.fields.Locked")
            .sealed()
            .field(FieldDecl::new("pin", TypeMeta::int()).visibility(Visibility::Private))
            .build()
            .expect("Locked declaration failed.");

        Fixture {
            account,
            savings,
            locked,
        }
    });

    #[test]
    fn test_get_and_set() {
        let fixture = FIXTURE.deref();
        let handle = Refl::instantiate(fixture.savings, args![]).unwrap();

        assert_eq!(handle.get("owner").unwrap(), Value::Null);
        assert_eq!(handle.get_as::<i64>("BALANCE").unwrap(), 100);
        assert_eq!(handle.get_as::<f64>("rate").unwrap(), 1.5);

        handle
            .set("owner", "Alice")
            .unwrap()
            .set("balance", 250)
            .unwrap()
            .set_by_type(TypeMeta::double(), 2.0f32)
            .unwrap();

        assert_eq!(handle.get_as::<String>("owner").unwrap(), "Alice");
        assert_eq!(handle.get("balance").unwrap(), Value::Long(250));
        assert_eq!(handle.get_by_type(TypeMeta::double()).unwrap(), Value::Double(2.0));

        assert!(matches!(
            handle.set("balance", "lots"),
            Err(RuntimeError::TypeMismatch { .. }),
        ));
        assert!(matches!(
            handle.set("balance", Value::Null),
            Err(RuntimeError::TypeMismatch { .. }),
        ));
    }

    #[test]
    fn test_lookup_strategies() {
        let fixture = FIXTURE.deref();
        let handle = Refl::instantiate(fixture.savings, args![]).unwrap();

        handle.set_nameless("core.String", "Bob").unwrap();

        assert_eq!(
            handle.get_nameless("core.String").unwrap(),
            Value::from("Bob"),
        );

        let owner = handle.field_nameless("core.String").unwrap();

        assert_eq!(owner.name(), "owner");

        let history = handle
            .get_where(|field| field.ty().is_array())
            .unwrap();

        assert_eq!(history, Value::Null);

        let array = Array::new(TypeMeta::long(), args![1, 2i64]).unwrap();

        handle
            .set_where(|field| field.ty().is_array(), Value::Array(array.clone()))
            .unwrap();

        assert_eq!(handle.get("history").unwrap(), Value::Array(array));

        let owner = handle.get_refl("owner").unwrap();

        assert_eq!(owner, Refl::new("Bob"));
        assert!(handle.get_refl("rate").unwrap().is_present());

        assert!(matches!(
            handle.field_nameless("tests.refl.fields.Nothing"),
            Err(RuntimeError::UnknownType { .. }),
        ));
        assert!(handle
            .field_by_type(TypeMeta::wrapper(Primitive::Boolean))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_static_fields() {
        let fixture = FIXTURE.deref();
        let ty = Refl::of_type(fixture.savings);

        ty.set("opened", 3).unwrap();

        assert_eq!(ty.get("OPENED").unwrap(), Value::Int(3));

        let instance = Refl::instantiate(fixture.account, args![]).unwrap();

        assert_eq!(instance.get_as::<i32>("opened").unwrap(), 3);
        assert!(ty.set("rate", 1.0).unwrap_err().is_object_absent());
        assert!(ty.get_refl("owner").unwrap_err().is_object_absent());
    }

    #[test]
    fn test_listing() {
        let fixture = FIXTURE.deref();
        let handle = Refl::of_type(fixture.savings);

        let names = |fields: Vec<&'static Field>| {
            fields
                .into_iter()
                .map(|field| field.name())
                .collect::<Vec<_>>()
        };

        assert_eq!(
            names(handle.fields().unwrap()),
            ["rate", "history", "OPENED", "owner", "balance"],
        );
        assert_eq!(names(handle.static_fields().unwrap()), ["OPENED"]);
        assert_eq!(
            names(handle.instance_fields().unwrap()),
            ["rate", "history", "owner", "balance"],
        );
        assert_eq!(
            names(handle.fields_where(|field| field.ty().is_primitive()).unwrap()),
            ["rate", "OPENED", "balance"],
        );
    }

    #[test]
    fn test_equals_fields() {
        let fixture = FIXTURE.deref();

        let first = Refl::instantiate(fixture.savings, args![]).unwrap();
        let second = Refl::instantiate(fixture.savings, args![]).unwrap();

        assert!(first.equals_fields(&second).unwrap());
        assert_ne!(first, second);

        first.set("balance", 5).unwrap();

        assert!(!first.equals_fields(&second).unwrap());

        second.set("balance", 5).unwrap();

        assert!(first.equals_fields(&second).unwrap());

        let account = Refl::instantiate(fixture.account, args![]).unwrap();
        let savings = Refl::instantiate(fixture.savings, args![]).unwrap();

        assert!(account.equals_fields(&savings).unwrap());
        assert!(!savings.equals_fields(&account).unwrap());
        assert!(!account.equals_fields(&Refl::absent()).unwrap());
        assert!(Refl::new(3).equals_fields(&Refl::new(3)).unwrap());

        assert!(matches!(
            Refl::of_type(fixture.account).equals_fields(&account),
            Err(RuntimeError::ObjectAbsent { .. }),
        ));
    }

    #[test]
    fn test_sealed_access() {
        let fixture = FIXTURE.deref();
        let handle = Refl::instantiate(fixture.locked, args![]).unwrap();

        match handle.get("pin") {
            Err(error @ RuntimeError::AccessDenied { .. }) => {
                assert_eq!(
                    error.to_string(),
                    "could not override access for tests.refl.fields.Locked::pin: int",
                );
            }

            other => panic!("Unexpected result: {other:?}"),
        }
    }
}
