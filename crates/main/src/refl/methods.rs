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
        find_method,
        methods,
        override_access_or_fail,
        param_types,
        raise,
        FromValue,
        Method,
        MethodQuery,
        RuntimeResult,
        Value,
    },
};

impl Refl {
    /// Finds a method matching the query and overrides its visibility.
    ///
    /// Unlike [invoke_with](Self::invoke_with), the query's parameter list is
    /// used as is: if it is not set, a method of any arity may match.
    #[inline]
    pub fn method(&self, query: &MethodQuery<'_>) -> RuntimeResult<&'static Method> {
        let method = find_method(self.target_type("method lookup")?, query)?;

        override_access_or_fail(method)
    }

    /// Invokes a method by name, selected by the runtime types of the
    /// arguments.
    ///
    /// [Null](Value::Null) arguments match any parameter type. Instance
    /// methods require the handle to wrap a value. Returns
    /// [Null](Value::Null) for methods returning `void`.
    #[inline]
    pub fn invoke(&self, name: &str, arguments: Vec<Value>) -> RuntimeResult<Value> {
        self.invoke_with(MethodQuery::named(name), arguments)
    }

    /// Invokes a method matching the query.
    ///
    /// If the query has no parameter list, the list is derived from the
    /// runtime types of the arguments.
    pub fn invoke_with(
        &self,
        mut query: MethodQuery<'_>,
        arguments: Vec<Value>,
    ) -> RuntimeResult<Value> {
        if query.params.is_none() {
            query.params = Some(param_types(&arguments));
        }

        self.invoke_method(self.method(&query)?, arguments)
    }

    /// Invokes a method by name and converts the result into a Rust value.
    #[inline]
    pub fn invoke_as<T: FromValue>(&self, name: &str, arguments: Vec<Value>) -> RuntimeResult<T> {
        self.invoke(name, arguments)?.take()
    }

    /// Invokes a method by name and wraps the result into a new handle.
    #[inline]
    pub fn invoke_refl(&self, name: &str, arguments: Vec<Value>) -> RuntimeResult<Refl> {
        Ok(Refl::new(self.invoke(name, arguments)?))
    }

    #[inline]
    pub fn invoke_refl_with(
        &self,
        query: MethodQuery<'_>,
        arguments: Vec<Value>,
    ) -> RuntimeResult<Refl> {
        Ok(Refl::new(self.invoke_with(query, arguments)?))
    }

    /// Invokes a method by name, discards the result, and returns this
    /// handle.
    #[inline]
    pub fn call(&self, name: &str, arguments: Vec<Value>) -> RuntimeResult<&Self> {
        let _ = self.invoke(name, arguments)?;

        Ok(self)
    }

    #[inline]
    pub fn call_with(&self, query: MethodQuery<'_>, arguments: Vec<Value>) -> RuntimeResult<&Self> {
        let _ = self.invoke_with(query, arguments)?;

        Ok(self)
    }

    /// Invokes the method on the wrapped value, or without a receiver if the
    /// method is static.
    ///
    /// Instance methods are dispatched to the most derived override available
    /// for the wrapped value's class.
    pub fn invoke_method(&self, method: &'static Method, arguments: Vec<Value>) -> RuntimeResult<Value> {
        let method = override_access_or_fail(method)?;

        match method.invoke(self.receiver(), arguments) {
            Ok(value) => Ok(value),
            Err(error) => raise(error),
        }
    }

    /// Lists the distinct methods of the handle's type, of its superclasses,
    /// and of the interfaces they directly implement.
    #[inline]
    pub fn methods(&self) -> RuntimeResult<Vec<&'static Method>> {
        Ok(methods(self.target_type("method listing")?))
    }

    #[inline]
    pub fn static_methods(&self) -> RuntimeResult<Vec<&'static Method>> {
        self.methods_where(Method::is_static)
    }

    #[inline]
    pub fn instance_methods(&self) -> RuntimeResult<Vec<&'static Method>> {
        self.methods_where(|method| !method.is_static())
    }

    pub fn methods_where(
        &self,
        predicate: impl Fn(&Method) -> bool,
    ) -> RuntimeResult<Vec<&'static Method>> {
        let mut methods = self.methods()?;

        methods.retain(|method| predicate(method));

        Ok(methods)
    }
}

#[cfg(test)]
mod tests {
    use std::ops::Deref;

    use lady_deirdre::sync::Lazy;

    use crate::{
        args,
        runtime::{
            FieldDecl,
            Method,
            MethodDecl,
            MethodQuery,
            Primitive,
            RuntimeError,
            TypeMeta,
            Value,
            Visibility,
        },
        Refl,
    };

    struct Fixture {
        greeter: &'static TypeMeta,
        counter: &'static TypeMeta,
        loud: &'static TypeMeta,
    }

    static FIXTURE: Lazy<Fixture> = Lazy::new(|| {
        let greeter = TypeMeta::interface("tests.refl.methods.Greeter")
            .method(MethodDecl::new(
                "greet",
                [TypeMeta::string()],
                TypeMeta::string(),
                |mut invocation| {
                    let whom = invocation
                        .take::<Option<String>>(0)?
                        .unwrap_or_else(|| String::from("stranger"));

                    Ok(Value::from(format!("Hello, {whom}!")))
                },
            ))
            .build()
            .expect("Greeter declaration failed.");

        let counter = TypeMeta::class("tests.refl.methods.Counter")
            .implements(greeter)
            .field(FieldDecl::new("count", TypeMeta::int()).visibility(Visibility::Private))
            .method(MethodDecl::new("increment", [], TypeMeta::void(), |invocation| {
                let this = invocation.this()?;
                let count = this.read("count")?.take::<i32>()?;

                this.write("count", Value::Int(count + 1))?;

                Ok(Value::Null)
            }))
            .method(
                MethodDecl::new("add", [TypeMeta::int()], TypeMeta::int(), |mut invocation| {
                    let delta = invocation.take::<i32>(0)?;
                    let this = invocation.this()?;
                    let count = this.read("count")?.take::<i32>()? + delta;

                    this.write("count", Value::Int(count))?;

                    Ok(Value::Int(count))
                })
                .visibility(Visibility::Protected),
            )
            .method(MethodDecl::new("me", [], TypeMeta::root(), |invocation| {
                Ok(Value::from(invocation.this()?))
            }))
            .method(MethodDecl::new("fail", [], TypeMeta::void(), |_| {
                Err(RuntimeError::raise_message("counter is broken").propagate())
            }))
            .method(
                MethodDecl::new(
                    "twice",
                    [TypeMeta::long()],
                    TypeMeta::long(),
                    |mut invocation| Ok(Value::Long(invocation.take::<i64>(0)? * 2)),
                )
                .static_method()
                .visibility(Visibility::Package),
            )
            .build()
            .expect("Counter declaration failed.");

        let loud = TypeMeta::class("tests.refl.methods.LoudCounter")
            .extends(counter)
            .method(MethodDecl::new(
                "greet",
                [TypeMeta::string()],
                TypeMeta::string(),
                |mut invocation| {
                    let whom = invocation.take::<Option<String>>(0)?.unwrap_or_default();

                    Ok(Value::from(format!("HELLO, {}!", whom.to_uppercase())))
                },
            ))
            .method(
                MethodDecl::new("add", [TypeMeta::int()], TypeMeta::int(), |mut invocation| {
                    let delta = invocation.take::<i32>(0)? * 10;
                    let this = invocation.this()?;
                    let count = this.read("count")?.take::<i32>()? + delta;

                    this.write("count", Value::Int(count))?;

                    Ok(Value::Int(count))
                })
                .visibility(Visibility::Protected),
            )
            .build()
            .expect("LoudCounter declaration failed.");

        Fixture {
            greeter,
            counter,
            loud,
        }
    });

    #[test]
    fn test_invoke_and_call() {
        let fixture = FIXTURE.deref();
        let handle = Refl::instantiate(fixture.counter, args![]).unwrap();

        handle
            .call("increment", args![])
            .unwrap()
            .call("INCREMENT", args![])
            .unwrap();

        assert_eq!(handle.get_as::<i32>("count").unwrap(), 2);
        assert_eq!(handle.invoke("add", args![5]).unwrap(), Value::Int(7));
        assert_eq!(handle.invoke_as::<i64>("add", args![1]).unwrap(), 8);
        assert_eq!(handle.invoke("increment", args![]).unwrap(), Value::Null);

        let count = handle
            .invoke_refl("me", args![])
            .unwrap()
            .get_as::<i32>("count")
            .unwrap();

        assert_eq!(count, 9);
        assert_eq!(handle.invoke_refl("me", args![]).unwrap(), handle);
    }

    #[test]
    fn test_null_argument() {
        let fixture = FIXTURE.deref();
        let handle = Refl::instantiate(fixture.counter, args![]).unwrap();

        assert_eq!(
            handle.invoke_as::<String>("greet", args![Value::Null]).unwrap(),
            "Hello, stranger!",
        );
        assert_eq!(
            handle.invoke_as::<String>("greet", args!["Alice"]).unwrap(),
            "Hello, Alice!",
        );

        let greet = handle
            .method(&MethodQuery::named("greet").params([None]))
            .unwrap();

        assert_eq!(greet.owner(), fixture.greeter);
    }

    #[test]
    fn test_virtual_dispatch() {
        let fixture = FIXTURE.deref();
        let handle = Refl::instantiate(fixture.loud, args![]).unwrap();

        assert_eq!(
            handle.invoke_as::<String>("greet", args!["bob"]).unwrap(),
            "HELLO, BOB!",
        );

        let add = Refl::of_type(fixture.counter)
            .method(&MethodQuery::named("add").param_types([TypeMeta::int()]))
            .unwrap();

        assert_eq!(add.owner(), fixture.counter);
        assert_eq!(handle.invoke_method(add, args![2]).unwrap(), Value::Int(20));

        let greet = Refl::of_type(fixture.greeter)
            .method(&MethodQuery::named("greet"))
            .unwrap();

        assert_eq!(
            handle.invoke_method(greet, args!["eve"]).unwrap(),
            Value::from("HELLO, EVE!"),
        );
    }

    #[test]
    fn test_missing_method() {
        let fixture = FIXTURE.deref();
        let handle = Refl::instantiate(fixture.counter, args![]).unwrap();

        let error = handle.invoke("explode", args![1]).unwrap_err();
        let message = error.to_string();

        assert!(error.is_not_found());
        assert!(message.contains("explode"));
        assert!(message.contains("tests.refl.methods.Counter"));

        assert!(handle.invoke("add", args![1, 2]).unwrap_err().is_not_found());
        assert!(handle.invoke("add", args!["1"]).unwrap_err().is_not_found());
    }

    #[test]
    fn test_failure_normalization() {
        let fixture = FIXTURE.deref();
        let handle = Refl::instantiate(fixture.counter, args![]).unwrap();

        let error = handle.invoke("fail", args![]).unwrap_err();

        assert!(matches!(error, RuntimeError::Raised { .. }));
        assert_eq!(error.to_string(), "counter is broken");
    }

    #[test]
    fn test_static_methods() {
        let fixture = FIXTURE.deref();
        let ty = Refl::of_type(fixture.loud);

        assert_eq!(ty.invoke("twice", args![21i64]).unwrap(), Value::Long(42));

        let long = TypeMeta::wrapper(Primitive::Long);

        assert!(ty
            .invoke_with(MethodQuery::named("twice").returns(long), args![4i64])
            .unwrap_err()
            .is_not_found());
        assert_eq!(
            ty.invoke_with(MethodQuery::named("twice").returns(TypeMeta::long()), args![4i64])
                .unwrap(),
            Value::Long(8),
        );

        assert!(ty.invoke("increment", args![]).unwrap_err().is_object_absent());
        assert!(ty.call("fail", args![]).unwrap_err().is_object_absent());
    }

    #[test]
    fn test_listing() {
        let fixture = FIXTURE.deref();
        let handle = Refl::of_type(fixture.loud);

        let names = |methods: Vec<&'static Method>| {
            methods
                .into_iter()
                .map(|method| format!("{}.{}", method.owner().simple_name(), method.name()))
                .collect::<Vec<_>>()
        };

        assert_eq!(
            names(handle.methods().unwrap()),
            [
                "LoudCounter.greet",
                "LoudCounter.add",
                "Counter.twice",
                "Counter.increment",
                "Counter.add",
                "Counter.me",
                "Counter.fail",
                "Greeter.greet",
            ],
        );
        assert_eq!(names(handle.static_methods().unwrap()), ["Counter.twice"]);
        assert_eq!(handle.instance_methods().unwrap().len(), 7);
        assert_eq!(
            names(handle.methods_where(|method| method.params().len() == 1).unwrap()),
            [
                "LoudCounter.greet",
                "LoudCounter.add",
                "Counter.twice",
                "Counter.add",
                "Greeter.greet",
            ],
        );
    }
}
