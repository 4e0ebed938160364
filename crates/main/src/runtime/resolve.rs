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

use std::fmt::{Debug, Formatter};

use ahash::AHashSet;
use compact_str::CompactString;
use log::trace;

use crate::runtime::{
    Constructor,
    Field,
    Ident,
    Instance,
    Lookup,
    Method,
    RuntimeError,
    RuntimeResult,
    TypeMeta,
    Value,
    RESOLVE_LOG,
};

/// A field lookup strategy.
#[derive(Clone, Copy)]
pub enum FieldQuery<'a> {
    /// A field with this name, ignoring letter case.
    Name(&'a str),

    /// A field whose declared type is assignable to this type.
    Type(&'static TypeMeta),

    /// A field satisfying the predicate.
    Predicate(&'a dyn Fn(&Field) -> bool),
}

impl<'a> Debug for FieldQuery<'a> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name(name) => formatter.debug_tuple("Name").field(name).finish(),
            Self::Type(ty) => formatter.debug_tuple("Type").field(&ty.name()).finish(),
            Self::Predicate(_) => formatter.write_str("Predicate"),
        }
    }
}

impl<'a> FieldQuery<'a> {
    /// Returns true if the field satisfies this query.
    pub fn matches(&self, field: &Field) -> bool {
        match self {
            Self::Name(name) => Ident::matches(&field.name, name),
            Self::Type(ty) => ty.is_assignable_from(field.ty()),
            Self::Predicate(predicate) => predicate(field),
        }
    }

    fn lookup(&self) -> Lookup {
        match self {
            Self::Name(name) => Lookup::FieldName(CompactString::from(*name)),
            Self::Type(ty) => Lookup::FieldType(*ty),
            Self::Predicate(_) => Lookup::FieldPredicate,
        }
    }
}

/// A method lookup query.
///
/// Every criterion is optional, and the criteria that are set must all be
/// satisfied:
///
///  - The method name, compared ignoring letter case.
///  - The return type: the declared return type must be assignable to it.
///  - The parameter list: the number of parameters must match exactly, and
///    every parameter must be [compatible](params_compatible) with the
///    corresponding query slot. A `None` slot stands for a null argument and
///    matches any parameter. When the list is not set, methods of any arity
///    match.
///  - An arbitrary predicate.
///
/// ```
/// use ad_astra_reflect::runtime::{MethodQuery, TypeMeta};
///
/// let query = MethodQuery::named("greet")
///     .returns(TypeMeta::string())
///     .params([Some(TypeMeta::string())]);
///
/// assert_eq!(query.name, Some("greet"));
/// ```
#[derive(Clone, Default)]
pub struct MethodQuery<'a> {
    pub name: Option<&'a str>,
    pub returns: Option<&'static TypeMeta>,
    pub params: Option<Vec<Option<&'static TypeMeta>>>,
    pub predicate: Option<&'a dyn Fn(&Method) -> bool>,
}

impl<'a> Debug for MethodQuery<'a> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("MethodQuery")
            .field("name", &self.name)
            .field("returns", &self.returns.map(TypeMeta::name))
            .field("params", &self.params)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

impl<'a> MethodQuery<'a> {
    /// A query that matches any method.
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }

    /// A query that matches methods with this name.
    #[inline(always)]
    pub fn named(name: &'a str) -> Self {
        Self {
            name: Some(name),
            ..Self::default()
        }
    }

    #[inline(always)]
    pub fn name(mut self, name: &'a str) -> Self {
        self.name = Some(name);

        self
    }

    #[inline(always)]
    pub fn returns(mut self, ty: &'static TypeMeta) -> Self {
        self.returns = Some(ty);

        self
    }

    /// Sets the parameter list. `None` slots match any parameter type.
    #[inline(always)]
    pub fn params(mut self, params: impl IntoIterator<Item = Option<&'static TypeMeta>>) -> Self {
        self.params = Some(params.into_iter().collect());

        self
    }

    /// Sets the parameter list with every slot known.
    #[inline(always)]
    pub fn param_types(mut self, params: impl IntoIterator<Item = &'static TypeMeta>) -> Self {
        self.params = Some(params.into_iter().map(Some).collect());

        self
    }

    #[inline(always)]
    pub fn matching(mut self, predicate: &'a dyn Fn(&Method) -> bool) -> Self {
        self.predicate = Some(predicate);

        self
    }

    /// Returns true if the method satisfies every criterion of this query.
    pub fn matches(&self, method: &Method) -> bool {
        if let Some(name) = self.name {
            if !Ident::matches(&method.name, name) {
                return false;
            }
        }

        if let Some(returns) = self.returns {
            if !returns.is_assignable_from(method.return_type()) {
                return false;
            }
        }

        if let Some(params) = &self.params {
            if !params_compatible(params, method.params()) {
                return false;
            }
        }

        if let Some(predicate) = self.predicate {
            if !predicate(method) {
                return false;
            }
        }

        true
    }

    fn lookup(&self) -> Lookup {
        Lookup::Method {
            returns: self.returns,
            name: self.name.map(CompactString::from),
            params: self.params.clone(),
            filtered: self.predicate.is_some(),
        }
    }
}

/// Checks an argument type list against the declared parameter types.
///
/// The lists must have the same length. For every position with a known
/// query type `q` and the declared type `d`, both normalized to their
/// [wrapper](TypeMeta::to_wrapper) forms:
///
///  - If `q` is an array type, `d` must be an array type too, and the
///    component of `q` must be assignable from the component of `d`.
///  - `d` must be assignable from `q`.
///
/// Unknown (`None`) query slots always match.
///
/// ```
/// use ad_astra_reflect::runtime::{params_compatible, Primitive, TypeMeta};
///
/// let integer = TypeMeta::wrapper(Primitive::Int);
///
/// assert!(params_compatible(&[Some(integer)], &[TypeMeta::int()]));
/// assert!(params_compatible(&[Some(TypeMeta::int())], &[integer]));
/// assert!(params_compatible(&[None], &[TypeMeta::string()]));
/// assert!(params_compatible(&[Some(TypeMeta::string())], &[TypeMeta::root()]));
/// assert!(!params_compatible(&[Some(TypeMeta::root())], &[TypeMeta::string()]));
/// assert!(!params_compatible(&[Some(TypeMeta::int())], &[TypeMeta::long()]));
/// assert!(!params_compatible(&[], &[TypeMeta::int()]));
/// ```
pub fn params_compatible(query: &[Option<&'static TypeMeta>], declared: &[&'static TypeMeta]) -> bool {
    if query.len() != declared.len() {
        return false;
    }

    for (query, declared) in query.iter().zip(declared) {
        let Some(query) = query else {
            continue;
        };

        let query = query.to_wrapper();
        let declared = declared.to_wrapper();

        if let Some(query_component) = query.component() {
            let Some(declared_component) = declared.component() else {
                return false;
            };

            if !query_component.is_assignable_from(declared_component) {
                return false;
            }
        }

        if !declared.is_assignable_from(query) {
            return false;
        }
    }

    true
}

/// Finds a field of the type or of its superclasses.
///
/// The type's own fields are searched first, statics before instance fields,
/// then the fields of its superclass, and so on up to (but excluding)
/// `core.Object`. The first field satisfying the query wins.
///
/// Returns [RuntimeError::NotFound] if no field matches.
pub fn find_field(ty: &'static TypeMeta, query: &FieldQuery<'_>) -> RuntimeResult<&'static Field> {
    for level in ty.lineage() {
        for field in level.declared_fields() {
            if query.matches(field) {
                return Ok(field);
            }
        }
    }

    trace!(target: RESOLVE_LOG, "Lookup of {} in {ty} failed.", query.lookup());

    let suggestion = match query {
        FieldQuery::Name(name) => suggest(name, fields(ty).into_iter().map(Field::name)),
        _ => None,
    };

    Err(RuntimeError::NotFound {
        lookup: query.lookup(),
        receiver_type: ty,
        suggestion,
    })
}

/// Finds a method of the type, of its interfaces, or of its superclasses.
///
/// At every level of the type's lineage, the level's own methods are
/// searched first (statics before instance methods), then the methods of the
/// interfaces it implements, depth-first in declaration order, then the next
/// superclass. The search stops before `core.Object`. The first method
/// satisfying the query wins.
///
/// Returns [RuntimeError::NotFound] if no method matches.
pub fn find_method(ty: &'static TypeMeta, query: &MethodQuery<'_>) -> RuntimeResult<&'static Method> {
    let mut stack = Vec::new();

    for level in ty.lineage() {
        for method in level.declared_methods() {
            if query.matches(method) {
                return Ok(method);
            }
        }

        stack.extend(level.interfaces().iter().rev().copied());

        while let Some(interface) = stack.pop() {
            for method in interface.declared_methods() {
                if query.matches(method) {
                    return Ok(method);
                }
            }

            stack.extend(interface.interfaces().iter().rev().copied());
        }
    }

    trace!(target: RESOLVE_LOG, "Lookup of {} in {ty} failed.", query.lookup());

    let suggestion = match query.name {
        Some(name) => suggest(name, methods(ty).into_iter().map(Method::name)),
        None => None,
    };

    Err(RuntimeError::NotFound {
        lookup: query.lookup(),
        receiver_type: ty,
        suggestion,
    })
}

/// Finds a constructor of exactly this type with compatible parameters.
///
/// Constructors are not inherited, so superclasses are not searched. The
/// parameter list follows the [params_compatible] rules.
///
/// Returns [RuntimeError::NotFound] if no constructor matches.
pub fn find_constructor(
    ty: &'static TypeMeta,
    params: &[Option<&'static TypeMeta>],
) -> RuntimeResult<&'static Constructor> {
    for constructor in ty.declared_constructors() {
        if params_compatible(params, constructor.params()) {
            return Ok(constructor);
        }
    }

    trace!(target: RESOLVE_LOG, "Constructor lookup in {ty} failed.");

    Err(RuntimeError::NotFound {
        lookup: Lookup::Constructor {
            params: params.to_vec(),
        },
        receiver_type: ty,
        suggestion: None,
    })
}

/// Lists the fields of the type and its superclasses.
///
/// The order is the lookup order of [find_field].
pub fn fields(ty: &'static TypeMeta) -> Vec<&'static Field> {
    ty.lineage()
        .flat_map(|level| level.declared_fields().iter())
        .collect()
}

/// Compares two objects field by field.
///
/// The `other` value must be an object of the class of `this` or of its
/// subclass. Every instance field of the class of `this` and of its
/// superclasses is compared with [Value::equals], regardless of the field's
/// visibility. Static fields are skipped.
///
/// ```
/// use ad_astra_reflect::{
///     args,
///     runtime::{equals_fields, FieldDecl, TypeMeta, Value},
///     Refl,
/// };
///
/// let pair = TypeMeta::class("docs.resolve.Pair")
///     .field(FieldDecl::new("left", TypeMeta::int()))
///     .build()
///     .unwrap();
///
/// let first = Refl::instantiate(pair, args![]).unwrap();
/// let second = Refl::instantiate(pair, args![]).unwrap();
/// let this = first.value().and_then(Value::as_instance).unwrap();
///
/// assert!(equals_fields(this, second.value().unwrap()));
///
/// second.set("left", 7).unwrap();
///
/// assert!(!equals_fields(this, second.value().unwrap()));
/// assert!(!equals_fields(this, &Value::Null));
/// ```
pub fn equals_fields(this: &Instance, other: &Value) -> bool {
    let Some(other) = other.as_instance() else {
        return false;
    };

    if !this.ty().is_assignable_from(other.ty()) {
        return false;
    }

    fields(this.ty())
        .into_iter()
        .filter(|field| !field.is_static())
        .all(|field| this.load(field).equals(&other.load(field)))
}

/// Lists the distinct methods of the type, of its superclasses, and of the
/// interfaces they directly implement.
///
/// At every level of the lineage, the level's own methods come first, then
/// the methods of its interfaces in declaration order.
pub fn methods(ty: &'static TypeMeta) -> Vec<&'static Method> {
    let mut seen = AHashSet::new();
    let mut result = Vec::new();

    for level in ty.lineage() {
        let interfaces = level.interfaces().iter().copied();

        for source in Some(level).into_iter().chain(interfaces) {
            for method in source.declared_methods() {
                if seen.insert(method as *const Method as usize) {
                    result.push(method);
                }
            }
        }
    }

    result
}

#[cfg(feature = "suggestions")]
#[inline(always)]
fn suggest<'a>(pattern: &str, candidates: impl Iterator<Item = &'a str>) -> Option<CompactString> {
    crate::runtime::closeness::suggest(pattern, candidates)
}

#[cfg(not(feature = "suggestions"))]
#[inline(always)]
fn suggest<'a>(_pattern: &str, _candidates: impl Iterator<Item = &'a str>) -> Option<CompactString> {
    None
}

#[cfg(test)]
mod tests {
    use std::ops::Deref;

    use lady_deirdre::sync::Lazy;

    use crate::runtime::{
        fields,
        find_constructor,
        find_field,
        find_method,
        methods,
        params_compatible,
        Field,
        FieldDecl,
        FieldQuery,
        MethodDecl,
        MethodQuery,
        Primitive,
        RuntimeError,
        TypeMeta,
        Value,
    };

    struct Fixture {
        named: &'static TypeMeta,
        greeter: &'static TypeMeta,
        base: &'static TypeMeta,
        derived: &'static TypeMeta,
    }

    static FIXTURE: Lazy<Fixture> = Lazy::new(|| {
        let named = TypeMeta::interface("tests.resolve.Named")
            .method(MethodDecl::abstract_method("name", [], TypeMeta::string()))
            .build()
            .expect("Named declaration failed.");

        let greeter = TypeMeta::interface("tests.resolve.Greeter")
            .extends(named)
            .method(MethodDecl::new(
                "greet",
                [TypeMeta::string()],
                TypeMeta::string(),
                |mut invocation| {
                    let whom = invocation.take::<String>(0)?;

                    Ok(Value::from(format!("Hello, {whom}!")))
                },
            ))
            .build()
            .expect("Greeter declaration failed.");

        let base = TypeMeta::class("tests.resolve.Base")
            .implements(greeter)
            .field(FieldDecl::new("count", TypeMeta::int()))
            .field(FieldDecl::new("LIMIT", TypeMeta::long()).static_field())
            .method(MethodDecl::new("name", [], TypeMeta::string(), |_| {
                Ok(Value::from("base"))
            }))
            .method(MethodDecl::new(
                "scale",
                [TypeMeta::int(), TypeMeta::root()],
                TypeMeta::int(),
                |mut invocation| Ok(Value::Int(invocation.take::<i32>(0)? * 2)),
            ))
            .build()
            .expect("Base declaration failed.");

        let derived = TypeMeta::class("tests.resolve.Derived")
            .extends(base)
            .field(FieldDecl::new("count", TypeMeta::int()))
            .method(MethodDecl::new("name", [], TypeMeta::string(), |_| {
                Ok(Value::from("derived"))
            }))
            .build()
            .expect("Derived declaration failed.");

        Fixture {
            named,
            greeter,
            base,
            derived,
        }
    });

    #[test]
    fn test_field_lookup() {
        let fixture = FIXTURE.deref();

        let count = find_field(fixture.derived, &FieldQuery::Name("COUNT")).unwrap();

        assert_eq!(count.owner, fixture.derived);

        let limit = find_field(fixture.derived, &FieldQuery::Name("limit")).unwrap();

        assert_eq!(limit.owner, fixture.base);
        assert!(limit.is_static());

        let by_type = find_field(fixture.derived, &FieldQuery::Type(TypeMeta::long())).unwrap();

        assert!(std::ptr::eq(by_type, limit));

        let by_predicate = find_field(
            fixture.derived,
            &FieldQuery::Predicate(&|field: &Field| field.owner == fixture.base && !field.is_static()),
        )
        .unwrap();

        assert_eq!(by_predicate.name(), "count");
        assert_eq!(by_predicate.owner, fixture.base);

        let names = fields(fixture.derived)
            .into_iter()
            .map(|field| (field.owner.simple_name(), field.name()))
            .collect::<Vec<_>>();

        assert_eq!(
            names,
            [("Derived", "count"), ("Base", "LIMIT"), ("Base", "count")],
        );
    }

    #[test]
    fn test_field_not_found() {
        let fixture = FIXTURE.deref();

        match find_field(fixture.derived, &FieldQuery::Type(TypeMeta::root())) {
            Err(error @ RuntimeError::NotFound { .. }) => {
                assert_eq!(
                    error.to_string(),
                    "could not find field of type core.Object in tests.resolve.Derived",
                );
            }

            other => panic!("Unexpected result: {other:?}"),
        }

        assert!(find_field(fixture.derived, &FieldQuery::Name("missing"))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_method_parameters() {
        let fixture = FIXTURE.deref();
        let integer = TypeMeta::wrapper(Primitive::Int);

        let scale = find_method(
            fixture.derived,
            &MethodQuery::named("scale").params([Some(integer), None]),
        )
        .unwrap();

        assert_eq!(scale.owner, fixture.base);

        let same = find_method(
            fixture.derived,
            &MethodQuery::named("Scale")
                .returns(TypeMeta::int())
                .params([Some(TypeMeta::int()), Some(TypeMeta::string())]),
        )
        .unwrap();

        assert!(std::ptr::eq(scale, same));

        assert!(find_method(fixture.derived, &MethodQuery::named("scale").params([Some(integer)]))
            .unwrap_err()
            .is_not_found());

        assert!(find_method(
            fixture.derived,
            &MethodQuery::named("scale").params([Some(TypeMeta::long()), None]),
        )
        .unwrap_err()
        .is_not_found());

        assert!(find_method(
            fixture.derived,
            &MethodQuery::named("scale").returns(TypeMeta::string()),
        )
        .unwrap_err()
        .is_not_found());
    }

    #[test]
    fn test_method_search_order() {
        let fixture = FIXTURE.deref();

        let name = find_method(fixture.derived, &MethodQuery::named("name")).unwrap();

        assert_eq!(name.owner, fixture.derived);

        let name = find_method(fixture.base, &MethodQuery::named("name")).unwrap();

        assert_eq!(name.owner, fixture.base);

        let greet = find_method(fixture.derived, &MethodQuery::named("greet")).unwrap();

        assert_eq!(greet.owner, fixture.greeter);

        let name = find_method(fixture.greeter, &MethodQuery::named("name")).unwrap();

        assert_eq!(name.owner, fixture.named);
        assert!(!name.has_body());

        let listed = methods(fixture.derived)
            .into_iter()
            .map(|method| (method.owner.simple_name(), method.name()))
            .collect::<Vec<_>>();

        assert_eq!(
            listed,
            [
                ("Derived", "name"),
                ("Base", "name"),
                ("Base", "scale"),
                ("Greeter", "greet"),
            ],
        );
    }

    #[test]
    fn test_method_not_found() {
        let fixture = FIXTURE.deref();

        let error = find_method(
            fixture.derived,
            &MethodQuery::named("greet").params([Some(TypeMeta::int())]),
        )
        .unwrap_err();

        assert!(error.to_string().starts_with(
            "could not find method ? greet(int) in tests.resolve.Derived"
        ));

        let error = find_method(fixture.derived, &MethodQuery::new().returns(TypeMeta::double()))
            .unwrap_err();

        assert_eq!(
            error.to_string(),
            "could not find method double ?(..) in tests.resolve.Derived",
        );
    }

    #[cfg(feature = "suggestions")]
    #[test]
    fn test_suggestions() {
        let fixture = FIXTURE.deref();

        let error = find_method(fixture.derived, &MethodQuery::named("nmae")).unwrap_err();

        assert_eq!(
            error.to_string(),
            "could not find method ? nmae(..) in tests.resolve.Derived, did you mean `name`?",
        );

        let error = find_field(fixture.derived, &FieldQuery::Name("cuont")).unwrap_err();

        assert_eq!(
            error.to_string(),
            "could not find field cuont in tests.resolve.Derived, did you mean `count`?",
        );
    }

    static JOINER: Lazy<&'static TypeMeta> = Lazy::new(|| {
        let integer = TypeMeta::wrapper(Primitive::Int);

        TypeMeta::class("tests.resolve.Joiner")
            .method(
                MethodDecl::new(
                    "join",
                    [TypeMeta::array_of(TypeMeta::string())],
                    TypeMeta::string(),
                    |_| Ok(Value::from("joined")),
                )
                .static_method(),
            )
            .method(
                MethodDecl::new(
                    "total",
                    [TypeMeta::array_of(integer)],
                    TypeMeta::int(),
                    |_| Ok(Value::Int(0)),
                )
                .static_method(),
            )
            .method(
                MethodDecl::new("inspect", [TypeMeta::root()], TypeMeta::string(), |_| {
                    Ok(Value::from("inspected"))
                })
                .static_method(),
            )
            .build()
            .expect("Joiner declaration failed.")
    });

    #[test]
    fn test_array_parameters() {
        let joiner = *JOINER.deref();
        let strings = TypeMeta::array_of(TypeMeta::string());
        let objects = TypeMeta::array_of(TypeMeta::root());
        let integer = TypeMeta::wrapper(Primitive::Int);

        let join = find_method(joiner, &MethodQuery::named("join").params([Some(strings)])).unwrap();

        assert_eq!(join.name(), "join");

        assert!(find_method(joiner, &MethodQuery::named("join").params([Some(objects)]))
            .unwrap_err()
            .is_not_found());

        assert!(
            find_method(joiner, &MethodQuery::named("join").params([Some(TypeMeta::string())]))
                .unwrap_err()
                .is_not_found()
        );

        assert!(find_method(joiner, &MethodQuery::named("inspect").params([Some(strings)]))
            .unwrap_err()
            .is_not_found());

        assert!(find_method(
            joiner,
            &MethodQuery::named("total").params([Some(TypeMeta::array_of(TypeMeta::int()))]),
        )
        .unwrap_err()
        .is_not_found());

        assert!(find_method(
            joiner,
            &MethodQuery::named("total").params([Some(TypeMeta::array_of(integer))]),
        )
        .is_ok());

        assert!(!params_compatible(&[Some(strings)], &[TypeMeta::root()]));
        assert!(!params_compatible(&[Some(objects)], &[strings]));
        assert!(params_compatible(&[Some(strings)], &[strings]));
    }

    #[test]
    fn test_constructor_lookup() {
        let fixture = FIXTURE.deref();

        let constructor = find_constructor(fixture.derived, &[]).unwrap();

        assert_eq!(constructor.name(), "Derived");

        assert!(find_constructor(fixture.derived, &[Some(TypeMeta::int())])
            .unwrap_err()
            .is_not_found());

        assert!(find_constructor(fixture.greeter, &[])
            .unwrap_err()
            .is_not_found());
    }
}
