//! Value coercion
//!
//! `Hydrate` turns one database value into a field type. Scalars are cast when
//! the conversion is lossless, dates and UUIDs are parsed from text, JSON
//! shapes are decoded, and boxed interfaces are resolved through the service
//! registry handed to the hydrator.

use std::any::type_name;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::{Deref, DerefMut};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use lean_core::{CoreError, ServiceRegistry};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::backends::{DatabaseValue, DATETIME_FORMAT, DATE_FORMAT};
use crate::error::CoercionError;

/// What a coercion may need besides the value itself
#[derive(Debug, Clone, Copy, Default)]
pub struct HydrationContext<'a> {
    resolver: Option<&'a ServiceRegistry>,
}

impl<'a> HydrationContext<'a> {
    pub fn new(resolver: Option<&'a ServiceRegistry>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> Option<&'a ServiceRegistry> {
        self.resolver
    }
}

/// A field type that can be built from a database value
pub trait Hydrate: Sized {
    fn hydrate(value: DatabaseValue, ctx: &HydrationContext<'_>) -> Result<Self, CoercionError>;

    /// Type name reported in schemas
    fn declared_type() -> &'static str {
        type_name::<Self>()
    }
}

impl<T: Hydrate> Hydrate for Option<T> {
    fn hydrate(value: DatabaseValue, ctx: &HydrationContext<'_>) -> Result<Self, CoercionError> {
        match value {
            DatabaseValue::Null => Ok(None),
            value => T::hydrate(value, ctx).map(Some),
        }
    }
}

impl Hydrate for DatabaseValue {
    fn hydrate(value: DatabaseValue, _ctx: &HydrationContext<'_>) -> Result<Self, CoercionError> {
        Ok(value)
    }

    fn declared_type() -> &'static str {
        "DatabaseValue"
    }
}

impl Hydrate for String {
    fn hydrate(value: DatabaseValue, _ctx: &HydrationContext<'_>) -> Result<Self, CoercionError> {
        match value {
            DatabaseValue::Text(s) => Ok(s),
            DatabaseValue::Integer(i) => Ok(i.to_string()),
            DatabaseValue::Real(r) => Ok(r.to_string()),
            DatabaseValue::Bool(b) => Ok(if b { "1" } else { "0" }.to_string()),
            DatabaseValue::Blob(bytes) => {
                String::from_utf8(bytes).map_err(|err| CoercionError::invalid("String", err))
            }
            other => Err(CoercionError::mismatch("String", &other)),
        }
    }

    fn declared_type() -> &'static str {
        "String"
    }
}

impl Hydrate for bool {
    fn hydrate(value: DatabaseValue, _ctx: &HydrationContext<'_>) -> Result<Self, CoercionError> {
        match value {
            DatabaseValue::Bool(b) => Ok(b),
            DatabaseValue::Integer(0) => Ok(false),
            DatabaseValue::Integer(1) => Ok(true),
            DatabaseValue::Text(s) => match s.trim().to_lowercase().as_str() {
                "0" | "false" => Ok(false),
                "1" | "true" => Ok(true),
                _ => Err(CoercionError::invalid("bool", s)),
            },
            DatabaseValue::Integer(i) => Err(CoercionError::invalid("bool", i)),
            other => Err(CoercionError::mismatch("bool", &other)),
        }
    }

    fn declared_type() -> &'static str {
        "bool"
    }
}

/// Reals in `[-2^63, 2^63)` convert to `i64` without saturating
const I64_LOWER: f64 = -9_223_372_036_854_775_808.0;
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

macro_rules! hydrate_integer {
    ($($int:ty),+ $(,)?) => {$(
        impl Hydrate for $int {
            fn hydrate(value: DatabaseValue, _ctx: &HydrationContext<'_>) -> Result<Self, CoercionError> {
                let name = stringify!($int);
                match value {
                    DatabaseValue::Integer(i) => {
                        <$int>::try_from(i).map_err(|_| CoercionError::invalid(name, i))
                    }
                    DatabaseValue::Bool(b) => Ok(<$int>::from(b)),
                    DatabaseValue::Real(r) if r.fract() == 0.0 => {
                        if !(I64_LOWER..I64_UPPER).contains(&r) {
                            return Err(CoercionError::invalid(name, r));
                        }
                        <$int>::try_from(r as i64).map_err(|_| CoercionError::invalid(name, r))
                    }
                    DatabaseValue::Text(s) => {
                        s.trim().parse::<$int>().map_err(|_| CoercionError::invalid(name, s))
                    }
                    other => Err(CoercionError::mismatch(name, &other)),
                }
            }

            fn declared_type() -> &'static str {
                stringify!($int)
            }
        }
    )+};
}

hydrate_integer!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

macro_rules! hydrate_float {
    ($($float:ty),+ $(,)?) => {$(
        impl Hydrate for $float {
            fn hydrate(value: DatabaseValue, _ctx: &HydrationContext<'_>) -> Result<Self, CoercionError> {
                let name = stringify!($float);
                match value {
                    DatabaseValue::Real(r) => Ok(r as $float),
                    DatabaseValue::Integer(i) => Ok(i as $float),
                    DatabaseValue::Text(s) => {
                        s.trim().parse::<$float>().map_err(|_| CoercionError::invalid(name, s))
                    }
                    other => Err(CoercionError::mismatch(name, &other)),
                }
            }

            fn declared_type() -> &'static str {
                stringify!($float)
            }
        }
    )+};
}

hydrate_float!(f32, f64);

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_utc()))
}

impl Hydrate for NaiveDateTime {
    fn hydrate(value: DatabaseValue, _ctx: &HydrationContext<'_>) -> Result<Self, CoercionError> {
        match value {
            DatabaseValue::Text(s) => {
                parse_datetime(&s).ok_or_else(|| CoercionError::invalid("NaiveDateTime", s))
            }
            DatabaseValue::Integer(seconds) => DateTime::from_timestamp(seconds, 0)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| CoercionError::invalid("NaiveDateTime", seconds)),
            other => Err(CoercionError::mismatch("NaiveDateTime", &other)),
        }
    }

    fn declared_type() -> &'static str {
        "NaiveDateTime"
    }
}

impl Hydrate for DateTime<Utc> {
    fn hydrate(value: DatabaseValue, ctx: &HydrationContext<'_>) -> Result<Self, CoercionError> {
        if let DatabaseValue::Text(s) = &value {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s.trim()) {
                return Ok(dt.with_timezone(&Utc));
            }
        }

        NaiveDateTime::hydrate(value, ctx)
            .map(|naive| naive.and_utc())
            .map_err(|err| match err {
                CoercionError::InvalidValue { value, .. } => {
                    CoercionError::invalid("DateTime<Utc>", value)
                }
                CoercionError::TypeMismatch { actual, .. } => CoercionError::TypeMismatch {
                    expected: "DateTime<Utc>",
                    actual,
                },
                other => other,
            })
    }

    fn declared_type() -> &'static str {
        "DateTime<Utc>"
    }
}

impl Hydrate for NaiveDate {
    fn hydrate(value: DatabaseValue, _ctx: &HydrationContext<'_>) -> Result<Self, CoercionError> {
        match value {
            DatabaseValue::Text(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
                .ok()
                .or_else(|| parse_datetime(&s).map(|dt| dt.date()))
                .ok_or_else(|| CoercionError::invalid("NaiveDate", s)),
            other => Err(CoercionError::mismatch("NaiveDate", &other)),
        }
    }

    fn declared_type() -> &'static str {
        "NaiveDate"
    }
}

impl Hydrate for Uuid {
    fn hydrate(value: DatabaseValue, _ctx: &HydrationContext<'_>) -> Result<Self, CoercionError> {
        match value {
            DatabaseValue::Text(s) => {
                Uuid::parse_str(s.trim()).map_err(|_| CoercionError::invalid("Uuid", s))
            }
            DatabaseValue::Blob(bytes) => {
                Uuid::from_slice(&bytes).map_err(|err| CoercionError::invalid("Uuid", err))
            }
            other => Err(CoercionError::mismatch("Uuid", &other)),
        }
    }

    fn declared_type() -> &'static str {
        "Uuid"
    }
}

/// Decode JSON text (or bytes) into `T`
pub fn decode_json<T: DeserializeOwned>(value: DatabaseValue) -> Result<T, CoercionError> {
    let decoded = match &value {
        DatabaseValue::Text(raw) => serde_json::from_str(raw),
        DatabaseValue::Blob(bytes) => serde_json::from_slice(bytes),
        other => return Err(CoercionError::mismatch("JSON text", other)),
    };

    decoded.map_err(|err| CoercionError::JsonDecode {
        raw: match value {
            DatabaseValue::Blob(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            other => other.as_str().unwrap_or_default().to_string(),
        },
        reason: err.to_string(),
    })
}

impl Hydrate for JsonValue {
    fn hydrate(value: DatabaseValue, _ctx: &HydrationContext<'_>) -> Result<Self, CoercionError> {
        match value {
            DatabaseValue::Text(_) | DatabaseValue::Blob(_) => decode_json(value),
            other => Ok(other.to_json()),
        }
    }

    fn declared_type() -> &'static str {
        "serde_json::Value"
    }
}

impl<T: DeserializeOwned> Hydrate for Vec<T> {
    fn hydrate(value: DatabaseValue, _ctx: &HydrationContext<'_>) -> Result<Self, CoercionError> {
        decode_json(value)
    }
}

impl<T: DeserializeOwned> Hydrate for HashMap<String, T> {
    fn hydrate(value: DatabaseValue, _ctx: &HydrationContext<'_>) -> Result<Self, CoercionError> {
        decode_json(value)
    }
}

impl<T: DeserializeOwned> Hydrate for BTreeMap<String, T> {
    fn hydrate(value: DatabaseValue, _ctx: &HydrationContext<'_>) -> Result<Self, CoercionError> {
        decode_json(value)
    }
}

impl Hydrate for serde_json::Map<String, JsonValue> {
    fn hydrate(value: DatabaseValue, _ctx: &HydrationContext<'_>) -> Result<Self, CoercionError> {
        decode_json(value)
    }
}

/// Field stored as JSON text and decoded into any deserializable shape
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: DeserializeOwned> Hydrate for Json<T> {
    fn hydrate(value: DatabaseValue, _ctx: &HydrationContext<'_>) -> Result<Self, CoercionError> {
        decode_json(value).map(Json)
    }
}

impl<T: serde::Serialize> From<Json<T>> for DatabaseValue {
    fn from(json: Json<T>) -> Self {
        serde_json::to_value(&json.0)
            .map(DatabaseValue::from)
            .unwrap_or(DatabaseValue::Null)
    }
}

/// Interface field resolved through the hydrator's service registry
///
/// The registry must hold a binding of `I` built from a `DatabaseValue`:
/// a concrete constructor is called with the value, a factory with the
/// registry and `[value]`.
impl<I: ?Sized + 'static> Hydrate for Box<I> {
    fn hydrate(value: DatabaseValue, ctx: &HydrationContext<'_>) -> Result<Self, CoercionError> {
        let interface = type_name::<I>();
        let registry = ctx
            .resolver()
            .ok_or(CoercionError::Unresolvable { interface })?;

        let binding = match registry.binding::<I, DatabaseValue>() {
            Ok(binding) => binding,
            Err(CoreError::ServiceNotFound { .. }) => {
                return Err(CoercionError::Unresolvable { interface })
            }
            Err(source) => return Err(CoercionError::Construction { interface, source }),
        };

        binding
            .resolve(registry, value)
            .map_err(|source| CoercionError::Construction { interface, source })
    }
}

/// Enum resolved from its backing value, see [`impl_backed_enum!`](crate::impl_backed_enum)
pub trait BackedEnum: Sized + 'static {
    type Backing: Hydrate + fmt::Display;

    fn from_backing(backing: &Self::Backing) -> Option<Self>;
}

/// Hydrate the backing value, then look the variant up
pub fn hydrate_backed<E: BackedEnum>(
    value: DatabaseValue,
    ctx: &HydrationContext<'_>,
) -> Result<E, CoercionError> {
    let backing = E::Backing::hydrate(value, ctx)?;
    E::from_backing(&backing).ok_or_else(|| CoercionError::UnknownBacking {
        enum_name: type_name::<E>(),
        value: backing.to_string(),
    })
}

/// Implement `BackedEnum`, `Hydrate` and `Into<DatabaseValue>` for a unit-only enum
///
/// ```
/// use lean_orm::impl_backed_enum;
///
/// #[derive(Debug, PartialEq)]
/// enum Status {
///     Active,
///     Banned,
/// }
///
/// impl_backed_enum!(Status: String {
///     Status::Active => "active",
///     Status::Banned => "banned",
/// });
/// ```
#[macro_export]
macro_rules! impl_backed_enum {
    ($enum:ty : $backing:ty { $($variant:path => $value:expr),+ $(,)? }) => {
        impl $crate::hydration::BackedEnum for $enum {
            type Backing = $backing;

            fn from_backing(backing: &$backing) -> Option<Self> {
                $(
                    if *backing == $value {
                        return Some($variant);
                    }
                )+
                None
            }
        }

        impl $crate::hydration::Hydrate for $enum {
            fn hydrate(
                value: $crate::DatabaseValue,
                ctx: &$crate::hydration::HydrationContext<'_>,
            ) -> Result<Self, $crate::error::CoercionError> {
                $crate::hydration::hydrate_backed(value, ctx)
            }
        }

        impl From<$enum> for $crate::DatabaseValue {
            fn from(value: $enum) -> Self {
                match value {
                    $($variant => $crate::DatabaseValue::from($value),)+
                }
            }
        }
    };
}

/// Implement `Hydrate` for types built from a single hydratable value via `From`
///
/// ```
/// use lean_orm::impl_hydrate_from;
///
/// pub struct Email(String);
///
/// impl From<String> for Email {
///     fn from(raw: String) -> Self {
///         Email(raw)
///     }
/// }
///
/// impl_hydrate_from!(Email: String);
/// ```
#[macro_export]
macro_rules! impl_hydrate_from {
    ($($target:ty : $inner:ty),+ $(,)?) => {$(
        impl $crate::hydration::Hydrate for $target {
            fn hydrate(
                value: $crate::DatabaseValue,
                ctx: &$crate::hydration::HydrationContext<'_>,
            ) -> Result<Self, $crate::error::CoercionError> {
                <$inner as $crate::hydration::Hydrate>::hydrate(value, ctx).map(<$target>::from)
            }
        }
    )+};
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn hydrate<T: Hydrate>(value: impl Into<DatabaseValue>) -> Result<T, CoercionError> {
        T::hydrate(value.into(), &HydrationContext::default())
    }

    #[test]
    fn test_scalars_cast_compatible_values() {
        assert_eq!(hydrate::<i64>("42").unwrap(), 42);
        assert_eq!(hydrate::<u8>(7).unwrap(), 7);
        assert_eq!(hydrate::<i32>(3.0).unwrap(), 3);
        assert_eq!(hydrate::<f64>(2).unwrap(), 2.0);
        assert_eq!(hydrate::<String>(12).unwrap(), "12");
        assert!(hydrate::<bool>(1).unwrap());
        assert!(!hydrate::<bool>("false").unwrap());
    }

    #[test]
    fn test_scalar_failures_name_both_types() {
        assert!(matches!(
            hydrate::<i64>(DatabaseValue::Null),
            Err(CoercionError::TypeMismatch { expected: "i64", actual: "null" })
        ));
        assert!(matches!(
            hydrate::<u8>(300),
            Err(CoercionError::InvalidValue { expected: "u8", .. })
        ));
        assert!(matches!(hydrate::<i64>("abc"), Err(CoercionError::InvalidValue { .. })));
        assert!(matches!(hydrate::<bool>(2), Err(CoercionError::InvalidValue { .. })));
        assert!(matches!(hydrate::<i64>(1.5), Err(CoercionError::TypeMismatch { .. })));
    }

    #[test]
    fn test_out_of_range_reals_do_not_saturate() {
        assert!(matches!(
            hydrate::<i64>(1e30),
            Err(CoercionError::InvalidValue { expected: "i64", .. })
        ));
        assert!(matches!(
            hydrate::<i64>(-1e30),
            Err(CoercionError::InvalidValue { expected: "i64", .. })
        ));
        assert!(matches!(
            hydrate::<u64>(1e30),
            Err(CoercionError::InvalidValue { expected: "u64", .. })
        ));
        assert!(matches!(hydrate::<i64>(9_223_372_036_854_775_808.0), Err(_)));
        assert_eq!(hydrate::<i64>(-9_223_372_036_854_775_808.0).unwrap(), i64::MIN);
        assert_eq!(hydrate::<u32>(4e9).unwrap(), 4_000_000_000);
    }

    #[test]
    fn test_option_accepts_null() {
        assert_eq!(hydrate::<Option<String>>(DatabaseValue::Null).unwrap(), None);
        assert_eq!(hydrate::<Option<i64>>("5").unwrap(), Some(5));
    }

    #[test]
    fn test_dates_and_uuids_are_parsed_from_text() {
        let expected = NaiveDate::from_ymd_opt(2021, 11, 6)
            .unwrap()
            .and_hms_opt(21, 27, 0)
            .unwrap();

        assert_eq!(hydrate::<NaiveDateTime>("2021-11-06 21:27:00").unwrap(), expected);
        assert_eq!(hydrate::<NaiveDateTime>("2021-11-06T21:27:00").unwrap(), expected);
        assert_eq!(
            hydrate::<DateTime<Utc>>("2021-11-06T21:27:00+00:00").unwrap(),
            expected.and_utc()
        );
        assert_eq!(
            hydrate::<NaiveDate>("2021-11-06 21:27:00").unwrap(),
            expected.date()
        );
        assert!(matches!(
            hydrate::<DateTime<Utc>>("yesterday"),
            Err(CoercionError::InvalidValue { expected: "DateTime<Utc>", .. })
        ));

        let id = Uuid::new_v4();
        assert_eq!(hydrate::<Uuid>(id).unwrap(), id);
    }

    #[test]
    fn test_json_shapes() {
        assert_eq!(hydrate::<Vec<i64>>("[1, 2, 3]").unwrap(), vec![1, 2, 3]);
        assert_eq!(
            hydrate::<HashMap<String, bool>>(r#"{"a": true}"#).unwrap()["a"],
            true
        );
        assert_eq!(
            hydrate::<JsonValue>(r#"{"a": [1]}"#).unwrap(),
            serde_json::json!({"a": [1]})
        );

        let Json(pair) = hydrate::<Json<(String, u8)>>(r#"["x", 1]"#).unwrap();
        assert_eq!(pair, ("x".to_string(), 1));
    }

    #[test]
    fn test_json_decode_failure_keeps_raw_string() {
        match hydrate::<Vec<i64>>("[1, 2") {
            Err(CoercionError::JsonDecode { raw, .. }) => assert_eq!(raw, "[1, 2"),
            other => panic!("unexpected result: {:?}", other),
        }

        assert!(matches!(
            hydrate::<Vec<i64>>(r#"{"not": "a list"}"#),
            Err(CoercionError::JsonDecode { .. })
        ));
    }

    #[derive(Debug, PartialEq)]
    enum Level {
        Low,
        High,
    }

    crate::impl_backed_enum!(Level: i64 {
        Level::Low => 1,
        Level::High => 10,
    });

    #[test]
    fn test_backed_enum() {
        assert_eq!(hydrate::<Level>(10).unwrap(), Level::High);
        assert_eq!(hydrate::<Level>("1").unwrap(), Level::Low);
        assert!(matches!(
            hydrate::<Level>(5),
            Err(CoercionError::UnknownBacking { .. })
        ));
        assert_eq!(DatabaseValue::from(Level::High), DatabaseValue::Integer(10));
    }

    trait Shape: Send {
        fn area(&self) -> f64;
    }

    struct Square(f64);

    impl Shape for Square {
        fn area(&self) -> f64 {
            self.0 * self.0
        }
    }

    #[test]
    fn test_interfaces_need_a_registry_binding() {
        assert!(matches!(
            hydrate::<Box<dyn Shape>>(2.0),
            Err(CoercionError::Unresolvable { .. })
        ));

        let registry = ServiceRegistry::new();
        let ctx = HydrationContext::new(Some(&registry));
        assert!(matches!(
            Box::<dyn Shape>::hydrate(2.0.into(), &ctx),
            Err(CoercionError::Unresolvable { .. })
        ));

        registry
            .bind::<dyn Shape, DatabaseValue, Square>(|value| {
                let side = f64::hydrate(value, &HydrationContext::default())
                    .map_err(|err| CoreError::invalid_argument("Square", err.to_string()))?;
                Ok(Box::new(Square(side)))
            })
            .unwrap();

        let shape = Box::<dyn Shape>::hydrate(3.0.into(), &ctx).unwrap();
        assert_eq!(shape.area(), 9.0);

        assert!(matches!(
            Box::<dyn Shape>::hydrate("wide".into(), &ctx),
            Err(CoercionError::Construction { .. })
        ));
    }
}
