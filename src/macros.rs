/// Implement [`SqlEnum`](crate::SqlEnum) and [`SqlParam`](crate::SqlParam) for a
/// fieldless enum, numbering its variants in the order listed.
///
/// ```rust
/// #[derive(Debug, Clone, PartialEq)]
/// enum Status {
///     Pending,
///     Done,
/// }
///
/// sql_streams::sql_enum!(Status { Pending, Done });
///
/// use sql_streams::SqlEnum;
/// assert_eq!(Status::Done.ordinal(), 1);
/// assert_eq!(Status::from_ordinal(0), Some(Status::Pending));
/// assert_eq!(Status::from_ordinal(2), None);
/// ```
#[macro_export]
macro_rules! sql_enum {
    ($ty:ident { $($variant:ident),+ $(,)? }) => {
        impl $crate::SqlEnum for $ty {
            const CONSTANTS: &'static [Self] = &[$($ty::$variant),+];

            #[allow(irrefutable_let_patterns)]
            fn ordinal(&self) -> usize {
                let mut ordinal = 0usize;
                $(
                    if let $ty::$variant = self {
                        return ordinal;
                    }
                    ordinal += 1;
                )+
                ordinal
            }
        }

        impl $crate::SqlParam for $ty {
            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn type_name(&self) -> &'static str {
                ::std::any::type_name::<$ty>()
            }

            fn enum_ordinal(&self) -> ::std::option::Option<usize> {
                ::std::option::Option::Some($crate::SqlEnum::ordinal(self))
            }
        }
    };
}

/// Implement [`SqlParam`](crate::SqlParam) for types with a registered binding, so
/// their values can be passed to `with`/`set`.
///
/// ```rust
/// use sql_streams::{SqlParam, SqlValue, TypeBindingRegistry};
///
/// struct Cents(i64);
///
/// sql_streams::sql_param!(Cents);
///
/// let registry = TypeBindingRegistry::new();
/// registry.register::<Cents, _, _, _>(
///     |cursor, index| Ok(Cents(cursor.value(index)?.as_int().unwrap_or_default())),
///     |cursor, name| {
///         let index = cursor.column_index(name)?;
///         Ok(Cents(cursor.value(index)?.as_int().unwrap_or_default()))
///     },
///     |stmt, index, value: &Cents| stmt.bind(index, SqlValue::Int(value.0)),
/// );
/// let param: &dyn SqlParam = &Cents(250);
/// assert!(param.type_name().ends_with("Cents"));
/// assert_eq!(param.enum_ordinal(), None);
/// ```
#[macro_export]
macro_rules! sql_param {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::SqlParam for $ty {
                fn as_any(&self) -> &dyn ::std::any::Any {
                    self
                }

                fn type_name(&self) -> &'static str {
                    ::std::any::type_name::<$ty>()
                }
            }
        )+
    };
}
