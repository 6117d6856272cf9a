//! Newtype IDs for type-safe entity references.
//!
//! Every persisted entity gets its own ID type so that a `ShopId` can never be
//! passed where a `CategoryId` is expected. Category IDs are special: they are
//! chosen by the seller feed rather than generated by the database, but they
//! share the same `i32` representation.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i32` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_i32()`
/// - `From<i32>` and `Into<i32>` implementations
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use bazaar_core::define_id;
/// define_id!(WarehouseId);
/// define_id!(CourierId);
///
/// let warehouse = WarehouseId::new(7);
/// assert_eq!(warehouse.as_i32(), 7);
///
/// // These are different types, so this won't compile:
/// // let _: CourierId = warehouse;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Create a new ID from an i32 value.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// Get the underlying i32 value.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::postgres::PgHasArrayType for $name {
            fn array_type_info() -> ::sqlx::postgres::PgTypeInfo {
                <i32 as ::sqlx::postgres::PgHasArrayType>::array_type_info()
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <i32 as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(id))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

// Accounts
define_id!(UserId);

// Catalog
define_id!(ShopId);
define_id!(CategoryId);
define_id!(ProductId);
define_id!(ProductInfoId);
define_id!(ParameterId);

// Orders
define_id!(OrderId);
define_id!(OrderItemId);

/// Identity of an authenticated seller.
///
/// A seller is a [`UserId`] whose account kind is `shop`. Wrapping it keeps
/// catalog operations from accepting an arbitrary, unchecked user ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SellerId(UserId);

impl SellerId {
    /// Wrap a user ID that has already been checked to belong to a seller.
    #[must_use]
    pub const fn new(user_id: UserId) -> Self {
        Self(user_id)
    }

    /// The underlying user ID.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.0
    }
}

impl core::fmt::Display for SellerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip_through_i32() {
        let id = ShopId::from(42);
        assert_eq!(i32::from(id), 42);
        assert_eq!(id.as_i32(), 42);
    }

    #[test]
    fn test_id_serializes_transparently() {
        let json = serde_json::to_string(&CategoryId::new(224)).unwrap_or_default();
        assert_eq!(json, "224");
    }

    #[test]
    fn test_seller_id_display() {
        let seller = SellerId::new(UserId::new(5));
        assert_eq!(seller.to_string(), "5");
        assert_eq!(seller.user_id(), UserId::new(5));
    }
}
