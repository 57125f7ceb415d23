//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types.

/// Macro to define a type-safe ID wrapper.
///
/// Record identifiers are opaque strings assigned by the remote source of
/// truth, so the wrapper is `String`-backed. Creates a newtype with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_string()`
/// - `From<String>`, `From<&str>`, and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use hamlet_core::define_id;
/// define_id!(BusinessId);
/// define_id!(CategoryId);
///
/// let business_id = BusinessId::new("biz-001");
/// let category_id = CategoryId::new("cat-grocery");
///
/// // These are different types, so this won't compile:
/// // let _: BusinessId = category_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from a string value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the underlying string.
            #[must_use]
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Define standard entity IDs
define_id!(BusinessId);
define_id!(CategoryId);
define_id!(DeviceId);

impl DeviceId {
    /// Generate a fresh random device identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }
}
