//! The business record cached from the remote directory.

use serde::{Deserialize, Serialize};

use super::id::{BusinessId, CategoryId};

/// A small-business listing.
///
/// Owned by the remote source of truth; cached copies are disposable and
/// rebuilt wholesale on every full sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Business {
    /// Opaque identifier assigned by the remote service.
    pub id: BusinessId,
    /// Category this business is listed under.
    pub category_id: CategoryId,
    /// Shop name as displayed in listings.
    pub shop_name: String,
    /// Owner's name.
    pub owner_name: String,
    /// Contact number.
    pub phone: String,
    /// Street address, if provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Opening hours, free text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<String>,
    /// Services offered.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,
    /// Whether the shop delivers to homes.
    #[serde(default)]
    pub home_delivery: bool,
    /// Accepted payment options.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub payment_options: Vec<String>,
}
