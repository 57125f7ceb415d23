//! Wire row types for the hosted directory tables.
//!
//! These mirror the remote column layout exactly and exist only at the
//! serialization boundary: everything past the client converts to the
//! canonical domain types in `hamlet-core` via the `From` impls below.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hamlet_core::{Business, BusinessId, Category, CategoryId};

/// A row of the remote `businesses` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessRow {
    pub id: String,
    pub category_id: String,
    pub shop_name: String,
    pub owner_name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<String>,
    #[serde(default)]
    pub services: Option<Vec<String>>,
    #[serde(default)]
    pub home_delivery: Option<bool>,
    #[serde(default)]
    pub payment_options: Option<Vec<String>>,
    /// Set by the write path on every mutation; drives the sync fingerprint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl BusinessRow {
    /// Build the write payload for a domain record, stamping `updated_at`.
    #[must_use]
    pub fn for_write(business: &Business, updated_at: DateTime<Utc>) -> Self {
        Self {
            id: business.id.as_str().to_string(),
            category_id: business.category_id.as_str().to_string(),
            shop_name: business.shop_name.clone(),
            owner_name: business.owner_name.clone(),
            phone: business.phone.clone(),
            address: business.address.clone(),
            hours: business.hours.clone(),
            services: Some(business.services.clone()),
            home_delivery: Some(business.home_delivery),
            payment_options: Some(business.payment_options.clone()),
            updated_at: Some(updated_at),
        }
    }
}

impl From<BusinessRow> for Business {
    fn from(row: BusinessRow) -> Self {
        Self {
            id: BusinessId::new(row.id),
            category_id: CategoryId::new(row.category_id),
            shop_name: row.shop_name,
            owner_name: row.owner_name,
            phone: row.phone,
            address: row.address,
            hours: row.hours,
            services: row.services.unwrap_or_default(),
            home_delivery: row.home_delivery.unwrap_or(false),
            payment_options: row.payment_options.unwrap_or_default(),
        }
    }
}

/// A row of the remote `categories` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRow {
    pub id: String,
    pub name: String,
    pub icon: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            name: row.name,
            icon: row.icon,
        }
    }
}

/// The single-column rows returned by the newest-timestamp query.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatedAtRow {
    pub updated_at: Option<DateTime<Utc>>,
}

/// Successful password-grant response from the auth endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub user: AuthUser,
}

/// The signed-in user as returned by the auth endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A row of the remote `profiles` table (role lookup only).
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileRow {
    #[serde(default)]
    pub role: Option<String>,
}
