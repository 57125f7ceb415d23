//! The category record cached from the remote directory.

use serde::{Deserialize, Serialize};

use super::id::CategoryId;

/// A business category.
///
/// Same ownership rule as [`super::Business`]: the remote service owns the
/// record, the cache holds a disposable copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Opaque identifier assigned by the remote service.
    pub id: CategoryId,
    /// Display name.
    pub name: String,
    /// Icon reference (a name or asset path, opaque to this crate).
    pub icon: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_round_trip() {
        let category = Category {
            id: CategoryId::new("cat-grocery"),
            name: "Groceries".to_string(),
            icon: "basket".to_string(),
        };

        let json = serde_json::to_string(&category).unwrap();
        let back: Category = serde_json::from_str(&json).unwrap();
        assert_eq!(back, category);
    }
}
