use tracing::info;

use super::{ReadingStore, Result};
use crate::db::models::NewProperty;

const SAMPLE_PROPERTIES: [(&str, &str, &str); 4] = [
    (
        "Sunny Apartment",
        "123 Main Street, City",
        "Bright and spacious apartment with great natural light",
    ),
    (
        "Modern Condo",
        "456 Park Avenue, City",
        "Contemporary condo with premium finishes and amenities",
    ),
    (
        "Cozy Townhouse",
        "789 Oak Road, City",
        "Charming townhouse perfect for families",
    ),
    (
        "Luxury Penthouse",
        "321 Summit Street, City",
        "Exclusive penthouse with panoramic views",
    ),
];

/// Inserts the sample properties when the store has none.
///
/// Returns how many were created; a non-empty store is left untouched.
pub async fn seed_sample_properties(store: &dyn ReadingStore) -> Result<usize> {
    if !store.properties().await?.is_empty() {
        return Ok(0);
    }

    for (name, address, description) in SAMPLE_PROPERTIES {
        store
            .insert_property(&NewProperty {
                name: name.to_string(),
                address: address.to_string(),
                description: description.to_string(),
                image_url: Some(format!(
                    "https://via.placeholder.com/300x200?text={}",
                    name.replace(' ', "+")
                )),
            })
            .await?;
    }
    info!(count = SAMPLE_PROPERTIES.len(), "Seeded sample properties");
    Ok(SAMPLE_PROPERTIES.len())
}
