use serde::{Deserialize, Serialize};

use crate::affordability::normalize_label;

/// Buyer profile and area for one aggregation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    /// Town to search in (e.g. `"ANG MO KIO"`).
    pub area: String,
    pub preferred_price: f64,
    /// Monthly household salary.
    pub salary: f64,
    /// Flat type used for grant eligibility (e.g. `"4-Room"`).
    pub flat_type: String,
    /// CPF Ordinary Account balance.
    pub cpf_balance: f64,
    /// Flat category to filter the dataset on (e.g. `"4-room"`).
    pub hdb_category: String,
}

impl SearchCriteria {
    pub fn normalized_area(&self) -> String {
        normalize_label(&self.area)
    }

    pub fn normalized_hdb_category(&self) -> String {
        normalize_label(&self.hdb_category)
    }

    /// `true` when every field the affordability rule depends on is filled
    /// in. Only then is the dataset narrowed to the requested category.
    pub fn has_affordability_profile(&self) -> bool {
        self.preferred_price != 0.0
            && self.salary != 0.0
            && self.cpf_balance != 0.0
            && !self.flat_type.trim().is_empty()
            && !self.hdb_category.trim().is_empty()
    }
}

/// A resale transaction after normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResaleListing {
    pub month: String,
    pub town: String,
    pub block: String,
    pub street_name: String,
    /// `block` and `street_name` joined by a space; what gets geocoded.
    pub address: String,
    pub flat_type: String,
    pub floor_area_sqm: String,
    pub resale_price: f64,
    pub remaining_lease: Option<String>,
    pub storey_range: String,
    pub flat_model: String,
    pub lease_commence_date: Option<String>,
}

impl ResaleListing {
    pub fn derive_address(block: &str, street_name: &str) -> String {
        format!("{} {}", block.trim(), street_name.trim())
    }
}

/// A single transaction looked up by block, street and month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingDetails {
    pub month: String,
    pub flat_type: String,
    pub storey_range: String,
    pub floor_area_sqm: String,
    pub flat_model: String,
    pub remaining_lease: Option<String>,
    pub resale_price: f64,
    pub postal_code: Option<String>,
}
