//! Grant-adjusted affordability classification for a single listing.

use serde::Serialize;

/// Monthly salary ceiling for the base grant.
const BASE_GRANT_SALARY_CAP: f64 = 7000.0;
/// Monthly salary ceiling for the enhanced grant.
const ENHANCED_GRANT_SALARY_CAP: f64 = 4500.0;
const ENHANCED_GRANT: f64 = 60000.0;
/// Adjusted prices up to this multiple of the preferred price are `Yellow`.
const YELLOW_TOLERANCE: f64 = 1.05;

/// Affordability tier shown on a listing marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Green,
    Yellow,
    Red,
    Unknown,
}

impl Tier {
    /// Marker colour used by map front-ends.
    pub fn color(self) -> &'static str {
        match self {
            Tier::Green => "green",
            Tier::Yellow => "yellow",
            Tier::Red => "red",
            Tier::Unknown => "gray",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Green => "green",
            Tier::Yellow => "yellow",
            Tier::Red => "red",
            Tier::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat size as far as grant eligibility is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlatType {
    TwoRoom,
    ThreeRoom,
    FourRoom,
    FiveRoom,
    Other,
}

impl FlatType {
    /// Accepts the spellings seen in the dataset and in user input
    /// (`"4-Room"`, `"4 ROOM"`, `"4-room"`).
    pub fn parse(raw: &str) -> Self {
        match normalize_label(raw).as_str() {
            "2 ROOM" => FlatType::TwoRoom,
            "3 ROOM" => FlatType::ThreeRoom,
            "4 ROOM" => FlatType::FourRoom,
            "5 ROOM" => FlatType::FiveRoom,
            _ => FlatType::Other,
        }
    }

    fn base_grant(self) -> f64 {
        match self {
            FlatType::TwoRoom | FlatType::ThreeRoom | FlatType::FourRoom => 40000.0,
            FlatType::FiveRoom => 25000.0,
            FlatType::Other => 0.0,
        }
    }
}

/// Upper-cases and turns hyphens into spaces, the form the dataset uses for
/// flat types and towns.
pub fn normalize_label(raw: &str) -> String {
    raw.trim()
        .replace('-', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Total grant a buyer qualifies for.
pub fn total_grant(salary: f64, flat_type: FlatType) -> f64 {
    if salary > BASE_GRANT_SALARY_CAP {
        return 0.0;
    }

    let enhanced = if salary <= ENHANCED_GRANT_SALARY_CAP {
        ENHANCED_GRANT
    } else {
        0.0
    };

    flat_type.base_grant() + enhanced
}

/// Classifies a listing price against the buyer's preferred price after
/// deducting grants and the CPF balance.
///
/// Non-finite amounts yield [`Tier::Unknown`].
pub fn classify(
    preferred_price: f64,
    listing_price: f64,
    salary: f64,
    flat_type: &str,
    cpf_balance: f64,
) -> Tier {
    if !(preferred_price.is_finite() && listing_price.is_finite() && cpf_balance.is_finite()) {
        return Tier::Unknown;
    }

    let grant = total_grant(salary, FlatType::parse(flat_type));
    let adjusted = listing_price - grant - cpf_balance;

    if adjusted <= preferred_price {
        Tier::Green
    } else if adjusted <= preferred_price * YELLOW_TOLERANCE {
        Tier::Yellow
    } else {
        Tier::Red
    }
}

/// Same as [`classify`] for amounts that have not been parsed yet.
///
/// Any amount that is not a number gives [`Tier::Unknown`] instead of an
/// error.
pub fn classify_text(
    preferred_price: &str,
    listing_price: &str,
    salary: f64,
    flat_type: &str,
    cpf_balance: &str,
) -> Tier {
    match (
        parse_amount(preferred_price),
        parse_amount(listing_price),
        parse_amount(cpf_balance),
    ) {
        (Some(preferred), Some(listing), Some(cpf)) => {
            classify(preferred, listing, salary, flat_type, cpf)
        }
        _ => Tier::Unknown,
    }
}

pub fn parse_amount(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_grant_without_enhanced() {
        // 500000 - 40000 = 460000 <= 500000
        assert_eq!(classify(500000.0, 500000.0, 5000.0, "4-Room", 0.0), Tier::Green);
    }

    #[test]
    fn test_no_grant_above_salary_cap_is_red() {
        // 460000 > 400000 * 1.05
        assert_eq!(classify(400000.0, 460000.0, 8000.0, "4-Room", 0.0), Tier::Red);
    }

    #[test]
    fn test_within_tolerance_is_yellow() {
        assert_eq!(classify(400000.0, 415000.0, 8000.0, "4-Room", 0.0), Tier::Yellow);
    }

    #[test]
    fn test_tier_boundaries_are_inclusive() {
        assert_eq!(classify(400000.0, 400000.0, 8000.0, "4-Room", 0.0), Tier::Green);
        assert_eq!(classify(400000.0, 420000.0, 8000.0, "4-Room", 0.0), Tier::Yellow);
        assert_eq!(classify(400000.0, 420001.0, 8000.0, "4-Room", 0.0), Tier::Red);
    }

    #[test]
    fn test_non_numeric_is_unknown() {
        assert_eq!(classify_text("abc", "500000", 5000.0, "4-Room", "0"), Tier::Unknown);
        assert_eq!(classify_text("500000", "", 5000.0, "4-Room", "0"), Tier::Unknown);
        assert_eq!(classify_text("500000", "500000", 5000.0, "4-Room", "lots"), Tier::Unknown);
        assert_eq!(classify(f64::NAN, 500000.0, 5000.0, "4-Room", 0.0), Tier::Unknown);
    }

    #[test]
    fn test_text_entry_point_matches_numeric() {
        assert_eq!(
            classify_text(" 400000 ", "415000", 8000.0, "4-Room", "0"),
            classify(400000.0, 415000.0, 8000.0, "4-Room", 0.0)
        );
    }

    #[test]
    fn test_classify_is_deterministic() {
        let first = classify(350000.0, 480000.0, 4000.0, "3 ROOM", 20000.0);
        let second = classify(350000.0, 480000.0, 4000.0, "3 ROOM", 20000.0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_grant_table() {
        assert_eq!(total_grant(4500.0, FlatType::FourRoom), 100000.0);
        assert_eq!(total_grant(4500.0, FlatType::FiveRoom), 85000.0);
        assert_eq!(total_grant(4500.0, FlatType::Other), 60000.0);
        assert_eq!(total_grant(7000.0, FlatType::TwoRoom), 40000.0);
        assert_eq!(total_grant(7000.0, FlatType::FiveRoom), 25000.0);
        assert_eq!(total_grant(7000.01, FlatType::ThreeRoom), 0.0);
    }

    #[test]
    fn test_flat_type_spellings() {
        assert_eq!(FlatType::parse("4-Room"), FlatType::FourRoom);
        assert_eq!(FlatType::parse("4 ROOM"), FlatType::FourRoom);
        assert_eq!(FlatType::parse("5-room"), FlatType::FiveRoom);
        assert_eq!(FlatType::parse("EXECUTIVE"), FlatType::Other);
    }

    #[test]
    fn test_cpf_balance_lowers_adjusted_price() {
        // 520000 - 0 - 100000 = 420000 <= 420000
        assert_eq!(classify(420000.0, 520000.0, 9000.0, "4-Room", 100000.0), Tier::Green);
    }

    #[test]
    fn test_unknown_renders_gray() {
        assert_eq!(Tier::Unknown.color(), "gray");
        assert_eq!(Tier::Yellow.to_string(), "yellow");
    }
}
