//! Maps the extractor's free-form offer label onto [`OfferStatus`] and [`OfferType`].
//!
//! The upstream model is asked for one of four canonical labels but is free to answer
//! with extra text or in Chinese, so both mappings are substring matches over the
//! lowercased input and never fail.

use super::domain::{OfferStatus, OfferType};

const REJECT_MARKERS: &[&str] = &["reject", "拒"];
const WAITLIST_MARKERS: &[&str] = &["waitlist", "候补"];
const UNCONDITIONAL_MARKERS: &[&str] = &["unconditional", "无条件"];
const CONDITIONAL_MARKERS: &[&str] = &["conditional", "有条件"];

fn normalized(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_lowercase)
}

fn contains_any(haystack: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| haystack.contains(marker))
}

impl OfferStatus {
    pub fn classify(raw: Option<&str>) -> Self {
        let Some(value) = normalized(raw) else {
            return OfferStatus::None;
        };

        if contains_any(&value, REJECT_MARKERS) {
            OfferStatus::Reject
        } else if contains_any(&value, WAITLIST_MARKERS) {
            OfferStatus::Waitlist
        } else {
            OfferStatus::Offer
        }
    }
}

impl OfferType {
    pub fn classify(raw: Option<&str>) -> Self {
        let Some(value) = normalized(raw) else {
            return OfferType::Unknown;
        };

        // "unconditional" contains "conditional"
        if contains_any(&value, UNCONDITIONAL_MARKERS) {
            OfferType::Unconditional
        } else if contains_any(&value, CONDITIONAL_MARKERS) {
            OfferType::Conditional
        } else {
            OfferType::Unknown
        }
    }
}

pub fn classify_offer_status(raw: Option<&str>) -> OfferStatus {
    OfferStatus::classify(raw)
}

pub fn classify_offer_type(raw: Option<&str>) -> OfferType {
    OfferType::classify(raw)
}
