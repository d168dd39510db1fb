//! Static option sets the wizards validate against.

use std::collections::{BTreeMap, BTreeSet};

/// Provinces and the cities the marketplace currently serves in each.
pub const PROVINCE_CITIES: &[(&str, &[&str])] = &[
    ("Punjab", &["Kamra", "Attock"]),
    ("Sindh", &["Karachi", "Hyderabad", "Sukkur"]),
    ("Khyber Pakhtunkhwa", &["Peshawar", "Abbottabad", "Mardan"]),
    ("Balochistan", &["Quetta", "Gwadar"]),
    ("Islamabad Capital Territory", &["Islamabad"]),
];

pub const PLACE_TYPES: &[&str] = &[
    "house",
    "apartment",
    "guesthouse",
    "hotel",
    "cabin",
    "farm",
];

pub const LOCATION_SOURCES: &[&str] = &["current", "manual"];

pub const GUEST_TYPES: &[&str] = &["any_guest", "experienced_guest"];

pub const AMENITIES: &[&str] = &[
    "wifi",
    "tv",
    "kitchen",
    "washer",
    "free_parking",
    "paid_parking",
    "air_conditioning",
    "dedicated_workspace",
    "pool",
    "hot_tub",
    "patio",
    "bbq_grill",
    "fire_pit",
    "smoke_alarm",
    "first_aid_kit",
    "fire_extinguisher",
];

pub const HIGHLIGHTS: &[&str] = &[
    "peaceful",
    "unique",
    "family_friendly",
    "stylish",
    "central",
    "spacious",
];

pub fn provinces() -> impl Iterator<Item = &'static str> {
    PROVINCE_CITIES.iter().map(|(p, _)| *p)
}

/// Province → allowed cities, in the shape `FieldRule::depends_on` takes.
pub fn city_map() -> BTreeMap<String, BTreeSet<String>> {
    PROVINCE_CITIES
        .iter()
        .map(|(province, cities)| {
            (
                province.to_string(),
                cities.iter().map(|c| c.to_string()).collect(),
            )
        })
        .collect()
}
