//! Listing creation — the thirteen-step wizard for publishing a place.
//!
//! The only branch is after `Location`: a manually entered address goes
//! through `ConfirmAddress`, the device's current location skips it.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::FlowDefinitionError;
use crate::flow::{Draft, FieldRule, FlowDefinition, Next, StepDefinition};

use super::datasets;

pub const FLOW_ID: &str = "ListingCreation";

pub mod steps {
    pub const PLACE_TYPE: &str = "PlaceType";
    pub const LOCATION: &str = "Location";
    pub const CONFIRM_ADDRESS: &str = "ConfirmAddress";
    pub const FLOOR_PLAN: &str = "FloorPlan";
    pub const STAND_OUT: &str = "StandOut";
    pub const AMENITIES: &str = "Amenities";
    pub const ADD_PHOTOS: &str = "AddPhotos";
    pub const TITLE: &str = "Title";
    pub const HIGHLIGHTS: &str = "Highlights";
    pub const DESCRIPTION: &str = "Description";
    pub const FINISH_SETUP: &str = "FinishSetup";
    pub const GUEST_TYPE: &str = "GuestType";
    pub const PRICING: &str = "Pricing";
}

pub const MIN_PHOTOS: usize = 5;
pub const MAX_TITLE_CHARS: usize = 32;
pub const MAX_DESCRIPTION_CHARS: usize = 500;

static POSTAL_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{5}$").unwrap());

fn after_location(draft: &Draft) -> Next {
    if draft.get_str("locationSource") == Some("manual") {
        Next::step(steps::CONFIRM_ADDRESS)
    } else {
        Next::step(steps::FLOOR_PLAN)
    }
}

pub fn definition() -> Result<FlowDefinition, FlowDefinitionError> {
    use steps::*;

    FlowDefinition::builder(FLOW_ID)
        .step(
            StepDefinition::new(PLACE_TYPE, "Which of these best describes your place?")
                .field(
                    FieldRule::new("placeType")
                        .required()
                        .one_of(datasets::PLACE_TYPES.iter().copied()),
                )
                .goto(LOCATION),
        )
        .step(
            StepDefinition::new(LOCATION, "Where's your place located?")
                .field(
                    FieldRule::new("locationSource")
                        .required()
                        .one_of(datasets::LOCATION_SOURCES.iter().copied()),
                )
                .field(FieldRule::new("address").length(Some(5), Some(200)))
                .branch([CONFIRM_ADDRESS, FLOOR_PLAN], after_location),
        )
        .step(
            StepDefinition::new(CONFIRM_ADDRESS, "Confirm your address")
                .field(FieldRule::new("street").required().length(None, Some(120)))
                .field(
                    FieldRule::new("province")
                        .required()
                        .one_of(datasets::provinces()),
                )
                .field(
                    FieldRule::new("city")
                        .required()
                        .depends_on("province", datasets::city_map()),
                )
                .field(
                    FieldRule::new("postalCode")
                        .pattern(POSTAL_CODE.clone(), "must be a 5-digit postal code"),
                )
                .goto(FLOOR_PLAN),
        )
        .step(
            StepDefinition::new(FLOOR_PLAN, "Share some basics about your place")
                .field(FieldRule::new("guests").required().number_range(Some(1.0), Some(16.0)))
                .field(FieldRule::new("bedrooms").required().number_range(Some(0.0), Some(50.0)))
                .field(FieldRule::new("beds").required().number_range(Some(1.0), Some(50.0)))
                .field(FieldRule::new("bathrooms").required().number_range(Some(0.0), Some(50.0)))
                .goto(STAND_OUT),
        )
        .step(StepDefinition::new(STAND_OUT, "Make your place stand out").goto(AMENITIES))
        .step(
            StepDefinition::new(AMENITIES, "Tell guests what your place has to offer")
                .field(
                    FieldRule::new("amenities")
                        .count(None, Some(datasets::AMENITIES.len()))
                        .each_one_of(datasets::AMENITIES.iter().copied()),
                )
                .goto(ADD_PHOTOS),
        )
        .step(
            StepDefinition::new(ADD_PHOTOS, "Add some photos of your place")
                .field(FieldRule::new("photos").required().count(Some(MIN_PHOTOS), None))
                .goto(TITLE),
        )
        .step(
            StepDefinition::new(TITLE, "Now, let's give your place a title")
                .field(
                    FieldRule::new("title")
                        .required()
                        .length(None, Some(MAX_TITLE_CHARS)),
                )
                .goto(HIGHLIGHTS),
        )
        .step(
            StepDefinition::new(HIGHLIGHTS, "Next, let's describe your place")
                .field(
                    FieldRule::new("highlights")
                        .required()
                        .count(Some(1), Some(2))
                        .each_one_of(datasets::HIGHLIGHTS.iter().copied()),
                )
                .goto(DESCRIPTION),
        )
        .step(
            StepDefinition::new(DESCRIPTION, "Create your description")
                .field(
                    FieldRule::new("description")
                        .required()
                        .length(None, Some(MAX_DESCRIPTION_CHARS)),
                )
                .goto(FINISH_SETUP),
        )
        .step(StepDefinition::new(FINISH_SETUP, "Finish up and publish").goto(GUEST_TYPE))
        .step(
            StepDefinition::new(GUEST_TYPE, "Choose who to welcome for your first reservation")
                .field(
                    FieldRule::new("guestType")
                        .required()
                        .one_of(datasets::GUEST_TYPES.iter().copied()),
                )
                .goto(PRICING),
        )
        .step(
            StepDefinition::new(PRICING, "Now, set your price")
                .field(
                    FieldRule::new("price")
                        .required()
                        .number_range(Some(1.0), Some(1_000_000.0)),
                )
                .terminal(),
        )
        .dependency("province", ["city"])
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_thirteen_steps() {
        let flow = definition().unwrap();
        assert_eq!(flow.len(), 13);
        assert_eq!(flow.reachable().len(), 13);
        assert!(
            flow.edges()
                .contains(&(steps::LOCATION, steps::CONFIRM_ADDRESS))
        );
        assert!(flow.edges().contains(&(steps::LOCATION, steps::FLOOR_PLAN)));
    }

    #[test]
    fn location_branch_depends_only_on_source() {
        let flow = definition().unwrap();
        let location = flow.step(steps::LOCATION).unwrap();
        let manual = Draft::from_object(json!({"locationSource": "manual"})).unwrap();
        let current = Draft::from_object(json!({"locationSource": "current"})).unwrap();
        assert_eq!(location.next(&manual), Next::step(steps::CONFIRM_ADDRESS));
        assert_eq!(location.next(&current), Next::step(steps::FLOOR_PLAN));
    }

    #[test]
    fn amenities_are_optional() {
        let flow = definition().unwrap();
        let step = flow.step(steps::AMENITIES).unwrap();
        assert!(step.validate(&Draft::new()).is_ok());
        let bad = Draft::new().with("amenities", json!(["wifi", "helipad"]));
        assert!(!step.validate(&bad).is_ok());
    }

    #[test]
    fn title_length_is_capped() {
        let flow = definition().unwrap();
        let step = flow.step(steps::TITLE).unwrap();
        let long = Draft::new().with("title", "x".repeat(MAX_TITLE_CHARS + 1));
        assert_eq!(
            step.validate(&long).error_for("title"),
            Some("must be at most 32 characters")
        );
    }
}
