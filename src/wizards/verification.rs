//! Provider identity verification — five steps, one of them informational.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::FlowDefinitionError;
use crate::flow::{FieldRule, FlowDefinition, StepDefinition};

use super::datasets;

pub const FLOW_ID: &str = "ProviderVerification";

pub mod steps {
    pub const PERSONAL_DETAILS: &str = "PersonalDetails";
    pub const AGE_CONFIRMATION: &str = "AgeConfirmation";
    pub const RESIDENCE: &str = "Residence";
    pub const GUIDELINES: &str = "Guidelines";
    pub const CONTACT_DETAILS: &str = "ContactDetails";
}

pub const MINIMUM_AGE: f64 = 18.0;

static PHONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{11}$").unwrap());
static CNIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{13}$").unwrap());
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

pub fn definition() -> Result<FlowDefinition, FlowDefinitionError> {
    use steps::*;

    FlowDefinition::builder(FLOW_ID)
        .step(
            StepDefinition::new(PERSONAL_DETAILS, "What's your name?")
                .field(FieldRule::new("firstName").required().length(None, Some(50)))
                .field(FieldRule::new("lastName").required().length(None, Some(50)))
                .goto(AGE_CONFIRMATION),
        )
        .step(
            StepDefinition::new(AGE_CONFIRMATION, "How old are you?")
                .field(FieldRule::new("age").required().at_least(MINIMUM_AGE))
                .goto(RESIDENCE),
        )
        .step(
            StepDefinition::new(RESIDENCE, "Where do you live?")
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
                .goto(GUIDELINES),
        )
        .step(StepDefinition::new(GUIDELINES, "Our community guidelines").goto(CONTACT_DETAILS))
        .step(
            StepDefinition::new(CONTACT_DETAILS, "How can customers reach you?")
                .field(
                    FieldRule::new("phone")
                        .required()
                        .pattern(PHONE.clone(), "must be an 11-digit phone number"),
                )
                .field(
                    FieldRule::new("cnic")
                        .required()
                        .pattern(CNIC.clone(), "must be a 13-digit CNIC without dashes"),
                )
                .field(
                    FieldRule::new("email")
                        .required()
                        .pattern(EMAIL.clone(), "must be a valid email address"),
                )
                .terminal(),
        )
        .dependency("province", ["city"])
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::Draft;
    use serde_json::json;

    fn draft(v: serde_json::Value) -> Draft {
        Draft::from_object(v).unwrap()
    }

    #[test]
    fn builds_a_linear_five_step_flow() {
        let flow = definition().unwrap();
        assert_eq!(flow.len(), 5);
        assert_eq!(flow.initial_step(), steps::PERSONAL_DETAILS);
        assert_eq!(flow.reachable().len(), 5);
        assert!(flow.step(steps::GUIDELINES).unwrap().is_informational());
    }

    #[test]
    fn contact_patterns() {
        let flow = definition().unwrap();
        let step = flow.step(steps::CONTACT_DETAILS).unwrap();

        let ok = draft(json!({
            "phone": "03001234567",
            "cnic": "3520212345671",
            "email": "ali@example.pk",
        }));
        assert!(step.validate(&ok).is_ok());

        let bad = draft(json!({
            "phone": "0300-1234567",
            "cnic": "35202-1234567-1",
            "email": "ali@",
        }));
        let result = step.validate(&bad);
        assert_eq!(result.errors.len(), 3);
        assert_eq!(
            result.error_for("phone"),
            Some("must be an 11-digit phone number")
        );
    }
}
