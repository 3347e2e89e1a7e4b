// common/src/models/address.rs
use serde::{Deserialize, Serialize};

use super::session::deserialize_epoch_opt;
use crate::error::FormError;

/// Country codes the webview form offers
pub const SUPPORTED_COUNTRIES: &[&str] = &["US", "CA", "VN", "GB", "AU", "DE", "FR", "JP", "CN"];

/// Address form as filled in by the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressForm {
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

impl AddressForm {
    /// Trim every field and check the form is complete
    pub fn validate(mut self) -> Result<Self, FormError> {
        let fields: [(&'static str, &mut String); 7] = [
            ("fullName", &mut self.full_name),
            ("phone", &mut self.phone),
            ("address", &mut self.address),
            ("city", &mut self.city),
            ("state", &mut self.state),
            ("zipCode", &mut self.zip_code),
            ("country", &mut self.country),
        ];
        for (name, value) in fields {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                return Err(FormError::MissingField(name));
            }
            *value = trimmed;
        }

        self.country = self.country.to_ascii_uppercase();
        if !SUPPORTED_COUNTRIES.contains(&self.country.as_str()) {
            return Err(FormError::UnsupportedCountry(self.country));
        }
        Ok(self)
    }
}

/// Payload posted to the address store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressSubmission {
    pub psid: String,
    pub timestamp: i64,
    #[serde(flatten)]
    pub form: AddressForm,
}

/// Previously saved address as returned by the address store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressRecord {
    #[serde(default)]
    pub psid: Option<String>,
    #[serde(default, deserialize_with = "deserialize_epoch_opt")]
    pub timestamp: Option<i64>,
    #[serde(flatten)]
    pub form: AddressForm,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> AddressForm {
        AddressForm {
            full_name: "Nguyen Van A".into(),
            phone: "+84 912 345 678".into(),
            address: "12 Ly Thuong Kiet".into(),
            city: "Hanoi".into(),
            state: "Hoan Kiem".into(),
            zip_code: "100000".into(),
            country: "VN".into(),
        }
    }

    #[test]
    fn test_complete_form_is_valid() {
        let form = filled();
        assert_eq!(form.clone().validate().unwrap(), form);
    }

    #[test]
    fn test_fields_are_trimmed_and_country_normalized() {
        let mut form = filled();
        form.city = "  Hanoi ".into();
        form.country = "vn".into();
        let form = form.validate().unwrap();
        assert_eq!(form.city, "Hanoi");
        assert_eq!(form.country, "VN");
    }

    #[test]
    fn test_blank_field_is_reported() {
        let mut form = filled();
        form.zip_code = "   ".into();
        assert_eq!(form.validate(), Err(FormError::MissingField("zipCode")));
    }

    #[test]
    fn test_unknown_country_is_rejected() {
        let mut form = filled();
        form.country = "BR".into();
        assert_eq!(
            form.validate(),
            Err(FormError::UnsupportedCountry("BR".into()))
        );
    }

    #[test]
    fn test_submission_wire_shape() {
        let submission = AddressSubmission {
            psid: "1234".into(),
            timestamp: 1_700_000_000,
            form: filled(),
        };
        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["psid"], "1234");
        assert_eq!(json["fullName"], "Nguyen Van A");
        assert_eq!(json["zipCode"], "100000");
    }

    #[test]
    fn test_record_tolerates_extra_fields() {
        let record: AddressRecord = serde_json::from_str(
            r#"{"_id":"abc","psid":"1234","timestamp":"1700000000","city":"Hanoi"}"#,
        )
        .unwrap();
        assert_eq!(record.timestamp, Some(1_700_000_000));
        assert_eq!(record.form.city, "Hanoi");
        assert!(record.form.phone.is_empty());
    }
}
