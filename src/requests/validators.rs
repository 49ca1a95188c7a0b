// src/requests/validators.rs

use super::models::RequestPayload;
use crate::common::{ValidationResult, Validator};
use chrono::{NaiveDate, NaiveTime};
use donation_domain::BloodGroup;

pub struct RequestPayloadValidator;

impl Validator<RequestPayload> for RequestPayloadValidator {
    fn validate(&self, data: &RequestPayload) -> ValidationResult {
        let mut result = ValidationResult::new();

        result.require_text("recipientName", &data.recipient_name, 100);
        result.require_text("hospitalName", &data.hospital_name, 150);
        result.require_text("recipientDistrict", &data.recipient_district, 60);
        result.require_text("recipientUpazila", &data.recipient_upazila, 60);
        result.optional_text("fullAddress", data.full_address.as_deref(), 300);
        result.optional_text("message", data.message.as_deref(), 1000);
        result.optional_text("donorName", data.donor_name.as_deref(), 100);

        if data.blood_group.parse::<BloodGroup>().is_err() {
            result.add_error("bloodGroup", "must be one of A+, A-, B+, B-, AB+, AB-, O+, O-");
        }

        if NaiveDate::parse_from_str(data.donation_date.trim(), "%Y-%m-%d").is_err() {
            result.add_error("donationDate", "must be a date in YYYY-MM-DD format");
        }

        let time = data.donation_time.trim();
        if NaiveTime::parse_from_str(time, "%H:%M").is_err()
            && NaiveTime::parse_from_str(time, "%H:%M:%S").is_err()
        {
            result.add_error("donationTime", "must be a time in HH:MM format");
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> RequestPayload {
        RequestPayload {
            recipient_name: "Karim".to_string(),
            hospital_name: "Dhaka Medical College Hospital".to_string(),
            full_address: None,
            recipient_district: "Dhaka".to_string(),
            recipient_upazila: "Savar".to_string(),
            blood_group: "O-".to_string(),
            donation_date: "2026-11-02".to_string(),
            donation_time: "10:30".to_string(),
            message: Some("Surgery at noon".to_string()),
            donor_name: None,
        }
    }

    #[test]
    fn test_valid_payload() {
        let result = RequestPayloadValidator.validate(&payload());
        assert!(result.is_valid, "{:?}", result.errors);
    }

    #[test]
    fn test_bad_fields_are_reported() {
        let mut data = payload();
        data.blood_group = "C+".to_string();
        data.donation_date = "02/11/2026".to_string();
        data.donation_time = "half ten".to_string();
        data.hospital_name = " ".to_string();

        let result = RequestPayloadValidator.validate(&data);
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["hospitalName", "bloodGroup", "donationDate", "donationTime"]
        );
    }
}
