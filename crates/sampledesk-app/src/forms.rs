// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use time::Date;
use time::macros::format_description;

use crate::ids::{AccountId, EmployeeId, OpportunityId, ProductId, ServiceCaseId};
use crate::model::{
    AccountKey, CostPayload, EmployeeKey, OpportunityKey, ProductKey, QuantityPayload, Sample,
    SamplePayload, ServiceCaseKey,
};

pub const DEFAULT_STATUS: &str = "OPEN";
pub const DEFAULT_SAMPLE_TYPE: &str = "WITHPACKAGING";
pub const DEFAULT_CURRENCY: &str = "EUR";
pub const DEFAULT_UOM: &str = "EA";

/// Everything the create and edit forms collect, held as text so the
/// form widgets can hand buffers straight through. Reference fields
/// carry the selected entity key or stay empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleDraft {
    pub sample_name: String,
    pub status: String,
    pub sample_type: String,
    pub ship_to_address: String,
    pub due_date: String,
    pub hazardous: bool,
    pub hazardous_reason: String,
    pub packaging_width: String,
    pub packaging_height: String,
    pub packaging_material: String,
    pub cost_amount: String,
    pub currency_code: String,
    pub quantity_amount: String,
    pub uom_code: String,
    pub account_id: String,
    pub product_id: String,
    pub employee_id: String,
    pub service_case_id: String,
    pub opportunity_id: String,
}

impl SampleDraft {
    pub fn blank() -> Self {
        Self {
            sample_name: String::new(),
            status: DEFAULT_STATUS.to_owned(),
            sample_type: DEFAULT_SAMPLE_TYPE.to_owned(),
            ship_to_address: String::new(),
            due_date: String::new(),
            hazardous: false,
            hazardous_reason: String::new(),
            packaging_width: String::new(),
            packaging_height: String::new(),
            packaging_material: String::new(),
            cost_amount: String::new(),
            currency_code: DEFAULT_CURRENCY.to_owned(),
            quantity_amount: "1".to_owned(),
            uom_code: DEFAULT_UOM.to_owned(),
            account_id: String::new(),
            product_id: String::new(),
            employee_id: String::new(),
            service_case_id: String::new(),
            opportunity_id: String::new(),
        }
    }

    pub fn from_sample(sample: &Sample) -> Self {
        Self {
            sample_name: sample.sample_name.clone(),
            status: sample.status.clone(),
            sample_type: sample.sample_type.clone(),
            ship_to_address: sample.ship_to_address.clone(),
            due_date: sample.due_date.clone(),
            hazardous: sample.hazardous,
            hazardous_reason: sample.hazardous_reason.clone().unwrap_or_default(),
            packaging_width: sample.packaging_width.clone().unwrap_or_default(),
            packaging_height: sample.packaging_height.clone().unwrap_or_default(),
            packaging_material: sample.packaging_material.clone().unwrap_or_default(),
            cost_amount: sample.cost_of_sample.amount.clone(),
            currency_code: sample.cost_of_sample.currency_code.clone(),
            quantity_amount: sample.number_of_samples.amount.clone(),
            uom_code: sample.number_of_samples.uom_code.clone(),
            account_id: sample.account.account_id.as_str().to_owned(),
            product_id: sample.product.product_id.as_str().to_owned(),
            employee_id: sample.employee.employee_id.as_str().to_owned(),
            service_case_id: sample
                .service_case
                .as_ref()
                .map(|case| case.service_case_id.as_str().to_owned())
                .unwrap_or_default(),
            opportunity_id: sample
                .opportunity
                .as_ref()
                .map(|opp| opp.opportunity_id.as_str().to_owned())
                .unwrap_or_default(),
        }
    }

    fn due_date_parsed(&self) -> Option<Date> {
        Date::parse(
            self.due_date.trim(),
            format_description!("[year]-[month]-[day]"),
        )
        .ok()
    }

    /// Quick-create asks only for the essentials.
    pub fn validate_create(&self) -> Result<()> {
        if self.sample_name.trim().is_empty() {
            bail!("sample name is required -- enter a name and retry");
        }
        if self.due_date.trim().is_empty() {
            bail!("due date is required -- enter a date and retry");
        }
        if self.due_date_parsed().is_none() {
            bail!("due date is not a calendar date -- use YYYY-MM-DD");
        }
        Ok(())
    }

    /// The full edit form requires a complete record.
    pub fn validate_edit(&self) -> Result<()> {
        self.validate_create()?;
        if self.ship_to_address.trim().is_empty() {
            bail!("ship-to address is required -- enter an address and retry");
        }
        match self.cost_amount.trim().parse::<f64>() {
            Ok(amount) if amount >= 0.0 => {}
            Ok(_) => bail!("cost cannot be negative"),
            Err(_) => bail!("cost is not a number -- enter a decimal amount and retry"),
        }
        match self.quantity_amount.trim().parse::<f64>() {
            Ok(amount) if amount > 0.0 => {}
            _ => bail!("number of samples must be a positive number"),
        }
        if self.account_id.trim().is_empty() {
            bail!("account is required -- choose an account and retry");
        }
        if self.product_id.trim().is_empty() {
            bail!("product is required -- choose a product and retry");
        }
        if self.employee_id.trim().is_empty() {
            bail!("employee is required -- choose an employee and retry");
        }
        if self.hazardous && self.hazardous_reason.trim().is_empty() {
            bail!("hazardous reason is required for hazardous samples");
        }
        Ok(())
    }

    /// Builds the wire payload. Empty optional values are omitted, not
    /// sent as empty strings.
    pub fn to_payload(&self) -> SamplePayload {
        let optional = |value: &str| {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        };
        SamplePayload {
            sample_name: self.sample_name.trim().to_owned(),
            status: self.status.trim().to_owned(),
            sample_type: self.sample_type.trim().to_owned(),
            ship_to_address: self.ship_to_address.trim().to_owned(),
            due_date: self.due_date.trim().to_owned(),
            hazardous: self.hazardous,
            hazardous_reason: self
                .hazardous
                .then(|| optional(&self.hazardous_reason))
                .flatten(),
            packaging_width: optional(&self.packaging_width),
            packaging_height: optional(&self.packaging_height),
            packaging_material: optional(&self.packaging_material),
            cost_of_sample: optional(&self.cost_amount).map(|amount| CostPayload {
                amount,
                currency_code: self.currency_code.trim().to_owned(),
            }),
            number_of_samples: optional(&self.quantity_amount).map(|amount| QuantityPayload {
                amount,
                uom_code: self.uom_code.trim().to_owned(),
            }),
            account: optional(&self.account_id).map(|id| AccountKey {
                account_id: AccountId::new(id),
            }),
            product: optional(&self.product_id).map(|id| ProductKey {
                product_id: ProductId::new(id),
            }),
            employee: optional(&self.employee_id).map(|id| EmployeeKey {
                employee_id: EmployeeId::new(id),
            }),
            service_case: optional(&self.service_case_id).map(|id| ServiceCaseKey {
                service_case_id: ServiceCaseId::new(id),
            }),
            opportunity: optional(&self.opportunity_id).map(|id| OpportunityKey {
                opportunity_id: OpportunityId::new(id),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SampleDraft;

    fn complete_draft() -> SampleDraft {
        SampleDraft {
            sample_name: "Polymer batch".to_owned(),
            ship_to_address: "1 Dock Rd".to_owned(),
            due_date: "2026-03-01".to_owned(),
            cost_amount: "12.50".to_owned(),
            quantity_amount: "3".to_owned(),
            account_id: "a-1".to_owned(),
            product_id: "p-1".to_owned(),
            employee_id: "e-1".to_owned(),
            ..SampleDraft::blank()
        }
    }

    #[test]
    fn blank_draft_carries_the_service_defaults() {
        let draft = SampleDraft::blank();
        assert_eq!(draft.status, "OPEN");
        assert_eq!(draft.sample_type, "WITHPACKAGING");
        assert_eq!(draft.currency_code, "EUR");
        assert_eq!(draft.uom_code, "EA");
    }

    #[test]
    fn create_validation_requires_name_and_due_date() {
        let mut draft = SampleDraft::blank();
        assert!(draft.validate_create().is_err());

        draft.sample_name = "Steel coupon".to_owned();
        assert!(draft.validate_create().is_err());

        draft.due_date = "2026-05-01".to_owned();
        assert!(draft.validate_create().is_ok());
    }

    #[test]
    fn create_validation_rejects_non_calendar_due_date() {
        let mut draft = complete_draft();
        draft.due_date = "next week".to_owned();
        assert!(draft.validate_create().is_err());
    }

    #[test]
    fn edit_validation_requires_the_reference_fields() {
        let mut draft = complete_draft();
        assert!(draft.validate_edit().is_ok());

        draft.account_id.clear();
        assert!(draft.validate_edit().is_err());
    }

    #[test]
    fn edit_validation_rejects_non_numeric_cost() {
        let mut draft = complete_draft();
        draft.cost_amount = "twelve".to_owned();
        assert!(draft.validate_edit().is_err());

        draft.cost_amount = "-1".to_owned();
        assert!(draft.validate_edit().is_err());
    }

    #[test]
    fn edit_validation_requires_reason_for_hazardous_samples() {
        let mut draft = complete_draft();
        draft.hazardous = true;
        assert!(draft.validate_edit().is_err());

        draft.hazardous_reason = "flammable".to_owned();
        assert!(draft.validate_edit().is_ok());
    }

    #[test]
    fn payload_omits_empty_optional_sections() {
        let draft = complete_draft();
        let payload = draft.to_payload();
        assert!(payload.service_case.is_none());
        assert!(payload.opportunity.is_none());
        assert!(payload.packaging_material.is_none());
        assert!(payload.cost_of_sample.is_some());
    }

    #[test]
    fn payload_round_trips_a_fetched_record() {
        use crate::model::SamplePayload;

        let mut draft = complete_draft();
        draft.opportunity_id = "o-9".to_owned();
        let payload: SamplePayload = draft.to_payload();
        assert_eq!(payload.sample_name, "Polymer batch");
        assert!(payload.opportunity.is_some());
        // Hazardous reason is dropped when the flag is off.
        assert!(payload.hazardous_reason.is_none());
    }
}
