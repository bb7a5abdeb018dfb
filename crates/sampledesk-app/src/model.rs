// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use serde::{Deserialize, Serialize};
use time::Date;
use time::macros::format_description;

use crate::ids::*;

/// Monetary value as the sample service carries it: a decimal amount kept
/// as text plus an ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cost {
    #[serde(rename = "content")]
    pub amount: String,
    pub currency_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quantity {
    #[serde(rename = "content")]
    pub amount: String,
    pub uom_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRef {
    pub account_id: AccountId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    pub product_id: ProductId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRef {
    pub employee_id: EmployeeId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityRef {
    pub opportunity_id: OpportunityId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCaseRef {
    pub service_case_id: ServiceCaseId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_id: Option<String>,
}

/// A sample record as fetched from the sample service. Status and sample
/// type are service-defined codes and stay free-form text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub id: SampleId,
    pub sample_name: String,
    pub status: String,
    pub sample_type: String,
    #[serde(default)]
    pub ship_to_address: String,
    pub due_date: String,
    pub hazardous: bool,
    #[serde(default)]
    pub hazardous_reason: Option<String>,
    #[serde(default)]
    pub packaging_width: Option<String>,
    #[serde(default)]
    pub packaging_height: Option<String>,
    #[serde(default)]
    pub packaging_material: Option<String>,
    pub cost_of_sample: Cost,
    pub number_of_samples: Quantity,
    pub account: AccountRef,
    pub product: ProductRef,
    pub employee: EmployeeRef,
    #[serde(default)]
    pub opportunity: Option<OpportunityRef>,
    #[serde(default)]
    pub service_case: Option<ServiceCaseRef>,
    #[serde(default)]
    pub overdue_status_icon: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub modified_at: Option<String>,
    #[serde(default)]
    pub modified_by: Option<String>,
}

impl Sample {
    pub fn due_date_parsed(&self) -> Option<Date> {
        Date::parse(
            self.due_date.trim(),
            format_description!("[year]-[month]-[day]"),
        )
        .ok()
    }

    pub fn is_overdue(&self, today: Date) -> bool {
        self.due_date_parsed()
            .is_some_and(|due| due < today && self.status != "DELIVERED")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostPayload {
    #[serde(rename = "content")]
    pub amount: String,
    pub currency_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityPayload {
    #[serde(rename = "content")]
    pub amount: String,
    pub uom_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountKey {
    pub account_id: AccountId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductKey {
    pub product_id: ProductId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeKey {
    pub employee_id: EmployeeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCaseKey {
    pub service_case_id: ServiceCaseId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityKey {
    pub opportunity_id: OpportunityId,
}

/// Full-record payload for create and update. The service expects the
/// whole record on every update; single-field edits replace one value and
/// resend the rest. Optional sections are omitted entirely when empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplePayload {
    pub sample_name: String,
    pub status: String,
    pub sample_type: String,
    pub ship_to_address: String,
    pub due_date: String,
    pub hazardous: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hazardous_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packaging_width: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packaging_height: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packaging_material: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_of_sample: Option<CostPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_samples: Option<QuantityPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee: Option<EmployeeKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_case: Option<ServiceCaseKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opportunity: Option<OpportunityKey>,
}

impl SamplePayload {
    /// Rebuilds the full wire payload from a fetched record, for the
    /// resend-everything update contract.
    pub fn from_sample(sample: &Sample) -> Self {
        Self {
            sample_name: sample.sample_name.clone(),
            status: sample.status.clone(),
            sample_type: sample.sample_type.clone(),
            ship_to_address: sample.ship_to_address.clone(),
            due_date: sample.due_date.clone(),
            hazardous: sample.hazardous,
            hazardous_reason: sample.hazardous_reason.clone(),
            packaging_width: sample.packaging_width.clone(),
            packaging_height: sample.packaging_height.clone(),
            packaging_material: sample.packaging_material.clone(),
            cost_of_sample: Some(CostPayload {
                amount: sample.cost_of_sample.amount.clone(),
                currency_code: sample.cost_of_sample.currency_code.clone(),
            }),
            number_of_samples: Some(QuantityPayload {
                amount: sample.number_of_samples.amount.clone(),
                uom_code: sample.number_of_samples.uom_code.clone(),
            }),
            account: Some(AccountKey {
                account_id: sample.account.account_id.clone(),
            }),
            product: Some(ProductKey {
                product_id: sample.product.product_id.clone(),
            }),
            employee: Some(EmployeeKey {
                employee_id: sample.employee.employee_id.clone(),
            }),
            service_case: sample.service_case.as_ref().map(|case| ServiceCaseKey {
                service_case_id: case.service_case_id.clone(),
            }),
            opportunity: sample.opportunity.as_ref().map(|opp| OpportunityKey {
                opportunity_id: opp.opportunity_id.clone(),
            }),
        }
    }
}

/// One selectable entity from a CRM lookup collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRef {
    pub id: String,
    pub display_name: String,
    pub display_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountDetails {
    pub id: AccountId,
    pub formatted_name: String,
    pub display_id: Option<String>,
    pub formatted_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpportunityItem {
    pub product_id: Option<ProductId>,
    pub product_description: Option<String>,
    pub product_display_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpportunitySnapshot {
    pub id: OpportunityId,
    pub name: Option<String>,
    pub display_id: Option<String>,
    pub account: Option<EntityRef>,
    pub items: Vec<OpportunityItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Account,
    Product,
    Employee,
    Opportunity,
    ServiceCase,
}

impl EntityKind {
    pub const ALL: [Self; 5] = [
        Self::Account,
        Self::Product,
        Self::Employee,
        Self::Opportunity,
        Self::ServiceCase,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Product => "product",
            Self::Employee => "employee",
            Self::Opportunity => "opportunity",
            Self::ServiceCase => "service case",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickCreateKind {
    Opportunity,
    Sample,
    Product,
    Account,
    ServiceCase,
}

impl QuickCreateKind {
    pub const fn routing_key(self) -> &'static str {
        match self {
            Self::Opportunity => "guidedselling",
            Self::Sample => "customer.ssc.CUS8735",
            Self::Product => "mdproduct",
            Self::Account => "mdaccount",
            Self::ServiceCase => "case",
        }
    }
}

/// Opaque navigation request handed to the surrounding shell. The core
/// never interprets or validates the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavTarget {
    Sample(SampleId),
    Account(AccountId),
    Product(ProductId),
    Employee(EmployeeId),
    Opportunity(OpportunityId),
    ServiceCase(ServiceCaseId),
    OpportunityList,
    QuickCreate(QuickCreateKind),
}

/// Complete-snapshot record source; each call replaces local state
/// wholesale.
pub trait RecordSource {
    fn fetch_all(&mut self) -> Result<Vec<Sample>>;
}

pub trait MutationSink {
    fn create(&mut self, payload: &SamplePayload) -> Result<()>;
    fn update(&mut self, id: &SampleId, payload: &SamplePayload) -> Result<()>;
    fn delete(&mut self, id: &SampleId) -> Result<()>;
}

/// Entity lookup collaborators. Each collection is independently
/// failable; callers degrade a failure to an empty option list.
pub trait EntityDirectory {
    fn list_entities(&mut self, kind: EntityKind) -> Result<Vec<EntityRef>>;
    fn fetch_account(&mut self, id: &AccountId) -> Result<Option<AccountDetails>>;
    fn fetch_opportunity(&mut self, id: &OpportunityId) -> Result<Option<OpportunitySnapshot>>;
}

pub trait Navigator {
    fn navigate(&mut self, target: &NavTarget) -> Result<()>;
}

pub const CURRENCIES: [(&str, &str); 30] = [
    ("EUR", "Euro"),
    ("USD", "US Dollar"),
    ("GBP", "British Pound"),
    ("JPY", "Japanese Yen"),
    ("CNY", "Chinese Yuan"),
    ("CHF", "Swiss Franc"),
    ("CAD", "Canadian Dollar"),
    ("AUD", "Australian Dollar"),
    ("INR", "Indian Rupee"),
    ("BRL", "Brazilian Real"),
    ("MXN", "Mexican Peso"),
    ("ZAR", "South African Rand"),
    ("SEK", "Swedish Krona"),
    ("NOK", "Norwegian Krone"),
    ("DKK", "Danish Krone"),
    ("PLN", "Polish Zloty"),
    ("RUB", "Russian Ruble"),
    ("SGD", "Singapore Dollar"),
    ("HKD", "Hong Kong Dollar"),
    ("KRW", "South Korean Won"),
    ("TRY", "Turkish Lira"),
    ("AED", "UAE Dirham"),
    ("SAR", "Saudi Riyal"),
    ("ILS", "Israeli Shekel"),
    ("THB", "Thai Baht"),
    ("MYR", "Malaysian Ringgit"),
    ("IDR", "Indonesian Rupiah"),
    ("NZD", "New Zealand Dollar"),
    ("PHP", "Philippine Peso"),
    ("IQD", "Iraqi Dinar"),
];

pub const UNITS_OF_MEASURE: [(&str, &str); 61] = [
    ("EA", "Each"),
    ("PC", "Piece"),
    ("SET", "Set"),
    ("PAA", "Pair"),
    ("DZN", "Dozen"),
    ("GRO", "Gross"),
    ("KGM", "Kilogram"),
    ("GRM", "Gram"),
    ("MGM", "Milligram"),
    ("TNE", "Metric Ton"),
    ("LBR", "Pound"),
    ("ONZ", "Ounce"),
    ("MTR", "Meter"),
    ("CMT", "Centimeter"),
    ("MMT", "Millimeter"),
    ("KMT", "Kilometer"),
    ("FOT", "Foot"),
    ("INH", "Inch"),
    ("YRD", "Yard"),
    ("SMI", "Mile"),
    ("MTK", "Square Meter"),
    ("CMK", "Square Centimeter"),
    ("KMK", "Square Kilometer"),
    ("FTK", "Square Foot"),
    ("INK", "Square Inch"),
    ("YDK", "Square Yard"),
    ("ACR", "Acre"),
    ("HAR", "Hectare"),
    ("LTR", "Liter"),
    ("MLT", "Milliliter"),
    ("MTQ", "Cubic Meter"),
    ("CMQ", "Cubic Centimeter"),
    ("DMQ", "Cubic Decimeter"),
    ("FTQ", "Cubic Foot"),
    ("INQ", "Cubic Inch"),
    ("GLL", "Gallon (US)"),
    ("GLI", "Gallon (UK)"),
    ("PT", "Pint"),
    ("QT", "Quart"),
    ("SEC", "Second"),
    ("MIN", "Minute"),
    ("HUR", "Hour"),
    ("DAY", "Day"),
    ("WEE", "Week"),
    ("MON", "Month"),
    ("ANN", "Year"),
    ("5B", "Batch"),
    ("XCR", "Carton"),
    ("BX", "Box"),
    ("CS", "Case"),
    ("CT", "Container"),
    ("PK", "Package"),
    ("PA", "Packet"),
    ("RL", "Roll"),
    ("BG", "Bag"),
    ("BO", "Bottle"),
    ("CA", "Can"),
    ("TU", "Tube"),
    ("DR", "Drum"),
    ("BLL", "Barrel"),
    ("CEL", "Cell"),
];
