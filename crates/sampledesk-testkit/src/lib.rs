// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use time::{Date, Duration, Month};

use sampledesk_app::{
    AccountDetails, AccountId, AccountRef, Cost, EmployeeId, EmployeeRef, EntityDirectory,
    EntityKind, EntityRef, MutationSink, NavTarget, Navigator, OpportunityId, OpportunityItem,
    OpportunityRef, OpportunitySnapshot, ProductId, ProductRef, Quantity, RecordSource, Sample,
    SampleId, SamplePayload, ServiceCaseId, ServiceCaseRef,
};

const ACCOUNT_ADJECTIVES: [&str; 12] = [
    "Northwind", "Apex", "Summit", "Heritage", "Lakeside", "Pioneer", "Frontier", "Evergreen",
    "Harbor", "Canyon", "Sterling", "Meridian",
];
const ACCOUNT_SUFFIXES: [&str; 6] = [
    "Industries",
    "Manufacturing",
    "Logistics",
    "Chemicals",
    "Materials",
    "Group",
];

const PRODUCT_NAMES: [&str; 16] = [
    "Polymer Pellets",
    "Steel Coupon",
    "Adhesive Film",
    "Coated Panel",
    "Sealant Cartridge",
    "Copper Wire Spool",
    "Ceramic Substrate",
    "Rubber Gasket",
    "Glass Fiber Mat",
    "Epoxy Resin",
    "Aluminum Sheet",
    "Lubricant Drum",
    "Pigment Powder",
    "Filter Membrane",
    "Foam Block",
    "Solvent Canister",
];

const FIRST_NAMES: [&str; 16] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn", "Parker", "Drew",
    "Kai", "Elliot", "Robin", "Cameron", "Hayden", "Rowan",
];
const LAST_NAMES: [&str; 18] = [
    "Walker", "Martin", "Hill", "Evans", "Lopez", "Gray", "Ward", "Young", "Diaz", "Reed",
    "Campbell", "Turner", "Flores", "Bennett", "Price", "Morris", "Foster", "Brooks",
];

const CITIES: [&str; 12] = [
    "Austin",
    "Seattle",
    "Denver",
    "Madison",
    "Raleigh",
    "Pittsburgh",
    "Portland",
    "Boise",
    "Phoenix",
    "Nashville",
    "Columbus",
    "Minneapolis",
];
const STREET_NAMES: [&str; 12] = [
    "Cedar", "Maple", "Oak", "Pine", "Willow", "Elm", "Birch", "Juniper", "Sunset", "Ridge",
    "Valley", "Lakeview",
];

const OPPORTUNITY_THEMES: [&str; 8] = [
    "Spring expansion",
    "Pilot line trial",
    "Annual supply renewal",
    "New plant fit-out",
    "Process upgrade",
    "Export program",
    "Prototype run",
    "Replacement parts deal",
];

const CASE_SUBJECTS: [&str; 8] = [
    "Coating defect on delivered batch",
    "Late shipment follow-up",
    "Packaging damage claim",
    "Spec clarification request",
    "Return authorization",
    "Quality audit finding",
    "Label mismatch",
    "Moisture contamination report",
];

const SAMPLE_STATUSES: [&str; 4] = ["OPEN", "INPROCESS", "SHIPPED", "DELIVERED"];
const SAMPLE_TYPES: [&str; 2] = ["WITHPACKAGING", "WITHOUTPACKAGING"];
const PACKAGING_MATERIALS: [&str; 5] = ["Cardboard", "Wood Crate", "Foam", "Plastic Tub", "Steel Drum"];
const HAZARD_REASONS: [&str; 4] = ["flammable", "corrosive", "oxidizer", "compressed gas"];

const REFERENCE_YEAR: i32 = 2026;

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

fn reference_today() -> Date {
    Date::from_calendar_date(REFERENCE_YEAR, Month::June, 15).expect("valid reference date")
}

/// Deterministic generator for CRM lookup entities and sample records.
/// The same seed always produces the same dataset.
#[derive(Debug, Clone)]
pub struct SampleFaker {
    rng: DeterministicRng,
}

impl SampleFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    fn pick<'a>(&mut self, values: &[&'a str]) -> &'a str {
        values[self.rng.int_n(values.len())]
    }

    fn amount(&mut self, low: u64, high: u64) -> String {
        let span = high.saturating_sub(low).max(1);
        let whole = low + self.rng.next_u64() % span;
        format!("{whole}.{:02}", self.rng.int_n(100))
    }

    fn date_near_today(&mut self, days_back: i64, days_forward: i64) -> Date {
        let span = (days_back + days_forward).max(1);
        let offset = (self.rng.next_u64() % (span as u64)) as i64 - days_back;
        reference_today() + Duration::days(offset)
    }

    pub fn account(&mut self, index: usize) -> AccountDetails {
        let name = format!(
            "{} {}",
            ACCOUNT_ADJECTIVES[index % ACCOUNT_ADJECTIVES.len()],
            self.pick(&ACCOUNT_SUFFIXES)
        );
        let street = self.pick(&STREET_NAMES);
        let city = self.pick(&CITIES);
        AccountDetails {
            id: AccountId::new(format!("acc-{}", index + 1)),
            formatted_name: name,
            display_id: Some(format!("{}", 1000 + index)),
            formatted_address: Some(format!(
                "{} {street} St, {city}",
                100 + self.rng.int_n(9_000)
            )),
        }
    }

    pub fn product(&mut self, index: usize) -> EntityRef {
        EntityRef {
            id: format!("prod-{}", index + 1),
            display_name: PRODUCT_NAMES[index % PRODUCT_NAMES.len()].to_owned(),
            display_id: Some(format!("P-{}", 100 + index)),
        }
    }

    pub fn employee(&mut self, index: usize) -> EntityRef {
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        EntityRef {
            id: format!("emp-{}", index + 1),
            display_name: format!("{first} {last}"),
            display_id: Some(format!("E-{}", 10 + index)),
        }
    }

    pub fn service_case(&mut self, index: usize) -> EntityRef {
        EntityRef {
            id: format!("case-{}", index + 1),
            display_name: CASE_SUBJECTS[index % CASE_SUBJECTS.len()].to_owned(),
            display_id: Some(format!("{}", 7000 + index)),
        }
    }

    pub fn opportunity(
        &mut self,
        index: usize,
        account: &AccountDetails,
        products: &[EntityRef],
    ) -> OpportunitySnapshot {
        let item_count = 1 + self.rng.int_n(3.min(products.len()));
        let items = (0..item_count)
            .map(|offset| {
                let product = &products[(index + offset) % products.len()];
                OpportunityItem {
                    product_id: Some(ProductId::new(product.id.clone())),
                    product_description: Some(product.display_name.clone()),
                    product_display_id: product.display_id.clone(),
                }
            })
            .collect();
        OpportunitySnapshot {
            id: OpportunityId::new(format!("opp-{}", index + 1)),
            name: Some(format!(
                "{} ({})",
                OPPORTUNITY_THEMES[index % OPPORTUNITY_THEMES.len()],
                account.formatted_name
            )),
            display_id: Some(format!("{}", 500 + index)),
            account: Some(EntityRef {
                id: account.id.as_str().to_owned(),
                display_name: account.formatted_name.clone(),
                display_id: account.display_id.clone(),
            }),
            items,
        }
    }

    pub fn sample(
        &mut self,
        index: usize,
        account: &AccountDetails,
        product: &EntityRef,
        employee: &EntityRef,
        opportunity: Option<&OpportunitySnapshot>,
        case: Option<&EntityRef>,
    ) -> Sample {
        let hazardous = self.rng.int_n(5) == 0;
        let with_packaging = self.pick(&SAMPLE_TYPES) == "WITHPACKAGING";
        let due = self.date_near_today(45, 90);
        Sample {
            id: SampleId::new(format!("smp-{}", index + 1)),
            sample_name: format!("{} sample #{}", product.display_name, index + 1),
            status: self.pick(&SAMPLE_STATUSES).to_owned(),
            sample_type: if with_packaging {
                "WITHPACKAGING".to_owned()
            } else {
                "WITHOUTPACKAGING".to_owned()
            },
            ship_to_address: account.formatted_address.clone().unwrap_or_default(),
            due_date: format!(
                "{:04}-{:02}-{:02}",
                due.year(),
                due.month() as u8,
                due.day()
            ),
            hazardous,
            hazardous_reason: hazardous.then(|| self.pick(&HAZARD_REASONS).to_owned()),
            packaging_width: with_packaging.then(|| format!("{}", 10 + self.rng.int_n(90))),
            packaging_height: with_packaging.then(|| format!("{}", 10 + self.rng.int_n(90))),
            packaging_material: with_packaging.then(|| self.pick(&PACKAGING_MATERIALS).to_owned()),
            cost_of_sample: Cost {
                amount: self.amount(5, 500),
                currency_code: if self.rng.bool() { "EUR" } else { "USD" }.to_owned(),
            },
            number_of_samples: Quantity {
                amount: format!("{}", 1 + self.rng.int_n(12)),
                uom_code: "EA".to_owned(),
            },
            account: AccountRef {
                account_id: account.id.clone(),
                name: Some(account.formatted_name.clone()),
                display_id: account.display_id.clone(),
            },
            product: ProductRef {
                product_id: ProductId::new(product.id.clone()),
                name: Some(product.display_name.clone()),
                display_id: product.display_id.clone(),
            },
            employee: EmployeeRef {
                employee_id: EmployeeId::new(employee.id.clone()),
                name: Some(employee.display_name.clone()),
                display_id: employee.display_id.clone(),
            },
            opportunity: opportunity.map(|opp| OpportunityRef {
                opportunity_id: opp.id.clone(),
                name: opp.name.clone(),
                display_id: opp.display_id.clone(),
            }),
            service_case: case.map(|case| ServiceCaseRef {
                service_case_id: ServiceCaseId::new(case.id.clone()),
                name: Some(case.display_name.clone()),
                display_id: case.display_id.clone(),
            }),
            overdue_status_icon: None,
            created_at: None,
            created_by: Some(employee.display_name.clone()),
            modified_at: None,
            modified_by: None,
        }
    }
}

/// In-memory stand-in for the sample service and the CRM collections.
/// Backs demo mode and the terminal tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCrm {
    pub samples: Vec<Sample>,
    pub accounts: Vec<AccountDetails>,
    pub products: Vec<EntityRef>,
    pub employees: Vec<EntityRef>,
    pub opportunities: Vec<OpportunitySnapshot>,
    pub cases: Vec<EntityRef>,
    pub nav_log: Vec<NavTarget>,
    pub fail_mutations: bool,
    next_id: usize,
}

impl InMemoryCrm {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A fully-populated deterministic dataset.
    pub fn demo(seed: u64, sample_count: usize) -> Self {
        let mut faker = SampleFaker::new(seed);

        let accounts: Vec<AccountDetails> = (0..6).map(|index| faker.account(index)).collect();
        let products: Vec<EntityRef> = (0..10).map(|index| faker.product(index)).collect();
        let employees: Vec<EntityRef> = (0..5).map(|index| faker.employee(index)).collect();
        let cases: Vec<EntityRef> = (0..4).map(|index| faker.service_case(index)).collect();
        let opportunities: Vec<OpportunitySnapshot> = (0..5)
            .map(|index| faker.opportunity(index, &accounts[index % accounts.len()], &products))
            .collect();

        let samples = (0..sample_count)
            .map(|index| {
                let account = &accounts[index % accounts.len()];
                let product = &products[index % products.len()];
                let employee = &employees[index % employees.len()];
                let opportunity = (index % 3 == 0).then(|| {
                    &opportunities[index % opportunities.len()]
                });
                let case = (index % 4 == 0).then(|| &cases[index % cases.len()]);
                faker.sample(index, account, product, employee, opportunity, case)
            })
            .collect::<Vec<_>>();

        Self {
            samples,
            accounts,
            products,
            employees,
            opportunities,
            cases,
            nav_log: Vec::new(),
            fail_mutations: false,
            next_id: sample_count + 1,
        }
    }

    fn lookup_account(&self, id: &AccountId) -> Option<&AccountDetails> {
        self.accounts.iter().find(|account| account.id == *id)
    }

    fn lookup_ref<'a>(collection: &'a [EntityRef], id: &str) -> Option<&'a EntityRef> {
        collection.iter().find(|entry| entry.id == id)
    }

    /// Materializes a fetched-record view of a payload, resolving the
    /// display names the payload does not carry.
    fn sample_from_payload(&self, id: SampleId, payload: &SamplePayload) -> Sample {
        let account = payload.account.as_ref().map(|key| key.account_id.clone());
        let account_details = account.as_ref().and_then(|id| self.lookup_account(id));
        let product = payload
            .product
            .as_ref()
            .and_then(|key| Self::lookup_ref(&self.products, key.product_id.as_str()));
        let employee = payload
            .employee
            .as_ref()
            .and_then(|key| Self::lookup_ref(&self.employees, key.employee_id.as_str()));

        Sample {
            id,
            sample_name: payload.sample_name.clone(),
            status: payload.status.clone(),
            sample_type: payload.sample_type.clone(),
            ship_to_address: payload.ship_to_address.clone(),
            due_date: payload.due_date.clone(),
            hazardous: payload.hazardous,
            hazardous_reason: payload.hazardous_reason.clone(),
            packaging_width: payload.packaging_width.clone(),
            packaging_height: payload.packaging_height.clone(),
            packaging_material: payload.packaging_material.clone(),
            cost_of_sample: Cost {
                amount: payload
                    .cost_of_sample
                    .as_ref()
                    .map(|cost| cost.amount.clone())
                    .unwrap_or_default(),
                currency_code: payload
                    .cost_of_sample
                    .as_ref()
                    .map(|cost| cost.currency_code.clone())
                    .unwrap_or_default(),
            },
            number_of_samples: Quantity {
                amount: payload
                    .number_of_samples
                    .as_ref()
                    .map(|quantity| quantity.amount.clone())
                    .unwrap_or_default(),
                uom_code: payload
                    .number_of_samples
                    .as_ref()
                    .map(|quantity| quantity.uom_code.clone())
                    .unwrap_or_default(),
            },
            account: AccountRef {
                account_id: account.unwrap_or_else(|| AccountId::new("")),
                name: account_details.map(|details| details.formatted_name.clone()),
                display_id: account_details.and_then(|details| details.display_id.clone()),
            },
            product: ProductRef {
                product_id: payload
                    .product
                    .as_ref()
                    .map(|key| key.product_id.clone())
                    .unwrap_or_else(|| ProductId::new("")),
                name: product.map(|entry| entry.display_name.clone()),
                display_id: product.and_then(|entry| entry.display_id.clone()),
            },
            employee: EmployeeRef {
                employee_id: payload
                    .employee
                    .as_ref()
                    .map(|key| key.employee_id.clone())
                    .unwrap_or_else(|| EmployeeId::new("")),
                name: employee.map(|entry| entry.display_name.clone()),
                display_id: employee.and_then(|entry| entry.display_id.clone()),
            },
            opportunity: payload.opportunity.as_ref().map(|key| OpportunityRef {
                opportunity_id: key.opportunity_id.clone(),
                name: self
                    .opportunities
                    .iter()
                    .find(|opp| opp.id == key.opportunity_id)
                    .and_then(|opp| opp.name.clone()),
                display_id: None,
            }),
            service_case: payload.service_case.as_ref().map(|key| ServiceCaseRef {
                service_case_id: key.service_case_id.clone(),
                name: Self::lookup_ref(&self.cases, key.service_case_id.as_str())
                    .map(|entry| entry.display_name.clone()),
                display_id: None,
            }),
            overdue_status_icon: None,
            created_at: None,
            created_by: None,
            modified_at: None,
            modified_by: None,
        }
    }
}

impl RecordSource for InMemoryCrm {
    fn fetch_all(&mut self) -> Result<Vec<Sample>> {
        Ok(self.samples.clone())
    }
}

impl MutationSink for InMemoryCrm {
    fn create(&mut self, payload: &SamplePayload) -> Result<()> {
        if self.fail_mutations {
            bail!("create rejected by the sample service");
        }
        let id = SampleId::new(format!("smp-{}", self.next_id));
        self.next_id += 1;
        let sample = self.sample_from_payload(id, payload);
        self.samples.push(sample);
        Ok(())
    }

    fn update(&mut self, id: &SampleId, payload: &SamplePayload) -> Result<()> {
        if self.fail_mutations {
            bail!("update rejected by the sample service");
        }
        let Some(position) = self.samples.iter().position(|sample| sample.id == *id) else {
            bail!("sample {id} not found");
        };
        self.samples[position] = self.sample_from_payload(id.clone(), payload);
        Ok(())
    }

    fn delete(&mut self, id: &SampleId) -> Result<()> {
        if self.fail_mutations {
            bail!("delete rejected by the sample service");
        }
        let before = self.samples.len();
        self.samples.retain(|sample| sample.id != *id);
        if self.samples.len() == before {
            bail!("sample {id} not found");
        }
        Ok(())
    }
}

impl EntityDirectory for InMemoryCrm {
    fn list_entities(&mut self, kind: EntityKind) -> Result<Vec<EntityRef>> {
        let entries = match kind {
            EntityKind::Account => self
                .accounts
                .iter()
                .map(|account| EntityRef {
                    id: account.id.as_str().to_owned(),
                    display_name: account.formatted_name.clone(),
                    display_id: account.display_id.clone(),
                })
                .collect(),
            EntityKind::Product => self.products.clone(),
            EntityKind::Employee => self.employees.clone(),
            EntityKind::Opportunity => self
                .opportunities
                .iter()
                .map(|opp| EntityRef {
                    id: opp.id.as_str().to_owned(),
                    display_name: opp.name.clone().unwrap_or_default(),
                    display_id: opp.display_id.clone(),
                })
                .collect(),
            EntityKind::ServiceCase => self.cases.clone(),
        };
        Ok(entries)
    }

    fn fetch_account(&mut self, id: &AccountId) -> Result<Option<AccountDetails>> {
        Ok(self.lookup_account(id).cloned())
    }

    fn fetch_opportunity(&mut self, id: &OpportunityId) -> Result<Option<OpportunitySnapshot>> {
        Ok(self.opportunities.iter().find(|opp| opp.id == *id).cloned())
    }
}

impl Navigator for InMemoryCrm {
    fn navigate(&mut self, target: &NavTarget) -> Result<()> {
        self.nav_log.push(target.clone());
        Ok(())
    }
}
