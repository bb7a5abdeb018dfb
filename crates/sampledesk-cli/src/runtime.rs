// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::process::{Command, Stdio};

use sampledesk_app::{
    AccountDetails, AccountId, EntityDirectory, EntityKind, EntityRef, MutationSink, NavTarget,
    Navigator, OpportunityId, OpportunitySnapshot, RecordSource, Sample, SampleId, SamplePayload,
};
use sampledesk_crm::{CrmClient, SampleClient};

/// Production runtime: samples come from the sample service, lookups
/// from the CRM, and navigation opens deep links in the local browser.
pub struct HttpRuntime {
    samples: SampleClient,
    crm: CrmClient,
    ui_base_url: String,
}

impl HttpRuntime {
    pub fn new(samples: SampleClient, crm: CrmClient, ui_base_url: String) -> Self {
        Self {
            samples,
            crm,
            ui_base_url: ui_base_url.trim_end_matches('/').to_owned(),
        }
    }

    fn deep_link(&self, target: &NavTarget) -> String {
        let base = &self.ui_base_url;
        match target {
            NavTarget::Sample(id) => format!("{base}/samples/{id}"),
            NavTarget::Account(id) => format!("{base}/accounts/{id}"),
            NavTarget::Product(id) => format!("{base}/products/{id}"),
            NavTarget::Employee(id) => format!("{base}/employees/{id}"),
            NavTarget::Opportunity(id) => format!("{base}/opportunities/{id}"),
            NavTarget::ServiceCase(id) => format!("{base}/cases/{id}"),
            NavTarget::OpportunityList => format!("{base}/opportunities"),
            NavTarget::QuickCreate(kind) => {
                format!("{base}/quick-create/{}", kind.routing_key())
            }
        }
    }
}

impl RecordSource for HttpRuntime {
    fn fetch_all(&mut self) -> Result<Vec<Sample>> {
        self.samples.fetch_samples()
    }
}

impl MutationSink for HttpRuntime {
    fn create(&mut self, payload: &SamplePayload) -> Result<()> {
        self.samples.create_sample(payload)
    }

    fn update(&mut self, id: &SampleId, payload: &SamplePayload) -> Result<()> {
        self.samples.update_sample(id, payload)
    }

    fn delete(&mut self, id: &SampleId) -> Result<()> {
        self.samples.delete_sample(id)
    }
}

impl EntityDirectory for HttpRuntime {
    fn list_entities(&mut self, kind: EntityKind) -> Result<Vec<EntityRef>> {
        self.crm.list(kind)
    }

    fn fetch_account(&mut self, id: &AccountId) -> Result<Option<AccountDetails>> {
        self.crm.account(id)
    }

    fn fetch_opportunity(&mut self, id: &OpportunityId) -> Result<Option<OpportunitySnapshot>> {
        self.crm.opportunity(id)
    }
}

impl Navigator for HttpRuntime {
    fn navigate(&mut self, target: &NavTarget) -> Result<()> {
        open_in_browser(&self.deep_link(target))
    }
}

fn open_in_browser(url: &str) -> Result<()> {
    let opener = if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "explorer"
    } else {
        "xdg-open"
    };
    Command::new(opener)
        .arg(url)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("open {url} in the browser"))?;
    Ok(())
}
