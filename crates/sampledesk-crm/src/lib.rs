// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use sampledesk_app::{
    AccountDetails, AccountId, EntityKind, EntityRef, MutationSink, OpportunityId,
    OpportunityItem, OpportunitySnapshot, ProductId, RecordSource, Sample, SampleId,
    SamplePayload,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Client for the sample service: one collection with full CRUD. Every
/// mutation sends the complete record.
#[derive(Debug, Clone)]
pub struct SampleClient {
    base_url: String,
    credentials: Option<Credentials>,
    http: HttpClient,
}

impl SampleClient {
    pub fn new(
        base_url: &str,
        credentials: Option<Credentials>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("samples.base_url must not be empty");
        }
        Url::parse(&base_url).with_context(|| format!("parse samples.base_url {base_url:?}"))?;

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            credentials,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> String {
        format!("{}/sample-service/samples", self.base_url)
    }

    fn record_url(&self, id: &SampleId) -> String {
        format!("{}/sample-service/samples/{}", self.base_url, id)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(credentials) => {
                request.basic_auth(&credentials.username, Some(&credentials.password))
            }
            None => request,
        }
    }

    pub fn fetch_samples(&self) -> Result<Vec<Sample>> {
        let response = self
            .authorized(self.http.get(self.collection_url()))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: CollectionEnvelope<Sample> =
            response.json().context("decode sample collection")?;
        Ok(parsed.value)
    }

    /// Connectivity probe used by the startup check.
    pub fn check(&self) -> Result<usize> {
        Ok(self.fetch_samples()?.len())
    }

    pub fn create_sample(&self, payload: &SamplePayload) -> Result<()> {
        let response = self
            .authorized(self.http.post(self.collection_url()))
            .json(payload)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        Ok(())
    }

    pub fn update_sample(&self, id: &SampleId, payload: &SamplePayload) -> Result<()> {
        let response = self
            .authorized(self.http.patch(self.record_url(id)))
            .json(payload)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        Ok(())
    }

    pub fn delete_sample(&self, id: &SampleId) -> Result<()> {
        let response = self
            .authorized(self.http.delete(self.record_url(id)))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        Ok(())
    }
}

impl RecordSource for SampleClient {
    fn fetch_all(&mut self) -> Result<Vec<Sample>> {
        self.fetch_samples()
    }
}

impl MutationSink for SampleClient {
    fn create(&mut self, payload: &SamplePayload) -> Result<()> {
        self.create_sample(payload)
    }

    fn update(&mut self, id: &SampleId, payload: &SamplePayload) -> Result<()> {
        self.update_sample(id, payload)
    }

    fn delete(&mut self, id: &SampleId) -> Result<()> {
        self.delete_sample(id)
    }
}

/// Read-only client for the CRM lookup collections the selectors and
/// pre-fill paths draw from.
#[derive(Debug, Clone)]
pub struct CrmClient {
    base_url: String,
    credentials: Option<Credentials>,
    page_size: usize,
    http: HttpClient,
}

impl CrmClient {
    pub fn new(
        base_url: &str,
        credentials: Option<Credentials>,
        page_size: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("crm.base_url must not be empty");
        }
        Url::parse(&base_url).with_context(|| format!("parse crm.base_url {base_url:?}"))?;
        if page_size == 0 {
            bail!("crm.page_size must be at least 1");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            credentials,
            page_size,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(credentials) => {
                request.basic_auth(&credentials.username, Some(&credentials.password))
            }
            None => request,
        }
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str, context: &str) -> Result<T> {
        let response = self
            .authorized(self.http.get(url))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        response.json().with_context(|| format!("decode {context}"))
    }

    pub fn list(&self, kind: EntityKind) -> Result<Vec<EntityRef>> {
        let url = format!(
            "{}/{}?$top={}",
            self.base_url,
            collection_path(kind),
            self.page_size
        );
        let parsed: CollectionEnvelope<EntityRow> =
            self.get_json(&url, &format!("{} collection", kind.label()))?;
        Ok(parsed
            .value
            .into_iter()
            .map(|row| row.into_entity_ref(kind))
            .collect())
    }

    pub fn account(&self, id: &AccountId) -> Result<Option<AccountDetails>> {
        let url = format!("{}/account-service/accounts/{}", self.base_url, id);
        let response = self
            .authorized(self.http.get(&url))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: RecordEnvelope<AccountRow> = response.json().context("decode account")?;
        let row = parsed.value;
        Ok(Some(AccountDetails {
            id: AccountId::new(row.id),
            formatted_name: row.formatted_name.unwrap_or_default(),
            display_id: row.display_id,
            formatted_address: row.formatted_address,
        }))
    }

    pub fn opportunity(&self, id: &OpportunityId) -> Result<Option<OpportunitySnapshot>> {
        let url = format!(
            "{}/opportunity-service/opportunities/{}",
            self.base_url, id
        );
        let response = self
            .authorized(self.http.get(&url))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: RecordEnvelope<OpportunityRow> =
            response.json().context("decode opportunity")?;
        let row = parsed.value;
        Ok(Some(OpportunitySnapshot {
            id: OpportunityId::new(row.id),
            name: row.name,
            display_id: row.display_id,
            account: row.account.map(|account| EntityRef {
                id: account.id,
                display_name: account.formatted_name.unwrap_or_default(),
                display_id: account.display_id,
            }),
            items: row
                .items
                .into_iter()
                .map(|item| OpportunityItem {
                    product_id: item.product_id.map(ProductId::new),
                    product_description: item.product_description,
                    product_display_id: item.product_display_id,
                })
                .collect(),
        }))
    }
}

fn collection_path(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Account => "account-service/accounts",
        EntityKind::Product => "product-service/products",
        EntityKind::Employee => "employee-service/employees",
        EntityKind::Opportunity => "opportunity-service/opportunities",
        EntityKind::ServiceCase => "case-service/cases",
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- check the configured base URL and network ({})",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(error) = parsed.error
        && !error.message.is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), error.message);
    }

    if body.len() < 100 && !body.contains('{') && !body.trim().is_empty() {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Deserialize)]
struct CollectionEnvelope<T> {
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RecordEnvelope<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntityRow {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    formatted_name: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    display_id: Option<String>,
}

impl EntityRow {
    fn into_entity_ref(self, kind: EntityKind) -> EntityRef {
        let display_name = match kind {
            EntityKind::Account | EntityKind::Employee => self.formatted_name.or(self.name),
            EntityKind::Product | EntityKind::Opportunity => self.name.or(self.formatted_name),
            EntityKind::ServiceCase => self.subject.or(self.name),
        };
        EntityRef {
            id: self.id,
            display_name: display_name.unwrap_or_default(),
            display_id: self.display_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountRow {
    id: String,
    #[serde(default)]
    formatted_name: Option<String>,
    #[serde(default)]
    display_id: Option<String>,
    #[serde(default)]
    formatted_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpportunityRow {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    display_id: Option<String>,
    #[serde(default)]
    account: Option<AccountRow>,
    #[serde(default)]
    items: Vec<OpportunityItemRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpportunityItemRow {
    #[serde(default)]
    product_id: Option<String>,
    #[serde(default)]
    product_description: Option<String>,
    #[serde(default)]
    product_display_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::{EntityRow, clean_error_response};
    use reqwest::StatusCode;
    use sampledesk_app::EntityKind;

    #[test]
    fn entity_row_prefers_the_kind_specific_display_field() {
        let row = EntityRow {
            id: "1".to_owned(),
            name: Some("raw".to_owned()),
            formatted_name: Some("Formatted".to_owned()),
            subject: None,
            display_id: None,
        };
        assert_eq!(
            row.into_entity_ref(EntityKind::Account).display_name,
            "Formatted"
        );

        let row = EntityRow {
            id: "2".to_owned(),
            name: Some("Widget".to_owned()),
            formatted_name: None,
            subject: None,
            display_id: None,
        };
        assert_eq!(
            row.into_entity_ref(EntityKind::Product).display_name,
            "Widget"
        );

        let row = EntityRow {
            id: "3".to_owned(),
            name: None,
            formatted_name: None,
            subject: Some("Broken valve".to_owned()),
            display_id: None,
        };
        assert_eq!(
            row.into_entity_ref(EntityKind::ServiceCase).display_name,
            "Broken valve"
        );
    }

    #[test]
    fn clean_error_response_extracts_structured_messages() {
        let error = clean_error_response(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"message":"dueDate is required"}}"#,
        );
        assert!(error.to_string().contains("dueDate is required"));

        let error = clean_error_response(StatusCode::BAD_GATEWAY, "upstream offline");
        assert!(error.to_string().contains("upstream offline"));

        let error = clean_error_response(StatusCode::INTERNAL_SERVER_ERROR, "{\"weird\":1}");
        assert_eq!(error.to_string(), "server returned 500");
    }
}
