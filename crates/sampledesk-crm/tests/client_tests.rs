// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use sampledesk_crm::{Credentials, CrmClient, SampleClient};
use sampledesk_app::{AccountId, EntityKind, SampleId, SamplePayload};
use std::io::Read;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Method, Response, Server};

fn json_response(body: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(body).with_status_code(200).with_header(
        Header::from_bytes("Content-Type", "application/json").expect("valid content type header"),
    )
}

const SAMPLE_JSON: &str = r#"{
    "id": "s-1",
    "sampleName": "Polymer batch",
    "status": "OPEN",
    "sampleType": "WITHPACKAGING",
    "shipToAddress": "1 Dock Rd",
    "dueDate": "2026-03-01",
    "hazardous": false,
    "costOfSample": {"content": "12.50", "currencyCode": "EUR"},
    "numberOfSamples": {"content": "3", "uomCode": "EA"},
    "account": {"accountId": "a-1", "name": "Acme"},
    "product": {"productId": "p-1", "name": "Widget"},
    "employee": {"employeeId": "e-1", "name": "Avery Walker"}
}"#;

#[test]
fn fetch_error_names_the_unreachable_endpoint() {
    let client = SampleClient::new("http://127.0.0.1:1", None, Duration::from_millis(50))
        .expect("client should initialize");

    let error = client
        .fetch_samples()
        .expect_err("fetch should fail for unreachable endpoint");
    assert!(error.to_string().contains("cannot reach"));
}

#[test]
fn fetch_samples_decodes_the_value_envelope() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/sample-service/samples");
        assert_eq!(*request.method(), Method::Get);
        let body = format!(r#"{{"value":[{SAMPLE_JSON}]}}"#);
        request
            .respond(json_response(&body))
            .expect("response should succeed");
    });

    let client = SampleClient::new(&addr, None, Duration::from_secs(1))?;
    let samples = client.fetch_samples()?;
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].sample_name, "Polymer batch");
    assert_eq!(samples[0].cost_of_sample.amount, "12.50");

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn update_patches_the_record_url_with_the_full_payload() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/sample-service/samples/s-1");
        assert_eq!(*request.method(), Method::Patch);

        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .expect("request body should read");
        let parsed: serde_json::Value = serde_json::from_str(&body).expect("body should be json");
        assert_eq!(parsed["sampleName"], "Renamed");
        // Cost keeps the wire name for its amount.
        assert_eq!(parsed["costOfSample"]["content"], "12.50");
        assert_eq!(parsed["account"]["accountId"], "a-1");
        // Absent optional sections are omitted, not null.
        assert!(parsed.get("opportunity").is_none());

        request
            .respond(json_response("{}"))
            .expect("response should succeed");
    });

    let sample: sampledesk_app::Sample = serde_json::from_str(SAMPLE_JSON)?;
    let mut payload = SamplePayload::from_sample(&sample);
    payload.sample_name = "Renamed".to_owned();

    let client = SampleClient::new(&addr, None, Duration::from_secs(1))?;
    client.update_sample(&SampleId::new("s-1"), &payload)?;

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn requests_carry_basic_auth_when_credentials_are_set() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let authorization = request
            .headers()
            .iter()
            .find(|header| header.field.equiv("Authorization"))
            .map(|header| header.value.as_str().to_owned());
        // "desk:secret" base64-encoded.
        assert_eq!(authorization.as_deref(), Some("Basic ZGVzazpzZWNyZXQ="));
        request
            .respond(json_response(r#"{"value":[]}"#))
            .expect("response should succeed");
    });

    let client = SampleClient::new(
        &addr,
        Some(Credentials {
            username: "desk".to_owned(),
            password: "secret".to_owned(),
        }),
        Duration::from_secs(1),
    )?;
    assert_eq!(client.check()?, 0);

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn server_error_messages_surface_to_the_caller() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let response = Response::from_string(r#"{"error":{"message":"dueDate is required"}}"#)
            .with_status_code(400);
        request.respond(response).expect("response should succeed");
    });

    let sample: sampledesk_app::Sample = serde_json::from_str(SAMPLE_JSON)?;
    let payload = SamplePayload::from_sample(&sample);

    let client = SampleClient::new(&addr, None, Duration::from_secs(1))?;
    let error = client
        .create_sample(&payload)
        .expect_err("create should surface the server error");
    assert!(error.to_string().contains("dueDate is required"));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn list_maps_each_collection_to_display_refs() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/account-service/accounts?$top=200");
        let body = r#"{"value":[
            {"id":"a-1","formattedName":"Acme Industries","displayId":"1001"},
            {"id":"a-2","formattedName":"Northwind"}
        ]}"#;
        request
            .respond(json_response(body))
            .expect("response should succeed");

        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/case-service/cases?$top=200");
        let body = r#"{"value":[{"id":"c-1","subject":"Broken valve","displayId":"77"}]}"#;
        request
            .respond(json_response(body))
            .expect("response should succeed");
    });

    let client = CrmClient::new(&addr, None, 200, Duration::from_secs(1))?;

    let accounts = client.list(EntityKind::Account)?;
    assert_eq!(accounts.len(), 2);
    assert_eq!(accounts[0].display_name, "Acme Industries");
    assert_eq!(accounts[0].display_id.as_deref(), Some("1001"));

    let cases = client.list(EntityKind::ServiceCase)?;
    assert_eq!(cases[0].display_name, "Broken valve");

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn missing_account_resolves_to_none() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/account-service/accounts/a-404");
        let response = Response::from_string("").with_status_code(404);
        request.respond(response).expect("response should succeed");
    });

    let client = CrmClient::new(&addr, None, 200, Duration::from_secs(1))?;
    let account = client.account(&AccountId::new("a-404"))?;
    assert!(account.is_none());

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn opportunity_snapshot_includes_account_and_items() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/opportunity-service/opportunities/o-1");
        let body = r#"{"value":{
            "id":"o-1",
            "name":"Spring expansion",
            "displayId":"500",
            "account":{"id":"a-1","formattedName":"Acme Industries","displayId":"1001"},
            "items":[
                {"productId":"p-1","productDescription":"Widget","productDisplayId":"W-9"},
                {"productDescription":"Unlinked line"}
            ]
        }}"#;
        request
            .respond(json_response(body))
            .expect("response should succeed");
    });

    let client = CrmClient::new(&addr, None, 200, Duration::from_secs(1))?;
    let snapshot = client
        .opportunity(&sampledesk_app::OpportunityId::new("o-1"))?
        .expect("opportunity should resolve");

    assert_eq!(snapshot.name.as_deref(), Some("Spring expansion"));
    let account = snapshot.account.expect("account should be present");
    assert_eq!(account.display_name, "Acme Industries");
    assert_eq!(snapshot.items.len(), 2);
    assert!(snapshot.items[0].product_id.is_some());
    assert!(snapshot.items[1].product_id.is_none());

    handle.join().expect("server thread should join");
    Ok(())
}
