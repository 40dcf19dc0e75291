//! Partner wire formats and failure classification against mock HTTP servers.

#![allow(clippy::unwrap_used)]

use boxoffice_core::{
    CheckoutRequest, EventId, PartnerErrorKind, PartnerGateway, PartnerId, PurchaserInfo, SpotId,
    TicketKind,
};
use boxoffice_partners::{HttpPartnerGateway, Partner1Gateway, Partner2Gateway, PartnerEndpoint};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(event_id: EventId, spots: &[&str], kind: TicketKind) -> CheckoutRequest {
    CheckoutRequest {
        event_id,
        spot_ids: spots.iter().map(|spot| SpotId::new(*spot)).collect(),
        ticket_kind: kind,
        purchaser: PurchaserInfo::new("ana@example.com"),
    }
}

fn endpoint(server: &MockServer, prefix: &str) -> PartnerEndpoint {
    PartnerEndpoint {
        base_url: format!("{}{prefix}", server.uri()),
        timeout: Duration::from_millis(500),
    }
}

fn partner1(server: &MockServer) -> Partner1Gateway {
    Partner1Gateway::new(PartnerId::new(1), &endpoint(server, "/api1")).unwrap()
}

fn partner2(server: &MockServer) -> Partner2Gateway {
    Partner2Gateway::new(PartnerId::new(2), &endpoint(server, "/api2")).unwrap()
}

#[tokio::test]
async fn partner1_speaks_english() {
    let server = MockServer::start().await;
    let event_id = EventId::new();
    Mock::given(method("POST"))
        .and(path(format!("/api1/events/{event_id}/reserve")))
        .and(body_json(json!({
            "spots": ["A1", "A2"],
            "ticket_kind": "half",
            "email": "ana@example.com"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "t-1", "email": "ana@example.com", "spot": "A1", "ticket_kind": "half", "status": "reserved", "event_id": event_id.to_string()},
            {"id": "t-2", "email": "ana@example.com", "spot": "A2", "ticket_kind": "half", "status": "reserved", "event_id": event_id.to_string()}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let confirmation = partner1(&server)
        .checkout(&request(event_id, &["A1", "A2"], TicketKind::Half))
        .await
        .unwrap();

    assert_eq!(confirmation.partner, PartnerId::new(1));
    assert_eq!(confirmation.reference, "t-1,t-2");
    assert_eq!(confirmation.tickets[1].spot_id, SpotId::new("A2"));
}

#[tokio::test]
async fn partner2_speaks_portuguese() {
    let server = MockServer::start().await;
    let event_id = EventId::new();
    Mock::given(method("POST"))
        .and(path(format!("/api2/eventos/{event_id}/reservar")))
        .and(body_json(json!({
            "lugares": ["B3"],
            "tipo_ingresso": "inteira",
            "email": "ana@example.com"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            {"id": 77, "email": "ana@example.com", "lugar": "B3", "tipo_ingresso": "inteira", "estado": "reservado", "evento_id": event_id.to_string()}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let confirmation = partner2(&server)
        .checkout(&request(event_id, &["B3"], TicketKind::Full))
        .await
        .unwrap();

    assert_eq!(confirmation.tickets[0].external_id, "77");
    assert_eq!(confirmation.tickets[0].spot_id, SpotId::new("B3"));
}

#[tokio::test]
async fn payment_reference_stays_out_of_the_wire_body() {
    let server = MockServer::start().await;
    let event_id = EventId::new();
    Mock::given(method("POST"))
        .and(path(format!("/api1/events/{event_id}/reserve")))
        .and(body_json(json!({
            "spots": ["A1"],
            "ticket_kind": "full",
            "email": "ana@example.com"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "t-9", "email": "ana@example.com", "spot": "A1", "ticket_kind": "full", "status": "reserved", "event_id": event_id.to_string()}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let mut checkout = request(event_id, &["A1"], TicketKind::Full);
    checkout.purchaser.payment_reference = Some("pay-123".to_string());

    let confirmation = partner1(&server).checkout(&checkout).await.unwrap();
    assert_eq!(confirmation.reference, "t-9");
}

async fn failure_kind(status: u16, body: &str) -> PartnerErrorKind {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(&server)
        .await;

    partner1(&server)
        .checkout(&request(EventId::new(), &["A1"], TicketKind::Full))
        .await
        .unwrap_err()
        .kind
}

#[tokio::test]
async fn http_statuses_are_classified() {
    assert_eq!(failure_kind(409, "spot taken").await, PartnerErrorKind::Rejected);
    assert_eq!(failure_kind(422, "bad email").await, PartnerErrorKind::Rejected);
    assert_eq!(failure_kind(503, "").await, PartnerErrorKind::Unavailable);
    assert_eq!(failure_kind(429, "").await, PartnerErrorKind::Unavailable);
    assert_eq!(failure_kind(401, "").await, PartnerErrorKind::ProtocolError);
    assert_eq!(failure_kind(200, "not json").await, PartnerErrorKind::ProtocolError);
}

#[tokio::test]
async fn confirmation_for_other_spots_is_a_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "email": "ana@example.com", "lugar": "C9", "tipo_ingresso": "meia", "estado": "reservado", "evento_id": "x"}
        ])))
        .mount(&server)
        .await;

    let error = partner2(&server)
        .checkout(&request(EventId::new(), &["A1"], TicketKind::Half))
        .await
        .unwrap_err();

    assert_eq!(error.kind, PartnerErrorKind::ProtocolError);
}

#[tokio::test]
async fn slow_partner_times_out_as_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let error = partner1(&server)
        .checkout(&request(EventId::new(), &["A1"], TicketKind::Full))
        .await
        .unwrap_err();

    assert_eq!(error.kind, PartnerErrorKind::Unavailable);
}

#[tokio::test]
async fn unreachable_partner_is_unavailable() {
    let gateway = Partner1Gateway::new(
        PartnerId::new(1),
        &PartnerEndpoint {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_millis(500),
        },
    )
    .unwrap();

    let error = gateway
        .checkout(&request(EventId::new(), &["A1"], TicketKind::Full))
        .await
        .unwrap_err();

    assert_eq!(error.kind, PartnerErrorKind::Unavailable);
}

#[tokio::test]
async fn enum_gateway_dispatches_to_its_partner() {
    let server = MockServer::start().await;
    let event_id = EventId::new();
    Mock::given(method("POST"))
        .and(path(format!("/api2/eventos/{event_id}/reservar")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "x1", "email": "ana@example.com", "lugar": "A1", "tipo_ingresso": "inteira", "estado": "reservado", "evento_id": event_id.to_string()}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = HttpPartnerGateway::Partner2(partner2(&server));
    let confirmation = gateway
        .checkout(&request(event_id, &["A1"], TicketKind::Full))
        .await
        .unwrap();

    assert_eq!(gateway.partner_id(), PartnerId::new(2));
    assert_eq!(confirmation.partner, PartnerId::new(2));
}
