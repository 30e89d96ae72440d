use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use booking_server::config::Config;
use booking_server::handlers::{ROLE_HEADER, USER_ID_HEADER};
use booking_server::models::Event;
use booking_server::routes::create_routes;
use booking_server::state::AppState;
use booking_server::storage::StorageBackend;

struct TestApp {
    router: Router,
    owner: Uuid,
    event_id: Uuid,
}

async fn test_app() -> TestApp {
    let store = StorageBackend::in_memory();
    let owner = Uuid::new_v4();
    let event = Event {
        id: Uuid::new_v4(),
        owner_id: Some(owner),
        title: "Volley Open".to_string(),
        location: "Court 3".to_string(),
        starts_at: Utc::now(),
    };
    store.upsert_event(&event).await.unwrap();

    let config = Config::from_lookup(|_| None);
    TestApp {
        router: create_routes(AppState::new(store), &config),
        owner,
        event_id: event.id,
    }
}

impl TestApp {
    async fn call(
        &self,
        method: Method,
        uri: &str,
        user: Option<(Uuid, &str)>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some((id, role)) = user {
            builder = builder
                .header(USER_ID_HEADER, id.to_string())
                .header(ROLE_HEADER, role);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_regular(&self, stock: i64) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/tickets",
                Some((self.owner, "user")),
                Some(json!({
                    "event_id": self.event_id,
                    "ticket_type": "regular",
                    "unit_price": "100.00",
                    "available_stock": stock,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health() {
    let app = test_app().await;
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["storage"], "memory");
}

#[tokio::test]
async fn test_create_ticket_permissions_and_duplicates() {
    let app = test_app().await;
    let payload = json!({
        "event_id": app.event_id,
        "ticket_type": "vip",
        "unit_price": "250.00",
        "available_stock": 5,
    });

    let (status, body) = app
        .call(Method::POST, "/tickets", None, Some(payload.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_ERROR");

    let (status, body) = app
        .call(
            Method::POST,
            "/tickets",
            Some((Uuid::new_v4(), "user")),
            Some(payload.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "PERMISSION_DENIED");

    let (status, body) = app
        .call(
            Method::POST,
            "/tickets",
            Some((Uuid::new_v4(), "admin")),
            Some(payload.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["ticket_type_label"], "VIP");
    assert_eq!(body["data"]["unit_price"], "250.00");

    let (status, body) = app
        .call(Method::POST, "/tickets", Some((app.owner, "user")), Some(payload))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DUPLICATE_TICKET_TYPE");
}

#[tokio::test]
async fn test_malformed_body_is_invalid_input() {
    let app = test_app().await;
    let (status, body) = app
        .call(
            Method::POST,
            "/tickets",
            Some((app.owner, "user")),
            Some(json!({ "event_id": app.event_id, "ticket_type": "gold" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_booking_flow_over_http() {
    let app = test_app().await;
    app.create_regular(10).await;
    let buyer = Some((Uuid::new_v4(), "user"));
    let uri = format!("/events/{}/bookings", app.event_id);

    let (status, body) = app
        .call(
            Method::POST,
            &uri,
            buyer,
            Some(json!({ "ticket_type": "regular", "quantity": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["created"], true);
    assert_eq!(body["data"]["cumulative_quantity"], 2);
    assert_eq!(body["data"]["total_price"], "200.00");
    assert_eq!(body["message"], "Tickets booked");

    let (status, body) = app
        .call(
            Method::POST,
            &uri,
            buyer,
            Some(json!({ "ticket_type": "regular", "quantity": 3 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["created"], false);
    assert_eq!(body["data"]["cumulative_quantity"], 5);
    assert_eq!(body["data"]["total_price"], "500.00");
    assert_eq!(body["message"], "Booking updated; you now hold 5");

    let (status, body) = app
        .call(
            Method::POST,
            &uri,
            Some((Uuid::new_v4(), "user")),
            Some(json!({ "ticket_type": "regular", "quantity": 6 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_STOCK");
    assert_eq!(body["error"]["details"]["requested"], 6);
    assert_eq!(body["error"]["details"]["available"], 5);

    let (status, body) = app.call(Method::GET, "/bookings/me", buyer, None).await;
    assert_eq!(status, StatusCode::OK);
    let bookings = body["data"].as_array().unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0]["event_title"], "Volley Open");
    assert_eq!(bookings[0]["cumulative_quantity"], 5);
}

#[tokio::test]
async fn test_booking_input_errors() {
    let app = test_app().await;
    app.create_regular(10).await;
    let buyer = Some((Uuid::new_v4(), "user"));
    let uri = format!("/events/{}/bookings", app.event_id);

    let (status, body) = app
        .call(
            Method::POST,
            &uri,
            buyer,
            Some(json!({ "ticket_type": "regular", "quantity": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_QUANTITY");
    assert_eq!(body["error"]["details"]["reason"], "non_positive");

    let (status, body) = app
        .call(
            Method::POST,
            &uri,
            buyer,
            Some(json!({ "ticket_type": "regular", "quantity": 501 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["reason"], "exceeds_maximum");

    let (status, body) = app
        .call(Method::POST, &uri, buyer, Some(json!({ "quantity": 1 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_INPUT");

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/events/{}/bookings", Uuid::new_v4()),
            buyer,
            Some(json!({ "ticket_type": "regular", "quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "EVENT_NOT_FOUND");

    let (status, body) = app
        .call(
            Method::POST,
            &uri,
            buyer,
            Some(json!({ "ticket_type": "vip", "quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "TICKET_NOT_FOUND");
}

#[tokio::test]
async fn test_out_of_range_and_fractional_quantities() {
    let app = test_app().await;
    app.create_regular(10).await;
    let buyer = Some((Uuid::new_v4(), "user"));
    let uri = format!("/events/{}/bookings", app.event_id);

    let (status, body) = app
        .call(
            Method::POST,
            &uri,
            buyer,
            Some(json!({ "ticket_type": "regular", "quantity": 10_000_000_000_000_000_000u64 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_QUANTITY");
    assert_eq!(body["error"]["details"]["reason"], "exceeds_maximum");

    let (status, body) = app
        .call(
            Method::POST,
            &uri,
            buyer,
            Some(json!({ "ticket_type": "regular", "quantity": 2.5 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_QUANTITY");
    assert_eq!(body["error"]["details"]["reason"], "not_an_integer");

    // Nothing was allocated by either request
    let (_, body) = app
        .call(Method::GET, &format!("/tickets?event_id={}", app.event_id), buyer, None)
        .await;
    assert_eq!(body["data"][0]["available_stock"], 10);
}

#[tokio::test]
async fn test_update_list_and_delete_ticket() {
    let app = test_app().await;
    let ticket_id = app.create_regular(10).await;
    let ticket_uri = format!("/tickets/{ticket_id}");

    let (status, body) = app
        .call(
            Method::PATCH,
            &ticket_uri,
            Some((app.owner, "user")),
            Some(json!({ "available_stock": 25, "unit_price": "80.5" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["available_stock"], 25);
    assert_eq!(body["data"]["unit_price"], "80.50");

    let (_, body) = app
        .call(
            Method::GET,
            &format!("/tickets?event_id={}", app.event_id),
            Some((app.owner, "user")),
            None,
        )
        .await;
    assert_eq!(body["data"][0]["can_edit"], true);

    let (_, body) = app.call(Method::GET, "/tickets", None, None).await;
    assert_eq!(body["data"][0]["can_edit"], false);

    let (status, _) = app
        .call(Method::DELETE, &ticket_uri, Some((Uuid::new_v4(), "user")), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(Method::DELETE, &ticket_uri, Some((app.owner, "user")), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = app
        .call(Method::DELETE, &ticket_uri, Some((app.owner, "user")), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "TICKET_NOT_FOUND");
}

#[tokio::test]
async fn test_bookings_require_identity() {
    let app = test_app().await;
    let (status, body) = app.call(Method::GET, "/bookings/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}
