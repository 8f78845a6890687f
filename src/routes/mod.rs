use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::handlers::{admin, customer, floor_plan, notifications, restaurants, service_hours};
use crate::middleware::auth::{auth_middleware, require_admin};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Customer-facing booking flow and provider callbacks
    let public_routes = Router::new()
        .route("/restaurants", get(restaurants::list_restaurants))
        .route("/restaurants/{id}/availability", get(restaurants::availability))
        .route("/reservations", post(customer::create_reservation))
        .route("/reservations/code/{code}", get(customer::lookup_by_code))
        .route(
            "/notifications/webhook",
            get(notifications::verify_webhook).post(notifications::receive_webhook),
        )
        .route("/notifications", put(notifications::receive_webhook));

    // Admin routes (requires auth + admin role)
    let admin_routes = Router::new()
        // Reservation workflow
        .route("/reservations", get(admin::list_reservations))
        .route("/reservations/pending", get(admin::pending_reservations))
        .route("/reservations/{id}/action", post(admin::reservation_action))
        .route("/reservations/{id}/table", put(admin::assign_table))
        // Restaurants
        .route("/restaurants", post(restaurants::create_restaurant))
        .route("/restaurants/{id}", put(restaurants::update_restaurant))
        // Service hours
        .route(
            "/restaurants/{id}/services",
            get(service_hours::list_services).post(service_hours::create_service),
        )
        .route(
            "/services/{id}",
            put(service_hours::update_service).delete(service_hours::delete_service),
        )
        // Floor plan
        .route(
            "/restaurants/{id}/tables",
            get(floor_plan::list_tables).post(floor_plan::create_table),
        )
        .route(
            "/tables/{id}",
            put(floor_plan::update_table).delete(floor_plan::delete_table),
        )
        // Notifications
        .route("/notifications", post(notifications::send_notification))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api", public_routes)
        .nest("/api/admin", admin_routes)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use std::sync::Arc;

    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::config::{Config, WhatsAppConfig};
    use crate::entities::reservation;
    use crate::notifications::Notifier;
    use crate::utils::jwt::{create_token, StaffRole};

    const SECRET: &str = "test-secret";

    fn test_config() -> Config {
        Config {
            database_url: "postgres://unused".to_string(),
            jwt_secret: SECRET.to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            timezone: chrono_tz::Europe::Madrid,
            session_hold_minutes: 15,
            whatsapp: WhatsAppConfig {
                api_url: "http://localhost".to_string(),
                phone_number_id: None,
                access_token: None,
                verify_token: "verificame".to_string(),
            },
        }
    }

    fn app(db: DatabaseConnection) -> Router {
        create_router(AppState {
            db: Arc::new(db),
            config: test_config(),
            notifier: Notifier::disabled(),
        })
    }

    fn empty_db() -> DatabaseConnection {
        MockDatabase::new(DatabaseBackend::Postgres).into_connection()
    }

    fn bearer(role: StaffRole) -> String {
        let token = create_token("staff-1", "sala@example.com", role, SECRET, 1).unwrap();
        format!("Bearer {}", token)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn action_request(id: Uuid, body: &str, auth: Option<String>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("/api/admin/reservations/{}/action", id))
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_admin_route_requires_token() {
        let response = app(empty_db())
            .oneshot(action_request(Uuid::new_v4(), r#"{"action":"approve"}"#, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_admin_route_rejects_staff_role() {
        let response = app(empty_db())
            .oneshot(action_request(
                Uuid::new_v4(),
                r#"{"action":"approve"}"#,
                Some(bearer(StaffRole::Staff)),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_unknown_action_is_bad_request() {
        let response = app(empty_db())
            .oneshot(action_request(
                Uuid::new_v4(),
                r#"{"action":"archive"}"#,
                Some(bearer(StaffRole::Admin)),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("Acción no válida"));
    }

    #[tokio::test]
    async fn test_approve_missing_reservation_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<reservation::Model>::new()])
            .into_connection();

        let response = app(db)
            .oneshot(action_request(
                Uuid::new_v4(),
                r#"{"action":"approve"}"#,
                Some(bearer(StaffRole::Admin)),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "Reserva no encontrada");
    }

    #[tokio::test]
    async fn test_pending_queue_rejects_non_numeric_window() {
        let request = Request::builder()
            .uri("/api/admin/reservations/pending?daysAhead=mucho")
            .header(header::AUTHORIZATION, bearer(StaffRole::Admin))
            .body(Body::empty())
            .unwrap();

        let response = app(empty_db()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_rejects_unknown_status() {
        let request = Request::builder()
            .uri("/api/admin/reservations?status=ARCHIVADO")
            .header(header::AUTHORIZATION, bearer(StaffRole::Admin))
            .body(Body::empty())
            .unwrap();

        let response = app(empty_db()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_lookup_with_empty_code_is_bad_request() {
        let request = Request::builder()
            .uri("/api/reservations/code/res-")
            .body(Body::empty())
            .unwrap();

        let response = app(empty_db()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_webhook_verification_echoes_challenge() {
        let request = Request::builder()
            .uri("/api/notifications/webhook?hub.mode=subscribe&hub.verify_token=verificame&hub.challenge=42")
            .body(Body::empty())
            .unwrap();

        let response = app(empty_db()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"42");
    }

    #[tokio::test]
    async fn test_webhook_verification_rejects_wrong_token() {
        let request = Request::builder()
            .uri("/api/notifications/webhook?hub.mode=subscribe&hub.verify_token=nope&hub.challenge=42")
            .body(Body::empty())
            .unwrap();

        let response = app(empty_db()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_raw_webhook_payload_is_acknowledged() {
        let request = Request::builder()
            .method("PUT")
            .uri("/api/notifications")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"event":"call.ended","id":"abc"}"#))
            .unwrap();

        let response = app(empty_db()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_send_notification_unknown_action() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/admin/notifications")
            .header(header::AUTHORIZATION, bearer(StaffRole::Admin))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(format!(
                r#"{{"action":"send-sms","reservationId":"{}"}}"#,
                Uuid::new_v4()
            )))
            .unwrap();

        let response = app(empty_db()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_action_body_uses_error_envelope() {
        let response = app(empty_db())
            .oneshot(action_request(
                Uuid::new_v4(),
                r#"{"reason":"x"}"#,
                Some(bearer(StaffRole::Admin)),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("Datos no válidos"));
    }

    #[tokio::test]
    async fn test_bad_reservation_id_uses_error_envelope() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/admin/reservations/not-a-uuid/action")
            .header(header::AUTHORIZATION, bearer(StaffRole::Admin))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"action":"approve"}"#))
            .unwrap();

        let response = app(empty_db()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_non_json_webhook_is_acknowledged() {
        let request = Request::builder()
            .method("PUT")
            .uri("/api/notifications")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("call ended"))
            .unwrap();

        let response = app(empty_db()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let request = Request::builder()
            .method("POST")
            .uri("/api/notifications/webhook")
            .body(Body::from(r#"{"object":"whatsapp_business_account","entry":[]}"#))
            .unwrap();

        let response = app(empty_db()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_reject_confirmed_reservation_through_router() {
        use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};

        use crate::entities::reservation::ReservationStatus;
        use crate::entities::{customer, reservation_history, restaurant};

        let stamp = Utc.with_ymd_and_hms(2025, 5, 20, 10, 0, 0).unwrap().fixed_offset();
        let confirmed = reservation::Model {
            id: Uuid::new_v4(),
            code: "RES-AB12C".to_string(),
            restaurant_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            table_id: None,
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            time: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
            party_size: 4,
            status: ReservationStatus::Confirmed,
            session_expires_at: None,
            special_requests: None,
            confirmed_at: Some(stamp),
            cancelled_at: None,
            created_at: stamp,
            updated_at: stamp,
        };
        let mut cancelled = confirmed.clone();
        cancelled.status = ReservationStatus::Cancelled;
        cancelled.cancelled_at = Some(stamp);
        cancelled.special_requests = Some("Rechazado: cierre".to_string());
        let history = reservation_history::Model {
            id: Uuid::new_v4(),
            reservation_id: confirmed.id,
            previous_status: Some(ReservationStatus::Confirmed),
            new_status: ReservationStatus::Cancelled,
            note: Some("cierre".to_string()),
            changed_at: stamp,
        };
        let restaurant = restaurant::Model {
            id: confirmed.restaurant_id,
            name: "Casa Lola".to_string(),
            phone: "+34910000000".to_string(),
            email: "hola@casalola.es".to_string(),
            address: None,
            timezone: "Europe/Madrid".to_string(),
            active: true,
            created_at: stamp,
        };
        let customer = customer::Model {
            id: confirmed.customer_id,
            name: "Lucía".to_string(),
            phone: "+34600111222".to_string(),
            email: None,
            created_at: stamp,
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![confirmed.clone()]])
            .append_query_results([vec![cancelled]])
            .append_query_results([vec![history]])
            .append_query_results([vec![restaurant]])
            .append_query_results([vec![customer]])
            .into_connection();

        let response = app(db)
            .oneshot(action_request(
                confirmed.id,
                r#"{"action":"reject","reason":"cierre"}"#,
                Some(bearer(StaffRole::Admin)),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "CANCELADO");
        assert_eq!(body["specialRequests"], "Rechazado: cierre");
    }

    #[tokio::test]
    async fn test_table_name_race_answers_conflict() {
        use chrono::{TimeZone, Utc};

        use crate::entities::{restaurant, restaurant_table};

        let restaurant = restaurant::Model {
            id: Uuid::new_v4(),
            name: "Casa Lola".to_string(),
            phone: "+34910000000".to_string(),
            email: "hola@casalola.es".to_string(),
            address: None,
            timezone: "Europe/Madrid".to_string(),
            active: true,
            created_at: Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap().fixed_offset(),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![restaurant.clone()]])
            .append_query_results([Vec::<restaurant_table::Model>::new()])
            .append_query_errors([sea_orm::DbErr::Query(sea_orm::RuntimeErr::Internal(
                "duplicate key value violates unique constraint \"idx_restaurant_table_name\"".into(),
            ))])
            .into_connection();

        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/admin/restaurants/{}/tables", restaurant.id))
            .header(header::AUTHORIZATION, bearer(StaffRole::Admin))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"T1","capacity":4,"posX":10,"posY":20}"#))
            .unwrap();

        let response = app(db).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(body_json(response).await["error"].is_string());
    }
}
