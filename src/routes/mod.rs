use axum::{
    Router, middleware,
    routing::{delete, get, post},
};

use crate::AppState;
use crate::handlers::{admin, auth, driver, me, shipper};
use crate::middleware::auth::{auth_middleware, require_admin, require_driver, require_shipper};
use crate::middleware::rate_limit::create_public_governor;
use crate::middleware::role_rate_limit::{RateLimitedRole, create_role_governor};

pub fn create_router(state: AppState) -> Router {
    let driver_governor = create_role_governor(RateLimitedRole::Driver);
    let shipper_governor = create_role_governor(RateLimitedRole::Shipper);

    // Public routes, limited per IP
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/admin/login", post(auth::admin_login))
        .route("/logout", post(auth::logout))
        .layer(create_public_governor());

    // Any signed-in user
    let me_routes = Router::new()
        .route("/", get(me::get_me).put(me::update_me))
        .route("/notifications", get(me::list_notifications))
        .route("/notifications/read", post(me::mark_notifications_read))
        .route("/notifications/live", get(me::live_notifications))
        .route("/loads/live", get(me::live_loads))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let load_routes = Router::new()
        .route("/{id}/related", get(me::related_loads))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let shipper_routes = Router::new()
        .route("/loads", post(shipper::post_load).get(shipper::my_loads))
        .route("/loads/{id}", delete(shipper::delete_load))
        .route("/loads/{id}/cancel", post(shipper::cancel_load))
        .route("/loads/{id}/bids", get(shipper::load_bids))
        .route("/stats", get(shipper::stats))
        .route("/drivers", get(shipper::list_drivers))
        .layer(shipper_governor)
        .layer(middleware::from_fn(require_shipper))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let driver_routes = Router::new()
        .route("/loads/available", get(driver::available_loads))
        .route("/loads/available/live", get(driver::live_available_loads))
        .route("/loads", get(driver::my_loads))
        .route("/loads/{id}/accept", post(driver::accept_load))
        .route("/loads/{id}/release", post(driver::release_load))
        .route("/loads/{id}/complete", post(driver::complete_load))
        .route("/loads/{id}/bids", post(driver::submit_bid))
        .route("/stats", get(driver::stats))
        .route("/trucks", get(driver::list_trucks).post(driver::add_truck))
        .route("/trucks/{id}", delete(driver::delete_truck))
        .route(
            "/sub-drivers",
            get(driver::list_sub_drivers).post(driver::add_sub_driver),
        )
        .route("/sub-drivers/{id}", delete(driver::delete_sub_driver))
        .layer(driver_governor)
        .layer(middleware::from_fn(require_driver))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Admin routes are only covered by the global limiter
    let admin_routes = Router::new()
        .route("/stats", get(admin::stats))
        .route("/live", get(admin::live_dashboard))
        .route("/users", get(admin::list_users))
        .route("/loads", get(admin::list_loads))
        .route("/tickets", get(admin::list_tickets))
        .route("/sub-drivers", get(admin::list_sub_drivers))
        .route("/notifications", post(admin::send_notification))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/me", me_routes)
        .nest("/api/loads", load_routes)
        .nest("/api/shipper", shipper_routes)
        .nest("/api/driver", driver_routes)
        .nest("/api/admin", admin_routes)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use axum::{
        body::{Body, to_bytes},
        extract::ConnectInfo,
        http::{Method, Request, StatusCode, header},
    };
    use futures::{Stream, StreamExt};
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::config::Config;
    use crate::data::test_support::test_db;
    use crate::data::{AuthService, RegisterInput};
    use crate::entities::Role;
    use crate::realtime::ChangeHub;
    use crate::utils::jwt::create_token;

    const SECRET: &str = "test-secret";

    async fn test_state() -> AppState {
        AppState {
            db: test_db().await,
            changes: ChangeHub::new(64),
            config: Config {
                database_url: "sqlite::memory:".to_string(),
                jwt_secret: SECRET.to_string(),
                jwt_expiration_hours: 1,
                server_host: "127.0.0.1".to_string(),
                server_port: 0,
                change_channel_capacity: 64,
                admin_email: None,
                admin_password: None,
            },
        }
    }

    async fn account(state: &AppState, email: &str, role: Role) -> (Uuid, String) {
        let user = AuthService::new(&state.db, &state.changes)
            .register(RegisterInput {
                email: email.to_string(),
                password: "password1".to_string(),
                full_name: email.to_string(),
                phone: None,
                role,
            })
            .await
            .unwrap();
        let token = create_token(user.profile.id, email, role, SECRET, 1).unwrap();
        (user.profile.id, token)
    }

    fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let mut request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));
        request
    }

    async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = create_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn post_load(state: &AppState, token: &str) -> String {
        let (status, body) = send(
            state,
            request(
                Method::POST,
                "/api/shipper/loads",
                Some(token),
                Some(json!({
                    "origin": "Riyadh",
                    "destination": "Jeddah",
                    "weight": "12.5 tons",
                    "price": 3400,
                    "status": "completed"
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "available");
        assert_eq!(body["weight"], 12.5);
        body["id"].as_str().unwrap().to_string()
    }

    /// Read frames until the next `snapshot` event and return its data line.
    async fn next_snapshot<B>(body: &mut B, buffer: &mut String) -> String
    where
        B: Stream<Item = Result<axum::body::Bytes, axum::Error>> + Unpin,
    {
        loop {
            while let Some(end) = buffer.find("\n\n") {
                let frame: String = buffer.drain(..end + 2).collect();
                if frame.lines().any(|line| line == "event: snapshot") {
                    return frame
                        .lines()
                        .find_map(|line| line.strip_prefix("data: "))
                        .unwrap()
                        .to_string();
                }
            }
            let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
                .await
                .expect("no snapshot within 5s")
                .unwrap()
                .unwrap();
            buffer.push_str(std::str::from_utf8(&chunk).unwrap());
        }
    }

    #[tokio::test]
    async fn test_register_returns_token() {
        let state = test_state().await;

        let (status, body) = send(
            &state,
            request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "email": "new@example.com",
                    "password": "password1",
                    "full_name": "New Shipper",
                    "role": "shipper"
                })),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert!(body["token"].as_str().is_some());
        assert_eq!(body["user"]["role"], "shipper");
    }

    #[tokio::test]
    async fn test_admin_login_rejects_shipper() {
        let state = test_state().await;
        account(&state, "shipper@example.com", Role::Shipper).await;

        let (status, body) = send(
            &state,
            request(
                Method::POST,
                "/api/auth/admin/login",
                None,
                Some(json!({ "email": "shipper@example.com", "password": "password1" })),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Admin privileges required");
        assert!(body.get("token").is_none());
    }

    #[tokio::test]
    async fn test_invalid_token_is_unauthorized() {
        let state = test_state().await;

        let (status, _) = send(
            &state,
            request(Method::GET, "/api/me", Some("not-a-jwt"), None),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_role_gates_routes() {
        let state = test_state().await;
        let (_, driver) = account(&state, "driver@example.com", Role::Driver).await;

        let (status, _) = send(
            &state,
            request(Method::GET, "/api/shipper/stats", Some(&driver), None),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &state,
            request(Method::GET, "/api/admin/users", Some(&driver), None),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_accept_flow_notifies_owner_and_refuses_second_driver() {
        let state = test_state().await;
        let (_, shipper) = account(&state, "shipper@example.com", Role::Shipper).await;
        let (first_id, first) = account(&state, "first@example.com", Role::Driver).await;
        let (_, second) = account(&state, "second@example.com", Role::Driver).await;
        let load_id = post_load(&state, &shipper).await;

        let (status, board) = send(
            &state,
            request(Method::GET, "/api/driver/loads/available", Some(&first), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(board.as_array().unwrap().len(), 1);
        assert_eq!(board[0]["owner"]["full_name"], "shipper@example.com");

        let accept = format!("/api/driver/loads/{load_id}/accept");
        let (status, body) = send(&state, request(Method::POST, &accept, Some(&first), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "in_progress");
        assert_eq!(body["driver_id"], first_id.to_string());

        let (status, body) = send(&state, request(Method::POST, &accept, Some(&second), None)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Load is no longer available");

        let (_, inbox) = send(
            &state,
            request(Method::GET, "/api/me/notifications", Some(&shipper), None),
        )
        .await;
        assert_eq!(inbox[0]["title"], "Load accepted");

        let (status, body) = send(
            &state,
            request(Method::POST, "/api/me/notifications/read", Some(&shipper), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["updated"], 1);
    }

    #[tokio::test]
    async fn test_shipper_cannot_delete_taken_load() {
        let state = test_state().await;
        let (_, shipper) = account(&state, "shipper@example.com", Role::Shipper).await;
        let (_, driver) = account(&state, "driver@example.com", Role::Driver).await;
        let load_id = post_load(&state, &shipper).await;
        send(
            &state,
            request(
                Method::POST,
                &format!("/api/driver/loads/{load_id}/accept"),
                Some(&driver),
                None,
            ),
        )
        .await;

        let (status, _) = send(
            &state,
            request(
                Method::DELETE,
                &format!("/api/shipper/loads/{load_id}"),
                Some(&shipper),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(
            &state,
            request(
                Method::POST,
                &format!("/api/driver/loads/{load_id}/release"),
                Some(&driver),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(
            &state,
            request(
                Method::DELETE,
                &format!("/api/shipper/loads/{load_id}"),
                Some(&shipper),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_driver_does_not_see_own_load_on_board() {
        let state = test_state().await;
        let (driver_id, driver) = account(&state, "driver@example.com", Role::Driver).await;
        crate::data::LoadRepository::new(&state.db, &state.changes)
            .post_load(
                crate::data::PostLoad {
                    origin: "Abha".to_string(),
                    destination: "Tabuk".to_string(),
                    ..Default::default()
                },
                driver_id,
            )
            .await
            .unwrap();

        let (status, board) = send(
            &state,
            request(Method::GET, "/api/driver/loads/available", Some(&driver), None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(board.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fleet_crud() {
        let state = test_state().await;
        let (_, driver) = account(&state, "carrier@example.com", Role::Driver).await;

        let (status, truck) = send(
            &state,
            request(
                Method::POST,
                "/api/driver/trucks",
                Some(&driver),
                Some(json!({ "plate_number": "KSA 4821", "truck_type": "flatbed" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, trucks) = send(
            &state,
            request(Method::GET, "/api/driver/trucks", Some(&driver), None),
        )
        .await;
        assert_eq!(trucks.as_array().unwrap().len(), 1);

        let uri = format!("/api/driver/trucks/{}", truck["id"].as_str().unwrap());
        let (status, _) = send(&state, request(Method::DELETE, &uri, Some(&driver), None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&state, request(Method::DELETE, &uri, Some(&driver), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_live_board_streams_new_loads_and_unsubscribes_on_disconnect() {
        let state = test_state().await;
        let (_, shipper) = account(&state, "owner@example.com", Role::Shipper).await;
        let (_, driver) = account(&state, "carrier@example.com", Role::Driver).await;

        let response = create_router(state.clone())
            .oneshot(request(
                Method::GET,
                "/api/driver/loads/available/live",
                Some(&driver),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );

        let mut body = response.into_body().into_data_stream();
        let mut buffer = String::new();
        let first: Value = serde_json::from_str(&next_snapshot(&mut body, &mut buffer).await).unwrap();
        assert!(first.as_array().unwrap().is_empty());
        assert_eq!(state.changes.subscriber_count(), 1);

        let load_id = post_load(&state, &shipper).await;
        let mut seen = false;
        for _ in 0..5 {
            let snapshot: Value =
                serde_json::from_str(&next_snapshot(&mut body, &mut buffer).await).unwrap();
            if snapshot
                .as_array()
                .unwrap()
                .iter()
                .any(|entry| entry["id"] == load_id.as_str())
            {
                seen = true;
                break;
            }
        }
        assert!(seen);

        drop(body);
        tokio::time::timeout(Duration::from_secs(5), async {
            while state.changes.subscriber_count() != 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("subscription outlived the stream");
    }
}
