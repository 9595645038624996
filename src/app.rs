use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth, config::AppConfig, guests, progress, responses, state::AppState};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(guests::router())
        .merge(responses::router())
        .merge(progress::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{jwt::JwtKeys, services};
    use crate::config::JwtConfig;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const ADMIN: &str = "admin";
    const PASSWORD: &str = "correct horse";

    async fn setup() -> (Router, AppState) {
        let state = AppState::fake().await;
        {
            let mut conn = state.db.acquire().await.unwrap();
            services::create_user(&mut conn, ADMIN, PASSWORD).await.unwrap();
        }
        (build_app(state.clone()), state)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    async fn login(app: &Router) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": ADMIN, "password": PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "bearer");
        body["access_token"].as_str().unwrap().to_owned()
    }

    async fn add_guest(app: &Router, token: &str, name: &str, group: &str) -> Value {
        let (status, body) = send(
            app,
            Method::POST,
            "/guests",
            Some(token),
            Some(json!({ "name": name, "group": group })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body
    }

    #[tokio::test]
    async fn health_is_public() {
        let (app, _) = setup().await;
        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("ok".into()));
    }

    #[tokio::test]
    async fn login_then_me() {
        let (app, _) = setup().await;
        let token = login(&app).await;
        let (status, body) = send(&app, Method::GET, "/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], ADMIN);
        assert!(body.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let (app, _) = setup().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": ADMIN, "password": "nope nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid credentials");
    }

    #[tokio::test]
    async fn protected_write_without_token_changes_nothing() {
        let (app, state) = setup().await;
        let (status, _) = send(
            &app,
            Method::POST,
            "/guests",
            None,
            Some(json!({ "name": "Alice", "group": "Family" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM guests")
            .fetch_one(&state.db)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn token_from_another_key_is_rejected() {
        let (app, _) = setup().await;
        let forged = JwtKeys::new(&JwtConfig {
            secret: "someone-else".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 5,
        })
        .sign(ADMIN)
        .unwrap();

        let (status, _) = send(&app, Method::GET, "/guests", Some(&forged), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn public_rsvp_links_guest_by_name() {
        let (app, _) = setup().await;
        let token = login(&app).await;
        let guest = add_guest(&app, &token, "Alice", "Family").await;
        add_guest(&app, &token, "Bob", "Friends").await;

        let (status, response) = send(
            &app,
            Method::POST,
            "/responses",
            None,
            Some(json!({ "name": "Alice", "dietary_need": "vegan", "attending": true })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let uri = format!("/guests/{}", guest["id"].as_str().unwrap());
        let (status, view) = send(&app, Method::GET, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["response_id"], response["id"]);
        assert_eq!(view["responded"], true);
        assert_eq!(view["dietary_need"], "vegan");

        let (_, responded) =
            send(&app, Method::GET, "/guests/responded", Some(&token), None).await;
        let names: Vec<&str> = responded
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Alice"]);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let (app, _) = setup().await;
        let token = login(&app).await;
        let uri = format!("/responses/{}", uuid::Uuid::new_v4());
        let (status, body) = send(&app, Method::GET, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not found");
    }

    #[tokio::test]
    async fn patch_touches_only_given_fields() {
        let (app, _) = setup().await;
        let token = login(&app).await;
        let guest = add_guest(&app, &token, "Carol", "Work").await;
        let uri = format!("/guests/{}", guest["id"].as_str().unwrap());

        let (status, body) = send(
            &app,
            Method::PATCH,
            &uri,
            Some(&token),
            Some(json!({ "group": "Friends" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Carol");
        assert_eq!(body["group"], "Friends");
    }

    #[tokio::test]
    async fn blank_name_is_unprocessable() {
        let (app, _) = setup().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/responses",
            None,
            Some(json!({ "name": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn bulk_delete_needs_the_passkey() {
        let (app, _) = setup().await;
        let token = login(&app).await;
        add_guest(&app, &token, "Alice", "Family").await;
        add_guest(&app, &token, "Bob", "Friends").await;

        let (status, _) = send(
            &app,
            Method::DELETE,
            "/guests?passkey=wrong",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (_, all) = send(&app, Method::GET, "/guests/all", Some(&token), None).await;
        assert_eq!(all.as_array().unwrap().len(), 2);

        let (status, body) = send(
            &app,
            Method::DELETE,
            "/guests?passkey=test-passkey",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted"], 2);
        let (_, all) = send(&app, Method::GET, "/guests/all", Some(&token), None).await;
        assert!(all.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn soft_deleted_guest_stays_in_admin_listing() {
        let (app, _) = setup().await;
        let token = login(&app).await;
        let guest = add_guest(&app, &token, "Dave", "Work").await;
        let uri = format!("/guests/{}", guest["id"].as_str().unwrap());

        let (status, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::GET, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, all) = send(&app, Method::GET, "/guests/all", Some(&token), None).await;
        assert_eq!(all[0]["active"], false);
    }

    #[tokio::test]
    async fn progress_log_is_public_except_count() {
        let (app, _) = setup().await;
        for (ts, headline) in [(10, "opened"), (30, "opened"), (5, "submitted")] {
            let (status, _) = send(
                &app,
                Method::POST,
                "/progress",
                None,
                Some(json!({ "timestamp": ts, "headline": headline })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, stats) = send(&app, Method::GET, "/progress/stats", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats[0]["headline"], "opened");
        assert_eq!(stats[0]["amount"], 2);
        assert_eq!(stats[0]["average"], 20.0);

        let (status, _) = send(&app, Method::GET, "/progress/count", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn batch_import_is_all_or_nothing() {
        let (app, _) = setup().await;
        let token = login(&app).await;
        let (status, _) = send(
            &app,
            Method::POST,
            "/guests/batch",
            Some(&token),
            Some(json!([
                { "name": "Erin", "group": "Family" },
                { "name": "", "group": "Family" }
            ])),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (_, all) = send(&app, Method::GET, "/guests/all", Some(&token), None).await;
        assert!(all.as_array().unwrap().is_empty());
    }
}
