//! Integration tests for the gatepass gateway
//!
//! These tests exercise the issuance/verification flow end to end and
//! verify concurrent operation handling.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use gatepass::auth::{Clock, SigningSecret, TokenIssuer, TokenVerifier};
use gatepass::config::GatewayConfig;
use gatepass::server::{GatewayServer, JoinOptions, RoomRegistry, TokenRoomGuard};
use gatepass::session::{InMemorySessions, Session, SessionProvider};
use http_body_util::BodyExt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

const TEST_SECRET: &[u8] = b"integration-test-secret";

struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    fn at(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

fn secret() -> SigningSecret {
    SigningSecret::new(TEST_SECRET)
}

fn test_server(sessions: Arc<InMemorySessions>) -> GatewayServer {
    let config = GatewayConfig::new("127.0.0.1:0".parse().unwrap(), secret());
    GatewayServer::new(config, sessions)
}

#[tokio::test]
async fn test_short_lived_admin_token_expires() {
    // Issue a 1-second token for an admin and replay it after 2 simulated
    // seconds; no sleeping involved.
    let clock = Arc::new(ManualClock::at(1_000));
    let issuer = TokenIssuer::with_clock(secret(), clock.clone());
    let verifier = TokenVerifier::with_clock(secret(), clock.clone());

    let session = Session::new("u1").with_role("admin");
    let token = issuer.issue_with_lifetime(&session, 1).unwrap();

    let claims = verifier.verify(&token).unwrap();
    assert_eq!(claims.sub, "u1");
    assert_eq!(claims.role, "admin");

    clock.advance(2);
    assert_eq!(
        verifier.verify(&token),
        Err(gatepass::auth::AuthError::CredentialExpired)
    );
}

#[tokio::test]
async fn test_distinct_users_never_share_a_subject() {
    let issuer = TokenIssuer::new(secret());
    let verifier = TokenVerifier::new(secret());

    let token_a = issuer.issue(&Session::new("alice")).unwrap();
    let token_b = issuer.issue(&Session::new("bob")).unwrap();
    assert_ne!(token_a, token_b);

    let claims_a = verifier.verify(&token_a).unwrap();
    let claims_b = verifier.verify(&token_b).unwrap();
    assert_eq!(claims_a.sub, "alice");
    assert_eq!(claims_b.sub, "bob");
    assert_ne!(claims_a.sub, claims_b.sub);
}

#[tokio::test]
async fn test_concurrent_verification_does_not_cross_contaminate() {
    let issuer = TokenIssuer::new(secret());

    let tokens: Vec<(String, String)> = (0..100)
        .map(|i| {
            let user = format!("user-{}", i);
            let token = issuer.issue(&Session::new(user.clone())).unwrap();
            (user, token)
        })
        .collect();

    let mut handles = vec![];
    for (user, token) in tokens {
        handles.push(tokio::spawn(async move {
            let verifier = TokenVerifier::new(SigningSecret::new(TEST_SECRET));
            let claims = verifier.verify(&token).unwrap();
            assert_eq!(claims.sub, user);
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn test_issuance_flow_end_to_end() {
    let sessions = Arc::new(InMemorySessions::new());
    let sid = sessions.insert(
        Session::new("u9")
            .with_email("u9@example.com")
            .with_display_name("User Nine"),
    );
    let app = test_server(sessions).router();

    // Mint a token for the seeded session
    let request = Request::builder()
        .method("POST")
        .uri("/api/token")
        .header("x-session-id", sid)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let token = parsed["token"].as_str().unwrap().to_string();
    assert_eq!(parsed["expires_in"].as_i64(), Some(900));

    // Present it as a bearer credential
    let request = Request::builder()
        .uri("/api/me")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let me: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(me["subject"].as_str(), Some("u9"));
    assert_eq!(me["role"].as_str(), Some("user"));
    assert_eq!(me["email"].as_str(), Some("u9@example.com"));
    assert_eq!(me["name"].as_str(), Some("User Nine"));
}

#[tokio::test]
async fn test_role_gate_across_the_full_router() {
    let app = test_server(Arc::new(InMemorySessions::new())).router();
    let issuer = TokenIssuer::new(secret());

    let user_token = issuer.issue(&Session::new("u1")).unwrap();
    let admin_token = issuer
        .issue(&Session::new("root").with_role("admin"))
        .unwrap();

    let cases = [
        ("/api/admin/overview", &user_token, StatusCode::FORBIDDEN),
        ("/api/admin/overview", &admin_token, StatusCode::OK),
        ("/admin/dashboard", &user_token, StatusCode::FORBIDDEN),
        ("/admin/dashboard", &admin_token, StatusCode::OK),
    ];

    for (uri, token, expected) in cases {
        let request = Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), expected, "{}", uri);
    }
}

#[tokio::test]
async fn test_session_absence_blocks_issuance() {
    let sessions = Arc::new(InMemorySessions::new());
    let sid = sessions.insert(Session::new("u1"));
    sessions.remove(&sid);

    let app = test_server(sessions).router();
    let request = Request::builder()
        .method("POST")
        .uri("/api/token")
        .header("x-session-id", sid)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_concurrent_room_joins() {
    let verifier = TokenVerifier::new(secret());
    let rooms = Arc::new(RoomRegistry::new(Arc::new(TokenRoomGuard::new(verifier))));
    let issuer = TokenIssuer::new(secret());

    let mut handles = vec![];
    for i in 0..100 {
        let rooms = rooms.clone();
        let token = issuer
            .issue(&Session::new(format!("player-{}", i)))
            .unwrap();
        handles.push(tokio::spawn(async move {
            let options = JoinOptions { token: Some(token) };
            let context = rooms.join("arena", &format!("m{}", i), &options).unwrap();
            assert_eq!(context.subject(), format!("player-{}", i));
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    let arena = rooms.get("arena").unwrap();
    assert_eq!(arena.member_count(), 100);

    // Everyone leaves; the room disappears
    for i in 0..100 {
        rooms.leave("arena", &format!("m{}", i));
    }
    assert!(rooms.get("arena").is_none());
}

#[tokio::test]
async fn test_room_join_with_expired_token_denied() {
    let clock = Arc::new(ManualClock::at(1_000));
    let issuer = TokenIssuer::with_clock(secret(), clock.clone());
    let verifier = TokenVerifier::with_clock(secret(), clock.clone());
    let rooms = RoomRegistry::new(Arc::new(TokenRoomGuard::new(verifier)));

    let token = issuer
        .issue_with_lifetime(&Session::new("u1"), 5)
        .unwrap();
    clock.advance(10);

    let options = JoinOptions { token: Some(token) };
    assert!(rooms.join("arena", "m1", &options).is_err());
    assert!(rooms.get("arena").is_none());
}

#[tokio::test]
async fn test_session_provider_concurrent_lookups() {
    let sessions = Arc::new(InMemorySessions::new());
    let ids: Vec<(String, String)> = (0..50)
        .map(|i| {
            let user = format!("u{}", i);
            let id = sessions.insert(Session::new(user.clone()));
            (id, user)
        })
        .collect();

    let mut handles = vec![];
    for (id, user) in ids {
        let sessions = sessions.clone();
        handles.push(tokio::spawn(async move {
            let session = sessions.current(&id).await.unwrap().unwrap();
            assert_eq!(session.user_id, user);
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
}
