use marketplace_portal::{
    AppConfig, AppState, GatePaths, InMemoryRepository, RepositoryState, create_router,
    models::{
        ApprovalStatus, Booking, BookingStatus, DashboardView, Order, PageNotice, Profile, Role,
        SignInResponse,
    },
    repository::{
        SEED_ADMIN_ID, SEED_BRAND_ID, SEED_BUYER_ID, SEED_PASSWORD, SEED_PENDING_BUYER_ID,
        SEED_PENDING_BRAND_ID, SEED_SALES_MANAGER_ID,
    },
};
use reqwest::{StatusCode, redirect::Policy};
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

async fn spawn_app() -> TestApp {
    spawn_app_with(AppConfig::default()).await
}

async fn spawn_app_with(config: AppConfig) -> TestApp {
    let repo = InMemoryRepository::seeded()
        .await
        .with_session_ttl(config.session_ttl_secs);
    let repo = Arc::new(repo) as RepositoryState;
    let router = create_router(AppState::new(repo, config));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    // Redirects are the subject under test; never follow them.
    let client = reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .unwrap();

    TestApp { address, client }
}

impl TestApp {
    async fn sign_in(&self, email: &str) -> SignInResponse {
        let response = self
            .client
            .post(format!("{}/auth/sign-in", self.address))
            .json(&serde_json::json!({ "email": email, "password": SEED_PASSWORD }))
            .send()
            .await
            .expect("sign-in request");
        assert_eq!(response.status(), StatusCode::OK);
        response.json().await.unwrap()
    }

    fn get(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.address, path))
            .bearer_auth(token)
    }

    fn as_user(&self, method: reqwest::Method, path: &str, user_id: Uuid) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.address, path))
            .header("x-user-id", user_id.to_string())
    }
}

fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

// --- Tests ---

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn anonymous_navigation_redirects_to_sign_in_with_return_to() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(format!("{}/buyer/orders?page=2", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth?returnTo=%2Fbuyer%2Forders%3Fpage%3D2");
    assert_eq!(response.headers()["x-navigation"], "replace");
}

#[tokio::test]
async fn sign_in_page_echoes_return_to() {
    let app = spawn_app().await;
    let notice: PageNotice = app
        .client
        .get(format!("{}/auth?returnTo=%2Fbuyer%2Forders", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(notice.page, "sign_in");
    assert_eq!(notice.return_to.as_deref(), Some("/buyer/orders"));
}

#[tokio::test]
async fn sign_in_then_return_to_requested_page() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(format!("{}/auth/sign-in", app.address))
        .json(&serde_json::json!({
            "email": "buyer@marketplace.test",
            "password": SEED_PASSWORD,
            "returnTo": "/buyer/orders"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let signed_in: SignInResponse = response.json().await.unwrap();
    assert_eq!(signed_in.return_to, "/buyer/orders");
    assert_eq!(signed_in.profile.role, Role::Buyer);

    let orders = app.get(&signed_in.return_to, &signed_in.token).send().await.unwrap();
    assert_eq!(orders.status(), StatusCode::OK);
    let orders: Vec<Order> = orders.json().await.unwrap();
    assert!(!orders.is_empty());
    assert!(orders.iter().all(|o| o.buyer_id == SEED_BUYER_ID));
}

#[tokio::test]
async fn off_site_return_to_is_replaced_with_home() {
    let app = spawn_app().await;
    let response = app
        .client
        .post(format!("{}/auth/sign-in", app.address))
        .json(&serde_json::json!({
            "email": "buyer@marketplace.test",
            "password": SEED_PASSWORD,
            "returnTo": "//evil.example/phish"
        }))
        .send()
        .await
        .unwrap();
    let signed_in: SignInResponse = response.json().await.unwrap();
    assert_eq!(signed_in.return_to, "/");
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = spawn_app().await;
    let response = app
        .client
        .post(format!("{}/auth/sign-in", app.address))
        .json(&serde_json::json!({ "email": "buyer@marketplace.test", "password": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn pending_buyer_is_sent_to_pending_approval() {
    let app = spawn_app().await;
    let signed_in = app.sign_in("newbuyer@marketplace.test").await;

    let response = app.get("/dashboard", &signed_in.token).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/pending-approval");

    // The profile page does not require approval.
    let profile = app.get("/profile", &signed_in.token).send().await.unwrap();
    assert_eq!(profile.status(), StatusCode::OK);
    let profile: Profile = profile.json().await.unwrap();
    assert_eq!(profile.approval_status, ApprovalStatus::Pending);
}

#[tokio::test]
async fn buyer_on_brand_page_is_sent_home() {
    let app = spawn_app().await;
    let signed_in = app.sign_in("buyer@marketplace.test").await;

    let response = app.get("/brand/services", &signed_in.token).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert_eq!(response.headers()["x-navigation"], "replace");
}

#[tokio::test]
async fn dashboard_sections_follow_role() {
    let app = spawn_app().await;
    let signed_in = app.sign_in("brand@marketplace.test").await;

    let view: DashboardView = app
        .get("/dashboard", &signed_in.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view.profile.user_id, SEED_BRAND_ID);
    assert_eq!(view.sections, vec!["services".to_string(), "orders".to_string()]);
}

#[tokio::test]
async fn sign_out_closes_the_session() {
    let app = spawn_app().await;
    let signed_in = app.sign_in("buyer@marketplace.test").await;
    assert_eq!(
        app.get("/dashboard", &signed_in.token).send().await.unwrap().status(),
        StatusCode::OK
    );

    let response = app
        .client
        .post(format!("{}/auth/sign-out", app.address))
        .bearer_auth(&signed_in.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.get("/dashboard", &signed_in.token).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth?returnTo=%2Fdashboard");
}

#[tokio::test]
async fn approval_takes_effect_on_next_navigation() {
    let app = spawn_app().await;

    let before = app
        .as_user(reqwest::Method::GET, "/buyer/bookings", SEED_PENDING_BUYER_ID)
        .send()
        .await
        .unwrap();
    assert_eq!(before.status(), StatusCode::SEE_OTHER);

    let approve = app
        .as_user(
            reqwest::Method::PUT,
            &format!("/admin/users/{}/approval", SEED_PENDING_BUYER_ID),
            SEED_ADMIN_ID,
        )
        .json(&serde_json::json!({ "approval_status": "approved" }))
        .send()
        .await
        .unwrap();
    assert_eq!(approve.status(), StatusCode::OK);

    let after = app
        .as_user(reqwest::Method::GET, "/buyer/bookings", SEED_PENDING_BUYER_ID)
        .send()
        .await
        .unwrap();
    assert_eq!(after.status(), StatusCode::OK);
}

#[tokio::test]
async fn sales_manager_can_update_status_but_not_assign() {
    let app = spawn_app().await;
    let bookings: Vec<Booking> = app
        .as_user(reqwest::Method::GET, "/admin/bookings", SEED_SALES_MANAGER_ID)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let booking = bookings.first().expect("seeded bookings");

    let update = app
        .as_user(
            reqwest::Method::PUT,
            &format!("/bookings/{}/status", booking.id),
            SEED_SALES_MANAGER_ID,
        )
        .json(&serde_json::json!({ "status": "completed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(update.status(), StatusCode::OK);
    let updated: Booking = update.json().await.unwrap();
    assert_eq!(updated.status, BookingStatus::Completed);

    let assign = app
        .as_user(
            reqwest::Method::PUT,
            &format!("/admin/bookings/{}/assign", booking.id),
            SEED_SALES_MANAGER_ID,
        )
        .json(&serde_json::json!({ "sales_manager_id": SEED_SALES_MANAGER_ID }))
        .send()
        .await
        .unwrap();
    assert_eq!(assign.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&assign), "/");
}

#[tokio::test]
async fn uniform_approval_policy_gates_pending_admins() {
    let mut config = AppConfig::default();
    config.approval_exempt_roles.clear();
    let app = spawn_app_with(config).await;

    // Without exemptions, an admin whose approval is revoked loses access like anyone else.
    let demote = app
        .as_user(
            reqwest::Method::PUT,
            &format!("/admin/users/{}/approval", SEED_ADMIN_ID),
            SEED_ADMIN_ID,
        )
        .json(&serde_json::json!({ "approval_status": "pending" }))
        .send()
        .await
        .unwrap();
    assert_eq!(demote.status(), StatusCode::OK);

    let response = app
        .as_user(reqwest::Method::GET, "/admin/stats", SEED_ADMIN_ID)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/pending-approval");
}

#[tokio::test]
async fn custom_gate_paths_are_served() {
    let config = AppConfig {
        gate_paths: GatePaths {
            sign_in: "/login".to_string(),
            pending: "/waiting-room".to_string(),
            home: "/start".to_string(),
        },
        ..AppConfig::default()
    };
    let app = spawn_app_with(config).await;

    // Anonymous: sent to the configured sign-in page, which exists.
    let response = app
        .client
        .get(format!("{}/dashboard", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), "/login?returnTo=%2Fdashboard");
    let notice: PageNotice = app
        .client
        .get(format!("{}{}", app.address, location(&response)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(notice.page, "sign_in");
    assert_eq!(notice.return_to.as_deref(), Some("/dashboard"));

    // Pending: the configured pending page.
    let response = app
        .as_user(reqwest::Method::GET, "/brand/services", SEED_PENDING_BRAND_ID)
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), "/waiting-room");
    let pending = app
        .client
        .get(format!("{}/waiting-room", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(pending.status(), StatusCode::OK);

    // Wrong role: the configured home page.
    let response = app
        .as_user(reqwest::Method::GET, "/brand/services", SEED_BUYER_ID)
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), "/start");
    let home = app
        .client
        .get(format!("{}/start", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(home.status(), StatusCode::OK);

    // The default pages are no longer mounted.
    let old_sign_in = app
        .client
        .get(format!("{}/auth", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(old_sign_in.status(), StatusCode::NOT_FOUND);
}
