use crate::models::{
    AdminDashboardStats, ApprovalStatus, Booking, BookingStatus, CreateBookingRequest, Order,
    OrderStatus, PaidService, Profile, Role, Session,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("user {0} is not a sales manager")]
    NotSalesManager(Uuid),
    #[error("service {0} is not bookable")]
    ServiceInactive(Uuid),
    #[error("profile store unavailable")]
    Unavailable,
}

/// Repository Trait
///
/// Abstract contract for the portal's data access. Handlers and the identity
/// resolver only see `Arc<dyn Repository>`, so tests can swap in fakes.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Identity ---
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, RepositoryError>;
    // Returns the profile when the credentials match a known account.
    async fn verify_credentials(&self, email: &str, password: &str) -> Option<Profile>;
    async fn create_session(&self, user_id: Uuid) -> Session;
    async fn get_session(&self, session_id: Uuid) -> Option<Session>;
    // Returns true if a session was removed.
    async fn delete_session(&self, session_id: Uuid) -> bool;

    // --- Admin: user management ---
    async fn list_profiles(&self) -> Vec<Profile>;
    async fn set_approval_status(
        &self,
        user_id: Uuid,
        status: ApprovalStatus,
    ) -> Result<Profile, RepositoryError>;
    async fn get_stats(&self) -> AdminDashboardStats;

    // --- Services, bookings, orders ---
    async fn list_services(&self) -> Vec<PaidService>;
    async fn list_bookings(&self) -> Vec<Booking>;
    async fn bookings_for_buyer(&self, buyer_id: Uuid) -> Vec<Booking>;
    async fn bookings_assigned_to(&self, sales_manager_id: Uuid) -> Vec<Booking>;
    async fn create_booking(
        &self,
        buyer_id: Uuid,
        req: CreateBookingRequest,
    ) -> Result<Booking, RepositoryError>;
    async fn update_booking_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> Result<Booking, RepositoryError>;
    async fn assign_booking(
        &self,
        booking_id: Uuid,
        sales_manager_id: Uuid,
    ) -> Result<Booking, RepositoryError>;
    async fn orders_for_buyer(&self, buyer_id: Uuid) -> Vec<Order>;
    async fn orders_for_brand(&self, brand_id: Uuid) -> Vec<Order>;
}

/// RepositoryState
///
/// The shared handle to the data layer carried in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

struct Account {
    profile: Profile,
    password: String,
}

#[derive(Default)]
struct Store {
    accounts: HashMap<Uuid, Account>,
    sessions: HashMap<Uuid, Session>,
    services: Vec<PaidService>,
    bookings: Vec<Booking>,
    orders: Vec<Order>,
}

/// InMemoryRepository
///
/// Mock-data backed implementation of `Repository`. The marketplace has no real
/// backend; every view reads from these arrays.
///
/// With a session TTL, sessions older than the TTL are treated as closed and dropped.
/// Without one they live until sign-out.
#[derive(Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
    session_ttl: Option<Duration>,
}

impl Store {
    /// Drops every session whose lifetime has elapsed.
    fn prune_sessions(&mut self, ttl: Option<Duration>, now: DateTime<Utc>) {
        self.sessions.retain(|_, session| !is_expired(session, ttl, now));
    }
}

fn is_expired(session: &Session, ttl: Option<Duration>, now: DateTime<Utc>) -> bool {
    match ttl {
        // An end past chrono's range never arrives.
        Some(ttl) => session
            .issued_at
            .checked_add_signed(ttl)
            .is_some_and(|end| end <= now),
        None => false,
    }
}

// Well-known ids of the seeded accounts, handy for local testing with `x-user-id`.
pub const SEED_ADMIN_ID: Uuid = Uuid::from_u128(0x1001);
pub const SEED_SALES_MANAGER_ID: Uuid = Uuid::from_u128(0x1002);
pub const SEED_BRAND_ID: Uuid = Uuid::from_u128(0x1003);
pub const SEED_PENDING_BRAND_ID: Uuid = Uuid::from_u128(0x1004);
pub const SEED_BUYER_ID: Uuid = Uuid::from_u128(0x1005);
pub const SEED_PENDING_BUYER_ID: Uuid = Uuid::from_u128(0x1006);
pub const SEED_REJECTED_BUYER_ID: Uuid = Uuid::from_u128(0x1007);
pub const SEED_PASSWORD: &str = "marketplace";

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sessions expire `secs` seconds after they were issued, matching the token TTL.
    pub fn with_session_ttl(mut self, secs: u64) -> Self {
        let ttl = i64::try_from(secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        self.session_ttl = Some(ttl);
        self
    }

    /// Number of sessions currently held, expired or not.
    pub async fn session_count(&self) -> usize {
        self.store.read().await.sessions.len()
    }

    /// insert_profile
    ///
    /// Adds an account with the given password. Replaces an existing account with the same id.
    pub async fn insert_profile(&self, profile: Profile, password: &str) {
        let mut store = self.store.write().await;
        store.accounts.insert(
            profile.user_id,
            Account {
                profile,
                password: password.to_string(),
            },
        );
    }

    /// seeded
    ///
    /// The mock marketplace: one account per role/approval combination plus a handful of
    /// services, bookings and orders.
    pub async fn seeded() -> Self {
        let repo = Self::new();

        let accounts = [
            (SEED_ADMIN_ID, "admin@marketplace.test", "Ada Admin", Role::Admin, ApprovalStatus::Approved),
            (SEED_SALES_MANAGER_ID, "sales@marketplace.test", "Sam Sales", Role::SalesManager, ApprovalStatus::Approved),
            (SEED_BRAND_ID, "brand@marketplace.test", "Bree Brand", Role::Brand, ApprovalStatus::Approved),
            (SEED_PENDING_BRAND_ID, "newbrand@marketplace.test", "Nell Newbrand", Role::Brand, ApprovalStatus::Pending),
            (SEED_BUYER_ID, "buyer@marketplace.test", "Bo Buyer", Role::Buyer, ApprovalStatus::Approved),
            (SEED_PENDING_BUYER_ID, "newbuyer@marketplace.test", "Pat Pending", Role::Buyer, ApprovalStatus::Pending),
            (SEED_REJECTED_BUYER_ID, "rejected@marketplace.test", "Rory Rejected", Role::Buyer, ApprovalStatus::Rejected),
        ];
        for (user_id, email, name, role, approval_status) in accounts {
            repo.insert_profile(
                Profile {
                    user_id,
                    email: email.to_string(),
                    display_name: name.to_string(),
                    role,
                    approval_status,
                },
                SEED_PASSWORD,
            )
            .await;
        }

        let services = vec![
            PaidService {
                id: Uuid::from_u128(0x2001),
                name: "Showroom slot".to_string(),
                description: "A one-day slot in the shared showroom".to_string(),
                price_cents: 25_000,
                active: true,
            },
            PaidService {
                id: Uuid::from_u128(0x2002),
                name: "Featured listing".to_string(),
                description: "Homepage placement for a week".to_string(),
                price_cents: 9_900,
                active: true,
            },
            PaidService {
                id: Uuid::from_u128(0x2003),
                name: "Trade fair booth".to_string(),
                description: "Retired offer".to_string(),
                price_cents: 120_000,
                active: false,
            },
        ];

        let today = Utc::now().date_naive();
        let bookings = vec![
            Booking {
                id: Uuid::from_u128(0x3001),
                service_id: services[0].id,
                buyer_id: SEED_BUYER_ID,
                scheduled_for: today + Duration::days(7),
                status: BookingStatus::Confirmed,
                assigned_to: Some(SEED_SALES_MANAGER_ID),
                notes: None,
            },
            Booking {
                id: Uuid::from_u128(0x3002),
                service_id: services[1].id,
                buyer_id: SEED_BUYER_ID,
                scheduled_for: today + Duration::days(14),
                status: BookingStatus::Pending,
                assigned_to: None,
                notes: Some("Prefers mornings".to_string()),
            },
        ];

        let now = Utc::now();
        let orders = vec![
            Order {
                id: Uuid::from_u128(0x4001),
                buyer_id: SEED_BUYER_ID,
                brand_id: SEED_BRAND_ID,
                total_cents: 48_000,
                status: OrderStatus::Paid,
                placed_at: now - Duration::days(3),
            },
            Order {
                id: Uuid::from_u128(0x4002),
                buyer_id: SEED_BUYER_ID,
                brand_id: SEED_BRAND_ID,
                total_cents: 12_500,
                status: OrderStatus::Placed,
                placed_at: now - Duration::hours(5),
            },
        ];

        {
            let mut store = repo.store.write().await;
            store.services = services;
            store.bookings = bookings;
            store.orders = orders;
        }

        repo
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, RepositoryError> {
        let store = self.store.read().await;
        Ok(store.accounts.get(&user_id).map(|a| a.profile.clone()))
    }

    async fn verify_credentials(&self, email: &str, password: &str) -> Option<Profile> {
        let store = self.store.read().await;
        store
            .accounts
            .values()
            .find(|a| a.profile.email.eq_ignore_ascii_case(email) && a.password == password)
            .map(|a| a.profile.clone())
    }

    async fn create_session(&self, user_id: Uuid) -> Session {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            user_id,
            issued_at: now,
        };
        let mut store = self.store.write().await;
        store.prune_sessions(self.session_ttl, now);
        store.sessions.insert(session.id, session.clone());
        session
    }

    async fn get_session(&self, session_id: Uuid) -> Option<Session> {
        let mut store = self.store.write().await;
        let session = store.sessions.get(&session_id)?;
        if is_expired(session, self.session_ttl, Utc::now()) {
            tracing::debug!(%session_id, "session expired");
            store.sessions.remove(&session_id);
            return None;
        }
        Some(session.clone())
    }

    async fn delete_session(&self, session_id: Uuid) -> bool {
        self.store.write().await.sessions.remove(&session_id).is_some()
    }

    async fn list_profiles(&self) -> Vec<Profile> {
        let store = self.store.read().await;
        let mut profiles: Vec<Profile> = store.accounts.values().map(|a| a.profile.clone()).collect();
        profiles.sort_by(|a, b| a.email.cmp(&b.email));
        profiles
    }

    async fn set_approval_status(
        &self,
        user_id: Uuid,
        status: ApprovalStatus,
    ) -> Result<Profile, RepositoryError> {
        let mut store = self.store.write().await;
        let account = store
            .accounts
            .get_mut(&user_id)
            .ok_or(RepositoryError::NotFound("user"))?;
        account.profile.approval_status = status;
        Ok(account.profile.clone())
    }

    async fn get_stats(&self) -> AdminDashboardStats {
        let store = self.store.read().await;
        let count = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
        AdminDashboardStats {
            total_users: count(store.accounts.len()),
            pending_approvals: count(
                store
                    .accounts
                    .values()
                    .filter(|a| a.profile.approval_status == ApprovalStatus::Pending)
                    .count(),
            ),
            total_bookings: count(store.bookings.len()),
            open_bookings: count(
                store
                    .bookings
                    .iter()
                    .filter(|b| matches!(b.status, BookingStatus::Pending | BookingStatus::Confirmed))
                    .count(),
            ),
            total_orders: count(store.orders.len()),
            revenue_cents: store
                .orders
                .iter()
                .filter(|o| matches!(o.status, OrderStatus::Paid | OrderStatus::Fulfilled))
                .map(|o| o.total_cents)
                .sum(),
        }
    }

    async fn list_services(&self) -> Vec<PaidService> {
        self.store.read().await.services.clone()
    }

    async fn list_bookings(&self) -> Vec<Booking> {
        let mut bookings = self.store.read().await.bookings.clone();
        bookings.sort_by_key(|b| b.scheduled_for);
        bookings
    }

    async fn bookings_for_buyer(&self, buyer_id: Uuid) -> Vec<Booking> {
        self.list_bookings()
            .await
            .into_iter()
            .filter(|b| b.buyer_id == buyer_id)
            .collect()
    }

    async fn bookings_assigned_to(&self, sales_manager_id: Uuid) -> Vec<Booking> {
        self.list_bookings()
            .await
            .into_iter()
            .filter(|b| b.assigned_to == Some(sales_manager_id))
            .collect()
    }

    async fn create_booking(
        &self,
        buyer_id: Uuid,
        req: CreateBookingRequest,
    ) -> Result<Booking, RepositoryError> {
        let mut store = self.store.write().await;
        let service = store
            .services
            .iter()
            .find(|s| s.id == req.service_id)
            .ok_or(RepositoryError::NotFound("service"))?;
        if !service.active {
            return Err(RepositoryError::ServiceInactive(service.id));
        }

        let booking = Booking {
            id: Uuid::new_v4(),
            service_id: req.service_id,
            buyer_id,
            scheduled_for: req.scheduled_for,
            status: BookingStatus::Pending,
            assigned_to: None,
            notes: req.notes,
        };
        store.bookings.push(booking.clone());
        Ok(booking)
    }

    async fn update_booking_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> Result<Booking, RepositoryError> {
        let mut store = self.store.write().await;
        let booking = store
            .bookings
            .iter_mut()
            .find(|b| b.id == booking_id)
            .ok_or(RepositoryError::NotFound("booking"))?;
        booking.status = status;
        Ok(booking.clone())
    }

    async fn assign_booking(
        &self,
        booking_id: Uuid,
        sales_manager_id: Uuid,
    ) -> Result<Booking, RepositoryError> {
        let mut store = self.store.write().await;
        let is_sales_manager = store
            .accounts
            .get(&sales_manager_id)
            .is_some_and(|a| a.profile.role == Role::SalesManager);
        if !is_sales_manager {
            return Err(RepositoryError::NotSalesManager(sales_manager_id));
        }

        let booking = store
            .bookings
            .iter_mut()
            .find(|b| b.id == booking_id)
            .ok_or(RepositoryError::NotFound("booking"))?;
        booking.assigned_to = Some(sales_manager_id);
        Ok(booking.clone())
    }

    async fn orders_for_buyer(&self, buyer_id: Uuid) -> Vec<Order> {
        let store = self.store.read().await;
        store.orders.iter().filter(|o| o.buyer_id == buyer_id).cloned().collect()
    }

    async fn orders_for_brand(&self, brand_id: Uuid) -> Vec<Order> {
        let store = self.store.read().await;
        store.orders.iter().filter(|o| o.brand_id == brand_id).cloned().collect()
    }
}

