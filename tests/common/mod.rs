use async_trait::async_trait;
use marketplace_portal::{
    models::{
        AdminDashboardStats, ApprovalStatus, Booking, BookingStatus, CreateBookingRequest, Order,
        PaidService, Profile, Session,
    },
    repository::{InMemoryRepository, Repository, RepositoryError},
};
use uuid::Uuid;

// --- Mock Repository: profile store outage ---

/// Delegates everything to the seeded mock data except profile lookups, which fail.
pub struct ProfileOutageRepo {
    pub inner: InMemoryRepository,
}

#[async_trait]
impl Repository for ProfileOutageRepo {
    async fn get_profile(&self, _user_id: Uuid) -> Result<Option<Profile>, RepositoryError> {
        Err(RepositoryError::Unavailable)
    }
    async fn verify_credentials(&self, email: &str, password: &str) -> Option<Profile> {
        self.inner.verify_credentials(email, password).await
    }
    async fn create_session(&self, user_id: Uuid) -> Session {
        self.inner.create_session(user_id).await
    }
    async fn get_session(&self, session_id: Uuid) -> Option<Session> {
        self.inner.get_session(session_id).await
    }
    async fn delete_session(&self, session_id: Uuid) -> bool {
        self.inner.delete_session(session_id).await
    }
    async fn list_profiles(&self) -> Vec<Profile> {
        vec![]
    }
    async fn set_approval_status(
        &self,
        _user_id: Uuid,
        _status: ApprovalStatus,
    ) -> Result<Profile, RepositoryError> {
        Err(RepositoryError::Unavailable)
    }
    async fn get_stats(&self) -> AdminDashboardStats {
        AdminDashboardStats::default()
    }
    async fn list_services(&self) -> Vec<PaidService> {
        vec![]
    }
    async fn list_bookings(&self) -> Vec<Booking> {
        vec![]
    }
    async fn bookings_for_buyer(&self, _buyer_id: Uuid) -> Vec<Booking> {
        vec![]
    }
    async fn bookings_assigned_to(&self, _sales_manager_id: Uuid) -> Vec<Booking> {
        vec![]
    }
    async fn create_booking(
        &self,
        _buyer_id: Uuid,
        _req: CreateBookingRequest,
    ) -> Result<Booking, RepositoryError> {
        Err(RepositoryError::Unavailable)
    }
    async fn update_booking_status(
        &self,
        _booking_id: Uuid,
        _status: BookingStatus,
    ) -> Result<Booking, RepositoryError> {
        Err(RepositoryError::Unavailable)
    }
    async fn assign_booking(
        &self,
        _booking_id: Uuid,
        _sales_manager_id: Uuid,
    ) -> Result<Booking, RepositoryError> {
        Err(RepositoryError::Unavailable)
    }
    async fn orders_for_buyer(&self, _buyer_id: Uuid) -> Vec<Order> {
        vec![]
    }
    async fn orders_for_brand(&self, _brand_id: Uuid) -> Vec<Order> {
        vec![]
    }
}
