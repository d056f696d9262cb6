use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Identity Schemas ---

/// Role
///
/// The functional category of a marketplace viewer. This is the RBAC field consulted
/// by the access gate. The wire form is snake_case (`sales_manager`), matching the
/// values stored on profiles and sent to the front-end.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Role {
    Admin,
    SalesManager,
    Brand,
    Buyer,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::SalesManager, Role::Brand, Role::Buyer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::SalesManager => "sales_manager",
            Role::Brand => "brand",
            Role::Buyer => "buyer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name one of the four marketplace roles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "admin" => Ok(Role::Admin),
            "sales_manager" => Ok(Role::SalesManager),
            "brand" => Ok(Role::Brand),
            "buyer" => Ok(Role::Buyer),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// ApprovalStatus
///
/// Whether an administrator has vetted a registered account. Only `Approved`
/// satisfies a route that requires approval (unless the role is exempt).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// Profile
///
/// The authenticated viewer's role and approval metadata. Associated 1:1 with a
/// user account and loaded once a session is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Profile {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub approval_status: ApprovalStatus,
}

impl Profile {
    pub fn is_approved(&self) -> bool {
        self.approval_status == ApprovalStatus::Approved
    }
}

/// Session
///
/// Evidence that a viewer has authenticated. Created on sign-in, destroyed on sign-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    #[ts(type = "string")]
    pub issued_at: DateTime<Utc>,
}

// --- Marketplace Schemas (mock-data backed views) ---

/// PaidService
///
/// A paid service offered on the marketplace (e.g., a promotional slot booked by brands).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PaidService {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Price in minor currency units.
    pub price_cents: i64,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

/// Booking
///
/// A buyer's reservation of a paid service on a given date. Sales managers are
/// assigned to bookings by an administrator.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Booking {
    pub id: Uuid,
    pub service_id: Uuid,
    pub buyer_id: Uuid,
    #[ts(type = "string")]
    pub scheduled_for: NaiveDate,
    pub status: BookingStatus,
    pub assigned_to: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum OrderStatus {
    Placed,
    Paid,
    Fulfilled,
    Cancelled,
}

/// Order
///
/// A buyer's order placed against a brand.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Order {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub brand_id: Uuid,
    pub total_cents: i64,
    pub status: OrderStatus,
    #[ts(type = "string")]
    pub placed_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// SignInRequest
///
/// Input payload for `POST /auth/sign-in`. `return_to` is the path the viewer was
/// redirected away from, echoed back so the client can navigate there afterward.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SignInResponse {
    pub token: String,
    pub return_to: String,
    pub profile: Profile,
}

/// UpdateApprovalRequest
///
/// Admin decision on a registered account (PUT /admin/users/{id}/approval).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateApprovalRequest {
    pub approval_status: ApprovalStatus,
}

/// Payload of the `onStatusUpdate` callback of the bookings table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

/// Payload of the `onAssign` callback of the admin bookings table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AssignBookingRequest {
    pub sales_manager_id: Uuid,
}

/// CreateBookingRequest
///
/// Payload of the calendar's `onDateSelect` callback: the buyer picked a date for a service.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateBookingRequest {
    pub service_id: Uuid,
    #[ts(type = "string")]
    pub scheduled_for: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// --- Page / Dashboard Schemas (Output) ---

/// AdminDashboardStats
///
/// Output schema for the administrative statistics dashboard (GET /admin/stats).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_users: i64,
    pub pending_approvals: i64,
    pub total_bookings: i64,
    pub open_bookings: i64,
    pub total_orders: i64,
    pub revenue_cents: i64,
}

/// DashboardView
///
/// The landing view after sign-in. The `sections` list tells the client which
/// role-specific navigation entries to render.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DashboardView {
    pub profile: Profile,
    pub sections: Vec<String>,
}

/// Rendered by `/auth` and by the loading/pending pages. The gate itself never renders
/// denial reasons; destination routes do.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PageNotice {
    pub page: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_to: Option<String>,
}
