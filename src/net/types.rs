//! Wire types for the RideNow backend.
//!
//! DESIGN
//! ======
//! Field names mirror the backend's camelCase JSON. Optional fields use
//! `#[serde(default)]` so older backend builds that omit them still decode.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

// =============================================================================
// USERS
// =============================================================================

/// Role tag attached to a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Rider,
    Driver,
    Admin,
    /// Any tag this client does not know about.
    #[serde(other)]
    Unknown,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rider => "RIDER",
            Self::Driver => "DRIVER",
            Self::Admin => "ADMIN",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RIDER" => Ok(Self::Rider),
            "DRIVER" => Ok(Self::Driver),
            "ADMIN" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Profile snapshot of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub roles: BTreeSet<Role>,
}

impl UserProfile {
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

// =============================================================================
// AUTH PAYLOADS
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response. `refreshToken` and `user` are absent on some backend builds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub password: String,
    pub roles: BTreeSet<Role>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Refresh response. A rotated refresh token is returned by some backends.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardDriverRequest {
    pub vehicle_id: String,
}

// =============================================================================
// RIDES
// =============================================================================

/// GeoJSON-style point: `coordinates` is `[longitude, latitude]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub coordinates: [f64; 2],
    #[serde(rename = "type")]
    pub kind: String,
}

impl Point {
    #[must_use]
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self { coordinates: [longitude, latitude], kind: "Point".to_owned() }
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Wallet,
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CASH" => Ok(Self::Cash),
            "WALLET" => Ok(Self::Wallet),
            other => Err(format!("unknown payment method: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideRequestStatus {
    Pending,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideStatus {
    Confirmed,
    Ongoing,
    Ended,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rider {
    pub user: UserProfile,
    #[serde(default)]
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    #[serde(default)]
    pub id: Option<i64>,
    pub user: UserProfile,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub vehicle_id: Option<String>,
    #[serde(default)]
    pub available: bool,
}

/// A rider's request, before a driver accepts it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideRequest {
    pub id: i64,
    pub pickup_location: Point,
    pub drop_off_location: Point,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub fare: f64,
    pub ride_request_status: RideRequestStatus,
    #[serde(default)]
    pub rider: Option<Rider>,
    #[serde(default)]
    pub driver: Option<Driver>,
    #[serde(default)]
    pub requested_time: Option<String>,
    #[serde(default)]
    pub otp: Option<String>,
}

/// A ride after a driver accepted the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    pub id: i64,
    pub pickup_location: Point,
    pub drop_off_location: Point,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub rider: Option<Rider>,
    #[serde(default)]
    pub driver: Option<Driver>,
    pub payment_method: PaymentMethod,
    pub ride_status: RideStatus,
    #[serde(default)]
    pub otp: Option<String>,
    #[serde(default)]
    pub fare: f64,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub ended_at: Option<String>,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_pages: u32,
    pub total_elements: u64,
    pub number: u32,
    pub size: u32,
}

impl<T> Page<T> {
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.number.saturating_add(1) >= self.total_pages
    }
}

/// Page coordinates for listing endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 0, size: 10 }
    }
}

impl PageRequest {
    pub(crate) fn query(self) -> Vec<(String, String)> {
        vec![
            ("pageOffset".to_owned(), self.page.to_string()),
            ("pageSize".to_owned(), self.size.to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RideBooking {
    pub pickup_location: Point,
    pub drop_off_location: Point,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Serialize)]
pub struct RideStart {
    pub otp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSubmission {
    pub ride_id: i64,
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl RatingSubmission {
    pub const MIN_RATING: u8 = 1;
    pub const MAX_RATING: u8 = 5;

    /// Build a rating, rejecting scores outside `1..=5` before they reach the backend.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for an out-of-range score.
    pub fn new(ride_id: i64, rating: u8, feedback: Option<String>) -> Result<Self, ApiError> {
        if !(Self::MIN_RATING..=Self::MAX_RATING).contains(&rating) {
            return Err(ApiError::invalid_input(format!(
                "rating must be between {} and {}, got {rating}",
                Self::MIN_RATING,
                Self::MAX_RATING
            )));
        }
        let feedback = feedback.map(|f| f.trim().to_owned()).filter(|f| !f.is_empty());
        Ok(Self { ride_id, rating, feedback })
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
