//! Driver endpoints under `/drivers`.
//!
//! Ride lifecycle on the driver side: accept a pending request, start it
//! with the rider's OTP, end it, or cancel it before it starts.

use super::gateway::Gateway;
use super::transport::HttpRequest;
use super::types::{Driver, Page, PageRequest, RatingSubmission, Ride, RideRequest, RideStart, Rider};
use crate::error::ApiError;

pub const AVAILABLE_RIDES_ENDPOINT: &str = "/drivers/availableRides";
pub const MY_RIDES_ENDPOINT: &str = "/drivers/getMyRides";
pub const MY_PROFILE_ENDPOINT: &str = "/drivers/getMyProfile";
pub const RATE_RIDER_ENDPOINT: &str = "/drivers/rateRider";

/// Per-ride action paths: `/drivers/{action}/{rideId}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RideAction {
    Accept,
    Start,
    End,
    Cancel,
}

impl RideAction {
    fn endpoint(self, id: i64) -> String {
        let action = match self {
            Self::Accept => "acceptRide",
            Self::Start => "startRide",
            Self::End => "endRide",
            Self::Cancel => "cancelRide",
        };
        format!("/drivers/{action}/{id}")
    }
}

pub struct DriverApi<'a> {
    gateway: &'a Gateway,
}

impl<'a> DriverApi<'a> {
    #[must_use]
    pub fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    /// Pending ride requests a driver may accept.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be fetched.
    pub async fn available_rides(&self) -> Result<Vec<RideRequest>, ApiError> {
        self.gateway.send_json(&HttpRequest::get(AVAILABLE_RIDES_ENDPOINT)).await
    }

    /// Accept the ride request `ride_request_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is no longer pending.
    pub async fn accept_ride(&self, ride_request_id: i64) -> Result<Ride, ApiError> {
        self.post(RideAction::Accept.endpoint(ride_request_id)).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] if the OTP does not match.
    pub async fn start_ride(&self, ride_id: i64, otp: &str) -> Result<Ride, ApiError> {
        let body = RideStart { otp: otp.trim().to_owned() };
        let request = HttpRequest::post(RideAction::Start.endpoint(ride_id)).with_json(&body)?;
        self.gateway.send_json(&request).await
    }

    /// # Errors
    ///
    /// Returns an error if the ride is not ongoing.
    pub async fn end_ride(&self, ride_id: i64) -> Result<Ride, ApiError> {
        self.post(RideAction::End.endpoint(ride_id)).await
    }

    /// # Errors
    ///
    /// Returns an error if the ride cannot be cancelled.
    pub async fn cancel_ride(&self, ride_id: i64) -> Result<Ride, ApiError> {
        self.post(RideAction::Cancel.endpoint(ride_id)).await
    }

    /// Rate the rider of a finished ride.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] without contacting the backend when
    /// `rating` is outside `1..=5`.
    pub async fn rate_rider(&self, ride_id: i64, rating: u8, feedback: Option<String>) -> Result<Rider, ApiError> {
        let submission = RatingSubmission::new(ride_id, rating, feedback)?;
        let request = HttpRequest::post(RATE_RIDER_ENDPOINT).with_json(&submission)?;
        self.gateway.send_json(&request).await
    }

    /// # Errors
    ///
    /// Returns an error if the listing cannot be fetched.
    pub async fn my_rides(&self, page: PageRequest) -> Result<Page<Ride>, ApiError> {
        let mut request = HttpRequest::get(MY_RIDES_ENDPOINT);
        request.query = page.query();
        self.gateway.send_json(&request).await
    }

    /// # Errors
    ///
    /// Returns an error if the profile cannot be fetched.
    pub async fn my_profile(&self) -> Result<Driver, ApiError> {
        self.gateway.send_json(&HttpRequest::get(MY_PROFILE_ENDPOINT)).await
    }

    async fn post(&self, path: String) -> Result<Ride, ApiError> {
        self.gateway.send_json(&HttpRequest::post(path)).await
    }
}

#[cfg(test)]
#[path = "driver_test.rs"]
mod tests;
