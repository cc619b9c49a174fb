//! Rider endpoints under `/riders`. All calls go through the gateway.

use super::gateway::Gateway;
use super::transport::HttpRequest;
use super::types::{Driver, Page, PageRequest, RatingSubmission, Ride, RideBooking, RideRequest, Rider};
use crate::error::ApiError;

pub const REQUEST_RIDE_ENDPOINT: &str = "/riders/requestRide";
pub const MY_RIDES_ENDPOINT: &str = "/riders/getMyRides";
pub const MY_PROFILE_ENDPOINT: &str = "/riders/getMyProfile";
pub const RATE_DRIVER_ENDPOINT: &str = "/riders/rateDriver";

fn cancel_ride_endpoint(ride_id: i64) -> String {
    format!("/riders/cancelRide/{ride_id}")
}

pub struct RiderApi<'a> {
    gateway: &'a Gateway,
}

impl<'a> RiderApi<'a> {
    #[must_use]
    pub fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    /// Book a ride; the backend answers with the pending request.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the booking.
    pub async fn request_ride(&self, booking: &RideBooking) -> Result<RideRequest, ApiError> {
        let request = HttpRequest::post(REQUEST_RIDE_ENDPOINT).with_json(booking)?;
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
    pub async fn my_profile(&self) -> Result<Rider, ApiError> {
        self.gateway.send_json(&HttpRequest::get(MY_PROFILE_ENDPOINT)).await
    }

    /// # Errors
    ///
    /// Returns an error if the ride cannot be cancelled (e.g. it already started).
    pub async fn cancel_ride(&self, ride_id: i64) -> Result<Ride, ApiError> {
        self.gateway.send_json(&HttpRequest::post(cancel_ride_endpoint(ride_id))).await
    }

    /// Rate the driver of a finished ride.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] without contacting the backend when
    /// `rating` is outside `1..=5`, or the backend's error otherwise.
    pub async fn rate_driver(&self, ride_id: i64, rating: u8, feedback: Option<String>) -> Result<Driver, ApiError> {
        let submission = RatingSubmission::new(ride_id, rating, feedback)?;
        let request = HttpRequest::post(RATE_DRIVER_ENDPOINT).with_json(&submission)?;
        self.gateway.send_json(&request).await
    }
}

#[cfg(test)]
#[path = "rider_test.rs"]
mod tests;
