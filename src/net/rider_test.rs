use std::sync::Arc;

use serde_json::json;

use super::*;
use crate::net::transport::test_helpers::{MockTransport, reply};
use crate::net::types::{PaymentMethod, Point, RideRequestStatus, RideStatus};
use crate::state::auth::SessionHandle;
use crate::state::store::MemoryStore;

fn gateway(transport: &Arc<MockTransport>) -> Gateway {
    let session = SessionHandle::new(Arc::new(MemoryStore::new()));
    session.hydrate();
    session.establish("T1".into(), Some("R1".into()), None);
    Gateway::new(transport.clone(), session)
}

fn ride_json(id: i64, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "pickupLocation": { "coordinates": [77.1, 28.6], "type": "Point" },
        "dropOffLocation": { "coordinates": [77.3, 28.5], "type": "Point" },
        "paymentMethod": "CASH",
        "rideStatus": status,
        "fare": 120.0
    })
}

#[tokio::test]
async fn request_ride_posts_booking() {
    let transport = Arc::new(MockTransport::new(|_| {
        reply(
            200,
            &json!({
                "id": 9,
                "pickupLocation": { "coordinates": [77.1, 28.6], "type": "Point" },
                "dropOffLocation": { "coordinates": [77.3, 28.5], "type": "Point" },
                "paymentMethod": "WALLET",
                "rideRequestStatus": "PENDING"
            }),
        )
    }));
    let gateway = gateway(&transport);
    let booking = RideBooking {
        pickup_location: Point::new(77.1, 28.6),
        drop_off_location: Point::new(77.3, 28.5),
        payment_method: PaymentMethod::Wallet,
    };

    let request = RiderApi::new(&gateway).request_ride(&booking).await.unwrap();

    assert_eq!(request.id, 9);
    assert_eq!(request.ride_request_status, RideRequestStatus::Pending);
    let sent = &transport.sent_to(REQUEST_RIDE_ENDPOINT)[0];
    assert_eq!(sent.bearer(), Some("T1"));
    assert_eq!(sent.body.as_ref().unwrap()["paymentMethod"], "WALLET");
}

#[tokio::test]
async fn my_rides_sends_page_coordinates() {
    let transport = Arc::new(MockTransport::new(|_| {
        reply(
            200,
            &json!({
                "content": [ride_json(1, "ENDED")],
                "totalPages": 3,
                "totalElements": 21,
                "number": 2,
                "size": 10
            }),
        )
    }));
    let gateway = gateway(&transport);

    let page = RiderApi::new(&gateway).my_rides(PageRequest { page: 2, size: 10 }).await.unwrap();

    assert_eq!(page.content[0].ride_status, RideStatus::Ended);
    assert!(page.is_last());
    let sent = &transport.sent_to(MY_RIDES_ENDPOINT)[0];
    assert!(sent.query.contains(&("pageOffset".to_owned(), "2".to_owned())));
}

#[tokio::test]
async fn cancel_ride_targets_ride_id() {
    let transport = Arc::new(MockTransport::new(|_| reply(200, &ride_json(4, "CANCELLED"))));
    let gateway = gateway(&transport);

    let ride = RiderApi::new(&gateway).cancel_ride(4).await.unwrap();

    assert_eq!(ride.ride_status, RideStatus::Cancelled);
    assert_eq!(transport.sent()[0].path, "/riders/cancelRide/4");
}

#[tokio::test]
async fn out_of_range_rating_never_reaches_backend() {
    let transport = Arc::new(MockTransport::new(|_| reply(200, &json!({}))));
    let gateway = gateway(&transport);

    let err = RiderApi::new(&gateway).rate_driver(4, 0, None).await.unwrap_err();

    assert!(matches!(err, ApiError::Validation { .. }));
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn rate_driver_posts_submission() {
    let transport = Arc::new(MockTransport::new(|_| {
        reply(200, &json!({ "user": { "id": 2, "name": "Ravi", "email": "r@b.com", "roles": ["DRIVER"] }, "rating": 4.5 }))
    }));
    let gateway = gateway(&transport);

    let driver = RiderApi::new(&gateway).rate_driver(4, 5, Some("great".into())).await.unwrap();

    assert_eq!(driver.user.name, "Ravi");
    let sent = &transport.sent_to(RATE_DRIVER_ENDPOINT)[0];
    assert_eq!(sent.body, Some(json!({ "rideId": 4, "rating": 5, "feedback": "great" })));
}
