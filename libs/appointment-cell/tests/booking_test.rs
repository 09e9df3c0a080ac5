mod common;

use assert_matches::assert_matches;
use futures::future::join_all;

use appointment_cell::{AppointmentError, AppointmentStatus, AppointmentType, PaymentStatus};
use shared_utils::actor::Actor;

use common::{at, day, engine, engine_at, time};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_book_a_slot_once() {
    let engine = engine().await;
    let slot = at(day(2024, 6, 4), 10, 0);

    let handles = (0..12).map(|_| {
        let booking = engine.booking.clone();
        let request = engine.request(slot);
        tokio::spawn(async move { booking.create_appointment(request).await })
    });

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let refusals = results
        .iter()
        .filter(|r| matches!(r, Err(AppointmentError::SlotUnavailable(_))))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(refusals, 11);
}

#[tokio::test]
async fn test_sunday_morning_end_to_end() {
    let engine = engine().await;
    // 2024-06-02 was a Sunday
    let sunday = day(2024, 6, 2);
    engine.add_block(7, time(9, 0), time(10, 0), 30).await;

    let slots = engine.availability.resolve(engine.doctor_id, sunday, None).await.unwrap();
    assert_eq!(slots.len(), 2);
    assert!(slots.iter().all(|s| s.is_available && !s.is_booked));

    let first = engine.booking.create_appointment(engine.request(at(sunday, 9, 0))).await.unwrap();
    assert_eq!(first.status, AppointmentStatus::Pending);

    let slots = engine.availability.resolve(engine.doctor_id, sunday, None).await.unwrap();
    assert!(slots[0].is_booked);
    assert!(!slots[1].is_booked);

    assert_matches!(
        engine.booking.create_appointment(engine.request(at(sunday, 9, 0))).await,
        Err(AppointmentError::SlotUnavailable(_))
    );
    assert_matches!(
        engine.booking.create_appointment(engine.request(at(sunday, 10, 0))).await,
        Err(AppointmentError::SlotUnavailable(_))
    );
    assert!(engine.booking.create_appointment(engine.request(at(sunday, 9, 30))).await.is_ok());

    engine
        .booking
        .cancel_appointment(first.id, Some("Patient travelling".to_string()), &Actor::staff("desk"))
        .await
        .unwrap();

    let slots = engine.availability.resolve(engine.doctor_id, sunday, None).await.unwrap();
    assert!(!slots[0].is_booked);
    assert!(engine.booking.create_appointment(engine.request(at(sunday, 9, 0))).await.is_ok());
}

#[tokio::test]
async fn test_off_grid_time_is_not_bookable() {
    let engine = engine().await;
    let result = engine
        .booking
        .create_appointment(engine.request(at(day(2024, 6, 4), 10, 15)))
        .await;
    assert_matches!(result, Err(AppointmentError::SlotUnavailable(_)));
}

#[tokio::test]
async fn test_elapsed_slots_cannot_be_booked() {
    let engine = engine_at(at(day(2024, 6, 4), 11, 5)).await;

    assert_matches!(
        engine.booking.create_appointment(engine.request(at(day(2024, 6, 4), 11, 0))).await,
        Err(AppointmentError::SlotUnavailable(_))
    );
    assert_matches!(
        engine.booking.create_appointment(engine.request(at(day(2024, 6, 3), 14, 0))).await,
        Err(AppointmentError::SlotUnavailable(_))
    );
    assert!(engine
        .booking
        .create_appointment(engine.request(at(day(2024, 6, 4), 11, 30)))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_unknown_patient_or_doctor_is_a_validation_error() {
    let engine = engine().await;
    let slot = at(day(2024, 6, 4), 9, 0);

    let mut request = engine.request(slot);
    request.patient_id = uuid::Uuid::new_v4();
    assert_matches!(
        engine.booking.create_appointment(request).await,
        Err(AppointmentError::ValidationError(_))
    );

    let mut request = engine.request(slot);
    request.doctor_id = uuid::Uuid::new_v4();
    assert_matches!(
        engine.booking.create_appointment(request).await,
        Err(AppointmentError::ValidationError(_))
    );
}

#[tokio::test]
async fn test_amount_defaults_to_doctor_fee() {
    let engine = engine().await;

    let consultation = engine
        .booking
        .create_appointment(engine.request(at(day(2024, 6, 4), 9, 0)))
        .await
        .unwrap();
    assert_eq!(consultation.payment_amount, 80.0);

    let mut follow_up = engine.request(at(day(2024, 6, 4), 9, 30));
    follow_up.appointment_type = AppointmentType::FollowUp;
    let follow_up = engine.booking.create_appointment(follow_up).await.unwrap();
    assert_eq!(follow_up.payment_amount, 40.0);

    let mut explicit = engine.request(at(day(2024, 6, 4), 10, 0));
    explicit.payment_amount = Some(25.0);
    explicit.status = Some(AppointmentStatus::Scheduled);
    let explicit = engine.booking.create_appointment(explicit).await.unwrap();
    assert_eq!(explicit.payment_amount, 25.0);
    assert_eq!(explicit.status, AppointmentStatus::Scheduled);
}

#[tokio::test]
async fn test_paid_pending_displays_as_scheduled() {
    let engine = engine().await;
    let mut request = engine.request(at(day(2024, 6, 4), 9, 0));
    request.payment_status = Some(PaymentStatus::Paid);

    let appointment = engine.booking.create_appointment(request).await.unwrap();
    assert_eq!(appointment.status, AppointmentStatus::Pending);
    assert_eq!(appointment.display_status(), AppointmentStatus::Scheduled);
}

#[tokio::test]
async fn test_delete_legality() {
    let engine = engine().await;
    let staff = Actor::staff("desk");
    let root = Actor::super_admin("root");

    let mut request = engine.request(at(day(2024, 6, 4), 9, 0));
    request.status = Some(AppointmentStatus::Scheduled);
    request.payment_status = Some(PaymentStatus::Paid);
    let paid = engine.booking.create_appointment(request).await.unwrap();

    assert_matches!(
        engine.booking.delete_appointment(paid.id, &staff).await,
        Err(AppointmentError::InvalidState { .. })
    );
    assert!(engine.booking.get_appointment(paid.id).await.is_ok());

    engine.booking.delete_appointment(paid.id, &root).await.unwrap();
    assert_matches!(engine.booking.get_appointment(paid.id).await, Err(AppointmentError::NotFound));

    let fresh = engine
        .booking
        .create_appointment(engine.request(at(day(2024, 6, 4), 9, 0)))
        .await
        .unwrap();
    assert!(engine.booking.delete_appointment(fresh.id, &staff).await.is_ok());
}

#[tokio::test]
async fn test_cancel_rules() {
    let engine = engine().await;
    let staff = Actor::staff("desk");
    let root = Actor::super_admin("root");

    let appointment = engine
        .booking
        .create_appointment(engine.request(at(day(2024, 6, 4), 9, 0)))
        .await
        .unwrap();

    let cancelled = engine
        .booking
        .cancel_appointment(appointment.id, None, &staff)
        .await
        .unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

    assert_matches!(
        engine.booking.cancel_appointment(appointment.id, None, &staff).await,
        Err(AppointmentError::InvalidState { .. })
    );
    let again = engine
        .booking
        .cancel_appointment(appointment.id, None, &root)
        .await
        .unwrap();
    assert_eq!(again.status, AppointmentStatus::Cancelled);
}

#[tokio::test]
async fn test_edit_rules() {
    let engine = engine().await;
    let staff = Actor::staff("desk");
    let root = Actor::super_admin("root");

    let appointment = engine
        .booking
        .create_appointment(engine.request(at(day(2024, 6, 4), 9, 0)))
        .await
        .unwrap();

    let paid = engine
        .booking
        .update_appointment(
            appointment.id,
            appointment_cell::UpdateAppointmentRequest {
                status: Some(AppointmentStatus::Scheduled),
                payment_status: Some(PaymentStatus::Paid),
                ..Default::default()
            },
            &staff,
        )
        .await
        .unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);

    let note = appointment_cell::UpdateAppointmentRequest {
        note: Some("Bring lab results".to_string()),
        ..Default::default()
    };
    assert_matches!(
        engine.booking.update_appointment(appointment.id, note.clone(), &staff).await,
        Err(AppointmentError::InvalidState { .. })
    );
    assert!(engine.booking.update_appointment(appointment.id, note, &root).await.is_ok());

    let backwards = appointment_cell::UpdateAppointmentRequest {
        payment_status: Some(PaymentStatus::Unpaid),
        ..Default::default()
    };
    assert_matches!(
        engine.booking.update_appointment(appointment.id, backwards, &root).await,
        Err(AppointmentError::InvalidState { .. })
    );
}

#[tokio::test]
async fn test_list_filters() {
    let engine = engine().await;
    let tuesday = day(2024, 6, 4);

    for hour in [9, 10, 11] {
        engine
            .booking
            .create_appointment(engine.request(at(tuesday, hour, 0)))
            .await
            .unwrap();
    }
    engine
        .booking
        .create_appointment(engine.request(at(day(2024, 6, 5), 9, 0)))
        .await
        .unwrap();

    let query = appointment_cell::AppointmentSearchQuery {
        doctor_id: Some(engine.doctor_id),
        date: Some(tuesday),
        ..Default::default()
    };
    let listed = engine.booking.list_appointments(&query).await.unwrap();
    assert_eq!(listed.len(), 3);
    assert!(listed.windows(2).all(|w| w[0].schedule_date_time < w[1].schedule_date_time));
}
