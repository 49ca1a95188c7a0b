//! Tests for fundings
//!
//! These tests verify:
//! - Checkout input validation happens before the provider is called
//! - Unpaid or foreign sessions are never recorded
//! - Commits are idempotent per session, including concurrent ones
//! - Funding history totals and scoping

#[cfg(test)]
mod tests {
    use super::super::models::{CheckoutPayload, FundingListQuery};
    use super::super::services::FundingsService;
    use crate::auth::AuthedUser;
    use crate::common::test_support::*;
    use crate::common::ApiError;
    use axum::http::StatusCode;
    use donation_domain::{AccountStatus, Role};
    use serde_json::json;
    use sqlx::SqlitePool;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn service(db: &SqlitePool, fake: &Arc<FakeCheckout>) -> FundingsService {
        FundingsService::new(db.clone(), fake.clone(), Arc::new(test_config()))
    }

    fn checkout(amount: serde_json::Value) -> CheckoutPayload {
        CheckoutPayload {
            name: Some("Rahim".to_string()),
            email: None,
            amount: Some(amount),
        }
    }

    async fn funding_count(db: &SqlitePool) -> i64 {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM fundings")
            .fetch_one(db)
            .await
            .unwrap();
        count
    }

    fn token(user: &AuthedUser) -> String {
        token_for(&provider_id_for(&user.email), Some(&user.email))
    }

    #[tokio::test]
    async fn test_checkout_validation_happens_first() {
        let db = setup_test_db().await;
        let donor = seed_user(&db, "donor@example.com", Role::Donor, AccountStatus::Active).await;
        let fake = FakeCheckout::new();
        let service = service(&db, &fake);

        for bad in [json!(null), json!("ten"), json!(0), json!("-5"), json!(0.5)] {
            let result = service.create_checkout(&donor, &checkout(bad.clone())).await;
            assert!(
                matches!(result, Err(ApiError::ValidationError(_))),
                "amount {} should be rejected",
                bad
            );
        }

        let mut foreign = checkout(json!(10));
        foreign.email = Some("someone-else@example.com".to_string());
        let result = service.create_checkout(&donor, &foreign).await;
        assert!(matches!(result, Err(ApiError::ValidationError(_))));

        let blocked = seed_user(&db, "blocked@example.com", Role::Donor, AccountStatus::Blocked).await;
        let result = service.create_checkout(&blocked, &checkout(json!(10))).await;
        assert!(matches!(result, Err(ApiError::Forbidden(_))));

        // Nothing reached the provider
        assert!(fake.session("cs_test_1").is_none());
    }

    #[tokio::test]
    async fn test_checkout_redirect_and_amount_units() {
        let db = setup_test_db().await;
        let donor = seed_user(&db, "donor@example.com", Role::Donor, AccountStatus::Active).await;
        let fake = FakeCheckout::new();
        let service = service(&db, &fake);

        let redirect = service.create_checkout(&donor, &checkout(json!("25"))).await.unwrap();
        assert_eq!(redirect.url, "https://checkout.test/pay/cs_test_1");
        assert_eq!(redirect.session_id.as_deref(), Some("cs_test_1"));

        let session = fake.session("cs_test_1").unwrap();
        assert_eq!(session.amount_total, Some(2500));
        assert_eq!(session.payment_status, "unpaid");
        assert_eq!(funding_count(&db).await, 0);

        let redirect = service.create_checkout(&donor, &checkout(json!(2.5))).await.unwrap();
        assert_eq!(redirect.session_id.as_deref(), Some("cs_test_2"));
        assert_eq!(fake.session("cs_test_2").unwrap().amount_total, Some(250));
    }

    #[tokio::test]
    async fn test_provider_failures_store_nothing() {
        let db = setup_test_db().await;
        let donor = seed_user(&db, "donor@example.com", Role::Donor, AccountStatus::Active).await;
        let fake = FakeCheckout::new();
        let service = service(&db, &fake);

        fake.fail_create.store(true, Ordering::SeqCst);
        let down = service.create_checkout(&donor, &checkout(json!(10))).await;
        assert!(matches!(down, Err(ApiError::PaymentProvider(_))));

        fake.fail_create.store(false, Ordering::SeqCst);
        fake.omit_url.store(true, Ordering::SeqCst);
        let no_url = service.create_checkout(&donor, &checkout(json!(10))).await;
        assert!(matches!(no_url, Err(ApiError::PaymentProvider(_))));

        assert_eq!(funding_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_commit_requires_paid_session() {
        let db = setup_test_db().await;
        let donor = seed_user(&db, "donor@example.com", Role::Donor, AccountStatus::Active).await;
        let fake = FakeCheckout::new();
        let service = service(&db, &fake);
        service.create_checkout(&donor, &checkout(json!(5))).await.unwrap();

        let unpaid = service.commit(&donor, "cs_test_1").await;
        assert!(matches!(unpaid, Err(ApiError::PaymentVerification(_))));

        let unknown = service.commit(&donor, "cs_missing").await;
        assert!(matches!(unknown, Err(ApiError::NotFound(_))));

        let blank = service.commit(&donor, "  ").await;
        assert!(matches!(blank, Err(ApiError::ValidationError(_))));

        assert_eq!(funding_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_commit_is_idempotent() {
        let db = setup_test_db().await;
        let donor = seed_user(&db, "donor@example.com", Role::Donor, AccountStatus::Active).await;
        let fake = FakeCheckout::new();
        let service = service(&db, &fake);
        service.create_checkout(&donor, &checkout(json!(5))).await.unwrap();
        fake.pay("cs_test_1");

        let first = service.commit(&donor, "cs_test_1").await.unwrap();
        assert!(first.success);
        assert!(first.created);
        let funding = first.funding.unwrap();
        assert_eq!(funding.amount, 500);
        assert_eq!(funding.currency, "usd");
        assert_eq!(funding.donor_email, "donor@example.com");
        assert_eq!(funding.donor_name.as_deref(), Some("Rahim"));

        for _ in 0..3 {
            let again = service.commit(&donor, "cs_test_1").await.unwrap();
            assert!(again.success);
            assert!(!again.created);
            assert_eq!(again.funding.unwrap().id, funding.id);
        }

        assert_eq!(funding_count(&db).await, 1);
        // Replays are answered locally
        assert_eq!(fake.retrievals(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_commits_record_once() {
        let db = setup_test_db().await;
        let donor = seed_user(&db, "donor@example.com", Role::Donor, AccountStatus::Active).await;
        let fake = FakeCheckout::new();
        fake.insert_paid("cs_live_race", "donor@example.com", 1500);
        let service = service(&db, &fake);

        let (a, b, c) = tokio::join!(
            service.commit(&donor, "cs_live_race"),
            service.commit(&donor, "cs_live_race"),
            service.commit(&donor, "cs_live_race"),
        );
        let receipts = [a.unwrap(), b.unwrap(), c.unwrap()];
        assert!(receipts.iter().all(|r| r.success));
        assert_eq!(receipts.iter().filter(|r| r.created).count(), 1);
        assert_eq!(funding_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_foreign_sessions_are_refused() {
        let db = setup_test_db().await;
        let donor = seed_user(&db, "donor@example.com", Role::Donor, AccountStatus::Active).await;
        let other = seed_user(&db, "other@example.com", Role::Donor, AccountStatus::Active).await;
        let admin = seed_user(&db, "admin@example.com", Role::Admin, AccountStatus::Active).await;
        let fake = FakeCheckout::new();
        fake.insert_paid("cs_donor", "donor@example.com", 1000);
        let service = service(&db, &fake);

        let peek = service.get_session(&other, "cs_donor").await;
        assert!(matches!(peek, Err(ApiError::Forbidden(_))));
        let admin_peek = service.get_session(&admin, "cs_donor").await.unwrap();
        assert!(admin_peek.is_paid());

        let steal = service.commit(&other, "cs_donor").await;
        assert!(matches!(steal, Err(ApiError::Forbidden(_))));
        assert_eq!(funding_count(&db).await, 0);

        service.commit(&donor, "cs_donor").await.unwrap();
        let replay = service.commit(&other, "cs_donor").await;
        assert!(matches!(replay, Err(ApiError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_list_totals_and_scope() {
        let db = setup_test_db().await;
        let donor = seed_user(&db, "donor@example.com", Role::Donor, AccountStatus::Active).await;
        let other = seed_user(&db, "other@example.com", Role::Donor, AccountStatus::Active).await;
        let admin = seed_user(&db, "admin@example.com", Role::Admin, AccountStatus::Active).await;
        let fake = FakeCheckout::new();
        fake.insert_paid("cs_a", "donor@example.com", 1000);
        fake.insert_paid("cs_b", "donor@example.com", 2500);
        fake.insert_paid("cs_c", "other@example.com", 700);
        let service = service(&db, &fake);
        service.commit(&donor, "cs_a").await.unwrap();
        service.commit(&donor, "cs_b").await.unwrap();
        service.commit(&other, "cs_c").await.unwrap();

        let everything = service
            .list(
                &admin,
                &FundingListQuery {
                    limit: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(everything.total, 4200);
        assert_eq!(everything.total_count, 3);
        assert_eq!(everything.total_pages, 2);
        assert_eq!(everything.fundings.len(), 2);

        // Non-admins always get their own history
        let own = service
            .list(
                &other,
                &FundingListQuery {
                    email: Some("donor@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(own.total, 700);
        assert_eq!(own.total_count, 1);

        let searched = service
            .list(
                &admin,
                &FundingListQuery {
                    search: Some("cs_b".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(searched.total_count, 1);
        assert_eq!(searched.total, 2500);
    }

    #[tokio::test]
    async fn test_payment_flow_through_router() {
        let db = setup_test_db().await;
        let donor = seed_user(&db, "donor@example.com", Role::Donor, AccountStatus::Active).await;
        let fake = FakeCheckout::new();
        let app = test_app(test_state(db.clone(), fake.clone()));

        let (status, body) = send(
            &app,
            "POST",
            "/create-checkout-session",
            Some(&token(&donor)),
            Some(json!({"name": "Rahim", "email": "donor@example.com", "amount": 20})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["url"], "https://checkout.test/pay/cs_test_1");

        let (status, body) = send(&app, "GET", "/checkout-session/cs_test_1", Some(&token(&donor)), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["payment_status"], "unpaid");

        let (status, body) = send(&app, "PATCH", "/payment-success?session_id=cs_test_1", Some(&token(&donor)), None).await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(body["code"], "PAYMENT_VERIFICATION_ERROR");

        fake.pay("cs_test_1");
        let (status, body) = send(&app, "PATCH", "/payment-success?session_id=cs_test_1", Some(&token(&donor)), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["created"], true);

        let (status, body) = send(&app, "PATCH", "/payment-success?session_id=cs_test_1", Some(&token(&donor)), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["created"], false);

        let (status, body) = send(&app, "GET", "/fundings", Some(&token(&donor)), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2000);
        assert_eq!(body["totalCount"], 1);
        assert_eq!(body["fundings"][0]["sessionId"], "cs_test_1");

        let (status, _) = send(&app, "PATCH", "/payment-success", Some(&token(&donor)), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(funding_count(&db).await, 1);
    }
}
