//! Tests for user administration

#[cfg(test)]
mod tests {
    use super::super::models::UserListQuery;
    use super::super::services::UsersService;
    use crate::common::test_support::*;
    use crate::common::ApiError;
    use axum::http::StatusCode;
    use donation_domain::{AccountStatus, Role};
    use serde_json::json;

    fn token(email: &str) -> String {
        token_for(&provider_id_for(email), Some(email))
    }

    #[tokio::test]
    async fn test_list_users_filters_and_pages() {
        let db = setup_test_db().await;
        seed_user(&db, "admin@example.com", Role::Admin, AccountStatus::Active).await;
        for i in 0..4 {
            seed_user(&db, &format!("donor{}@example.com", i), Role::Donor, AccountStatus::Active).await;
        }
        seed_user(&db, "blocked@example.com", Role::Donor, AccountStatus::Blocked).await;
        let service = UsersService::new(db);

        let page = service
            .list_users(&UserListQuery {
                limit: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 6);
        assert_eq!(page.result.len(), 2);
        assert_eq!(page.total_pages, 3);

        let blocked = service
            .list_users(&UserListQuery {
                status: Some("blocked".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(blocked.total, 1);
        assert_eq!(blocked.result[0].email, "blocked@example.com");

        let searched = service
            .list_users(&UserListQuery {
                search: Some("DONOR2".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(searched.total, 1);

        let bad = service
            .list_users(&UserListQuery {
                status: Some("sleeping".to_string()),
                ..Default::default()
            })
            .await;
        assert!(matches!(bad, Err(ApiError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_block_and_unblock() {
        let db = setup_test_db().await;
        let admin = seed_user(&db, "admin@example.com", Role::Admin, AccountStatus::Active).await;
        let donor = seed_user(&db, "donor@example.com", Role::Donor, AccountStatus::Active).await;
        let service = UsersService::new(db);

        let blocked = service.set_status(&admin, &donor.id, AccountStatus::Blocked).await.unwrap();
        assert_eq!(blocked.status(), AccountStatus::Blocked);

        // Blocking twice is a state conflict, not a silent success
        let again = service.set_status(&admin, &donor.id, AccountStatus::Blocked).await;
        assert!(matches!(again, Err(ApiError::Conflict(_))));

        let unblocked = service.set_status(&admin, &donor.id, AccountStatus::Active).await.unwrap();
        assert_eq!(unblocked.status(), AccountStatus::Active);
    }

    #[tokio::test]
    async fn test_admin_guards() {
        let db = setup_test_db().await;
        let admin = seed_user(&db, "admin@example.com", Role::Admin, AccountStatus::Active).await;
        let other_admin = seed_user(&db, "second@example.com", Role::Admin, AccountStatus::Active).await;
        let volunteer = seed_user(&db, "vol@example.com", Role::Volunteer, AccountStatus::Active).await;
        let donor = seed_user(&db, "donor@example.com", Role::Donor, AccountStatus::Active).await;
        let service = UsersService::new(db);

        let own = service.set_role(&admin, &admin.id, Role::Volunteer).await;
        assert!(matches!(own, Err(ApiError::Forbidden(_))));

        let admin_block = service.set_status(&admin, &other_admin.id, AccountStatus::Blocked).await;
        assert!(matches!(admin_block, Err(ApiError::Forbidden(_))));

        let by_volunteer = service.set_status(&volunteer, &donor.id, AccountStatus::Blocked).await;
        assert!(matches!(by_volunteer, Err(ApiError::Forbidden(_))));

        let demote = service.set_role(&admin, &volunteer.id, Role::Donor).await;
        assert!(matches!(demote, Err(ApiError::ValidationError(_))));

        let missing = service.set_status(&admin, "U_NOPE", AccountStatus::Blocked).await;
        assert!(matches!(missing, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_promote_via_router() {
        let db = setup_test_db().await;
        let admin = seed_user(&db, "admin@example.com", Role::Admin, AccountStatus::Active).await;
        let donor = seed_user(&db, "donor@example.com", Role::Donor, AccountStatus::Active).await;
        let app = test_app(test_state(db, FakeCheckout::new()));

        let uri = format!("/users/{}/role", donor.id);
        let (status, body) = send(&app, "PATCH", &uri, Some(&token(&admin.email)), Some(json!({"role": "volunteer"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "volunteer");

        let (status, body) = send(&app, "PATCH", &uri, Some(&token(&admin.email)), Some(json!({"role": "volunteer"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "User already has the volunteer role");

        let (status, _) = send(&app, "PATCH", &uri, Some(&token(&admin.email)), Some(json!({"role": "overlord"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // The promoted volunteer now reads the new role from the server
        let (status, body) = send(&app, "GET", "/role/donor@example.com", Some(&token(&donor.email)), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "volunteer");
    }

    #[tokio::test]
    async fn test_non_admin_cannot_list_or_block() {
        let db = setup_test_db().await;
        let volunteer = seed_user(&db, "vol@example.com", Role::Volunteer, AccountStatus::Active).await;
        let donor = seed_user(&db, "donor@example.com", Role::Donor, AccountStatus::Active).await;
        let app = test_app(test_state(db, FakeCheckout::new()));

        let (status, _) = send(&app, "GET", "/users", Some(&token(&volunteer.email)), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let uri = format!("/users/{}/status", donor.id);
        let (status, _) = send(&app, "PATCH", &uri, Some(&token(&volunteer.email)), Some(json!({"status": "blocked"}))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, "PATCH", &uri, Some(&token(&volunteer.email)), Some(json!({"status": "asleep"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_admin_lists_users_via_router() {
        let db = setup_test_db().await;
        let admin = seed_user(&db, "admin@example.com", Role::Admin, AccountStatus::Active).await;
        seed_user(&db, "donor@example.com", Role::Donor, AccountStatus::Blocked).await;
        let app = test_app(test_state(db, FakeCheckout::new()));

        let (status, body) = send(&app, "GET", "/users?status=blocked&page=1&limit=5", Some(&token(&admin.email)), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["limit"], 5);
        assert_eq!(body["totalPages"], 1);
        assert_eq!(body["result"][0]["status"], "blocked");
    }
}
