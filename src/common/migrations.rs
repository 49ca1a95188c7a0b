// src/common/migrations.rs
//! Database migration and schema management

use sqlx::SqlitePool;
use std::env;
use tracing::{info, warn};

/// Whether `RESET_DB=true` asks for a clean schema on start-up.
pub fn reset_requested() -> bool {
    env::var("RESET_DB").unwrap_or_else(|_| "false".to_string()) == "true"
}

/// Run all database migrations
///
/// Tables are created if missing. With `reset` set, existing tables are
/// dropped first.
pub async fn run_migrations(pool: &SqlitePool, reset: bool) -> Result<(), sqlx::Error> {
    if reset {
        warn!("RESET_DB=true - Dropping all tables and recreating schema");
        drop_all_tables(pool).await?;
    } else {
        info!("Skipping table drop (RESET_DB not set)");
    }

    create_user_tables(pool).await?;
    create_request_tables(pool).await?;
    create_funding_tables(pool).await?;
    create_indexes(pool).await?;

    info!("Database migration completed");
    Ok(())
}

async fn drop_all_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Reverse dependency order
    for table in ["fundings", "donation_requests", "users"] {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await?;
    }
    Ok(())
}

async fn create_user_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            provider_id TEXT UNIQUE NOT NULL,
            email TEXT UNIQUE NOT NULL COLLATE NOCASE,
            name TEXT,
            avatar TEXT,
            blood_group TEXT,
            district TEXT,
            upazila TEXT,
            role TEXT NOT NULL DEFAULT 'donor'
                CHECK (role IN ('donor', 'volunteer', 'admin')),
            status TEXT NOT NULL DEFAULT 'active'
                CHECK (status IN ('active', 'blocked')),
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_request_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS donation_requests (
            id TEXT PRIMARY KEY,
            donor_id TEXT NOT NULL,
            donor_name TEXT,
            donor_email TEXT NOT NULL COLLATE NOCASE,
            recipient_name TEXT NOT NULL,
            hospital_name TEXT NOT NULL,
            full_address TEXT,
            recipient_district TEXT NOT NULL,
            recipient_upazila TEXT NOT NULL,
            blood_group TEXT NOT NULL,
            donation_date TEXT NOT NULL,
            donation_time TEXT NOT NULL,
            message TEXT,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'inprogress', 'done', 'cancelled')),
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now')),
            FOREIGN KEY(donor_id) REFERENCES users(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_funding_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // One record per checkout session; the UNIQUE constraint is what makes
    // commits idempotent under concurrency.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fundings (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL UNIQUE,
            donor_name TEXT,
            donor_email TEXT NOT NULL COLLATE NOCASE,
            amount INTEGER NOT NULL,
            currency TEXT NOT NULL,
            payment_status TEXT NOT NULL,
            payment_intent TEXT,
            paid_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_users_status ON users(status)",
        "CREATE INDEX IF NOT EXISTS idx_requests_donor_email ON donation_requests(donor_email)",
        "CREATE INDEX IF NOT EXISTS idx_requests_status ON donation_requests(status)",
        "CREATE INDEX IF NOT EXISTS idx_requests_location ON donation_requests(recipient_district, recipient_upazila)",
        "CREATE INDEX IF NOT EXISTS idx_requests_created ON donation_requests(created_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_fundings_paid_at ON fundings(paid_at DESC)",
    ];

    for statement in indexes {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}
