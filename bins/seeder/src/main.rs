//! Database seeder for Fieldgate development and testing.
//!
//! Seeds one user per role for local development.
//!
//! Usage: cargo run --bin seeder

use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use std::str::FromStr;
use uuid::Uuid;

use fieldgate_core::auth::{UserRole, hash_password};
use fieldgate_db::entities::users;

/// Deterministic user IDs so repeated seeds are idempotent.
const SEED_IDS: [(&str, UserRole); 5] = [
    ("00000000-0000-0000-0000-000000000001", UserRole::Admin),
    ("00000000-0000-0000-0000-000000000002", UserRole::Staff),
    ("00000000-0000-0000-0000-000000000003", UserRole::Technician),
    ("00000000-0000-0000-0000-000000000004", UserRole::Transporter),
    ("00000000-0000-0000-0000-000000000005", UserRole::Customer),
];

/// Shared development password for all seeded users.
const SEED_PASSWORD: &str = "fieldgate-dev";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    println!("Connecting to database...");
    let db = fieldgate_db::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    for (id, role) in SEED_IDS {
        seed_user(&db, id, role).await;
    }

    println!("Seeding complete!");
}

/// Seeds a single user for the given role, skipping existing rows.
async fn seed_user(db: &DatabaseConnection, id: &str, role: UserRole) {
    let user_id = Uuid::from_str(id).expect("seed id must be a valid UUID");

    if users::Entity::find_by_id(user_id)
        .one(db)
        .await
        .ok()
        .flatten()
        .is_some()
    {
        println!("  {role} user already exists, skipping...");
        return;
    }

    println!("  Seeding {role} user...");
    let now = chrono::Utc::now().into();
    let user = users::ActiveModel {
        id: Set(user_id),
        email: Set(format!("{role}@fieldgate.dev")),
        password_hash: Set(hash_password(SEED_PASSWORD).expect("Failed to hash seed password")),
        full_name: Set(format!("Dev {role}")),
        role: Set(role.to_string()),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    user.insert(db).await.expect("Failed to insert seed user");
}
