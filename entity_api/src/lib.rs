//! Entity-level operations over the SeaORM entities.
//!
//! Functions in this crate take `&impl ConnectionTrait` wherever a caller
//! may want to run them inside its own transaction (notably the
//! notification insert performed by the delivery layer).

pub mod comment;
pub mod error;
pub mod message;
pub mod notification;
pub mod post;
pub mod subtable;
pub mod user;
pub mod vote;

pub use entity::Id;

use chrono::Utc;
use log::*;
use sea_orm::DatabaseConnection;

fn seed_user_model(email: &str, username: &str, password: &str) -> entity::users::Model {
    let now = Utc::now();
    entity::users::Model {
        id: Id::new_v4(),
        email: email.to_string(),
        username: username.to_string(),
        password: password.to_string(),
        display_name: None,
        about: None,
        created_at: now.into(),
        updated_at: now.into(),
    }
}

/// Populate a development database with two users, a subtable and a post,
/// enough to exercise the comment-notification and chat flows by hand or
/// from the ws-test-client.
pub async fn seed_database(db: &DatabaseConnection) {
    let ada = match user::create(db, seed_user_model("ada@agora.dev", "ada", "password")).await {
        Ok(user) => user,
        Err(e) => {
            warn!("Skipping seed, users already present? ({e})");
            return;
        }
    };
    let grace = user::create(db, seed_user_model("grace@agora.dev", "grace", "password"))
        .await
        .expect("Failed to seed second user");

    let now = Utc::now();
    let subtable = subtable::create(
        db,
        entity::subtables::Model {
            id: Id::new_v4(),
            name: "rust".to_string(),
            description: Some("Discussions about the Rust programming language".to_string()),
            creator_id: ada.id,
            created_at: now.into(),
            updated_at: now.into(),
        },
        ada.id,
    )
    .await
    .expect("Failed to seed subtable");

    post::create(
        db,
        entity::posts::Model {
            id: Id::new_v4(),
            subtable_id: subtable.id,
            user_id: ada.id,
            title: "Welcome to t/rust".to_string(),
            body: Some("Introduce yourself below.".to_string()),
            created_at: now.into(),
            updated_at: now.into(),
        },
        ada.id,
    )
    .await
    .expect("Failed to seed post");

    info!(
        "Seeded users ada@agora.dev and grace@agora.dev (password: \"password\"), \
         subtable t/rust with a welcome post; second user id {}",
        grace.id
    );
}
