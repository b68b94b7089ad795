use super::error::{EntityApiErrorKind, Error};
use async_trait::async_trait;
use axum_login::{AuthnBackend, UserId};
use chrono::Utc;

use entity::users::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use password_auth;
use sea_orm::{entity::prelude::*, ConnectionTrait, DatabaseConnection, Set};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

pub async fn create(db: &impl ConnectionTrait, user_model: Model) -> Result<Model, Error> {
    debug!("New User Model to be inserted: {:?}", user_model.username);

    let now = Utc::now();
    let user_active_model: ActiveModel = ActiveModel {
        email: Set(user_model.email),
        username: Set(user_model.username),
        password: Set(generate_hash(user_model.password)),
        display_name: Set(user_model.display_name),
        about: Set(user_model.about),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    };

    Ok(user_active_model.insert(db).await?)
}

pub async fn find_by_email(db: &impl ConnectionTrait, email: &str) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::Email.eq(email))
        .one(db)
        .await?)
}

pub async fn find_by_id(db: &impl ConnectionTrait, id: Id) -> Result<Model, Error> {
    match Entity::find_by_id(id).one(db).await? {
        Some(user) => Ok(user),
        None => Err(Error {
            source: None,
            error_kind: EntityApiErrorKind::RecordNotFound,
        }),
    }
}

pub async fn verify_password(password_to_verify: &str, password_hash: &str) -> Result<(), Error> {
    match password_auth::verify_password(password_to_verify, password_hash) {
        Ok(_) => Ok(()),
        Err(_) => Err(Error {
            source: None,
            error_kind: EntityApiErrorKind::RecordUnauthenticated,
        }),
    }
}

pub fn generate_hash(password: String) -> String {
    password_auth::generate_hash(password)
}

async fn authenticate_user(creds: Credentials, user: Model) -> Result<Option<Model>, Error> {
    match password_auth::verify_password(creds.password, &user.password) {
        Ok(_) => Ok(Some(user)),
        Err(_) => Err(Error {
            source: None,
            error_kind: EntityApiErrorKind::RecordUnauthenticated,
        }),
    }
}

#[derive(Debug, Clone)]
pub struct Backend {
    db: Arc<DatabaseConnection>,
}

#[derive(Debug, Clone, ToSchema, IntoParams, Deserialize)]
#[schema(as = domain::user::Credentials)] // OpenAPI schema
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub next: Option<String>,
}

impl Backend {
    pub fn new(db: &Arc<DatabaseConnection>) -> Self {
        Self {
            // Arc is cloned, but the source DatabaseConnection refers to the same instance
            // as the one passed in to new() (see the Arc documentation for more info)
            db: Arc::clone(db),
        }
    }
}

#[async_trait]
impl AuthnBackend for Backend {
    type User = Model;
    type Credentials = Credentials;
    type Error = Error;

    async fn authenticate(
        &self,
        creds: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        match find_by_email(self.db.as_ref(), &creds.email).await? {
            Some(user) => authenticate_user(creds, user).await,
            None => Err(Error {
                source: None,
                error_kind: EntityApiErrorKind::RecordUnauthenticated,
            }),
        }
    }

    async fn get_user(&self, user_id: &UserId<Self>) -> Result<Option<Self::User>, Self::Error> {
        Ok(Entity::find_by_id(*user_id).one(self.db.as_ref()).await?)
    }
}

pub type AuthSession = axum_login::AuthSession<Backend>;

#[cfg(test)]
// We need to gate seaORM's mock feature behind conditional compilation because
// the feature removes the Clone trait implementation from seaORM's DatabaseConnection.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn test_user(password_hash: String) -> Model {
        Model {
            id: Id::new_v4(),
            email: "ada@example.com".to_string(),
            username: "ada".to_string(),
            password: password_hash,
            display_name: Some("Ada".to_string()),
            about: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn authenticate_accepts_matching_password() {
        let user = test_user(generate_hash("open sesame".to_string()));
        let result = authenticate_user(
            Credentials {
                email: user.email.clone(),
                password: "open sesame".to_string(),
                next: None,
            },
            user,
        )
        .await
        .unwrap();

        assert!(result.is_some());
    }

    #[tokio::test]
    async fn authenticate_rejects_wrong_password() {
        let user = test_user(generate_hash("open sesame".to_string()));
        let result = authenticate_user(
            Credentials {
                email: user.email.clone(),
                password: "not it".to_string(),
                next: None,
            },
            user,
        )
        .await;

        assert_eq!(
            result.unwrap_err().error_kind,
            EntityApiErrorKind::RecordUnauthenticated
        );
    }

    #[tokio::test]
    async fn find_by_email_returns_none_for_unknown_address() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<Model>::new()])
            .into_connection();

        let found = find_by_email(&db, "nobody@example.com").await.unwrap();
        assert!(found.is_none());
    }
}
