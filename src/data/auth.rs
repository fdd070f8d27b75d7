use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::now;
use crate::entities::{Role, credential, driver_details, profile, user_role};
use crate::error::{AppError, AppResult};
use crate::realtime::{ChangeHub, Table};

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub profile: profile::Model,
    pub role: Role,
}

/// Credential checks and account creation.
pub struct AuthService<'a> {
    db: &'a DatabaseConnection,
    changes: &'a ChangeHub,
}

impl<'a> AuthService<'a> {
    pub fn new(db: &'a DatabaseConnection, changes: &'a ChangeHub) -> Self {
        Self { db, changes }
    }

    /// Create a driver or shipper account.
    pub async fn register(&self, input: RegisterInput) -> AppResult<AuthenticatedUser> {
        if input.role == Role::Admin {
            return Err(AppError::BadRequest(
                "Admin accounts cannot be registered".to_string(),
            ));
        }
        self.create_account(input).await
    }

    /// Create the admin account unless the e-mail is already taken.
    /// Returns whether an account was created.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> AppResult<bool> {
        if self.find_credential(email).await?.is_some() {
            return Ok(false);
        }

        self.create_account(RegisterInput {
            email: email.to_string(),
            password: password.to_string(),
            full_name: "Admin".to_string(),
            phone: None,
            role: Role::Admin,
        })
        .await?;
        Ok(true)
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthenticatedUser> {
        let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

        let credential = self.find_credential(email).await?.ok_or_else(invalid)?;

        let parsed_hash = PasswordHash::new(&credential.password_hash)
            .map_err(|e| AppError::Internal(format!("Failed to parse password hash: {}", e)))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| invalid())?;

        let (profile, role) = profile::Entity::find_by_id(credential.user_id)
            .find_also_related(user_role::Entity)
            .one(self.db)
            .await?
            .ok_or_else(invalid)?;
        let role = role
            .map(|r| r.role)
            .ok_or_else(|| AppError::Forbidden("Account has no role".to_string()))?;

        Ok(AuthenticatedUser { profile, role })
    }

    /// Like [`login`](Self::login), but only admins get through.
    pub async fn login_admin(&self, email: &str, password: &str) -> AppResult<AuthenticatedUser> {
        let user = self.login(email, password).await?;
        if user.role != Role::Admin {
            tracing::warn!(user_id = %user.profile.id, "non-admin attempted admin login");
            return Err(AppError::Forbidden("Admin privileges required".to_string()));
        }
        Ok(user)
    }

    async fn find_credential(&self, email: &str) -> AppResult<Option<credential::Model>> {
        Ok(credential::Entity::find()
            .filter(credential::Column::Email.eq(normalize_email(email)))
            .one(self.db)
            .await?)
    }

    async fn create_account(&self, input: RegisterInput) -> AppResult<AuthenticatedUser> {
        let email = normalize_email(&input.email);
        if email.is_empty() || input.password.is_empty() {
            return Err(AppError::BadRequest(
                "Email and password are required".to_string(),
            ));
        }
        if self.find_credential(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(input.password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?
            .to_string();

        let user_id = Uuid::new_v4();
        let txn = self.db.begin().await?;

        let profile = profile::ActiveModel {
            id: Set(user_id),
            full_name: Set(input.full_name.trim().to_string()),
            email: Set(Some(email.clone())),
            phone: Set(input.phone.filter(|p| !p.trim().is_empty())),
            country_code: Set(None),
            avatar_url: Set(None),
            created_at: Set(now()),
            updated_at: Set(now()),
        }
        .insert(&txn)
        .await?;

        insert_credential(&txn, user_id, email, password_hash).await?;

        let role = user_role::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            role: Set(input.role),
        }
        .insert(&txn)
        .await?;

        let details = if input.role == Role::Driver {
            Some(
                driver_details::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    license_number: Set(None),
                    truck_type: Set(None),
                    is_available: Set(true),
                    created_at: Set(now()),
                }
                .insert(&txn)
                .await?,
            )
        } else {
            None
        };

        txn.commit().await?;

        self.changes.inserted(Table::Profiles, user_id);
        self.changes.inserted(Table::UserRoles, role.id);
        if let Some(details) = details {
            self.changes.inserted(Table::DriverDetails, details.id);
        }
        tracing::info!(%user_id, role = ?input.role, "account created");

        Ok(AuthenticatedUser {
            profile,
            role: input.role,
        })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A registration racing past the pre-check lands here; the unique index on
/// the e-mail turns it into the same conflict.
async fn insert_credential<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    email: String,
    password_hash: String,
) -> AppResult<credential::Model> {
    credential::ActiveModel {
        user_id: Set(user_id),
        email: Set(email),
        password_hash: Set(password_hash),
        created_at: Set(now()),
    }
    .insert(conn)
    .await
    .map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("Email already registered".to_string())
        }
        _ => AppError::Store(err),
    })
}
