use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{CreateUserRequest, UpdateUserRequest};
use super::password::hash_password_blocking;
use super::repo::UserStore;
use super::repo_types::{NewUser, StoreError, User, UserChanges};
use crate::error::{AppError, AppResult};

const NOT_FOUND: &str = "User not found";
const EMAIL_IN_USE: &str = "Email already in use";

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => AppError::Conflict(EMAIL_IN_USE.into()),
            StoreError::Other(e) => AppError::Internal(e),
        }
    }
}

pub async fn list_users(store: &dyn UserStore) -> AppResult<Vec<User>> {
    Ok(store.list().await?)
}

pub async fn get_user(store: &dyn UserStore, id: Uuid) -> AppResult<User> {
    store
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))
}

pub async fn create_user(store: &dyn UserStore, mut req: CreateUserRequest) -> AppResult<User> {
    req.normalize_and_validate().map_err(|msg| {
        warn!(%msg, "create user rejected");
        AppError::BadRequest(msg)
    })?;

    let password_hash = hash_password_blocking(req.password).await?;
    let user = store
        .insert(NewUser {
            name: req.name,
            email: req.email,
            password_hash,
        })
        .await
        .inspect_err(|e| {
            if matches!(e, StoreError::DuplicateEmail) {
                warn!("email already in use");
            }
        })?;

    info!(user_id = %user.id, "user created");
    Ok(user)
}

pub async fn update_user(
    store: &dyn UserStore,
    id: Uuid,
    mut req: UpdateUserRequest,
) -> AppResult<User> {
    req.normalize_and_validate().map_err(|msg| {
        warn!(%msg, %id, "update user rejected");
        AppError::BadRequest(msg)
    })?;

    let password_hash = match req.password {
        Some(plain) => Some(hash_password_blocking(plain).await?),
        None => None,
    };
    let changes = UserChanges {
        name: req.name,
        email: req.email,
        password_hash,
    };

    let user = store
        .update(id, changes)
        .await
        .inspect_err(|e| {
            if matches!(e, StoreError::DuplicateEmail) {
                warn!(%id, "email already in use by another user");
            }
        })?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;

    info!(user_id = %user.id, "user updated");
    Ok(user)
}

pub async fn delete_user(store: &dyn UserStore, id: Uuid) -> AppResult<User> {
    let user = store
        .delete(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;
    info!(user_id = %user.id, "user deleted");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::memory::MemoryUserStore;
    use crate::users::password::verify_password;

    fn alice() -> CreateUserRequest {
        CreateUserRequest {
            name: "Alice".into(),
            email: "a@x.com".into(),
            password: "secret1".into(),
        }
    }

    #[tokio::test]
    async fn create_hashes_password() {
        let store = MemoryUserStore::new();
        let user = create_user(&store, alice()).await.unwrap();
        assert_ne!(user.password_hash, "secret1");
        assert!(verify_password("secret1", &user.password_hash).unwrap());
        assert_eq!(get_user(&store, user.id).await.unwrap().email, "a@x.com");
    }

    #[tokio::test]
    async fn create_duplicate_email_is_conflict_case_insensitive() {
        let store = MemoryUserStore::new();
        create_user(&store, alice()).await.unwrap();
        let mut again = alice();
        again.email = "A@X.COM".into();
        let err = create_user(&store, again).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn create_invalid_input_is_bad_request() {
        let store = MemoryUserStore::new();
        let mut req = alice();
        req.password = "short".into();
        let err = create_user(&store, req).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(list_users(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = MemoryUserStore::new();
        let err = get_user(&store, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_rehashes_only_when_password_supplied() {
        let store = MemoryUserStore::new();
        let user = create_user(&store, alice()).await.unwrap();

        let renamed = update_user(
            &store,
            user.id,
            UpdateUserRequest {
                name: Some("Alicia".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(renamed.name, "Alicia");
        assert_eq!(renamed.password_hash, user.password_hash);

        let repassed = update_user(
            &store,
            user.id,
            UpdateUserRequest {
                password: Some("another-secret".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_ne!(repassed.password_hash, user.password_hash);
        assert!(verify_password("another-secret", &repassed.password_hash).unwrap());
    }

    #[tokio::test]
    async fn update_email_conflicts_with_other_user_but_not_self() {
        let store = MemoryUserStore::new();
        let a = create_user(&store, alice()).await.unwrap();
        let mut bob = alice();
        bob.name = "Bob".into();
        bob.email = "b@x.com".into();
        create_user(&store, bob).await.unwrap();

        let own = UpdateUserRequest {
            email: Some("a@x.com".into()),
            ..Default::default()
        };
        assert!(update_user(&store, a.id, own).await.is_ok());

        let taken = UpdateUserRequest {
            email: Some("b@x.com".into()),
            ..Default::default()
        };
        let err = update_user(&store, a.id, taken).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let store = MemoryUserStore::new();
        let err = update_user(&store, Uuid::new_v4(), UpdateUserRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_twice() {
        let store = MemoryUserStore::new();
        let user = create_user(&store, alice()).await.unwrap();
        let removed = delete_user(&store, user.id).await.unwrap();
        assert_eq!(removed.id, user.id);
        assert_eq!(removed.email, "a@x.com");
        let err = delete_user(&store, user.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
