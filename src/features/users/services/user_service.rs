use std::sync::Arc;

use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::access::{authorize_operation, Operation};
use crate::features::auth::model::{Actor, Role};
use crate::features::auth::password::hash_password;
use crate::features::auth::services::normalize_email;
use crate::features::users::dtos::{CreateTeacherDto, UpdateUserDto, UserResponseDto};
use crate::features::users::models::{NewUser, User, UserChanges};
use crate::features::users::repositories::UserRepository;
use crate::modules::storage::BlobStore;

/// Service for user administration
pub struct UserService {
    users: Arc<dyn UserRepository>,
    blobs: Arc<dyn BlobStore>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { users, blobs }
    }

    /// One page of students plus the total count
    pub async fn list_students(
        &self,
        actor: &Actor,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<UserResponseDto>, i64)> {
        authorize_operation(actor, Operation::ListStudents)?;
        self.list_role(Role::Student, offset, limit).await
    }

    pub async fn list_teachers(
        &self,
        actor: &Actor,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<UserResponseDto>, i64)> {
        authorize_operation(actor, Operation::ListTeachers)?;
        self.list_role(Role::Teacher, offset, limit).await
    }

    pub async fn search_by_email(&self, actor: &Actor, email: &str) -> Result<UserResponseDto> {
        authorize_operation(actor, Operation::SearchUsers)?;

        self.users
            .find_by_email(&normalize_email(email))
            .await?
            .map(UserResponseDto::from)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Create a TEACHER account; a taken email surfaces as `Conflict`
    pub async fn create_teacher(
        &self,
        actor: &Actor,
        dto: CreateTeacherDto,
    ) -> Result<UserResponseDto> {
        authorize_operation(actor, Operation::CreateTeacher)?;
        let password_hash = hash_password(&dto.password)?;

        let user = self
            .users
            .create(NewUser {
                email: normalize_email(&dto.email),
                full_name: dto.full_name.trim().to_string(),
                role: Role::Teacher,
                password_hash,
            })
            .await
            .map_err(email_taken)?;

        tracing::info!("Teacher created: id={}, by={}", user.id, actor.id);
        Ok(user.into())
    }

    /// Users may always read themselves; staff may read anyone
    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<UserResponseDto> {
        if actor.id != id {
            authorize_operation(actor, Operation::ViewUser)?;
        }
        Ok(self.load(id).await?.into())
    }

    /// Users update their own profile; ADMIN updates anyone and alone may
    /// change role or active flag.
    pub async fn update(&self, actor: &Actor, id: Uuid, dto: UpdateUserDto) -> Result<UserResponseDto> {
        if actor.id != id && !actor.is_admin() {
            return Err(AppError::Forbidden(
                "You can only update your own account".to_string(),
            ));
        }
        if dto.role.is_some() || dto.is_active.is_some() {
            authorize_operation(actor, Operation::ChangeUserRole)?;
        }

        let password_hash = dto.password.as_deref().map(hash_password).transpose()?;
        let changes = UserChanges {
            email: dto.email.as_deref().map(normalize_email),
            full_name: dto.full_name.map(|n| n.trim().to_string()),
            role: dto.role,
            is_active: dto.is_active,
            password_hash,
        };

        let user = self
            .users
            .update(id, changes)
            .await
            .map_err(email_taken)?
            .ok_or_else(|| user_not_found(id))?;

        tracing::info!("User updated: id={}, by={}", id, actor.id);
        Ok(user.into())
    }

    /// Delete a user. Their documents go with the row; the stored files are
    /// removed afterwards on a best-effort basis.
    ///
    /// The row delete and blob cleanup run on their own task, so a dropped
    /// request cannot stop between the two.
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<UserResponseDto> {
        authorize_operation(actor, Operation::DeleteUser)?;
        if actor.id == id {
            return Err(AppError::BadRequest(
                "You cannot delete your own account".to_string(),
            ));
        }

        let user = self.load(id).await?;
        let users = Arc::clone(&self.users);
        let blobs = Arc::clone(&self.blobs);
        let actor_id = actor.id;

        tokio::spawn(async move {
            let locators = users.delete(id).await?.ok_or_else(|| user_not_found(id))?;
            tracing::info!(
                "User deleted: id={}, by={}, documents={}",
                id,
                actor_id,
                locators.len()
            );

            for locator in &locators {
                if let Err(e) = blobs.delete(locator).await {
                    tracing::warn!(locator = %locator, "Blob cleanup failed after user deletion: {}", e);
                }
            }
            Ok::<_, AppError>(())
        })
        .await
        .map_err(|e| AppError::Internal(format!("User deletion task failed: {}", e)))??;

        Ok(user.into())
    }

    async fn list_role(&self, role: Role, offset: i64, limit: i64) -> Result<(Vec<UserResponseDto>, i64)> {
        let (users, total) = self.users.list_by_role(role, offset, limit).await?;
        Ok((users.into_iter().map(UserResponseDto::from).collect(), total))
    }

    async fn load(&self, id: Uuid) -> Result<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| user_not_found(id))
    }
}

fn user_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("User with ID {} not found", id))
}

fn email_taken(err: AppError) -> AppError {
    match err {
        AppError::Conflict(_) => AppError::Conflict("A user with this email already exists".to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::auth::password::verify_password;
    use crate::shared::test_helpers::{
        eventually, InMemoryBlobStore, InMemoryDocumentRepository, InMemoryUserRepository,
    };
    use tokio_test::{assert_err, assert_ok};

    struct Fixture {
        service: UserService,
        users: Arc<InMemoryUserRepository>,
        documents: Arc<InMemoryDocumentRepository>,
        blobs: Arc<InMemoryBlobStore>,
        admin: Actor,
    }

    fn fixture() -> Fixture {
        let documents = Arc::new(InMemoryDocumentRepository::default());
        let users = Arc::new(InMemoryUserRepository::with_documents(documents.clone()));
        let blobs = Arc::new(InMemoryBlobStore::default());
        let admin = users.seed(Role::Admin, "admin@school.test").actor();
        Fixture {
            service: UserService::new(users.clone(), blobs.clone()),
            users,
            documents,
            blobs,
            admin,
        }
    }

    fn teacher_dto(email: &str) -> CreateTeacherDto {
        CreateTeacherDto {
            email: email.to_string(),
            password: "correct horse".to_string(),
            full_name: "Ms Teacher".to_string(),
        }
    }

    #[tokio::test]
    async fn test_admin_creates_teacher_and_duplicate_conflicts() {
        let fx = fixture();

        let teacher = assert_ok!(fx.service.create_teacher(&fx.admin, teacher_dto("T1@School.test")).await);
        assert_eq!(teacher.role, Role::Teacher);
        assert_eq!(teacher.email, "t1@school.test");

        let stored = fx.users.find_by_id(teacher.id).await.unwrap().unwrap();
        assert!(verify_password("correct horse", &stored.password_hash));

        let duplicate = fx.service.create_teacher(&fx.admin, teacher_dto("t1@school.test")).await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_teacher_cannot_create_teacher() {
        let fx = fixture();
        let teacher = fx.users.seed(Role::Teacher, "t1@school.test").actor();

        let result = fx.service.create_teacher(&teacher, teacher_dto("t2@school.test")).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_student_reads_self_but_not_others() {
        let fx = fixture();
        let s1 = fx.users.seed(Role::Student, "s1@school.test").actor();
        let s2 = fx.users.seed(Role::Student, "s2@school.test").actor();

        assert_ok!(fx.service.get(&s1, s1.id).await);
        let other = fx.service.get(&s1, s2.id).await;
        assert!(matches!(other, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_only_admin_changes_role_or_active_flag() {
        let fx = fixture();
        let s1 = fx.users.seed(Role::Student, "s1@school.test").actor();

        let promote_self = fx
            .service
            .update(
                &s1,
                s1.id,
                UpdateUserDto {
                    role: Some(Role::Admin),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(promote_self, Err(AppError::Forbidden(_))));

        let renamed = assert_ok!(
            fx.service
                .update(
                    &s1,
                    s1.id,
                    UpdateUserDto {
                        full_name: Some("  Sam Student ".to_string()),
                        ..Default::default()
                    },
                )
                .await
        );
        assert_eq!(renamed.full_name, "Sam Student");

        let disabled = assert_ok!(
            fx.service
                .update(
                    &fx.admin,
                    s1.id,
                    UpdateUserDto {
                        is_active: Some(false),
                        ..Default::default()
                    },
                )
                .await
        );
        assert!(!disabled.is_active);
    }

    #[tokio::test]
    async fn test_student_listing_is_staff_only_and_paginated() {
        let fx = fixture();
        for i in 0..3 {
            fx.users.seed(Role::Student, &format!("s{}@school.test", i));
        }
        let teacher = fx.users.seed(Role::Teacher, "t1@school.test").actor();

        let (page, total) = assert_ok!(fx.service.list_students(&teacher, 0, 2).await);
        assert_eq!(page.len(), 2);
        assert_eq!(total, 3);

        let student = fx.users.seed(Role::Student, "s9@school.test").actor();
        assert_err!(fx.service.list_students(&student, 0, 10).await);
    }

    #[tokio::test]
    async fn test_delete_user_removes_their_blobs() {
        let fx = fixture();
        let s1 = fx.users.seed(Role::Student, "s1@school.test");
        let s2 = fx.users.seed(Role::Student, "s2@school.test");
        let first = fx.documents.seed_with_blob(fx.blobs.as_ref(), s1.id, None).await;
        let second = fx.documents.seed_with_blob(fx.blobs.as_ref(), s1.id, None).await;
        let kept = fx.documents.seed_with_blob(fx.blobs.as_ref(), s2.id, None).await;

        assert_ok!(fx.service.delete(&fx.admin, s1.id).await);

        assert!(fx.users.find_by_id(s1.id).await.unwrap().is_none());
        assert!(!fx.blobs.contains(&first.filename));
        assert!(!fx.blobs.contains(&second.filename));
        assert!(fx.blobs.contains(&kept.filename));
        assert_eq!(fx.documents.len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_user_delete_still_cleans_blobs() {
        let fx = fixture();
        let s1 = fx.users.seed(Role::Student, "s1@school.test");
        let doc = fx.documents.seed_with_blob(fx.blobs.as_ref(), s1.id, None).await;
        let gate = fx.blobs.hold_deletes();

        tokio::select! {
            _ = fx.service.delete(&fx.admin, s1.id) => panic!("delete finished while the blob store was held"),
            _ = eventually(|| fx.blobs.delete_count() == 1) => {}
        }
        assert!(fx.users.find_by_id(s1.id).await.unwrap().is_none());

        gate.notify_one();
        eventually(|| !fx.blobs.contains(&doc.filename)).await;
    }

    #[tokio::test]
    async fn test_admin_cannot_delete_self() {
        let fx = fixture();
        let result = fx.service.delete(&fx.admin, fx.admin.id).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
