//! Role gating for operations that are not tied to a single document.

use crate::core::error::{AppError, Result};
use crate::features::auth::model::{Actor, Role};

const ANY_ROLE: &[Role] = &[Role::Admin, Role::Teacher, Role::Student];
const STAFF: &[Role] = &[Role::Admin, Role::Teacher];
const ADMIN_ONLY: &[Role] = &[Role::Admin];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    UploadDocument,
    UploadImage,
    DeleteImage,
    ListCourses,
    ViewCourse,
    UploadCourseFile,
    CreateCourse,
    UpdateCourse,
    EnrollStudent,
    DeleteCourse,
    ListStudents,
    SearchUsers,
    ViewUser,
    CreateTeacher,
    ListTeachers,
    ChangeUserRole,
    DeleteUser,
}

impl Operation {
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Operation::UploadDocument
            | Operation::UploadImage
            | Operation::DeleteImage
            | Operation::ListCourses
            | Operation::ViewCourse
            | Operation::UploadCourseFile => ANY_ROLE,
            Operation::UpdateCourse
            | Operation::EnrollStudent
            | Operation::ListStudents
            | Operation::SearchUsers
            | Operation::ViewUser => STAFF,
            Operation::CreateCourse
            | Operation::DeleteCourse
            | Operation::CreateTeacher
            | Operation::ListTeachers
            | Operation::ChangeUserRole
            | Operation::DeleteUser => ADMIN_ONLY,
        }
    }

    pub fn permits(&self, role: Role) -> bool {
        self.allowed_roles().contains(&role)
    }
}

/// Reject the actor with `Forbidden` unless its role may perform `operation`
pub fn authorize_operation(actor: &Actor, operation: Operation) -> Result<()> {
    if operation.permits(actor.role) {
        return Ok(());
    }

    tracing::debug!(
        "User {} with role {} is not allowed to perform {:?}",
        actor.id,
        actor.role,
        operation
    );
    Err(AppError::Forbidden(
        "You do not have permission to perform this action".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn actor(role: Role) -> Actor {
        Actor {
            id: Uuid::new_v4(),
            role,
            is_active: true,
        }
    }

    #[test]
    fn test_admin_only_operations() {
        for op in [Operation::CreateCourse, Operation::DeleteCourse, Operation::CreateTeacher] {
            assert!(authorize_operation(&actor(Role::Admin), op).is_ok());
            assert!(matches!(
                authorize_operation(&actor(Role::Teacher), op),
                Err(AppError::Forbidden(_))
            ));
            assert!(authorize_operation(&actor(Role::Student), op).is_err());
        }
    }

    #[test]
    fn test_staff_operations() {
        for op in [Operation::EnrollStudent, Operation::UpdateCourse, Operation::SearchUsers] {
            assert!(op.permits(Role::Admin));
            assert!(op.permits(Role::Teacher));
            assert!(!op.permits(Role::Student));
        }
    }

    #[test]
    fn test_everyone_may_upload_documents() {
        for role in [Role::Admin, Role::Teacher, Role::Student] {
            assert!(authorize_operation(&actor(role), Operation::UploadDocument).is_ok());
        }
    }
}
