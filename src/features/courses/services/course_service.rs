use std::sync::Arc;

use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::access::{
    authorize, authorize_operation, course_not_found, require_course_participation,
    CourseMembership, DocumentAccess, DocumentAction, Operation,
};
use crate::features::auth::model::{Actor, Role};
use crate::features::auth::services::normalize_email;
use crate::features::courses::dtos::{
    CourseDetailDto, CourseDocumentDto, CourseResponseDto, CourseSummaryDto, CreateCourseDto,
    UpdateCourseDto,
};
use crate::features::courses::models::{Course, CourseChanges, NewCourse};
use crate::features::courses::repositories::CourseRepository;
use crate::features::documents::dtos::DocumentResponseDto;
use crate::features::documents::services::{DocumentService, IngestRequest};
use crate::features::users::dtos::UserSummaryDto;
use crate::features::users::repositories::UserRepository;
use crate::shared::upload::UploadedFile;

/// Service for course operations
pub struct CourseService {
    courses: Arc<dyn CourseRepository>,
    users: Arc<dyn UserRepository>,
    documents: Arc<DocumentService>,
}

impl CourseService {
    pub fn new(
        courses: Arc<dyn CourseRepository>,
        users: Arc<dyn UserRepository>,
        documents: Arc<DocumentService>,
    ) -> Self {
        Self {
            courses,
            users,
            documents,
        }
    }

    pub async fn create(&self, actor: &Actor, dto: CreateCourseDto) -> Result<CourseResponseDto> {
        authorize_operation(actor, Operation::CreateCourse)?;
        self.ensure_teacher(dto.teacher_id).await?;

        let course = self
            .courses
            .create(NewCourse {
                name: dto.name.trim().to_string(),
                description: dto.description,
                teacher_id: dto.teacher_id,
            })
            .await?;

        tracing::info!("Course created: id={}, teacher={}", course.id, course.teacher_id);
        Ok(course.into())
    }

    /// ADMIN sees every course, TEACHER the courses they teach, STUDENT the
    /// courses they are enrolled in.
    pub async fn list(&self, actor: &Actor) -> Result<Vec<CourseSummaryDto>> {
        authorize_operation(actor, Operation::ListCourses)?;

        let courses = match actor.role {
            Role::Admin => self.courses.list_all().await?,
            Role::Teacher => self.courses.list_by_teacher(actor.id).await?,
            Role::Student => self.courses.list_by_student(actor.id).await?,
        };
        Ok(courses.into_iter().map(CourseSummaryDto::from).collect())
    }

    /// Course with teacher, students and the documents the actor may read
    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<CourseDetailDto> {
        authorize_operation(actor, Operation::ViewCourse)?;
        let course = self.load_visible(actor, id).await?;

        let teacher = self
            .users
            .find_by_id(course.teacher_id)
            .await?
            .map(UserSummaryDto::from);
        let students = self
            .courses
            .students(id)
            .await?
            .into_iter()
            .map(UserSummaryDto::from)
            .collect();

        let documents = self
            .courses
            .documents(id)
            .await?
            .into_iter()
            .filter(|d| {
                let access = DocumentAccess {
                    owner_id: d.document.user_id,
                    course_teacher_id: Some(course.teacher_id),
                };
                authorize(actor, &access, DocumentAction::Read).is_allowed()
            })
            .map(|d| {
                let mut dto = CourseDocumentDto::from(d);
                dto.document = self.documents.present(dto.document);
                dto
            })
            .collect();

        Ok(CourseDetailDto {
            course: course.into(),
            teacher,
            students,
            documents,
        })
    }

    /// Upload a document attached to the course
    pub async fn upload_file(
        &self,
        actor: &Actor,
        id: Uuid,
        file: UploadedFile,
        description: Option<String>,
    ) -> Result<DocumentResponseDto> {
        authorize_operation(actor, Operation::UploadCourseFile)?;
        self.load_visible(actor, id).await?;

        self.documents
            .upload(
                actor,
                IngestRequest {
                    file,
                    description,
                    course_id: Some(id),
                },
            )
            .await
    }

    /// Enrol a student by email
    pub async fn add_student(&self, actor: &Actor, id: Uuid, email: &str) -> Result<CourseDetailDto> {
        authorize_operation(actor, Operation::EnrollStudent)?;
        let course = self.load(id).await?;
        ensure_manages(actor, &course)?;

        let student = self
            .users
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;

        if student.role != Role::Student {
            return Err(AppError::BadRequest(
                "Only students can be enrolled in a course".to_string(),
            ));
        }

        if self.courses.enroll(id, student.id).await? {
            tracing::info!("Student {} enrolled in course {}", student.id, id);
        } else {
            tracing::debug!("Student {} already enrolled in course {}", student.id, id);
        }

        self.get(actor, id).await
    }

    /// Update a course. Only ADMIN may reassign the teacher.
    pub async fn update(&self, actor: &Actor, id: Uuid, dto: UpdateCourseDto) -> Result<CourseResponseDto> {
        authorize_operation(actor, Operation::UpdateCourse)?;
        let course = self.load(id).await?;
        ensure_manages(actor, &course)?;

        if let Some(teacher_id) = dto.teacher_id {
            if teacher_id != course.teacher_id && !actor.is_admin() {
                return Err(AppError::Forbidden(
                    "Only an administrator can change the course teacher".to_string(),
                ));
            }
            self.ensure_teacher(teacher_id).await?;
        }

        let updated = self
            .courses
            .update(id, CourseChanges::from(dto))
            .await?
            .ok_or_else(|| course_not_found(id))?;

        tracing::info!("Course updated: id={}, by={}", id, actor.id);
        Ok(updated.into())
    }

    /// Delete a course; its documents stay and lose the course link
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<CourseResponseDto> {
        authorize_operation(actor, Operation::DeleteCourse)?;
        let course = self.load(id).await?;

        if !self.courses.delete(id).await? {
            return Err(course_not_found(id));
        }

        tracing::info!("Course deleted: id={}, by={}", id, actor.id);
        Ok(course.into())
    }

    async fn load(&self, id: Uuid) -> Result<Course> {
        self.courses
            .find_by_id(id)
            .await?
            .ok_or_else(|| course_not_found(id))
    }

    /// Load a course the actor takes part in; others get `NotFound`
    async fn load_visible(&self, actor: &Actor, id: Uuid) -> Result<Course> {
        let course = self.load(id).await?;
        let membership = CourseMembership {
            teacher_id: course.teacher_id,
            enrolled: self.courses.is_enrolled(id, actor.id).await?,
        };

        require_course_participation(actor, id, Some(&membership))?;
        Ok(course)
    }

    async fn ensure_teacher(&self, teacher_id: Uuid) -> Result<()> {
        match self.users.find_by_id(teacher_id).await? {
            Some(user) if user.role == Role::Teacher => Ok(()),
            _ => Err(AppError::BadRequest("Invalid teacher ID".to_string())),
        }
    }
}

/// ADMIN manages every course, TEACHER only their own. Other teachers are
/// told the course does not exist.
fn ensure_manages(actor: &Actor, course: &Course) -> Result<()> {
    if actor.is_admin() || course.teacher_id == actor.id {
        return Ok(());
    }
    tracing::debug!("User {} does not manage course {}", actor.id, course.id);
    Err(course_not_found(course.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::users::models::User;
    use crate::shared::test_helpers::{
        InMemoryBlobStore, InMemoryCourseRepository, InMemoryDocumentRepository,
        InMemoryUserRepository,
    };
    use tokio_test::assert_ok;

    struct Fixture {
        service: CourseService,
        users: Arc<InMemoryUserRepository>,
        admin: Actor,
        teacher: User,
        student: User,
    }

    fn fixture() -> Fixture {
        let users = Arc::new(InMemoryUserRepository::default());
        let documents = Arc::new(InMemoryDocumentRepository::default());
        let blobs = Arc::new(InMemoryBlobStore::default());
        let courses = Arc::new(InMemoryCourseRepository::new(users.clone(), documents.clone()));
        let document_service = Arc::new(DocumentService::new(blobs, documents));

        let admin = users.seed(Role::Admin, "admin@school.test").actor();
        let teacher = users.seed(Role::Teacher, "t1@school.test");
        let student = users.seed(Role::Student, "s1@school.test");

        Fixture {
            service: CourseService::new(courses, users.clone(), document_service),
            users,
            admin,
            teacher,
            student,
        }
    }

    fn create_dto(teacher_id: Uuid) -> CreateCourseDto {
        CreateCourseDto {
            name: "Algebra".to_string(),
            description: None,
            teacher_id,
        }
    }

    fn pdf() -> UploadedFile {
        UploadedFile {
            data: vec![1u8; 128],
            file_name: "syllabus.pdf".to_string(),
            content_type: "application/pdf".to_string(),
        }
    }

    #[tokio::test]
    async fn test_only_admin_creates_courses_for_teachers() {
        let fx = fixture();

        let course = assert_ok!(fx.service.create(&fx.admin, create_dto(fx.teacher.id)).await);
        assert_eq!(course.teacher_id, fx.teacher.id);

        let not_teacher = fx.service.create(&fx.admin, create_dto(fx.student.id)).await;
        assert!(matches!(not_teacher, Err(AppError::BadRequest(m)) if m == "Invalid teacher ID"));

        let by_teacher = fx
            .service
            .create(&fx.teacher.actor(), create_dto(fx.teacher.id))
            .await;
        assert!(matches!(by_teacher, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_enrolment_controls_visibility() {
        let fx = fixture();
        let course = assert_ok!(fx.service.create(&fx.admin, create_dto(fx.teacher.id)).await);
        let student = fx.student.actor();

        let hidden = fx.service.get(&student, course.id).await;
        assert!(matches!(hidden, Err(AppError::NotFound(_))));
        assert!(assert_ok!(fx.service.list(&student).await).is_empty());

        let detail = assert_ok!(
            fx.service
                .add_student(&fx.teacher.actor(), course.id, "S1@school.test")
                .await
        );
        assert_eq!(detail.students.len(), 1);

        assert_ok!(fx.service.get(&student, course.id).await);
        assert_eq!(assert_ok!(fx.service.list(&student).await).len(), 1);
    }

    #[tokio::test]
    async fn test_other_teacher_sees_course_as_missing() {
        let fx = fixture();
        let course = assert_ok!(fx.service.create(&fx.admin, create_dto(fx.teacher.id)).await);
        let other = fx.users.seed(Role::Teacher, "t2@school.test").actor();

        let enrol = fx
            .service
            .add_student(&other, course.id, "s1@school.test")
            .await;
        let rename = fx
            .service
            .update(
                &other,
                course.id,
                UpdateCourseDto {
                    name: Some("Geometry".to_string()),
                    ..Default::default()
                },
            )
            .await;
        let missing = fx
            .service
            .update(&other, Uuid::new_v4(), UpdateCourseDto::default())
            .await;

        assert!(matches!(enrol, Err(AppError::NotFound(_))));
        assert!(matches!(rename, Err(AppError::NotFound(_))));
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_teacher_cannot_reassign_course() {
        let fx = fixture();
        let course = assert_ok!(fx.service.create(&fx.admin, create_dto(fx.teacher.id)).await);
        let other = fx.users.seed(Role::Teacher, "t2@school.test");

        let by_teacher = fx
            .service
            .update(
                &fx.teacher.actor(),
                course.id,
                UpdateCourseDto {
                    teacher_id: Some(other.id),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(by_teacher, Err(AppError::Forbidden(_))));

        let by_admin = assert_ok!(
            fx.service
                .update(
                    &fx.admin,
                    course.id,
                    UpdateCourseDto {
                        teacher_id: Some(other.id),
                        ..Default::default()
                    },
                )
                .await
        );
        assert_eq!(by_admin.teacher_id, other.id);
    }

    #[tokio::test]
    async fn test_course_files_are_visible_to_teacher_but_not_other_students() {
        let fx = fixture();
        let course = assert_ok!(fx.service.create(&fx.admin, create_dto(fx.teacher.id)).await);
        let s2 = fx.users.seed(Role::Student, "s2@school.test").actor();
        let teacher = fx.teacher.actor();
        assert_ok!(fx.service.add_student(&teacher, course.id, "s1@school.test").await);
        assert_ok!(fx.service.add_student(&teacher, course.id, "s2@school.test").await);

        let uploaded = assert_ok!(
            fx.service
                .upload_file(&fx.student.actor(), course.id, pdf(), None)
                .await
        );
        assert_eq!(uploaded.course_id, Some(course.id));

        let for_teacher = assert_ok!(fx.service.get(&teacher, course.id).await);
        assert_eq!(for_teacher.documents.len(), 1);
        assert_eq!(for_teacher.documents[0].uploader.email, "s1@school.test");

        let for_s2 = assert_ok!(fx.service.get(&s2, course.id).await);
        assert!(for_s2.documents.is_empty());
    }

    #[tokio::test]
    async fn test_upload_to_invisible_course_is_not_found() {
        let fx = fixture();
        let course = assert_ok!(fx.service.create(&fx.admin, create_dto(fx.teacher.id)).await);

        let result = fx
            .service
            .upload_file(&fx.student.actor(), course.id, pdf(), None)
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_course_is_admin_only() {
        let fx = fixture();
        let course = assert_ok!(fx.service.create(&fx.admin, create_dto(fx.teacher.id)).await);

        let by_teacher = fx.service.delete(&fx.teacher.actor(), course.id).await;
        assert!(matches!(by_teacher, Err(AppError::Forbidden(_))));

        assert_ok!(fx.service.delete(&fx.admin, course.id).await);
        let again = fx.service.delete(&fx.admin, course.id).await;
        assert!(matches!(again, Err(AppError::NotFound(_))));
    }
}
