//! In-memory stand-ins for the stores, with call counters and fault switches.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{extract::Request, middleware::Next, Router};
use chrono::{Duration, Utc};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::access::CourseMembership;
use crate::features::auth::model::{Actor, Role};
use crate::features::courses::models::{
    Course, CourseChanges, CourseDocument, CourseSummary, NewCourse,
};
use crate::features::courses::repositories::CourseRepository;
use crate::features::documents::models::{
    Document, DocumentChanges, DocumentWithCourse, NewDocument,
};
use crate::features::documents::repositories::DocumentRepository;
use crate::features::users::models::{NewUser, User, UserChanges};
use crate::features::users::repositories::UserRepository;
use crate::modules::storage::{
    build_locator, strip_url_base, BlobDeletion, BlobStore, StorageError, StoredBlob,
};

pub const TEST_BLOB_BASE_URL: &str = "http://blobs.test/files";

pub fn actor(role: Role) -> Actor {
    Actor {
        id: Uuid::new_v4(),
        role,
        is_active: true,
    }
}

/// Inject `actor` the way the auth middleware would
pub fn with_actor(router: Router, actor: Actor) -> Router {
    router.layer(axum::middleware::from_fn(
        move |mut request: Request, next: Next| async move {
            request.extensions_mut().insert(actor);
            next.run(request).await
        },
    ))
}

/// Yield to spawned tasks until `condition` holds
pub async fn eventually<F>(condition: F)
where
    F: Fn() -> bool,
{
    let waited = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not reached in time");
}

/// Block until the gate is opened, if one is installed
async fn pass(gate: &Mutex<Option<Arc<Notify>>>) {
    let gate = gate.lock().unwrap().clone();
    if let Some(gate) = gate {
        gate.notified().await;
    }
}

fn install(gate: &Mutex<Option<Arc<Notify>>>) -> Arc<Notify> {
    let notify = Arc::new(Notify::new());
    *gate.lock().unwrap() = Some(Arc::clone(&notify));
    notify
}

// =============================================================================
// BLOB STORE
// =============================================================================

#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    puts: AtomicUsize,
    deletes: AtomicUsize,
    fail_puts: AtomicBool,
    fail_deletes: AtomicBool,
    delete_gate: Mutex<Option<Arc<Notify>>>,
}

impl InMemoryBlobStore {
    /// Make every `delete` wait, after being counted, until the returned
    /// gate is notified
    pub fn hold_deletes(&self) -> Arc<Notify> {
        install(&self.delete_gate)
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Number of put attempts, failed ones included
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Number of delete attempts, failed ones included
    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    pub fn contains(&self, locator: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(locator)
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(
        &self,
        data: Vec<u8>,
        content_type: &str,
        folder: &str,
        original_name: &str,
    ) -> std::result::Result<StoredBlob, StorageError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::Remote("put refused".to_string()));
        }

        let locator = build_locator(folder, original_name, content_type);
        self.blobs.lock().unwrap().insert(locator.clone(), data);
        Ok(StoredBlob {
            public_url: self.public_url(&locator),
            locator,
        })
    }

    async fn delete(&self, locator: &str) -> std::result::Result<BlobDeletion, StorageError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        pass(&self.delete_gate).await;
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Remote("delete refused".to_string()));
        }

        match self.blobs.lock().unwrap().remove(locator) {
            Some(_) => Ok(BlobDeletion::Deleted),
            None => Ok(BlobDeletion::NotFound),
        }
    }

    async fn exists(&self, locator: &str) -> std::result::Result<bool, StorageError> {
        Ok(self.contains(locator))
    }

    fn public_url(&self, locator: &str) -> String {
        format!("{}/{}", TEST_BLOB_BASE_URL, locator)
    }

    fn locator_from_url(&self, url: &str) -> Option<String> {
        strip_url_base(url, TEST_BLOB_BASE_URL)
    }
}

// =============================================================================
// DOCUMENTS
// =============================================================================

#[derive(Default)]
struct DocumentTables {
    /// Insertion order doubles as age
    rows: Vec<Document>,
    courses: HashMap<Uuid, (String, Uuid)>,
    enrolments: HashSet<(Uuid, Uuid)>,
}

#[derive(Default)]
pub struct InMemoryDocumentRepository {
    tables: Mutex<DocumentTables>,
    creates: AtomicUsize,
    fail_creates: AtomicBool,
    vanish_on_delete: AtomicBool,
    create_gate: Mutex<Option<Arc<Notify>>>,
}

impl InMemoryDocumentRepository {
    /// Make every `create` wait, after being counted, until the returned
    /// gate is notified
    pub fn hold_creates(&self) -> Arc<Notify> {
        install(&self.create_gate)
    }

    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    /// Make `delete` behave as if a concurrent request removed the row first
    pub fn vanish_on_delete(&self, vanish: bool) {
        self.vanish_on_delete.store(vanish, Ordering::SeqCst);
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.tables.lock().unwrap().rows.len()
    }

    pub fn set_course_teacher(&self, course_id: Uuid, teacher_id: Uuid) {
        self.register_course(course_id, "Course", teacher_id);
    }

    pub(crate) fn register_course(&self, course_id: Uuid, name: &str, teacher_id: Uuid) {
        self.tables
            .lock()
            .unwrap()
            .courses
            .insert(course_id, (name.to_string(), teacher_id));
    }

    pub fn enroll(&self, course_id: Uuid, student_id: Uuid) {
        self.tables
            .lock()
            .unwrap()
            .enrolments
            .insert((course_id, student_id));
    }

    /// Drop a course and detach its documents
    pub(crate) fn forget_course(&self, course_id: Uuid) {
        let mut tables = self.tables.lock().unwrap();
        tables.courses.remove(&course_id);
        tables.enrolments.retain(|(c, _)| *c != course_id);
        for row in tables.rows.iter_mut() {
            if row.course_id == Some(course_id) {
                row.course_id = None;
            }
        }
    }

    /// Cascade of a user delete; returns the locators of the removed rows
    pub(crate) fn remove_owned_by(&self, user_id: Uuid) -> Vec<String> {
        let mut tables = self.tables.lock().unwrap();
        let (gone, kept): (Vec<Document>, Vec<Document>) =
            tables.rows.drain(..).partition(|d| d.user_id == user_id);
        tables.rows = kept;
        gone.into_iter().map(|d| d.filename).collect()
    }

    pub(crate) fn rows_in_course(&self, course_id: Uuid) -> Vec<Document> {
        self.tables
            .lock()
            .unwrap()
            .rows
            .iter()
            .filter(|d| d.course_id == Some(course_id))
            .cloned()
            .collect()
    }

    /// Store a small PDF in `blobs` and a row pointing at it
    pub async fn seed_with_blob(
        &self,
        blobs: &InMemoryBlobStore,
        owner: Uuid,
        course_id: Option<Uuid>,
    ) -> Document {
        let stored = blobs
            .put(vec![0u8; 64], "application/pdf", "documents", "seed.pdf")
            .await
            .unwrap();
        self.create(NewDocument {
            name: "seed.pdf".to_string(),
            filename: stored.locator,
            url: stored.public_url,
            mimetype: "application/pdf".to_string(),
            size: 64,
            description: None,
            course_id,
            user_id: owner,
        })
        .await
        .unwrap()
    }

    fn joined(tables: &DocumentTables, document: &Document) -> DocumentWithCourse {
        let course = document.course_id.and_then(|id| tables.courses.get(&id));
        DocumentWithCourse {
            document: document.clone(),
            course_name: course.map(|(name, _)| name.clone()),
            course_teacher_id: course.map(|(_, teacher)| *teacher),
        }
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    async fn create(&self, document: NewDocument) -> Result<Document> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        pass(&self.create_gate).await;
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(AppError::Internal("insert refused".to_string()));
        }

        let mut tables = self.tables.lock().unwrap();
        // Strictly increasing timestamps keep newest-first ordering stable
        let created_at = Utc::now() + Duration::milliseconds(tables.rows.len() as i64);
        let row = Document {
            id: Uuid::new_v4(),
            name: document.name,
            filename: document.filename,
            url: document.url,
            mimetype: document.mimetype,
            size: document.size,
            description: document.description,
            course_id: document.course_id,
            user_id: document.user_id,
            created_at,
            updated_at: created_at,
        };
        tables.rows.push(row.clone());
        Ok(row)
    }

    async fn find_with_course(&self, id: Uuid) -> Result<Option<DocumentWithCourse>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .rows
            .iter()
            .find(|d| d.id == id)
            .map(|d| Self::joined(&tables, d)))
    }

    async fn list_by_owner(&self, user_id: Uuid) -> Result<Vec<DocumentWithCourse>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .rows
            .iter()
            .rev()
            .filter(|d| d.user_id == user_id)
            .map(|d| Self::joined(&tables, d))
            .collect())
    }

    async fn update(&self, id: Uuid, changes: DocumentChanges) -> Result<Option<Document>> {
        let mut tables = self.tables.lock().unwrap();
        let Some(row) = tables.rows.iter_mut().find(|d| d.id == id) else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            row.name = name;
        }
        if let Some(description) = changes.description {
            row.description = description;
        }
        if let Some(course_id) = changes.course_id {
            row.course_id = course_id;
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.rows.len();
        tables.rows.retain(|d| d.id != id);

        if self.vanish_on_delete.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(tables.rows.len() < before)
    }

    async fn course_membership(&self, course_id: Uuid, user_id: Uuid) -> Result<Option<CourseMembership>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .courses
            .get(&course_id)
            .map(|(_, teacher_id)| CourseMembership {
                teacher_id: *teacher_id,
                enrolled: tables.enrolments.contains(&(course_id, user_id)),
            }))
    }
}

// =============================================================================
// USERS
// =============================================================================

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<BTreeMap<Uuid, User>>,
    /// Rows removed along with a deleted user
    documents: Option<Arc<InMemoryDocumentRepository>>,
}

impl InMemoryUserRepository {
    /// User store whose deletes cascade into `documents`
    pub fn with_documents(documents: Arc<InMemoryDocumentRepository>) -> Self {
        Self {
            users: Mutex::default(),
            documents: Some(documents),
        }
    }

    /// Insert an active user with a throwaway password hash
    pub fn seed(&self, role: Role, email: &str) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_lowercase(),
            full_name: email.split('@').next().unwrap_or(email).to_string(),
            role,
            is_active: true,
            password_hash: "not-a-real-hash".to_string(),
            created_at: now,
            updated_at: now,
        };
        self.users.lock().unwrap().insert(user.id, user.clone());
        user
    }

    pub fn set_active(&self, id: Uuid, active: bool) {
        if let Some(user) = self.users.lock().unwrap().get_mut(&id) {
            user.is_active = active;
        }
    }

    pub(crate) fn get(&self, id: Uuid) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }

    fn email_taken(users: &BTreeMap<Uuid, User>, email: &str, except: Option<Uuid>) -> bool {
        users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User> {
        let mut users = self.users.lock().unwrap();
        if Self::email_taken(&users, &user.email, None) {
            return Err(AppError::Conflict("duplicate email".to_string()));
        }

        let now = Utc::now();
        let row = User {
            id: Uuid::new_v4(),
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            is_active: true,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.get(id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_by_role(&self, role: Role, offset: i64, limit: i64) -> Result<(Vec<User>, i64)> {
        let users = self.users.lock().unwrap();
        let mut matching: Vec<User> = users.values().filter(|u| u.role == role).cloned().collect();
        matching.sort_by(|a, b| a.full_name.cmp(&b.full_name));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>> {
        let mut users = self.users.lock().unwrap();
        if let Some(email) = &changes.email {
            if Self::email_taken(&users, email, Some(id)) {
                return Err(AppError::Conflict("duplicate email".to_string()));
            }
        }

        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(full_name) = changes.full_name {
            user.full_name = full_name;
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(is_active) = changes.is_active {
            user.is_active = is_active;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Vec<String>>> {
        if self.users.lock().unwrap().remove(&id).is_none() {
            return Ok(None);
        }
        Ok(Some(
            self.documents
                .as_ref()
                .map(|documents| documents.remove_owned_by(id))
                .unwrap_or_default(),
        ))
    }
}

// =============================================================================
// COURSES
// =============================================================================

/// Course store that joins against the user and document fakes
pub struct InMemoryCourseRepository {
    courses: Mutex<BTreeMap<Uuid, Course>>,
    enrolments: Mutex<HashSet<(Uuid, Uuid)>>,
    users: Arc<InMemoryUserRepository>,
    documents: Arc<InMemoryDocumentRepository>,
}

impl InMemoryCourseRepository {
    pub fn new(
        users: Arc<InMemoryUserRepository>,
        documents: Arc<InMemoryDocumentRepository>,
    ) -> Self {
        Self {
            courses: Mutex::new(BTreeMap::new()),
            enrolments: Mutex::new(HashSet::new()),
            users,
            documents,
        }
    }

    fn summarize(&self, course: Course) -> CourseSummary {
        let teacher = self.users.get(course.teacher_id);
        let student_count = self
            .enrolments
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == course.id)
            .count() as i64;
        let document_count = self.documents.rows_in_course(course.id).len() as i64;

        CourseSummary {
            teacher_name: teacher.as_ref().map(|t| t.full_name.clone()).unwrap_or_default(),
            teacher_email: teacher.map(|t| t.email).unwrap_or_default(),
            student_count,
            document_count,
            course,
        }
    }

    fn summaries<F>(&self, keep: F) -> Vec<CourseSummary>
    where
        F: Fn(&Course) -> bool,
    {
        let courses: Vec<Course> = self
            .courses
            .lock()
            .unwrap()
            .values()
            .filter(|c| keep(c))
            .cloned()
            .collect();
        courses.into_iter().map(|c| self.summarize(c)).collect()
    }
}

#[async_trait]
impl CourseRepository for InMemoryCourseRepository {
    async fn create(&self, course: NewCourse) -> Result<Course> {
        let now = Utc::now();
        let row = Course {
            id: Uuid::new_v4(),
            name: course.name,
            description: course.description,
            teacher_id: course.teacher_id,
            created_at: now,
            updated_at: now,
        };
        self.documents
            .register_course(row.id, &row.name, row.teacher_id);
        self.courses.lock().unwrap().insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Course>> {
        Ok(self.courses.lock().unwrap().get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<CourseSummary>> {
        Ok(self.summaries(|_| true))
    }

    async fn list_by_teacher(&self, teacher_id: Uuid) -> Result<Vec<CourseSummary>> {
        Ok(self.summaries(|c| c.teacher_id == teacher_id))
    }

    async fn list_by_student(&self, student_id: Uuid) -> Result<Vec<CourseSummary>> {
        let enrolled: HashSet<Uuid> = self
            .enrolments
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, s)| *s == student_id)
            .map(|(c, _)| *c)
            .collect();
        Ok(self.summaries(|c| enrolled.contains(&c.id)))
    }

    async fn students(&self, course_id: Uuid) -> Result<Vec<User>> {
        let ids: Vec<Uuid> = self
            .enrolments
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == course_id)
            .map(|(_, s)| *s)
            .collect();
        Ok(ids.into_iter().filter_map(|id| self.users.get(id)).collect())
    }

    async fn documents(&self, course_id: Uuid) -> Result<Vec<CourseDocument>> {
        Ok(self
            .documents
            .rows_in_course(course_id)
            .into_iter()
            .rev()
            .map(|document| {
                let uploader = self.users.get(document.user_id);
                CourseDocument {
                    uploader_name: uploader.as_ref().map(|u| u.full_name.clone()).unwrap_or_default(),
                    uploader_email: uploader.map(|u| u.email).unwrap_or_default(),
                    document,
                }
            })
            .collect())
    }

    async fn is_enrolled(&self, course_id: Uuid, user_id: Uuid) -> Result<bool> {
        Ok(self
            .enrolments
            .lock()
            .unwrap()
            .contains(&(course_id, user_id)))
    }

    async fn enroll(&self, course_id: Uuid, user_id: Uuid) -> Result<bool> {
        self.documents.enroll(course_id, user_id);
        Ok(self.enrolments.lock().unwrap().insert((course_id, user_id)))
    }

    async fn update(&self, id: Uuid, changes: CourseChanges) -> Result<Option<Course>> {
        let mut courses = self.courses.lock().unwrap();
        let Some(course) = courses.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            course.name = name;
        }
        if let Some(description) = changes.description {
            course.description = Some(description);
        }
        if let Some(teacher_id) = changes.teacher_id {
            course.teacher_id = teacher_id;
        }
        course.updated_at = Utc::now();
        self.documents
            .register_course(course.id, &course.name, course.teacher_id);
        Ok(Some(course.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let removed = self.courses.lock().unwrap().remove(&id).is_some();
        if removed {
            self.enrolments.lock().unwrap().retain(|(c, _)| *c != id);
            self.documents.forget_course(id);
        }
        Ok(removed)
    }
}
