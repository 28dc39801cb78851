//! Authorization for documents and role-gated operations.
//!
//! Both checks live here so there is a single authorization path: route-level
//! gating through [`authorize_operation`], per-document checks through
//! [`require_document_access`] and course checks through
//! [`require_course_participation`].

mod operations;
mod policy;

pub use operations::{authorize_operation, Operation};
pub use policy::{
    authorize, course_not_found, document_not_found, require_course_participation,
    require_document_access, AccessDecision, CourseMembership, DocumentAccess, DocumentAction,
    Grant,
};
