mod course;

pub use course::{Course, CourseChanges, CourseDocument, CourseSummary, NewCourse};
