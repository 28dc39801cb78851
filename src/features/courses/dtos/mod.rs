mod course_dto;

pub use course_dto::{
    CourseDetailDto, CourseDocumentDto, CourseDocumentUploaderDto, CourseResponseDto,
    CourseSummaryDto, CreateCourseDto, EnrollStudentDto, UpdateCourseDto, UploadCourseFileDto,
};
