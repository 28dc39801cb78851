pub mod course_handler;

pub use course_handler::{
    __path_add_student, __path_create_course, __path_delete_course, __path_get_course,
    __path_list_courses, __path_update_course, __path_upload_course_file, add_student,
    create_course, delete_course, get_course, list_courses, update_course, upload_course_file,
};
