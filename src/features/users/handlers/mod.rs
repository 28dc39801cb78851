pub mod user_handler;

pub use user_handler::{
    __path_create_teacher, __path_delete_user, __path_get_user, __path_list_students,
    __path_list_teachers, __path_search_user, __path_update_user, create_teacher, delete_user,
    get_user, list_students, list_teachers, search_user, update_user,
};
