pub mod auth_handler;

pub use auth_handler::{
    __path_get_me, __path_login, __path_refresh_token, __path_register, get_me, login,
    refresh_token, register,
};
