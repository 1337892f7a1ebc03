//! HTTP request handlers.
//!
//! Each handler binds its input, calls one service operation and maps the result.

pub mod auth;
pub mod health;
pub mod links;
pub mod redirect;

pub use auth::{
    forgot_password_handler, login_handler, logout_handler, me_handler, refresh_handler,
    register_handler, reset_password_handler,
};
pub use health::health_handler;
pub use links::{
    create_anonymous_handler, create_link_handler, delete_link_handler, get_link_handler,
    link_stats_handler, list_links_handler,
};
pub use redirect::redirect_handler;
