//! Small helpers shared by services.
//!
//! - [`code_generator`] - short code generation and custom code validation
//! - [`password`] - argon2id hashing and the password policy
//! - [`url_validator`] - long URL checks

pub mod code_generator;
pub mod password;
pub mod url_validator;
