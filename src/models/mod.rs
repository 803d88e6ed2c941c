pub mod client;
pub mod note;
pub mod tag;
pub mod token;
pub mod user;
