pub mod premium;
pub mod prompt;
pub mod user;

pub use user::Language;
