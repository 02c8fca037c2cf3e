/* demo/backend/rust/src/handlers/mod.rs */

pub mod get_user;
pub mod ticks;

pub use get_user::get_user_handler;
pub use ticks::ticks_handler;
