mod base;
mod organization;
mod role;
mod user;

pub use base::Base;
pub use organization::Organization;
pub use role::Role;
pub use user::User;
