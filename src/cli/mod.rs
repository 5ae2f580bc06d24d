pub mod list;
pub mod load;
pub mod sessions;
pub mod user;
