pub mod book;
pub mod review;
pub mod user;
