pub mod company;
pub mod notification;
pub mod project;
pub mod quote;
pub mod user;
