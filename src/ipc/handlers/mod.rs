pub mod announcements;
pub mod attendance;
pub mod classes;
pub mod core;
pub mod coursework;
pub mod feed;
pub mod people;
pub mod session;
pub mod setup;
