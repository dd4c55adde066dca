mod user_directory_mysql;

pub use user_directory_mysql::*;
