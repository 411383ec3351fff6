pub mod cookies;
pub mod csv;
pub mod data_url;
pub mod email;
pub mod jwt;
pub mod password;
pub mod text;
pub mod time;

pub use jwt::*;
pub use password::*;
