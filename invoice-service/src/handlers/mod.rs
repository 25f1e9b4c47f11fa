pub mod download;
pub mod email;
pub mod extract;
pub mod health;
pub mod logo;
pub mod notify;
