pub mod code;
pub mod jwt;
pub mod retry;
pub mod time;
