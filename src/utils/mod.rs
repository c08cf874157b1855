pub mod data;
pub mod standings;
pub mod validator;
