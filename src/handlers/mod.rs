pub mod health;
pub mod search;
