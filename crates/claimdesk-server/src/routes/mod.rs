pub mod claims;
pub mod events;
pub mod health;
pub mod moderator;
pub mod review;
