pub mod auth;
pub mod hasher;
pub mod image;
pub mod jwt;
pub mod permissions;
pub mod validators;
