/**
 * Routes Module
 * API route handlers
 */

pub mod admins;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod manage;
pub mod public;
pub mod upload;

pub use crate::error::ErrorResponse;
