//! Request extractors: authenticated user, current account, JSON bodies.

mod account;
mod auth;

pub use account::CurrentAccount;
pub use auth::{hash_token, AuthUser};

use crate::error::AppError;
use axum::extract::{FromRequest, FromRequestParts};

/// `axum::Json` whose rejection renders the error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Path` with an enveloped rejection.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// `axum::extract::Query` with an enveloped rejection.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);
