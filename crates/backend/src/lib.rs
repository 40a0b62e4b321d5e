//! REST client for the campaign backend service.

pub mod client;

pub use client::{
    ApiError, BackendClient, DeleteResponse, Fund, FundDraft, PhotoUploadResponse, User,
};
