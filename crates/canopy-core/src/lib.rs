//! Shared domain records for the canopy control plane
//!
//! Servers, clients and matrix keys are plain data. Policy lives in
//! `canopy-matrix`; persistence lives in `canopy-registry`.

#![allow(clippy::must_use_candidate)]

mod client;
mod error;
mod ident;
mod matrix;
mod server;

pub use client::{Client, DefaultPolicy, builtin_clients};
pub use error::HttpError;
pub use ident::{InvalidIdentifier, validate_identifier};
pub use matrix::MatrixKey;
pub use server::{InvalidServer, Server, ServerStatus};
