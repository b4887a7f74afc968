#![deny(missing_docs)]

//! A Rust client library for the OpenAI API.
//!
//! Binary uploads (audio, images, masks) are sent as multipart/form-data
//! bodies built by [`multipart`]; every response is consumed through a
//! [`transport::StreamingTransport`] that turns the body into a stream of
//! decoded JSON records.

pub mod chat;
pub mod client;
pub mod error;
pub mod models;
pub mod multipart;
pub mod request;
pub mod transport;

pub use client::OpenAI;
pub use error::OpenAIError;
pub use transport::DeliveryMode;
