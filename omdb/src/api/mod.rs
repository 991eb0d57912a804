//! OMDb HTTP API

pub mod client;
pub mod error;
pub mod film;
pub mod response;

pub use client::Client;
pub use error::ApiError;
pub use film::FilmResponse;
