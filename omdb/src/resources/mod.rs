//! Resource implementations

pub mod film;

pub use film::FilmResource;
