//! Data source implementations

pub mod film_by_id;

pub use film_by_id::FilmByIdDataSource;
