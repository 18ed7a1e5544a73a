// Library root: domain records, the draw engine, and the local storage /
// configuration / CSV collaborators that feed it.

pub mod config;
pub mod db;
pub mod draw;
pub mod model;
pub mod roster_csv;
