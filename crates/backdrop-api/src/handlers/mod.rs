pub mod gallery;
pub mod health;
pub mod image;
