// src/models/mod.rs

pub mod course;
pub mod learning_path;
pub mod placement;
pub mod question;
pub mod quiz;
