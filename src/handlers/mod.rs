// src/handlers/mod.rs

pub mod history;
pub mod learning_path;
pub mod quiz;
