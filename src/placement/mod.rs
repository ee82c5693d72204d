// src/placement/mod.rs

//! The adaptive placement engine: question selection, batch integrity,
//! grading, level inference, course recommendation and path composition.

pub mod advisor;
pub mod classifier;
pub mod completion;
pub mod composer;
pub mod question_bank;
pub mod recommender;
pub mod scorer;
pub mod session;
