//! Crop photo analysis pipeline.
//!
//! Intake normalizes an uploaded photo into a bounded data URL, the vision
//! service forwards it to the inference API, and the validator gates what
//! the model returned before anything reaches the user.

pub mod intake;
pub mod validator;
pub mod vision_service;
