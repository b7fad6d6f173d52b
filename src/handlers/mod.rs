// src/handlers/mod.rs

pub mod auth;
pub mod banks;
pub mod exams;
pub mod questions;
pub mod records;
