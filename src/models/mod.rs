// src/models/mod.rs

pub mod exam;
pub mod exam_record;
pub mod pagination;
pub mod question;
pub mod user;
