// src/handlers/mod.rs

pub mod exams;
pub mod marks;
pub mod reports;
pub mod subjects;
