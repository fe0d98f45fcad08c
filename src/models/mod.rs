// src/models/mod.rs

pub mod assignment;
pub mod exam;
pub mod mark;
pub mod report;
