//! Route modules for the PDF to HTML server

pub mod convert;
pub mod health;
pub mod resume;
pub mod upload;
