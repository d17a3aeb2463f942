//! REST API handlers

pub mod health;
pub mod pages;
pub mod subscription;

pub use health::*;
pub use pages::*;
pub use subscription::*;
