//! HTTP handlers for the Gelateria Management Platform

pub mod audit;
pub mod auth;
pub mod haccp;
pub mod health;
pub mod ingredient;
pub mod pricing;
pub mod product;
pub mod production;
pub mod recipe;
pub mod reporting;
pub mod template;
pub mod warehouse;

pub use audit::*;
pub use auth::*;
pub use haccp::*;
pub use health::*;
pub use ingredient::*;
pub use pricing::*;
pub use product::*;
pub use production::*;
pub use recipe::*;
pub use reporting::*;
pub use template::*;
pub use warehouse::*;
