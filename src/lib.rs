//! Wizard Flow — sequential multi-step form engine for the marketplace wizards.

pub mod cli;
pub mod config;
pub mod error;
pub mod flow;
pub mod store;
pub mod submit;
pub mod wizards;
