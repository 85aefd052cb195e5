//! Prep Assist — WhatsApp interview-practice and advice coach.

pub mod catalog;
pub mod channels;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod llm;
pub mod store;
pub mod sweeper;
