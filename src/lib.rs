//! Blogicum - a small server-rendered blog
//!
//! Posts grouped by category and tagged with a location, per-user profiles,
//! and comments. Pages are rendered with Tera; storage is SQLite or MySQL.

pub mod config;
pub mod db;
pub mod forms;
pub mod models;
pub mod services;
pub mod theme;
pub mod web;
