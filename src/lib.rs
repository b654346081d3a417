pub mod app;
pub mod catalog;
pub mod config;
pub mod input;
pub mod nav;
pub mod overlay;
pub mod render;
pub mod theme;
