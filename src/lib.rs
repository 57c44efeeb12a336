pub mod app;
pub mod audio;
pub mod config;
pub mod features;
pub mod gfx;
pub mod scene;
