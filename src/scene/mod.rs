pub mod focus;
pub mod render;
pub mod timeline;
