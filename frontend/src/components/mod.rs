pub mod canvas;
pub mod chat;
pub mod graph;
pub mod quiz;
pub mod sidebar;
