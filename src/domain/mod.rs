pub mod entity;
pub mod grid;
pub mod push;
pub mod world;
