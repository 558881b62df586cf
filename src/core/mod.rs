pub mod gfx;
pub mod network;
