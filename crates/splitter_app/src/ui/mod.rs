pub mod printer;
pub mod render;
