pub mod parse;
pub mod time;
