//! Parser for the configuration template language

mod grammar;
pub mod lexer;
pub mod value;

pub use grammar::parse;
pub use value::{Map, MapStyle, Value};
