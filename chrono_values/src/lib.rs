//! C1: tagged `Value`s, the interned/refcounted string cache, and the value
//! operator table of §4.8.

pub mod error;
pub mod ops;
pub mod string_cache;
pub mod value;

pub use error::{Result, ValueError};
pub use ops::{display_bytes, eval_binary, eval_unary, parse_decimal, parse_integer, BinaryOp, UnaryOp};
pub use string_cache::StringCache;
pub use value::{PointerHandle, Value};
