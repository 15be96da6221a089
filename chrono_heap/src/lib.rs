//! C2: the container heap (`Object`/`List`) and its tri-color GC (§3, §4.1,
//! §5), plus the §4.8 container get/set operators and their write barrier.

pub mod error;
pub mod gc;
pub mod heap;
pub mod list;
pub mod object;
pub mod ops;

pub use error::{HeapError, Result};
pub use gc::GcColor;
pub use heap::{Container, ContainerHeap};
pub use list::ScriptList;
pub use object::ScriptObject;
pub use ops::{get, push, ref_value, set, unref_value};
