//! The interface a builtin needs from its caller (§4.7 "Dynamic dispatch on
//! values"): the string cache and container heap a builtin reads/writes
//! values through, and whatever the host passed in as script arguments
//! (`get_args()`, §6 CLI).
//!
//! `chrono_vm` implements this over its interpreter state; `chrono_builtins`
//! itself never depends on the interpreter, which is what lets the
//! dependency point one way (vm -> builtins, not builtins -> vm).

use chrono_heap::ContainerHeap;
use chrono_values::StringCache;

pub trait Host {
    fn strings(&mut self) -> &mut StringCache;
    fn heap(&mut self) -> &mut ContainerHeap;

    /// Both at once, for builtins (`create_entity`, container-literal
    /// helpers) that need to write a container field — `chrono_heap::set`
    /// takes both mutably and a single `&mut dyn Host` can't yield two
    /// independent mutable borrows through separate trait calls.
    fn strings_and_heap(&mut self) -> (&mut StringCache, &mut ContainerHeap);

    fn script_args(&self) -> &[String];
}
