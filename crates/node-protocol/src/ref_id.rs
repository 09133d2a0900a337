//! Opaque handler references (spec §4.5, §9 "Opaque handler references").
//!
//! `add_*_push_handler` returns a `HandlerRef`; `remove_*_push_handler`
//! accepts one back. The pair `(slot index, generation)` lets the handler
//! registry reuse a freed slot without a removed-then-reused reference
//! colliding with a fresh one — removing an already-freed or foreign
//! reference is then a safe, silent no-op (spec §4.5: "double-remove is a
//! silent no-op") rather than a use-after-free.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerRef {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

impl HandlerRef {
    pub fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}
