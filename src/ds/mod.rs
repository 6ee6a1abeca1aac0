pub mod deadline_heap;

pub use deadline_heap::DeadlineHeap;
