use crate::keys::ClassId;
use crate::vm::stack::FrameStack;

/// State of the single interpreter thread: its name, the class it was
/// started on, and its frame chain. Only the bootstrap "main" thread ever
/// exists; Java-level threads are never started.
pub struct JavaThreadState {
    pub name: String,
    pub base_class: ClassId,
    pub stack: FrameStack,
}

impl JavaThreadState {
    pub fn new(name: impl Into<String>, base_class: ClassId, max_frames: usize) -> Self {
        JavaThreadState {
            name: name.into(),
            base_class,
            stack: FrameStack::new(max_frames),
        }
    }
}
