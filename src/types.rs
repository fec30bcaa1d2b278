pub mod job;
pub mod protocol;
pub mod reply;
pub mod serialisable;
pub mod states;
