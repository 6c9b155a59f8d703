pub(crate) mod error_shapes;
pub mod notion;
pub mod openai_chat;
