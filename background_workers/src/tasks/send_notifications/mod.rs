pub mod email;
mod template;
