mod common;
mod screening;
