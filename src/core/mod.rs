pub mod input;
pub mod observable;
