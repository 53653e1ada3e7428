pub mod batch;
pub mod extract;
pub mod input;
pub mod portal;
pub mod profiles;
pub mod sink;
