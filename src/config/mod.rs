pub mod env;

pub use env::RuntimeEnv;
