pub mod controller;
pub mod duplicate;
pub mod error;
pub mod formats;
pub mod hash;
pub mod progress;
pub mod scanner;
pub mod worker;
