pub mod check;
pub mod dispatch;
pub mod validate;

pub use dispatch::dispatch;
