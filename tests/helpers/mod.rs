pub mod builders;

pub use builders::{HandlerBuilder, MethodBuilder};
