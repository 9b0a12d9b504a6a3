pub mod dispatcher;
pub mod roles;
pub mod runtime;

pub use dispatcher::*;
pub use roles::*;
pub use runtime::*;
