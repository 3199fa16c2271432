pub mod backends;
pub mod fixtures;

#[allow(unused_imports)]
pub use backends::*;
#[allow(unused_imports)]
pub use fixtures::*;
