//! The HTTP layer: client construction and the fetch pipeline.

#[doc(inline)]
pub use auth::*;
#[doc(inline)]
pub use compression::*;
#[doc(inline)]
pub use proxy::*;
#[doc(inline)]
pub use reqwest::*;
#[doc(inline)]
pub use wrapped::*;

pub(crate) mod auth;
pub(crate) mod compression;
pub(crate) mod proxy;
pub(crate) mod reqwest;
pub(crate) mod wrapped;
