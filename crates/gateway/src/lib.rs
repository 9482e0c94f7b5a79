//! The content gateway: serves one file at a time out of an extracted
//! artifact, with strict path handling and content-type dependent security
//! headers.
//!
//! The gateway never consults the artifact store. It only trusts the
//! directory layout the store produces: `<base>/<40 hex chars>/<files>`.

pub mod error;
mod gateway;
mod headers;
mod mime;
mod path;

pub use crate::gateway::{ContentFile, ContentGateway, not_found};
pub use crate::headers::CONTENT_SECURITY_POLICY_VALUE;
pub use crate::mime::mime_type;
pub use crate::path::{DEFAULT_FILE, sanitize_path};
