//! EWS response decoding
//!
//! Turns the bytes of an Exchange Web Services response, XML or JSON, into
//! classified envelopes, typed objects, result pages and change feeds.
//! Decoding is synchronous and single-pass: one cursor per response, no
//! backtracking.
//!
//! ## Module Organization
//!
//! - `cursor/`: pull-style cursors over both encodings
//! - `registry/`: discriminator table and polymorphic materialization
//! - `objects/`: items, folders and attachments decoded by the registry
//! - `response/`: response classes, error codes and error-detail hooks
//! - `soap`: outer envelope and faults
//! - `paging/`: outbound views and decoded result pages
//! - `sync/`: change feeds and sync requests
//! - `writer/`: outbound request fragments
//! - `config/`: decoder configuration
//! - `types/`: errors and property paths
//!
//! ```no_run
//! use ews::cursor::{open_cursor, Encoding};
//! use ews::paging::PageBody;
//! use ews::registry::DecodeContext;
//! use ews::response::{decode_operation_response, MessageXmlHook};
//! use ews::soap::{finish_envelope, read_envelope};
//!
//! # fn main() -> ews::Result<()> {
//! let bytes = std::fs::read("find-item-response.xml")?;
//! let mut cursor = open_cursor(Encoding::Xml, &bytes)?;
//! let header = read_envelope(cursor.as_mut())?;
//! let ctx = DecodeContext::global();
//! let pages = decode_operation_response(cursor.as_mut(), &ctx, PageBody::flat, &mut MessageXmlHook)?;
//! finish_envelope(cursor.as_mut(), &header)?;
//! # let _ = pages;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod cursor;
pub mod objects;
pub mod paging;
pub mod registry;
pub mod response;
pub mod soap;
pub mod sync;
pub mod types;
pub mod writer;

pub use cursor::{Encoding, TreeCursor};
pub use registry::{DecodeContext, ObjectMaterializer, TypeRegistry};
pub use response::{ResponseClass, ResponseEnvelope, ServiceResponse};
pub use types::error::{EwsError, Result};
