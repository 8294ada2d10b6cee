//! Outer envelope
//!
//! ```xml
//! <s:Envelope>
//!   <s:Header><t:ServerVersionInfo MajorVersion="15" .../></s:Header>
//!   <s:Body><m:FindItemResponse>...</m:FindItemResponse></s:Body>
//! </s:Envelope>
//! ```
//!
//! In JSON the same shape is an untagged root object with `Header` and
//! `Body` keys.

use tracing::{debug, trace};

use crate::cursor::{Namespace, TreeCursor, TreeCursorExt};
use crate::types::error::{EwsError, Result};

/// Version of the server that produced the response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerVersionInfo {
    pub major_version: Option<u32>,
    pub minor_version: Option<u32>,
    pub major_build_number: Option<u32>,
    pub minor_build_number: Option<u32>,
    pub version: Option<String>,
}

impl ServerVersionInfo {
    fn read(cursor: &mut dyn TreeCursor) -> Result<Self> {
        let info = Self {
            major_version: cursor.read_attribute_as("MajorVersion")?,
            minor_version: cursor.read_attribute_as("MinorVersion")?,
            major_build_number: cursor.read_attribute_as("MajorBuildNumber")?,
            minor_build_number: cursor.read_attribute_as("MinorBuildNumber")?,
            version: cursor.read_attribute("Version").map(str::to_string),
        };
        cursor.skip_subtree()?;
        Ok(info)
    }
}

/// What was read before the body, and where the body sits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub server_version: Option<ServerVersionInfo>,
    body_depth: usize,
}

/// Consume the envelope up to the first element inside `Body`
///
/// The cursor must not have been advanced yet. On return it sits on the
/// element-start of the operation response. A `Fault` body is decoded and
/// returned as `EwsError::SoapFault`.
pub fn read_envelope(cursor: &mut dyn TreeCursor) -> Result<EnvelopeHeader> {
    cursor.require_start_of(Namespace::Soap, "Envelope")?;
    let depth = cursor.depth();
    let mut header = EnvelopeHeader::default();

    while cursor.next_child(depth)? {
        let name = cursor.local_name().to_string();
        match name.as_str() {
            "Header" => header.server_version = read_header(cursor)?,
            "Body" => {
                header.body_depth = cursor.depth();
                if !cursor.next_child(header.body_depth)? {
                    return Err(EwsError::desync("operation response", "empty Body"));
                }
                if cursor.local_name() == "Fault" {
                    return Err(read_fault(cursor)?);
                }
                return Ok(header);
            }
            _ => {
                trace!("Skipping {} in envelope", name);
                cursor.skip_subtree()?;
            }
        }
    }
    Err(EwsError::desync("<Body>", "end of Envelope"))
}

/// Consume the rest of the envelope after the operation response
pub fn finish_envelope(cursor: &mut dyn TreeCursor, header: &EnvelopeHeader) -> Result<()> {
    while cursor.next_child(header.body_depth)? {
        cursor.skip_subtree()?;
    }
    cursor.ensure_end_of(Namespace::Soap, "Body")?;
    let envelope_depth = header.body_depth.saturating_sub(1);
    while cursor.next_child(envelope_depth)? {
        cursor.skip_subtree()?;
    }
    cursor.ensure_end_of(Namespace::Soap, "Envelope")
}

fn read_header(cursor: &mut dyn TreeCursor) -> Result<Option<ServerVersionInfo>> {
    let depth = cursor.depth();
    let mut server_version = None;
    while cursor.next_child(depth)? {
        if cursor.local_name() == "ServerVersionInfo" {
            server_version = Some(ServerVersionInfo::read(cursor)?);
        } else {
            cursor.skip_subtree()?;
        }
    }
    Ok(server_version)
}

fn read_fault(cursor: &mut dyn TreeCursor) -> Result<EwsError> {
    let depth = cursor.depth();
    let mut code = String::new();
    let mut message = String::new();
    let mut response_code = None;

    while cursor.next_child(depth)? {
        let name = cursor.local_name().to_string();
        match name.as_str() {
            "faultcode" => {
                let raw = cursor.read_leaf_text()?;
                // s:Client -> Client
                code = raw.rsplit(':').next().unwrap_or_default().to_string();
            }
            "faultstring" => message = cursor.read_leaf_text()?,
            "detail" => {
                let detail_depth = cursor.depth();
                while cursor.next_child(detail_depth)? {
                    let name = cursor.local_name().to_string();
                    match name.as_str() {
                        "ResponseCode" => response_code = Some(cursor.read_leaf_text()?),
                        "Message" if message.is_empty() => message = cursor.read_leaf_text()?,
                        _ => cursor.skip_subtree()?,
                    }
                }
            }
            _ => cursor.skip_subtree()?,
        }
    }

    debug!("SOAP fault {}: {}", code, message);
    Ok(EwsError::SoapFault {
        code,
        message,
        response_code,
    })
}
