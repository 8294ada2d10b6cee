//! Response classification
//!
//! Every logical response is wrapped in a response message element carrying
//! a `ResponseClass` attribute. The header (`MessageText`, `ResponseCode`,
//! `DescriptiveLinkKey`) is decoded here once; the remaining children go to
//! the body decoder on success and warning, or to the error-detail hooks on
//! error. A warning with `ErrorBatchProcessingStopped` is a valid outcome
//! without usable payload: its body is skipped, never decoded.

pub mod codes;
pub mod collection;
pub mod details;
pub mod policy;

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

pub use codes::ServiceError;
pub use collection::{decode_operation_response, decode_response_messages};
pub use details::{ErrorDetailHook, HookChain, IdListHook, MessageXmlHook};
pub use policy::ErrorPolicy;

use crate::cursor::{TreeCursor, TreeCursorExt};
use crate::objects::ServiceId;
use crate::registry::DecodeContext;
use crate::types::error::{EwsError, Result};
use crate::types::PropertyPath;

/// Outcome class of one logical response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseClass {
    Success,
    Warning,
    Error,
}

impl FromStr for ResponseClass {
    type Err = EwsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Success" => Ok(ResponseClass::Success),
            "Warning" => Ok(ResponseClass::Warning),
            "Error" => Ok(ResponseClass::Error),
            other => Err(EwsError::UnknownResponseClass(other.to_string())),
        }
    }
}

impl fmt::Display for ResponseClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResponseClass::Success => "Success",
            ResponseClass::Warning => "Warning",
            ResponseClass::Error => "Error",
        };
        f.write_str(name)
    }
}

/// Classification of one logical response
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    /// Name of the response message element, e.g. `FindItemResponseMessage`
    pub element_name: String,
    pub class: ResponseClass,
    pub code: ServiceError,
    pub message: Option<String>,
    pub descriptive_link_key: Option<i32>,
    /// Name/value pairs of the structured error payload, in wire order
    pub details: IndexMap<String, String>,
    /// Properties the error relates to, in wire order
    pub properties: Vec<PropertyPath>,
    /// Identifiers reported by an operation-specific hook
    pub error_ids: Vec<ServiceId>,
    /// The batch was stopped before this response: no payload
    pub batch_stopped: bool,
}

impl ResponseEnvelope {
    pub fn new(element_name: impl Into<String>, class: ResponseClass) -> Self {
        Self {
            element_name: element_name.into(),
            class,
            code: ServiceError::NoError,
            message: None,
            descriptive_link_key: None,
            details: IndexMap::new(),
            properties: Vec::new(),
            error_ids: Vec::new(),
            batch_stopped: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.class == ResponseClass::Success
    }

    pub fn is_error(&self) -> bool {
        self.class == ResponseClass::Error
    }

    /// Whether a body decoder runs for this envelope
    pub fn has_body(&self) -> bool {
        self.class != ResponseClass::Error && !self.batch_stopped
    }

    fn set_code(&mut self, code: ServiceError) {
        self.batch_stopped =
            self.class == ResponseClass::Warning && code == ServiceError::ErrorBatchProcessingStopped;
        self.code = code;
    }

    fn remap_message(&mut self) {
        if let Some(friendly) = self.code.friendly_message() {
            self.message = Some(friendly.to_string());
        }
    }
}

impl fmt::Display for ResponseEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.element_name, self.class, self.code)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        for (name, value) in &self.details {
            write!(f, "; {name}={value}")?;
        }
        if !self.properties.is_empty() {
            let properties: Vec<String> = self.properties.iter().map(|p| p.to_string()).collect();
            write!(f, "; properties: {}", properties.join(", "))?;
        }
        Ok(())
    }
}

/// Decoder of the payload of a response message
pub trait ResponseBody {
    type Output;

    /// Try to consume one child of the response message element
    ///
    /// Same contract as a field decoder: return `true` with the cursor on
    /// the child's element-end, or `false` without moving.
    fn decode_element(&mut self, cursor: &mut dyn TreeCursor, ctx: &DecodeContext) -> Result<bool>;

    /// Produce the decoded payload once the response message is consumed
    fn finish(self) -> Result<Self::Output>;
}

/// Decoded envelope plus the body, when one was decoded
#[derive(Debug)]
pub struct ServiceResponse<T> {
    pub envelope: ResponseEnvelope,
    pub body: Option<T>,
}

impl<T> ServiceResponse<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ServiceResponse<U> {
        ServiceResponse {
            envelope: self.envelope,
            body: self.body.map(f),
        }
    }
}

/// Decode the response message the cursor is positioned on, with the
/// default error-detail hook
pub fn decode_response<B: ResponseBody>(
    cursor: &mut dyn TreeCursor,
    body: B,
    ctx: &DecodeContext,
) -> Result<ServiceResponse<B::Output>> {
    decode_response_with_hook(cursor, body, ctx, &mut MessageXmlHook)
}

/// Decode the response message the cursor is positioned on
///
/// Leaves the cursor on the element-end of the response message.
pub fn decode_response_with_hook<B: ResponseBody>(
    cursor: &mut dyn TreeCursor,
    mut body: B,
    ctx: &DecodeContext,
    hook: &mut dyn ErrorDetailHook,
) -> Result<ServiceResponse<B::Output>> {
    if !cursor.is_start() {
        return Err(EwsError::UnexpectedNode(format!(
            "response message expected, found {}",
            cursor.describe()
        )));
    }
    let element_name = cursor.local_name().to_string();
    let class: ResponseClass = match cursor.read_attribute("ResponseClass") {
        Some(class) => class.parse()?,
        None => {
            return Err(EwsError::malformed(
                format!("{element_name}@ResponseClass"),
                "",
                "Success, Warning or Error",
            ))
        }
    };

    let mut envelope = ResponseEnvelope::new(element_name, class);
    let namespace = cursor.namespace();
    let depth = cursor.depth();
    // JSON echoes the code as an attribute: known before any body key
    let mut code_seen = false;
    if let Some(code) = cursor.read_attribute("ResponseCode") {
        envelope.set_code(ServiceError::from_code(code));
        code_seen = true;
    }

    while cursor.next_child(depth)? {
        let name = cursor.local_name().to_string();
        match name.as_str() {
            "MessageText" => envelope.message = Some(cursor.read_leaf_text()?),
            "ResponseCode" => {
                envelope.set_code(cursor.read_leaf_value()?);
                code_seen = true;
            }
            "DescriptiveLinkKey" if class != ResponseClass::Success => {
                envelope.descriptive_link_key = Some(cursor.read_leaf_value()?)
            }
            _ if !code_seen || envelope.batch_stopped => cursor.skip_subtree()?,
            _ => {
                let consumed = match class {
                    ResponseClass::Success => body.decode_element(cursor, ctx)?,
                    ResponseClass::Warning => {
                        body.decode_element(cursor, ctx)?
                            || hook.load_extra_error_details(cursor, &mut envelope)?
                    }
                    ResponseClass::Error => hook.load_extra_error_details(cursor, &mut envelope)?,
                };
                if !consumed {
                    trace!("Skipping {} in {}", name, envelope.element_name);
                    cursor.skip_subtree()?;
                }
            }
        }
    }
    cursor.ensure_end_of(namespace, &envelope.element_name)?;

    if !code_seen {
        return Err(EwsError::desync(
            "<ResponseCode>",
            format!("end of {}", envelope.element_name),
        ));
    }
    if ctx.remap_error_messages {
        envelope.remap_message();
    }

    let body = if envelope.batch_stopped {
        warn!("Batch processing stopped before {}", envelope.element_name);
        None
    } else if envelope.is_error() {
        debug!("Error response: {}", envelope);
        None
    } else {
        Some(body.finish()?)
    };

    Ok(ServiceResponse { envelope, body })
}

/// Body of responses without payload (delete, mark-as-read, ...)
#[derive(Debug, Default)]
pub struct NoBody;

impl ResponseBody for NoBody {
    type Output = ();

    fn decode_element(&mut self, _cursor: &mut dyn TreeCursor, _ctx: &DecodeContext) -> Result<bool> {
        Ok(false)
    }

    fn finish(self) -> Result<()> {
        Ok(())
    }
}
