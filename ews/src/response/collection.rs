use tracing::trace;

use super::{decode_response_with_hook, ErrorDetailHook, ResponseBody, ServiceResponse};
use crate::cursor::TreeCursor;
use crate::registry::DecodeContext;
use crate::types::error::{EwsError, Result};

/// Decode a `ResponseMessages` collection, one envelope per child
///
/// A batch request gets one response message per request entry, in request
/// order. Each child gets a fresh body from `make_body`.
pub fn decode_response_messages<B, F>(
    cursor: &mut dyn TreeCursor,
    ctx: &DecodeContext,
    mut make_body: F,
    hook: &mut dyn ErrorDetailHook,
) -> Result<Vec<ServiceResponse<B::Output>>>
where
    B: ResponseBody,
    F: FnMut() -> B,
{
    let depth = cursor.depth();
    let mut responses = Vec::new();
    while cursor.next_child(depth)? {
        responses.push(decode_response_with_hook(cursor, make_body(), ctx, hook)?);
    }
    Ok(responses)
}

/// Decode an operation response element (`FindItemResponse`, ...)
///
/// The cursor must be on the operation element-start; it is left on its
/// element-end.
pub fn decode_operation_response<B, F>(
    cursor: &mut dyn TreeCursor,
    ctx: &DecodeContext,
    make_body: F,
    hook: &mut dyn ErrorDetailHook,
) -> Result<Vec<ServiceResponse<B::Output>>>
where
    B: ResponseBody,
    F: FnMut() -> B,
{
    if !cursor.is_start() {
        return Err(EwsError::UnexpectedNode(format!(
            "operation response expected, found {}",
            cursor.describe()
        )));
    }
    let operation = cursor.local_name().to_string();
    let depth = cursor.depth();
    let mut make_body = make_body;
    let mut responses = None;
    while cursor.next_child(depth)? {
        if responses.is_none() && cursor.local_name() == "ResponseMessages" {
            responses = Some(decode_response_messages(cursor, ctx, &mut make_body, hook)?);
        } else {
            trace!("Skipping {} in {}", cursor.local_name(), operation);
            cursor.skip_subtree()?;
        }
    }
    responses.ok_or_else(|| EwsError::desync("<ResponseMessages>", format!("end of {operation}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::{JsonCursor, Namespace, XmlCursor};
    use crate::registry::TypeRegistry;
    use crate::response::{MessageXmlHook, NoBody, ResponseClass, ServiceError};

    #[test]
    fn test_batch_in_order() {
        let xml = r#"<m:DeleteItemResponse xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages">
            <m:ResponseMessages>
                <m:DeleteItemResponseMessage ResponseClass="Success"><m:ResponseCode>NoError</m:ResponseCode></m:DeleteItemResponseMessage>
                <m:DeleteItemResponseMessage ResponseClass="Error"><m:MessageText>gone</m:MessageText><m:ResponseCode>ErrorItemNotFound</m:ResponseCode></m:DeleteItemResponseMessage>
                <m:DeleteItemResponseMessage ResponseClass="Warning"><m:MessageText>stopped</m:MessageText><m:ResponseCode>ErrorBatchProcessingStopped</m:ResponseCode></m:DeleteItemResponseMessage>
            </m:ResponseMessages>
        </m:DeleteItemResponse>"#;
        let ctx = DecodeContext::new(TypeRegistry::global());
        let mut cursor = XmlCursor::from_str(xml);
        cursor.advance().unwrap();
        let responses =
            decode_operation_response(&mut cursor, &ctx, || NoBody, &mut MessageXmlHook).unwrap();
        let classes: Vec<ResponseClass> = responses.iter().map(|r| r.envelope.class).collect();
        assert_eq!(
            classes,
            vec![ResponseClass::Success, ResponseClass::Error, ResponseClass::Warning]
        );
        assert_eq!(responses[0].body, Some(()));
        assert_eq!(responses[1].envelope.code, ServiceError::ErrorItemNotFound);
        assert!(responses[2].envelope.batch_stopped);
        assert!(cursor.is_end_of(Namespace::Messages, "DeleteItemResponse"));
    }

    #[test]
    fn test_json_batch() {
        let json = r#"{
            "__type": "DeleteItemResponse",
            "ResponseMessages": [
                {"__type": "DeleteItemResponseMessage", "ResponseClass": "Success", "ResponseCode": "NoError"},
                {"__type": "DeleteItemResponseMessage", "ResponseClass": "Success", "ResponseCode": "NoError"}
            ]
        }"#;
        let ctx = DecodeContext::new(TypeRegistry::global());
        let mut cursor = JsonCursor::from_str(json).unwrap();
        cursor.advance().unwrap();
        let responses =
            decode_operation_response(&mut cursor, &ctx, || NoBody, &mut MessageXmlHook).unwrap();
        assert_eq!(responses.len(), 2);
        assert!(responses.iter().all(|r| r.envelope.is_success()));
    }

    #[test]
    fn test_missing_response_messages() {
        let ctx = DecodeContext::new(TypeRegistry::global());
        let mut cursor = XmlCursor::from_str("<GetItemResponse><Other/></GetItemResponse>");
        cursor.advance().unwrap();
        let err = decode_operation_response(&mut cursor, &ctx, || NoBody, &mut MessageXmlHook)
            .unwrap_err();
        assert!(matches!(err, EwsError::ProtocolDesync { .. }));
    }
}
