mod common;

use std::cell::Cell;

use ews::cursor::{Namespace, XmlCursor};
use ews::objects::Message;
use ews::paging::{ObjectFetchBody, PageBody};
use ews::registry::DecodeContext;
use ews::response::{
    decode_operation_response, decode_response, ErrorPolicy, MessageXmlHook, ResponseBody,
    ServiceError,
};
use ews::soap::{finish_envelope, read_envelope};
use ews::types::PropertyPath;
use ews::{EwsError, ResponseClass, TreeCursor};

/// Body decoder recording whether it was ever called
struct Recorder<'a> {
    invoked: &'a Cell<bool>,
}

impl ResponseBody for Recorder<'_> {
    type Output = ();

    fn decode_element(&mut self, cursor: &mut dyn TreeCursor, _ctx: &DecodeContext) -> ews::Result<bool> {
        self.invoked.set(true);
        cursor.skip_subtree()?;
        Ok(true)
    }

    fn finish(self) -> ews::Result<()> {
        self.invoked.set(true);
        Ok(())
    }
}

const BATCH_STOPPED_XML: &str = r#"<m:GetItemResponseMessage ResponseClass="Warning"
        xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages"
        xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types">
    <m:MessageText>This response isn't processed because of an earlier error.</m:MessageText>
    <m:ResponseCode>ErrorBatchProcessingStopped</m:ResponseCode>
    <m:DescriptiveLinkKey>0</m:DescriptiveLinkKey>
    <m:Items><t:Message><t:Subject>never read</t:Subject></t:Message></m:Items>
</m:GetItemResponseMessage>"#;

const BATCH_STOPPED_JSON: &str = r#"{
    "__type": "GetItemResponseMessage:#Exchange",
    "ResponseClass": "Warning",
    "MessageText": "This response isn't processed because of an earlier error.",
    "ResponseCode": "ErrorBatchProcessingStopped",
    "DescriptiveLinkKey": 0,
    "Items": [{"__type": "Message:#Exchange", "Subject": "never read"}]
}"#;

#[test_log::test]
fn test_batch_stopped_skips_body() {
    for (encoding, mut cursor) in common::both(BATCH_STOPPED_XML, BATCH_STOPPED_JSON) {
        let invoked = Cell::new(false);
        let response = decode_response(
            cursor.as_mut(),
            Recorder { invoked: &invoked },
            &DecodeContext::global(),
        )
        .unwrap();

        assert!(!invoked.get(), "{encoding}: body decoder was invoked");
        assert!(response.envelope.batch_stopped, "{encoding}");
        assert_eq!(response.envelope.class, ResponseClass::Warning, "{encoding}");
        assert_eq!(response.envelope.code, ServiceError::ErrorBatchProcessingStopped);
        assert_eq!(response.envelope.descriptive_link_key, Some(0));
        assert!(response.body.is_none());
        assert!(cursor.is_end_of(Namespace::Any, "GetItemResponseMessage"));
    }
}

const SOAP_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Header>
    <h:ServerVersionInfo xmlns:h="http://schemas.microsoft.com/exchange/services/2006/types" MajorVersion="15" MinorVersion="1"/>
  </s:Header>
  <s:Body>
    <m:FindItemResponse xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages"
        xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types">
      <m:ResponseMessages>
        <m:FindItemResponseMessage ResponseClass="Success">
          <m:ResponseCode>NoError</m:ResponseCode>
          <m:RootFolder TotalItemsInView="1" IncludesLastItemInRange="true">
            <t:Items>
              <t:Message>
                <t:ItemId Id="AAMk1"/>
                <t:Subject>Quarterly report</t:Subject>
                <t:IsRead>false</t:IsRead>
              </t:Message>
            </t:Items>
          </m:RootFolder>
        </m:FindItemResponseMessage>
        <m:FindItemResponseMessage ResponseClass="Error">
          <m:MessageText>The specified object was not found in the store.</m:MessageText>
          <m:ResponseCode>ErrorInvalidPropertyRequest</m:ResponseCode>
          <m:DescriptiveLinkKey>0</m:DescriptiveLinkKey>
          <m:MessageXml>
            <t:Value Name="InnerErrorMessageText">bad property</t:Value>
            <t:FieldURI FieldURI="item:Subject"/>
          </m:MessageXml>
        </m:FindItemResponseMessage>
      </m:ResponseMessages>
    </m:FindItemResponse>
  </s:Body>
</s:Envelope>"#;

const SOAP_JSON: &str = r#"{
  "Header": {"ServerVersionInfo": {"MajorVersion": 15, "MinorVersion": 1}},
  "Body": {
    "FindItemResponse": {
      "__type": "FindItemResponse:#Exchange",
      "ResponseMessages": [
        {
          "__type": "FindItemResponseMessage:#Exchange",
          "ResponseClass": "Success",
          "ResponseCode": "NoError",
          "RootFolder": {
            "TotalItemsInView": 1,
            "IncludesLastItemInRange": true,
            "Items": [
              {"__type": "Message:#Exchange", "ItemId": {"Id": "AAMk1"}, "Subject": "Quarterly report", "IsRead": false}
            ]
          }
        },
        {
          "__type": "FindItemResponseMessage:#Exchange",
          "ResponseClass": "Error",
          "MessageText": "The specified object was not found in the store.",
          "ResponseCode": "ErrorInvalidPropertyRequest",
          "DescriptiveLinkKey": 0,
          "MessageXml": {
            "Value": [{"Name": "InnerErrorMessageText", "$text": "bad property"}],
            "FieldURI": {"FieldURI": "item:Subject"}
          }
        }
      ]
    }
  }
}"#;

#[test_log::test]
fn test_full_response_in_both_encodings() {
    for (encoding, mut cursor) in common::documents(SOAP_XML, SOAP_JSON) {
        let cursor = cursor.as_mut();
        let header = read_envelope(cursor).unwrap();
        assert_eq!(
            header.server_version.as_ref().and_then(|v| v.major_version),
            Some(15),
            "{encoding}"
        );

        let ctx = DecodeContext::global();
        let mut responses =
            decode_operation_response(cursor, &ctx, PageBody::flat, &mut MessageXmlHook).unwrap();
        finish_envelope(cursor, &header).unwrap();
        assert_eq!(responses.len(), 2, "{encoding}");

        let failed = responses.pop().unwrap();
        let page = responses.pop().unwrap();

        let results = page
            .into_result(&ErrorPolicy::strict())
            .unwrap()
            .and_then(|page| page.into_flat())
            .unwrap();
        assert_eq!(results.page.total_count(), 1);
        assert!(!results.page.more_available());
        let message = results.objects[0].downcast_ref::<Message>().unwrap();
        assert_eq!(message.item.subject.as_deref(), Some("Quarterly report"));
        assert_eq!(message.is_read, Some(false));

        assert!(failed.body.is_none());
        let err = failed.into_result(&ErrorPolicy::strict()).unwrap_err();
        let envelope = err.envelope().unwrap();
        assert_eq!(envelope.code, ServiceError::ErrorInvalidPropertyRequest);
        assert_eq!(
            envelope.details.get("InnerErrorMessageText").map(String::as_str),
            Some("bad property"),
            "{encoding}"
        );
        assert_eq!(envelope.properties, vec![PropertyPath::field("item:Subject")]);
        assert!(!err.is_structural());
    }
}

#[test_log::test]
fn test_tolerated_error_is_empty_result() {
    let xml = common::xml_response(
        "ResolveNamesResponseMessage",
        "Error",
        "ErrorNameResolutionNoResults",
        "",
    );
    let mut cursor = common::xml(&xml);
    let response = decode_response(cursor.as_mut(), PageBody::flat(), &DecodeContext::global()).unwrap();
    let policy = ErrorPolicy::strict().tolerate(ServiceError::ErrorNameResolutionNoResults);
    assert!(response.into_result(&policy).unwrap().is_none());
}

#[test_log::test]
fn test_stale_version_message_is_remapped() {
    let json = r#"{
        "__type": "UpdateItemResponseMessage",
        "ResponseClass": "Error",
        "MessageText": "The change key passed in the request does not match the current change key for the item.",
        "ResponseCode": "ErrorIrresolvableConflict"
    }"#;
    let mut cursor = common::json(json);
    let response = decode_response(cursor.as_mut(), PageBody::flat(), &DecodeContext::global()).unwrap();
    assert_eq!(
        response.envelope.message.as_deref(),
        Some("The operation can't be performed because the item is out of date. Reload the item and try again.")
    );
}

#[test_log::test]
fn test_unknown_response_class_is_fatal() {
    let xml = common::xml_response("GetItemResponseMessage", "Partial", "NoError", "");
    let mut cursor = common::xml(&xml);
    let err = decode_response(cursor.as_mut(), PageBody::flat(), &DecodeContext::global()).unwrap_err();
    assert!(matches!(err, EwsError::UnknownResponseClass(ref class) if class == "Partial"));
}

#[test_log::test]
fn test_truncated_stream_is_premature_eof() {
    let truncated = &SOAP_XML[..SOAP_XML.find("<t:Subject>").unwrap()];
    let mut cursor = XmlCursor::from_str(truncated);
    read_envelope(&mut cursor).unwrap();
    let err = decode_operation_response(
        &mut cursor,
        &DecodeContext::global(),
        PageBody::flat,
        &mut MessageXmlHook,
    )
    .map(|_| ())
    .unwrap_err();
    assert!(err.is_structural(), "{err}");
}

#[test_log::test]
fn test_json_body_before_response_code() {
    let json = r#"{
        "__type": "GetItemResponseMessage:#Exchange",
        "Items": [{"__type": "Message:#Exchange", "ItemId": {"Id": "M1"}, "Subject": "early"}],
        "ResponseClass": "Success",
        "ResponseCode": "NoError"
    }"#;
    let mut cursor = common::json(json);
    let response =
        decode_response(cursor.as_mut(), ObjectFetchBody::new(), &DecodeContext::global()).unwrap();
    let objects = response.body.unwrap();
    assert_eq!(objects.len(), 1);
    let message = objects[0].downcast_ref::<Message>().unwrap();
    assert_eq!(message.item.subject.as_deref(), Some("early"));
}

#[test_log::test]
fn test_json_error_details_before_response_code() {
    let json = r#"{
        "__type": "GetItemResponseMessage:#Exchange",
        "ResponseClass": "Error",
        "MessageXml": {
            "Value": [{"Name": "InnerErrorMessageText", "$text": "bad property"}]
        },
        "MessageText": "The request failed schema validation.",
        "ResponseCode": "ErrorSchemaValidation"
    }"#;
    let mut cursor = common::json(json);
    let response =
        decode_response(cursor.as_mut(), ObjectFetchBody::new(), &DecodeContext::global()).unwrap();
    assert!(response.body.is_none());
    assert_eq!(response.envelope.code, ServiceError::ErrorSchemaValidation);
    assert_eq!(
        response.envelope.details.get("InnerErrorMessageText").map(String::as_str),
        Some("bad property")
    );
}

#[test_log::test]
fn test_json_batch_stopped_before_response_code() {
    let json = r#"{
        "__type": "GetItemResponseMessage:#Exchange",
        "ResponseClass": "Warning",
        "Items": [{"__type": "Message:#Exchange", "Subject": "never read"}],
        "ResponseCode": "ErrorBatchProcessingStopped"
    }"#;
    let invoked = Cell::new(false);
    let mut cursor = common::json(json);
    let response = decode_response(
        cursor.as_mut(),
        Recorder { invoked: &invoked },
        &DecodeContext::global(),
    )
    .unwrap();
    assert!(!invoked.get());
    assert!(response.envelope.batch_stopped);
    assert!(response.body.is_none());
}
