mod common;

use ews::objects::{Message, ServiceId};
use ews::registry::DecodeContext;
use ews::response::decode_response;
use ews::sync::{
    Change, ChangeFeedDecoder, ChangeShape, ChangeType, SyncFeedResult, SyncFolder, SyncRequest,
    SyncState,
};
use ews::writer::XmlTreeWriter;
use ews::TreeCursor;
use proptest::prelude::*;

const FEED_XML: &str = r#"<m:SyncFolderItemsResponseMessage ResponseClass="Success"
        xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages"
        xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types">
    <m:ResponseCode>NoError</m:ResponseCode>
    <m:SyncState>H4sIAAAAAAAEAGNgYGcAAQ==</m:SyncState>
    <m:IncludesLastItemInRange>false</m:IncludesLastItemInRange>
    <m:Changes>
        <t:Create>
            <t:Message>
                <t:ItemId Id="A" ChangeKey="CQAAAB"/>
                <t:Subject>Lunch?</t:Subject>
                <t:IsRead>false</t:IsRead>
            </t:Message>
        </t:Create>
        <t:Delete><t:ItemId Id="B"/></t:Delete>
        <t:ReadFlagChange><t:ItemId Id="C"/><t:IsRead>true</t:IsRead></t:ReadFlagChange>
    </m:Changes>
</m:SyncFolderItemsResponseMessage>"#;

const FEED_JSON: &str = r#"{
    "__type": "SyncFolderItemsResponseMessage:#Exchange",
    "ResponseClass": "Success",
    "ResponseCode": "NoError",
    "SyncState": "H4sIAAAAAAAEAGNgYGcAAQ==",
    "IncludesLastItemInRange": false,
    "Changes": [
        {"__type": "Create:#Exchange", "Message": {
            "__type": "Message:#Exchange",
            "ItemId": {"Id": "A", "ChangeKey": "CQAAAB"},
            "Subject": "Lunch?",
            "IsRead": false
        }},
        {"__type": "Delete:#Exchange", "ItemId": {"Id": "B"}},
        {"__type": "ReadFlagChange:#Exchange", "ItemId": {"Id": "C"}, "IsRead": true}
    ]
}"#;

fn decode(cursor: &mut dyn TreeCursor, shape: ChangeShape) -> ews::Result<SyncFeedResult> {
    let response = decode_response(cursor, ChangeFeedDecoder::new(shape), &DecodeContext::global())?;
    Ok(response.body.expect("success response has a body"))
}

/// Exactly one of object / read flag / neither, as fixed by the change type
fn assert_exclusive(change: &Change) {
    match change.change_type() {
        ChangeType::Create | ChangeType::Update => {
            assert!(change.object().is_some());
            assert!(change.is_read().is_none());
        }
        ChangeType::ReadFlagChange => {
            assert!(change.object().is_none());
            assert!(change.is_read().is_some());
        }
        ChangeType::Delete => {
            assert!(change.object().is_none());
            assert!(change.is_read().is_none());
        }
    }
}

#[test_log::test]
fn test_mixed_feed_in_both_encodings() {
    for (encoding, mut cursor) in common::both(FEED_XML, FEED_JSON) {
        let feed = decode(cursor.as_mut(), ChangeShape::items()).unwrap();
        assert_eq!(feed.cursor_token.as_str(), "H4sIAAAAAAAEAGNgYGcAAQ==", "{encoding}");
        assert!(feed.more_available, "{encoding}");

        let summary: Vec<(ChangeType, &str)> = feed
            .changes
            .iter()
            .map(|c| (c.change_type(), c.id().id()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (ChangeType::Create, "A"),
                (ChangeType::Delete, "B"),
                (ChangeType::ReadFlagChange, "C"),
            ],
            "{encoding}"
        );
        feed.changes.iter().for_each(assert_exclusive);

        let message = feed.changes[0].object().unwrap().downcast_ref::<Message>().unwrap();
        assert_eq!(message.item.subject.as_deref(), Some("Lunch?"));
        assert_eq!(message.is_read, Some(false));
        assert_eq!(feed.changes[0].id().change_key(), Some("CQAAAB"));
        assert_eq!(feed.changes[2].is_read(), Some(true));
        assert!(matches!(feed.changes[1].id(), ServiceId::Item(_)));
    }
}

#[test_log::test]
fn test_token_round_trips_into_next_request() {
    let mut cursor = common::xml(FEED_XML);
    let feed = decode(cursor.as_mut(), ChangeShape::items()).unwrap();
    let request = SyncRequest::items(SyncFolder::Distinguished("inbox".into()), 512)
        .unwrap()
        .with_sync_state(feed.cursor_token.clone());
    assert_eq!(request.change_shape(), ChangeShape::items());

    let mut writer = XmlTreeWriter::new();
    request.write(&mut writer).unwrap();
    assert!(writer
        .into_string()
        .unwrap()
        .contains("<m:SyncState>H4sIAAAAAAAEAGNgYGcAAQ==</m:SyncState>"));
    assert_eq!(feed.cursor_token, SyncState::new("H4sIAAAAAAAEAGNgYGcAAQ=="));
}

fn change_strategy() -> impl Strategy<Value = Vec<ChangeType>> {
    proptest::collection::vec(
        prop_oneof![
            Just(ChangeType::Create),
            Just(ChangeType::Update),
            Just(ChangeType::Delete),
            Just(ChangeType::ReadFlagChange),
        ],
        0..40,
    )
}

fn feed_xml(changes: &[ChangeType]) -> String {
    let entries: String = changes
        .iter()
        .enumerate()
        .map(|(i, change)| match change {
            ChangeType::Create | ChangeType::Update => format!(
                r#"<t:{change}><t:Message><t:ItemId Id="id{i}"/><t:Subject>s{i}</t:Subject></t:Message></t:{change}>"#
            ),
            ChangeType::Delete => format!(r#"<t:Delete><t:ItemId Id="id{i}"/></t:Delete>"#),
            ChangeType::ReadFlagChange => format!(
                r#"<t:ReadFlagChange><t:ItemId Id="id{i}"/><t:IsRead>{}</t:IsRead></t:ReadFlagChange>"#,
                i % 2 == 0
            ),
        })
        .collect();
    common::xml_response(
        "SyncFolderItemsResponseMessage",
        "Success",
        "NoError",
        &format!(
            "<m:SyncState>s</m:SyncState><m:IncludesLastItemInRange>true</m:IncludesLastItemInRange><m:Changes>{entries}</m:Changes>"
        ),
    )
}

fn feed_json(changes: &[ChangeType]) -> String {
    let entries: Vec<serde_json::Value> = changes
        .iter()
        .enumerate()
        .map(|(i, change)| {
            let id = serde_json::json!({"Id": format!("id{i}")});
            match change {
                ChangeType::Create | ChangeType::Update => serde_json::json!({
                    "__type": change.as_str(),
                    "Message": {"__type": "Message", "ItemId": id, "Subject": format!("s{i}")}
                }),
                ChangeType::Delete => serde_json::json!({"__type": "Delete", "ItemId": id}),
                ChangeType::ReadFlagChange => serde_json::json!({
                    "__type": "ReadFlagChange", "ItemId": id, "IsRead": i % 2 == 0
                }),
            }
        })
        .collect();
    serde_json::json!({
        "__type": "SyncFolderItemsResponseMessage",
        "ResponseClass": "Success",
        "ResponseCode": "NoError",
        "SyncState": "s",
        "IncludesLastItemInRange": true,
        "Changes": entries,
    })
    .to_string()
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn changes_keep_wire_order(changes in change_strategy()) {
        let xml = feed_xml(&changes);
        let json = feed_json(&changes);
        for (_, mut cursor) in common::both(&xml, &json) {
            let feed = decode(cursor.as_mut(), ChangeShape::items())
                .unwrap_or_else(|e| panic!("decode failed: {e}"));
            prop_assert!(!feed.more_available);
            prop_assert_eq!(feed.changes.len(), changes.len());
            for (i, (decoded, expected)) in feed.changes.iter().zip(&changes).enumerate() {
                prop_assert_eq!(decoded.change_type(), *expected);
                prop_assert_eq!(decoded.id().id(), format!("id{i}"));
                assert_exclusive(decoded);
                if *expected == ChangeType::ReadFlagChange {
                    prop_assert_eq!(decoded.is_read(), Some(i % 2 == 0));
                }
            }
        }
    }
}
