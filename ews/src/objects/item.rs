use std::any::Any;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::{FolderId, ItemId, ObjectHandle, ObjectKind, ServiceId, ServiceObject};
use crate::cursor::{from_leaf_via_from_str, TreeCursor, TreeCursorExt};
use crate::registry::{DecodeContext, ObjectMaterializer, Projection};
use crate::types::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sensitivity {
    Normal,
    Personal,
    Private,
    Confidential,
}

impl FromStr for Sensitivity {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Normal" => Ok(Sensitivity::Normal),
            "Personal" => Ok(Sensitivity::Personal),
            "Private" => Ok(Sensitivity::Private),
            "Confidential" => Ok(Sensitivity::Confidential),
            _ => Err(()),
        }
    }
}

from_leaf_via_from_str!(Sensitivity, "Normal, Personal, Private or Confidential");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Importance {
    Low,
    Normal,
    High,
}

impl FromStr for Importance {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Low" => Ok(Importance::Low),
            "Normal" => Ok(Importance::Normal),
            "High" => Ok(Importance::High),
            _ => Err(()),
        }
    }
}

from_leaf_via_from_str!(Importance, "Low, Normal or High");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BodyType {
    #[default]
    Text,
    Html,
}

impl FromStr for BodyType {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("text") {
            Ok(BodyType::Text)
        } else if s.eq_ignore_ascii_case("html") {
            Ok(BodyType::Html)
        } else {
            Err(())
        }
    }
}

from_leaf_via_from_str!(BodyType, "Text or HTML");

/// Item body, only returned with the full projection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body {
    pub body_type: BodyType,
    pub is_truncated: bool,
    pub text: String,
}

impl Body {
    pub fn read(cursor: &mut dyn TreeCursor) -> Result<Self> {
        let body_type = cursor.read_attribute_as("BodyType")?.unwrap_or_default();
        let is_truncated = cursor.read_attribute_as("IsTruncated")?.unwrap_or(false);
        let text = cursor.read_leaf_text()?;
        Ok(Self {
            body_type,
            is_truncated,
            text,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mailbox {
    pub name: Option<String>,
    pub email_address: Option<String>,
    pub routing_type: Option<String>,
}

impl Mailbox {
    /// Read the mailbox element the cursor is positioned on
    pub fn read(cursor: &mut dyn TreeCursor) -> Result<Self> {
        let depth = cursor.depth();
        let mut mailbox = Mailbox::default();
        while cursor.next_child(depth)? {
            let name = cursor.local_name().to_string();
            match name.as_str() {
                "Name" => mailbox.name = Some(cursor.read_leaf_value()?),
                "EmailAddress" => mailbox.email_address = Some(cursor.read_leaf_value()?),
                "RoutingType" => mailbox.routing_type = Some(cursor.read_leaf_value()?),
                _ => cursor.skip_subtree()?,
            }
        }
        Ok(mailbox)
    }

    /// Read a wrapper holding a single mailbox (`<From><Mailbox>...`)
    pub fn read_single(cursor: &mut dyn TreeCursor) -> Result<Option<Self>> {
        let depth = cursor.depth();
        let mut mailbox = None;
        while cursor.next_child(depth)? {
            if mailbox.is_none() && cursor.local_name() == "Mailbox" {
                mailbox = Some(Mailbox::read(cursor)?);
            } else {
                cursor.skip_subtree()?;
            }
        }
        Ok(mailbox)
    }

    /// Read a list of mailboxes, whatever the entries are named
    pub fn read_list(cursor: &mut dyn TreeCursor) -> Result<Vec<Self>> {
        let depth = cursor.depth();
        let mut mailboxes = Vec::new();
        while cursor.next_child(depth)? {
            mailboxes.push(Mailbox::read(cursor)?);
        }
        Ok(mailboxes)
    }
}

/// Fields shared by every item type
#[derive(Debug, Default)]
pub struct ItemFields {
    pub id: Option<ItemId>,
    pub parent_folder_id: Option<FolderId>,
    pub item_class: Option<String>,
    pub subject: Option<String>,
    pub sensitivity: Option<Sensitivity>,
    pub size: Option<u64>,
    pub date_time_received: Option<DateTime<Utc>>,
    pub date_time_sent: Option<DateTime<Utc>>,
    pub has_attachments: Option<bool>,
    pub importance: Option<Importance>,
    pub categories: Vec<String>,
    pub body: Option<Body>,
    pub mime_content: Option<Vec<u8>>,
    pub attachments: Vec<ObjectHandle>,
}

impl ItemFields {
    pub fn decode_field(&mut self, cursor: &mut dyn TreeCursor, ctx: &DecodeContext) -> Result<bool> {
        let full = ctx.projection == Projection::Full;
        let name = cursor.local_name().to_string();
        match name.as_str() {
            "ItemId" => self.id = Some(ItemId::read(cursor)?),
            "ParentFolderId" => self.parent_folder_id = Some(FolderId::read(cursor)?),
            "ItemClass" => self.item_class = Some(cursor.read_leaf_value()?),
            "Subject" => self.subject = Some(cursor.read_leaf_value()?),
            "Sensitivity" => self.sensitivity = Some(cursor.read_leaf_value()?),
            "Size" => self.size = Some(cursor.read_leaf_value()?),
            "DateTimeReceived" => self.date_time_received = Some(cursor.read_leaf_value()?),
            "DateTimeSent" => self.date_time_sent = Some(cursor.read_leaf_value()?),
            "HasAttachments" => self.has_attachments = Some(cursor.read_leaf_value()?),
            "Importance" => self.importance = Some(cursor.read_leaf_value()?),
            "Categories" => self.categories = cursor.read_leaf_list()?,
            // Expensive fields are ignored in summary listings even when sent
            "Body" if full => self.body = Some(Body::read(cursor)?),
            "MimeContent" if full => self.mime_content = Some(cursor.read_leaf_value()?),
            "Attachments" if full => {
                self.attachments = ObjectMaterializer::expecting(ObjectKind::Attachment)
                    .materialize_collection(cursor, ctx, ctx.collection_policy)?
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn service_id(&self) -> Option<ServiceId> {
        self.id.clone().map(ServiceId::Item)
    }
}

/// Item of no more specific type
#[derive(Debug, Default)]
pub struct Item {
    pub item: ItemFields,
}

impl ServiceObject for Item {
    fn wire_name(&self) -> &'static str {
        "Item"
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Item
    }

    fn id(&self) -> Option<ServiceId> {
        self.item.service_id()
    }

    fn decode_field(&mut self, cursor: &mut dyn TreeCursor, ctx: &DecodeContext) -> Result<bool> {
        self.item.decode_field(cursor, ctx)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct Message {
    pub item: ItemFields,
    pub is_read: Option<bool>,
    pub from: Option<Mailbox>,
    pub to_recipients: Vec<Mailbox>,
    pub internet_message_id: Option<String>,
}

impl Message {
    fn decode_message_field(
        &mut self,
        cursor: &mut dyn TreeCursor,
        ctx: &DecodeContext,
    ) -> Result<bool> {
        let name = cursor.local_name().to_string();
        match name.as_str() {
            "IsRead" => self.is_read = Some(cursor.read_leaf_value()?),
            "From" => self.from = Mailbox::read_single(cursor)?,
            "ToRecipients" => self.to_recipients = Mailbox::read_list(cursor)?,
            "InternetMessageId" => self.internet_message_id = Some(cursor.read_leaf_value()?),
            _ => return self.item.decode_field(cursor, ctx),
        }
        Ok(true)
    }
}

impl ServiceObject for Message {
    fn wire_name(&self) -> &'static str {
        "Message"
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Item
    }

    fn id(&self) -> Option<ServiceId> {
        self.item.service_id()
    }

    fn decode_field(&mut self, cursor: &mut dyn TreeCursor, ctx: &DecodeContext) -> Result<bool> {
        self.decode_message_field(cursor, ctx)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Meeting invitation delivered as a message
#[derive(Debug, Default)]
pub struct MeetingRequest {
    pub message: Message,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub location: Option<String>,
}

impl ServiceObject for MeetingRequest {
    fn wire_name(&self) -> &'static str {
        "MeetingRequest"
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Item
    }

    fn id(&self) -> Option<ServiceId> {
        self.message.item.service_id()
    }

    fn decode_field(&mut self, cursor: &mut dyn TreeCursor, ctx: &DecodeContext) -> Result<bool> {
        let name = cursor.local_name().to_string();
        match name.as_str() {
            "Start" => self.start = Some(cursor.read_leaf_value()?),
            "End" => self.end = Some(cursor.read_leaf_value()?),
            "Location" => self.location = Some(cursor.read_leaf_value()?),
            _ => return self.message.decode_message_field(cursor, ctx),
        }
        Ok(true)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct CalendarItem {
    pub item: ItemFields,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub is_all_day_event: Option<bool>,
}

impl ServiceObject for CalendarItem {
    fn wire_name(&self) -> &'static str {
        "CalendarItem"
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Item
    }

    fn id(&self) -> Option<ServiceId> {
        self.item.service_id()
    }

    fn decode_field(&mut self, cursor: &mut dyn TreeCursor, ctx: &DecodeContext) -> Result<bool> {
        let name = cursor.local_name().to_string();
        match name.as_str() {
            "Start" => self.start = Some(cursor.read_leaf_value()?),
            "End" => self.end = Some(cursor.read_leaf_value()?),
            "Location" => self.location = Some(cursor.read_leaf_value()?),
            "IsAllDayEvent" => self.is_all_day_event = Some(cursor.read_leaf_value()?),
            _ => return self.item.decode_field(cursor, ctx),
        }
        Ok(true)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct Contact {
    pub item: ItemFields,
    pub display_name: Option<String>,
    pub given_name: Option<String>,
    pub surname: Option<String>,
    /// `(key, address)` pairs, e.g. `("EmailAddress1", "a@example.com")`
    pub email_addresses: Vec<(String, String)>,
}

impl Contact {
    fn read_email_addresses(cursor: &mut dyn TreeCursor) -> Result<Vec<(String, String)>> {
        let depth = cursor.depth();
        let mut entries = Vec::new();
        while cursor.next_child(depth)? {
            let key = cursor.read_attribute("Key").unwrap_or_default().to_string();
            let address = cursor.read_leaf_text()?;
            entries.push((key, address));
        }
        Ok(entries)
    }
}

impl ServiceObject for Contact {
    fn wire_name(&self) -> &'static str {
        "Contact"
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Item
    }

    fn id(&self) -> Option<ServiceId> {
        self.item.service_id()
    }

    fn decode_field(&mut self, cursor: &mut dyn TreeCursor, ctx: &DecodeContext) -> Result<bool> {
        let name = cursor.local_name().to_string();
        match name.as_str() {
            "DisplayName" => self.display_name = Some(cursor.read_leaf_value()?),
            "GivenName" => self.given_name = Some(cursor.read_leaf_value()?),
            "Surname" => self.surname = Some(cursor.read_leaf_value()?),
            "EmailAddresses" => self.email_addresses = Self::read_email_addresses(cursor)?,
            _ => return self.item.decode_field(cursor, ctx),
        }
        Ok(true)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct Task {
    pub item: ItemFields,
    pub status: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub percent_complete: Option<f64>,
}

impl ServiceObject for Task {
    fn wire_name(&self) -> &'static str {
        "Task"
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Item
    }

    fn id(&self) -> Option<ServiceId> {
        self.item.service_id()
    }

    fn decode_field(&mut self, cursor: &mut dyn TreeCursor, ctx: &DecodeContext) -> Result<bool> {
        let name = cursor.local_name().to_string();
        match name.as_str() {
            "Status" => self.status = Some(cursor.read_leaf_value()?),
            "DueDate" => self.due_date = Some(cursor.read_leaf_value()?),
            "PercentComplete" => self.percent_complete = Some(cursor.read_leaf_value()?),
            _ => return self.item.decode_field(cursor, ctx),
        }
        Ok(true)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::{JsonCursor, XmlCursor};
    use crate::objects::catalog::builtin_registry;
    use crate::objects::FileAttachment;
    use crate::registry::UnresolvedPolicy;

    const MESSAGE_XML: &str = r#"<t:Message xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types">
        <t:ItemId Id="AAMk1" ChangeKey="CQAA"/>
        <t:ParentFolderId Id="inbox"/>
        <t:ItemClass>IPM.Note</t:ItemClass>
        <t:Subject>Quarterly report</t:Subject>
        <t:Sensitivity>Normal</t:Sensitivity>
        <t:Body BodyType="HTML" IsTruncated="false">&lt;p&gt;see attached&lt;/p&gt;</t:Body>
        <t:Attachments>
            <t:FileAttachment>
                <t:AttachmentId Id="att1"/>
                <t:Name>report.pdf</t:Name>
                <t:Size>2048</t:Size>
            </t:FileAttachment>
        </t:Attachments>
        <t:Size>4096</t:Size>
        <t:DateTimeReceived>2024-05-02T08:30:00Z</t:DateTimeReceived>
        <t:Categories><t:String>Finance</t:String><t:String>Q2</t:String></t:Categories>
        <t:Importance>High</t:Importance>
        <t:From><t:Mailbox><t:Name>Sam</t:Name><t:EmailAddress>sam@example.com</t:EmailAddress></t:Mailbox></t:From>
        <t:ToRecipients>
            <t:Mailbox><t:EmailAddress>a@example.com</t:EmailAddress></t:Mailbox>
            <t:Mailbox><t:EmailAddress>b@example.com</t:EmailAddress></t:Mailbox>
        </t:ToRecipients>
        <t:IsRead>false</t:IsRead>
    </t:Message>"#;

    fn decode(cursor: &mut dyn TreeCursor, projection: Projection) -> ObjectHandle {
        let registry = builtin_registry().unwrap();
        let ctx = DecodeContext::new(&registry).with_projection(projection);
        cursor.advance().unwrap();
        ObjectMaterializer::new()
            .materialize_required(cursor, &ctx)
            .unwrap()
    }

    #[test]
    fn test_full_message() {
        let object = decode(&mut XmlCursor::from_str(MESSAGE_XML), Projection::Full);
        let message = object.downcast_ref::<Message>().unwrap();
        assert_eq!(message.item.id, Some(ItemId::new("AAMk1").with_change_key("CQAA")));
        assert_eq!(message.item.parent_folder_id, Some(FolderId::new("inbox")));
        assert_eq!(message.item.subject.as_deref(), Some("Quarterly report"));
        assert_eq!(message.item.size, Some(4096));
        assert_eq!(message.item.importance, Some(Importance::High));
        assert_eq!(message.item.categories, vec!["Finance", "Q2"]);
        assert_eq!(message.is_read, Some(false));

        let body = message.item.body.as_ref().unwrap();
        assert_eq!(body.body_type, BodyType::Html);
        assert_eq!(body.text, "<p>see attached</p>");

        assert_eq!(message.item.attachments.len(), 1);
        let attachment = message.item.attachments[0]
            .downcast_ref::<FileAttachment>()
            .unwrap();
        assert_eq!(attachment.attachment.name.as_deref(), Some("report.pdf"));

        let from = message.from.as_ref().unwrap();
        assert_eq!(from.name.as_deref(), Some("Sam"));
        assert_eq!(message.to_recipients.len(), 2);
        assert_eq!(object.id().unwrap().id(), "AAMk1");
    }

    #[test]
    fn test_summary_projection_drops_expensive_fields() {
        let object = decode(&mut XmlCursor::from_str(MESSAGE_XML), Projection::Summary);
        let message = object.downcast_ref::<Message>().unwrap();
        assert!(message.item.body.is_none());
        assert!(message.item.attachments.is_empty());
        // fields after the skipped ones are still decoded
        assert_eq!(message.item.size, Some(4096));
        assert_eq!(message.is_read, Some(false));
    }

    #[test]
    fn test_contact_from_json() {
        let json = r#"{
            "__type": "Contact:#Exchange",
            "ItemId": {"Id": "c1"},
            "DisplayName": "Ada Lovelace",
            "GivenName": "Ada",
            "EmailAddresses": [
                {"Key": "EmailAddress1", "$text": "ada@example.com"},
                {"Key": "EmailAddress2", "$text": "ada@home.example"}
            ]
        }"#;
        let object = decode(&mut JsonCursor::from_str(json).unwrap(), Projection::Full);
        let contact = object.downcast_ref::<Contact>().unwrap();
        assert_eq!(contact.display_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(contact.given_name.as_deref(), Some("Ada"));
        assert_eq!(
            contact.email_addresses,
            vec![
                ("EmailAddress1".to_string(), "ada@example.com".to_string()),
                ("EmailAddress2".to_string(), "ada@home.example".to_string()),
            ]
        );
    }

    #[test]
    fn test_meeting_request_inherits_message_fields() {
        let xml = r#"<MeetingRequest>
            <Subject>Planning</Subject>
            <IsRead>true</IsRead>
            <Start>2024-06-01T09:00:00Z</Start>
            <Location>Room 4</Location>
        </MeetingRequest>"#;
        let object = decode(&mut XmlCursor::from_str(xml), Projection::Summary);
        let request = object.downcast_ref::<MeetingRequest>().unwrap();
        assert_eq!(request.message.item.subject.as_deref(), Some("Planning"));
        assert_eq!(request.message.is_read, Some(true));
        assert_eq!(request.location.as_deref(), Some("Room 4"));
        assert!(request.start.is_some());
    }

    #[test]
    fn test_malformed_leaf_is_fatal() {
        let xml = "<Task><PercentComplete>lots</PercentComplete></Task>";
        let registry = builtin_registry().unwrap();
        let ctx = DecodeContext::new(&registry).with_collection_policy(UnresolvedPolicy::Skip);
        let mut cursor = XmlCursor::from_str(xml);
        cursor.advance().unwrap();
        let err = ObjectMaterializer::new()
            .materialize(&mut cursor, &ctx)
            .unwrap_err();
        assert!(matches!(
            err,
            crate::types::error::EwsError::MalformedValue { ref element, .. } if element == "PercentComplete"
        ));
    }
}
