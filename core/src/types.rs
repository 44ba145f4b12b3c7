//! Message payloads accepted by the robot webhook.
//!
//! # Design
//! `Message` is a closed sum over the six supported shapes. Each variant holds
//! a plain data record whose serde field names match the platform schema
//! verbatim (note the mixed `messageUrl` / `messageURL` spellings between link
//! and feed-card payloads). The wire envelope `{"msgtype": tag, tag: {...}}`
//! is produced by a hand-written `Serialize` impl so the tag is always derived
//! from the variant and can never disagree with the payload.

use std::collections::HashMap;

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Plain text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    pub content: String,
}

/// Hyperlink card with an optional picture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub title: String,
    pub text: String,
    #[serde(rename = "messageUrl")]
    pub message_url: String,
    #[serde(rename = "picUrl")]
    pub pic_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Markdown {
    pub title: String,
    pub text: String,
}

/// Layout of action-card buttons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ButtonOrientation {
    #[default]
    #[serde(rename = "0")]
    Vertical,
    #[serde(rename = "1")]
    Horizontal,
}

/// Action card where the whole card jumps to a single URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntiretyActionCard {
    pub title: String,
    pub text: String,
    #[serde(rename = "singleTitle")]
    pub single_title: String,
    #[serde(rename = "singleURL")]
    pub single_url: String,
    #[serde(rename = "btnOrientation")]
    pub btn_orientation: ButtonOrientation,
}

/// Action card with one button per target URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndependentActionCard {
    pub title: String,
    pub text: String,
    #[serde(rename = "btnOrientation")]
    pub btn_orientation: ButtonOrientation,
    pub btns: Vec<ActionButton>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionButton {
    pub title: String,
    #[serde(rename = "actionURL")]
    pub action_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedCard {
    pub links: Vec<FeedCardLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedCardLink {
    pub title: String,
    #[serde(rename = "messageURL")]
    pub message_url: String,
    #[serde(rename = "picURL")]
    pub pic_url: String,
}

/// Mentions attached to an outgoing message. Omitted from the body when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct At {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub at_mobiles: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub at_user_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_at_all: bool,
}

impl At {
    pub fn is_empty(&self) -> bool {
        self.at_mobiles.is_empty() && self.at_user_ids.is_empty() && !self.is_at_all
    }
}

/// One message to deliver through the webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(Text),
    Link(Link),
    Markdown(Markdown),
    EntiretyActionCard(EntiretyActionCard),
    IndependentActionCard(IndependentActionCard),
    FeedCard(FeedCard),
}

impl Message {
    pub fn text(content: impl Into<String>) -> Self {
        Message::Text(Text {
            content: content.into(),
        })
    }

    pub fn link(
        title: impl Into<String>,
        text: impl Into<String>,
        message_url: impl Into<String>,
        pic_url: impl Into<String>,
    ) -> Self {
        Message::Link(Link {
            title: title.into(),
            text: text.into(),
            message_url: message_url.into(),
            pic_url: pic_url.into(),
        })
    }

    pub fn markdown(title: impl Into<String>, text: impl Into<String>) -> Self {
        Message::Markdown(Markdown {
            title: title.into(),
            text: text.into(),
        })
    }

    pub fn entirety_action_card(
        title: impl Into<String>,
        text: impl Into<String>,
        single_title: impl Into<String>,
        single_url: impl Into<String>,
        btn_orientation: ButtonOrientation,
    ) -> Self {
        Message::EntiretyActionCard(EntiretyActionCard {
            title: title.into(),
            text: text.into(),
            single_title: single_title.into(),
            single_url: single_url.into(),
            btn_orientation,
        })
    }

    /// Build an action card with one button per `label -> action URL` entry.
    ///
    /// Buttons follow the map's iteration order, which is unspecified and may
    /// differ between calls with equal input. Build an `IndependentActionCard`
    /// directly when button order matters.
    pub fn independent_action_card(
        title: impl Into<String>,
        text: impl Into<String>,
        btn_orientation: ButtonOrientation,
        buttons: HashMap<String, String>,
    ) -> Self {
        let btns = buttons
            .into_iter()
            .map(|(title, action_url)| ActionButton { title, action_url })
            .collect();
        Message::IndependentActionCard(IndependentActionCard {
            title: title.into(),
            text: text.into(),
            btn_orientation,
            btns,
        })
    }

    pub fn feed_card(links: Vec<FeedCardLink>) -> Self {
        Message::FeedCard(FeedCard { links })
    }

    /// Tag used for both the `msgtype` field and the payload key.
    pub fn msgtype(&self) -> &'static str {
        match self {
            Message::Text(_) => "text",
            Message::Link(_) => "link",
            Message::Markdown(_) => "markdown",
            Message::EntiretyActionCard(_) | Message::IndependentActionCard(_) => "actionCard",
            Message::FeedCard(_) => "feedCard",
        }
    }

    /// Write `msgtype` and the tagged payload into an open JSON object.
    pub(crate) fn serialize_entries<M: SerializeMap>(&self, map: &mut M) -> Result<(), M::Error> {
        let tag = self.msgtype();
        map.serialize_entry("msgtype", tag)?;
        match self {
            Message::Text(payload) => map.serialize_entry(tag, payload),
            Message::Link(payload) => map.serialize_entry(tag, payload),
            Message::Markdown(payload) => map.serialize_entry(tag, payload),
            Message::EntiretyActionCard(payload) => map.serialize_entry(tag, payload),
            Message::IndependentActionCard(payload) => map.serialize_entry(tag, payload),
            Message::FeedCard(payload) => map.serialize_entry(tag, payload),
        }
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        self.serialize_entries(&mut map)?;
        map.end()
    }
}

/// Split a free-form template into a link card.
///
/// Line 1 is the title, line 2 the message URL, line 3 the picture URL. Every
/// remaining line is copied to `text` followed by a newline. Missing lines
/// leave their fields empty.
pub fn parse_link_template(template: &str) -> Link {
    let mut lines = template.lines();
    let title = lines.next().unwrap_or_default().to_string();
    let message_url = lines.next().unwrap_or_default().to_string();
    let pic_url = lines.next().unwrap_or_default().to_string();
    let text = lines.fold(String::new(), |mut text, line| {
        text.push_str(line);
        text.push('\n');
        text
    });
    Link {
        title,
        text,
        message_url,
        pic_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_serializes_with_envelope() {
        let value = serde_json::to_value(Message::text("hello")).unwrap();
        assert_eq!(value, json!({"msgtype": "text", "text": {"content": "hello"}}));
    }

    #[test]
    fn link_uses_platform_field_names() {
        let msg = Message::link("T", "body", "http://u", "http://p");
        let value = serde_json::to_value(msg).unwrap();
        assert_eq!(value["msgtype"], "link");
        assert_eq!(value["link"]["messageUrl"], "http://u");
        assert_eq!(value["link"]["picUrl"], "http://p");
    }

    #[test]
    fn entirety_action_card_tag_and_orientation() {
        let msg = Message::entirety_action_card(
            "title",
            "text",
            "Read more",
            "http://x",
            ButtonOrientation::Horizontal,
        );
        let value = serde_json::to_value(msg).unwrap();
        assert_eq!(value["msgtype"], "actionCard");
        assert_eq!(value["actionCard"]["singleURL"], "http://x");
        assert_eq!(value["actionCard"]["btnOrientation"], "1");
    }

    #[test]
    fn independent_action_card_keeps_every_button() {
        let buttons = HashMap::from([
            ("Yes".to_string(), "http://y".to_string()),
            ("No".to_string(), "http://n".to_string()),
        ]);
        let msg = Message::independent_action_card("t", "x", ButtonOrientation::Vertical, buttons);
        let Message::IndependentActionCard(card) = &msg else {
            panic!("expected independent action card");
        };
        let mut titles: Vec<_> = card.btns.iter().map(|b| b.title.as_str()).collect();
        titles.sort_unstable();
        assert_eq!(titles, ["No", "Yes"]);

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["msgtype"], "actionCard");
        assert_eq!(value["actionCard"]["btns"].as_array().unwrap().len(), 2);
        assert!(value["actionCard"].get("singleURL").is_none());
    }

    #[test]
    fn feed_card_links_use_uppercase_url_suffix() {
        let msg = Message::feed_card(vec![FeedCardLink {
            title: "a".to_string(),
            message_url: "http://a".to_string(),
            pic_url: "http://a.png".to_string(),
        }]);
        let value = serde_json::to_value(msg).unwrap();
        assert_eq!(value["msgtype"], "feedCard");
        assert_eq!(value["feedCard"]["links"][0]["messageURL"], "http://a");
        assert_eq!(value["feedCard"]["links"][0]["picURL"], "http://a.png");
    }

    #[test]
    fn empty_at_serializes_to_empty_object() {
        assert_eq!(serde_json::to_value(At::default()).unwrap(), json!({}));
        assert!(At::default().is_empty());
    }

    #[test]
    fn at_all_is_not_empty() {
        let at = At {
            is_at_all: true,
            ..At::default()
        };
        assert!(!at.is_empty());
        assert_eq!(serde_json::to_value(at).unwrap(), json!({"isAtAll": true}));
    }

    #[test]
    fn template_with_body_lines() {
        let link = parse_link_template("T\nhttp://u\nhttp://p\nline1\nline2");
        assert_eq!(link.title, "T");
        assert_eq!(link.message_url, "http://u");
        assert_eq!(link.pic_url, "http://p");
        assert_eq!(link.text, "line1\nline2\n");
    }

    #[test]
    fn template_with_single_line() {
        let link = parse_link_template("T");
        assert_eq!(
            link,
            Link {
                title: "T".to_string(),
                ..Link::default()
            }
        );
    }

    #[test]
    fn template_strips_carriage_returns() {
        let link = parse_link_template("T\r\nhttp://u\r\nhttp://p\r\nbody\r\n");
        assert_eq!(link.message_url, "http://u");
        assert_eq!(link.text, "body\n");
    }

    #[test]
    fn empty_template_is_empty_link() {
        assert_eq!(parse_link_template(""), Link::default());
    }
}
