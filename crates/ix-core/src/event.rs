//! Raw platform input and the normalized records the capturers produce.

use serde::{Deserialize, Serialize};

use crate::event_kind::EventKind;
use crate::keys::AllowedKey;

/// Description of the element an input originated from, as reported by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInfo {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Visible text content. Only used for click targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ElementInfo {
    /// Best-effort identifier of the input field this element represents.
    ///
    /// Prefers the element id, then its form name, then the lowercased tag.
    pub fn field_id(&self) -> Option<String> {
        self.id
            .as_deref()
            .or(self.name.as_deref())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| (!self.tag.is_empty()).then(|| self.tag.to_ascii_lowercase()))
    }
}

/// Raw input delivered by the host platform to a page's segmenter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawInput {
    PointerMove {
        x: f64,
        y: f64,
    },
    Click {
        x: f64,
        y: f64,
        #[serde(default)]
        button: u8,
        #[serde(default)]
        target: ElementInfo,
    },
    Key {
        /// Platform key name. Never leaves the capturer unless allow-listed.
        key: String,
        #[serde(default)]
        repeat: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<ElementInfo>,
    },
    Scroll {
        x: f64,
        y: f64,
    },
    /// Page visibility change. A control signal, never buffered.
    Visibility {
        hidden: bool,
    },
}

impl RawInput {
    /// The capture listener this input is delivered to, if any.
    pub const fn kind(&self) -> Option<EventKind> {
        match self {
            Self::PointerMove { .. } => Some(EventKind::Pointer),
            Self::Click { .. } => Some(EventKind::Click),
            Self::Key { .. } => Some(EventKind::Key),
            Self::Scroll { .. } => Some(EventKind::Scroll),
            Self::Visibility { .. } => None,
        }
    }
}

/// A fixed-rate sample of the last known pointer position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    /// Monotonic time in milliseconds.
    pub t: u64,
    pub x: f64,
    pub y: f64,
    pub dt_since_last: Option<u64>,
}

/// Descriptor of a click target, with visible text truncated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDescriptor {
    pub tag: String,
    pub id: Option<String>,
    pub text: Option<String>,
}

impl TargetDescriptor {
    /// Builds a descriptor, keeping at most `text_limit` characters of text.
    ///
    /// Whitespace runs are collapsed before truncation. Blank text becomes `None`.
    pub fn from_element(element: &ElementInfo, text_limit: usize) -> Self {
        let text = element.text.as_deref().and_then(|raw| {
            let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
            if collapsed.is_empty() {
                None
            } else {
                Some(collapsed.chars().take(text_limit).collect())
            }
        });
        Self {
            tag: element.tag.to_ascii_lowercase(),
            id: element.id.clone().filter(|id| !id.is_empty()),
            text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickRecord {
    pub t: u64,
    pub x: f64,
    pub y: f64,
    pub button: u8,
    pub target: TargetDescriptor,
    pub dt_since_last: Option<u64>,
}

/// A key press with its content removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    pub t: u64,
    /// Field the press was associated with.
    pub field: Option<String>,
    /// Present only for allow-listed keys.
    pub key: Option<AllowedKey>,
    pub repeat: bool,
    /// Time since the previous key press in the same field.
    pub dt_since_last: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollSample {
    pub t: u64,
    pub x: f64,
    pub y: f64,
    pub dx: f64,
    pub dy: f64,
    pub dt_since_last: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_id_prefers_id_then_name_then_tag() {
        let mut element = ElementInfo {
            tag: "INPUT".into(),
            id: Some("email".into()),
            name: Some("user_email".into()),
            text: None,
        };
        assert_eq!(element.field_id().as_deref(), Some("email"));
        element.id = None;
        assert_eq!(element.field_id().as_deref(), Some("user_email"));
        element.name = None;
        assert_eq!(element.field_id().as_deref(), Some("input"));
        element.tag.clear();
        assert_eq!(element.field_id(), None);
    }

    #[test]
    fn target_text_is_collapsed_and_truncated() {
        let element = ElementInfo {
            tag: "BUTTON".into(),
            id: Some(String::new()),
            name: None,
            text: Some("  Save \n  all   changes  ".into()),
        };
        let target = TargetDescriptor::from_element(&element, 8);
        assert_eq!(target.tag, "button");
        assert_eq!(target.id, None);
        assert_eq!(target.text.as_deref(), Some("Save all"));
    }

    #[test]
    fn target_text_truncation_respects_char_boundaries() {
        let element = ElementInfo {
            tag: "a".into(),
            text: Some("héllo wörld".into()),
            ..ElementInfo::default()
        };
        let target = TargetDescriptor::from_element(&element, 2);
        assert_eq!(target.text.as_deref(), Some("hé"));
    }

    #[test]
    fn raw_input_parses_script_lines() {
        let input: RawInput =
            serde_json::from_str(r#"{"type":"key","key":"a","target":{"tag":"input"}}"#).unwrap();
        assert_eq!(input.kind(), Some(EventKind::Key));
        let input: RawInput = serde_json::from_str(r#"{"type":"visibility","hidden":true}"#).unwrap();
        assert_eq!(input.kind(), None);
    }
}
