use std::collections::HashSet;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

use crate::common::ChatMessage;

const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Sent,
    Received,
}

impl Direction {
    pub fn of(message: &ChatMessage, current_user_id: Option<i64>) -> Self {
        if current_user_id == Some(message.sender_id) {
            Self::Sent
        } else {
            Self::Received
        }
    }
}

/// One message as shown in the pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub id: i64,
    pub content: String,
    pub direction: Direction,
    pub time: String,
    pub read: bool,
}

/// The visible message list: append-only, in receipt order, one node per message id.
#[derive(Debug, Default)]
pub struct MessagePane {
    nodes: Vec<RenderedMessage>,
    ids: HashSet<i64>,
}

impl MessagePane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[RenderedMessage] {
        &self.nodes
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, message_id: i64) -> Option<&RenderedMessage> {
        self.nodes.iter().find(|node| node.id == message_id)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.ids.clear();
    }

    /// Append `message` unless a node with its id already exists. Returns whether it was added.
    pub fn display(&mut self, message: &ChatMessage, current_user_id: Option<i64>) -> bool {
        if !self.ids.insert(message.id) {
            return false;
        }
        self.nodes.push(RenderedMessage {
            id: message.id,
            content: message.content.clone(),
            direction: Direction::of(message, current_user_id),
            time: format_time(message.created_at.as_deref()),
            read: !message.read_by.is_empty(),
        });
        true
    }

    /// Clear, then render `messages` in the given order.
    pub fn replace_all(&mut self, messages: &[ChatMessage], current_user_id: Option<i64>) {
        self.clear();
        for message in messages {
            self.display(message, current_user_id);
        }
    }

    pub fn mark_read(&mut self, message_id: i64) -> bool {
        match self.nodes.iter_mut().find(|node| node.id == message_id) {
            Some(node) => {
                node.read = true;
                true
            }
            None => false,
        }
    }

    pub fn apply_edit(&mut self, message: &ChatMessage) -> bool {
        match self.nodes.iter_mut().find(|node| node.id == message.id) {
            Some(node) => {
                node.content = message.content.clone();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, message_id: i64) -> bool {
        if !self.ids.remove(&message_id) {
            return false;
        }
        self.nodes.retain(|node| node.id != message_id);
        true
    }
}

/// RFC 3339, or a naive ISO-8601 date-time taken as local time.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Local>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Local));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
}

/// Local wall-clock time of `created_at`, or of now if it is missing or unparseable.
pub fn format_time(created_at: Option<&str>) -> String {
    let timestamp = match created_at {
        Some(raw) => parse_timestamp(raw).unwrap_or_else(|| {
            log::warn!("Invalid message timestamp `{raw}`; using current time");
            Local::now()
        }),
        None => Local::now(),
    };
    timestamp.format(TIME_FORMAT).to_string()
}
