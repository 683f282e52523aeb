use crate::common::ChatSummary;

#[derive(Debug, Clone)]
pub struct ChatRow {
    pub chat: ChatSummary,
    search_name: String,
    pub visible: bool,
}

/// The chat list with its local, case-insensitive name filter.
#[derive(Debug, Default)]
pub struct ChatList {
    rows: Vec<ChatRow>,
    filter: String,
}

impl ChatList {
    /// Replace the rows; the active filter is applied to the new rows.
    pub fn set_chats(&mut self, chats: Vec<ChatSummary>) {
        self.rows = chats
            .into_iter()
            .map(|chat| ChatRow {
                search_name: chat.name.to_lowercase(),
                chat,
                visible: true,
            })
            .collect();
        let filter = std::mem::take(&mut self.filter);
        self.apply_filter(&filter);
    }

    /// Show rows whose name contains `query` (case-insensitive), hide the rest.
    pub fn apply_filter(&mut self, query: &str) {
        self.filter = query.to_lowercase();
        for row in &mut self.rows {
            row.visible = row.search_name.contains(&self.filter);
        }
    }

    pub fn rows(&self) -> &[ChatRow] {
        &self.rows
    }

    pub fn visible_rows(&self) -> impl Iterator<Item = &ChatRow> {
        self.rows.iter().filter(|row| row.visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(id: i64, name: &str) -> ChatSummary {
        ChatSummary {
            id,
            name: name.to_string(),
            last_message_content: None,
            avatar: None,
        }
    }

    fn visible_ids(list: &ChatList) -> Vec<i64> {
        list.visible_rows().map(|row| row.chat.id).collect()
    }

    #[test]
    fn filter_is_case_insensitive_substring() {
        let mut list = ChatList::default();
        list.set_chats(vec![chat(1, "Alice"), chat(2, "Bob"), chat(3, "MALICE")]);

        list.apply_filter("aLi");

        assert_eq!(visible_ids(&list), vec![1, 3]);
        assert!(!list.rows()[1].visible);
    }

    #[test]
    fn empty_query_shows_everything() {
        let mut list = ChatList::default();
        list.set_chats(vec![chat(1, "Alice"), chat(2, "Bob")]);
        list.apply_filter("zzz");
        assert!(visible_ids(&list).is_empty());

        list.apply_filter("");

        assert_eq!(visible_ids(&list), vec![1, 2]);
    }

    #[test]
    fn reloaded_rows_keep_the_active_filter() {
        let mut list = ChatList::default();
        list.apply_filter("bo");

        list.set_chats(vec![chat(1, "Alice"), chat(2, "Bob")]);

        assert_eq!(visible_ids(&list), vec![2]);
    }
}
