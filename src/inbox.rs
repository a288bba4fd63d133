//! Per-user inbox of conversation previews
//!
//! Each user owns a map of thread id → preview. Unread counters only grow
//! on messages authored by someone else and only reset through `mark_read`.

use std::collections::HashMap;

use crate::message::{ThreadKind, ThreadPreview};
use crate::types::{direct_thread, group_thread};

/// Inbox previews for every user
#[derive(Debug, Default)]
pub struct InboxStore {
    threads: HashMap<String, HashMap<String, ThreadPreview>>,
}

impl InboxStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Thread map of `user`, created empty on first access
    pub fn ensure(&mut self, user: &str) -> &mut HashMap<String, ThreadPreview> {
        self.threads.entry(user.to_string()).or_default()
    }

    /// Record a direct message in both parties' inboxes
    ///
    /// The sender's thread is marked read; the recipient's unread grows by
    /// one. Returns the users whose inbox changed.
    pub fn on_direct_message(&mut self, from: &str, to: &str, body: &str, ts: i64) -> Vec<String> {
        let sent = direct_thread(to);
        self.ensure(from).insert(
            sent.clone(),
            ThreadPreview {
                thread_id: sent,
                kind: ThreadKind::Private,
                title: to.to_string(),
                last_body: body.to_string(),
                last_ts: ts,
                unread: 0,
            },
        );

        if from == to {
            return vec![from.to_string()];
        }

        upsert(
            self.ensure(to),
            direct_thread(from),
            ThreadKind::Private,
            from,
            body,
            ts,
            1,
        );
        vec![from.to_string(), to.to_string()]
    }

    /// Record a room message for every subscriber
    ///
    /// The author's unread is left as is. Returns the users whose inbox
    /// changed.
    pub fn on_group_message(
        &mut self,
        room: &str,
        from: &str,
        body: &str,
        ts: i64,
        subscribers: &[String],
    ) -> Vec<String> {
        let thread_id = group_thread(room);
        for user in subscribers {
            let increment = if user == from { 0 } else { 1 };
            upsert(
                self.ensure(user),
                thread_id.clone(),
                ThreadKind::Group,
                room,
                body,
                ts,
                increment,
            );
        }
        subscribers.to_vec()
    }

    /// Reset a thread's unread count to zero
    ///
    /// Returns false when the thread does not exist.
    pub fn mark_read(&mut self, user: &str, thread_id: &str) -> bool {
        match self.ensure(user).get_mut(thread_id) {
            Some(preview) => {
                preview.unread = 0;
                true
            }
            None => false,
        }
    }

    /// Drop one thread from a user's inbox
    pub fn remove_thread(&mut self, user: &str, thread_id: &str) -> bool {
        self.threads
            .get_mut(user)
            .is_some_and(|threads| threads.remove(thread_id).is_some())
    }

    /// Previews of `user`, most recent first
    pub fn list(&self, user: &str) -> Vec<ThreadPreview> {
        let mut out: Vec<ThreadPreview> = self
            .threads
            .get(user)
            .map(|threads| threads.values().cloned().collect())
            .unwrap_or_default();
        out.sort_by(|a, b| {
            b.last_ts
                .cmp(&a.last_ts)
                .then_with(|| a.thread_id.cmp(&b.thread_id))
        });
        out
    }

    pub fn get(&self, user: &str, thread_id: &str) -> Option<&ThreadPreview> {
        self.threads.get(user).and_then(|threads| threads.get(thread_id))
    }
}

fn upsert(
    threads: &mut HashMap<String, ThreadPreview>,
    thread_id: String,
    kind: ThreadKind,
    title: &str,
    body: &str,
    ts: i64,
    increment: u32,
) {
    threads
        .entry(thread_id.clone())
        .and_modify(|preview| {
            preview.last_body = body.to_string();
            preview.last_ts = ts;
            preview.unread = preview.unread.saturating_add(increment);
        })
        .or_insert_with(|| ThreadPreview {
            thread_id,
            kind,
            title: title.to_string(),
            last_body: body.to_string(),
            last_ts: ts,
            unread: increment,
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_direct_message_updates_both_sides() {
        let mut inbox = InboxStore::new();
        let changed = inbox.on_direct_message("alice", "bob", "hey", 10);
        assert_eq!(changed, users(&["alice", "bob"]));

        let sent = inbox.get("alice", "u:bob").unwrap();
        assert_eq!(sent.unread, 0);
        assert_eq!(sent.title, "bob");
        assert_eq!(sent.kind, ThreadKind::Private);

        let received = inbox.get("bob", "u:alice").unwrap();
        assert_eq!(received.unread, 1);
        assert_eq!(received.last_body, "hey");

        inbox.on_direct_message("alice", "bob", "again", 11);
        let received = inbox.get("bob", "u:alice").unwrap();
        assert_eq!(received.unread, 2);
        assert_eq!(received.last_body, "again");
        assert_eq!(received.last_ts, 11);
    }

    #[test]
    fn test_reply_clears_senders_unread() {
        let mut inbox = InboxStore::new();
        inbox.on_direct_message("alice", "bob", "hey", 10);
        inbox.on_direct_message("bob", "alice", "hi back", 11);

        assert_eq!(inbox.get("bob", "u:alice").unwrap().unread, 0);
        assert_eq!(inbox.get("alice", "u:bob").unwrap().unread, 1);
    }

    #[test]
    fn test_direct_message_to_self_stays_read() {
        let mut inbox = InboxStore::new();
        let changed = inbox.on_direct_message("alice", "alice", "note", 5);
        assert_eq!(changed, users(&["alice"]));
        assert_eq!(inbox.get("alice", "u:alice").unwrap().unread, 0);
    }

    #[test]
    fn test_group_message_skips_author_unread() {
        let mut inbox = InboxStore::new();
        let subs = users(&["alice", "bob", "carol"]);
        inbox.on_group_message("team", "alice", "hi", 1, &subs);
        inbox.on_group_message("team", "bob", "yo", 2, &subs);

        assert_eq!(inbox.get("alice", "g:team").unwrap().unread, 1);
        assert_eq!(inbox.get("bob", "g:team").unwrap().unread, 1);
        assert_eq!(inbox.get("carol", "g:team").unwrap().unread, 2);
        assert_eq!(inbox.get("carol", "g:team").unwrap().last_body, "yo");
        assert_eq!(inbox.get("carol", "g:team").unwrap().title, "team");
    }

    #[test]
    fn test_unread_monotonic_until_mark_read() {
        let mut inbox = InboxStore::new();
        let subs = users(&["alice", "bob"]);
        let mut last = 0;
        for (ts, author) in ["alice", "bob", "alice", "alice", "bob"].iter().enumerate() {
            inbox.on_group_message("team", author, "m", ts as i64, &subs);
            let unread = inbox.get("bob", "g:team").unwrap().unread;
            assert!(unread >= last);
            last = unread;
        }
        assert_eq!(last, 3);

        assert!(inbox.mark_read("bob", "g:team"));
        assert_eq!(inbox.get("bob", "g:team").unwrap().unread, 0);

        inbox.on_group_message("team", "alice", "m", 9, &subs);
        assert_eq!(inbox.get("bob", "g:team").unwrap().unread, 1);
    }

    #[test]
    fn test_mark_read_unknown_thread_is_noop() {
        let mut inbox = InboxStore::new();
        assert!(!inbox.mark_read("nobody", "u:ghost"));
        assert!(inbox.list("nobody").is_empty());
    }

    #[test]
    fn test_list_most_recent_first() {
        let mut inbox = InboxStore::new();
        inbox.on_direct_message("carol", "alice", "old", 1);
        inbox.on_group_message("team", "bob", "newest", 30, &users(&["alice", "bob"]));
        inbox.on_direct_message("bob", "alice", "middle", 20);

        let ids: Vec<String> = inbox.list("alice").into_iter().map(|p| p.thread_id).collect();
        assert_eq!(ids, vec!["g:team", "u:bob", "u:carol"]);
    }

    #[test]
    fn test_remove_thread() {
        let mut inbox = InboxStore::new();
        inbox.on_group_message("team", "bob", "hi", 1, &users(&["alice"]));
        assert!(inbox.remove_thread("alice", "g:team"));
        assert!(!inbox.remove_thread("alice", "g:team"));
        assert!(inbox.list("alice").is_empty());
    }
}
