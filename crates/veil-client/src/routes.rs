//! Addressable view states of the app.

use veil_types::link_id::is_valid_link_id;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppRoute {
    /// Link creation form.
    Entry,
    /// "Your link has been generated" page.
    Created(String),
    /// Public page visitors send messages from.
    Send(String),
    /// Owner's inbox.
    Inbox(String),
}

impl AppRoute {
    pub fn path(&self) -> String {
        match self {
            AppRoute::Entry => "/".to_string(),
            AppRoute::Created(id) => format!("/success/{id}"),
            AppRoute::Send(id) => format!("/u/{id}"),
            AppRoute::Inbox(id) => format!("/u/{id}/messages"),
        }
    }

    /// Parse a path. Unknown paths and malformed link ids yield `None`;
    /// callers fall back to [`AppRoute::Entry`].
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let route = match segments.as_slice() {
            [] => AppRoute::Entry,
            ["success", id] => AppRoute::Created(id.to_string()),
            ["u", id] => AppRoute::Send(id.to_string()),
            ["u", id, "messages"] => AppRoute::Inbox(id.to_string()),
            _ => return None,
        };

        if route.link_id().is_none_or(is_valid_link_id) {
            Some(route)
        } else {
            None
        }
    }

    pub fn link_id(&self) -> Option<&str> {
        match self {
            AppRoute::Entry => None,
            AppRoute::Created(id) | AppRoute::Send(id) | AppRoute::Inbox(id) => Some(id),
        }
    }
}
