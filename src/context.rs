//! What the middleware needs to know about a request.
//!
//! The logger never looks at a concrete request type. Any host pipeline can
//! plug in by implementing [`RequestContext`] for its per-request state; the
//! hyper binding ships one in [`HttpContext`](crate::middleware::HttpContext).

use std::error::Error as StdError;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

/// Read-only view of one request, as seen after the downstream chain ran.
pub trait RequestContext {
    fn path(&self) -> &str;

    /// Query string without the leading `?`. Empty when absent.
    fn raw_query(&self) -> &str;

    fn method(&self) -> &str;

    /// Response status code produced downstream.
    fn status(&self) -> u16;

    /// Client address as resolved by the host, proxy headers included.
    fn client_ip(&self) -> Option<IpAddr>;

    /// `User-Agent` header, empty when absent.
    fn user_agent(&self) -> &str;

    /// Errors attached while handling the request, oldest first.
    fn errors(&self) -> &ErrorList;
}

// ── ErrorList ─────────────────────────────────────────────────────────────────

/// A shared, type-erased application error.
pub type RequestError = Arc<dyn StdError + Send + Sync + 'static>;

/// Ordered list of errors accumulated on a request.
///
/// Cloning is cheap: entries are reference counted, so the list can travel
/// through `http::Extensions` (which requires `Clone`) without copying errors.
#[derive(Clone, Debug, Default)]
pub struct ErrorList(Vec<RequestError>);

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, err: impl Into<Box<dyn StdError + Send + Sync + 'static>>) {
        self.0.push(Arc::from(err.into()));
    }

    /// The most recently attached error.
    pub fn last(&self) -> Option<&RequestError> {
        self.0.last()
    }

    /// Every error's message, in attachment order, separated by one space.
    pub fn joined(&self) -> String {
        let mut out = String::new();
        for (i, err) in self.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(&err.to_string());
        }
        out
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RequestError> {
        self.0.iter()
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

impl<E> Extend<E> for ErrorList
where
    E: Into<Box<dyn StdError + Send + Sync + 'static>>,
{
    fn extend<I: IntoIterator<Item = E>>(&mut self, iter: I) {
        for err in iter {
            self.push(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list() {
        let list = ErrorList::new();
        assert!(list.is_empty());
        assert!(list.last().is_none());
        assert_eq!(list.joined(), "");
    }

    #[test]
    fn joined_keeps_order() {
        let mut list = ErrorList::new();
        list.extend(["first", "second", "third"]);
        assert_eq!(list.len(), 3);
        assert_eq!(list.joined(), "first second third");
        assert_eq!(list.last().map(|e| e.to_string()).as_deref(), Some("third"));
    }

    #[test]
    fn iter_yields_attachment_order() {
        let mut list = ErrorList::new();
        list.push("a");
        list.push(String::from("b"));
        let messages: Vec<String> = list.iter().map(|e| e.to_string()).collect();
        assert_eq!(messages, ["a", "b"]);
    }

    #[test]
    fn clones_share_entries() {
        let mut list = ErrorList::new();
        list.push("lorem");
        let copy = list.clone();
        let (a, b) = (list.last().unwrap(), copy.last().unwrap());
        assert!(Arc::ptr_eq(a, b));
    }
}
