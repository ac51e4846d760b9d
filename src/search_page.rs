use crate::api::DiaryApi;
use crate::capabilities::{AuthContext, Clipboard, Dialogs, Navigator};
use crate::diary_entry::DiaryEntry;
use crate::error::{ApiResult, ClipboardError};
use crate::router::LOGIN_PATH;
use tracing::{debug, error, info};

pub const EMPTY_QUERY_MESSAGE: &str = "Please enter a search keyword.";
pub const SEARCH_FAILED_MESSAGE: &str = "Search failed. Please try again.";
pub const CONFIRM_DELETE_MESSAGE: &str = "Are you sure you want to delete this diary?";
pub const DELETE_FAILED_MESSAGE: &str = "Failed to delete the diary. Please try again.";
pub const SHARE_COPIED_MESSAGE: &str = "Share link copied to clipboard.";
pub const SHARE_FAILED_MESSAGE: &str = "Failed to copy the share link.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountOutcome {
    /// Not signed in; the navigator was sent to the login page.
    Redirected,
    Ready { initial_query: Option<String> },
}

/// Handed out when a search starts; the outcome is only applied if it is
/// still the latest one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub seq: u64,
    pub query: String,
}

/// What the page body should show.
#[derive(Debug, PartialEq, Eq)]
pub enum ResultsView<'a> {
    Loading,
    NotSearched,
    NoMatches { query: &'a str },
    Results { query: &'a str, entries: &'a [DiaryEntry] },
}

pub struct SearchPage {
    pub query: String,
    entries: Vec<DiaryEntry>,
    loading: bool,
    has_searched: bool,
    error: Option<String>,
    searched_query: String,
    latest_seq: u64,
    site_origin: String,
}

impl SearchPage {
    pub fn new(site_origin: impl Into<String>) -> Self {
        SearchPage {
            query: String::new(),
            entries: Vec::new(),
            loading: false,
            has_searched: false,
            error: None,
            searched_query: String::new(),
            latest_seq: 0,
            site_origin: site_origin.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn entries(&self) -> &[DiaryEntry] {
        &self.entries
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn has_searched(&self) -> bool {
        self.has_searched
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn view(&self) -> ResultsView<'_> {
        if self.loading {
            ResultsView::Loading
        } else if !self.has_searched {
            ResultsView::NotSearched
        } else if self.entries.is_empty() {
            ResultsView::NoMatches {
                query: &self.searched_query,
            }
        } else {
            ResultsView::Results {
                query: &self.searched_query,
                entries: &self.entries,
            }
        }
    }

    /// Runs on mount and whenever the route changes. Seeds the search field
    /// from the `q` parameter but leaves issuing the search to the caller.
    pub fn prepare_mount(
        &mut self,
        auth: &dyn AuthContext,
        navigator: &mut dyn Navigator,
    ) -> MountOutcome {
        if !auth.is_authenticated() {
            info!("not signed in, redirecting to login");
            navigator.redirect(LOGIN_PATH);
            return MountOutcome::Redirected;
        }

        let initial_query = navigator.query_param("q").filter(|q| !q.is_empty());
        if let Some(query) = &initial_query {
            self.query = query.clone();
        }
        MountOutcome::Ready { initial_query }
    }

    pub async fn mount(
        &mut self,
        auth: &dyn AuthContext,
        navigator: &mut dyn Navigator,
        api: &dyn DiaryApi,
    ) -> MountOutcome {
        let outcome = self.prepare_mount(auth, navigator);
        if let MountOutcome::Ready {
            initial_query: Some(query),
        } = &outcome
        {
            self.submit_search(query, api).await;
        }
        outcome
    }

    /// Validates the keyword and enters the loading state. Returns `None`
    /// when the keyword is blank, in which case nothing should be sent.
    pub fn begin_search(&mut self, query: &str) -> Option<SearchTicket> {
        if query.trim().is_empty() {
            self.error = Some(EMPTY_QUERY_MESSAGE.to_string());
            return None;
        }

        self.latest_seq += 1;
        self.loading = true;
        self.error = None;
        debug!(seq = self.latest_seq, query, "search started");
        Some(SearchTicket {
            seq: self.latest_seq,
            query: query.to_string(),
        })
    }

    /// Applies a search outcome. Outcomes of superseded searches are dropped
    /// and `false` is returned.
    pub fn complete_search(
        &mut self,
        ticket: SearchTicket,
        outcome: ApiResult<Vec<DiaryEntry>>,
    ) -> bool {
        if ticket.seq != self.latest_seq {
            debug!(
                seq = ticket.seq,
                latest = self.latest_seq,
                "dropping stale search result"
            );
            return false;
        }

        match outcome {
            Ok(entries) => {
                info!(query = %ticket.query, count = entries.len(), "search finished");
                self.entries = entries;
                self.has_searched = true;
                self.searched_query = ticket.query;
            }
            Err(e) => {
                error!(query = %ticket.query, "search error: {}", e);
                self.error = Some(
                    e.server_message()
                        .unwrap_or(SEARCH_FAILED_MESSAGE)
                        .to_string(),
                );
            }
        }
        self.loading = false;
        true
    }

    pub async fn submit_search(&mut self, query: &str, api: &dyn DiaryApi) {
        if let Some(ticket) = self.begin_search(query) {
            let outcome = api.search(&ticket.query).await;
            self.complete_search(ticket, outcome);
        }
    }

    pub fn remove_entry(&mut self, id: &str) {
        self.entries.retain(|e| e.id != id);
    }

    /// Asks the user before a delete request is sent.
    pub fn confirm_delete(&self, id: &str, dialogs: &mut dyn Dialogs) -> bool {
        let confirmed = dialogs.confirm(CONFIRM_DELETE_MESSAGE);
        debug!(id, confirmed, "delete confirmation");
        confirmed
    }

    pub fn complete_delete(
        &mut self,
        id: &str,
        outcome: ApiResult<()>,
        dialogs: &mut dyn Dialogs,
    ) {
        match outcome {
            Ok(()) => {
                info!(id, "diary deleted");
                self.remove_entry(id);
            }
            Err(e) => {
                error!(id, "failed to delete diary: {}", e);
                dialogs.notify(DELETE_FAILED_MESSAGE);
            }
        }
    }

    pub async fn delete_entry(
        &mut self,
        id: &str,
        api: &dyn DiaryApi,
        dialogs: &mut dyn Dialogs,
    ) {
        if !self.confirm_delete(id, dialogs) {
            return;
        }
        let outcome = api.delete(id).await;
        self.complete_delete(id, outcome, dialogs);
    }

    pub fn share_link(&self, id: &str) -> String {
        format!("{}/share/{}", self.site_origin, id)
    }

    pub async fn share_entry(
        &self,
        id: &str,
        clipboard: &dyn Clipboard,
        dialogs: &mut dyn Dialogs,
    ) {
        let link = self.share_link(id);
        let outcome = clipboard.write_text(&link).await;
        self.complete_share(id, outcome, dialogs);
    }

    pub fn complete_share(
        &self,
        id: &str,
        outcome: Result<(), ClipboardError>,
        dialogs: &mut dyn Dialogs,
    ) {
        match outcome {
            Ok(()) => dialogs.notify(SHARE_COPIED_MESSAGE),
            Err(e) => {
                error!(id, "failed to copy share link: {}", e);
                dialogs.notify(SHARE_FAILED_MESSAGE);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::router::Router;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn entry(id: &str, title: &str) -> DiaryEntry {
        DiaryEntry {
            id: id.to_string(),
            title: title.to_string(),
            is_public: false,
            created_at: "2024-05-01T10:00:00Z".to_string(),
            updated_at: "2024-05-02T10:00:00Z".to_string(),
        }
    }

    #[derive(Default)]
    struct FakeApi {
        searches: Mutex<Vec<String>>,
        deletes: Mutex<Vec<String>>,
        search_results: Mutex<VecDeque<ApiResult<Vec<DiaryEntry>>>>,
        fail_delete: bool,
    }

    impl FakeApi {
        fn answering(results: Vec<ApiResult<Vec<DiaryEntry>>>) -> Self {
            FakeApi {
                search_results: Mutex::new(results.into()),
                ..Default::default()
            }
        }

        fn searches(&self) -> Vec<String> {
            self.searches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DiaryApi for FakeApi {
        async fn search(&self, query: &str) -> ApiResult<Vec<DiaryEntry>> {
            self.searches.lock().unwrap().push(query.to_string());
            self.search_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn delete(&self, id: &str) -> ApiResult<()> {
            self.deletes.lock().unwrap().push(id.to_string());
            if self.fail_delete {
                Err(ApiError::Status {
                    status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                    message: None,
                })
            } else {
                Ok(())
            }
        }
    }

    #[derive(Default)]
    struct ScriptedDialogs {
        answer: bool,
        confirms: Vec<String>,
        notices: Vec<String>,
    }

    impl Dialogs for ScriptedDialogs {
        fn confirm(&mut self, message: &str) -> bool {
            self.confirms.push(message.to_string());
            self.answer
        }

        fn notify(&mut self, message: &str) {
            self.notices.push(message.to_string());
        }
    }

    struct Session(bool);

    impl AuthContext for Session {
        fn is_authenticated(&self) -> bool {
            self.0
        }
    }

    struct FakeClipboard {
        fail: bool,
        written: Mutex<Option<String>>,
    }

    #[async_trait]
    impl Clipboard for FakeClipboard {
        async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
            if self.fail {
                return Err(ClipboardError::Unavailable("denied".to_string()));
            }
            *self.written.lock().unwrap() = Some(text.to_string());
            Ok(())
        }
    }

    fn server_error(message: Option<&str>) -> ApiError {
        ApiError::Status {
            status: reqwest::StatusCode::BAD_GATEWAY,
            message: message.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn blank_query_sets_error_without_request() {
        let api = FakeApi::default();
        let mut page = SearchPage::new("http://localhost:3000");

        for query in ["", "   ", "\t\n"] {
            page.submit_search(query, &api).await;
            assert_eq!(page.error(), Some(EMPTY_QUERY_MESSAGE));
        }
        assert!(api.searches().is_empty());
        assert!(!page.is_loading());
        assert_eq!(page.view(), ResultsView::NotSearched);
    }

    #[tokio::test]
    async fn successful_search_replaces_results() {
        let api = FakeApi::answering(vec![Ok(vec![entry("a", "Beach"), entry("b", "Hike")])]);
        let mut page = SearchPage::new("http://localhost:3000");

        page.submit_search("travel", &api).await;

        assert_eq!(api.searches(), vec!["travel".to_string()]);
        assert!(page.has_searched());
        assert!(page.error().is_none());
        match page.view() {
            ResultsView::Results { query, entries } => {
                assert_eq!(query, "travel");
                assert_eq!(entries.len(), 2);
            }
            other => panic!("unexpected view {:?}", other),
        }
    }

    #[tokio::test]
    async fn empty_result_is_no_matches_not_error() {
        let api = FakeApi::answering(vec![Ok(Vec::new())]);
        let mut page = SearchPage::new("http://localhost:3000");

        page.submit_search("xyz-no-match", &api).await;

        assert!(page.error().is_none());
        assert_eq!(
            page.view(),
            ResultsView::NoMatches {
                query: "xyz-no-match"
            }
        );
    }

    #[tokio::test]
    async fn failed_search_keeps_previous_results() {
        let api = FakeApi::answering(vec![
            Ok(vec![entry("a", "Beach")]),
            Err(server_error(Some("search backend offline"))),
            Err(server_error(None)),
        ]);
        let mut page = SearchPage::new("http://localhost:3000");

        page.submit_search("beach", &api).await;
        page.submit_search("mountain", &api).await;

        assert_eq!(page.error(), Some("search backend offline"));
        assert!(page.has_searched());
        assert_eq!(page.entries(), &[entry("a", "Beach")]);
        assert!(!page.is_loading());

        page.submit_search("river", &api).await;
        assert_eq!(page.error(), Some(SEARCH_FAILED_MESSAGE));
        assert_eq!(page.entries().len(), 1);
    }

    #[test]
    fn failed_first_search_leaves_not_searched() {
        let mut page = SearchPage::new("http://localhost:3000");
        let ticket = page.begin_search("travel").unwrap();
        page.complete_search(ticket, Err(server_error(None)));

        assert!(!page.has_searched());
        assert_eq!(page.view(), ResultsView::NotSearched);
        assert!(page.error().is_some());
    }

    #[test]
    fn loading_spans_request_lifetime() {
        let mut page = SearchPage::new("http://localhost:3000");
        assert!(!page.is_loading());

        let ticket = page.begin_search("travel").unwrap();
        assert!(page.is_loading());
        assert_eq!(page.view(), ResultsView::Loading);

        page.complete_search(ticket, Ok(vec![entry("a", "Beach")]));
        assert!(!page.is_loading());

        let ticket = page.begin_search("travel").unwrap();
        assert!(page.is_loading());
        page.complete_search(ticket, Err(server_error(None)));
        assert!(!page.is_loading());
    }

    #[test]
    fn new_search_clears_previous_error() {
        let mut page = SearchPage::new("http://localhost:3000");
        page.begin_search(" ");
        assert!(page.error().is_some());

        page.begin_search("travel").unwrap();
        assert!(page.error().is_none());
    }

    #[test]
    fn stale_result_cannot_overwrite_newer_search() {
        let mut page = SearchPage::new("http://localhost:3000");
        let slow = page.begin_search("first").unwrap();
        let fast = page.begin_search("second").unwrap();

        assert!(page.complete_search(fast, Ok(vec![entry("b", "Second")])));
        assert!(!page.complete_search(slow, Ok(vec![entry("a", "First")])));

        assert_eq!(page.entries(), &[entry("b", "Second")]);
        assert_eq!(
            page.view(),
            ResultsView::Results {
                query: "second",
                entries: &[entry("b", "Second")]
            }
        );
    }

    #[test]
    fn loading_holds_until_latest_search_resolves() {
        let mut page = SearchPage::new("http://localhost:3000");
        let first = page.begin_search("first").unwrap();
        let second = page.begin_search("second").unwrap();

        page.complete_search(first, Ok(Vec::new()));
        assert!(page.is_loading());
        assert!(!page.has_searched());

        page.complete_search(second, Ok(Vec::new()));
        assert!(!page.is_loading());
    }

    #[tokio::test]
    async fn mount_with_query_searches_immediately() {
        let api = FakeApi::answering(vec![Ok(vec![entry("a", "Kyoto")])]);
        let mut router = Router::parse("/search?q=travel").unwrap();
        let mut page = SearchPage::new("http://localhost:3000");

        let outcome = page.mount(&Session(true), &mut router, &api).await;

        assert_eq!(
            outcome,
            MountOutcome::Ready {
                initial_query: Some("travel".to_string())
            }
        );
        assert_eq!(page.query, "travel");
        assert_eq!(api.searches(), vec!["travel".to_string()]);
        assert_eq!(page.entries().len(), 1);
    }

    #[tokio::test]
    async fn mount_without_query_stays_idle() {
        let api = FakeApi::default();
        let mut router = Router::parse("/search").unwrap();
        let mut page = SearchPage::new("http://localhost:3000");

        let outcome = page.mount(&Session(true), &mut router, &api).await;

        assert_eq!(outcome, MountOutcome::Ready { initial_query: None });
        assert!(api.searches().is_empty());
        assert_eq!(page.view(), ResultsView::NotSearched);
    }

    #[tokio::test]
    async fn unauthenticated_mount_redirects_to_login() {
        let api = FakeApi::default();
        let mut router = Router::parse("/search?q=travel").unwrap();
        let mut page = SearchPage::new("http://localhost:3000");

        let outcome = page.mount(&Session(false), &mut router, &api).await;

        assert_eq!(outcome, MountOutcome::Redirected);
        assert!(router.is_at(LOGIN_PATH));
        assert!(api.searches().is_empty());
        assert!(page.query.is_empty());
    }

    #[tokio::test]
    async fn confirmed_delete_removes_only_that_entry() {
        let api = FakeApi::answering(vec![Ok(vec![
            entry("a", "One"),
            entry("b", "Two"),
            entry("c", "Three"),
        ])]);
        let mut dialogs = ScriptedDialogs {
            answer: true,
            ..Default::default()
        };
        let mut page = SearchPage::new("http://localhost:3000");
        page.submit_search("t", &api).await;

        page.delete_entry("b", &api, &mut dialogs).await;

        assert_eq!(dialogs.confirms, vec![CONFIRM_DELETE_MESSAGE.to_string()]);
        assert_eq!(*api.deletes.lock().unwrap(), vec!["b".to_string()]);
        assert_eq!(page.entries(), &[entry("a", "One"), entry("c", "Three")]);
        assert_eq!(api.searches().len(), 1);
    }

    #[tokio::test]
    async fn declined_delete_does_nothing() {
        let api = FakeApi::answering(vec![Ok(vec![entry("a", "One")])]);
        let mut dialogs = ScriptedDialogs::default();
        let mut page = SearchPage::new("http://localhost:3000");
        page.submit_search("t", &api).await;

        page.delete_entry("a", &api, &mut dialogs).await;

        assert!(api.deletes.lock().unwrap().is_empty());
        assert_eq!(page.entries().len(), 1);
        assert!(dialogs.notices.is_empty());
    }

    #[tokio::test]
    async fn failed_delete_notifies_and_keeps_list() {
        let api = FakeApi {
            fail_delete: true,
            ..FakeApi::answering(vec![Ok(vec![entry("a", "One"), entry("b", "Two")])])
        };
        let mut dialogs = ScriptedDialogs {
            answer: true,
            ..Default::default()
        };
        let mut page = SearchPage::new("http://localhost:3000");
        page.submit_search("t", &api).await;

        page.delete_entry("a", &api, &mut dialogs).await;

        assert_eq!(dialogs.notices, vec![DELETE_FAILED_MESSAGE.to_string()]);
        assert_eq!(page.entries().len(), 2);
        assert!(page.error().is_none());
    }

    #[tokio::test]
    async fn delete_outcome_applied_after_confirmation() {
        let api = FakeApi::answering(vec![Ok(vec![entry("a", "One"), entry("b", "Two")])]);
        let mut page = SearchPage::new("http://localhost:3000");
        page.submit_search("t", &api).await;

        let mut declined = ScriptedDialogs::default();
        assert!(!page.confirm_delete("a", &mut declined));
        assert_eq!(declined.confirms, vec![CONFIRM_DELETE_MESSAGE.to_string()]);

        let mut dialogs = ScriptedDialogs {
            answer: true,
            ..Default::default()
        };
        assert!(page.confirm_delete("a", &mut dialogs));

        // a search finishing while the delete is in flight does not block it
        let ticket = page.begin_search("t").unwrap();
        page.complete_search(ticket, Ok(vec![entry("a", "One"), entry("b", "Two")]));

        page.complete_delete("a", Ok(()), &mut dialogs);
        assert_eq!(page.entries(), &[entry("b", "Two")]);

        page.complete_delete("b", Err(server_error(None)), &mut dialogs);
        assert_eq!(page.entries(), &[entry("b", "Two")]);
        assert_eq!(dialogs.notices, vec![DELETE_FAILED_MESSAGE.to_string()]);
    }

    #[test]
    fn share_outcome_notifies() {
        let page = SearchPage::new("https://diary.example.com");
        let mut dialogs = ScriptedDialogs::default();

        page.complete_share("abc", Ok(()), &mut dialogs);
        page.complete_share(
            "abc",
            Err(ClipboardError::Write("denied".to_string())),
            &mut dialogs,
        );

        assert_eq!(
            dialogs.notices,
            vec![
                SHARE_COPIED_MESSAGE.to_string(),
                SHARE_FAILED_MESSAGE.to_string()
            ]
        );
    }

    #[test]
    fn share_link_joins_origin_and_id() {
        let page = SearchPage::new("https://diary.example.com/");
        assert_eq!(page.share_link("65f0c2"), "https://diary.example.com/share/65f0c2");
    }

    #[tokio::test]
    async fn share_copies_link_and_confirms() {
        let clipboard = FakeClipboard {
            fail: false,
            written: Mutex::new(None),
        };
        let mut dialogs = ScriptedDialogs::default();
        let page = SearchPage::new("https://diary.example.com");

        page.share_entry("abc", &clipboard, &mut dialogs).await;

        assert_eq!(
            clipboard.written.lock().unwrap().as_deref(),
            Some("https://diary.example.com/share/abc")
        );
        assert_eq!(dialogs.notices, vec![SHARE_COPIED_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn share_failure_is_reported() {
        let clipboard = FakeClipboard {
            fail: true,
            written: Mutex::new(None),
        };
        let mut dialogs = ScriptedDialogs::default();
        let page = SearchPage::new("https://diary.example.com");

        page.share_entry("abc", &clipboard, &mut dialogs).await;

        assert_eq!(dialogs.notices, vec![SHARE_FAILED_MESSAGE.to_string()]);
    }
}
