use std::sync::Arc;

use crate::{
    api::{
        self, Author, CommentId, CommentPayload, CommentRecord, CommentStore, PostId, SortKey,
        Time, UserId, Vote, VoteKind,
    },
    flatten_thread, insert_reply, normalize_with_report, remove_node, replace_node, update_node,
    Anomalies, CommentPatch, CommentStatus, Config, Debouncer, Error, FlatComment, LayoutMode,
    LayoutStats, Measure, NormalizedComment, PendingChange, PendingLedger, RowLayout,
    Subscription, TempId, ThreadBus, ThreadEvent, ThreadLayout,
};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RequestToken(pub u64);

/// One load of the thread, as issued by the controller
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FetchRequest {
    pub token: RequestToken,
    pub post: PostId,
    pub sort: SortKey,

    /// Search term, `None` when the whole thread is wanted
    pub term: Option<String>,
}

impl FetchRequest {
    pub async fn run<S>(self, store: &S) -> FetchResponse
    where
        S: CommentStore + ?Sized,
    {
        let result = match &self.term {
            None => store.fetch_comments_sorted(self.sort, &self.post).await,
            Some(term) => store.search_comments(term, self.sort, &self.post).await,
        };
        FetchResponse {
            request: self,
            result,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FetchResponse {
    pub request: FetchRequest,
    pub result: Result<Vec<CommentRecord>, api::Error>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ViewState {
    Idle,
    Loading,

    /// Loaded, and the thread has no comment at all
    LoadedEmpty,

    Loaded,

    /// Loaded, and no comment matches the search term
    NoMatch,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Applied {
    Current(ViewState),

    /// The response answered a request that was superseded since, and got ignored
    Stale,
}

/// What the thread view renders, derived from the canonical tree
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Projection {
    Nested(Vec<Arc<NormalizedComment>>),
    Flat(Vec<(Arc<NormalizedComment>, Vec<FlatComment>)>),
}

impl Projection {
    fn of(roots: &[Arc<NormalizedComment>], mode: LayoutMode) -> Projection {
        match mode {
            LayoutMode::Desktop => Projection::Nested(roots.to_vec()),
            LayoutMode::Mobile => Projection::Flat(flatten_thread(roots)),
        }
    }
}

#[derive(Clone, Debug)]
struct Selection {
    state: ViewState,
    sort: SortKey,
    term: Option<String>,
}

#[derive(Clone, Debug)]
struct InFlight {
    token: RequestToken,

    /// What to go back to should the request fail
    previous: Selection,
}

/// Owns the canonical tree of one thread and everything derived from it.
///
/// Store calls are not made here: operations that need the store return the request or payload
/// to send, and the caller hands the answer back with `apply` or one of the `settle_*`
/// functions. Any number of requests may be in flight, only the latest one is ever applied.
#[derive(Debug)]
pub struct ThreadController {
    post: PostId,
    thread_author: UserId,
    config: Config,

    sort: SortKey,
    term: Option<String>,
    state: ViewState,
    in_flight: Option<InFlight>,
    failed: Option<FetchRequest>,
    next_token: u64,

    roots: Vec<Arc<NormalizedComment>>,
    anomalies: Anomalies,
    mode: LayoutMode,
    projection: Projection,
    layout: ThreadLayout,

    pending: PendingLedger,
    search_input: Debouncer<String>,
    bus: ThreadBus,
}

impl ThreadController {
    pub fn new(post: PostId, thread_author: UserId, config: Config) -> ThreadController {
        ThreadController {
            post,
            thread_author,
            sort: config.default_sort,
            term: None,
            state: ViewState::Idle,
            in_flight: None,
            failed: None,
            next_token: 0,
            roots: Vec::new(),
            anomalies: Anomalies::default(),
            mode: config.layout_mode,
            projection: Projection::of(&[], config.layout_mode),
            layout: ThreadLayout::new(),
            pending: PendingLedger::new(),
            search_input: Debouncer::new(config.search_debounce()),
            bus: ThreadBus::new(),
            config,
        }
    }

    pub fn post(&self) -> &PostId {
        &self.post
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn term(&self) -> Option<&str> {
        self.term.as_deref()
    }

    pub fn roots(&self) -> &[Arc<NormalizedComment>] {
        &self.roots
    }

    pub fn anomalies(&self) -> &Anomalies {
        &self.anomalies
    }

    pub fn layout_mode(&self) -> LayoutMode {
        self.mode
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn pending(&self) -> &PendingLedger {
        &self.pending
    }

    pub fn find(&self, id: &CommentId) -> Option<&Arc<NormalizedComment>> {
        NormalizedComment::find_in(&self.roots, id)
    }

    pub fn subscribe(&mut self) -> Subscription {
        self.bus.subscribe()
    }

    fn issue(&mut self, sort: SortKey, term: Option<String>) -> FetchRequest {
        let token = RequestToken(self.next_token);
        self.next_token += 1;
        let previous = match self.in_flight.take() {
            // The view never showed what the superseded request was loading
            Some(f) => f.previous,
            None => Selection {
                state: self.state,
                sort: self.sort,
                term: self.term.clone(),
            },
        };
        self.in_flight = Some(InFlight { token, previous });
        self.failed = None;
        self.sort = sort;
        self.term = term;
        self.state = ViewState::Loading;
        tracing::info!(?token, %sort, term = ?self.term, "loading thread");
        FetchRequest {
            token,
            post: self.post.clone(),
            sort,
            term: self.term.clone(),
        }
    }

    pub fn set_sort(&mut self, sort: SortKey) -> FetchRequest {
        self.issue(sort, self.term.clone())
    }

    /// Searches for `term` within the thread; a blank term goes back to the whole thread
    pub fn commit_search(&mut self, term: &str) -> FetchRequest {
        let term = term.trim();
        let term = (!term.is_empty()).then(|| String::from(term));
        self.issue(self.sort, term)
    }

    pub fn refresh(&mut self) -> FetchRequest {
        self.issue(self.sort, self.term.clone())
    }

    /// Re-issues the last request that failed, if it was not superseded since
    pub fn retry(&mut self) -> Option<FetchRequest> {
        let failed = self.failed.take()?;
        Some(self.issue(failed.sort, failed.term))
    }

    pub fn apply(&mut self, resp: FetchResponse) -> Result<Applied, Error> {
        let FetchResponse { request, result } = resp;
        let in_flight = match self.in_flight.take() {
            Some(f)
                if f.token == request.token
                    && request.sort == self.sort
                    && request.term == self.term =>
            {
                f
            }
            other => {
                self.in_flight = other;
                tracing::debug!(
                    token = ?request.token,
                    sort = %request.sort,
                    "discarding stale comments response"
                );
                return Ok(Applied::Stale);
            }
        };

        match result {
            Ok(records) => {
                let (roots, anomalies) = normalize_with_report(records, &self.thread_author);
                self.anomalies = anomalies;
                self.set_roots(roots);
                self.state = self.loaded_state();
                tracing::info!(token = ?request.token, state = ?self.state, "thread loaded");
                self.bus.publish(ThreadEvent::Refreshed);
                Ok(Applied::Current(self.state))
            }
            Err(source) => {
                let Selection { state, sort, term } = in_flight.previous;
                self.state = state;
                self.sort = sort;
                self.term = term;
                tracing::warn!(token = ?request.token, err = %source, "failed loading thread");
                self.bus.publish(ThreadEvent::FetchFailed {
                    sort: request.sort,
                    term: request.term.clone(),
                });
                self.failed = Some(request.clone());
                Err(Error::Fetch { request, source })
            }
        }
    }

    fn loaded_state(&self) -> ViewState {
        match (self.roots.is_empty(), &self.term) {
            (false, _) => ViewState::Loaded,
            (true, None) => ViewState::LoadedEmpty,
            (true, Some(_)) => ViewState::NoMatch,
        }
    }

    fn set_roots(&mut self, roots: Vec<Arc<NormalizedComment>>) {
        self.roots = roots;
        self.projection = Projection::of(&self.roots, self.mode);
        if matches!(
            self.state,
            ViewState::Loaded | ViewState::LoadedEmpty | ViewState::NoMatch
        ) {
            self.state = self.loaded_state();
        }
    }

    pub fn set_layout_mode(&mut self, mode: LayoutMode) {
        if mode != self.mode {
            self.mode = mode;
            self.projection = Projection::of(&self.roots, mode);
        }
    }

    /// Applies `patch` to the comment `id`, returning whether it is in the thread
    pub fn apply_patch(&mut self, id: &CommentId, patch: &CommentPatch) -> bool {
        if self.find(id).is_none() {
            tracing::debug!(%id, "patched comment is not in the thread");
            return false;
        }
        self.set_roots(update_node(&self.roots, id, patch));
        self.bus.publish(ThreadEvent::CommentChanged(id.clone()));
        true
    }

    /// Adds a comment the store reported, or refreshes it if it is already known
    pub fn insert_comment(&mut self, record: CommentRecord) {
        let comment = NormalizedComment::new(record, &self.thread_author);
        let id = comment.id().clone();
        self.set_roots(insert_reply(&self.roots, comment));
        self.bus.publish(ThreadEvent::CommentChanged(id));
    }

    fn begin_patch(&mut self, id: &CommentId, mut patch: CommentPatch) -> Result<TempId, Error> {
        let current = self
            .find(id)
            .ok_or_else(|| api::Error::NotFound(id.clone()))?;
        patch.status = Some(CommentStatus::Confirmed);
        let undo = patch.undo_for(current);
        let temp_id = self.pending.record(PendingChange::Patch {
            target: id.clone(),
            undo,
        });
        patch.status = Some(CommentStatus::Pending { temp_id });
        self.set_roots(update_node(&self.roots, id, &patch));
        self.bus.publish(ThreadEvent::CommentChanged(id.clone()));
        Ok(temp_id)
    }

    fn settle_patch(
        &mut self,
        temp_id: TempId,
        confirmed: Result<CommentPatch, api::Error>,
    ) -> Result<(), Error> {
        let (target, undo) = match self.pending.get(temp_id) {
            Some(PendingChange::Patch { .. }) => match self.pending.take(temp_id) {
                Some(PendingChange::Patch { target, undo }) => (target, undo),
                _ => return Err(Error::UnknownPending(temp_id)),
            },
            _ => return Err(Error::UnknownPending(temp_id)),
        };
        let (restore, res) = match confirmed {
            Ok(patch) => (patch, Ok(())),
            Err(e) => {
                tracing::warn!(%target, err = %e, "store refused local change, rolling back");
                (undo, Err(Error::Api(e)))
            }
        };
        match self.pending.latest_for(&target) {
            // Newer changes are still displayed: only the fields they leave alone can show
            // `restore` now, and the latest of them has to roll back to it
            Some(newer) => {
                let shown = restore
                    .clone()
                    .without(&self.pending.touched_fields(&target));
                self.pending.hand_over(newer, restore);
                if !shown.is_empty() {
                    self.set_roots(update_node(&self.roots, &target, &shown));
                    self.bus.publish(ThreadEvent::CommentChanged(target));
                }
            }
            None => {
                let restore = CommentPatch {
                    status: Some(CommentStatus::Confirmed),
                    ..restore
                };
                self.set_roots(update_node(&self.roots, &target, &restore));
                self.bus.publish(ThreadEvent::CommentChanged(target));
            }
        }
        res
    }

    /// Shows the edit right away, and returns the payload to send to the store
    pub fn begin_edit(
        &mut self,
        id: &CommentId,
        body: String,
        stripped_body: String,
    ) -> Result<(TempId, CommentPayload), Error> {
        let payload = CommentPayload::Update {
            id: id.clone(),
            body: body.clone(),
            stripped_body: stripped_body.clone(),
        };
        payload.validate()?;
        let temp_id = self.begin_patch(id, CommentPatch::body(body, stripped_body))?;
        Ok((temp_id, payload))
    }

    pub fn settle_edit(
        &mut self,
        temp_id: TempId,
        result: Result<CommentRecord, api::Error>,
    ) -> Result<(), Error> {
        self.settle_patch(temp_id, result.map(|r| CommentPatch::from_record(&r)))
    }

    /// Shows the vote of `user` right away; `None` retracts it
    pub fn begin_vote(
        &mut self,
        id: &CommentId,
        user: &UserId,
        kind: Option<VoteKind>,
    ) -> Result<TempId, Error> {
        let current = self
            .find(id)
            .ok_or_else(|| api::Error::NotFound(id.clone()))?;
        let mut votes = current
            .record
            .votes
            .iter()
            .filter(|v| v.user_id != *user)
            .cloned()
            .collect::<Vec<_>>();
        if let Some(kind) = kind {
            votes.push(Vote {
                user_id: user.clone(),
                kind,
            });
        }
        self.begin_patch(
            id,
            CommentPatch {
                votes: Some(votes),
                ..CommentPatch::default()
            },
        )
    }

    pub fn settle_vote(
        &mut self,
        temp_id: TempId,
        result: Result<Vec<Vote>, api::Error>,
    ) -> Result<(), Error> {
        self.settle_patch(
            temp_id,
            result.map(|votes| CommentPatch {
                votes: Some(votes),
                ..CommentPatch::default()
            }),
        )
    }

    /// Shows a reply to `parent` (a new top-level comment if `None`) under a temporary id,
    /// and returns the payload to send to the store
    pub fn begin_reply(
        &mut self,
        parent: Option<&CommentId>,
        creator_id: UserId,
        author: Author,
        body: String,
        stripped_body: String,
        now: Time,
    ) -> Result<(TempId, CommentPayload), Error> {
        let payload = CommentPayload::Create {
            post_id: self.post.clone(),
            parent_id: parent.cloned(),
            creator_id: creator_id.clone(),
            author: author.clone(),
            body: body.clone(),
            stripped_body: stripped_body.clone(),
        };
        payload.validate()?;

        let id = CommentId::temporary();
        let temp_id = self.pending.record(PendingChange::Reply {
            temp_comment: id.clone(),
        });
        let record = CommentRecord {
            id: id.clone(),
            parent_id: parent.cloned(),
            post_id: self.post.clone(),
            creator_id,
            author,
            body,
            stripped_body,
            created_at: now,
            updated_at: now,
            deleted: false,
            votes: Vec::new(),
            slug: String::new(),
        };
        let mut comment = NormalizedComment::new(record, &self.thread_author);
        comment.status = CommentStatus::Pending { temp_id };
        self.set_roots(insert_reply(&self.roots, comment));
        self.bus.publish(ThreadEvent::CommentChanged(id));
        Ok((temp_id, payload))
    }

    pub fn settle_reply(
        &mut self,
        temp_id: TempId,
        result: Result<CommentRecord, api::Error>,
    ) -> Result<(), Error> {
        let temp_comment = match self.pending.get(temp_id) {
            Some(PendingChange::Reply { .. }) => match self.pending.take(temp_id) {
                Some(PendingChange::Reply { temp_comment }) => temp_comment,
                _ => return Err(Error::UnknownPending(temp_id)),
            },
            _ => return Err(Error::UnknownPending(temp_id)),
        };
        match result {
            Ok(record) => {
                let confirmed = NormalizedComment::new(record, &self.thread_author);
                let id = confirmed.id().clone();
                let roots = if self.find(&id).is_some() {
                    // A refresh already brought the confirmed comment in, replies made to the
                    // temporary node move over to it
                    let moved = self
                        .find(&temp_comment)
                        .map(|temp| temp.replies.clone())
                        .unwrap_or_default();
                    let roots = remove_node(&self.roots, &temp_comment);
                    replace_node(&roots, &id, move |known| {
                        let mut comment = confirmed;
                        comment.replies = known.replies.clone();
                        for r in moved {
                            if NormalizedComment::find_in(&comment.replies, r.id()).is_none() {
                                comment.replies.push(r);
                            }
                        }
                        comment
                    })
                } else if self.find(&temp_comment).is_some() {
                    replace_node(&self.roots, &temp_comment, move |temp| {
                        let mut comment = confirmed;
                        comment.replies = temp.replies.clone();
                        comment
                    })
                } else {
                    insert_reply(&self.roots, confirmed)
                };
                self.set_roots(roots);
                self.bus.publish(ThreadEvent::CommentChanged(id));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(id = %temp_comment, err = %e, "store refused reply, removing it");
                self.set_roots(remove_node(&self.roots, &temp_comment));
                self.bus.publish(ThreadEvent::CommentChanged(temp_comment));
                Err(Error::Api(e))
            }
        }
    }

    pub fn is_collapsed(&self, id: &CommentId) -> bool {
        self.layout.is_collapsed(id)
    }

    /// Returns whether `id` is now collapsed
    pub fn toggle_collapsed(&mut self, id: &CommentId) -> bool {
        self.layout.toggle(id)
    }

    pub fn compute_layout<M>(&mut self, measure: &M) -> (Vec<RowLayout>, LayoutStats)
    where
        M: Measure + ?Sized,
    {
        self.layout.compute(&self.roots, measure)
    }

    /// Records a keystroke in the search box; the search is only committed by `poll_search`
    /// once the input stayed the same for the configured delay
    pub fn search_input(&mut self, term: String, now: Time) {
        self.search_input.schedule(term, now);
    }

    pub fn search_deadline(&self) -> Option<Time> {
        self.search_input.deadline()
    }

    pub fn poll_search(&mut self, now: Time) -> Option<FetchRequest> {
        let term = self.search_input.poll(now)?;
        Some(self.commit_search(&term))
    }

    pub fn cancel_search_input(&mut self) {
        self.search_input.cancel();
    }

    pub fn request_editor(&mut self, id: &CommentId) {
        self.bus.publish(ThreadEvent::OpenEditor(id.clone()));
    }
}
