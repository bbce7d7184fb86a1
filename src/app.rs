// App state and main event loop.
// Manages tabs, feeds, modals, and keyboard input handling.

use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind};
use futures::StreamExt;
use ratatui::prelude::*;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::{
    ApiClient, Metadata, MetadataWithName, SearchRequest, SessionNavigator, TagsWithSample, User,
};
use crate::error::{ClassifiedError, Result};
use crate::query::{
    DeletePhoto, MutationCallbacks, MutationExecutor, QueryClient, QueryKey, QueryOptions,
    QueryState, SearchPhotos, UpdatePhoto, UploadPhoto,
};
use crate::state::{
    DetailState, Feed, Form, LoadingState, SearchState, SessionState, update_request,
    upload_form, upload_request,
};
use crate::ui;

/// Active tab in the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Photos,
    Tags,
    Search,
}

impl Tab {
    pub fn title(&self) -> &'static str {
        match self {
            Tab::Photos => "Photos",
            Tab::Tags => "Tags",
            Tab::Search => "Search",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Tab::Photos => Tab::Tags,
            Tab::Tags => Tab::Search,
            Tab::Search => Tab::Photos,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            Tab::Photos => Tab::Search,
            Tab::Tags => Tab::Photos,
            Tab::Search => Tab::Tags,
        }
    }

    /// Location reported to the navigator while this tab is showing.
    fn location(&self) -> &'static str {
        match self {
            Tab::Photos => "/photo",
            Tab::Tags => "/tag",
            Tab::Search => "/search",
        }
    }
}

/// Dialog drawn over the current view.
#[derive(Debug, Clone)]
pub enum Modal {
    Edit { name: String, form: Form },
    Upload(Form),
    ConfirmDelete { name: String },
}

/// Photos of one tag, opened from the Tags tab.
pub struct TagPhotos {
    pub tag: String,
    pub feed: Feed<Vec<MetadataWithName>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

/// Results delivered by background tasks.
#[derive(Debug)]
pub enum AppEvent {
    User(QueryState<User>),
    Metadata {
        name: String,
        state: QueryState<Metadata>,
    },
    SearchResults(std::result::Result<Vec<MetadataWithName>, ClassifiedError>),
    Uploaded(String),
    Updated(String),
    Deleted(String),
    LoggedOut,
    Failed {
        action: String,
        error: String,
    },
}

/// Main application state.
pub struct App {
    pub active_tab: Tab,
    pub should_quit: bool,
    pub show_help: bool,
    pub session: SessionState,
    pub photos: Feed<Vec<MetadataWithName>>,
    pub tags: Feed<TagsWithSample>,
    pub tag_photos: Option<TagPhotos>,
    pub search: SearchState,
    pub detail: Option<DetailState>,
    pub modal: Option<Modal>,
    pub status: Option<StatusMessage>,
    api: ApiClient,
    queries: QueryClient,
    mutations: MutationExecutor,
    navigator: Arc<SessionNavigator>,
    events: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl App {
    /// Must be called inside a tokio runtime; the feeds start their schedulers.
    pub fn new(api: ApiClient, queries: QueryClient, navigator: Arc<SessionNavigator>) -> Self {
        let (events, events_rx) = mpsc::unbounded_channel();
        navigator.set_location(Tab::default().location());
        Self {
            active_tab: Tab::default(),
            should_quit: false,
            show_help: false,
            session: SessionState::default(),
            photos: all_photos(&api, &queries),
            tags: tags_with_sample(&api, &queries),
            tag_photos: None,
            search: SearchState::default(),
            detail: None,
            modal: None,
            status: None,
            mutations: MutationExecutor::new(api.clone()),
            api,
            queries,
            navigator,
            events,
            events_rx,
        }
    }

    /// Main event loop.
    pub async fn run(&mut self, terminal: &mut Terminal<impl Backend>) -> Result<()> {
        let mut input = EventStream::new();
        let mut changes = self.queries.subscribe();
        let mut redraw = tokio::time::interval(Duration::from_millis(100));
        self.load_user();

        while !self.should_quit {
            terminal.draw(|frame| ui::draw(frame, self))?;

            tokio::select! {
                event = input.next() => match event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        self.handle_key(key);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event),
                _ = changes.recv() => {}
                _ = redraw.tick() => {}
            }
        }
        Ok(())
    }

    /// Login URL waiting to be shown after an unauthorized read.
    pub fn login_prompt(&self) -> Option<String> {
        self.navigator.pending_login()
    }

    /// Number of mutations awaiting a response.
    pub fn pending_mutations(&self) -> usize {
        self.mutations.pending()
    }

    fn set_status(&mut self, text: impl Into<String>, is_error: bool) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error,
        });
    }

    fn handle_key(&mut self, key: KeyEvent) {
        self.status = None;

        if self.login_prompt().is_some() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                self.navigator.dismiss_login();
            }
            return;
        }
        if self.modal.is_some() {
            self.handle_modal_key(key);
            return;
        }
        if self.show_help {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
                self.show_help = false;
            }
            return;
        }
        if self.active_tab == Tab::Search && self.search.editing {
            self.handle_search_input(key);
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Tab => self.switch_tab(self.active_tab.next()),
            KeyCode::BackTab => self.switch_tab(self.active_tab.prev()),
            KeyCode::Down | KeyCode::Char('j') => self.select_next(),
            KeyCode::Up | KeyCode::Char('k') => self.select_prev(),
            KeyCode::Enter => self.open_selected(),
            KeyCode::Esc => self.back(),
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Char('l') => self.logout(),
            KeyCode::Char('u') => self.modal = Some(Modal::Upload(upload_form())),
            KeyCode::Char('/') if self.active_tab == Tab::Search => self.search.editing = true,
            KeyCode::Char('e') => {
                if let Some(detail) = &self.detail {
                    if detail.metadata.data().is_some() {
                        self.modal = Some(Modal::Edit {
                            name: detail.name.clone(),
                            form: detail.edit_form(),
                        });
                    }
                }
            }
            KeyCode::Char('d') => {
                if let Some(detail) = &self.detail {
                    self.modal = Some(Modal::ConfirmDelete {
                        name: detail.name.clone(),
                    });
                }
            }
            _ => {}
        }
    }

    fn handle_modal_key(&mut self, key: KeyEvent) {
        let Some(modal) = self.modal.take() else {
            return;
        };

        match (modal, key.code) {
            (_, KeyCode::Esc) => {}
            (Modal::ConfirmDelete { name }, KeyCode::Char('y')) => self.delete_photo(name),
            (Modal::ConfirmDelete { .. }, _) => {}
            (Modal::Edit { name, form }, KeyCode::Enter) => self.update_photo(name, &form),
            (Modal::Upload(form), KeyCode::Enter) => self.upload_photo(form),
            (Modal::Edit { name, mut form }, code) => {
                edit_form(&mut form, code);
                self.modal = Some(Modal::Edit { name, form });
            }
            (Modal::Upload(mut form), code) => {
                edit_form(&mut form, code);
                self.modal = Some(Modal::Upload(form));
            }
        }
    }

    fn handle_search_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.search.editing = false,
            KeyCode::Enter => {
                self.search.editing = false;
                self.run_search();
            }
            KeyCode::Backspace => {
                self.search.input.pop();
            }
            KeyCode::Char(c) => self.search.input.push(c),
            _ => {}
        }
    }

    fn switch_tab(&mut self, tab: Tab) {
        self.photos.hide();
        self.tags.hide();
        if let Some(tag_photos) = &self.tag_photos {
            tag_photos.feed.hide();
        }
        self.active_tab = tab;
        self.detail = None;
        self.navigator.set_location(self.location());
    }

    fn location(&self) -> String {
        match (&self.detail, self.active_tab, &self.tag_photos) {
            (Some(detail), _, _) => format!("/photo/{}", detail.name),
            (None, Tab::Tags, Some(tag_photos)) => format!("/photos-by-tag/{}", tag_photos.tag),
            (None, tab, _) => tab.location().to_string(),
        }
    }

    fn select_next(&mut self) {
        match self.active_tab {
            Tab::Photos => self.photos.select_next(),
            Tab::Tags => match &mut self.tag_photos {
                Some(tag_photos) => tag_photos.feed.select_next(),
                None => self.tags.select_next(),
            },
            Tab::Search => {
                let len = self.search.len();
                self.search.list.select_next(len);
            }
        }
    }

    fn select_prev(&mut self) {
        match self.active_tab {
            Tab::Photos => self.photos.select_prev(),
            Tab::Tags => match &mut self.tag_photos {
                Some(tag_photos) => tag_photos.feed.select_prev(),
                None => self.tags.select_prev(),
            },
            Tab::Search => {
                let len = self.search.len();
                self.search.list.select_prev(len);
            }
        }
    }

    fn open_selected(&mut self) {
        match self.active_tab {
            Tab::Photos => {
                if let Some(name) = selected_name(&self.photos) {
                    self.open_detail(name);
                }
            }
            Tab::Tags => match &self.tag_photos {
                Some(tag_photos) => {
                    if let Some(name) = selected_name(&tag_photos.feed) {
                        self.open_detail(name);
                    }
                }
                None => {
                    if let Some(tag) = selected_tag(&self.tags) {
                        self.open_tag(tag);
                    }
                }
            },
            Tab::Search => {
                if let Some(name) = self.search.selected().map(|m| m.name.clone()) {
                    self.open_detail(name);
                }
            }
        }
    }

    fn back(&mut self) {
        if self.detail.take().is_none() && self.active_tab == Tab::Tags {
            self.tag_photos = None;
        }
        self.navigator.set_location(self.location());
    }

    fn open_tag(&mut self, tag: String) {
        self.tags.hide();
        self.tag_photos = Some(TagPhotos {
            feed: photos_by_tag(&self.api, &self.queries, &tag),
            tag,
        });
        self.navigator.set_location(self.location());
    }

    fn open_detail(&mut self, name: String) {
        self.detail = Some(DetailState::new(name.clone()));
        self.navigator.set_location(self.location());
        self.load_metadata(name);
    }

    fn load_metadata(&self, name: String) {
        let api = self.api.clone();
        let queries = self.queries.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let fetched = name.clone();
            let state = queries
                .query(
                    metadata_key(&name),
                    move || async move { api.metadata(&fetched).await },
                    QueryOptions::default(),
                )
                .await;
            let _ = events.send(AppEvent::Metadata { name, state });
        });
    }

    fn load_user(&self) {
        let api = self.api.clone();
        let queries = self.queries.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let state = queries
                .query(
                    user_key(),
                    move || async move { api.current_user().await },
                    QueryOptions::no_retry(),
                )
                .await;
            let _ = events.send(AppEvent::User(state));
        });
    }

    /// Drop every cached page and start the feeds over.
    fn reload_feeds(&mut self) {
        self.queries.invalidate_prefix(&QueryKey::named("metadatas"));
        self.queries.invalidate_prefix(&QueryKey::named("metadatas-by-tag"));
        self.queries.invalidate_prefix(&QueryKey::named("tags-with-sample"));

        self.photos = all_photos(&self.api, &self.queries);
        self.tags = tags_with_sample(&self.api, &self.queries);
        if let Some(tag_photos) = &mut self.tag_photos {
            tag_photos.feed = photos_by_tag(&self.api, &self.queries, &tag_photos.tag);
        }
    }

    fn refresh(&mut self) {
        info!(tab = self.active_tab.title(), "refreshing");
        self.reload_feeds();
        if let Some(detail) = &mut self.detail {
            self.queries.invalidate(&metadata_key(&detail.name));
            detail.metadata = LoadingState::Loading;
            let name = detail.name.clone();
            self.load_metadata(name);
        }
    }

    fn logout(&mut self) {
        let api = self.api.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let event = match api.logout().await {
                Ok(()) => AppEvent::LoggedOut,
                Err(e) => AppEvent::Failed {
                    action: "logout".to_string(),
                    error: e.to_string(),
                },
            };
            let _ = events.send(event);
        });
    }

    fn run_search(&mut self) {
        let token = self.search.input.trim().to_string();
        if token.is_empty() {
            return;
        }
        self.search.set_results(LoadingState::Loading);

        let ok = self.events.clone();
        let failed = self.events.clone();
        self.mutations.mutate(
            SearchPhotos(SearchRequest { token }),
            MutationCallbacks::new(
                move |found| {
                    let _ = ok.send(AppEvent::SearchResults(Ok(found)));
                },
                move |e| {
                    let _ = failed.send(AppEvent::SearchResults(Err(e)));
                },
            ),
        );
    }

    fn delete_photo(&mut self, name: String) {
        let callbacks = self.callbacks(format!("delete {}", name), {
            let name = name.clone();
            move |()| AppEvent::Deleted(name)
        });
        self.mutations.mutate(DeletePhoto { name }, callbacks);
    }

    fn update_photo(&mut self, name: String, form: &Form) {
        let request = update_request(form);
        let callbacks = self.callbacks(format!("update {}", name), {
            let name = name.clone();
            move |()| AppEvent::Updated(name)
        });
        self.mutations.mutate(UpdatePhoto { name, request }, callbacks);
    }

    fn upload_photo(&mut self, form: Form) {
        let mutations = self.mutations.clone();
        let events = self.events.clone();
        self.set_status("Uploading...", false);

        tokio::spawn(async move {
            let path = form.value("Path").to_string();
            let event = match tokio::fs::read(&path).await {
                Err(e) => AppEvent::Failed {
                    action: format!("read {}", path),
                    error: e.to_string(),
                },
                Ok(data) => match upload_request(&form, data) {
                    None => AppEvent::Failed {
                        action: "upload".to_string(),
                        error: format!("no file name in {:?}", path),
                    },
                    Some(request) => match mutations.execute(UploadPhoto(request)).await {
                        Ok(name) => AppEvent::Uploaded(name),
                        Err(e) => AppEvent::Failed {
                            action: format!("upload {}", path),
                            error: e.to_string(),
                        },
                    },
                },
            };
            let _ = events.send(event);
        });
    }

    /// Callbacks that report a mutation's outcome back to the event loop.
    fn callbacks<T: 'static>(
        &self,
        action: String,
        on_success: impl FnOnce(T) -> AppEvent + Send + 'static,
    ) -> MutationCallbacks<T> {
        let ok = self.events.clone();
        let failed = self.events.clone();
        MutationCallbacks::new(
            move |output| {
                let _ = ok.send(on_success(output));
            },
            move |e: ClassifiedError| {
                let _ = failed.send(AppEvent::Failed {
                    action,
                    error: e.to_string(),
                });
            },
        )
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        debug!(?event, "app event");
        match event {
            AppEvent::User(state) => self.session.user = state.into(),
            AppEvent::Metadata { name, state } => {
                if let Some(detail) = self.detail.as_mut().filter(|d| d.name == name) {
                    detail.metadata = state.into();
                }
            }
            AppEvent::SearchResults(result) => {
                self.search.set_results(LoadingState::from_result(result));
            }
            AppEvent::Uploaded(name) => {
                self.set_status(format!("Uploaded {}", name), false);
                self.reload_feeds();
            }
            AppEvent::Updated(name) => {
                self.set_status(format!("Updated {}", name), false);
                self.queries.invalidate(&metadata_key(&name));
                if self.detail.as_ref().is_some_and(|d| d.name == name) {
                    self.open_detail(name);
                }
                self.reload_feeds();
            }
            AppEvent::Deleted(name) => {
                self.set_status(format!("Deleted {}", name), false);
                self.queries.invalidate(&metadata_key(&name));
                if self.detail.as_ref().is_some_and(|d| d.name == name) {
                    self.detail = None;
                    self.navigator.set_location(self.location());
                }
                self.reload_feeds();
            }
            AppEvent::LoggedOut => {
                info!("logged out");
                self.queries.invalidate(&user_key());
                self.session.user = LoadingState::Loading;
                self.load_user();
            }
            AppEvent::Failed { action, error } => {
                warn!(%action, %error, "action failed");
                self.set_status(format!("{} failed: {}", action, error), true);
            }
        }
    }
}

fn edit_form(form: &mut Form, code: KeyCode) {
    match code {
        KeyCode::Tab => form.focus_next(),
        KeyCode::Backspace => form.backspace(),
        KeyCode::Char(c) => form.input(c),
        _ => {}
    }
}

fn user_key() -> QueryKey {
    QueryKey::named("user")
}

fn metadata_key(name: &str) -> QueryKey {
    QueryKey::named("metadata").with(name)
}

fn all_photos(api: &ApiClient, queries: &QueryClient) -> Feed<Vec<MetadataWithName>> {
    let api = api.clone();
    Feed::spawn(queries.clone(), QueryKey::named("metadatas"), move |page| {
        let api = api.clone();
        async move { api.metadatas(page).await }
    })
}

fn tags_with_sample(api: &ApiClient, queries: &QueryClient) -> Feed<TagsWithSample> {
    let api = api.clone();
    Feed::spawn(
        queries.clone(),
        QueryKey::named("tags-with-sample"),
        move |page| {
            let api = api.clone();
            async move { api.tags_with_sample(page).await }
        },
    )
}

fn photos_by_tag(api: &ApiClient, queries: &QueryClient, tag: &str) -> Feed<Vec<MetadataWithName>> {
    let api = api.clone();
    let owned = tag.to_string();
    Feed::spawn(
        queries.clone(),
        QueryKey::named("metadatas-by-tag").with(tag),
        move |page| {
            let api = api.clone();
            let tag = owned.clone();
            async move { api.metadatas_by_tag(&tag, page).await }
        },
    )
}

fn selected_name(feed: &Feed<Vec<MetadataWithName>>) -> Option<String> {
    let index = feed.list.selected()?;
    let items = feed.snapshot().data?;
    items.get(index).map(|m| m.name.clone())
}

fn selected_tag(feed: &Feed<TagsWithSample>) -> Option<String> {
    let index = feed.list.selected()?;
    let tags = feed.snapshot().data?;
    tags.keys().nth(index).cloned()
}
