use crate::audio::{AudioEngine, NullAudioEngine, RodioAudioEngine};
use crate::catalog::Catalog;
use crate::import::{BlobStore, ImportJob, MetadataExtractor};
use crate::library::{self, LoftyExtractor};
use crate::model::{Settings, SidebarView, Track, TrackId};
use crate::nav::{FileSessionFlags, Navigator, SessionFlags, View};
use crate::session::PlaybackSession;
use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::prelude::Rect;
use std::io::stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

const VOLUME_STEP: f32 = 0.05;
pub const EDIT_FIELD_LABELS: [&str; 3] = ["Title", "Artist", "Album"];

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub settings: Settings,
    pub null_audio: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub password: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditForm {
    pub id: TrackId,
    pub fields: [String; 3],
    pub focus: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DashboardMode {
    #[default]
    Browse,
    AddPrompt(String),
    Edit(EditForm),
    ConfirmDelete(TrackId),
}

/// Everything the screens show, minus the terminal and the audio device.
pub struct App {
    pub catalog: Catalog,
    pub session: PlaybackSession,
    pub nav: Navigator,
    pub sidebar: SidebarView,
    pub search: String,
    pub searching: bool,
    pub selected: usize,
    pub login: LoginForm,
    pub dashboard_selected: usize,
    pub dashboard_mode: DashboardMode,
    pub status: String,
    pub dirty: bool,
    seek_step_seconds: f64,
    extractor: Option<Arc<dyn MetadataExtractor>>,
    blobs: Arc<BlobStore>,
    import_job: Option<ImportJob>,
}

impl App {
    pub fn new(
        catalog: Catalog,
        settings: &Settings,
        flags: Box<dyn SessionFlags>,
        extractor: Option<Arc<dyn MetadataExtractor>>,
        blobs: Arc<BlobStore>,
    ) -> Self {
        let session = PlaybackSession::new(&catalog, settings.initial_volume);
        let nav = Navigator::new(flags, &settings.admin_password);
        Self {
            catalog,
            session,
            nav,
            sidebar: SidebarView::default(),
            search: String::new(),
            searching: false,
            selected: 0,
            login: LoginForm::default(),
            dashboard_selected: 0,
            dashboard_mode: DashboardMode::Browse,
            status: String::from("Ready"),
            dirty: true,
            seek_step_seconds: f64::from(settings.seek_step_seconds.max(1)),
            extractor,
            blobs,
            import_job: None,
        }
    }

    /// The track list the player shows. Search wins over the sidebar view.
    pub fn visible_tracks(&self) -> Vec<&Track> {
        if !self.search.trim().is_empty() {
            return self.catalog.search(&self.search);
        }
        match self.sidebar {
            SidebarView::LikedSongs => self.catalog.liked(self.session.liked()),
            _ => self.catalog.list().iter().collect(),
        }
    }

    pub fn visible_ids(&self) -> Vec<TrackId> {
        self.visible_tracks().iter().map(|track| track.id).collect()
    }

    pub fn is_importing(&self) -> bool {
        self.import_job.is_some()
    }

    pub fn selected_track(&self) -> Option<&Track> {
        self.visible_tracks().get(self.selected).copied()
    }

    pub fn dashboard_track(&self) -> Option<&Track> {
        self.catalog.list().get(self.dashboard_selected)
    }

    /// Pulls transport events, expires the toast and collects a finished
    /// import. Called once per loop iteration.
    pub fn tick(&mut self, audio: &mut dyn AudioEngine) {
        self.session.sync_from_transport(&self.catalog, audio);
        self.take_transport_error();
        if self.session.toast.expire(Instant::now()) {
            self.dirty = true;
        }
        self.poll_import(audio);
    }

    /// Returns true when the user asked to quit.
    pub fn handle_key(&mut self, key: KeyEvent, audio: &mut dyn AudioEngine) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }

        self.dirty = true;
        match self.nav.view() {
            View::Player => self.handle_player_key(key, audio),
            View::AdminLogin => {
                self.handle_login_key(key);
                false
            }
            View::AdminDashboard => {
                self.handle_dashboard_key(key, audio);
                false
            }
        }
    }

    fn handle_player_key(&mut self, key: KeyEvent, audio: &mut dyn AudioEngine) -> bool {
        if self.searching {
            match key.code {
                KeyCode::Esc => {
                    self.searching = false;
                    self.search.clear();
                    self.selected = 0;
                }
                KeyCode::Enter => self.searching = false,
                KeyCode::Backspace => {
                    self.search.pop();
                    self.selected = 0;
                }
                KeyCode::Char(ch) => {
                    self.search.push(ch);
                    self.selected = 0;
                }
                _ => {}
            }
            return false;
        }

        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Down => self.select_next(),
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Enter => self.play_selected(audio),
            KeyCode::Char(' ') => {
                self.session.toggle_play_pause(&self.catalog, audio);
                self.take_transport_error();
            }
            KeyCode::Char('n') => {
                self.session.next(&self.catalog, audio);
                self.take_transport_error();
            }
            KeyCode::Char('b') => {
                self.session.prev(&self.catalog, audio);
                self.take_transport_error();
            }
            KeyCode::Right => {
                let target = self.session.position_seconds + self.seek_step_seconds;
                self.session.seek(&self.catalog, audio, target);
            }
            KeyCode::Left => {
                let target = self.session.position_seconds - self.seek_step_seconds;
                self.session.seek(&self.catalog, audio, target);
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.session
                    .set_volume(audio, self.session.volume() + VOLUME_STEP);
                self.status = volume_status(self.session.volume());
            }
            KeyCode::Char('-') => {
                self.session
                    .set_volume(audio, self.session.volume() - VOLUME_STEP);
                self.status = volume_status(self.session.volume());
            }
            KeyCode::Char('m') => {
                self.session.toggle_mute(audio);
                self.status = volume_status(self.session.volume());
            }
            KeyCode::Char('s') => {
                self.session.toggle_shuffle();
                self.status = format!("Shuffle {}", on_off(self.session.shuffle));
            }
            KeyCode::Char('r') => {
                self.session.toggle_repeat();
                self.status = format!("Repeat {}", on_off(self.session.repeat));
            }
            KeyCode::Char('l') => {
                let target = self.selected_track().map(|track| track.id);
                self.toggle_like(target);
            }
            KeyCode::Char('L') => {
                let target = self.session.current_track_id(&self.catalog);
                self.toggle_like(target);
            }
            KeyCode::Tab => {
                self.sidebar = self.sidebar.next();
                self.selected = 0;
            }
            KeyCode::Char('/') => self.searching = true,
            KeyCode::Char('a') => self.nav.navigate(View::AdminDashboard),
            _ => {}
        }
        false
    }

    fn play_selected(&mut self, audio: &mut dyn AudioEngine) {
        let queue = self.visible_ids();
        let Some(id) = queue.get(self.selected).copied() else {
            return;
        };
        self.session.play(&self.catalog, audio, id, queue);
        self.take_transport_error();
    }

    fn toggle_like(&mut self, target: Option<TrackId>) {
        let Some(track) = target.and_then(|id| self.catalog.get(id)) else {
            return;
        };
        let (id, title) = (track.id, track.title.clone());

        self.status = if self.session.toggle_like(id) {
            format!("Liked {title}")
        } else {
            format!("Removed {title} from Liked Songs")
        };
        self.clamp_selection();
    }

    fn select_next(&mut self) {
        let len = self.visible_tracks().len();
        if self.selected + 1 < len {
            self.selected += 1;
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.login = LoginForm::default();
                self.nav.navigate(View::Player);
            }
            KeyCode::Enter => {
                let password = std::mem::take(&mut self.login.password);
                match self.nav.login(&password) {
                    Ok(()) => {
                        self.login = LoginForm::default();
                        self.status = String::from("Signed in as admin");
                    }
                    Err(err) => self.login.error = Some(err.to_string()),
                }
            }
            KeyCode::Backspace => {
                self.login.password.pop();
            }
            KeyCode::Char(ch) => self.login.password.push(ch),
            _ => {}
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyEvent, audio: &mut dyn AudioEngine) {
        match std::mem::take(&mut self.dashboard_mode) {
            DashboardMode::Browse => self.handle_browse_key(key),
            DashboardMode::AddPrompt(input) => self.handle_add_prompt_key(key, input),
            DashboardMode::Edit(form) => self.handle_edit_key(key, form, audio),
            DashboardMode::ConfirmDelete(id) => self.handle_confirm_key(key, id, audio),
        }
    }

    fn handle_browse_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Down => {
                if self.dashboard_selected + 1 < self.catalog.len() {
                    self.dashboard_selected += 1;
                }
            }
            KeyCode::Up => self.dashboard_selected = self.dashboard_selected.saturating_sub(1),
            KeyCode::Char('a') => {
                if self.is_importing() {
                    self.status = String::from("Processing...");
                } else {
                    self.dashboard_mode = DashboardMode::AddPrompt(String::new());
                }
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(track) = self.dashboard_track() {
                    self.dashboard_mode = DashboardMode::Edit(EditForm {
                        id: track.id,
                        fields: [
                            track.title.clone(),
                            track.artist.clone(),
                            track.album.clone(),
                        ],
                        focus: 0,
                    });
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(track) = self.dashboard_track() {
                    self.dashboard_mode = DashboardMode::ConfirmDelete(track.id);
                }
            }
            KeyCode::Char('o') => {
                self.nav.logout();
                self.status = String::from("Signed out");
            }
            KeyCode::Esc | KeyCode::Char('p') => self.nav.navigate(View::Player),
            _ => {}
        }
    }

    fn handle_add_prompt_key(&mut self, key: KeyEvent, mut input: String) {
        match key.code {
            KeyCode::Esc => {}
            KeyCode::Enter => self.start_import(&input),
            KeyCode::Backspace => {
                input.pop();
                self.dashboard_mode = DashboardMode::AddPrompt(input);
            }
            KeyCode::Char(ch) => {
                input.push(ch);
                self.dashboard_mode = DashboardMode::AddPrompt(input);
            }
            _ => self.dashboard_mode = DashboardMode::AddPrompt(input),
        }
    }

    fn start_import(&mut self, input: &str) {
        let selection = library::parse_selection(input);
        let files = library::expand_selection(&selection);

        match ImportJob::start(
            self.extractor.clone(),
            Arc::clone(&self.blobs),
            files,
            self.catalog.ids(),
        ) {
            Ok(job) => {
                self.status = format!("Processing... ({} file(s))", job.file_count());
                self.import_job = Some(job);
            }
            Err(err) => self.status = err.to_string(),
        }
    }

    fn poll_import(&mut self, audio: &mut dyn AudioEngine) {
        let Some(report) = self.import_job.as_ref().and_then(ImportJob::poll) else {
            return;
        };
        self.import_job = None;

        let skipped = report.failures.len();
        let added = self.catalog.add(report.tracks);
        self.session.on_catalog_changed(&self.catalog, audio);
        self.status = if skipped == 0 {
            format!("Imported {added} track(s)")
        } else {
            format!("Imported {added} track(s), skipped {skipped} unreadable file(s)")
        };
        self.dirty = true;
    }

    fn handle_edit_key(&mut self, key: KeyEvent, mut form: EditForm, audio: &mut dyn AudioEngine) {
        match key.code {
            KeyCode::Esc => return,
            KeyCode::Enter => {
                self.save_edit(&form, audio);
                return;
            }
            KeyCode::Tab | KeyCode::Down => form.focus = (form.focus + 1) % form.fields.len(),
            KeyCode::BackTab | KeyCode::Up => {
                form.focus = (form.focus + form.fields.len() - 1) % form.fields.len();
            }
            KeyCode::Backspace => {
                form.fields[form.focus].pop();
            }
            KeyCode::Char(ch) => form.fields[form.focus].push(ch),
            _ => {}
        }
        self.dashboard_mode = DashboardMode::Edit(form);
    }

    fn save_edit(&mut self, form: &EditForm, audio: &mut dyn AudioEngine) {
        let Some(existing) = self.catalog.get(form.id) else {
            self.status = String::from("Track no longer exists");
            return;
        };
        let [title, artist, album] = &form.fields;
        let edited = existing.with_edits(title, artist, album);
        let title = edited.title.clone();

        if self.catalog.update(edited) {
            self.session.on_catalog_changed(&self.catalog, audio);
            self.status = format!("Updated {title}");
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent, id: TrackId, audio: &mut dyn AudioEngine) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                if let Some(track) = self.catalog.remove(id) {
                    self.session.on_catalog_changed(&self.catalog, audio);
                    self.status = format!("Deleted {}", track.title);
                    self.clamp_selection();
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {}
            _ => self.dashboard_mode = DashboardMode::ConfirmDelete(id),
        }
    }

    fn take_transport_error(&mut self) {
        if let Some(err) = self.session.last_error.take() {
            self.status = format!("playback error: {err}");
            self.dirty = true;
        }
    }

    fn clamp_selection(&mut self) {
        let visible = self.visible_tracks().len();
        self.selected = self.selected.min(visible.saturating_sub(1));
        self.dashboard_selected = self
            .dashboard_selected
            .min(self.catalog.len().saturating_sub(1));
    }

    fn handle_mouse(&mut self, mouse: MouseEvent, track_list_rect: Rect) {
        if self.nav.view() != View::Player
            || !point_in_rect(mouse.column, mouse.row, track_list_rect)
        {
            return;
        }
        match mouse.kind {
            MouseEventKind::ScrollDown => self.select_next(),
            MouseEventKind::ScrollUp => self.selected = self.selected.saturating_sub(1),
            _ => return,
        }
        self.dirty = true;
    }
}

fn volume_status(volume: f32) -> String {
    format!("Volume: {}%", (volume * 100.0).round() as u16)
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    if rect.width == 0 || rect.height == 0 {
        return false;
    }
    x >= rect.x
        && x < rect.x.saturating_add(rect.width)
        && y >= rect.y
        && y < rect.y.saturating_add(rect.height)
}

fn open_audio(null_audio: bool) -> Box<dyn AudioEngine> {
    if null_audio {
        return Box::new(NullAudioEngine::new());
    }
    match RodioAudioEngine::new() {
        Ok(engine) => {
            tracing::info!(output = ?engine.output_name(), "audio output opened");
            Box::new(engine)
        }
        Err(err) => {
            tracing::warn!("no audio output, using silent engine: {err:#}");
            Box::new(NullAudioEngine::new())
        }
    }
}

pub fn run(options: RunOptions) -> Result<()> {
    let catalog = if options.settings.seed_catalog {
        Catalog::seeded()
    } else {
        Catalog::new()
    };
    let extractor: Arc<dyn MetadataExtractor> = Arc::new(LoftyExtractor);
    let blobs = Arc::new(BlobStore::new()?);
    let mut app = App::new(
        catalog,
        &options.settings,
        Box::new(FileSessionFlags::for_current_session()),
        Some(extractor),
        blobs,
    );

    let mut audio = open_audio(options.null_audio);
    audio.set_volume(app.session.volume());

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut last_draw = Instant::now();
    let mut track_list_rect = Rect::default();

    let result: Result<()> = loop {
        app.tick(&mut *audio);

        if app.dirty || last_draw.elapsed() > Duration::from_millis(250) {
            terminal.draw(|frame| {
                track_list_rect = crate::ui::track_list_rect(frame.area());
                crate::ui::draw(frame, &app, &*audio)
            })?;
            app.dirty = false;
            last_draw = Instant::now();
        }

        if !event::poll(Duration::from_millis(33))? {
            continue;
        }

        match event::read()? {
            Event::Mouse(mouse) => app.handle_mouse(mouse, track_list_rect),
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if app.handle_key(key, &mut *audio) {
                    break Ok(());
                }
            }
            Event::Resize(_, _) => app.dirty = true,
            _ => {}
        }
    };

    audio.stop();
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    tracing::info!("player closed");
    result
}
