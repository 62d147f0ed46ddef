//! The modal navigation state machine.
//!
//! [`Navigator`] owns the [`DirectoryModel`], the [`NavState`] and the
//! rendered projection of the current listing. Commands go through one
//! total `(mode, command)` table in [`Navigator::handle`]; background
//! progress comes in through [`Navigator::pump`].

use std::collections::VecDeque;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;
use crate::error::CoreResult;
use crate::fs::entry::{Entry, EntrySize};
use crate::fs::listing::Listing;
use crate::fs::ops;
use crate::fs::preview::PreviewSource;
use crate::model::{DirectoryModel, ListingChange, ListingUpdate};
use crate::nav::filter::{self, SortKey};
use crate::nav::history::History;
use crate::nav::{Command, CommandSource, Mode, Opener};

/// Most recent activity lines kept for display.
const ACTIVITY_CAPACITY: usize = 200;

/// Where the user is and what they are doing.
#[derive(Debug, Clone)]
pub struct NavState {
    pub current_path: PathBuf,
    /// Index into the rendered projection; 0 when it is empty.
    pub cursor: usize,
    pub mode: Mode,
    pub history: History,
}

/// Display preferences that shape the projection.
#[derive(Debug, Clone)]
pub struct ViewOptions {
    pub show_hidden: bool,
    pub sort: SortKey,
    pub preview_lines: usize,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ViewOptions {
    fn from(config: &Config) -> Self {
        let sort = SortKey::parse(&config.general.default_sort).unwrap_or_else(|| {
            tracing::warn!("unknown sort {:?}", config.general.default_sort);
            SortKey::default()
        });
        Self {
            show_hidden: config.general.show_hidden,
            sort,
            preview_lines: config.preview.max_lines,
        }
    }
}

/// Text shown in Preview mode for one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub name: OsString,
    pub content: Result<Vec<String>, String>,
}

/// The navigation controller.
pub struct Navigator {
    model: DirectoryModel,
    previewer: Box<dyn PreviewSource>,
    opener: Box<dyn Opener>,
    state: NavState,
    options: ViewOptions,
    view: Vec<Entry>,
    query: String,
    preview: Option<Preview>,
    status: Option<String>,
    activity: VecDeque<String>,
    last_version: u64,
    quit: bool,
}

impl Navigator {
    /// Opens `start` and builds the initial projection.
    ///
    /// # Errors
    ///
    /// Any error from opening the start directory.
    pub fn new(
        mut model: DirectoryModel,
        start: &Path,
        previewer: Box<dyn PreviewSource>,
        opener: Box<dyn Opener>,
        options: ViewOptions,
    ) -> CoreResult<Self> {
        let listing = model.open(start)?;
        let mut nav = Self {
            model,
            previewer,
            opener,
            state: NavState {
                current_path: listing.path().to_path_buf(),
                cursor: 0,
                mode: Mode::Normal,
                history: History::new(),
            },
            options,
            view: Vec::new(),
            query: String::new(),
            preview: None,
            status: None,
            activity: VecDeque::new(),
            last_version: listing.version(),
            quit: false,
        };
        nav.rebuild(None);
        Ok(nav)
    }

    pub fn state(&self) -> &NavState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    /// The rendered projection: filtered, sorted entries.
    pub fn view(&self) -> &[Entry] {
        &self.view
    }

    pub fn selected(&self) -> Option<&Entry> {
        self.view.get(self.state.cursor)
    }

    pub fn listing(&self) -> Option<&Listing> {
        self.model.listing(&self.state.current_path)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Recent activity, oldest first.
    pub fn activity(&self) -> impl Iterator<Item = &str> {
        self.activity.iter().map(String::as_str)
    }

    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Applies one command.
    pub fn handle(&mut self, cmd: Command) {
        self.status = None;
        match (self.state.mode, cmd) {
            (_, Command::Quit) => self.quit = true,
            (_, Command::Cancel) => self.set_mode(Mode::Normal),

            (_, Command::MoveUp) => self.move_cursor_by(-1),
            (_, Command::MoveDown) => self.move_cursor_by(1),
            (_, Command::CursorTop) => self.move_cursor_to(0),
            (_, Command::CursorBottom) => self.move_cursor_to(self.view.len().saturating_sub(1)),

            (Mode::Normal | Mode::Preview, Command::Descend) => self.descend(),
            (Mode::Search, Command::Descend) => {
                self.set_mode(Mode::Normal);
                if self.selected().is_some_and(Entry::is_dir) {
                    self.descend();
                }
            }
            (Mode::Normal | Mode::Preview, Command::Ascend) => self.ascend(),
            (Mode::Search, Command::Ascend) => {
                self.set_mode(Mode::Normal);
                self.ascend();
            }

            (mode, Command::ToggleMode(target)) if mode == target => self.set_mode(Mode::Normal),
            (_, Command::ToggleMode(target)) => self.set_mode(target),

            (_, Command::OpenExternally) => self.open_selected(),
            (_, Command::Refresh) => self.refresh(),
            (_, Command::ComputeSize) => self.compute_selected(),
            (_, Command::ToggleHidden) => {
                self.options.show_hidden = !self.options.show_hidden;
                self.rebuild_keeping_selection();
            }
            (_, Command::CycleSort) => {
                self.options.sort = self.options.sort.next();
                self.rebuild_keeping_selection();
                self.status = Some(format!("sort: {}", self.options.sort.label()));
            }

            (Mode::Search, Command::FilterChar(c)) => {
                self.query.push(c);
                self.rebuild(None);
            }
            (Mode::Search, Command::Backspace) => {
                self.query.pop();
                self.rebuild_keeping_selection();
            }
            (Mode::Normal | Mode::Preview, Command::FilterChar(_) | Command::Backspace) => {}
        }
    }

    /// Drains model updates and refreshes the projection if the current
    /// listing changed. Returns the number of updates applied.
    pub fn pump(&mut self) -> usize {
        let updates: Vec<ListingUpdate> = self.model.updates().collect();
        let mut applied = 0;
        for update in updates {
            self.record(&update);
            if update.path != self.state.current_path || update.version <= self.last_version {
                continue;
            }
            self.last_version = update.version;
            applied += 1;
        }
        if applied > 0 {
            self.rebuild_keeping_selection();
        }
        applied
    }

    /// Runs the cooperative loop until [`Command::Quit`].
    ///
    /// Each turn draws, waits up to `tick` for one command, applies it and
    /// drains background updates.
    ///
    /// # Errors
    ///
    /// Propagates failures of `draw` and of the command source.
    pub fn run<S, D>(&mut self, source: &mut S, tick: Duration, mut draw: D) -> std::io::Result<()>
    where
        S: CommandSource + ?Sized,
        D: FnMut(&Navigator) -> std::io::Result<()>,
    {
        while !self.quit {
            draw(self)?;
            if let Some(cmd) = source.next_command(self.state.mode, tick)? {
                self.handle(cmd);
            }
            self.pump();
        }
        Ok(())
    }

    fn set_mode(&mut self, mode: Mode) {
        let previous = self.state.mode;
        if previous == mode {
            return;
        }
        self.state.mode = mode;

        if previous == Mode::Search {
            self.query.clear();
            self.rebuild_keeping_selection();
        }
        match mode {
            Mode::Preview => self.load_preview(),
            Mode::Search => self.query.clear(),
            Mode::Normal => {}
        }
        if mode != Mode::Preview {
            self.preview = None;
        }
    }

    fn move_cursor_by(&mut self, delta: isize) {
        let target = self.state.cursor.saturating_add_signed(delta);
        self.move_cursor_to(target);
    }

    fn move_cursor_to(&mut self, index: usize) {
        let clamped = index.min(self.view.len().saturating_sub(1));
        if clamped == self.state.cursor {
            return;
        }
        self.state.cursor = clamped;
        if self.state.mode == Mode::Preview {
            self.load_preview();
        }
    }

    fn descend(&mut self) {
        let Some(entry) = self.selected().cloned() else {
            return;
        };
        let target = self.state.current_path.join(entry.name());
        if !ops::is_navigable_dir(&target) {
            self.status = Some(format!("{} is not a directory", entry.display_name()));
            return;
        }
        let previous = self.state.current_path.clone();
        let history = self
            .state
            .history
            .remember(&previous, entry.name())
            .push(previous.clone());
        self.switch_to(&target, history, None);
    }

    fn ascend(&mut self) {
        let current = self.state.current_path.clone();
        let (history, target) = match self.state.history.pop() {
            Some((history, path)) => (history, path),
            None => match current.parent() {
                Some(parent) => (self.state.history.clone(), parent.to_path_buf()),
                None => return,
            },
        };
        let history = match self.selected() {
            Some(entry) => history.remember(&current, entry.name()),
            None => history,
        };
        let focus = current.file_name().map(OsStr::to_os_string);
        self.switch_to(&target, history, focus);
    }

    /// Opens `target` and, only if that succeeds, closes the current
    /// directory and moves there.
    fn switch_to(&mut self, target: &Path, history: History, focus: Option<OsString>) {
        let listing = match self.model.open(target) {
            Ok(listing) => listing,
            Err(e) => {
                tracing::debug!("cannot open {}: {e}", target.display());
                self.status = Some(e.to_string());
                self.push_activity(format!("error: {e}"));
                return;
            }
        };

        let previous = std::mem::replace(&mut self.state.current_path, listing.path().to_path_buf());
        if previous != self.state.current_path {
            self.model.close(&previous);
        }
        self.state.history = history;
        self.state.mode = Mode::Normal;
        self.query.clear();
        self.preview = None;
        self.last_version = listing.version();

        let focus = focus.or_else(|| {
            self.state
                .history
                .remembered(&self.state.current_path)
                .map(OsStr::to_os_string)
        });
        self.state.cursor = 0;
        self.rebuild(focus.as_deref());
    }

    fn open_selected(&mut self) {
        let Some(entry) = self.selected() else {
            return;
        };
        let path = self.state.current_path.join(entry.name());
        self.push_activity(format!("opened {}", entry.display_name()));
        self.opener.open(&path);
    }

    fn refresh(&mut self) {
        if let Err(e) = self.model.refresh(&self.state.current_path) {
            self.status = Some(e.to_string());
        }
        self.pump();
    }

    fn compute_selected(&mut self) {
        let Some(name) = self.selected().map(|e| e.name().to_os_string()) else {
            return;
        };
        if let Err(e) = self.model.request_size(&self.state.current_path, &name) {
            self.status = Some(e.to_string());
        }
        self.pump();
    }

    fn load_preview(&mut self) {
        let Some(entry) = self.selected() else {
            self.preview = None;
            return;
        };
        let name = entry.name().to_os_string();
        let content = if entry.is_dir() {
            Err("directory".to_string())
        } else {
            let path = self.state.current_path.join(&name);
            self.previewer
                .preview(&path)
                .map(|lines| lines.take(self.options.preview_lines).collect())
                .map_err(|e| e.to_string())
        };
        self.preview = Some(Preview { name, content });
    }

    fn rebuild_keeping_selection(&mut self) {
        let selected = self.selected().map(|e| e.name().to_os_string());
        self.rebuild(selected.as_deref());
    }

    /// Recomputes the projection and places the cursor on `focus` when it
    /// is visible, otherwise clamps it.
    fn rebuild(&mut self, focus: Option<&OsStr>) {
        self.view = match self.model.listing(&self.state.current_path) {
            Some(listing) => filter::project(
                listing.entries(),
                self.options.show_hidden,
                &self.query,
                self.options.sort,
            ),
            None => Vec::new(),
        };

        let found = focus.and_then(|name| self.view.iter().position(|e| e.name() == name));
        self.state.cursor = match found {
            Some(idx) => idx,
            None if self.query.is_empty() || focus.is_some() => {
                self.state.cursor.min(self.view.len().saturating_sub(1))
            }
            None => 0,
        };

        if self.state.mode == Mode::Preview {
            let stale = self
                .preview
                .as_ref()
                .map(|p| Some(p.name.as_os_str()) != self.selected().map(Entry::name))
                .unwrap_or(true);
            if stale {
                self.load_preview();
            }
        }
    }

    fn record(&mut self, update: &ListingUpdate) {
        let line = match &update.change {
            ListingChange::Sized { entry, elapsed } => match entry.size() {
                EntrySize::Known(_) => format!(
                    "size of {} computed in {}",
                    entry.display_name(),
                    format_elapsed(*elapsed)
                ),
                EntrySize::Unavailable(reason) => {
                    format!("size of {} unavailable: {reason}", entry.display_name())
                }
                _ => return,
            },
            ListingChange::Removed(entry) => format!("removed {}", entry.display_name()),
            ListingChange::Renamed { from, entry } => {
                format!(
                    "renamed {} → {}",
                    crate::nfc_string(&from.to_string_lossy()),
                    entry.display_name()
                )
            }
            ListingChange::WatchLost(reason) => {
                format!("watch lost on {}: {reason}", update.path.display())
            }
            ListingChange::Changed(_) | ListingChange::Reloaded => return,
        };
        self.push_activity(line);
    }

    fn push_activity(&mut self, line: String) {
        if self.activity.len() == ACTIVITY_CAPACITY {
            self.activity.pop_front();
        }
        self.activity.push_back(line);
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    if elapsed.as_secs() >= 1 {
        format!("{:.1}s", elapsed.as_secs_f64())
    } else {
        format!("{}ms", elapsed.as_millis())
    }
}
