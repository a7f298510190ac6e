//! Per-window session: lifecycle phases, the command pump, and the
//! preview title feed.
//!
//! A [`WindowSession`] ties a [`RootStore`] to one side of the bridge.
//! Its lifecycle is a one-way phase machine: `Uninitialized` to
//! `Initializing` to `Ready`, and from anywhere to the terminal `Closed`.
//! A failed initialization parks the session in `Initializing`; it never
//! reports ready and never regresses.
//!
//! The command pump consumes bridge commands in order. Handlers log
//! failures and keep pumping; a bad command must not take the window
//! down.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{mpsc, watch};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use crate::bridge::{ImportItem, ToWindow, WindowNotifier};
use crate::entity::{FileId, FileRecord};
use crate::error::StoreError;
use crate::root::{InitOptions, RootStore};

/// Base title of a preview window, shown alone when nothing is loaded.
pub const PREVIEW_WINDOW_BASENAME: &str = "Quick View";

/// Which role a window plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    /// The library window: full file mirror, persisted preferences.
    Main,
    /// A preview window: scoped file mirror, slide view, no preferences.
    Preview,
}

/// Lifecycle phase of a window session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    /// Created, initialization not yet requested.
    Uninitialized,
    /// Initialization requested; stays here if it fails.
    Initializing,
    /// Fully initialized and serving commands.
    Ready,
    /// Closed. Terminal; no transition leaves this phase.
    Closed,
}

/// One window's session over a root store and a bridge endpoint.
pub struct WindowSession {
    kind: WindowKind,
    root: Arc<RootStore>,
    phase: Mutex<WindowPhase>,
    notifier: WindowNotifier,
    title_tx: watch::Sender<String>,
}

impl WindowSession {
    /// Create a session. Preview sessions immediately start feeding
    /// their title from the file list and selection.
    pub fn new(kind: WindowKind, root: Arc<RootStore>, notifier: WindowNotifier) -> Self {
        let (title_tx, _) = watch::channel(PREVIEW_WINDOW_BASENAME.to_owned());
        if kind == WindowKind::Preview {
            wire_title_feed(&root, &title_tx);
        }
        Self {
            kind,
            root,
            phase: Mutex::new(WindowPhase::Uninitialized),
            notifier,
            title_tx,
        }
    }

    /// The role of this window.
    pub fn kind(&self) -> WindowKind {
        self.kind
    }

    /// The store graph this session drives.
    pub fn root(&self) -> &Arc<RootStore> {
        &self.root
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> WindowPhase {
        *self.lock_phase()
    }

    /// Watch the window title. Only preview sessions ever update it.
    pub fn title_watch(&self) -> watch::Receiver<String> {
        self.title_tx.subscribe()
    }

    fn lock_phase(&self) -> MutexGuard<'_, WindowPhase> {
        self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Initialize the session: bring up the store graph for this window
    /// kind, then announce readiness over the bridge.
    ///
    /// Allowed only from `Uninitialized`. On failure the phase stays
    /// `Initializing` and the error is returned; readiness is never
    /// announced for a half-initialized window.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        {
            let mut phase = self.lock_phase();
            match *phase {
                WindowPhase::Uninitialized => *phase = WindowPhase::Initializing,
                WindowPhase::Initializing => {
                    return Err(StoreError::InvalidPhase("initialization already requested"));
                }
                WindowPhase::Ready => {
                    return Err(StoreError::InvalidPhase("window already initialized"));
                }
                WindowPhase::Closed => return Err(StoreError::InvalidPhase("window closed")),
            }
        }

        let opts = match self.kind {
            WindowKind::Main => InitOptions::main_window(),
            WindowKind::Preview => InitOptions::preview_window(),
        };
        self.root.init(opts).await?;

        *self.lock_phase() = WindowPhase::Ready;
        if let Err(e) = self.notifier.notify_initialized().await {
            tracing::warn!(error = %e, "could not announce readiness");
        }
        tracing::info!(kind = ?self.kind, "window ready");
        Ok(())
    }

    /// Consume bridge commands until the channel closes or the session
    /// is closed. Handler failures are logged, never propagated; one bad
    /// command must not stop the pump.
    pub async fn run(self: Arc<Self>, commands: mpsc::Receiver<ToWindow>) {
        let mut stream = ReceiverStream::new(commands);
        while let Some(command) = stream.next().await {
            if self.phase() == WindowPhase::Closed {
                break;
            }
            self.handle(command).await;
        }
        tracing::debug!(kind = ?self.kind, "command pump stopped");
    }

    async fn handle(&self, command: ToWindow) {
        match command {
            ToWindow::ImportExternalImage(item) => {
                if let Err(e) = self.import_external_image(item).await {
                    tracing::error!(error = %e, "external import failed");
                }
            }
            ToWindow::AddTagsToFile {
                file_path,
                tag_names,
            } => {
                self.add_tags_to_file(&file_path, tag_names).await;
            }
            ToWindow::GetTags { reply } => {
                let result = self.root.fetch_tags_direct().await;
                if reply.send(result).is_err() {
                    tracing::warn!("tag query reply dropped");
                }
            }
            ToWindow::ReceivePreviewFiles {
                file_ids,
                thumbnail_directory,
            } => {
                self.receive_preview_files(file_ids, thumbnail_directory)
                    .await;
            }
            ToWindow::ClosedPreviewWindow => {
                self.root.ui().set_preview_open(false);
            }
        }
    }

    /// Import a file and resolve its tag names onto it.
    async fn import_external_image(&self, item: ImportItem) -> Result<(), StoreError> {
        let file = self
            .root
            .files()
            .add_file(item.file_path, item.date_added)
            .await?;
        if !item.tag_names.is_empty() {
            self.root
                .resolver()
                .tag_file(self.root.files(), &file.id, item.tag_names)
                .await?;
        }
        Ok(())
    }

    /// Resolve tag names onto the file at `path`. An unknown path is a
    /// warning, not an error: the sender's view of the library may be
    /// stale and the command simply no longer applies.
    async fn add_tags_to_file(&self, path: &Path, tag_names: Vec<String>) {
        let Some(file) = self.root.files().find_by_path(path) else {
            tracing::warn!(path = %path.display(), "ignoring tags for unknown file");
            return;
        };
        if let Err(e) = self
            .root
            .resolver()
            .tag_file(self.root.files(), &file.id, tag_names)
            .await
        {
            tracing::error!(file = %file.id, error = %e, "tagging failed");
        }
    }

    /// Scope this preview window to a pushed file subset: reset the view
    /// to the first item in slide mode, then load exactly those files.
    async fn receive_preview_files(
        &self,
        file_ids: Vec<FileId>,
        thumbnail_directory: Option<PathBuf>,
    ) {
        if self.kind != WindowKind::Preview {
            tracing::warn!("main window ignored a preview file push");
            return;
        }
        let ui = self.root.ui();
        ui.set_first_item(0);
        if let Some(dir) = thumbnail_directory {
            ui.set_thumbnail_directory(dir);
        }
        ui.set_view_slide();
        if let Err(e) = self.root.files().fetch_by_ids(file_ids).await {
            tracing::error!(error = %e, "preview file load failed");
        }
    }

    /// Close this window's session.
    ///
    /// A main window persists its UI preferences on the way out; a
    /// preview window tears down its scoped state via
    /// [`close_preview`](WindowSession::close_preview). Idempotent.
    pub async fn close(&self) -> Result<(), StoreError> {
        if self.kind == WindowKind::Preview {
            return self.close_preview().await;
        }
        {
            let mut phase = self.lock_phase();
            if *phase == WindowPhase::Closed {
                return Ok(());
            }
            *phase = WindowPhase::Closed;
        }
        self.root.ui().store_persistent_preferences()?;
        tracing::info!("main window closed");
        Ok(())
    }

    /// Close a preview window: drop its volatile view state and announce
    /// the close over the bridge. Idempotent; the phase becomes `Closed`
    /// and nothing revives the session afterwards.
    pub async fn close_preview(&self) -> Result<(), StoreError> {
        if self.kind != WindowKind::Preview {
            return Err(StoreError::InvalidPhase("not a preview window"));
        }
        {
            let mut phase = self.lock_phase();
            if *phase == WindowPhase::Closed {
                return Ok(());
            }
            *phase = WindowPhase::Closed;
        }

        let ui = self.root.ui();
        ui.clear_file_selection();
        self.root.files().clear_list();
        ui.set_view_slide();

        if let Err(e) = self.notifier.notify_preview_closed().await {
            tracing::warn!(error = %e, "could not announce preview close");
        }
        tracing::info!("preview window closed");
        Ok(())
    }
}

/// Subscribe the title feed to the file list and selection of a preview
/// window. The subscriptions live as long as the mirrors do.
fn wire_title_feed(root: &Arc<RootStore>, title_tx: &watch::Sender<String>) {
    let on_files = {
        let root = root.clone();
        let tx = title_tx.clone();
        move |_: &[FileRecord]| push_preview_title(&root, &tx)
    };
    root.files().file_list().subscribe(on_files);

    let on_selection = {
        let root = root.clone();
        let tx = title_tx.clone();
        move |_: &[FileId]| push_preview_title(&root, &tx)
    };
    root.ui().file_selection().subscribe(on_selection);
}

/// Recompute and publish the preview title: the selected file's name if
/// one is selected, else the first file's, else the bare basename.
fn push_preview_title(root: &RootStore, tx: &watch::Sender<String>) {
    let shown = root
        .ui()
        .file_selection()
        .first()
        .and_then(|id| root.files().get(&id))
        .or_else(|| root.files().file_list().first());
    let title = match shown.as_ref().and_then(|f| f.path.file_name()) {
        Some(name) => format!("{} - {}", name.to_string_lossy(), PREVIEW_WINDOW_BASENAME),
        None => PREVIEW_WINDOW_BASENAME.to_owned(),
    };
    // Receivers may not exist yet; the watch keeps the latest value.
    let _ = tx.send(title);
}
