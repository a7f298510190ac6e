//! The inter-process bridge between the window orchestrator and a window.
//!
//! Messages flow over a pair of bounded `mpsc` channels, one per
//! direction. Commands are fire-and-forget except
//! [`ToWindow::GetTags`], which carries a `oneshot` reply sender so the
//! caller can await the authoritative tag table without a correlation-id
//! scheme.
//!
//! Delivery is ordered per direction and at-most-once; a dropped far
//! side surfaces as [`BridgeError::Closed`] on the next send.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};

use crate::entity::{FileId, TagRecord};
use crate::error::{BridgeError, StorageError};

/// One externally imported file: where it lives, when it arrived, and
/// which tag names to resolve onto it.
#[derive(Debug, Clone)]
pub struct ImportItem {
    /// Absolute path of the file to import.
    pub file_path: PathBuf,
    /// Import timestamp, assigned by the sender.
    pub date_added: DateTime<Utc>,
    /// Tag names to resolve and attach. May be empty.
    pub tag_names: Vec<String>,
}

/// Commands sent from the orchestrator into a window.
pub enum ToWindow {
    /// Import a file dropped on or sent to the application from outside.
    /// Imports are not idempotent: sending the same path twice creates
    /// two records.
    ImportExternalImage(ImportItem),
    /// Resolve tag names and attach them to the file at the given path.
    AddTagsToFile {
        /// Path identifying the target file.
        file_path: PathBuf,
        /// Tag names to resolve and attach.
        tag_names: Vec<String>,
    },
    /// Request the authoritative tag table. The window answers on the
    /// enclosed sender.
    GetTags {
        /// Reply channel; dropped without sending on handler failure.
        reply: oneshot::Sender<Result<Vec<TagRecord>, StorageError>>,
    },
    /// Scope a preview window to the given file ids.
    ReceivePreviewFiles {
        /// Files to show, in display order.
        file_ids: Vec<FileId>,
        /// Thumbnail cache directory the main window uses.
        thumbnail_directory: Option<PathBuf>,
    },
    /// Tell a main window that its preview window was closed.
    ClosedPreviewWindow,
}

/// Notifications sent from a window back to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToOrchestrator {
    /// The window finished initialization and is ready for commands.
    Initialized,
    /// A preview window closed itself.
    PreviewClosed,
}

/// Build a connected bridge with the given per-direction capacity.
pub fn channel(capacity: usize) -> (OrchestratorHandle, WindowEndpoint) {
    let (to_window_tx, to_window_rx) = mpsc::channel(capacity);
    let (to_orch_tx, to_orch_rx) = mpsc::channel(capacity);
    (
        OrchestratorHandle {
            to_window: to_window_tx,
            from_window: to_orch_rx,
        },
        WindowEndpoint {
            commands: to_window_rx,
            notifier: WindowNotifier { tx: to_orch_tx },
        },
    )
}

/// The orchestrator's side of the bridge.
pub struct OrchestratorHandle {
    to_window: mpsc::Sender<ToWindow>,
    from_window: mpsc::Receiver<ToOrchestrator>,
}

impl OrchestratorHandle {
    /// Whether the window side still holds its receiver.
    pub fn is_open(&self) -> bool {
        !self.to_window.is_closed()
    }

    async fn send(&self, msg: ToWindow) -> Result<(), BridgeError> {
        self.to_window.send(msg).await.map_err(|_| BridgeError::Closed)
    }

    /// Send an external import command.
    pub async fn import_external_image(&self, item: ImportItem) -> Result<(), BridgeError> {
        self.send(ToWindow::ImportExternalImage(item)).await
    }

    /// Send a tag-attachment command addressed by file path.
    pub async fn add_tags_to_file(
        &self,
        file_path: PathBuf,
        tag_names: Vec<String>,
    ) -> Result<(), BridgeError> {
        self.send(ToWindow::AddTagsToFile {
            file_path,
            tag_names,
        })
        .await
    }

    /// Request the tag table and await the window's reply.
    ///
    /// A reply sender dropped without answering (handler crashed, window
    /// shutting down) surfaces as [`BridgeError::NoReply`]; a storage
    /// failure inside the window surfaces as the underlying error.
    pub async fn get_tags(&self) -> Result<Vec<TagRecord>, BridgeError> {
        let (reply, rx) = oneshot::channel();
        self.send(ToWindow::GetTags { reply }).await?;
        let answer = rx.await.map_err(|_| BridgeError::NoReply)?;
        Ok(answer?)
    }

    /// Push a file subset into a preview window.
    pub async fn receive_preview_files(
        &self,
        file_ids: Vec<FileId>,
        thumbnail_directory: Option<PathBuf>,
    ) -> Result<(), BridgeError> {
        self.send(ToWindow::ReceivePreviewFiles {
            file_ids,
            thumbnail_directory,
        })
        .await
    }

    /// Tell a main window its preview window is gone.
    pub async fn closed_preview_window(&self) -> Result<(), BridgeError> {
        self.send(ToWindow::ClosedPreviewWindow).await
    }

    /// Await the next notification from the window. `None` once the
    /// window side is dropped.
    pub async fn next_event(&mut self) -> Option<ToOrchestrator> {
        self.from_window.recv().await
    }
}

/// The window's side of the bridge.
pub struct WindowEndpoint {
    commands: mpsc::Receiver<ToWindow>,
    notifier: WindowNotifier,
}

impl WindowEndpoint {
    /// Split into the command receiver and a cloneable notifier.
    pub fn into_parts(self) -> (mpsc::Receiver<ToWindow>, WindowNotifier) {
        (self.commands, self.notifier)
    }
}

/// Sends window-to-orchestrator notifications. Cloneable so handlers and
/// the session loop can notify independently.
#[derive(Clone)]
pub struct WindowNotifier {
    tx: mpsc::Sender<ToOrchestrator>,
}

impl WindowNotifier {
    /// Announce that initialization completed.
    pub async fn notify_initialized(&self) -> Result<(), BridgeError> {
        self.tx
            .send(ToOrchestrator::Initialized)
            .await
            .map_err(|_| BridgeError::Closed)
    }

    /// Announce that this preview window closed.
    pub async fn notify_preview_closed(&self) -> Result<(), BridgeError> {
        self.tx
            .send(ToOrchestrator::PreviewClosed)
            .await
            .map_err(|_| BridgeError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn commands_arrive_in_send_order() {
        let (orch, window) = channel(8);
        let (mut commands, _notifier) = window.into_parts();

        orch.add_tags_to_file("/img/a.png".into(), vec!["cat".into()])
            .await
            .expect("send");
        orch.closed_preview_window().await.expect("send");

        assert!(matches!(
            commands.recv().await,
            Some(ToWindow::AddTagsToFile { .. })
        ));
        assert!(matches!(
            commands.recv().await,
            Some(ToWindow::ClosedPreviewWindow)
        ));
    }

    #[tokio::test]
    async fn get_tags_round_trips_through_the_reply_channel() {
        let (orch, window) = channel(8);
        let (mut commands, _notifier) = window.into_parts();

        let responder = tokio::spawn(async move {
            match commands.recv().await {
                Some(ToWindow::GetTags { reply }) => {
                    let _ = reply.send(Ok(vec![TagRecord::new("animal")]));
                }
                _ => panic!("expected a GetTags command"),
            }
        });

        let tags = orch.get_tags().await.expect("get_tags should succeed");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "animal");
        responder.await.expect("responder task");
    }

    #[tokio::test]
    async fn dropped_reply_is_no_reply() {
        let (orch, window) = channel(8);
        let (mut commands, _notifier) = window.into_parts();

        let responder = tokio::spawn(async move {
            // Drop the reply sender without answering.
            let _ = commands.recv().await;
        });

        let err = orch.get_tags().await.expect_err("should fail");
        assert!(matches!(err, BridgeError::NoReply));
        responder.await.expect("responder task");
    }

    #[tokio::test]
    async fn storage_failure_in_reply_surfaces() {
        let (orch, window) = channel(8);
        let (mut commands, _notifier) = window.into_parts();

        let responder = tokio::spawn(async move {
            if let Some(ToWindow::GetTags { reply }) = commands.recv().await {
                let _ = reply.send(Err(StorageError::Missing {
                    kind: "tag",
                    id: "t-1".into(),
                }));
            }
        });

        let err = orch.get_tags().await.expect_err("should fail");
        assert!(matches!(err, BridgeError::Storage(_)));
        responder.await.expect("responder task");
    }

    #[tokio::test]
    async fn send_to_dropped_window_is_closed() {
        let (orch, window) = channel(8);
        drop(window);

        assert!(!orch.is_open());
        let err = orch
            .closed_preview_window()
            .await
            .expect_err("send should fail");
        assert!(matches!(err, BridgeError::Closed));
    }

    #[tokio::test]
    async fn notifications_flow_back() {
        let (mut orch, window) = channel(8);
        let (_commands, notifier) = window.into_parts();

        notifier.notify_initialized().await.expect("notify");
        notifier.notify_preview_closed().await.expect("notify");

        assert_eq!(orch.next_event().await, Some(ToOrchestrator::Initialized));
        assert_eq!(orch.next_event().await, Some(ToOrchestrator::PreviewClosed));
    }

    #[tokio::test]
    async fn next_event_is_none_after_window_drops() {
        let (mut orch, window) = channel(8);
        drop(window);
        assert_eq!(orch.next_event().await, None);
    }
}
