//! Workflow tests with a scripted transfer: the test decides when and how
//! each transfer settles, so edits can land while uploads are in flight.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use quillpost_engine::{
    Document, Editor, PlaceholderAction, PlaceholderPlugin,
};
use quillpost_uploads::{
    start_upload, SharedEditor, Transfer, TransferError, UploadError, UploadOutcome,
};
use tokio::sync::oneshot;

/// Single-shot transfer resolved from the test body.
struct ScriptedTransfer {
    rx: Mutex<Option<oneshot::Receiver<Result<String, TransferError>>>>,
}

impl ScriptedTransfer {
    fn new() -> (Self, oneshot::Sender<Result<String, TransferError>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                rx: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

#[async_trait]
impl Transfer for ScriptedTransfer {
    async fn upload(&self, _file: &Path) -> Result<String, TransferError> {
        let rx = self.rx.lock().unwrap().take().expect("single-shot transfer");
        rx.await.expect("transfer script dropped")
    }
}

fn shared_editor(text: &str) -> SharedEditor {
    let mut editor = Editor::new(Document::from_bytes(text.as_bytes()).unwrap());
    editor.register(PlaceholderPlugin);
    SharedEditor::new(editor)
}

fn io_failure() -> TransferError {
    TransferError::Unreadable {
        path: PathBuf::from("pic.png"),
        source: std::io::Error::new(std::io::ErrorKind::ConnectionReset, "boom"),
    }
}

/// Wait until the spawned workflow has placed its marker.
async fn wait_for_markers(editor: &SharedEditor, count: usize) {
    for _ in 0..200 {
        let placed = editor.with(|ed| {
            ed.plugin_state::<PlaceholderPlugin>()
                .map(|s| s.len())
                .unwrap_or(0)
        });
        if placed >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("placeholder never appeared");
}

#[tokio::test]
async fn success_inserts_at_remapped_position() {
    let editor = shared_editor("");
    let (transfer, script) = ScriptedTransfer::new();

    let task = {
        let editor = editor.clone();
        tokio::spawn(async move { start_upload(&editor, &transfer, Path::new("pic.png")).await })
    };
    wait_for_markers(&editor, 1).await;

    // Concurrent edit while the transfer is pending
    editor.with(|ed| {
        let mut tx = ed.transaction();
        tx.insert_text(0, "abc");
        ed.dispatch(tx).unwrap();
    });

    script.send(Ok("img://1".to_string())).unwrap();
    let outcome = task.await.unwrap().unwrap();

    match outcome {
        UploadOutcome::Inserted { pos, url } => {
            assert_eq!(pos, 3);
            assert_eq!(url, "img://1");
        }
        other => panic!("expected insertion, got {other:?}"),
    }
    editor.with(|ed| {
        assert_eq!(ed.document().text(), "abc![](img://1)");
        assert!(ed.plugin_state::<PlaceholderPlugin>().unwrap().is_empty());
    });
}

#[tokio::test]
async fn failure_removes_placeholder_and_inserts_nothing() {
    let editor = shared_editor("some text");
    editor.with(|ed| ed.set_selection(4..4).unwrap());
    let (transfer, script) = ScriptedTransfer::new();

    let task = {
        let editor = editor.clone();
        tokio::spawn(async move { start_upload(&editor, &transfer, Path::new("pic.png")).await })
    };
    wait_for_markers(&editor, 1).await;

    script.send(Err(io_failure())).unwrap();
    let outcome = task.await.unwrap().unwrap();

    assert!(matches!(outcome, UploadOutcome::TransferFailed(_)));
    editor.with(|ed| {
        assert_eq!(ed.document().text(), "some text");
        assert!(ed.plugin_state::<PlaceholderPlugin>().unwrap().is_empty());
    });
}

#[tokio::test]
async fn marker_removed_mid_flight_cancels_insertion() {
    let editor = shared_editor("hello");
    let (transfer, script) = ScriptedTransfer::new();

    let task = {
        let editor = editor.clone();
        tokio::spawn(async move { start_upload(&editor, &transfer, Path::new("pic.png")).await })
    };
    wait_for_markers(&editor, 1).await;

    // Independently remove the marker (the host's undo path) before the
    // transfer settles
    editor.with(|ed| {
        let id = ed.plugin_state::<PlaceholderPlugin>().unwrap().markers()[0].id;
        let mut tx = ed.transaction();
        tx.set_meta::<PlaceholderPlugin>(PlaceholderAction::Remove { id });
        ed.dispatch(tx).unwrap();
    });

    script.send(Ok("img://ghost".to_string())).unwrap();
    let outcome = task.await.unwrap().unwrap();

    assert!(matches!(outcome, UploadOutcome::Cancelled));
    editor.with(|ed| {
        assert_eq!(ed.document().text(), "hello");
    });
}

#[tokio::test]
async fn selection_is_deleted_before_placing_the_marker() {
    let editor = shared_editor("hello world");
    editor.with(|ed| ed.set_selection(5..11).unwrap());
    let (transfer, script) = ScriptedTransfer::new();

    let task = {
        let editor = editor.clone();
        tokio::spawn(async move { start_upload(&editor, &transfer, Path::new("pic.png")).await })
    };
    wait_for_markers(&editor, 1).await;

    editor.with(|ed| {
        assert_eq!(ed.document().text(), "hello");
        assert_eq!(
            ed.plugin_state::<PlaceholderPlugin>().unwrap().markers()[0].pos,
            5
        );
    });

    script.send(Ok("img://sel".to_string())).unwrap();
    let outcome = task.await.unwrap().unwrap();
    assert!(matches!(outcome, UploadOutcome::Inserted { pos: 5, .. }));
    editor.with(|ed| assert_eq!(ed.document().text(), "hello![](img://sel)"));
}

#[tokio::test]
async fn concurrent_uploads_resolve_independently() {
    let editor = shared_editor("ab");
    let (first_transfer, first_script) = ScriptedTransfer::new();
    let (second_transfer, second_script) = ScriptedTransfer::new();

    editor.with(|ed| ed.set_selection(1..1).unwrap());
    let first_task = {
        let editor = editor.clone();
        tokio::spawn(async move { start_upload(&editor, &first_transfer, Path::new("a.png")).await })
    };
    wait_for_markers(&editor, 1).await;

    editor.with(|ed| ed.set_selection(2..2).unwrap());
    let second_task = {
        let editor = editor.clone();
        tokio::spawn(
            async move { start_upload(&editor, &second_transfer, Path::new("b.png")).await },
        )
    };
    wait_for_markers(&editor, 2).await;

    // Resolve in reverse order
    second_script.send(Ok("img://b".to_string())).unwrap();
    let second = second_task.await.unwrap().unwrap();
    assert!(matches!(second, UploadOutcome::Inserted { pos: 2, .. }));

    first_script.send(Ok("img://a".to_string())).unwrap();
    let first = first_task.await.unwrap().unwrap();
    assert!(matches!(first, UploadOutcome::Inserted { pos: 1, .. }));

    editor.with(|ed| {
        assert_eq!(ed.document().text(), "a![](img://a)b![](img://b)");
        assert!(ed.plugin_state::<PlaceholderPlugin>().unwrap().is_empty());
    });
}

#[tokio::test]
async fn caret_inside_code_fence_rejects_the_upload() {
    let editor = shared_editor("```\ncode\n```\n");
    editor.with(|ed| ed.set_selection(6..6).unwrap());
    let (transfer, _script) = ScriptedTransfer::new();

    let err = start_upload(&editor, &transfer, Path::new("pic.png"))
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::CaretRejectsInline { pos: 6 }));
    editor.with(|ed| {
        assert_eq!(ed.document().text(), "```\ncode\n```\n");
        assert!(ed.plugin_state::<PlaceholderPlugin>().unwrap().is_empty());
    });
}
