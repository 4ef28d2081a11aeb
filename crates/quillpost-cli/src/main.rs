use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::{env, process};

use anyhow::Result;
use quillpost_config::Config;
use quillpost_engine::{Document, Editor, PlaceholderPlugin};
use quillpost_uploads::{
    spawn_uploads, DataUrlTransfer, SharedEditor, Transfer, UploadError, UploadOutcome,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

type UploadHandle = JoinHandle<Result<UploadOutcome, UploadError>>;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() > 2 {
        eprintln!("Usage: {} [document-path]", args[0]);
        process::exit(1);
    }

    let config = match Config::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };

    let document_path = args.get(1).map(PathBuf::from).or(config.document_path.clone());
    let document = match &document_path {
        Some(path) => match std::fs::read(path) {
            Ok(bytes) => {
                log::info!("loaded {} bytes from {}", bytes.len(), path.display());
                Document::from_bytes(&bytes)?
            }
            Err(e) => {
                eprintln!("Error: cannot read '{}': {e}", path.display());
                process::exit(1);
            }
        },
        None => Document::new(),
    };

    let mut editor = Editor::new(document);
    editor.register(PlaceholderPlugin);
    let editor = SharedEditor::new(editor);

    let mut transfer = DataUrlTransfer::new();
    if let Some(max) = config.max_upload_bytes {
        transfer = transfer.with_max_bytes(max);
    }
    if let Some(ms) = config.simulated_latency_ms {
        transfer = transfer.with_startup_delay(Duration::from_millis(ms));
    }
    let transfer: Arc<dyn Transfer> = Arc::new(transfer);

    println!("quillpost - type 'help' for commands");
    run_repl(&editor, transfer, &config).await
}

async fn run_repl(
    editor: &SharedEditor,
    transfer: Arc<dyn Transfer>,
    config: &Config,
) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut pending: Vec<UploadHandle> = Vec::new();

    loop {
        reap_finished(&mut pending).await;
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        let (command, rest) = match line.split_once(' ') {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "" => {}
            "help" => print_help(),
            "show" => show(editor),
            "type" => type_text(editor, rest),
            "select" => select(editor, rest),
            "delete" => delete_selection(editor),
            "attach" => attach(editor, &transfer, config, rest, &mut pending),
            "submit" => submit(editor),
            "quit" | "q" => {
                drain_all(&mut pending).await;
                break;
            }
            other => println!("unknown command '{other}' (try 'help')"),
        }
    }

    Ok(())
}

fn print_help() {
    println!("  show              print the document with pending-upload widgets");
    println!("  type <text>       insert text at the caret");
    println!("  select <from> <to>  set the selection (byte offsets)");
    println!("  delete            delete the selected range");
    println!("  attach <file>...  upload files at the caret, one workflow each");
    println!("  submit            print the document, unless uploads are pending");
    println!("  quit              wait for pending uploads and exit");
}

fn show(editor: &SharedEditor) {
    editor.with(|ed| {
        let mut text = ed.document().text();
        // Insert widgets back-to-front so earlier offsets stay valid
        for deco in PlaceholderPlugin::decorations(ed).iter().rev() {
            let id = deco.id.to_string();
            text.insert_str(deco.pos, &format!("[uploading:{}]", &id[..8]));
        }
        println!("{text}");

        let sel = ed.document().selection();
        if sel.is_empty() {
            println!("-- caret at {}", sel.start);
        } else {
            println!("-- selection {}..{}", sel.start, sel.end);
        }
    });
}

fn type_text(editor: &SharedEditor, text: &str) {
    if text.is_empty() {
        println!("type: nothing to insert");
        return;
    }
    editor.with(|ed| {
        let mut tx = ed.transaction();
        tx.delete_selection();
        let at = tx.selection_from();
        tx.insert_text(at, text);
        let caret = at + text.len();
        tx.set_selection_after(caret..caret);
        if let Err(e) = ed.dispatch(tx) {
            println!("type: {e}");
        }
    });
}

fn select(editor: &SharedEditor, rest: &str) {
    let offsets: Vec<_> = rest.split_whitespace().collect();
    let parsed = match offsets.as_slice() {
        [from, to] => from.parse::<usize>().ok().zip(to.parse::<usize>().ok()),
        _ => None,
    };
    let Some((from, to)) = parsed else {
        println!("select: expected two byte offsets");
        return;
    };
    editor.with(|ed| {
        if let Err(e) = ed.set_selection(from..to) {
            println!("select: {e}");
        }
    });
}

fn delete_selection(editor: &SharedEditor) {
    editor.with(|ed| {
        let mut tx = ed.transaction();
        tx.delete_selection();
        if let Err(e) = ed.dispatch(tx) {
            println!("delete: {e}");
        }
    });
}

/// The file-input change handler: only fires a workflow when files were
/// actually chosen and the caret accepts inline content.
fn attach(
    editor: &SharedEditor,
    transfer: &Arc<dyn Transfer>,
    config: &Config,
    rest: &str,
    pending: &mut Vec<UploadHandle>,
) {
    let files: Vec<PathBuf> = rest
        .split_whitespace()
        .map(|f| {
            let path = PathBuf::from(f);
            match (&config.assets_dir, path.is_relative()) {
                (Some(dir), true) => dir.join(path),
                _ => path,
            }
        })
        .collect();

    if files.is_empty() {
        println!("attach: no file chosen");
        return;
    }
    let caret_ok = editor.with(|ed| {
        let caret = ed.document().selection().start;
        ed.document().accepts_inline_at(caret)
    });
    if !caret_ok {
        println!("attach: caret does not accept inline content here");
        return;
    }

    let count = files.len();
    pending.extend(spawn_uploads(editor, Arc::clone(transfer), files));
    println!("attach: started {count} upload(s)");
}

fn submit(editor: &SharedEditor) {
    editor.with(|ed| {
        let unresolved = ed
            .plugin_state::<PlaceholderPlugin>()
            .map(|s| s.len())
            .unwrap_or(0);
        if unresolved > 0 {
            println!("submit: {unresolved} upload(s) still pending, try again when resolved");
            return;
        }
        let text = ed.document().text();
        println!("--- submitted {} bytes ---", text.len());
        println!("{text}");
    });
}

async fn reap_finished(pending: &mut Vec<UploadHandle>) {
    let mut i = 0;
    while i < pending.len() {
        if pending[i].is_finished() {
            let handle = pending.remove(i);
            report(handle.await);
        } else {
            i += 1;
        }
    }
}

async fn drain_all(pending: &mut Vec<UploadHandle>) {
    if pending.is_empty() {
        return;
    }
    println!("waiting for {} upload(s)...", pending.len());
    for handle in pending.drain(..) {
        report(handle.await);
    }
}

fn report(joined: Result<Result<UploadOutcome, UploadError>, tokio::task::JoinError>) {
    match joined {
        Ok(Ok(UploadOutcome::Inserted { pos, .. })) => {
            println!("upload finished: image inserted at {pos}");
        }
        Ok(Ok(UploadOutcome::Cancelled)) => {
            println!("upload finished: placeholder was gone, nothing inserted");
        }
        Ok(Ok(UploadOutcome::TransferFailed(err))) => {
            println!("upload failed: {err}");
        }
        Ok(Err(err)) => println!("upload rejected: {err}"),
        Err(err) => println!("upload task panicked: {err}"),
    }
}
