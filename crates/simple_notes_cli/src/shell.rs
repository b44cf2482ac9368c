//! Line-oriented driver for [`NotesApp`].
//!
//! Each input line is one user action; the resulting state is printed after
//! every action.

use crate::summary_line;
use log::info;
use simple_notes_core::{EditorMode, KeyValueStore, NotePayload, NotesApp};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const HELP: &str = "\
commands:
  ls                      reload and list notes
  select <id>             select a note
  new                     start creating a note
  edit                    start editing the selected note
  save <title> | <content>
                          save the editor (create or edit)
  cancel                  leave the editor
  rm                      ask to delete the selected note
  yes | no                confirm or cancel the pending delete
  theme                   toggle light/dark theme
  mode                    show the repository mode
  quit                    leave the shell";

pub async fn run<S: KeyValueStore>(app: &mut NotesApp<S>) -> Result<(), String> {
    info!("event=shell_start module=cli status=ok");
    app.start().await;
    print_state(app);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout
            .write_all(prompt(app).as_bytes())
            .await
            .map_err(|err| err.to_string())?;
        stdout.flush().await.map_err(|err| err.to_string())?;

        let Some(line) = lines.next_line().await.map_err(|err| err.to_string())? else {
            break;
        };
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));

        match command {
            "" => continue,
            "quit" | "exit" => break,
            "help" => println!("{HELP}"),
            "ls" => app.refresh(true).await,
            "select" => app.select_note(rest.trim()),
            "new" => app.begin_create(),
            "edit" => app.begin_edit(),
            "save" => app.save(parse_save_args(rest)).await,
            "cancel" => app.cancel_edit(),
            "rm" => app.request_delete(),
            "yes" if app.is_delete_dialog_open() => app.confirm_delete().await,
            "yes" => println!("nothing to confirm"),
            "no" => app.cancel_delete(),
            "theme" => app.toggle_theme(),
            "mode" => println!("{}", app.repository().get_mode().await),
            other => println!("unknown command `{other}`; type `help`"),
        }
        print_state(app);
    }
    info!("event=shell_stop module=cli status=ok");
    Ok(())
}

/// `<title> | <content>`; without a `|` the whole text is the title.
fn parse_save_args(rest: &str) -> NotePayload {
    match rest.split_once('|') {
        Some((title, content)) => NotePayload::new(title.trim(), content.trim()),
        None => NotePayload::title(rest.trim()),
    }
}

fn prompt<S: KeyValueStore>(app: &NotesApp<S>) -> String {
    let mode = match app.editor_mode() {
        EditorMode::View => "view",
        EditorMode::Edit => "edit",
        EditorMode::Create => "create",
    };
    format!(
        "[{} {} {}]> ",
        app.repository_mode(),
        app.theme().as_str(),
        mode
    )
}

fn print_state<S: KeyValueStore>(app: &NotesApp<S>) {
    for note in app.notes() {
        let marker = if app.selected_note_id() == Some(note.id.as_str()) {
            '*'
        } else {
            ' '
        };
        println!("{marker} {}", summary_line(note));
    }
    if let Some(note) = app.selected_note() {
        println!("--- {} ---\n{}", note.display_title(), note.content);
    }
    if app.is_delete_dialog_open() {
        println!("delete this note? (yes/no)");
    }
    if let Some(error) = app.error() {
        println!("error: {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::parse_save_args;

    #[test]
    fn save_args_split_on_pipe() {
        let payload = parse_save_args(" Groceries | milk, eggs ");
        assert_eq!(payload.title.as_deref(), Some("Groceries"));
        assert_eq!(payload.content.as_deref(), Some("milk, eggs"));
    }

    #[test]
    fn save_args_without_pipe_only_set_title() {
        let payload = parse_save_args("Just a title");
        assert_eq!(payload.title.as_deref(), Some("Just a title"));
        assert!(payload.content.is_none());
    }
}
