use clap::Parser;
use seo_console::autosave::{AutoSaveState, SaveStatus};
use seo_console::client::MemoryStore;
use seo_console::preview::Previews;
use seo_console::{Backend, Console, PageSeoMetadata, Result, Slug, validate};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

mod args;
use args::{Args, Command};

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        ::log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    // Offline commands need no backend
    match &args.command {
        Command::Validate { file } => {
            print_validation(&read_page(file)?);
            return Ok(());
        }
        Command::Preview { file } => return print_previews(&read_page(file)?),
        _ => {}
    }

    let mut console = Console::new();
    if let Some(path) = &args.config {
        console = console.with_config_file(path)?;
    }
    if let Some(user) = args.user.clone() {
        console = console.with_user(user);
    }
    if let Command::Edit {
        interval: Some(secs),
        ..
    } = &args.command
    {
        console = console.with_autosave_interval(*secs);
    }
    if args.offline {
        println!("Offline mode: nothing will reach the backend.");
        console = console.with_backend(Backend::Memory(Arc::new(MemoryStore::new())));
    }
    let session = console.connect()?;

    match args.command {
        Command::Validate { .. } | Command::Preview { .. } => Ok(()),
        Command::Pages => {
            let pages = session.pages().list_pages().await?;
            for page in &pages {
                let result = validate(page);
                println!("{:<40} {:>3} {}  {}", page.slug, result.score, result.grade, page.title);
            }
            ::log::info!("Listed {} pages", pages.len());
            Ok(())
        }
        Command::Publish { file } => {
            let page = read_page(&file)?;
            let mut editor = session.open_editor(&page.slug).await?;
            editor.replace(page).await?;
            let receipt = editor.save().await?;
            match receipt.version {
                Some(version) => println!("Published {} (version {})", editor.slug(), version),
                None => println!("Published {}", editor.slug()),
            }
            Ok(())
        }
        Command::Draft { file } => {
            let page = read_page(&file)?;
            let slug = Slug::parse(&page.slug)?;
            let data = serde_json::to_value(&page)?;
            let receipt = session
                .drafts()
                .save_draft(&slug, &data, &session.config().user)
                .await?;
            println!("Draft for {} saved at {}", slug, receipt.saved_at);
            Ok(())
        }
        Command::Edit {
            file,
            slug,
            poll_ms,
            ..
        } => edit(&session, &file, slug, Duration::from_millis(poll_ms.max(50))).await,
    }
}

/// Mirror a JSON file into an editor until interrupted
async fn edit(
    session: &seo_console::Session,
    file: &Path,
    slug: Option<String>,
    poll: Duration,
) -> Result<()> {
    let mut contents = std::fs::read_to_string(file)?;
    let form: PageSeoMetadata = serde_json::from_str(&contents)?;
    let slug = slug.unwrap_or_else(|| form.slug.clone());

    let mut editor = session.open_editor(&slug).await?;
    editor.replace(form).await?;
    let _autosave = editor.start_autosave();
    let mut states = editor.subscribe();
    let mut last_status = states.borrow().status;

    println!(
        "Editing {} from {} (autosave every {}s, Ctrl+C to stop)",
        editor.slug(),
        file.display(),
        session.config().autosave.interval().as_secs()
    );
    print_validation(editor.form());

    let mut ticker = tokio::time::interval(poll);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let latest = match std::fs::read_to_string(file) {
                    Ok(latest) => latest,
                    Err(e) => {
                        ::log::warn!("Cannot read {}: {}", file.display(), e);
                        continue;
                    }
                };
                if latest == contents {
                    continue;
                }
                match serde_json::from_str::<PageSeoMetadata>(&latest) {
                    Ok(form) => {
                        contents = latest;
                        editor.replace(form).await?;
                        let result = editor.validation();
                        println!("Edit picked up: score {} ({})", result.score, result.grade);
                    }
                    Err(e) => ::log::warn!("Ignoring unparsable edit: {}", e),
                }
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                if state.status != last_status {
                    last_status = state.status;
                    print_state(&state);
                }
            }
            _ = &mut ctrl_c => {
                if editor.autosave_state().await.has_unsaved_changes {
                    println!("Saving pending changes before exit...");
                    editor.flush().await?;
                }
                break;
            }
        }
    }

    Ok(())
}

fn read_page(path: &Path) -> Result<PageSeoMetadata> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn print_validation(page: &PageSeoMetadata) {
    let result = validate(page);
    println!(
        "Score {} / grade {} ({})",
        result.score,
        result.grade,
        if result.is_valid { "valid" } else { "invalid" }
    );
    for issue in &result.errors {
        println!("  error    {}", issue.message);
    }
    for issue in &result.warnings {
        println!("  warning  {}", issue.message);
    }
    for issue in &result.successes {
        println!("  ok       {}", issue.message);
    }
}

fn print_previews(page: &PageSeoMetadata) -> Result<()> {
    let previews = Previews::render(page, None);
    println!("{}", serde_json::to_string_pretty(&previews)?);
    Ok(())
}

fn print_state(state: &AutoSaveState) {
    match state.status {
        SaveStatus::Saved => match state.last_saved {
            Some(at) => println!("Saved at {}", at.format("%H:%M:%S")),
            None => println!("Saved"),
        },
        SaveStatus::Failed => println!(
            "Save failed (attempt {}): {}",
            state.failed_attempts,
            state.error.as_deref().unwrap_or("unknown error")
        ),
        SaveStatus::GaveUp => println!(
            "Autosave gave up after {} attempts; edit the file or restart to retry",
            state.failed_attempts
        ),
        SaveStatus::Saving => println!("Saving..."),
        SaveStatus::Dirty => println!("Unsaved changes"),
        SaveStatus::Idle => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seo_console::Error;

    #[test]
    fn test_read_page_reports_missing_file() {
        let path = std::env::temp_dir().join("seo-console-missing-page.json");
        assert!(matches!(read_page(&path), Err(Error::Io(_))));
    }

    #[test]
    fn test_read_page_then_print() {
        let path = std::env::temp_dir().join(format!("seo-console-page-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"slug": "/about", "title": "About"}"#).unwrap();
        let page = read_page(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(page.title, "About");
        print_validation(&page);
        print_previews(&page).unwrap();
    }
}
