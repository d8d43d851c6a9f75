use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use time::OffsetDateTime;

use semnote::embedder::GeminiClientBuilder;
use semnote::embedding::Embedding;
use semnote::normalize::{self, NormalizationRequest, NormalizeConfig};
use semnote::{Database, NoteId, NoteService, SortOrder};

/// semnote - personal notes with semantic search and tag normalization
#[derive(Parser)]
#[command(name = "semnote")]
#[command(about = "A personal note store with semantic search and tag normalization")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Add a new note with optional tags
    Add(AddCommand),
    /// Search notes by semantic similarity
    Search(SearchCommand),
    /// List notes created within a recent time range
    Recent(RecentCommand),
    /// Show database statistics
    Stats,
    /// Suggest tag normalizations for clusters of similar notes
    Suggest(SuggestCommand),
    /// Apply a tag normalization to a set of notes
    Apply(ApplyCommand),
}

/// Add a new note
#[derive(Parser)]
struct AddCommand {
    /// Title of the note
    #[arg(long, value_name = "TITLE")]
    title: String,

    /// Content of the note
    #[arg(long, value_name = "CONTENT")]
    content: String,

    /// Comma-separated tags to apply to the note
    #[arg(short, long, value_name = "TAGS")]
    tags: Option<String>,
}

/// Search notes semantically similar to a query text
#[derive(Parser)]
struct SearchCommand {
    /// Text to search for similarity matches
    #[arg(long, value_name = "TEXT")]
    query: String,

    /// Optional tag to filter results
    #[arg(long, value_name = "TAG")]
    tag: Option<String>,

    /// Maximum number of results to return
    #[arg(long, default_value_t = 10)]
    limit: usize,

    /// Print full note contents instead of 500-char previews
    #[arg(long)]
    full: bool,
}

/// Unit of time for the recent-notes range
#[derive(Debug, Clone, Copy, ValueEnum)]
enum TimeUnit {
    Days,
    Weeks,
    Months,
    Years,
}

/// Sort order for listings
#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortArg {
    Newest,
    Oldest,
}

/// List recently created notes
#[derive(Parser)]
struct RecentCommand {
    /// How far back to search for notes
    #[arg(long, value_name = "N")]
    last: i64,

    /// Unit of time for the range
    #[arg(long, value_enum, default_value = "days")]
    unit: TimeUnit,

    /// Optional tag to filter results
    #[arg(long, value_name = "TAG")]
    tag: Option<String>,

    /// Maximum number of results to return
    #[arg(long, default_value_t = 50)]
    limit: usize,

    /// Sort order for results
    #[arg(long, value_enum, default_value = "newest")]
    sort: SortArg,
}

/// Suggest tag normalizations
#[derive(Parser)]
struct SuggestCommand {
    /// Similarity threshold (0.0-1.0) for considering notes as similar
    #[arg(long, default_value_t = 0.85)]
    similarity_threshold: f32,

    /// Minimum number of notes in a cluster to suggest normalization
    #[arg(long, default_value_t = 2)]
    min_cluster_size: usize,
}

/// Apply a tag normalization
#[derive(Parser)]
struct ApplyCommand {
    /// Comma-separated list of note IDs to normalize tags for
    #[arg(long, value_name = "IDS")]
    note_ids: String,

    /// The target tag to keep and ensure all notes have
    #[arg(long, value_name = "TAG")]
    keep_tag: String,

    /// Comma-separated list of tags to remove and replace with the keep-tag
    #[arg(long, value_name = "TAGS")]
    replace_tags: String,
}

fn main() {
    dotenvy::dotenv().ok();
    let _logger = flexi_logger::Logger::try_with_env_or_str("info")
        .and_then(|logger| logger.start())
        .ok();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Add(cmd) => handle_add(cmd),
        Commands::Search(cmd) => handle_search(cmd),
        Commands::Recent(cmd) => handle_recent(cmd),
        Commands::Stats => handle_stats(),
        Commands::Suggest(cmd) => handle_suggest(cmd),
        Commands::Apply(cmd) => handle_apply(cmd),
    };

    if let Err(e) = result {
        // Determine exit code based on error type
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e}");
        std::process::exit(exit_code);
    }
}

/// Determines if an error is a user error (vs internal error).
///
/// User errors include validation failures like empty content or malformed
/// id lists. Internal errors include database and network failures.
fn is_user_error(error: &anyhow::Error) -> bool {
    let error_msg = error.to_string();
    error_msg.contains("cannot be empty")
        || error_msg.contains("must be between")
        || error_msg.contains("Invalid format")
}

/// Opens the database at its default location.
fn open_database() -> Result<Database> {
    let db_path = get_database_path()?;
    ensure_database_directory(&db_path)?;
    Database::open(&db_path).context("Failed to open database")
}

/// Handles the add command by embedding the content and creating a note.
fn handle_add(cmd: &AddCommand) -> Result<()> {
    if cmd.title.trim().is_empty() {
        anyhow::bail!("Note title cannot be empty");
    }
    if cmd.content.trim().is_empty() {
        anyhow::bail!("Note content cannot be empty");
    }

    let embedder = GeminiClientBuilder::new().build()?;
    let embedding = embedder
        .embed(&cmd.content)
        .context("Failed to generate embedding")?;

    let db = open_database()?;
    execute_add(&cmd.title, &cmd.content, &embedding, cmd.tags.as_deref(), db)
}

/// Executes the add command logic with a provided database.
///
/// Separated from `handle_add` so tests can run it with in-memory databases
/// and synthetic embeddings.
fn execute_add(
    title: &str,
    content: &str,
    embedding: &Embedding,
    tags: Option<&str>,
    db: Database,
) -> Result<()> {
    let service = NoteService::new(db);

    let parsed_tags = tags.map(parse_list);
    let note = if let Some(ref tags) = parsed_tags {
        let tag_refs: Vec<&str> = tags.iter().map(String::as_str).collect();
        service.create_note(title, content, embedding, Some(&tag_refs))
    } else {
        service.create_note(title, content, embedding, None)
    }
    .context("Failed to create note")?;

    println!("Note added successfully with ID: {}", note.id);
    print_stats(&service)?;
    Ok(())
}

/// Handles the search command.
fn handle_search(cmd: &SearchCommand) -> Result<()> {
    if cmd.query.trim().is_empty() {
        anyhow::bail!("Search query cannot be empty");
    }

    let embedder = GeminiClientBuilder::new().build()?;
    let query = embedder
        .embed(&cmd.query)
        .context("Failed to generate query embedding")?;

    let db = open_database()?;
    execute_search(&query, cmd.tag.as_deref(), cmd.limit, !cmd.full, db)
}

/// Executes the search command logic with a provided database.
fn execute_search(
    query: &Embedding,
    tag: Option<&str>,
    limit: usize,
    truncate: bool,
    db: Database,
) -> Result<()> {
    let service = NoteService::new(db);
    let hits = service.search_by_similarity(query, limit, tag)?;

    println!("\n--- Search Results ({} found) ---", hits.len());
    if hits.is_empty() {
        println!("No matching notes found.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        println!(
            "\n{}. {} (Similarity: {:.1}%)",
            i + 1,
            hit.note.title,
            hit.similarity_percent()
        );
        println!("Created: {}", hit.note.created_at);
        if !hit.note.tags.is_empty() {
            println!("Tags: {}", hit.note.tags.join(", "));
        }

        println!("\nContent:");
        println!("{}", content_preview(&hit.note.content, truncate));
        println!("{}", "-".repeat(50));
    }

    Ok(())
}

/// Handles the recent command.
fn handle_recent(cmd: &RecentCommand) -> Result<()> {
    let db = open_database()?;
    let cutoff = range_start(cmd.last, cmd.unit)?;
    let order = match cmd.sort {
        SortArg::Newest => SortOrder::Descending,
        SortArg::Oldest => SortOrder::Ascending,
    };

    let service = NoteService::new(db);
    let notes = service.notes_since(cutoff, cmd.tag.as_deref(), cmd.limit, order)?;

    println!("\n--- Notes ({} found) ---", notes.len());
    for note in &notes {
        println!("\n[{}] {}", note.id, note.title);
        println!("Created: {}", note.created_at);
        if !note.tags.is_empty() {
            println!("Tags: {}", note.tags.join(", "));
        }
    }

    Ok(())
}

/// Handles the stats command.
fn handle_stats() -> Result<()> {
    let db = open_database()?;
    let service = NoteService::new(db);
    print_stats(&service)
}

/// Prints database statistics.
fn print_stats(service: &NoteService) -> Result<()> {
    let stats = service.stats()?;

    println!("\n--- Database Statistics ---");
    println!("Total notes: {}", stats.total_notes);
    println!("Notes created in the last 7 days: {}", stats.recent_notes);
    println!("Total unique tags: {}", stats.total_tags);

    if !stats.tag_usage.is_empty() {
        println!("\nTag usage:");
        for (name, count) in &stats.tag_usage {
            println!("  - {name}: {count} note(s)");
        }
    }
    println!("---------------------------");

    Ok(())
}

/// Handles the suggest command.
fn handle_suggest(cmd: &SuggestCommand) -> Result<()> {
    if !(0.0..=1.0).contains(&cmd.similarity_threshold) {
        anyhow::bail!("Similarity threshold must be between 0.0 and 1.0");
    }

    let db = open_database()?;
    let config = NormalizeConfig {
        similarity: cmd.similarity_threshold,
        min_cluster_size: cmd.min_cluster_size,
    };

    let service = NoteService::new(db);
    let suggestions = normalize::suggest_normalizations(&service, &config)?;

    if suggestions.is_empty() {
        println!("No tag normalization suggestions found.");
        return Ok(());
    }

    println!("\n--- Tag Normalization Suggestions ({}) ---\n", suggestions.len());
    for (i, suggestion) in suggestions.iter().enumerate() {
        println!("Group #{}:", i + 1);
        println!("{suggestion}");
        println!("{}", "-".repeat(50));
    }
    println!("\nReview the suggestions above and run your chosen command to apply the normalization you prefer.");

    Ok(())
}

/// Handles the apply command.
fn handle_apply(cmd: &ApplyCommand) -> Result<()> {
    let note_ids = parse_note_ids(&cmd.note_ids)?;
    if note_ids.is_empty() {
        anyhow::bail!("Invalid format: no valid note IDs provided");
    }
    let replace_tags = parse_list(&cmd.replace_tags);
    if cmd.keep_tag.trim().is_empty() {
        anyhow::bail!("Keep tag cannot be empty");
    }

    println!("\n--- Tag Normalization Details ---");
    println!(
        "Notes to update: {}",
        note_ids
            .iter()
            .map(NoteId::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("Tag to keep: '{}'", cmd.keep_tag);
    println!(
        "Tags to replace: {}",
        replace_tags
            .iter()
            .map(|t| format!("'{t}'"))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let db = open_database()?;
    let request = NormalizationRequest {
        note_ids,
        keep_tag: cmd.keep_tag.trim().to_string(),
        replace_tags,
    };
    execute_apply(&request, db)
}

/// Executes the apply command logic with a provided database.
fn execute_apply(request: &NormalizationRequest, db: Database) -> Result<()> {
    let service = NoteService::new(db);
    let report = normalize::apply_normalization(&service, request)?;

    for id in &report.missing_notes {
        println!("Warning: Note ID {id} not found. Skipping.");
    }

    println!("\n--- Tag Normalization Complete ---");
    println!("Notes updated: {}", report.notes_updated);
    println!("Tags removed: {}", report.links_removed);
    println!("Tags added: {}", report.links_added);

    Ok(())
}

/// Gets the cross-platform database path.
///
/// Returns the path as `{data_dir}/semnote/notes.db` where `data_dir` is:
/// - Linux: `~/.local/share`
/// - macOS: `~/Library/Application Support`
/// - Windows: `C:\Users\<user>\AppData\Roaming`
fn get_database_path() -> Result<PathBuf> {
    let data_dir =
        dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Failed to determine data directory"))?;

    Ok(data_dir.join("semnote").join("notes.db"))
}

/// Ensures the parent directory of the database file exists.
fn ensure_database_directory(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }
    Ok(())
}

/// Content preview: the first 500 chars when truncation is on.
fn content_preview(content: &str, truncate: bool) -> String {
    const PREVIEW_CHARS: usize = 500;
    if truncate && content.chars().count() > PREVIEW_CHARS {
        let mut preview: String = content.chars().take(PREVIEW_CHARS).collect();
        preview.push_str("...");
        preview
    } else {
        content.to_string()
    }
}

/// Parses a comma-separated list, trimming whitespace and dropping empties.
fn parse_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Parses comma-separated note IDs.
fn parse_note_ids(input: &str) -> Result<Vec<NoteId>> {
    parse_list(input)
        .iter()
        .map(|part| {
            part.parse::<i64>()
                .map(NoteId::new)
                .map_err(|_| anyhow::anyhow!("Invalid format for note ID: '{part}'"))
        })
        .collect()
}

/// Start of the recent-notes range: now minus the requested span.
///
/// Months are approximated as 30 days and years as 365 days.
fn range_start(amount: i64, unit: TimeUnit) -> Result<OffsetDateTime> {
    if amount < 0 {
        anyhow::bail!("Time range cannot be empty or negative");
    }
    let span = match unit {
        TimeUnit::Days => time::Duration::days(amount),
        TimeUnit::Weeks => time::Duration::weeks(amount),
        TimeUnit::Months => time::Duration::days(amount * 30),
        TimeUnit::Years => time::Duration::days(amount * 365),
    };
    Ok(OffsetDateTime::now_utc() - span)
}
