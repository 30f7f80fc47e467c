//! quire - read EPUB books in the terminal

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use quire::{Book, Config, Error, NavPoint, OpenOptions, Progress, RenderOptions};

#[derive(Parser)]
#[command(name = "quire")]
#[command(version, about = "Read EPUB books in the terminal", long_about = None)]
#[command(after_help = "EXAMPLES:
    quire book.epub               Print the first chapter
    quire book.epub -c 3 -w 60    Print chapter 3 at 60 columns
    quire book.epub --toc         Show the table of contents
    quire -i book.epub            Show book metadata")]
struct Cli {
    /// EPUB file to read
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Chapter to print, counting from 1
    #[arg(short, long, default_value_t = 1)]
    chapter: usize,

    /// Output width in columns (overrides the config file)
    #[arg(short, long)]
    width: Option<usize>,

    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Show book metadata instead of text
    #[arg(short, long)]
    info: bool,

    /// Show the table of contents instead of text
    #[arg(long)]
    toc: bool,

    /// Print every chapter in reading order
    #[arg(long, conflicts_with = "chapter")]
    all: bool,

    /// Never emit colour escapes
    #[arg(long)]
    plain: bool,

    /// Refuse books whose manifest names missing files
    #[arg(long)]
    strict: bool,

    /// Start at this fraction of the chapter (0.0 - 1.0)
    #[arg(long, value_name = "FRACTION")]
    position: Option<f64>,

    /// Only report errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.quiet { "error" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_structural() => {
            eprintln!("cannot open this book: {e}");
            ExitCode::FAILURE
        }
        Err(Error::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Error> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(width) = cli.width {
        config.width = width;
    }
    config.strict |= cli.strict;

    let book = Book::open_with(&cli.input, OpenOptions::default().strict(config.strict))?;

    if cli.info {
        return show_info(&cli.input, &book);
    }
    if cli.toc {
        return show_toc(&book);
    }

    let options = config.render_options();
    let color = !cli.plain && io::stdout().is_terminal();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if cli.all {
        for index in 0..book.chapter_count() {
            print_chapter(&mut out, &book, index, &options, color, None)?;
        }
        return Ok(());
    }

    let index = cli.chapter.saturating_sub(1);
    let start = cli.position.map(|fraction| Progress::new(book.book_id(), index, fraction));
    print_chapter(&mut out, &book, index, &options, color, start.as_ref())
}

fn print_chapter(
    out: &mut impl Write,
    book: &Book,
    index: usize,
    options: &RenderOptions,
    color: bool,
    start: Option<&Progress>,
) -> Result<(), Error> {
    let lines = book.render_chapter(index, options)?;
    let skip = start.map_or(0, |progress| progress.line_offset(lines.len()));

    writeln!(
        out,
        "{} \u{2022} {} OF {}",
        book.chapter_title(index),
        index + 1,
        book.chapter_count()
    )?;
    writeln!(out)?;
    for line in &lines[skip..] {
        if color {
            writeln!(out, "{}", line.to_ansi())?;
        } else {
            writeln!(out, "{}", line.text())?;
        }
    }
    writeln!(out)?;
    Ok(())
}

fn show_info(path: &std::path::Path, book: &Book) -> Result<(), Error> {
    let meta = book.metadata();
    println!("File: {}", path.display());
    println!("Title: {}", meta.title);
    for (label, value) in [
        ("Author", &meta.creator),
        ("Language", &meta.language),
        ("Publisher", &meta.publisher),
        ("Subject", &meta.subject),
        ("Rights", &meta.rights),
    ] {
        if !value.is_empty() {
            println!("{label}: {value}");
        }
    }
    if !meta.identifier.content.is_empty() {
        println!("Identifier: {}", book.book_id());
    }
    for date in &meta.dates {
        if date.event.is_empty() {
            println!("Date: {}", date.date);
        } else {
            println!("Date ({}): {}", date.event, date.date);
        }
    }
    let description = meta.description.trim();
    if !description.is_empty() {
        match description.char_indices().nth(200) {
            Some((cut, _)) => println!("Description: {}...", &description[..cut]),
            None => println!("Description: {description}"),
        }
    }
    println!("Version: {}", book.default_rendition().version);
    println!("Renditions: {}", book.packages().len());
    println!("Chapters: {}", book.chapter_count());
    println!("TOC entries: {}", book.navigation().entries().len());
    println!("Manifest items: {}", book.default_rendition().manifest.len());
    Ok(())
}

fn show_toc(book: &Book) -> Result<(), Error> {
    fn print_points(points: &[NavPoint], depth: usize) {
        for point in points {
            println!("{:indent$}{}", "", point.label, indent = depth * 2);
            print_points(&point.children, depth + 1);
        }
    }

    let entries = book.navigation().entries();
    if entries.is_empty() {
        for index in 0..book.chapter_count() {
            println!("{}", book.chapter_title(index));
        }
    } else {
        print_points(entries, 0);
    }
    Ok(())
}
