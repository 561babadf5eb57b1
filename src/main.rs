mod batch;
mod calendar;
mod classify;
mod config;
mod date;
mod error;
mod fetch;
mod headlines;
mod merge;
mod name;
mod presence;
mod report;
mod roles;
mod scanner;
mod store;
mod verify;

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use batch::{EventFormat, PeopleFormat};
use calendar::Archive;
use classify::Classifier;
use config::ArchiveConfig;
use date::{DateParser, PrecisionHint};
use merge::{Authority, BatchSource, Lookup, PeopleStore};
use report::{MergeOutcome, MergeReport};

#[derive(Parser)]
#[command(
    name = "bmc_archive",
    about = "Black Mountain College archive pipeline: dates, people, events, headlines"
)]
struct Cli {
    /// TOML file overriding the built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve date expressions to bucket keys
    ParseDate {
        /// Expressions, e.g. "October 16, 1933", "fall 1945", "1943-44"
        #[arg(required = true)]
        expr: Vec<String>,
        /// Declared precision of the source
        #[arg(long, value_enum)]
        precision: Option<PrecisionHint>,
        /// Treat the input as running text and list every date in it
        #[arg(long)]
        scan: bool,
    },
    /// Normalize names and compare them, or look them up in the people index
    MatchNames {
        #[arg(required = true)]
        names: Vec<String>,
        /// Resolve each name against the people index instead
        #[arg(long)]
        lookup: bool,
        /// People index (defaults to the configured store)
        #[arg(long)]
        store: Option<PathBuf>,
    },
    /// Merge a person batch file (or a directory of them) into the people index
    MergePeople {
        /// Batch file or directory of *.json batches
        input: PathBuf,
        #[arg(long)]
        store: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "generic")]
        format: PeopleFormat,
        /// Trust level of the batch source
        #[arg(long, value_enum, default_value = "scraped")]
        authority: Authority,
        /// Source label recorded with conflicts (defaults to the file name)
        #[arg(long)]
        label: Option<String>,
    },
    /// Merge an event batch file (or a directory of them) into the archive calendar
    MergeEvents {
        input: PathBuf,
        #[arg(long)]
        archive: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "generic")]
        format: EventFormat,
        /// Calendar group for events that do not name one
        #[arg(long, default_value = batch::DEFAULT_GROUP)]
        group: String,
        /// People index used to canonicalize the names on each event
        #[arg(long)]
        people: Option<PathBuf>,
    },
    /// File headlines under culture / national / international
    Classify {
        /// Headline file as written by fetch-headlines
        #[arg(required_unless_present = "text")]
        input: Option<PathBuf>,
        /// Classify one line of text instead
        #[arg(long, conflicts_with = "input")]
        text: Option<String>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Download front-page headlines for the college years
    FetchHeadlines {
        api_key: String,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Also write the per-category files
        #[arg(long)]
        categorize: bool,
    },
    /// Qualify the roles of summer-session faculty and students
    SummerRoles {
        #[arg(long)]
        store: Option<PathBuf>,
        /// Report without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// List who was at the college in a month and the courses of that term
    Present {
        year: i32,
        /// 1-12; picks the term (September on is fall, June on summer)
        #[arg(value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
        #[arg(long)]
        store: Option<PathBuf>,
        /// Print JSON instead of the text listing
        #[arg(long)]
        json: bool,
    },
    /// Report course instructors missing from that year's faculty
    VerifyCourses {
        #[arg(long)]
        courses: Option<PathBuf>,
        #[arg(long)]
        store: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ArchiveConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Command::ParseDate {
            expr,
            precision,
            scan,
        } => run_parse_date(&config, &expr, precision, scan),
        Command::MatchNames {
            names,
            lookup,
            store,
        } => {
            let store = store.unwrap_or_else(|| config.stores.people.clone());
            run_match_names(&names, lookup.then_some(store.as_path()))
        }
        Command::MergePeople {
            input,
            store,
            format,
            authority,
            label,
        } => {
            let store = store.unwrap_or_else(|| config.stores.people.clone());
            run_merge_people(&input, &store, format, authority, label.as_deref())
        }
        Command::MergeEvents {
            input,
            archive,
            format,
            group,
            people,
        } => {
            let archive = archive.unwrap_or_else(|| config.stores.archive.clone());
            run_merge_events(&config, &input, &archive, format, &group, people.as_deref())
        }
        Command::Classify {
            input,
            text,
            output_dir,
        } => run_classify(&config, input.as_deref(), text.as_deref(), output_dir),
        Command::FetchHeadlines {
            api_key,
            output_dir,
            categorize,
        } => run_fetch_headlines(&config, &api_key, output_dir, categorize),
        Command::SummerRoles { store, dry_run } => {
            let store = store.unwrap_or_else(|| config.stores.people.clone());
            run_summer_roles(&config, &store, dry_run)
        }
        Command::Present {
            year,
            month,
            store,
            json,
        } => {
            let store = store.unwrap_or_else(|| config.stores.people.clone());
            run_present(&store, year, month, json)
        }
        Command::VerifyCourses { courses, store } => {
            let courses = courses.unwrap_or_else(|| config.stores.courses.clone());
            let store = store.unwrap_or_else(|| config.stores.people.clone());
            run_verify_courses(&courses, &store)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  DATES AND NAMES
// ═══════════════════════════════════════════════════════════════════════

fn run_parse_date(
    config: &ArchiveConfig,
    exprs: &[String],
    hint: Option<PrecisionHint>,
    scan: bool,
) -> anyhow::Result<()> {
    let parser = DateParser::new(config.dates.clone());
    let describe = |d: &date::BucketDate| {
        let exact = if d.exact { ", exact" } else { "" };
        format!("{} ({}{exact})", d.bucket_key(), d.precision.as_str())
    };

    if scan {
        let text = exprs.join(" ");
        let found = parser.scan(&text);
        if found.is_empty() {
            println!("no dates found");
        }
        for d in &found {
            println!("{:>24} → {}", &text[d.span.clone()], describe(d));
        }
        return Ok(());
    }

    for expr in exprs {
        match parser.parse(expr, hint).parsed() {
            Some(d) => println!("{expr:>24} → {}", describe(&d)),
            None => println!("{expr:>24} → skipped (no recognizable date)"),
        }
    }
    Ok(())
}

fn run_match_names(names: &[String], lookup_in: Option<&Path>) -> anyhow::Result<()> {
    if let Some(path) = lookup_in {
        let people = PeopleStore::new(store::load_object(path)?);
        info!(path = %path.display(), records = people.len(), "people index loaded");
        for n in names {
            let found = match people.lookup(n) {
                Lookup::Exact(key) => format!("{key} (exact)"),
                Lookup::Relaxed(key) => format!("{key} (relaxed)"),
                Lookup::Ambiguous(keys) => format!("ambiguous: {}", keys.join(" | ")),
                Lookup::Missing => "not in index".to_string(),
            };
            println!("{n} → {found}");
        }
        return Ok(());
    }

    for n in names {
        println!("{n:>30} → {}", name::normalize(n));
    }
    for (i, a) in names.iter().enumerate() {
        for b in &names[i + 1..] {
            let verdict = if name::names_match(a, b) { "match" } else { "no match" };
            println!("{a} / {b}: {verdict}");
        }
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
//  MERGES
// ═══════════════════════════════════════════════════════════════════════

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn run_merge_people(
    input: &Path,
    store_path: &Path,
    format: PeopleFormat,
    authority: Authority,
    label: Option<&str>,
) -> anyhow::Result<()> {
    let files = scanner::discover_batches(input)?;
    let mut people = PeopleStore::new(store::load_object(store_path)?);
    let before = people.len();
    let mut report = MergeReport::default();

    for file in &files {
        let source = BatchSource::new(label.map_or_else(|| file_label(file), str::to_string), authority);
        let items = batch::read_people(file, format)
            .with_context(|| format!("reading person batch {}", file.display()))?;
        info!(file = %file.display(), records = items.len(), authority = authority.as_str(), "merging people");
        for item in items {
            match item {
                Ok(person) => {
                    people.merge_person(&person, &source, &mut report);
                }
                Err(reason) => report.record(MergeOutcome::Skipped(reason)),
            }
        }
    }

    if report.stats.changed() {
        store::save_json(store_path, people.records())
            .with_context(|| format!("saving {}", store_path.display()))?;
    } else {
        info!("no changes, store left untouched");
    }
    report.write_conflicts(store_path)?;
    report.print_summary("people");
    println!("index: {before} → {} records", people.len());
    Ok(())
}

fn run_merge_events(
    config: &ArchiveConfig,
    input: &Path,
    archive_path: &Path,
    format: EventFormat,
    group: &str,
    people_path: Option<&Path>,
) -> anyhow::Result<()> {
    let files = scanner::discover_batches(input)?;
    let parser = DateParser::new(config.dates.clone());
    let people = people_path
        .map(|p| store::load_object(p).map(PeopleStore::new))
        .transpose()?;
    let mut archive = Archive::new(store::load_object(archive_path)?);
    let before = archive.event_count();
    let mut report = MergeReport::default();

    for file in &files {
        let items = batch::read_events(file, format, &parser, group, people.as_ref())
            .with_context(|| format!("reading event batch {}", file.display()))?;
        info!(file = %file.display(), events = items.len(), "merging events");
        for item in items {
            match item {
                Ok(ev) => {
                    archive.merge_event(&ev.date, &ev.group, ev.fields, &mut report)?;
                }
                Err(reason) => report.record(MergeOutcome::Skipped(reason)),
            }
        }
    }

    if report.stats.changed() {
        let citation = match format.citation() {
            Some(c) => c.to_string(),
            None => files.iter().map(|f| file_label(f)).collect::<Vec<_>>().join(", "),
        };
        archive.stamp_integration(format.integration_key(), &citation, &report.stats);
        store::save_json(archive_path, archive.document())
            .with_context(|| format!("saving {}", archive_path.display()))?;
    } else {
        info!("no changes, archive left untouched");
    }
    report.print_summary("events");
    println!("calendar: {before} → {} events", archive.event_count());
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
//  HEADLINES
// ═══════════════════════════════════════════════════════════════════════

fn run_classify(
    config: &ArchiveConfig,
    input: Option<&Path>,
    text: Option<&str>,
    output_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let classifier = Classifier::new(&config.classifier)?;

    if let Some(text) = text {
        let verdict = classifier.classify(text, &[]);
        println!("{}", verdict.category().unwrap_or("unclassified"));
        for (name, score) in classifier.scores(text, &[]) {
            println!("  {name}: {score}");
        }
        return Ok(());
    }

    let Some(input) = input else {
        bail!("give a headline file or --text");
    };
    let mut headline_config = config.headlines.clone();
    if let Some(dir) = output_dir {
        headline_config.output_dir = dir;
    }
    let headlines = headlines::read_headlines(input)
        .with_context(|| format!("reading headlines from {}", input.display()))?;
    info!(count = headlines.len(), "classifying headlines");
    let set = headlines::categorize(&headlines, &classifier);
    for path in set.write(&headline_config)? {
        info!(path = %path.display(), "written");
    }
    set.print_summary();
    Ok(())
}

fn run_fetch_headlines(
    config: &ArchiveConfig,
    api_key: &str,
    output_dir: Option<PathBuf>,
    categorize: bool,
) -> anyhow::Result<()> {
    let mut headline_config = config.headlines.clone();
    if let Some(dir) = output_dir {
        headline_config.output_dir = dir;
    }
    let classifier = if categorize {
        Some(Classifier::new(&config.classifier)?)
    } else {
        None
    };

    let fetcher = fetch::HttpFetcher::new(&config.fetch)?;
    let all = headlines::fetch_headlines(&fetcher, &headline_config, &config.fetch, api_key)
        .context("fetching archive months")?;
    let path = headline_config.headlines_path();
    store::save_json(&path, &all)?;
    println!("{} headlines saved to {}", all.len(), path.display());
    for h in all.iter().take(5) {
        let short: String = h.headline.chars().take(60).collect();
        println!("  {}: {short}...", h.date);
    }

    if let Some(classifier) = classifier {
        let set = headlines::categorize(&all, &classifier);
        set.write(&headline_config)?;
        set.print_summary();
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
//  INDEX MAINTENANCE
// ═══════════════════════════════════════════════════════════════════════

fn run_summer_roles(config: &ArchiveConfig, store_path: &Path, dry_run: bool) -> anyhow::Result<()> {
    let qualifier = roles::SummerQualifier::new(&config.summer)?;
    let mut people = PeopleStore::new(store::load_object(store_path)?);
    let changes = qualifier.qualify_all(&mut people);
    roles::print_by_year(&changes);

    if changes.is_empty() || dry_run {
        return Ok(());
    }
    store::save_json(store_path, people.records())
        .with_context(|| format!("saving {}", store_path.display()))?;
    println!("\nSaved to {}", store_path.display());
    Ok(())
}

fn run_present(store_path: &Path, year: i32, month: u32, json: bool) -> anyhow::Result<()> {
    let people = PeopleStore::new(store::load_object(store_path)?);
    let presence = presence::present_at(&people, year, month);
    let courses = presence::courses_for_semester(&people, year, presence.semester);
    if json {
        let out = serde_json::json!({"presence": presence, "courses": courses});
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        presence::print_presence(&presence, &courses);
    }
    Ok(())
}

fn run_verify_courses(courses_path: &Path, store_path: &Path) -> anyhow::Result<()> {
    let catalog: verify::CourseCatalog = store::read_json(courses_path)
        .with_context(|| format!("reading course catalog {}", courses_path.display()))?;
    let people = PeopleStore::new(store::load_object(store_path)?);
    let issues = verify::verify_courses(&catalog, &people, verify::COLLEGE_YEARS);
    verify::print_report(&issues);
    Ok(())
}
