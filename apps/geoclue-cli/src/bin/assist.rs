use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use geoclue_core::config::{expand_path, Settings};
use geoclue_core::types::ImageInput;
use geoclue_corpus::{CorpusStore, QueryEngine};
use geoclue_embed::{get_clue_extractor, get_default_embedder};
use geoclue_evidence::{CategoryOutcome, EvidenceAggregator, Session, SessionReport};

fn read_image(path: &Path) -> anyhow::Result<ImageInput> {
    let bytes = std::fs::read(path).map_err(|e| anyhow::anyhow!("cannot read image {}: {}", path.display(), e))?;
    Ok(ImageInput::new(bytes, ImageInput::mime_for_path(path)))
}

fn print_report(report: &SessionReport) {
    if let Some(e) = &report.extraction_error {
        println!("⚠️  {}", e);
    }
    let hints = &report.hints;
    println!("\n🗣️  Language: {}", hints.language_guess.as_deref().unwrap_or("-"));
    println!("📝 Visible text: {}", hints.visible_text.as_deref().unwrap_or("-"));
    println!("🏙️  Cities: {}", hints.city_names.as_deref().unwrap_or("-"));

    for c in &report.categories {
        println!("\n🔎 {}: '{}'", c.category, c.description);
        match &c.outcome {
            CategoryOutcome::Matched(m) if m.is_empty() => println!("     (no match above threshold)"),
            CategoryOutcome::Matched(m) => geoclue_cli::print_matches(m),
            CategoryOutcome::Failed(e) => println!("     ⚠️  skipped: {}", e),
        }
    }

    println!("\n🏆 Final prediction");
    geoclue_cli::print_ranking(&report.ranking);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    geoclue_cli::init_tracing();
    let settings = Settings::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;

    let snapshot_path = settings.data.snapshot_file();
    let store = match CorpusStore::load(&snapshot_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!("💡 Build the corpus first: cargo run --bin geoclue-build");
            std::process::exit(1);
        }
    };
    let engine = QueryEngine::new(store, get_default_embedder(&settings)?, settings.retrieval.clone());
    let aggregator = Arc::new(EvidenceAggregator::new(Arc::new(engine)));
    let session = Session::new(get_clue_extractor(&settings)?, aggregator, settings.assistant.scored_categories.clone());
    let capture_path = expand_path(&settings.assistant.capture_path);

    println!("🧭 geoclue assistant\n===================");
    println!("Enter an image path, press Enter to scan {}, or 'q' to quit.", capture_path.display());
    let stdin = io::stdin();
    loop {
        print!("\n> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.eq_ignore_ascii_case("q") {
            break;
        }
        let path = if line.is_empty() { capture_path.clone() } else { PathBuf::from(line) };
        let image = match read_image(&path) {
            Ok(image) => image,
            Err(e) => { println!("⚠️  {}", e); continue; }
        };
        println!("📸 Analyzing {}...", path.display());
        let report = session.run(&image).await;
        print_report(&report);
    }
    Ok(())
}
