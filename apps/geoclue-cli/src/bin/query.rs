use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use geoclue_core::config::Settings;
use geoclue_corpus::{CorpusStore, QueryEngine};
use geoclue_embed::get_default_embedder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    geoclue_cli::init_tracing();
    let settings = Settings::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <category> <description> [--snapshot PATH]", args[0]);
        eprintln!("Example: {} pole_type 'wooden pole with a ladder' --snapshot vector_db.json", args[0]);
        std::process::exit(1);
    }
    let category = &args[1];
    let description = &args[2];
    let mut snapshot_path = settings.data.snapshot_file();
    let mut i = 3; while i < args.len() { match args[i].as_str() {
        "--snapshot" => { if i + 1 < args.len() { snapshot_path = PathBuf::from(&args[i + 1]); i += 1; } else { eprintln!("Error: --snapshot requires a path"); std::process::exit(1); } }
        other => { eprintln!("Unknown argument: {}", other); std::process::exit(1); } } i += 1; }

    println!("🔍 geoclue-query\n===============");
    println!("Category: {}", category); println!("Description: {}", description); println!("Snapshot: {}", snapshot_path.display());
    let store = Arc::new(CorpusStore::load(&snapshot_path)?);
    println!("📚 {} documents across {} categories", store.len(), store.categories().len());
    let engine = QueryEngine::new(store, get_default_embedder(&settings)?, settings.retrieval.clone());

    let matches = engine.score(category, description).await?;
    println!("\n🔍 Found {} matches above {:.2}", matches.len(), settings.retrieval.acceptance_threshold);
    geoclue_cli::print_matches(&matches);
    Ok(())
}
