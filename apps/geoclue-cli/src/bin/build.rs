use std::env;
use std::path::PathBuf;

use geoclue_core::config::Settings;
use geoclue_core::taxonomy::Taxonomy;
use geoclue_core::traits::Embedder;
use geoclue_corpus::CorpusBuilder;
use geoclue_embed::get_default_embedder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    geoclue_cli::init_tracing();
    let settings = Settings::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let args: Vec<String> = env::args().skip(1).collect();
    let mut taxonomy_path = None; let mut snapshot_path = None; let mut quiet = false;
    let mut i = 0; while i < args.len() { match args[i].as_str() {
        "--quiet" | "-q" => quiet = true,
        "--out" | "-o" => { if i + 1 < args.len() { snapshot_path = Some(PathBuf::from(&args[i + 1])); i += 1; } else { eprintln!("Error: --out requires a path"); std::process::exit(1); } }
        _ if !args[i].starts_with('-') => taxonomy_path = Some(PathBuf::from(&args[i])),
        other => { eprintln!("Unknown flag: {}", other); std::process::exit(1); } } i += 1; }
    let taxonomy_path = taxonomy_path.unwrap_or_else(|| settings.data.taxonomy_file());
    let snapshot_path = snapshot_path.unwrap_or_else(|| settings.data.snapshot_file());

    println!("🗺️  geoclue corpus builder\n========================");
    println!("Taxonomy: {}", taxonomy_path.display()); println!("Snapshot: {}", snapshot_path.display());
    let taxonomy = Taxonomy::load(&taxonomy_path)?;
    let embedder = get_default_embedder(&settings)?;
    println!("Embedder: {} (batch size {})", embedder.embedder_id(), settings.retrieval.batch_size);

    let builder = CorpusBuilder::new(embedder, settings.retrieval.clone()).with_progress(!quiet);
    let report = builder.build_snapshot(&taxonomy, &snapshot_path).await?;

    println!("\n✅ Corpus built: {} of {} clues embedded", report.embedded, report.clues);
    if report.skipped_empty > 0 { println!("⚠️  Skipped {} blank clue texts", report.skipped_empty); }
    for f in &report.failed_batches {
        println!("⚠️  Batch {} ({} clues) dropped{}: {}", f.batch_index, f.documents, if f.transient { " after transient error" } else { "" }, f.reason);
    }
    println!("\n💡 To try a lookup, use: cargo run --bin geoclue-query <category> '<description>'");
    Ok(())
}
