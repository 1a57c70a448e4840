use std::env;

use geoclue_core::config::Settings;
use geoclue_embed::{list_models, GENERATE_CONTENT};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    geoclue_cli::init_tracing();
    let settings = Settings::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let method = env::args().nth(1).unwrap_or_else(|| GENERATE_CONTENT.to_string());

    println!("🔌 Querying {} for models supporting {}...", settings.service.api_base, method);
    match list_models(&settings.service, &method).await {
        Ok(names) if names.is_empty() => println!("⚠️  No models support {}", method),
        Ok(names) => { for name in &names { println!("- {}", name); } println!("\n📊 {} models", names.len()); }
        Err(e) => { eprintln!("❌ Error: {:#}", e); std::process::exit(1); }
    }
    Ok(())
}
