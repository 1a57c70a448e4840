use tracing_subscriber::EnvFilter;

use geoclue_core::types::{Match, RegionScore};

/// Logs go to stderr so they never interleave with the report on stdout.
/// `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

pub fn print_matches(matches: &[Match]) {
    for m in matches {
        println!("     -> {} ({:.2}) '{}'", m.region, m.score, m.text);
    }
}

pub fn print_ranking(ranking: &[RegionScore]) {
    if ranking.is_empty() {
        println!("   (No strong database matches. Rely on Language/Text above.)");
        return;
    }
    for (i, r) in ranking.iter().enumerate() {
        println!("   {}. {:<20} score={:.2}", i + 1, r.region, r.score);
    }
}
