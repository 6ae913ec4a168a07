//! Startup banner and run summary display.

use crate::consts::{AUTHOR, REPO};
use crate::runner::{ChannelResult, ExecutionMode, RunReport};

/// Run configuration for display in the startup banner.
pub struct BannerInfo<'a> {
    pub source: &'a str,
    pub channels: usize,
    pub mode: ExecutionMode,
    pub dry_run: bool,
}

/// Print the startup banner with run info.
pub fn print_banner(info: &BannerInfo) {
    let mode = match info.mode {
        ExecutionMode::Sequential => "sequential",
        ExecutionMode::Parallel => "parallel",
    };
    println!(
        r#"
   ╔═══════════════════════════════════════╗
   ║           F A R E C A S T             ║
   ║    cheap flights, told as stories     ║
   ╚═══════════════════════════════════════╝

   version   {}
   by        {}
   repo      {}
   config    {}
   channels  {}
   mode      {}{}
"#,
        env!("CARGO_PKG_VERSION"),
        AUTHOR,
        REPO,
        info.source,
        info.channels,
        mode,
        if info.dry_run { " (dry run)" } else { "" },
    );
}

fn summary_line(result: &ChannelResult) -> String {
    let status = if result.success { "ok    " } else { "FAILED" };
    format!(
        "  {} {:<24} {:>2} post(s) {:>7.1}s",
        status,
        result.channel_id,
        result.posts_sent,
        result.elapsed.as_secs_f64(),
    )
}

/// Print the run summary on stdout and failure details on stderr.
pub fn print_summary(report: &RunReport) {
    println!("\nSUMMARY");
    for result in &report.results {
        println!("{}", summary_line(result));
    }
    println!(
        "  {} succeeded, {} failed in {:.1}s",
        report.success_count(),
        report.failure_count(),
        report.elapsed.as_secs_f64(),
    );

    for result in report.results.iter().filter(|r| !r.success) {
        eprintln!(
            "{}: {}",
            result.channel_id,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
}
