use anyhow::bail;
use cdship_core::ShipConfig;
use cdship_pack::ArchiveSummary;

use crate::console::ConsoleNotifier;

pub fn run(config: &ShipConfig, skip_prepare: bool, format: &str) -> anyhow::Result<()> {
    let json = match format {
        "text" => false,
        "json" => true,
        other => bail!("unknown output format '{other}' (expected text or json)"),
    };

    let notifier = if json {
        ConsoleNotifier::quiet()
    } else {
        ConsoleNotifier::new()
    };
    let summary = cdship_rollout::pack_revision(config, skip_prepare, &notifier)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &ArchiveSummary) {
    println!();
    println!("✓ Archive ready ({})", human_size(summary.size_bytes));
    println!("  Output: {}", summary.path.display());
    println!("  Files:  {}", summary.entries.len());
    if !summary.skipped.is_empty() {
        println!("  Skipped: {}", summary.skipped.len());
    }
    println!("  SHA256: {}", summary.sha256);
}

fn human_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1_048_576.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_are_scaled() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2048), "2.0 KB");
        assert_eq!(human_size(3 * 1_048_576 + 524_288), "3.5 MB");
    }

    #[test]
    fn unknown_format_is_rejected() {
        let config = ShipConfig::default();
        let err = run(&config, true, "yaml").unwrap_err();
        assert!(err.to_string().contains("yaml"));
    }

    #[test]
    fn json_pack_of_a_prepared_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("dist")).unwrap();
        std::fs::write(dir.path().join("dist/index.html"), "<h1>hi</h1>").unwrap();

        let mut config = ShipConfig::default();
        config.project.root = dir.path().to_path_buf();
        run(&config, true, "json").unwrap();
        assert!(dir.path().join("dist/app.zip").is_file());
    }
}
