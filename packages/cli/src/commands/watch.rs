use super::project_root;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use trellis_workspace::{FileWatcher, LocalStorage, ProjectConfig, Workspace};

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Project directory (defaults to the current directory)
    pub root: Option<PathBuf>,

    /// Override the configured debounce window
    #[arg(long)]
    pub debounce_ms: Option<u64>,
}

pub async fn watch(args: WatchArgs, cwd: &Path) -> Result<()> {
    let root = project_root(args.root, cwd);
    let config = ProjectConfig::load(&root)?;
    let reference = config.load_reference(&root)?;
    let debounce = Duration::from_millis(args.debounce_ms.unwrap_or(config.watch_debounce_ms));

    let mut workspace = Workspace::load(Arc::new(LocalStorage::new(&root)), config, reference).await?;
    println!("👀 {} {}", "Watching".green().bold(), root.display());
    println!("   Files: {}", workspace.file_tree().len());
    if let Some(uid) = workspace.current_file() {
        println!("   Open: {}", uid);
    }

    let mut watcher = FileWatcher::new(root.clone(), debounce)?;
    while let Some(batch) = watcher.next_batch().await {
        match workspace.reload().await {
            Ok(report) => {
                println!(
                    "{} {} change(s): {} entries, {} deleted, {} moved",
                    "↻".cyan(),
                    batch.events,
                    report.files,
                    report.deleted_uids.len(),
                    report.converted_uids.len()
                );
                if let Some(uid) = report.fallback {
                    println!("   {} open file removed, switched to {}", "!".yellow(), uid);
                }
            }
            Err(err) => eprintln!("   {} reload failed: {}", "✗".red(), err),
        }
    }
    Ok(())
}
