use super::project_root;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use trellis_common::{walk_file, walk_file_tree, FileNode, FileTree, FileVisitor};
use trellis_workspace::{LocalStorage, ProjectConfig, Reconciler};

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Project directory (defaults to the current directory)
    pub root: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

pub async fn scan(args: ScanArgs, cwd: &Path) -> Result<()> {
    let root = project_root(args.root, cwd);
    let config = ProjectConfig::load(&root)?;

    let reconciler =
        Reconciler::new(Arc::new(LocalStorage::new(&root))).with_ignore(config.ignore.iter().cloned());
    let result = reconciler.reconcile(&FileTree::new()).await?;

    match args.format.as_str() {
        "json" => {
            let mut nodes: Vec<&FileNode> = result.tree.nodes().collect();
            nodes.sort_by(|a, b| a.path.cmp(&b.path));
            println!("{}", serde_json::to_string_pretty(&nodes)?);
        }
        "text" => {
            println!("📁 {} {}", "Project".green().bold(), root.display());
            let mut printer = TreePrinter::default();
            walk_file_tree(&mut printer, &result.tree);
            println!();
            println!("   Files: {}", printer.files);
            println!("   Directories: {}", printer.directories);
        }
        other => {
            return Err(anyhow::anyhow!("Invalid format: {}. Use: text or json", other));
        }
    }
    Ok(())
}

#[derive(Default)]
struct TreePrinter {
    files: usize,
    directories: usize,
}

impl FileVisitor for TreePrinter {
    fn visit_file(&mut self, tree: &FileTree, node: &FileNode, depth: usize) {
        if depth > 0 {
            let indent = "  ".repeat(depth);
            if node.is_directory() {
                self.directories += 1;
                println!("{}{}/", indent, node.name.blue());
            } else {
                self.files += 1;
                println!("{}{}  {}", indent, node.name, node.uid.dimmed());
            }
        }
        walk_file(self, tree, node, depth);
    }
}
