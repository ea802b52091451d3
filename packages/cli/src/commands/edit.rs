use super::project_root;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};
use trellis_common::{walk_node, walk_tree, Node, NodeKind, NodeTree, RunningActions, Visitor};
use trellis_editor::{ActionEngine, ActionOutcome, Document, EditSession, NodeAction};
use trellis_parser::MarkupParser;
use trellis_workspace::ProjectConfig;

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Markup file to edit
    pub file: PathBuf,

    /// Action as JSON, e.g. '{"type":"add","nodeType":"p"}'. Repeat to run
    /// several in order; omit to print the node tree with its uids.
    #[arg(short, long)]
    pub action: Vec<String>,

    /// Node to focus before the first action
    #[arg(long)]
    pub focus: Option<String>,

    /// Nodes to select before the first action
    #[arg(short, long)]
    pub select: Vec<String>,

    /// Print the edited text instead of saving
    #[arg(long)]
    pub dry_run: bool,

    /// Project directory holding trellis.config.json
    #[arg(long)]
    pub root: Option<PathBuf>,
}

pub fn edit(args: EditArgs, cwd: &Path) -> Result<()> {
    let root = project_root(args.root, cwd);
    let config = ProjectConfig::load(&root)?;
    let reference = config.load_reference(&root)?;

    let path = if args.file.is_absolute() {
        args.file.clone()
    } else {
        cwd.join(&args.file)
    };
    let document_id = args.file.display().to_string();
    let parser = MarkupParser::with_reference(&document_id, &reference);
    let mut engine = ActionEngine::new(reference);
    if let Some(container) = &config.group_container {
        engine = engine.with_group_container(container.clone());
    }

    let doc = Document::load(path)?;
    let mut session = EditSession::new(doc, Box::new(parser), engine, RunningActions::new())?;

    if args.action.is_empty() {
        let mut printer = NodePrinter;
        walk_tree(&mut printer, session.tree());
        return Ok(());
    }

    if let Some(uid) = &args.focus {
        if !session.focus(uid) {
            return Err(anyhow::anyhow!("Unknown node: {}", uid));
        }
    }
    if !args.select.is_empty() {
        session.select(&args.select);
    }

    for raw in &args.action {
        let action: NodeAction =
            serde_json::from_str(raw).map_err(|e| anyhow::anyhow!("Invalid action {}: {}", raw, e))?;
        match session.run(&action)? {
            ActionOutcome::Applied { version, revealed } => {
                println!(
                    "{} {} applied (version {}) {}",
                    "✓".green(),
                    action.name().bold(),
                    version,
                    revealed.join(", ").dimmed()
                );
            }
            ActionOutcome::Captured { uids } => {
                println!("{} {} captured {} node(s)", "✓".green(), action.name().bold(), uids.len());
            }
            ActionOutcome::Noop { reason } => {
                println!("{} {} skipped: {}", "•".yellow(), action.name().bold(), reason);
            }
        }
    }

    if args.dry_run {
        print!("{}", session.text());
    } else if session.buffer().is_dirty() {
        session.buffer_mut().save()?;
        println!("💾 {} {}", "Saved".green().bold(), args.file.display());
    }
    Ok(())
}

struct NodePrinter;

impl Visitor for NodePrinter {
    fn visit_node(&mut self, tree: &NodeTree, node: &Node, depth: usize) {
        if !node.is_entity {
            return;
        }
        let indent = "  ".repeat(depth);
        let label = match node.kind {
            NodeKind::Root => node.name.clone(),
            NodeKind::Element => format!("<{}>", node.name),
            NodeKind::Text | NodeKind::Comment => node.name.clone(),
        };
        let span = node
            .source_range
            .map(|r| format!("[{}, {})", r.start_offset, r.end_offset))
            .unwrap_or_default();
        println!("{}{} {} {}", indent, label.cyan(), node.uid, span.dimmed());
        walk_node(self, tree, node, depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(file: &Path, actions: &[&str]) -> EditArgs {
        EditArgs {
            file: file.to_path_buf(),
            action: actions.iter().map(|a| a.to_string()).collect(),
            focus: None,
            select: vec![],
            dry_run: false,
            root: None,
        }
    }

    #[test]
    fn test_edit_adds_to_root_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("index.html");
        std::fs::write(&file, "<p>a</p>").unwrap();

        edit(args(&file, &[r#"{"type":"add","nodeType":"hr"}"#]), dir.path()).unwrap();
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "<hr><p>a</p>");
    }

    #[test]
    fn test_edit_rejects_malformed_action() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("index.html");
        std::fs::write(&file, "<p>a</p>").unwrap();

        assert!(edit(args(&file, &["{\"type\":\"explode\"}"]), dir.path()).is_err());
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "<p>a</p>");
    }

    #[test]
    fn test_dry_run_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("index.html");
        std::fs::write(&file, "<p>a</p>").unwrap();

        let mut dry = args(&file, &[r#"{"type":"add","nodeType":"hr"}"#]);
        dry.dry_run = true;
        edit(dry, dir.path()).unwrap();
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "<p>a</p>");
    }
}
