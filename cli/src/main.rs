mod test_runner;

use std::path::Path;
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::EnvFilter;

use recordmap::RecordMap;
use renderer::{BlockRenderOptions, BuildMode, RenderOptions, RenderTree};

const SUBCOMMANDS: &[&str] = &["render", "test", "help"];

#[derive(Parser)]
#[command(name = "recordmap", version, about = "Render Notion record maps to HTML")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a record map JSON file
    Render(RenderArgs),

    /// Run .test.toml render fixtures
    Test(TestArgs),
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Record map JSON file
    file: String,

    /// Root block: id, dashed uuid or page URL. Defaults to the first block.
    #[arg(short, long)]
    root: Option<String>,

    /// TOML file with render options; flags override it
    #[arg(short, long)]
    config: Option<String>,

    #[arg(long)]
    full_page: bool,

    #[arg(long)]
    dark_mode: bool,

    /// Suppress render warnings
    #[arg(long)]
    production: bool,

    /// Leave out per-block id classes
    #[arg(long)]
    hide_block_id: bool,

    /// Enable image zoom for this viewport width
    #[arg(long)]
    viewport_width: Option<u32>,

    /// Print the walked block tree instead of HTML
    #[arg(long)]
    tree: bool,

    /// List all blocks in the record map
    #[arg(long)]
    list_blocks: bool,

    /// Load only, don't render (exit 0 if valid)
    #[arg(long)]
    check: bool,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.toml file or directory containing them
    path: String,

    /// Run only fixtures in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    init_logging();

    // `recordmap file.json` works like `recordmap render file.json`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(pos) = args
        .iter()
        .skip(1)
        .position(|a| !a.starts_with('-'))
        .map(|i| i + 1)
    {
        if !SUBCOMMANDS.contains(&args[pos].as_str()) {
            args.insert(pos, "render".to_string());
        }
    }

    let cli = Cli::parse_from(&args);

    match cli.command {
        Command::Render(render_args) => do_render(render_args, cli.no_color),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

/// Render warnings reach stderr through `tracing`; `RECORDMAP_LOG` tunes it.
fn init_logging() {
    let filter =
        EnvFilter::try_from_env("RECORDMAP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn do_render(args: RenderArgs, no_color: bool) {
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let source = match std::fs::read_to_string(&args.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", args.file, e);
            process::exit(1);
        }
    };

    let mut files = SimpleFiles::new();
    let file_id = files.add(args.file.clone(), source.clone());

    let parser = recordmap::parser::Parser::new(source, file_id);
    let record_map = match parser.parse() {
        Ok(m) => m,
        Err(errors) => {
            let writer = StandardStream::stderr(color_choice);
            let config = term::Config::default();
            for error in &errors {
                let diagnostic = error.to_diagnostic();
                let _ =
                    term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic);
            }
            process::exit(1);
        }
    };

    tracing::debug!(file = %args.file, blocks = record_map.block.len(), "record map loaded");

    if args.check {
        eprintln!(
            "ok: {} loaded ({} blocks)",
            args.file,
            record_map.block.len()
        );
        return;
    }

    if args.list_blocks {
        print_blocks(&record_map);
        return;
    }

    let options = match render_options(&args) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("error: {}", message);
            process::exit(1);
        }
    };

    let root = match &args.root {
        Some(query) => match record_map.find_block_id(query) {
            Some(id) => Some(id.to_string()),
            None => {
                eprintln!("error: no block matches '{}'", query);
                process::exit(1);
            }
        },
        None => None,
    };

    let mut tree = RenderTree::new(record_map, options).with_block_options(BlockRenderOptions {
        hide_block_id: args.hide_block_id,
        ..BlockRenderOptions::default()
    });
    if let Some(width) = args.viewport_width {
        tree = tree.with_viewport_width(width);
    }

    let rendered = tree.render(root.as_deref());
    if args.tree {
        print!("{}", rendered.outline);
    } else {
        println!("{}", rendered.to_html());
    }

    if !rendered.diagnostics.is_empty() {
        eprintln!("{} render warning(s)", rendered.diagnostics.len());
    }
}

/// Flags over the `--config` file; unset keys fall through to the defaults.
fn render_options(args: &RenderArgs) -> Result<RenderOptions, String> {
    let file_options = match &args.config {
        Some(path) => load_options(Path::new(path))?,
        None => RenderOptions::default(),
    };
    let flags = RenderOptions {
        full_page: args.full_page.then_some(true),
        dark_mode: args.dark_mode.then_some(true),
        build_mode: args.production.then_some(BuildMode::Production),
        ..RenderOptions::default()
    };
    let cli_defaults = RenderOptions {
        build_mode: Some(BuildMode::Development),
        ..RenderOptions::default()
    };
    Ok(flags.or(file_options).or(cli_defaults))
}

fn load_options(path: &Path) -> Result<RenderOptions, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
    toml::from_str(&text).map_err(|e| format!("invalid options in '{}': {}", path.display(), e))
}

fn print_blocks(record_map: &RecordMap) {
    for (id, block) in record_map.block.values() {
        let title = block.title().map(|t| t.plain_text()).unwrap_or_default();
        let mut notes = Vec::new();
        let children = block.children().len();
        if children > 0 {
            notes.push(format!("{} children", children));
        }
        if block.block_type.is_asset() {
            let signed = record_map.signed_url(id).is_some();
            notes.push(if signed { "signed url" } else { "no signed url" }.to_string());
        }
        let suffix = if notes.is_empty() {
            String::new()
        } else {
            format!(" [{}]", notes.join(", "))
        };
        println!("{} {} {:?}{}", id, block.block_type, title, suffix);
    }
}
