use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use codegen_cli::CodegenCli;
use codegen_cli::Commands;
use codegen_cli::FileSelection;
use codegen_cli::OutputFormat;
use codegen_cli::ScriptModuleLoader;
use codegen_core::AnyResult;
use codegen_core::Codegen;
use codegen_core::CodegenConfig;
use codegen_core::Dependencies;
use codegen_core::Diagnostic;
use codegen_core::strip_trim_prefix;
use owo_colors::OwoColorize;
use similar::ChangeTag;
use similar::TextDiff;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = CodegenCli::parse();

	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	init_tracing(args.verbose, use_color);

	let result = match &args.command {
		Some(Commands::Check {
			paths,
			format,
			diff,
		}) => run_check(&args, paths, *format, *diff),
		Some(Commands::Fix { paths, dry_run }) => run_fix(&args, paths, *dry_run),
		Some(Commands::Presets) => run_presets(&args).map(|()| true),
		None => {
			eprintln!("No subcommand specified. Run `codegen --help` for usage.");
			process::exit(2);
		}
	};

	match result {
		Ok(true) => {}
		Ok(false) => process::exit(1),
		Err(e) => {
			match e.downcast::<codegen_core::CodegenError>() {
				Ok(codegen_err) => {
					let report: miette::Report = (*codegen_err).into();
					eprintln!("{report:?}");
				}
				Err(e) => {
					eprintln!("{} {e}", colored!("error:", red));
				}
			}
			process::exit(2);
		}
	}
}

/// Logs go to stderr. `CODEGEN_LOG` takes `RUST_LOG` style directives and
/// wins over `--verbose`.
fn init_tracing(verbose: bool, use_color: bool) {
	let default_level = if verbose { "debug" } else { "warn" };
	let filter =
		EnvFilter::try_from_env("CODEGEN_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.without_time()
		.init();
}

fn resolve_root(args: &CodegenCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

struct Project {
	root: PathBuf,
	codegen: Codegen,
	files: Vec<PathBuf>,
}

fn load_project(args: &CodegenCli, paths: &[PathBuf]) -> AnyResult<Project> {
	let root = resolve_root(args);
	let config = CodegenConfig::load(&root)?;
	let codegen = Codegen::from_config(&root, config.as_ref())?
		.with_dependencies(Dependencies::default().with_modules(ScriptModuleLoader::new()));
	let files = FileSelection::new(&root, config.as_ref())?.collect(paths)?;

	if args.verbose {
		println!("Scanning {} file(s) in {}", files.len(), root.display());
	}

	Ok(Project {
		root,
		codegen,
		files,
	})
}

struct FileReport {
	path: PathBuf,
	source: String,
	diagnostics: Vec<Diagnostic>,
}

/// Returns `true` when every file is clean.
fn run_check(args: &CodegenCli, paths: &[PathBuf], format: OutputFormat, show_diff: bool) -> AnyResult<bool> {
	let project = load_project(args, paths)?;
	let mut reports = Vec::new();

	for path in &project.files {
		let source = std::fs::read_to_string(path)?;
		let diagnostics = project.codegen.lint(path, &source)?;
		if !diagnostics.is_empty() {
			reports.push(FileReport {
				path: path.clone(),
				source,
				diagnostics,
			});
		}
	}

	let problems: usize = reports.iter().map(|report| report.diagnostics.len()).sum();

	match format {
		OutputFormat::Json => {
			let entries: Vec<serde_json::Value> = reports
				.iter()
				.flat_map(|report| {
					let file = make_relative(&report.path, &project.root);
					report.diagnostics.iter().map(move |diagnostic| {
						serde_json::json!({
							"file": file,
							"line": diagnostic.position.start.line,
							"column": diagnostic.position.start.column,
							"kind": diagnostic.kind,
							"code": diagnostic.kind.code(),
							"message": diagnostic.message,
							"fixable": diagnostic.is_fixable(),
						})
					})
				})
				.collect();
			let output = serde_json::json!({
				"ok": problems == 0,
				"diagnostics": entries,
			});
			println!("{output}");
		}
		OutputFormat::Github => {
			for report in &reports {
				let file = make_relative(&report.path, &project.root);
				for diagnostic in &report.diagnostics {
					println!(
						"::error file={file},line={},col={}::{}",
						diagnostic.position.start.line,
						diagnostic.position.start.column + 1,
						headline(&diagnostic.message)
					);
				}
			}

			if problems == 0 {
				println!("All generated regions are up to date.");
			} else {
				eprintln!("{}", check_summary(problems, reports.len()));
			}
		}
		OutputFormat::Text => {
			if problems == 0 {
				println!("Check passed: all generated regions are up to date.");
				return Ok(true);
			}

			for report in &reports {
				let file = make_relative(&report.path, &project.root);
				eprintln!("{}", colored!(file, bold));
				// Fix ranges point into the text the engine scanned.
				let scanned = strip_trim_prefix(&report.source);
				for diagnostic in &report.diagnostics {
					print_diagnostic(diagnostic);
					if show_diff {
						let current = diagnostic
							.fix
							.as_ref()
							.and_then(|fix| Some((scanned.get(fix.range.clone())?, &fix.text)));
						if let Some((current, expected)) = current {
							print_diff(current, expected);
						}
					}
				}
				eprintln!();
			}

			eprintln!("{}", check_summary(problems, reports.len()));
		}
	}

	Ok(problems == 0)
}

fn check_summary(problems: usize, files: usize) -> String {
	format!("{problems} problem(s) in {files} file(s). Run `codegen fix` to fix.")
}

fn print_diagnostic(diagnostic: &Diagnostic) {
	let location = format!(
		"{}:{}",
		diagnostic.position.start.line, diagnostic.position.start.column
	);
	let tag = if diagnostic.is_fixable() {
		colored!("fixable", yellow)
	} else {
		colored!("error", red)
	};

	eprintln!(
		"  {location:<8} {tag}  {}  {}",
		headline(&diagnostic.message),
		diagnostic.kind.code()
	);
}

/// Returns `true` when nothing is left to fix by hand.
fn run_fix(args: &CodegenCli, paths: &[PathBuf], dry_run: bool) -> AnyResult<bool> {
	let project = load_project(args, paths)?;
	let mut changed = Vec::new();
	let mut applied = 0;
	let mut remaining = Vec::new();

	for path in &project.files {
		let source = std::fs::read_to_string(path)?;
		let outcome = project.codegen.fix(path, &source)?;

		if outcome.is_changed() && outcome.content != source {
			applied += outcome.applied;
			if !dry_run {
				std::fs::write(path, &outcome.content)?;
			}
			changed.push(path.clone());
		}

		if !outcome.remaining.is_empty() {
			remaining.push((path.clone(), outcome.remaining));
		}
	}

	if changed.is_empty() {
		println!("All generated regions are already up to date.");
	} else if dry_run {
		println!(
			"Dry run: would apply {applied} fix(es) in {} file(s):",
			changed.len()
		);
		for path in &changed {
			println!("  {}", make_relative(path, &project.root));
		}
	} else {
		println!("Fixed {applied} problem(s) in {} file(s).", changed.len());
		if args.verbose {
			for path in &changed {
				println!("  {}", make_relative(path, &project.root));
			}
		}
	}

	for (path, diagnostics) in &remaining {
		eprintln!(
			"{} {}",
			colored!("unfixed:", yellow),
			make_relative(path, &project.root)
		);
		for diagnostic in diagnostics {
			print_diagnostic(diagnostic);
		}
	}

	Ok(remaining.is_empty())
}

fn run_presets(args: &CodegenCli) -> AnyResult<()> {
	let root = resolve_root(args);
	let config = CodegenConfig::load(&root)?;
	let codegen = Codegen::from_config(&root, config.as_ref())?;

	for name in codegen.registry().names() {
		let is_command = config
			.as_ref()
			.is_some_and(|config| config.presets.contains_key(name));
		if is_command {
			println!("{name} (command)");
		} else {
			println!("{name}");
		}
	}

	Ok(())
}

fn headline(message: &str) -> &str {
	message.lines().next().unwrap_or_default()
}

fn print_diff(current: &str, expected: &str) {
	let diff = TextDiff::from_lines(current, expected);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				eprint!("    {}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				eprint!("    {}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				eprint!("     {change}");
			}
		}
		if change.missing_newline() {
			eprintln!();
		}
	}
}

/// Make a path relative to root for display purposes.
fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
		.replace('\\', "/")
}
