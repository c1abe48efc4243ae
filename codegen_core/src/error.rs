use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum CodegenError {
	#[error(transparent)]
	#[diagnostic(code(codegen::io_error))]
	Io(#[from] std::io::Error),

	#[error("codegen does not support files with extension `{0}`")]
	#[diagnostic(
		code(codegen::unsupported_extension),
		help(
			"supported extensions: .ts, .tsx, .js, .jsx, .cjs, .mjs, .cts, .mts, .md, .mdx, .yml, \
			 .yaml, .txt, .sh"
		)
	)]
	UnsupportedExtension(String),

	#[error("{0}")]
	#[diagnostic(code(codegen::options_parse))]
	OptionsParse(String),

	#[error("invalid options: {0}")]
	#[diagnostic(code(codegen::invalid_options))]
	InvalidOptions(String),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(codegen::config_parse),
		help("check that codegen.toml is valid TOML with [cache] and/or [presets.<name>] sections")
	)]
	ConfigParse(String),

	#[error("invalid duration `{0}`")]
	#[diagnostic(
		code(codegen::invalid_duration),
		help("use a number followed by a unit, for example `28d`, `12h`, `30m` or `45s`")
	)]
	InvalidDuration(String),

	#[error("invalid glob pattern `{pattern}`: {reason}")]
	#[diagnostic(code(codegen::invalid_pattern))]
	InvalidPattern { pattern: String, reason: String },

	#[error("failed to run command `{command}`: {reason}")]
	#[diagnostic(code(codegen::process))]
	Process { command: String, reason: String },

	#[error("no module registered at `{0}`")]
	#[diagnostic(code(codegen::module_not_found))]
	ModuleNotFound(String),

	#[error("failed to parse markdown: {0}")]
	#[diagnostic(code(codegen::markdown))]
	Markdown(String),

	#[error("template rendering failed: {0}")]
	#[diagnostic(code(codegen::template_render))]
	TemplateRender(String),
}

pub type CodegenResult<T> = Result<T, CodegenError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;

/// Error type returned by preset generators. Anything that implements
/// [`std::error::Error`] can be boxed into it with `?`.
pub type PresetError = Box<dyn std::error::Error + Send + Sync>;
pub type PresetResult<T = String> = Result<T, PresetError>;
