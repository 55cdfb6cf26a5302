use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "doc-analyst", author, version, about = "Ask an LLM questions about long documents", long_about = None)]
pub struct Cli {
    /// Optional path to a config file (toml)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a document with a question
    Analyze(AnalyzeArgs),
    /// Show how a document would be fitted into the model's context, without calling a backend
    Budget(BudgetArgs),
    /// Run a market-research Langflow flow for a company
    Research(ResearchArgs),
    /// List known model profiles
    Models,
    /// Show available providers
    Providers,
    /// List prompt templates
    Templates,
    /// Print the default config path
    ConfigPath,
    /// Create an example config file if missing
    InitConfig,
}

#[derive(Args, Debug, Clone)]
pub struct DocumentArgs {
    /// Path to the extracted document text
    #[arg(short, long)]
    pub file: PathBuf,

    /// Question to ask about the document
    #[arg(short, long)]
    pub question: String,

    /// Model name; must have a profile (see `models`)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Token encoding override, e.g. cl100k_base, o200k_base, chars
    #[arg(long)]
    pub encoding: Option<String>,

    /// Prompt template name (in ~/.config/doc-analyst/templates/<name>.tmpl)
    #[arg(long)]
    pub template: Option<String>,

    /// System message override
    #[arg(long)]
    pub system: Option<String>,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub doc: DocumentArgs,

    /// Provider key, e.g. openai, ollama
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Temperature (0.0 - 2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Backend request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

#[derive(Args, Debug)]
pub struct BudgetArgs {
    #[command(flatten)]
    pub doc: DocumentArgs,

    /// Print the assembled system and user prompt
    #[arg(long)]
    pub show_prompt: bool,
}

#[derive(Args, Debug)]
pub struct ResearchArgs {
    /// Company to research
    #[arg(long)]
    pub company: String,

    /// Langflow flow URL (overrides [langflow].api_url)
    #[arg(long)]
    pub url: Option<String>,

    /// Langflow API key (overrides config and LANGFLOW_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Name of the flow input that receives the company
    #[arg(long)]
    pub input_key: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

impl DocumentArgs {
    /// `--model`, then the configured model, then `fallback` (usually the
    /// chosen provider's default).
    pub fn model_or<'a>(&'a self, configured: Option<&'a str>, fallback: &'a str) -> &'a str {
        self.model.as_deref().or(configured).unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use doc_analyst::config::Config;
    use doc_analyst::providers::registry::ProviderRegistry;
    use doc_analyst::truncation::profile::ModelTable;
    use std::time::Duration;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_analyze() {
        let cli = <Cli as Parser>::try_parse_from([
            "doc-analyst", "analyze", "-f", "api.txt", "-q", "Which endpoints?", "-m", "gpt-4o", "-p", "openai",
        ])
        .unwrap();
        match cli.command {
            Commands::Analyze(a) => {
                assert_eq!(a.doc.file, PathBuf::from("api.txt"));
                assert_eq!(a.doc.model.as_deref(), Some("gpt-4o"));
                assert_eq!(a.provider.as_deref(), Some("openai"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn model_defaults_to_provider_model() {
        let cli = <Cli as Parser>::try_parse_from([
            "doc-analyst", "analyze", "-f", "api.txt", "-q", "Which endpoints?", "-p", "ollama",
        ])
        .unwrap();
        let Commands::Analyze(a) = cli.command else { panic!("expected analyze") };

        let registry = ProviderRegistry::from_config(&Config::default(), Duration::from_secs(5)).unwrap();
        let provider = registry.get(a.provider.as_deref().unwrap()).unwrap();
        let model = a.doc.model_or(None, provider.default_model());
        assert_eq!(model, "llama3.1");
        assert!(ModelTable::builtin().get(model).is_ok());

        assert_eq!(a.doc.model_or(Some("gpt-4"), provider.default_model()), "gpt-4");
        let explicit = DocumentArgs { model: Some("gpt-4o".into()), ..a.doc.clone() };
        assert_eq!(explicit.model_or(Some("gpt-4"), provider.default_model()), "gpt-4o");
    }
}
