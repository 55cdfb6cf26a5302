mod cli;

use anyhow::{Context, Result};
use cli::{Cli, Commands, DocumentArgs};
use colored::*;
use doc_analyst::config::{self, Config};
use doc_analyst::pipeline::{self, AnalysisRequest, PipelineConfig, PreparedPrompt};
use doc_analyst::providers::{
    self, ChatMessage, ChatRequest, langflow::LangflowClient, registry::ProviderRegistry,
};
use doc_analyst::truncation::profile::ModelTable;
use doc_analyst::truncation::prompt::{DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPLATE};
use doc_analyst::truncation::tokenizer::Encoding;
use doc_analyst::{extract, templating};
use std::time::Duration;

const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cfg = Config::load(cli.config.as_deref())?;
    let analysis = cfg.analysis.clone().unwrap_or_default();

    match cli.command {
        Commands::Analyze(cmd) => {
            let timeout = Duration::from_secs(
                cmd.timeout_secs
                    .or(analysis.timeout_secs)
                    .unwrap_or(config::DEFAULT_BACKEND_TIMEOUT_SECS),
            );
            let registry = ProviderRegistry::from_config(&cfg, timeout)?;
            let provider_key = cmd
                .provider
                .or(analysis.provider.clone())
                .unwrap_or_else(|| "openai".into());
            let provider = registry.get(&provider_key)?;

            let models = ModelTable::from_config(cfg.models.as_ref())?;
            let prepared = prepare(&cmd.doc, &cfg, &models, provider.default_model())?;
            report_decision(&prepared);

            let request = ChatRequest {
                model: prepared.model.clone(),
                system: Some(prepared.system.clone()),
                messages: vec![ChatMessage::user(prepared.prompt.clone())],
                temperature: Some(
                    cmd.temperature
                        .or(analysis.temperature)
                        .unwrap_or(config::DEFAULT_TEMPERATURE),
                ),
                max_tokens: Some(u32::try_from(prepared.max_completion_tokens).unwrap_or(u32::MAX)),
            };
            let resp = provider
                .chat(request)
                .await
                .with_context(|| format!("{} request failed", provider.name()))?;
            println!("{}", resp.content.unwrap_or_default());
            if let Some(usage) = resp.usage {
                eprintln!(
                    "[usage] in={} out={} total={}",
                    usage.input_tokens, usage.output_tokens, usage.total_tokens
                );
            }
        }
        Commands::Budget(cmd) => {
            let models = ModelTable::from_config(cfg.models.as_ref())?;
            let prepared = prepare(&cmd.doc, &cfg, &models, DEFAULT_MODEL)?;
            let b = &prepared.budget;
            println!("{}", "Budget:".bold());
            println!("  model              {} ({})", prepared.model, prepared.encoding);
            println!("  context            {}", b.max_context_tokens);
            println!("  reserved output    {}", b.reserved_completion_tokens);
            println!("  fixed overhead     {}", b.overhead_tokens);
            println!("  safety margin      {}", b.safety_margin);
            println!("  document budget    {}", b.available);
            println!("{}", "Document:".bold());
            println!("  total tokens       {}", prepared.decision.total_tokens);
            println!("  kept tokens        {}", prepared.decision.kept_tokens);
            println!("  truncated          {}", prepared.decision.truncated);
            report_decision(&prepared);
            if cmd.show_prompt {
                println!("{}\n{}", "System:".bold(), prepared.system);
                println!("{}\n{}", "Prompt:".bold(), prepared.prompt);
            }
        }
        Commands::Research(cmd) => {
            let lf = cfg.langflow.clone().unwrap_or_default();
            let url = cmd.url.or(lf.api_url.clone()).unwrap_or_default();
            let api_key = cmd.api_key.or_else(|| lf.effective_api_key());
            let input_key = cmd
                .input_key
                .or(lf.input_key.clone())
                .unwrap_or_else(|| providers::langflow::DEFAULT_INPUT_KEY.into());
            let timeout = Duration::from_secs(
                cmd.timeout_secs
                    .or(lf.timeout_secs)
                    .unwrap_or(config::DEFAULT_FLOW_TIMEOUT_SECS),
            );
            if cmd.company.trim().is_empty() {
                anyhow::bail!("a company name is required for research");
            }
            let client = LangflowClient::new(url, api_key, input_key, timeout)?;
            eprintln!("[research] {}", cmd.company);
            let answer = client.run(&cmd.company).await.context("langflow request failed")?;
            println!("{}", answer);
        }
        Commands::Models => {
            let models = ModelTable::from_config(cfg.models.as_ref())?;
            println!("{}", "Model profiles:".bold());
            for p in models.iter() {
                println!(
                    "- {} (context {}, reserved {}, {})",
                    p.name, p.max_context_tokens, p.reserved_completion_tokens, p.encoding
                );
            }
        }
        Commands::Providers => {
            let registry = ProviderRegistry::from_config(
                &cfg,
                Duration::from_secs(config::DEFAULT_BACKEND_TIMEOUT_SECS),
            )?;
            println!("{}", "Available providers:".bold());
            for key in registry.list() {
                match registry.get(&key) {
                    Ok(p) => println!("- {} (default model {})", key, p.default_model()),
                    Err(_) => println!("- {}", key),
                }
            }
        }
        Commands::Templates => {
            for name in templating::list_templates()? {
                println!("{}", name);
            }
        }
        Commands::ConfigPath => {
            println!("{}", Config::default_path()?.display());
        }
        Commands::InitConfig => {
            let path = Config::write_example_if_absent()?;
            println!("Wrote example config to {}", path.display());
        }
    }

    Ok(())
}

/// Reads the document and runs the truncation pipeline with settings from the
/// command line, then the config file, then built-in defaults. `fallback_model`
/// applies when neither names a model.
fn prepare(
    args: &DocumentArgs,
    cfg: &Config,
    models: &ModelTable,
    fallback_model: &str,
) -> Result<PreparedPrompt> {
    let analysis = cfg.analysis.clone().unwrap_or_default();
    if args.question.trim().is_empty() {
        anyhow::bail!("a question about the document is required");
    }

    let document = extract::read_document(&args.file);
    if document.is_empty() {
        eprintln!(
            "{} no text extracted from '{}'; analyzing an empty document",
            "warning:".yellow().bold(),
            args.file.display()
        );
    }

    let template = match args.template.as_deref().or(analysis.template.as_deref()) {
        Some(name) => templating::load_template(name)?,
        None => DEFAULT_TEMPLATE.to_string(),
    };
    let system = args
        .system
        .clone()
        .or(analysis.system_prompt.clone())
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
    let encoding = args
        .encoding
        .as_deref()
        .or(analysis.encoding.as_deref())
        .map(Encoding::from_name)
        .transpose()?;
    let model = args.model_or(analysis.model.as_deref(), fallback_model);

    let request = AnalysisRequest {
        model,
        document: &document,
        query: &args.question,
        encoding,
    };
    let pipeline_cfg = PipelineConfig {
        models,
        system_prompt: &system,
        template: &template,
    };
    Ok(pipeline::prepare(&request, &pipeline_cfg)?)
}

fn report_decision(prepared: &PreparedPrompt) {
    let d = &prepared.decision;
    if !d.truncated {
        return;
    }
    eprintln!(
        "{} document truncated to fit model context: kept {} of {} tokens",
        "warning:".yellow().bold(),
        d.kept_tokens,
        d.total_tokens
    );
    if d.kept_tokens == 0 {
        eprintln!(
            "{} no document content fits; the prompt alone exceeds the budget for {}",
            "warning:".yellow().bold(),
            prepared.model
        );
    }
}
