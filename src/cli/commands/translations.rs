use clap::{Args, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;

use crate::cli::utils::{output_success, output_value, parse_key_value};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::i18n::{TranslationTable, Translator};

#[derive(Args)]
pub struct TranslateArgs {
    #[arg(help = "Source message")]
    pub message: String,

    #[arg(long, short = 'l', help = "Target locale (defaults to the configured locale)")]
    pub locale: Option<String>,

    #[arg(long = "param", value_parser = parse_key_value, help = "Placeholder value as name=value, repeatable")]
    pub params: Vec<(String, String)>,
}

#[derive(Subcommand)]
pub enum TranslationCommands {
    #[command(about = "Report entries whose placeholders don't match their source")]
    Check {
        #[arg(long, help = "Check a single JSON table instead of the configured ones")]
        file: Option<PathBuf>,

        #[arg(long, help = "Fail when any entry is rejected")]
        strict: bool,
    },
}

fn translator(config: &AppConfig) -> anyhow::Result<Translator> {
    let mut translator = Translator::bundled(config.i18n.default_locale.clone())?;
    if let Some(dir) = &config.i18n.translations_path {
        translator.load_dir(dir)?;
    }
    Ok(translator)
}

pub fn translate(config: &AppConfig, args: TranslateArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let translator = translator(config)?;
    let locale = args.locale.unwrap_or_else(|| translator.default_locale().to_string());
    let params: Vec<(&str, &str)> = args.params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

    let translation = translator.translate(&locale, &args.message, &params);
    output_value(&output_format, "translation", &translation)
}

pub fn handle(config: &AppConfig, cmd: TranslationCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TranslationCommands::Check { file, strict } => {
            let tables: Vec<(String, TranslationTable)> = match file {
                Some(path) => {
                    let raw = std::fs::read_to_string(&path)?;
                    let name = path
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    vec![(name, TranslationTable::from_json(&raw)?)]
                }
                None => {
                    let translator = translator(config)?;
                    translator
                        .locales()
                        .into_iter()
                        .filter_map(|locale| Some((locale.to_string(), translator.table(locale)?.clone())))
                        .collect()
                }
            };

            let mut rejected_total = 0;
            let mut reports: Vec<Value> = Vec::new();
            for (locale, table) in &tables {
                rejected_total += table.rejected().len();
                if matches!(output_format, OutputFormat::Text) {
                    println!(
                        "{}: {} entries, {} translated, {} rejected",
                        locale,
                        table.len(),
                        table.translated_count(),
                        table.rejected().len()
                    );
                    for entry in table.rejected() {
                        println!("  - {:?}", entry.source);
                        println!("    translation: {:?}", entry.translation);
                        if !entry.missing.is_empty() {
                            println!("    missing: {}", entry.missing.join(", "));
                        }
                        if !entry.unexpected.is_empty() {
                            println!("    unexpected: {}", entry.unexpected.join(", "));
                        }
                    }
                }
                reports.push(json!({
                    "locale": locale,
                    "entries": table.len(),
                    "translated": table.translated_count(),
                    "rejected": table.rejected().iter().map(|e| json!({
                        "source": e.source,
                        "translation": e.translation,
                        "missing": e.missing,
                        "unexpected": e.unexpected,
                    })).collect::<Vec<_>>(),
                }));
            }

            if matches!(output_format, OutputFormat::Json) {
                output_success(
                    &output_format,
                    &format!("Checked {} tables", tables.len()),
                    Some(json!({ "tables": reports })),
                )?;
            }

            if strict && rejected_total > 0 {
                anyhow::bail!("{} translations rejected", rejected_total);
            }
            Ok(())
        }
    }
}
