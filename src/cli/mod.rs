pub mod mask;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::errors::MaskError;
use crate::models::{ErrorCode, JobError, MaskingLanguage, MaskingOptions, MaskingStyle};

/// mask-cut - Mask personal and organization names in text using an LLM
#[derive(Parser, Debug)]
#[command(
    name = "mask-cut",
    version,
    about = "mask-cut - Mask personal and organization names in text using an LLM"
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mask a piece of text
    Mask {
        /// Text to mask (reads --file or stdin when omitted)
        text: Option<String>,

        /// Read the text from a file
        #[arg(short = 'f', long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Mask token style
        #[arg(long, value_enum)]
        style: Option<StyleArg>,

        /// Preserve the character count of masked spans
        #[arg(long)]
        keep_length: bool,

        /// Language of the input text
        #[arg(long, value_enum)]
        language: Option<LanguageArg>,

        /// Also mask ambiguous proper nouns
        #[arg(long)]
        mask_unknown: bool,

        /// Override the configured model for this request
        #[arg(long)]
        model: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the last cached result
    Last {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Forget the cached input and result
    Clear,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StyleArg {
    Block,
    Asterisk,
    MaskTag,
}

impl From<StyleArg> for MaskingStyle {
    fn from(arg: StyleArg) -> Self {
        match arg {
            StyleArg::Block => MaskingStyle::Block,
            StyleArg::Asterisk => MaskingStyle::Asterisk,
            StyleArg::MaskTag => MaskingStyle::MaskTag,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LanguageArg {
    Ja,
    En,
    Auto,
}

impl From<LanguageArg> for MaskingLanguage {
    fn from(arg: LanguageArg) -> Self {
        match arg {
            LanguageArg::Ja => MaskingLanguage::Ja,
            LanguageArg::En => MaskingLanguage::En,
            LanguageArg::Auto => MaskingLanguage::Auto,
        }
    }
}

/// Build job options from CLI flags. Returns `None` when no flag was given.
pub fn build_options(
    style: Option<StyleArg>,
    keep_length: bool,
    language: Option<LanguageArg>,
    mask_unknown: bool,
    model: Option<&str>,
) -> Option<MaskingOptions> {
    let options = MaskingOptions {
        style: style.map(Into::into),
        keep_length: keep_length.then_some(true),
        language: language.map(Into::into),
        mask_unknown_entities: mask_unknown.then_some(true),
        model: model.map(str::to_string).filter(|m| !m.trim().is_empty()),
    };
    (options != MaskingOptions::default()).then_some(options)
}

/// Process exit code for a failed command: 2 for usage errors, 1 otherwise.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(MaskError::Usage(_)) = cause.downcast_ref::<MaskError>() {
            return 2;
        }
        if let Some(job_err) = cause.downcast_ref::<JobError>() {
            return if job_err.code == ErrorCode::Usage { 2 } else { 1 };
        }
    }
    1
}

/// Dispatch the CLI command to the appropriate handler.
pub async fn dispatch(cli: &Cli) -> anyhow::Result<()> {
    let config_path = cli
        .config
        .clone()
        .or_else(crate::models::MaskConfig::default_path);

    match &cli.command {
        Some(Commands::Mask {
            text,
            file,
            style,
            keep_length,
            language,
            mask_unknown,
            model,
            json,
        }) => {
            let options = build_options(
                *style,
                *keep_length,
                *language,
                *mask_unknown,
                model.as_deref(),
            );
            mask::cmd_mask(
                config_path.as_deref(),
                text.as_deref(),
                file.as_deref(),
                options,
                *json,
            )
            .await
        }
        Some(Commands::Last { json }) => mask::cmd_last(config_path.as_deref(), *json).await,
        Some(Commands::Clear) => mask::cmd_clear(config_path.as_deref()).await,
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_version_flag() {
        let result = Cli::try_parse_from(["mask-cut", "--version"]);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::DisplayVersion
        );
    }

    #[test]
    fn test_parse_mask_with_flags() {
        let cli = Cli::try_parse_from([
            "mask-cut",
            "mask",
            "Tanaka visited",
            "--style",
            "mask-tag",
            "--keep-length",
            "--language",
            "en",
            "--json",
        ])
        .expect("parse");
        match cli.command {
            Some(Commands::Mask {
                text,
                style,
                keep_length,
                language,
                json,
                ..
            }) => {
                assert_eq!(text.as_deref(), Some("Tanaka visited"));
                assert!(matches!(style, Some(StyleArg::MaskTag)));
                assert!(keep_length);
                assert!(matches!(language, Some(LanguageArg::En)));
                assert!(json);
            }
            other => panic!("Expected Mask, got: {:?}", other),
        }
    }

    #[test]
    fn test_text_and_file_conflict() {
        let result = Cli::try_parse_from(["mask-cut", "mask", "x", "--file", "in.txt"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["mask-cut", "last", "--config", "/tmp/c.json"])
            .expect("parse");
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.json")));
        assert!(matches!(cli.command, Some(Commands::Last { json: false })));
    }

    #[test]
    fn test_build_options_none_when_no_flags() {
        assert!(build_options(None, false, None, false, None).is_none());
        assert!(build_options(None, false, None, false, Some("  ")).is_none());
    }

    #[test]
    fn test_build_options_maps_flags() {
        let options = build_options(
            Some(StyleArg::Asterisk),
            true,
            Some(LanguageArg::Auto),
            true,
            Some("llama3"),
        )
        .expect("options");
        assert_eq!(options.style, Some(MaskingStyle::Asterisk));
        assert_eq!(options.keep_length, Some(true));
        assert_eq!(options.language, Some(MaskingLanguage::Auto));
        assert_eq!(options.mask_unknown_entities, Some(true));
        assert_eq!(options.model.as_deref(), Some("llama3"));
    }

    #[test]
    fn test_exit_codes() {
        let usage: anyhow::Error = MaskError::Usage("text is required".to_string()).into();
        assert_eq!(exit_code(&usage), 2);

        let job_usage: anyhow::Error = JobError::new(ErrorCode::Usage, "invalid key").into();
        assert_eq!(exit_code(&job_usage), 2);

        let network: anyhow::Error = JobError::new(ErrorCode::Network, "refused").into();
        assert_eq!(exit_code(&network), 1);

        assert_eq!(exit_code(&anyhow::anyhow!("other")), 1);
    }
}
