use clap::Parser;
use ocr_docx::core::images::select_images;
use ocr_docx::core::{ConfigProvider, Storage};
use ocr_docx::utils::error::ErrorSeverity;
use ocr_docx::utils::{logger, validation::Validate};
use ocr_docx::{
    Assembler, CliConfig, ConversionEngine, DocumentPipeline, DocxEncoder, GeminiClient,
    LocalStorage, TomlConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting ocr-docx");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config, &cli);

    if cli.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No OCR requests will be sent");
        let ready = perform_dry_run(&config).await;
        std::process::exit(if ready { 0 } else { 1 });
    }

    let outcome = async {
        let ocr = GeminiClient::new(config.gemini_settings()?)?;
        let assembler = Assembler::new(config.assembler.clone())?;
        let encoder = DocxEncoder::new(config.output.title.clone());
        let staging = LocalStorage::new(config.input_dir().to_string());
        let sink = LocalStorage::new(config.output_path().to_string());

        let pipeline = DocumentPipeline::new(staging, sink, ocr, encoder, assembler, config);
        ConversionEngine::new(pipeline).run().await
    }
    .await;

    match outcome {
        Ok(output_path) => {
            tracing::info!("✅ Conversion completed successfully!");
            println!("✅ Document created successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Conversion failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, cli: &CliConfig) {
    println!("📋 Configuration Summary:");
    println!("  Input: {}", config.input.directory);
    println!(
        "  Output: {}/{}",
        config.output.path, config.output.filename
    );
    println!("  OCR: {} ({})", config.ocr.model, config.ocr.endpoint);
    println!("  Concurrent Requests: {}", config.ocr.concurrent_requests);
    println!(
        "  Headers: {}, Label Threshold: {}",
        config.assembler.include_headers, config.assembler.label_threshold
    );

    if cli.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

/// 執行前檢查：暫存目錄存在且有圖片、API 金鑰已設定
async fn perform_dry_run(config: &TomlConfig) -> bool {
    println!("🔍 Dry Run Analysis:");
    let mut ready = true;

    // 與實際轉換使用相同的列檔與篩選
    let staging = LocalStorage::new(config.input_dir().to_string());
    match staging.list_files().await {
        Ok(files) => {
            let images = select_images(files);

            if images.is_empty() {
                println!("  ❌ No files uploaded yet ({})", config.input.directory);
                ready = false;
            } else {
                println!("  📸 {} images staged:", images.len());
                for (name, mime_type) in &images {
                    println!("    - {} ({})", name, mime_type);
                }
            }
        }
        Err(e) => {
            println!(
                "  ❌ Cannot read upload directory {}: {}",
                config.input.directory, e
            );
            ready = false;
        }
    }

    match config.api_key() {
        Ok(_) => println!("  🔑 API key configured"),
        Err(e) => {
            println!("  ❌ {}", e.user_friendly_message());
            ready = false;
        }
    }

    println!();
    if ready {
        println!("✅ All checks passed. Run without --dry-run to convert.");
    } else {
        println!("❌ Some checks failed.");
    }

    ready
}
