use colored::Colorize;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::Database;
use crate::ocr::VisionOcr;
use crate::providers::traits::CompletionProvider;
use crate::rag::RagEngine;

mod essay;
mod rag_cmd;
mod system;

/// Interactive REPL shared by operators: grade local essays, feed the RAG
/// collection and inspect history without going through HTTP.
pub struct CommandHandler {
    provider: Box<dyn CompletionProvider + Send + Sync>,
    ocr: VisionOcr,
    rag: Arc<RagEngine>,
    db: Arc<Database>,
    grading_temperature: f32,
}

impl CommandHandler {
    pub fn new(
        provider: Box<dyn CompletionProvider + Send + Sync>,
        ocr: VisionOcr,
        rag: Arc<RagEngine>,
        db: Arc<Database>,
        config: &AppConfig,
    ) -> Self {
        Self {
            provider,
            ocr,
            rag,
            db,
            grading_temperature: config.grading_temperature,
        }
    }

    pub async fn handle_command(&mut self, input: &str) -> Result<(), String> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(());
        }

        match input.to_lowercase().as_str() {
            "ajuda" | "help" | "sair" | "exit" | "quit" => {
                return system::handle_command(input);
            }
            "status" => return self.show_status().await,
            "historico" => return self.show_history().await,
            _ => {}
        }

        if input == "corrigir" || input.starts_with("corrigir ") {
            let result = essay::handle_correction(
                input,
                &self.provider,
                &self.ocr,
                self.grading_temperature,
            )
            .await?;

            // Mirror the API behavior: successful corrections land in the
            // history table.
            if let Some((format, texto, report)) = result {
                let relatorio = serde_json::to_string(&report).unwrap_or_default();
                if let Err(e) = self.db
                    .save_correction(
                        format.to_string(),
                        report.nota_final,
                        report.analise_geral.clone(),
                        texto,
                        relatorio,
                    )
                    .await
                {
                    eprintln!("Warning: Failed to save correction to database: {}", e);
                }
            }
            return Ok(());
        }

        if input == "texto" || input.starts_with("texto ") {
            return essay::handle_extract(input, &self.ocr).await;
        }

        if input == "rag" || input.starts_with("rag ") {
            return rag_cmd::handle_command(input, &self.rag, &self.db).await;
        }

        Err(format!(
            "Comando desconhecido. Digite {} para ver os comandos disponíveis.",
            "ajuda".cyan()
        ))
    }

    async fn show_status(&self) -> Result<(), String> {
        let model = self.provider
            .model_info()
            .await
            .unwrap_or_else(|_| "indisponível".to_string());

        let chunks = self.rag
            .stored_chunks()
            .await
            .map(|c| c.to_string())
            .unwrap_or_else(|_| "indisponível".to_string());

        println!("\n⚙️ Status:");
        println!("  Modelo ativo: {}", model.cyan());
        println!("  Chunks armazenados: {}", chunks.cyan());
        Ok(())
    }

    async fn show_history(&self) -> Result<(), String> {
        let corrections = self.db
            .recent_corrections(10)
            .await
            .map_err(|e| format!("Falha ao consultar o histórico: {}", e))?;

        if corrections.is_empty() {
            println!("Nenhuma correção registrada ainda.");
            return Ok(());
        }

        println!("\n🕓 Últimas correções:");
        for record in corrections {
            println!(
                "  • [{}] {} - nota {}",
                record.timestamp,
                record.formato.cyan(),
                record.nota_final.to_string().bright_green()
            );
            println!("    {}", record.analise_geral);
        }
        Ok(())
    }
}
