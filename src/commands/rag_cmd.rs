use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;

use crate::database::Database;
use crate::rag::RagEngine;

pub async fn handle_command(
    input: &str,
    engine: &Arc<RagEngine>,
    db: &Arc<Database>,
) -> Result<(), String> {
    let parts: Vec<&str> = input.split_whitespace().collect();

    let command = match parts.get(1) {
        Some(command) => *command,
        None => {
            println!("📚 Comandos de material de estudo:");
            println!("  rag enviar <arquivo>     - Envia um documento (PDF, TXT ou MD)");
            println!("  rag lote <pasta>         - Envia todos os documentos de uma pasta");
            println!("  rag perguntar <pergunta> - Pergunta sobre o material enviado");
            println!("  rag remover <arquivo>    - Remove os chunks de um documento");
            println!("  rag docs                 - Lista os documentos enviados");
            return Ok(());
        }
    };

    match command {
        "enviar" => {
            let file_path = parts.get(2).ok_or("Uso: rag enviar <arquivo>")?;
            upload_file(file_path, engine, db).await
        }
        "lote" => {
            let folder = parts.get(2).ok_or("Uso: rag lote <pasta>")?;
            upload_folder(folder, engine, db).await
        }
        "perguntar" => {
            let question = parts[2..].join(" ");
            if question.is_empty() {
                return Err("Uso: rag perguntar <pergunta>".to_string());
            }
            ask(&question, engine).await
        }
        "remover" => {
            let filename = parts.get(2).ok_or("Uso: rag remover <arquivo>")?;
            engine
                .remove_document(filename)
                .await
                .map_err(|e| e.to_string())?;
            println!("🗑️ Chunks de {} removidos.", filename.bright_yellow());
            Ok(())
        }
        "docs" => list_documents(db).await,
        _ => Err(format!("Comando rag desconhecido: {}", command)),
    }
}

async fn upload_file(
    file_path: &str,
    engine: &Arc<RagEngine>,
    db: &Arc<Database>,
) -> Result<(), String> {
    println!("📄 Processando documento: {}", file_path.bright_yellow());

    let bytes = tokio::fs::read(file_path)
        .await
        .map_err(|e| format!("Falha ao ler o arquivo: {}", e))?;

    let filename = Path::new(file_path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file_path.to_string());

    let chunks = engine
        .ingest(&filename, &bytes)
        .await
        .map_err(|e| e.to_string())?;

    if let Err(e) = db.register_document(filename.clone(), chunks as i64).await {
        eprintln!("Warning: Failed to register document: {}", e);
    }

    println!(
        "✅ {} armazenado ({} chunks)",
        filename.bright_green(),
        chunks.to_string().cyan()
    );
    Ok(())
}

async fn upload_folder(
    folder_path: &str,
    engine: &Arc<RagEngine>,
    db: &Arc<Database>,
) -> Result<(), String> {
    println!("📁 Processando documentos em: {}", folder_path.bright_yellow());

    let mut entries = tokio::fs::read_dir(folder_path)
        .await
        .map_err(|e| format!("Falha ao ler a pasta: {}", e))?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );

    let mut processed = 0usize;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| format!("Falha ao ler a pasta: {}", e))?
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        pb.set_message(format!("Processando {}", path.display()));
        match upload_file(&path.to_string_lossy(), engine, db).await {
            Ok(()) => processed += 1,
            Err(e) => eprintln!("⚠️ {}: {}", path.display(), e),
        }
        pb.inc(1);
    }

    pb.finish_with_message(format!("{} documentos processados", processed));
    Ok(())
}

async fn ask(question: &str, engine: &Arc<RagEngine>) -> Result<(), String> {
    println!("🔍 Consultando o material sobre: {}", question.bright_yellow());

    let answer = engine.answer(question).await.map_err(|e| e.to_string())?;

    // The tutor answers with an HTML fragment; print it as-is so it can be
    // pasted into the front-end for inspection.
    println!("\n💬 Resposta:");
    println!("{}", answer.truecolor(255, 236, 179));
    Ok(())
}

async fn list_documents(db: &Arc<Database>) -> Result<(), String> {
    let documents = db
        .list_documents()
        .await
        .map_err(|e| format!("Falha ao listar documentos: {}", e))?;

    if documents.is_empty() {
        println!("Nenhum documento enviado ainda.");
        return Ok(());
    }

    println!("\n📚 Documentos enviados:");
    for doc in documents {
        println!(
            "  • {} ({} chunks, {})",
            doc.filename.bright_green(),
            doc.chunks.to_string().cyan(),
            doc.timestamp
        );
    }
    Ok(())
}
