use colored::Colorize;

pub fn handle_command(input: &str) -> Result<(), String> {
    match input.to_lowercase().as_str() {
        "ajuda" | "help" => {
            println!("\n📝 Comandos de Correção:");
            println!("  corrigir <arquivo> [enem|ufsc]  - Corrige uma redação (foto ou .txt)");
            println!("  texto <imagem>                  - Apenas extrai o texto da foto (OCR)");
            println!("  historico                       - Mostra as últimas correções");
            println!();

            println!("📚 Comandos de Material de Estudo (RAG):");
            println!("  rag enviar <arquivo>     - Envia um documento (PDF, TXT ou MD)");
            println!("  rag lote <pasta>         - Envia todos os documentos de uma pasta");
            println!("  rag perguntar <pergunta> - Pergunta sobre o material enviado");
            println!("  rag remover <arquivo>    - Remove os chunks de um documento");
            println!("  rag docs                 - Lista os documentos enviados");
            println!();

            println!("⚙️ Comandos do Sistema:");
            println!("  status - Mostra modelo ativo e chunks armazenados");
            println!("  ajuda  - Mostra este menu");
            println!("  sair   - Encerra o programa");
            println!();
            Ok(())
        }
        "sair" | "exit" | "quit" => {
            println!("👋 Até logo!");
            std::process::exit(0);
        }
        _ => Err(format!(
            "Comando desconhecido. Digite {} para ver os comandos disponíveis.",
            "ajuda".cyan()
        )),
    }
}
