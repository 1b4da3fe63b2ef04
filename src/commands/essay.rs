use colored::Colorize;
use std::path::Path;

use crate::grading::{CorrectionReport, EssayCorrector, ExamFormat};
use crate::ocr::VisionOcr;
use crate::providers::traits::CompletionProvider;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "bmp"];

/// Grades an essay from a local file. Photos go through OCR first; plain
/// text files are graded directly.
pub async fn handle_correction(
    input: &str,
    provider: &Box<dyn CompletionProvider + Send + Sync>,
    ocr: &VisionOcr,
    temperature: f32,
) -> Result<Option<(ExamFormat, String, CorrectionReport)>, String> {
    let parts: Vec<&str> = input.split_whitespace().collect();

    let file_path = match parts.get(1) {
        Some(path) => *path,
        None => {
            println!("Uso: corrigir <arquivo> [enem|ufsc]");
            return Ok(None);
        }
    };

    let format = match parts.get(2) {
        Some(raw) => raw.parse::<ExamFormat>()?,
        None => ExamFormat::default(),
    };

    let texto = load_essay_text(file_path, ocr).await?;

    println!(
        "📝 Corrigindo redação de {} no formato {}...",
        file_path.bright_yellow(),
        format.to_string().cyan()
    );

    let corrector = EssayCorrector::new(provider.clone_box(), temperature);
    let report = corrector
        .correct(&texto, format, None)
        .await
        .map_err(|e| e.to_string())?;

    print_report(format, &report);
    Ok(Some((format, texto, report)))
}

/// OCR-only command: prints the extracted text without grading it.
pub async fn handle_extract(input: &str, ocr: &VisionOcr) -> Result<(), String> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    let file_path = parts.get(1).ok_or("Uso: texto <imagem>")?;

    println!("🔍 Extraindo texto de: {}", file_path.bright_yellow());

    let bytes = tokio::fs::read(file_path)
        .await
        .map_err(|e| format!("Falha ao ler o arquivo: {}", e))?;

    let texto = ocr.extract_text(&bytes).await.map_err(|e| e.to_string())?;

    println!("\n📄 Texto extraído:");
    println!("{}", texto);
    Ok(())
}

async fn load_essay_text(file_path: &str, ocr: &VisionOcr) -> Result<String, String> {
    let extension = Path::new(file_path)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        let bytes = tokio::fs::read(file_path)
            .await
            .map_err(|e| format!("Falha ao ler a imagem: {}", e))?;
        ocr.extract_text(&bytes).await.map_err(|e| e.to_string())
    } else {
        tokio::fs::read_to_string(file_path)
            .await
            .map_err(|e| format!("Falha ao ler o arquivo: {}", e))
    }
}

fn print_report(format: ExamFormat, report: &CorrectionReport) {
    println!("\n📊 Resultado ({})", format);
    println!("Nota final: {}", report.nota_final.to_string().bright_green().bold());
    println!("\n{}", report.analise_geral.truecolor(255, 236, 179));

    for comp in &report.competencias {
        println!(
            "\n{} {} - nota {}",
            "•".cyan(),
            match format {
                ExamFormat::Enem => format!("Competência {}", comp.id),
                ExamFormat::Ufsc => format!("Critério {}", comp.id),
            }
            .bold(),
            comp.nota.to_string().bright_green()
        );
        println!("  {}", comp.feedback);
    }
    println!();
}
