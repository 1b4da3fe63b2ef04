use serde::{Deserialize, Serialize};
use thiserror::Error;
use whatlang::{detect, Lang};

use crate::grading::rubric::{build_prompt, ExamFormat};
use crate::providers::traits::CompletionProvider;

#[derive(Error, Debug)]
pub enum GradingError {
    #[error("Texto da redação vazio.")]
    EmptyEssay,
    #[error("O texto não parece estar em português (idioma detectado: {0}).")]
    NotPortuguese(String),
    #[error("Erro na API do modelo ou na análise da resposta: {0}")]
    Provider(#[from] anyhow::Error),
    #[error("Resposta do modelo fora do formato esperado: {0}")]
    MalformedReport(String),
    #[error("Nota inválida para o formato {format}: {reason}")]
    InvalidScore { format: ExamFormat, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetencyScore {
    pub id: u8,
    pub nota: f32,
    pub feedback: String,
}

/// Structured grading result returned by the correction endpoints, for both
/// exam formats. ENEM totals run 0-1000; UFSC finals run 0-10.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionReport {
    pub nota_final: f32,
    pub analise_geral: String,
    pub competencias: Vec<CompetencyScore>,
}

/// Orchestrates one correction: language gate, prompt assembly, LLM call,
/// response normalization and score validation.
pub struct EssayCorrector {
    provider: Box<dyn CompletionProvider + Send + Sync>,
    temperature: f32,
}

impl EssayCorrector {
    pub fn new(provider: Box<dyn CompletionProvider + Send + Sync>, temperature: f32) -> Self {
        Self {
            provider,
            temperature,
        }
    }

    pub async fn correct(
        &self,
        texto: &str,
        format: ExamFormat,
        tema: Option<&str>,
    ) -> Result<CorrectionReport, GradingError> {
        let texto = texto.trim();
        if texto.is_empty() {
            return Err(GradingError::EmptyEssay);
        }

        check_language(texto)?;

        let prompt = build_prompt(format, tema, texto);
        let response = self.provider.complete(&prompt, self.temperature).await?;

        let mut report = parse_report(&response)?;
        validate_report(format, &mut report)?;

        Ok(report)
    }
}

/// Refuses essays whose detected language is reliably not Portuguese. Short
/// or ambiguous texts pass through; the rubric handles them.
fn check_language(texto: &str) -> Result<(), GradingError> {
    if let Some(info) = detect(texto) {
        if info.is_reliable() && info.lang() != Lang::Por {
            return Err(GradingError::NotPortuguese(info.lang().eng_name().to_string()));
        }
    }
    Ok(())
}

/// Strips Markdown fences the model sometimes wraps around the JSON object.
fn normalize_response(response: &str) -> String {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```JSON")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
        .to_string()
}

fn parse_report(response: &str) -> Result<CorrectionReport, GradingError> {
    let cleaned = normalize_response(response);

    if let Ok(report) = serde_json::from_str(&cleaned) {
        return Ok(report);
    }

    // Second chance: the model occasionally surrounds the object with prose.
    let start = cleaned.find('{');
    let end = cleaned.rfind('}');
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            if let Ok(report) = serde_json::from_str(&cleaned[start..=end]) {
                return Ok(report);
            }
        }
    }

    Err(GradingError::MalformedReport(truncate(&cleaned, 200)))
}

/// Checks every score against the format's scale and recomputes the final
/// grade from the per-competency scores, which keeps the report internally
/// consistent even when the model sums wrong.
fn validate_report(format: ExamFormat, report: &mut CorrectionReport) -> Result<(), GradingError> {
    if report.competencias.len() != 5 {
        return Err(GradingError::InvalidScore {
            format,
            reason: format!("esperadas 5 competências, recebidas {}", report.competencias.len()),
        });
    }

    for (i, comp) in report.competencias.iter().enumerate() {
        if comp.id != (i + 1) as u8 {
            return Err(GradingError::InvalidScore {
                format,
                reason: format!("competência na posição {} com id {}", i + 1, comp.id),
            });
        }

        let valid = match format {
            // 0-200 in multiples of 40.
            ExamFormat::Enem => {
                (0.0..=200.0).contains(&comp.nota)
                    && comp.nota.fract() == 0.0
                    && (comp.nota as i32) % 40 == 0
            }
            // 0-10 with halves allowed.
            ExamFormat::Ufsc => {
                (0.0..=10.0).contains(&comp.nota) && (comp.nota * 2.0).fract() == 0.0
            }
        };

        if !valid {
            return Err(GradingError::InvalidScore {
                format,
                reason: format!("nota {} na competência {}", comp.nota, comp.id),
            });
        }
    }

    let soma: f32 = report.competencias.iter().map(|c| c.nota).sum();
    report.nota_final = match format {
        ExamFormat::Enem => soma,
        ExamFormat::Ufsc => (soma / 5.0 * 10.0).round() / 10.0,
    };

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect::<String>() + "..."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report(notas: [f32; 5]) -> CorrectionReport {
        CorrectionReport {
            nota_final: 0.0,
            analise_geral: "Bom desempenho geral.".to_string(),
            competencias: notas
                .iter()
                .enumerate()
                .map(|(i, &nota)| CompetencyScore {
                    id: (i + 1) as u8,
                    nota,
                    feedback: format!("Feedback da competência {}.", i + 1),
                })
                .collect(),
        }
    }

    #[test]
    fn test_parse_report_with_fences() {
        let response = r#"```json
{
  "nota_final": 840,
  "analise_geral": "Texto bem estruturado.",
  "competencias": [
    { "id": 1, "nota": 160, "feedback": "a" },
    { "id": 2, "nota": 200, "feedback": "b" },
    { "id": 3, "nota": 160, "feedback": "c" },
    { "id": 4, "nota": 160, "feedback": "d" },
    { "id": 5, "nota": 160, "feedback": "e" }
  ]
}
```"#;

        let report = parse_report(response).unwrap();
        assert_eq!(report.competencias.len(), 5);
        assert_eq!(report.analise_geral, "Texto bem estruturado.");
    }

    #[test]
    fn test_parse_report_with_surrounding_prose() {
        let response = r#"Aqui está a avaliação:
{ "nota_final": 5, "analise_geral": "ok", "competencias": [] }
Espero ter ajudado."#;

        let report = parse_report(response).unwrap();
        assert_eq!(report.analise_geral, "ok");
    }

    #[test]
    fn test_parse_report_rejects_garbage() {
        assert!(matches!(
            parse_report("não consigo avaliar esta redação"),
            Err(GradingError::MalformedReport(_))
        ));
    }

    #[test]
    fn test_enem_final_grade_is_recomputed() {
        let mut report = sample_report([160.0, 200.0, 120.0, 160.0, 200.0]);
        report.nota_final = 999.0; // model summed wrong
        validate_report(ExamFormat::Enem, &mut report).unwrap();
        assert_eq!(report.nota_final, 840.0);
    }

    #[test]
    fn test_enem_rejects_off_scale_score() {
        let mut report = sample_report([160.0, 170.0, 120.0, 160.0, 200.0]);
        assert!(matches!(
            validate_report(ExamFormat::Enem, &mut report),
            Err(GradingError::InvalidScore { .. })
        ));
    }

    #[test]
    fn test_enem_rejects_score_above_200() {
        let mut report = sample_report([160.0, 240.0, 120.0, 160.0, 200.0]);
        assert!(validate_report(ExamFormat::Enem, &mut report).is_err());
    }

    #[test]
    fn test_ufsc_mean_with_halves() {
        let mut report = sample_report([7.5, 8.0, 6.5, 9.0, 8.0]);
        validate_report(ExamFormat::Ufsc, &mut report).unwrap();
        assert_eq!(report.nota_final, 7.8);
    }

    #[test]
    fn test_ufsc_rejects_quarter_points() {
        let mut report = sample_report([7.25, 8.0, 6.5, 9.0, 8.0]);
        assert!(validate_report(ExamFormat::Ufsc, &mut report).is_err());
    }

    #[test]
    fn test_wrong_competency_count_rejected() {
        let mut report = sample_report([160.0, 200.0, 120.0, 160.0, 200.0]);
        report.competencias.pop();
        assert!(validate_report(ExamFormat::Enem, &mut report).is_err());
    }

    #[test]
    fn test_out_of_order_ids_rejected() {
        let mut report = sample_report([160.0, 200.0, 120.0, 160.0, 200.0]);
        report.competencias[1].id = 4;
        assert!(validate_report(ExamFormat::Enem, &mut report).is_err());
    }

    #[test]
    fn test_portuguese_essay_passes_language_gate() {
        let texto = "A educação brasileira enfrenta grandes desafios no século XXI, \
                     sobretudo no que diz respeito ao acesso igualitário às tecnologias \
                     digitais e à permanência dos estudantes na escola pública.";
        assert!(check_language(texto).is_ok());
    }

    #[test]
    fn test_english_essay_fails_language_gate() {
        let texto = "Education in the twenty-first century faces enormous challenges, \
                     especially regarding equal access to digital technology and student \
                     retention in public schools across the country.";
        assert!(matches!(
            check_language(texto),
            Err(GradingError::NotPortuguese(_))
        ));
    }
}
