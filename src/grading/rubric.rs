use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Exam formats with hand-written rubrics. Each format fixes the score scale
/// the model must use and the validation applied to its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamFormat {
    Enem,
    Ufsc,
}

impl Default for ExamFormat {
    fn default() -> Self {
        ExamFormat::Enem
    }
}

impl fmt::Display for ExamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExamFormat::Enem => write!(f, "ENEM"),
            ExamFormat::Ufsc => write!(f, "UFSC"),
        }
    }
}

impl FromStr for ExamFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "enem" => Ok(ExamFormat::Enem),
            "ufsc" | "coperve" => Ok(ExamFormat::Ufsc),
            other => Err(format!("Formato de prova desconhecido: {}", other)),
        }
    }
}

/// ENEM rubric: the five official competencies, 0-200 each in multiples of
/// 40. The answer must be a bare JSON object so the backend can parse it.
const ENEM_RUBRIC: &str = r#"Você é um corretor especialista da banca do ENEM. Sua única função é analisar a redação que será fornecida a seguir e avaliá-la estritamente com base nas 5 competências oficiais do ENEM. Você deve ser rigoroso, técnico e educativo.

Para cada uma das 5 competências, avalie a redação e forneça:
1. Uma nota de 0 a 200 (em múltiplos de 40).
2. Um feedback conciso e específico, explicando o porquê da nota com exemplos do próprio texto.
3. Desconsidere erros de ortografia que não afetem a compreensão do texto e que ocorrem pela grafia da pessoa.
4. Responda de forma clara, sem palavras rebuscadas ou jargões técnicos, para melhor compreensão do aluno.

As competências são:
- Competência 1: Domínio da escrita formal da língua portuguesa (É avaliado se a redação do participante está adequada às regras de ortografia, como acentuação, ortografia, uso de hífen, emprego de letras maiúsculas e minúsculas e separação silábica. Ainda são analisadas a regência verbal e nominal, concordância verbal e nominal, pontuação, paralelismo, emprego de pronomes e crase.).
- Competência 2: Compreender o tema e não fugir do que é proposto. (Avalia as habilidades integradas de leitura e de escrita do candidato. O tema constitui o núcleo das ideias sobre as quais a redação deve ser organizada e é caracterizado por ser uma delimitação de um assunto mais abrangente.)
- Competência 3: Selecionar, relacionar, organizar e interpretar informações, fatos, opiniões e argumentos em defesa de um ponto de vista (O candidato precisa elaborar um texto que apresente, claramente, uma ideia a ser defendida e os argumentos que justifiquem a posição assumida em relação à temática da proposta da redação. Trata da coerência e da plausibilidade entre as ideias apresentadas no texto, o que é garantido pelo planejamento prévio à escrita, ou seja, pela elaboração de um projeto de texto.)
- Competência 4: Demonstrar conhecimento dos mecanismos linguísticos necessários para a construção da argumentação (São avaliados itens relacionados à estruturação lógica e formal entre as partes da redação. A organização textual exige que as frases e os parágrafos estabeleçam entre si uma relação que garanta uma sequência coerente do texto e a interdependência entre as ideias. Preposições, conjunções, advérbios e locuções adverbiais são responsáveis pela coesão do texto porque estabelecem uma inter-relação entre orações, frases e parágrafos. Cada parágrafo será composto por um ou mais períodos também articulados. Cada ideia nova precisa estabelecer relação com as anteriores.).
- Competência 5: Respeito aos direitos humanos (Apresentar uma proposta de intervenção para o problema abordado que respeite os direitos humanos. Propor uma intervenção para o problema apresentado pelo tema significa sugerir uma iniciativa que busque, mesmo que minimamente, enfrentá-lo. A elaboração de uma proposta de intervenção na prova de redação do Enem representa uma ocasião para que o candidato demonstre o preparo para o exercício da cidadania, para atuar na realidade em consonância com os direitos humanos.)

Sua resposta DEVE ser um objeto JSON válido, sem nenhum texto ou explicação adicional fora do JSON. A estrutura deve ser a seguinte:
{
  "nota_final": <soma das notas>,
  "analise_geral": "<um parágrafo com o resumo do desempenho do aluno>",
  "competencias": [
    { "id": 1, "nota": <nota_c1>, "feedback": "<feedback_c1>" },
    { "id": 2, "nota": <nota_c2>, "feedback": "<feedback_c2>" },
    { "id": 3, "nota": <nota_c3>, "feedback": "<feedback_c3>" },
    { "id": 4, "nota": <nota_c4>, "feedback": "<feedback_c4>" },
    { "id": 5, "nota": <nota_c5>, "feedback": "<feedback_c5>" }
  ]
}"#;

/// UFSC/Coperve rubric: five evaluation criteria, 0-10 each with halves
/// allowed; the final grade is the arithmetic mean.
const UFSC_RUBRIC: &str = r#"Você é um corretor experiente da banca da COPERVE/UFSC. Sua única função é analisar a redação dissertativa que será fornecida a seguir e avaliá-la estritamente com base nos 5 critérios adotados pela banca no vestibular da UFSC. Seja rigoroso, técnico e educativo.

Para cada um dos 5 critérios, avalie a redação e forneça:
1. Uma nota de 0 a 10 (valores inteiros ou meios pontos, como 7.5).
2. Um feedback conciso e específico, explicando o porquê da nota com exemplos do próprio texto.
3. Desconsidere desvios de grafia que não comprometam a compreensão do texto.
4. Responda de forma clara e acessível ao estudante.

Os critérios são:
- Critério 1: Adequação à proposta (O texto deve atender ao tema e ao gênero textual solicitados pela prova. Fuga total ou parcial do tema e desrespeito ao gênero comprometem diretamente este critério.)
- Critério 2: Emprego da modalidade escrita na norma culta (Avaliam-se ortografia, acentuação, concordância verbal e nominal, regência, pontuação e adequação vocabular à situação formal de escrita.)
- Critério 3: Coerência e coesão (O texto deve apresentar progressão de ideias sem contradições, com uso adequado de elementos coesivos que articulem períodos e parágrafos.)
- Critério 4: Capacidade de análise e argumentação (Avalia-se a consistência do conteúdo: seleção e organização de argumentos, senso crítico e profundidade na abordagem do tema.)
- Critério 5: Estrutura e organização do texto (Avaliam-se a paragrafação, a presença de introdução, desenvolvimento e conclusão, e o equilíbrio entre as partes do texto.)

A nota final é a média aritmética das notas dos 5 critérios, de 0 a 10.

Sua resposta DEVE ser um objeto JSON válido, sem nenhum texto ou explicação adicional fora do JSON. A estrutura deve ser a seguinte:
{
  "nota_final": <média das notas>,
  "analise_geral": "<um parágrafo com o resumo do desempenho do aluno>",
  "competencias": [
    { "id": 1, "nota": <nota_c1>, "feedback": "<feedback_c1>" },
    { "id": 2, "nota": <nota_c2>, "feedback": "<feedback_c2>" },
    { "id": 3, "nota": <nota_c3>, "feedback": "<feedback_c3>" },
    { "id": 4, "nota": <nota_c4>, "feedback": "<feedback_c4>" },
    { "id": 5, "nota": <nota_c5>, "feedback": "<feedback_c5>" }
  ]
}"#;

impl ExamFormat {
    pub fn rubric(&self) -> &'static str {
        match self {
            ExamFormat::Enem => ENEM_RUBRIC,
            ExamFormat::Ufsc => UFSC_RUBRIC,
        }
    }
}

/// Assembles the full grading prompt: rubric, optional exam theme, and the
/// essay text.
pub fn build_prompt(format: ExamFormat, tema: Option<&str>, texto: &str) -> String {
    let mut prompt = String::from(format.rubric());

    if let Some(tema) = tema {
        let tema = tema.trim();
        if !tema.is_empty() {
            prompt.push_str(&format!("\n\nO tema proposto para esta redação é: \"{}\"", tema));
        }
    }

    prompt.push_str("\n\nA redação do aluno para análise segue abaixo:\n\n");
    prompt.push_str(texto);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enem_prompt_carries_all_competencies() {
        let prompt = build_prompt(ExamFormat::Enem, None, "Minha redação.");
        for i in 1..=5 {
            assert!(prompt.contains(&format!("Competência {}", i)));
        }
        assert!(prompt.contains("múltiplos de 40"));
        assert!(prompt.ends_with("Minha redação."));
    }

    #[test]
    fn test_ufsc_prompt_carries_all_criteria() {
        let prompt = build_prompt(ExamFormat::Ufsc, None, "Texto dissertativo.");
        for i in 1..=5 {
            assert!(prompt.contains(&format!("Critério {}", i)));
        }
        assert!(prompt.contains("COPERVE"));
        assert!(prompt.contains("média aritmética"));
    }

    #[test]
    fn test_theme_is_injected_between_rubric_and_essay() {
        let prompt = build_prompt(
            ExamFormat::Enem,
            Some("Desafios da educação digital no Brasil"),
            "Minha redação.",
        );
        let theme_pos = prompt.find("Desafios da educação digital").unwrap();
        let essay_pos = prompt.find("Minha redação.").unwrap();
        assert!(theme_pos < essay_pos);
    }

    #[test]
    fn test_blank_theme_is_skipped() {
        let prompt = build_prompt(ExamFormat::Enem, Some("   "), "Minha redação.");
        assert!(!prompt.contains("O tema proposto"));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("enem".parse::<ExamFormat>().unwrap(), ExamFormat::Enem);
        assert_eq!("UFSC".parse::<ExamFormat>().unwrap(), ExamFormat::Ufsc);
        assert_eq!("coperve".parse::<ExamFormat>().unwrap(), ExamFormat::Ufsc);
        assert!("fuvest".parse::<ExamFormat>().is_err());
    }
}
