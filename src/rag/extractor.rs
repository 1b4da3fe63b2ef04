use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Formato de arquivo não suportado. Use PDF, TXT ou MD.")]
    UnsupportedFormat,
    #[error("Falha ao extrair texto do PDF: {0}")]
    Pdf(String),
    #[error("Arquivo de texto não está em UTF-8 válido")]
    Encoding,
    #[error("O documento não contém texto extraível.")]
    EmptyDocument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Pdf,
    PlainText,
}

fn detect_kind(filename: &str) -> Result<DocumentKind, ExtractError> {
    let extension = filename
        .rsplit('.')
        .next()
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => Ok(DocumentKind::Pdf),
        "txt" | "md" => Ok(DocumentKind::PlainText),
        _ => Err(ExtractError::UnsupportedFormat),
    }
}

/// Pulls the raw text out of an uploaded study document. PDFs go through
/// `pdf-extract`; txt/md are read as UTF-8.
pub fn extract_text(filename: &str, bytes: &[u8]) -> Result<String, ExtractError> {
    let text = match detect_kind(filename)? {
        DocumentKind::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ExtractError::Pdf(e.to_string()))?,
        DocumentKind::PlainText => String::from_utf8(bytes.to_vec())
            .map_err(|_| ExtractError::Encoding)?,
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(ExtractError::EmptyDocument);
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_detection_by_extension() {
        assert_eq!(detect_kind("apostila.pdf").unwrap(), DocumentKind::Pdf);
        assert_eq!(detect_kind("notas.TXT").unwrap(), DocumentKind::PlainText);
        assert_eq!(detect_kind("resumo.md").unwrap(), DocumentKind::PlainText);
    }

    #[test]
    fn test_unsupported_extensions_rejected() {
        assert!(matches!(detect_kind("slides.pptx"), Err(ExtractError::UnsupportedFormat)));
        assert!(matches!(detect_kind("planilha.xlsx"), Err(ExtractError::UnsupportedFormat)));
        assert!(matches!(detect_kind("sem_extensao"), Err(ExtractError::UnsupportedFormat)));
    }

    #[test]
    fn test_plain_text_extraction() {
        let text = extract_text("notas.txt", "A mitose é um processo de divisão celular.".as_bytes()).unwrap();
        assert_eq!(text, "A mitose é um processo de divisão celular.");
    }

    #[test]
    fn test_whitespace_only_document_rejected() {
        assert!(matches!(
            extract_text("vazio.txt", b"   \n\n  "),
            Err(ExtractError::EmptyDocument)
        ));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        assert!(matches!(
            extract_text("binario.txt", &[0xff, 0xfe, 0x00, 0x81]),
            Err(ExtractError::Encoding)
        ));
    }
}
